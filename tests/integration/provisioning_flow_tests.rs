//! Provisioning flows: connection manager → status mailbox → monitor,
//! with the simulated radio answering connect requests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use otaportal::adapters::wifi::{SimNetwork, SimWifiDriver};
use otaportal::app::connection::{ConnectionHandle, ConnectionManager};
use otaportal::app::credentials::WifiCredentials;
use otaportal::app::messages::{ConnectionMsg, DriverEvent, StatusMsg};
use otaportal::app::monitor::StatusMonitor;
use otaportal::app::ports::MailboxSink;
use otaportal::app::restart::ThreadRestartTimer;
use otaportal::app::status::{ConnectionState, StatusReader, status_board};
use otaportal::mailbox::Mailbox;

use crate::mock_hw::{CountingRestart, RecordingSink, RecordingTimer};

const SEND_TIMEOUT: Duration = Duration::from_millis(200);
const DROP: DriverEvent = DriverEvent::StaDisconnected { reason: 8 };

fn home() -> Vec<SimNetwork> {
    vec![SimNetwork {
        ssid: "HomeNet".into(),
        password: "hunter22".into(),
    }]
}

fn creds(ssid: &str, password: &str) -> WifiCredentials {
    WifiCredentials::new(ssid, password).unwrap()
}

/// Move pending radio events into the manager, as the system event loop would.
fn pump<S: otaportal::app::ports::StatusSink>(
    feed: &Arc<Mutex<VecDeque<DriverEvent>>>,
    manager: &mut ConnectionManager<SimWifiDriver, S>,
) -> usize {
    let mut handled = 0;
    loop {
        let next = feed.lock().unwrap().pop_front();
        let Some(event) = next else { break };
        manager.on_driver_event(event);
        handled += 1;
    }
    handled
}

#[test]
fn known_network_connects() {
    let driver = SimWifiDriver::new(home());
    let feed = driver.feed();
    let mut m = ConnectionManager::new(driver, RecordingSink::default(), 5);

    m.provision(creds("HomeNet", "hunter22"));
    assert_eq!(pump(&feed, &mut m), 1);
    assert_eq!(m.state(), ConnectionState::Connected);
    assert_eq!(
        m.sink().sent,
        vec![StatusMsg::WifiConnectInit, StatusMsg::WifiConnectSuccess]
    );
}

#[test]
fn wrong_password_exhausts_retries() {
    let driver = SimWifiDriver::new(home());
    let feed = driver.feed();
    let mut m = ConnectionManager::new(driver, RecordingSink::default(), 5);

    m.provision(creds("HomeNet", "wrongpass"));
    // initial attempt + 5 retries, each answered by a disconnect
    assert_eq!(pump(&feed, &mut m), 6);
    assert_eq!(m.state(), ConnectionState::Failed);
    assert_eq!(m.retries(), 5);
    assert_eq!(m.driver().connect_calls(), 6);
    assert_eq!(
        m.sink().sent,
        vec![StatusMsg::WifiConnectInit, StatusMsg::WifiConnectFail]
    );
}

#[test]
fn scenario_c_six_disconnects_then_no_more_reconnects() {
    let mut m = ConnectionManager::new(SimWifiDriver::new(home()), RecordingSink::default(), 5);
    m.provision(creds("Elsewhere", ""));
    let before = m.driver().connect_calls();

    let outcomes: Vec<_> = (0..6).map(|_| m.on_driver_event(DROP)).collect();
    assert!(outcomes[..5].iter().all(Option::is_none));
    assert_eq!(outcomes[5], Some(StatusMsg::WifiConnectFail));
    assert_eq!(m.driver().connect_calls() - before, 5, "no sixth reconnect");
    assert_eq!(m.state(), ConnectionState::Failed);
}

#[test]
fn scenario_d_provision_after_failure() {
    let driver = SimWifiDriver::new(home());
    let feed = driver.feed();
    let mut m = ConnectionManager::new(driver, RecordingSink::default(), 5);

    m.provision(creds("Elsewhere", ""));
    pump(&feed, &mut m);
    assert_eq!(m.state(), ConnectionState::Failed);

    m.provision(creds("HomeNet", "hunter22"));
    assert_eq!(m.retries(), 0);
    assert_eq!(m.state(), ConnectionState::Connecting);
    pump(&feed, &mut m);
    assert_eq!(m.state(), ConnectionState::Connected);
    assert_eq!(
        m.sink().sent,
        vec![
            StatusMsg::WifiConnectInit,
            StatusMsg::WifiConnectFail,
            StatusMsg::WifiConnectInit,
            StatusMsg::WifiConnectSuccess,
        ]
    );
}

#[test]
fn status_board_follows_manager_through_mailbox() {
    let status_mb: Mailbox<StatusMsg> = Mailbox::new();
    let (writer, reader) = status_board();
    let mut monitor = StatusMonitor::new(writer, RecordingTimer::default(), Duration::from_secs(8));

    let driver = SimWifiDriver::new(home());
    let feed = driver.feed();
    let mut m = ConnectionManager::new(driver, MailboxSink::new(&status_mb, SEND_TIMEOUT), 5);

    m.provision(creds("HomeNet", "wrongpass"));
    monitor.step(&status_mb);
    assert_eq!(reader.connection(), ConnectionState::Connecting);

    pump(&feed, &mut m);
    monitor.step(&status_mb);
    assert_eq!(reader.connection(), ConnectionState::Failed);
    assert!(status_mb.is_empty());
}

fn wait_for(reader: &StatusReader, want: ConnectionState) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if reader.connection() == want {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn actors_on_threads_reach_connected() {
    // Actors never return; leak the mailboxes so their threads may outlive the test.
    let conn_mb: &'static Mailbox<ConnectionMsg> = Box::leak(Box::new(Mailbox::new()));
    let status_mb: &'static Mailbox<StatusMsg> = Box::leak(Box::new(Mailbox::new()));

    let (writer, reader) = status_board();
    let monitor = StatusMonitor::new(
        writer,
        ThreadRestartTimer::new(CountingRestart::default()),
        Duration::from_secs(8),
    );
    std::thread::spawn(move || {
        monitor.run(status_mb);
    });

    let driver = SimWifiDriver::new(home());
    let feed = driver.feed();
    let manager = ConnectionManager::new(driver, MailboxSink::new(status_mb, SEND_TIMEOUT), 5);
    std::thread::spawn(move || {
        manager.run(conn_mb);
    });

    // Stand-in for the system event loop.
    let handle = ConnectionHandle::new(conn_mb, SEND_TIMEOUT);
    std::thread::spawn(move || {
        loop {
            let next = feed.lock().unwrap().pop_front();
            match next {
                Some(ev) => {
                    let _ = handle.driver_event(ev);
                }
                None => std::thread::sleep(Duration::from_millis(2)),
            }
        }
    });

    handle.provision(creds("HomeNet", "hunter22")).unwrap();
    assert!(wait_for(&reader, ConnectionState::Connected));
}

//! Thread-backed one-shot restart timer.
//!
//! Each `arm` bumps a generation counter and spawns a sleeper; a sleeper
//! only fires if its generation is still current when it wakes, so
//! re-arming replaces the pending deadline and the restart runs once.

use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use std::sync::Arc;

use log::{error, info};

use super::ports::{RestartPort, RestartTimer};

pub struct ThreadRestartTimer<R: RestartPort> {
    port: Arc<R>,
    generation: Arc<AtomicU64>,
}

impl<R: RestartPort> ThreadRestartTimer<R> {
    pub fn new(port: R) -> Self {
        Self {
            port: Arc::new(port),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn port(&self) -> &R {
        &self.port
    }
}

impl<R: RestartPort> RestartTimer for ThreadRestartTimer<R> {
    fn arm(&mut self, delay: Duration) {
        let armed = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let generation = Arc::clone(&self.generation);
        let port = Arc::clone(&self.port);

        let spawned = std::thread::Builder::new()
            .name("restart-timer".into())
            .spawn(move || {
                std::thread::sleep(delay);
                if generation.load(Ordering::Acquire) == armed {
                    info!("Restart: timer expired, restarting");
                    port.restart();
                }
            });
        if let Err(e) = spawned {
            error!("Restart: could not spawn timer thread: {}", e);
        }
    }
}

//! Device-level services: restart, deferred restart timer, build stamp.

use log::info;
#[cfg(not(target_os = "espidf"))]
use log::warn;

use crate::app::ports::RestartPort;

/// Compile date and time baked in by `build.rs`, in `__DATE__` / `__TIME__`
/// layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub date: &'static str,
    pub time: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            date: env!("OTAPORTAL_BUILD_DATE"),
            time: env!("OTAPORTAL_BUILD_TIME"),
        }
    }
}

// ── Hard restart ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SystemRestart {
    #[cfg(not(target_os = "espidf"))]
    requested: core::sync::atomic::AtomicU32,
}

impl SystemRestart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart requests seen so far (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn requests(&self) -> u32 {
        self.requested.load(core::sync::atomic::Ordering::SeqCst)
    }
}

impl RestartPort for SystemRestart {
    #[cfg(target_os = "espidf")]
    fn restart(&self) {
        info!("System: restarting");
        esp_idf_svc::hal::reset::restart();
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&self) {
        let n = self
            .requested
            .fetch_add(1, core::sync::atomic::Ordering::SeqCst)
            + 1;
        warn!("System: restart requested (simulation, #{})", n);
    }
}

// ── Deferred restart on the ESP timer service ─────────────────

#[cfg(target_os = "espidf")]
pub use esp::EspRestartTimer;

#[cfg(target_os = "espidf")]
mod esp {
    use core::time::Duration;

    use esp_idf_svc::timer::{EspTaskTimerService, EspTimer};
    use log::{error, info};

    use super::SystemRestart;
    use crate::app::ports::{RestartPort, RestartTimer};

    /// One-shot `esp_timer`; `after` re-arms the same handle, so a second
    /// arming replaces the first deadline.
    pub struct EspRestartTimer {
        timer: EspTimer<'static>,
    }

    impl EspRestartTimer {
        pub fn new() -> anyhow::Result<Self> {
            let service = EspTaskTimerService::new()?;
            let timer = service.timer(|| {
                info!("System: restart timer expired");
                SystemRestart::new().restart();
            })?;
            Ok(Self { timer })
        }
    }

    impl RestartTimer for EspRestartTimer {
        fn arm(&mut self, delay: Duration) {
            if let Err(e) = self.timer.cancel() {
                error!("System: restart timer cancel failed: {}", e);
            }
            if let Err(e) = self.timer.after(delay) {
                error!("System: restart timer arm failed: {}", e);
            }
        }
    }
}

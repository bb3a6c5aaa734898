//! Dual-slot firmware storage, backed by the `esp-ota` crate.
//!
//! Implements [`FirmwareStore`] over the ESP-IDF OTA partition API. On
//! host targets an in-memory two-partition flash stands in, with failure
//! injection for tests.

use log::{info, warn};

use crate::app::ports::{FirmwareStore, PartitionInfo};
use crate::error::StorageError;

// ── ESP-IDF store ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct EspFirmwareStore {
    update: Option<esp_ota::OtaUpdate>,
    completed: Option<esp_ota::CompletedOtaUpdate>,
}

#[cfg(target_os = "espidf")]
impl EspFirmwareStore {
    pub fn new() -> Self {
        Self {
            update: None,
            completed: None,
        }
    }

    fn describe(partition: *const esp_idf_sys::esp_partition_t) -> Option<PartitionInfo> {
        if partition.is_null() {
            return None;
        }
        // SAFETY: partition table entries are static for the life of the program.
        let p = unsafe { &*partition };
        let label = unsafe { core::ffi::CStr::from_ptr(p.label.as_ptr()) };
        Some(PartitionInfo {
            label: heapless::String::try_from(label.to_str().unwrap_or("?")).unwrap_or_default(),
            address: p.address,
            size: p.size,
        })
    }
}

#[cfg(target_os = "espidf")]
impl Default for EspFirmwareStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl FirmwareStore for EspFirmwareStore {
    fn begin(&mut self) -> Result<PartitionInfo, StorageError> {
        let target = Self::describe(unsafe {
            esp_idf_sys::esp_ota_get_next_update_partition(core::ptr::null())
        })
        .ok_or(StorageError::NoPartition)?;

        self.completed = None;
        let update = esp_ota::OtaUpdate::begin().map_err(|e| {
            warn!("esp-ota begin failed: {:?}", e);
            StorageError::BeginFailed
        })?;
        self.update = Some(update);
        Ok(target)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let update = self.update.as_mut().ok_or(StorageError::NotOpen)?;
        update.write(data).map_err(|e| {
            warn!("esp-ota write failed: {:?}", e);
            StorageError::WriteFailed
        })
    }

    fn finalize(&mut self) -> Result<(), StorageError> {
        let update = self.update.take().ok_or(StorageError::NotOpen)?;
        let completed = update.finalize().map_err(|e| {
            warn!("esp-ota finalize failed: {:?}", e);
            StorageError::FinalizeFailed
        })?;
        self.completed = Some(completed);
        Ok(())
    }

    fn activate(&mut self) -> Result<PartitionInfo, StorageError> {
        let completed = self.completed.as_mut().ok_or(StorageError::NotOpen)?;
        completed.set_as_boot_partition().map_err(|e| {
            warn!("esp-ota set_as_boot_partition failed: {:?}", e);
            StorageError::BootSetFailed
        })?;
        self.completed = None;
        Self::describe(unsafe { esp_idf_sys::esp_ota_get_boot_partition() })
            .ok_or(StorageError::BootSetFailed)
    }

    fn abort(&mut self) {
        // esp-ota aborts the session when OtaUpdate is dropped
        self.update.take();
        self.completed.take();
        warn!("OTA: session aborted, boot partition unchanged");
    }
}

/// Mark the running image valid so the bootloader keeps it.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!("OTA: firmware marked valid (rollback cancelled)"),
        Err(e) => warn!("OTA: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    info!("OTA rollback check (simulation): skipped");
}

// ── Simulation store ──────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub use sim::{Fault, SimFirmwareStore};

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::{FirmwareStore, PartitionInfo, StorageError, info, warn};

    const LABELS: [&str; 2] = ["ota_0", "ota_1"];
    const BASE: u32 = 0x1_0000;
    const SLOT_SIZE: u32 = 0x1E_0000;

    /// Step at which an injected failure fires.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Fault {
        Begin,
        /// Fail the write that would push the image past this many bytes.
        WriteAfter(usize),
        Finalize,
        Activate,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Session {
        Idle,
        Writing,
        Finalized,
    }

    /// Two app slots plus a boot pointer, all in RAM.
    #[derive(Debug)]
    pub struct SimFirmwareStore {
        slots: [Vec<u8>; 2],
        running: usize,
        boot: usize,
        session: Session,
        fault: Option<Fault>,
        aborts: u32,
    }

    impl SimFirmwareStore {
        pub fn new() -> Self {
            Self {
                slots: [Vec::new(), Vec::new()],
                running: 0,
                boot: 0,
                session: Session::Idle,
                fault: None,
                aborts: 0,
            }
        }

        pub fn with_fault(fault: Fault) -> Self {
            Self {
                fault: Some(fault),
                ..Self::new()
            }
        }

        pub fn running_slot(&self) -> usize {
            self.running
        }

        pub fn boot_slot(&self) -> usize {
            self.boot
        }

        pub fn slot(&self, index: usize) -> &[u8] {
            &self.slots[index]
        }

        pub fn inactive_slot(&self) -> usize {
            1 - self.running
        }

        pub fn aborts(&self) -> u32 {
            self.aborts
        }

        fn info(index: usize) -> PartitionInfo {
            PartitionInfo {
                label: heapless::String::try_from(LABELS[index]).unwrap_or_default(),
                address: BASE + SLOT_SIZE * index as u32,
                size: SLOT_SIZE,
            }
        }
    }

    impl Default for SimFirmwareStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FirmwareStore for SimFirmwareStore {
        fn begin(&mut self) -> Result<PartitionInfo, StorageError> {
            if self.fault == Some(Fault::Begin) {
                return Err(StorageError::BeginFailed);
            }
            let target = self.inactive_slot();
            self.slots[target].clear();
            self.session = Session::Writing;
            Ok(Self::info(target))
        }

        fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
            if self.session != Session::Writing {
                return Err(StorageError::NotOpen);
            }
            let target = self.inactive_slot();
            if let Some(Fault::WriteAfter(limit)) = self.fault {
                if self.slots[target].len() + data.len() > limit {
                    return Err(StorageError::WriteFailed);
                }
            }
            self.slots[target].extend_from_slice(data);
            Ok(())
        }

        fn finalize(&mut self) -> Result<(), StorageError> {
            if self.session != Session::Writing {
                return Err(StorageError::NotOpen);
            }
            if self.fault == Some(Fault::Finalize) {
                return Err(StorageError::FinalizeFailed);
            }
            self.session = Session::Finalized;
            Ok(())
        }

        fn activate(&mut self) -> Result<PartitionInfo, StorageError> {
            if self.session != Session::Finalized {
                return Err(StorageError::NotOpen);
            }
            if self.fault == Some(Fault::Activate) {
                return Err(StorageError::BootSetFailed);
            }
            self.boot = self.inactive_slot();
            self.session = Session::Idle;
            info!("OTA(sim): boot slot -> {}", LABELS[self.boot]);
            Ok(Self::info(self.boot))
        }

        fn abort(&mut self) {
            self.session = Session::Idle;
            self.aborts += 1;
            warn!("OTA(sim): session aborted");
        }
    }

}

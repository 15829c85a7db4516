//! Process-scoped handle around the acquisition service.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::domain::error::AcquisitionError;
use crate::domain::ports::{AcquiredPsf, AcquisitionService};

/// Owns the acquisition service for the lifetime of the process.
///
/// The service is released exactly once, by `shutdown` or on drop,
/// whichever comes first. Acquiring afterwards fails with
/// `AcquisitionError::BridgeClosed`.
pub struct AcquisitionBridge {
    service: Mutex<Option<Arc<dyn AcquisitionService>>>,
}

impl AcquisitionBridge {
    pub fn start(service: Arc<dyn AcquisitionService>) -> Self {
        debug!("Acquisition bridge started");
        Self {
            service: Mutex::new(Some(service)),
        }
    }

    pub fn acquire(&self, path: &Path) -> Result<AcquiredPsf, AcquisitionError> {
        // Clone out so a slow read does not hold the lock
        let service = self
            .service
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(AcquisitionError::BridgeClosed)?;
        service.acquire(path)
    }

    pub fn is_open(&self) -> bool {
        self.service
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Release the service; later calls are no-ops
    pub fn shutdown(&self) {
        let service = self
            .service
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(service) = service {
            service.shutdown();
            info!("Acquisition bridge shut down");
        }
    }
}

impl Drop for AcquisitionBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingService {
        shutdowns: AtomicU32,
    }

    impl AcquisitionService for CountingService {
        fn acquire(&self, path: &Path) -> Result<AcquiredPsf, AcquisitionError> {
            Err(AcquisitionError::UnsupportedFormat(path.to_path_buf()))
        }

        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_shutdown_once_on_every_path() {
        let service = Arc::new(CountingService::default());
        let bridge = AcquisitionBridge::start(service.clone());
        assert!(bridge.is_open());

        bridge.shutdown();
        bridge.shutdown();
        drop(bridge);
        assert_eq!(service.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_service() {
        let service = Arc::new(CountingService::default());
        drop(AcquisitionBridge::start(service.clone()));
        assert_eq!(service.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_acquire_after_shutdown_fails() {
        let bridge = AcquisitionBridge::start(Arc::new(CountingService::default()));
        bridge.shutdown();
        assert!(matches!(
            bridge.acquire(Path::new("psf.json")),
            Err(AcquisitionError::BridgeClosed)
        ));
    }
}

//! Where new contexts get their engine from.
//!
//! Without an installed provider, contexts use the in-memory engine with the
//! world named by `PKGBRIDGE_WORLD` (an empty world when unset).

use std::sync::{Mutex, PoisonError};

use pkgbridge_engine::{EngineError, EngineProvider, MemoryProvider, PackageEngine};
use tracing::debug;

type SharedProvider = Box<dyn EngineProvider + Send>;

static PROVIDER: Mutex<Option<SharedProvider>> = Mutex::new(None);

/// Use `provider` for every context initialized from now on.
pub fn install(provider: impl EngineProvider + Send + 'static) {
    *PROVIDER.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(provider));
    debug!("engine provider installed");
}

/// Go back to the environment-configured default.
pub fn reset() {
    PROVIDER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
}

pub(crate) fn engine() -> Result<Box<dyn PackageEngine>, EngineError> {
    let provider = PROVIDER.lock().unwrap_or_else(PoisonError::into_inner);
    match provider.as_ref() {
        Some(provider) => provider.engine(),
        None => MemoryProvider::from_env()?.engine(),
    }
}

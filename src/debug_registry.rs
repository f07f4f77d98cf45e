//! Debug-only service registry.
//!
//! Development tooling (REPL sessions, diagnostic endpoints) sometimes needs
//! a handle on a live service without threading it through every call site.
//! Services register themselves here at startup; in release builds both
//! registration and lookup compile to no-ops and nothing is retained.

use std::any::Any;
use std::sync::Arc;

#[cfg(debug_assertions)]
type Entry = Arc<dyn Any + Send + Sync>;

#[cfg(debug_assertions)]
fn registry() -> &'static std::sync::Mutex<std::collections::HashMap<&'static str, Entry>> {
    use std::sync::OnceLock;
    static REGISTRY: OnceLock<
        std::sync::Mutex<std::collections::HashMap<&'static str, Entry>>,
    > = OnceLock::new();
    REGISTRY.get_or_init(Default::default)
}

/// Register a service handle under a name. Last registration wins, so a
/// restarted test harness can re-register freely.
#[cfg(debug_assertions)]
pub fn register<T: Any + Send + Sync>(name: &'static str, service: Arc<T>) {
    registry().lock().unwrap().insert(name, service);
}

#[cfg(not(debug_assertions))]
pub fn register<T: Any + Send + Sync>(_name: &'static str, _service: Arc<T>) {}

/// Look up a previously registered handle. None when the name is unknown or
/// was registered under a different type.
#[cfg(debug_assertions)]
pub fn resolve<T: Any + Send + Sync>(name: &str) -> Option<Arc<T>> {
    registry()
        .lock()
        .unwrap()
        .get(name)
        .cloned()
        .and_then(|entry| entry.downcast::<T>().ok())
}

#[cfg(not(debug_assertions))]
pub fn resolve<T: Any + Send + Sync>(_name: &str) -> Option<Arc<T>> {
    None
}

/// Names of all registered services, for diagnostics listings
#[cfg(debug_assertions)]
pub fn registered_names() -> Vec<&'static str> {
    registry().lock().unwrap().keys().copied().collect()
}

#[cfg(not(debug_assertions))]
pub fn registered_names() -> Vec<&'static str> {
    Vec::new()
}

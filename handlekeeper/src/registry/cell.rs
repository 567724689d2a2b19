//! Process-wide registry slot.

use std::sync::{Arc, OnceLock};

use super::ResourceRegistry;
use crate::resource::ResourceFactory;

/// A lazily initialised, process-wide [`ResourceRegistry`].
///
/// Meant for `static` items in code whose lifecycle callbacks cannot carry a
/// registry reference:
///
/// ```rust,ignore
/// static SESSIONS: RegistryCell<BrowserFactory> = RegistryCell::new();
///
/// let registry = SESSIONS.get_or_init(|| ResourceRegistry::new(BrowserFactory::default()));
/// ```
///
/// Construction runs at most once however many threads race to initialise
/// the cell; losers block until the winner publishes and then observe the
/// same instance. After initialisation every access is a single acquire load.
pub struct RegistryCell<F: ResourceFactory> {
    slot: OnceLock<Arc<ResourceRegistry<F>>>,
}

impl<F: ResourceFactory> RegistryCell<F> {
    /// Creates an empty cell.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Returns the registry, constructing it with `init` on first use.
    pub fn get_or_init<I>(&self, init: I) -> Arc<ResourceRegistry<F>>
    where
        I: FnOnce() -> ResourceRegistry<F>,
    {
        Arc::clone(self.slot.get_or_init(|| {
            tracing::debug!("Initialising process-wide resource registry");
            Arc::new(init())
        }))
    }

    /// Returns the registry if it has been constructed.
    #[must_use]
    pub fn get(&self) -> Option<Arc<ResourceRegistry<F>>> {
        self.slot.get().cloned()
    }

    /// Returns true once the registry has been constructed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<F: ResourceFactory> Default for RegistryCell<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ResourceFactory> std::fmt::Debug for RegistryCell<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCell")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

//! Provider registry
//!
//! Maps each machine type to the factory that builds its firewall
//! provider, so the binary never branches on `MType` itself.
//!
//! ## Registration
//!
//! Provider crates expose a `register()` function:
//!
//! ```rust,ignore
//! let registry = ProviderRegistry::new();
//! qcip_provider_tencent::register(&registry);
//!
//! let provider = registry.create_provider(&config)?;
//! ```

use crate::config::{Config, MachineType};
use crate::error::{Error, Result};
use crate::traits::{FirewallProvider, FirewallProviderFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry of firewall provider factories
///
/// Uses interior mutability so registration works through `&self`.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<MachineType, Box<dyn FirewallProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for a machine type, replacing any previous one
    pub fn register_provider(
        &self,
        machine_type: MachineType,
        factory: Box<dyn FirewallProviderFactory>,
    ) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.insert(machine_type, factory);
    }

    /// Build the provider for the config's target
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn FirewallProvider>)`: Created provider instance
    /// - `Err(Error)`: If nothing is registered for the machine type or
    ///   the factory fails
    pub fn create_provider(&self, config: &Config) -> Result<Box<dyn FirewallProvider>> {
        let machine_type = config.machine_type();
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = providers.get(&machine_type).ok_or_else(|| {
            Error::config(format!("No provider registered for machine type {machine_type}"))
        })?;

        factory.create(config)
    }

    /// Check if a machine type has a provider
    pub fn has_provider(&self, machine_type: MachineType) -> bool {
        self.providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&machine_type)
    }
}

use crate::context::PluginContext;
use crate::traits::{Interceptor, PluginDescriptor, ProxyPlugin};
use apiferry_common::{ProxyError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Per-plugin runtime configuration held by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginConfig {
    pub enabled: bool,
    /// Effective priority; defaults to the plugin's declared priority
    pub priority: u16,
}

/// Partial update for [`PluginConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginConfigPatch {
    pub enabled: Option<bool>,
    pub priority: Option<u16>,
}

struct Registered {
    plugin: Arc<dyn ProxyPlugin>,
    config: PluginConfig,
}

/// Registry manages all registered plugins and their enabled/priority state.
///
/// Storage is a `Vec` so equal-priority plugins keep a deterministic
/// registration-order tie-break; ordering never depends on map iteration.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Registered>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Register a plugin with its declared priority, enabled.
    pub fn register(&mut self, plugin: Arc<dyn ProxyPlugin>) {
        let priority = plugin.descriptor().priority;
        self.register_with(
            plugin,
            PluginConfig {
                enabled: true,
                priority,
            },
        );
    }

    /// Register a plugin with an explicit configuration. Re-registering an
    /// id overwrites the previous entry in place, keeping its tie-break
    /// position.
    pub fn register_with(&mut self, plugin: Arc<dyn ProxyPlugin>, config: PluginConfig) {
        let id = plugin.descriptor().id;
        if let Some(slot) = self
            .plugins
            .iter_mut()
            .find(|r| r.plugin.descriptor().id == id)
        {
            slot.plugin = plugin;
            slot.config = config;
        } else {
            self.plugins.push(Registered { plugin, config });
        }
    }

    /// Create interceptors for every enabled plugin, in priority order
    /// (ascending; registration order breaks ties).
    ///
    /// A plugin whose factory fails is logged and skipped; partial
    /// initialization is acceptable and a broken plugin must not prevent the
    /// proxy from starting. Returns only the successfully created
    /// interceptors, in order.
    pub fn initialize(&self, ctx: &PluginContext) -> Vec<Box<dyn Interceptor>> {
        let mut active: Vec<&Registered> =
            self.plugins.iter().filter(|r| r.config.enabled).collect();
        // Stable sort preserves registration order for equal priorities
        active.sort_by_key(|r| r.config.priority);

        let mut interceptors = Vec::with_capacity(active.len());
        for registered in active {
            let descriptor = registered.plugin.descriptor();
            match registered.plugin.create(ctx) {
                Ok(interceptor) => {
                    info!(
                        plugin = %descriptor.id,
                        priority = registered.config.priority,
                        "Initialized plugin"
                    );
                    interceptors.push(interceptor);
                }
                Err(e) => {
                    warn!(plugin = %descriptor.id, error = %e, "Plugin initialization failed, skipping");
                }
            }
        }
        interceptors
    }

    /// Toggle a plugin at runtime; takes effect at the next `initialize`.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        let slot = self
            .plugins
            .iter_mut()
            .find(|r| r.plugin.descriptor().id == id)
            .ok_or_else(|| ProxyError::PluginNotFound(id.to_string()))?;
        slot.config.enabled = enabled;
        Ok(())
    }

    /// Descriptors of all registered plugins, in registration order.
    pub fn get_all(&self) -> Vec<PluginDescriptor> {
        self.plugins
            .iter()
            .map(|r| r.plugin.descriptor())
            .collect()
    }

    /// Current configuration for a plugin id.
    pub fn get_config(&self, id: &str) -> Option<PluginConfig> {
        self.plugins
            .iter()
            .find(|r| r.plugin.descriptor().id == id)
            .map(|r| r.config)
    }

    /// Apply a partial configuration update.
    pub fn update_config(&mut self, id: &str, patch: PluginConfigPatch) -> Result<()> {
        let slot = self
            .plugins
            .iter_mut()
            .find(|r| r.plugin.descriptor().id == id)
            .ok_or_else(|| ProxyError::PluginNotFound(id.to_string()))?;
        if let Some(enabled) = patch.enabled {
            slot.config.enabled = enabled;
        }
        if let Some(priority) = patch.priority {
            slot.config.priority = priority;
        }
        Ok(())
    }
}

//! Timer configuration for the coordinator.

use draftsafe_core::Millis;

pub const DEFAULT_LOCAL_DEBOUNCE_MS: Millis = 1_000;
pub const DEFAULT_PERIODIC_SYNC_MS: Millis = 30_000;
pub const DEFAULT_DRAFT_FRESHNESS_MS: Millis = 60 * 60 * 1_000;

/// Configuration for auto-save behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Quiet period before the latest content is written to the local cache.
    pub local_debounce_ms: Millis,
    /// Quiet period before a remote save. `None` means twice the local debounce.
    pub remote_debounce_ms: Option<Millis>,
    /// Interval of the background sync. Zero disables it.
    pub periodic_sync_ms: Millis,
    /// Drafts older than this are not offered for recovery.
    pub draft_freshness_ms: Millis,
}

impl AutoSaveConfig {
    /// Effective remote-save debounce.
    pub fn remote_debounce(&self) -> Millis {
        self.remote_debounce_ms
            .unwrap_or_else(|| self.local_debounce_ms.saturating_mul(2))
    }
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            local_debounce_ms: DEFAULT_LOCAL_DEBOUNCE_MS,
            remote_debounce_ms: None,
            periodic_sync_ms: DEFAULT_PERIODIC_SYNC_MS,
            draft_freshness_ms: DEFAULT_DRAFT_FRESHNESS_MS,
        }
    }
}

/// Builder for auto-save configuration.
pub struct AutoSaveConfigBuilder {
    config: AutoSaveConfig,
}

impl AutoSaveConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AutoSaveConfig::default(),
        }
    }

    pub fn local_debounce(mut self, ms: Millis) -> Self {
        self.config.local_debounce_ms = ms;
        self
    }

    pub fn remote_debounce(mut self, ms: Millis) -> Self {
        self.config.remote_debounce_ms = Some(ms);
        self
    }

    pub fn periodic_sync(mut self, ms: Millis) -> Self {
        self.config.periodic_sync_ms = ms;
        self
    }

    pub fn draft_freshness(mut self, ms: Millis) -> Self {
        self.config.draft_freshness_ms = ms;
        self
    }

    pub fn build(self) -> AutoSaveConfig {
        self.config
    }
}

impl Default for AutoSaveConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

use super::EngineConfig;
use std::sync::LazyLock;

const DEFAULT_CONFIG_JSON: &str = include_str!("../../../../config/default.json");

static DEFAULT_CONFIG: LazyLock<EngineConfig> = LazyLock::new(|| {
    serde_json::from_str(DEFAULT_CONFIG_JSON).expect("embedded default.json is valid")
});

/// The config shipped with the engine.
pub fn default_config() -> EngineConfig {
    DEFAULT_CONFIG.clone()
}

impl Default for EngineConfig {
    fn default() -> Self {
        default_config()
    }
}

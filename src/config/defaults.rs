//! Default configuration values for memory-tree

use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub engine: EngineDefaults,
    pub refresh: RefreshDefaults,
    pub logging: LoggingDefaults,
}

/// Default engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineDefaults {
    pub max_depth: usize,
    pub pointer_width: usize,
    pub verify_writes: bool,
}

/// Default refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshDefaults {
    pub interval_ms: u64,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
    pub format: String,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        engine: EngineDefaults {
            max_depth: 16,
            pointer_width: 8,
            verify_writes: true,
        },
        refresh: RefreshDefaults {
            interval_ms: 250, // 4 passes per second
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

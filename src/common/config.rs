//! Process-wide runtime configuration
//!
//! Worker count and the parallel disable switch are read from the
//! environment exactly once, at first use.

use std::sync::OnceLock;

/// Environment variable overriding the worker count.
pub const ENV_MAX_THREADS: &str = "FACET_MAX_THREADS";

/// Environment variable disabling parallel execution entirely.
pub const ENV_NO_PARALLEL: &str = "FACET_NO_PARALLEL";

/// Runtime configuration snapshot
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of worker threads
    pub max_threads: usize,
    /// Whether parallel primitives are allowed to run concurrently
    pub parallel_enabled: bool,
}

impl RuntimeConfig {
    fn from_env() -> Self {
        let max_threads = std::env::var(ENV_MAX_THREADS)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or_else(num_cpus::get);

        let no_parallel = std::env::var(ENV_NO_PARALLEL)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            max_threads,
            parallel_enabled: !no_parallel && max_threads > 1,
        }
    }
}

static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

/// Get the process-wide runtime configuration
pub fn runtime_config() -> &'static RuntimeConfig {
    CONFIG.get_or_init(RuntimeConfig::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = runtime_config();
        assert!(config.max_threads > 0);
        assert!(config.parallel_enabled || config.max_threads == 1 || !config.parallel_enabled);
    }
}

//! Configuration and system parameters for the multiply engine
//!
//! The configuration is an immutable value built once at start-up (defaults,
//! optionally overridden from the environment) and handed to the engine.
//! Nothing reads or mutates it behind the engine's back during a call.

use std::str::FromStr;
use tracing::{debug, warn};

use crate::constants::DEFAULT_NNZ_WEIGHT;
use crate::error::{Result, SpGemmError};
use crate::matrix::multiply::CpuStrategy;

/// System parameters for performance tuning
#[derive(Debug, Clone)]
pub struct SystemParameters {
    /// Number of host threads available to the CPU paths and the host device
    pub n_threads: usize,
    /// Overrides the device-reported maximum work-group size when set
    pub max_work_group_size: Option<usize>,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get(), // Use all available cores
            max_work_group_size: None,
        }
    }
}

/// Configuration for the heterogeneous multiply engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Weight applied to the NNZ estimate before comparing it with the dense cell count (>= 1)
    pub nnz_weight: usize,

    /// Always take the COO path on the device
    pub use_coo_always: bool,

    /// Bypass the compute device and multiply on the host
    pub disable_compute_device: bool,

    /// Run the CPU path when no compute context can be created, instead of failing
    pub fallback_to_cpu: bool,

    /// Only accept GPU devices when creating a context
    pub force_discrete_gpu: bool,

    /// Copy inputs into device memory instead of mapping host staging memory
    pub use_device_local_memory: bool,

    /// Free the session explicitly at the end of every call and log what was released
    pub force_release_after_call: bool,

    /// Size launches with the divisor heuristic instead of one work item per cell
    pub use_local_work_size_heuristic: bool,

    /// Count output non-zeros with the device NNZ kernel instead of on the host
    pub nnz_on_device: bool,

    /// Host algorithm used when the device is disabled
    pub cpu_strategy: CpuStrategy,

    /// System parameters for performance tuning
    pub system_params: SystemParameters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nnz_weight: DEFAULT_NNZ_WEIGHT,
            use_coo_always: false,
            disable_compute_device: false,
            fallback_to_cpu: false,
            force_discrete_gpu: true,
            use_device_local_memory: true,
            force_release_after_call: false,
            use_local_work_size_heuristic: true,
            nnz_on_device: true,
            cpu_strategy: CpuStrategy::default(),
            system_params: SystemParameters::default(),
        }
    }
}

impl EngineConfig {
    /// Host-only configuration
    pub fn cpu_only() -> Self {
        Self {
            disable_compute_device: true,
            ..Self::default()
        }
    }

    /// Defaults overridden by `SPGEMM_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `SPGEMM_*` key
    ///
    /// Values that fail to parse, or an `SPGEMM_NNZ_WEIGHT` below 1, are ignored
    /// and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(weight) = parse_var::<usize, _>(&lookup, "SPGEMM_NNZ_WEIGHT") {
            if weight >= 1 {
                config.nnz_weight = weight;
            } else {
                warn!(weight, "SPGEMM_NNZ_WEIGHT must be at least 1, keeping default");
            }
        }
        override_flag(&lookup, "SPGEMM_USE_COO", &mut config.use_coo_always);
        override_flag(&lookup, "SPGEMM_NO_DEVICE", &mut config.disable_compute_device);
        override_flag(&lookup, "SPGEMM_CPU_FALLBACK", &mut config.fallback_to_cpu);
        override_flag(&lookup, "SPGEMM_FORCE_GPU", &mut config.force_discrete_gpu);
        override_flag(&lookup, "SPGEMM_USE_DEVICE_MEM", &mut config.use_device_local_memory);
        override_flag(&lookup, "SPGEMM_FORCE_RELEASE", &mut config.force_release_after_call);
        override_flag(&lookup, "SPGEMM_LOCAL_WORK_SIZE", &mut config.use_local_work_size_heuristic);
        override_flag(&lookup, "SPGEMM_NNZ_ON_DEVICE", &mut config.nnz_on_device);
        if let Some(strategy) = parse_var::<CpuStrategy, _>(&lookup, "SPGEMM_CPU_STRATEGY") {
            config.cpu_strategy = strategy;
        }
        if let Some(size) = parse_var::<usize, _>(&lookup, "SPGEMM_MAX_WORK_GROUP_SIZE") {
            config.system_params.max_work_group_size = Some(size);
        }

        config
    }

    /// Rejects settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.nnz_weight == 0 {
            return Err(SpGemmError::InvalidConfig("nnz_weight must be at least 1".to_string()));
        }
        if self.system_params.max_work_group_size == Some(0) {
            return Err(SpGemmError::InvalidConfig(
                "max_work_group_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => {
            debug!(key, value = %raw.trim(), "configuration override");
            Some(value)
        }
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}

fn override_flag<F>(lookup: &F, key: &str, target: &mut bool)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(flag) = parse_var::<bool, _>(lookup, key) {
        *target = flag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.nnz_weight, 3);
        assert!(!config.use_coo_always);
        assert!(!config.disable_compute_device);
        assert!(!config.fallback_to_cpu);
        assert!(config.use_local_work_size_heuristic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("SPGEMM_NNZ_WEIGHT", "1"),
            ("SPGEMM_USE_COO", "true"),
            ("SPGEMM_NO_DEVICE", "true"),
            ("SPGEMM_CPU_STRATEGY", "dense"),
            ("SPGEMM_MAX_WORK_GROUP_SIZE", "64"),
        ]));

        assert_eq!(config.nnz_weight, 1);
        assert!(config.use_coo_always);
        assert!(config.disable_compute_device);
        assert_eq!(config.cpu_strategy, CpuStrategy::Dense);
        assert_eq!(config.system_params.max_work_group_size, Some(64));
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("SPGEMM_NNZ_WEIGHT", "0"),
            ("SPGEMM_USE_COO", "maybe"),
            ("SPGEMM_CPU_STRATEGY", "quantum"),
        ]));

        assert_eq!(config.nnz_weight, DEFAULT_NNZ_WEIGHT);
        assert!(!config.use_coo_always);
        assert_eq!(config.cpu_strategy, CpuStrategy::Merge);
    }

    #[test]
    fn test_validate_rejects_zero_weight() {
        let config = EngineConfig {
            nnz_weight: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(SpGemmError::InvalidConfig(_))));
    }
}

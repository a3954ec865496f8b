//! Process-wide driver settings
//!
//! Built once before the scenario loop and passed to the driver by value;
//! nothing reads the environment after that.

use serde::Serialize;

use crate::error::{ForgeError, ForgeResult};
use crate::tensor::DataType;

const DEBUG_ENV: &str = "SAMPLEFORGE_DEBUG";
const PROFILE_ENV: &str = "SAMPLEFORGE_PROFILE";
const NUM_PRERUN_ENV: &str = "SAMPLEFORGE_NUM_PRERUN";
const NUM_ITERATIONS_ENV: &str = "SAMPLEFORGE_NUM_ITERATIONS";
const SEED_ENV: &str = "SAMPLEFORGE_SEED";
const DTYPE_ENV: &str = "SAMPLEFORGE_DTYPE";

/// Mixes a scenario ordinal into the base seed
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Configuration for the equivalence driver
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverConfig {
    /// Log both indices and scores for every scenario
    pub debug: bool,

    /// Time reference and operator after the check
    pub profile: bool,

    /// Untimed warm-up calls per profiled path
    pub num_prerun: usize,

    /// Timed calls per profiled path
    pub num_iterations: usize,

    /// Base seed for score permutations
    pub seed: u64,

    /// Element type of the generated scores
    pub dtype: DataType,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            debug: false,
            profile: false,
            num_prerun: 10,
            num_iterations: 1000,
            seed: 0,
            dtype: DataType::F16,
        }
    }
}

fn parse_flag(name: &str, value: &str) -> ForgeResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ForgeError::InvalidConfiguration(format!(
            "{}: expected a boolean, got '{}'",
            name, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> ForgeResult<T> {
    value.trim().parse().map_err(|_| {
        ForgeError::InvalidConfiguration(format!("{}: expected a number, got '{}'", name, value))
    })
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by any `SAMPLEFORGE_*` variable that is set
    pub fn from_env() -> ForgeResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> ForgeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = DriverConfig::default();
        if let Some(v) = lookup(DEBUG_ENV) {
            config.debug = parse_flag(DEBUG_ENV, &v)?;
        }
        if let Some(v) = lookup(PROFILE_ENV) {
            config.profile = parse_flag(PROFILE_ENV, &v)?;
        }
        if let Some(v) = lookup(NUM_PRERUN_ENV) {
            config.num_prerun = parse_number(NUM_PRERUN_ENV, &v)?;
        }
        if let Some(v) = lookup(NUM_ITERATIONS_ENV) {
            config.num_iterations = parse_number(NUM_ITERATIONS_ENV, &v)?;
        }
        if let Some(v) = lookup(SEED_ENV) {
            config.seed = parse_number(SEED_ENV, &v)?;
        }
        if let Some(v) = lookup(DTYPE_ENV) {
            config.dtype = v
                .parse()
                .map_err(|e| ForgeError::InvalidConfiguration(format!("{}: {}", DTYPE_ENV, e)))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_num_prerun(mut self, num_prerun: usize) -> Self {
        self.num_prerun = num_prerun;
        self
    }

    pub fn with_num_iterations(mut self, num_iterations: usize) -> Self {
        self.num_iterations = num_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Scores must be a floating-point type
    pub fn validate(&self) -> ForgeResult<()> {
        if !self.dtype.is_score_type() {
            return Err(ForgeError::InvalidConfiguration(format!(
                "dtype {} cannot hold scores (use f16, bf16, f32 or f64)",
                self.dtype
            )));
        }
        Ok(())
    }

    /// Permutation seed for the scenario at `ordinal`
    pub fn scenario_seed(&self, ordinal: usize) -> u64 {
        self.seed ^ (ordinal as u64).wrapping_mul(SEED_MIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert!(!config.debug);
        assert!(!config.profile);
        assert_eq!(config.num_prerun, 10);
        assert_eq!(config.num_iterations, 1000);
        assert_eq!(config.dtype, DataType::F16);
    }

    #[test]
    fn test_lookup_overrides() {
        let config = DriverConfig::from_lookup(lookup(&[
            ("SAMPLEFORGE_DEBUG", "true"),
            ("SAMPLEFORGE_NUM_ITERATIONS", "25"),
            ("SAMPLEFORGE_SEED", "42"),
            ("SAMPLEFORGE_DTYPE", "f32"),
        ]))
        .unwrap();
        assert!(config.debug);
        assert!(!config.profile);
        assert_eq!(config.num_iterations, 25);
        assert_eq!(config.seed, 42);
        assert_eq!(config.dtype, DataType::F32);
    }

    #[test]
    fn test_unparsable_values_rejected() {
        for vars in [
            [("SAMPLEFORGE_PROFILE", "maybe")],
            [("SAMPLEFORGE_NUM_PRERUN", "-3")],
            [("SAMPLEFORGE_DTYPE", "u64")],
            [("SAMPLEFORGE_DTYPE", "f128")],
        ] {
            let err = DriverConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, ForgeError::InvalidConfiguration(_)), "{:?}", vars);
        }
    }

    #[test]
    fn test_scenario_seeds_differ() {
        let config = DriverConfig::new().with_seed(7);
        assert_eq!(config.scenario_seed(0), 7);
        assert_ne!(config.scenario_seed(1), config.scenario_seed(2));
    }
}

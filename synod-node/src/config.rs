use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use synod_common::{Result, SynodError};
use synod_consensus::ProcessConfig;

/// Parameters of one experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of processes.
    pub n: usize,
    /// Processes that get a non-zero crash probability.
    pub f: usize,
    /// Crash probability of each faulty process, checked per message.
    pub alpha: f64,
    /// Pause between setup and launch.
    pub init_ms: u64,
    /// Leader election timeout: time between launch and hold.
    pub hold_ms: u64,
    /// Time from launch until the report is taken.
    pub run_ms: u64,
    pub retry_min_ms: u64,
    pub retry_max_ms: u64,
    /// Fixed seed for a reproducible run; drawn from the OS when absent.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            n: 50,
            f: 10,
            alpha: 0.1,
            init_ms: 100,
            hold_ms: 50,
            run_ms: 10_000,
            retry_min_ms: 1,
            retry_max_ms: 10,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(SynodError::Config("n must be at least 1".into()));
        }
        if self.f > self.n {
            return Err(SynodError::Config(format!("f ({}) exceeds n ({})", self.f, self.n)));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(SynodError::Config(format!("alpha ({}) must lie in [0, 1]", self.alpha)));
        }
        if self.retry_min_ms > self.retry_max_ms {
            return Err(SynodError::Config(format!(
                "retry_min_ms ({}) exceeds retry_max_ms ({})",
                self.retry_min_ms, self.retry_max_ms
            )));
        }
        Ok(())
    }

    /// Settings handed to a process whose generator starts from `seed`.
    pub fn process_config(&self, seed: u64) -> ProcessConfig {
        ProcessConfig {
            retry_min_ms: self.retry_min_ms,
            retry_max_ms: self.retry_max_ms,
            seed,
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(path, json)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str::<RunConfig>(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_experiment() {
        let config = RunConfig::default();
        assert_eq!((config.n, config.f), (50, 10));
        assert_eq!(config.alpha, 0.1);
        assert_eq!((config.init_ms, config.hold_ms, config.run_ms), (100, 50, 10_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            RunConfig { n: 0, f: 0, ..Default::default() },
            RunConfig { n: 3, f: 4, ..Default::default() },
            RunConfig { alpha: 1.5, ..Default::default() },
            RunConfig { alpha: f64::NAN, ..Default::default() },
            RunConfig { retry_min_ms: 20, retry_max_ms: 5, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(SynodError::Config(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: RunConfig = serde_json::from_str(r#"{ "n": 3, "seed": 9 }"#).unwrap();
        assert_eq!(config.n, 3);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.f, 10);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let config = RunConfig { n: 7, f: 3, alpha: 0.5, seed: Some(1), ..Default::default() };
        config.save_to_file(&path).unwrap();
        assert_eq!(RunConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_process_config_carries_retry_bounds() {
        let config = RunConfig { retry_min_ms: 2, retry_max_ms: 4, ..Default::default() };
        let a = config.process_config(5);
        assert_eq!((a.retry_min_ms, a.retry_max_ms), (2, 4));
        assert_eq!(a.seed, 5);
    }
}

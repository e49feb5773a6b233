//! Pass configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Path to a newline-separated list of filename suffixes to instrument.
pub const ENV_WHITELIST: &str = "AFL_INST_WHITELIST";
/// Suppress the banner and summary.
pub const ENV_QUIET: &str = "AFL_QUIET";
/// Percentage of eligible blocks to instrument.
pub const ENV_INST_RATIO: &str = "AFL_INST_RATIO";
/// Hardened build; only changes the summary text.
pub const ENV_HARDEN: &str = "AFL_HARDEN";

/// Instrumentation density: percent of eligible blocks, in `1..=100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstRatio(u32);

impl InstRatio {
    pub const FULL: Self = Self(100);

    /// Create a ratio, rejecting values outside `1..=100`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::BadRatio` for out-of-range values.
    pub fn new(percent: u32) -> Result<Self, ConfigError> {
        if (1..=100).contains(&percent) {
            Ok(Self(percent))
        } else {
            Err(ConfigError::BadRatio {
                value: percent.to_string(),
            })
        }
    }

    #[must_use]
    pub const fn percent(self) -> u32 {
        self.0
    }
}

impl Default for InstRatio {
    fn default() -> Self {
        Self::FULL
    }
}

impl FromStr for InstRatio {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::BadRatio {
            value: s.to_string(),
        };
        let percent: u32 = s.trim().parse().map_err(|_| bad())?;
        Self::new(percent).map_err(|_| bad())
    }
}

impl fmt::Display for InstRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Configuration for one run of the coverage pass.
#[derive(Clone, Debug, Default)]
pub struct InstrumentConfig {
    /// Whitelist file. `None` instruments every file.
    pub whitelist: Option<PathBuf>,
    /// Density of instrumentation.
    pub ratio: InstRatio,
    /// Suppress the operator banner and summary.
    pub quiet: bool,
    /// Report the build as hardened.
    pub hardened: bool,
    /// Fixed RNG seed. `None` seeds from OS entropy, so location ids differ
    /// between runs.
    pub seed: Option<u64>,
}

impl InstrumentConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `AFL_INST_WHITELIST`, `AFL_QUIET`, `AFL_INST_RATIO` and
    /// `AFL_HARDEN` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `AFL_INST_RATIO` is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Presence of `AFL_QUIET` or
    /// `AFL_HARDEN` enables them regardless of value.
    ///
    /// # Errors
    ///
    /// Returns an error if the ratio is set but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ratio = match lookup(ENV_INST_RATIO) {
            Some(value) => value.parse()?,
            None => InstRatio::default(),
        };
        Ok(Self {
            whitelist: lookup(ENV_WHITELIST).map(PathBuf::from),
            ratio,
            quiet: lookup(ENV_QUIET).is_some(),
            hardened: lookup(ENV_HARDEN).is_some(),
            seed: None,
        })
    }

    #[must_use]
    pub fn with_whitelist(mut self, path: impl Into<PathBuf>) -> Self {
        self.whitelist = Some(path.into());
        self
    }

    #[must_use]
    pub const fn with_ratio(mut self, ratio: InstRatio) -> Self {
        self.ratio = ratio;
        self
    }

    #[must_use]
    pub const fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    #[must_use]
    pub const fn with_hardened(mut self, hardened: bool) -> Self {
        self.hardened = hardened;
        self
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_ratio_bounds() {
        assert_eq!("1".parse::<InstRatio>().map(InstRatio::percent).ok(), Some(1));
        assert_eq!("100".parse::<InstRatio>().map(InstRatio::percent).ok(), Some(100));
        assert_eq!(" 42 ".parse::<InstRatio>().map(InstRatio::percent).ok(), Some(42));
        for bad in ["0", "101", "abc", "", "-5", "50%"] {
            assert!(
                matches!(bad.parse::<InstRatio>(), Err(ConfigError::BadRatio { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = InstrumentConfig::from_lookup(|_| None).expect("empty env is valid");
        assert_eq!(config.ratio, InstRatio::FULL);
        assert!(config.whitelist.is_none());
        assert!(!config.quiet);
        assert!(!config.hardened);
    }

    #[test]
    fn test_reads_all_keys() {
        let config = InstrumentConfig::from_lookup(lookup(&[
            (ENV_WHITELIST, "/tmp/list.txt"),
            (ENV_QUIET, ""),
            (ENV_INST_RATIO, "25"),
            (ENV_HARDEN, "1"),
        ]))
        .expect("valid env");
        assert_eq!(config.whitelist, Some(PathBuf::from("/tmp/list.txt")));
        assert!(config.quiet);
        assert!(config.hardened);
        assert_eq!(config.ratio.percent(), 25);
    }

    #[test]
    fn test_bad_ratio_is_fatal() {
        for bad in ["0", "101", "lots"] {
            let err = InstrumentConfig::from_lookup(lookup(&[(ENV_INST_RATIO, bad)]))
                .expect_err("bad ratio must fail");
            assert!(err.to_string().contains("AFL_INST_RATIO"));
        }
    }
}

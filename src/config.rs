//! Configuration loading.
//!
//! Settings live in a JSON file (`nvme.json` in the working directory by
//! default). Every key is optional; accessors supply the defaults.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit settings file.
pub const CONFIG_PATH_ENV: &str = "NVME_REGRESS_CONFIG";

/// Settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "nvme.json";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    // Device. `ctrler` may also appear in nvme.json; it is read by the
    // test bodies, not here, and is ignored on load.
    /// Namespace under test.
    #[serde(alias = "namespace")]
    pub ns1: Option<String>,
    /// Device management tool.
    pub tool: Option<String>,
    /// Vendor flag passed in front of vendor-specific opcodes.
    pub vendor: Option<String>,

    // Test execution
    /// Test framework argv; the test target is appended.
    pub framework: Option<Vec<String>>,
    /// When set, exactly these catalog tests are enabled.
    #[serde(alias = "enabledTests")]
    pub enabled_tests: Option<Vec<String>>,

    // Output
    /// Directory under which per-run log directories are created.
    #[serde(alias = "logRoot")]
    pub log_root: Option<PathBuf>,
}

impl Config {
    /// Load settings for this process.
    ///
    /// Precedence: `explicit` path, then `NVME_REGRESS_CONFIG`, then
    /// `./nvme.json`, then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_with_env(explicit, &cwd, env_lookup)
    }

    pub fn load_with_env<F>(explicit: Option<&Path>, cwd: &Path, get_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = explicit {
            return Self::load_required(path);
        }
        if let Some(path) = get_env(CONFIG_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            return Self::load_required(Path::new(&path));
        }
        Self::load_from_path(&cwd.join(DEFAULT_CONFIG_FILE))
    }

    /// A file the operator named explicitly must exist.
    fn load_required(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::config(format!(
                "settings file {} does not exist",
                path.display()
            )));
        }
        Self::load_from_path(path)
    }

    /// Load settings from a specific path; a missing or empty file yields
    /// defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self =
            serde_json::from_str(&content).map_err(|e| Error::json(path, e))?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(config)
    }

    pub fn namespace(&self) -> &str {
        self.ns1.as_deref().unwrap_or("/dev/nvme0n1")
    }

    pub fn tool(&self) -> &str {
        self.tool.as_deref().unwrap_or("nvme")
    }

    pub fn vendor(&self) -> &str {
        self.vendor.as_deref().unwrap_or("marvell")
    }

    /// Framework argv without the target. Never empty.
    pub fn framework(&self) -> Vec<String> {
        match &self.framework {
            Some(argv) if !argv.is_empty() => argv.clone(),
            _ => ["nosetests", "-v", "--nocapture"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    pub fn log_root(&self) -> PathBuf {
        self.log_root.clone().unwrap_or_else(|| PathBuf::from("logs"))
    }
}

fn env_lookup(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

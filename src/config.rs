//! Runtime Configuration
//!
//! Tool locations, snapshot location, invocation timeout and the
//! identifier conventions used when correlating the three sources.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Placeholder substituted by the client GUID in the device name template
pub const GUID_PLACEHOLDER: &str = "{guid}";

// =============================================================================
// Tool Paths
// =============================================================================

/// Locations of the external tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    /// SAS controller utility (enumeration, display, locate)
    pub sas2ircu: PathBuf,
    /// OS device property dump
    pub prtconf: PathBuf,
    /// Pool status
    pub zpool: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            sas2ircu: PathBuf::from("/usr/sbin/sas2ircu"),
            prtconf: PathBuf::from("/usr/sbin/prtconf"),
            zpool: PathBuf::from("/usr/sbin/zpool"),
        }
    }
}

// =============================================================================
// Serial Rewrite Rules
// =============================================================================

/// Rewrites a vendor serial prefix so both sources spell it the same way
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialRule {
    pub prefix: String,
    pub replacement: String,
}

impl SerialRule {
    pub fn new(prefix: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            replacement: replacement.into(),
        }
    }
}

/// Rules known to be needed: prtconf reports Western Digital serials as
/// `WD-XXXX` while sas2ircu reports `WDXXXX`.
pub fn default_serial_rules() -> Vec<SerialRule> {
    vec![SerialRule::new("WD-", "WD")]
}

// =============================================================================
// Diskmap Configuration
// =============================================================================

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskmapConfig {
    /// External tool locations
    pub tools: ToolPaths,
    /// Where the topology snapshot is persisted
    pub snapshot_path: PathBuf,
    /// Upper bound for a single tool invocation, in seconds
    pub tool_timeout_secs: u64,
    /// Directory holding raw disk device nodes
    pub device_dir: String,
    /// Device node name derived from a client GUID
    pub device_template: String,
    /// Serial prefix rewrites applied to every serial before keying
    pub serial_rules: Vec<SerialRule>,
}

impl Default for DiskmapConfig {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            snapshot_path: PathBuf::from("/var/tmp/diskmap.json"),
            tool_timeout_secs: 30,
            device_dir: "/dev/rdsk/".to_string(),
            device_template: "c1t{guid}d0".to_string(),
            serial_rules: default_serial_rules(),
        }
    }
}

impl DiskmapConfig {
    /// Load configuration from a YAML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the discovery pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.tool_timeout_secs == 0 {
            return Err(Error::Configuration(
                "tool_timeout_secs must be greater than zero".into(),
            ));
        }
        if !self.device_template.contains(GUID_PLACEHOLDER) {
            return Err(Error::Configuration(format!(
                "device_template must contain {}",
                GUID_PLACEHOLDER
            )));
        }
        if self.device_dir.is_empty() {
            return Err(Error::Configuration("device_dir must not be empty".into()));
        }
        if self.serial_rules.iter().any(|r| r.prefix.is_empty()) {
            return Err(Error::Configuration(
                "serial rule prefix must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Tool invocation timeout
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Full device path for a client GUID, e.g. `/dev/rdsk/c1t5000C500D0A3B0F2d0`
    pub fn device_path(&self, guid: &str) -> String {
        format!(
            "{}{}",
            self.device_dir,
            self.device_template.replace(GUID_PLACEHOLDER, guid)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = DiskmapConfig::default();

        assert_eq!(config.tools.sas2ircu, PathBuf::from("/usr/sbin/sas2ircu"));
        assert_eq!(config.tool_timeout(), Duration::from_secs(30));
        assert_eq!(config.serial_rules, vec![SerialRule::new("WD-", "WD")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_device_path_from_guid() {
        let config = DiskmapConfig::default();
        assert_eq!(config.device_path("7"), "/dev/rdsk/c1t7d0");
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = DiskmapConfig::default();
        config.tool_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = DiskmapConfig::default();
        config.device_template = "c1t0d0".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "tool_timeout_secs: 5\ntools:\n  zpool: /sbin/zpool\nserial_rules:\n  - prefix: HGST-\n    replacement: HGST"
        )
        .unwrap();

        let config = DiskmapConfig::from_file(file.path()).unwrap();
        assert_eq!(config.tool_timeout_secs, 5);
        assert_eq!(config.tools.zpool, PathBuf::from("/sbin/zpool"));
        assert_eq!(config.tools.prtconf, PathBuf::from("/usr/sbin/prtconf"));
        assert_eq!(config.serial_rules, vec![SerialRule::new("HGST-", "HGST")]);
        assert_eq!(config.device_dir, "/dev/rdsk/");
    }
}

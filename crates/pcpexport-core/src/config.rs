//! Export configuration: which activities run, which memory details are
//! emitted, and which CPUs and interfaces are visible.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::visibility::{CpuBitmap, CpuSelection, DeviceFilter};

/// Error building an [`ExportConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// Activity name not recognised.
    UnknownActivity(String),
    /// I/O error reading a config file.
    Io(std::io::Error),
    /// Config file is not valid JSON for [`ExportConfig`].
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownActivity(name) => write!(f, "unknown activity '{}'", name),
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Parse(e) => write!(f, "invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// One statistics category.
///
/// Variants are declared in export order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Activity {
    Cpu,
    Pcsw,
    Irq,
    Swap,
    Paging,
    Io,
    Memory,
    Ktables,
    Queue,
    NetDev,
    NetEdev,
    Serial,
    Nfs,
    Nfsd,
}

impl Activity {
    pub const ALL: [Activity; 14] = [
        Activity::Cpu,
        Activity::Pcsw,
        Activity::Irq,
        Activity::Swap,
        Activity::Paging,
        Activity::Io,
        Activity::Memory,
        Activity::Ktables,
        Activity::Queue,
        Activity::NetDev,
        Activity::NetEdev,
        Activity::Serial,
        Activity::Nfs,
        Activity::Nfsd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Activity::Cpu => "cpu",
            Activity::Pcsw => "pcsw",
            Activity::Irq => "irq",
            Activity::Swap => "swap",
            Activity::Paging => "paging",
            Activity::Io => "io",
            Activity::Memory => "memory",
            Activity::Ktables => "ktables",
            Activity::Queue => "queue",
            Activity::NetDev => "net-dev",
            Activity::NetEdev => "net-edev",
            Activity::Serial => "serial",
            Activity::Nfs => "nfs",
            Activity::Nfsd => "nfsd",
        }
    }

    /// Parses a comma-separated list. `all` expands to every activity.
    /// The result is deduplicated and sorted in export order.
    pub fn parse_list(list: &str) -> Result<Vec<Activity>, ConfigError> {
        let mut out = Vec::new();
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if item.eq_ignore_ascii_case("all") {
                out.extend(Activity::ALL);
            } else {
                out.push(item.parse()?);
            }
        }
        out.sort();
        out.dedup();
        Ok(out)
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Activity::ALL
            .into_iter()
            .find(|a| a.name() == lower || a.name().replace('-', "_") == lower)
            .ok_or_else(|| ConfigError::UnknownActivity(s.to_string()))
    }
}

/// Which memory and swap fields the memory exporter emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryOptions {
    /// Memory utilisation fields.
    pub memory: bool,
    /// Swap utilisation fields.
    pub swap: bool,
    /// Extended memory fields (anon pages, slab, kernel stack, page tables,
    /// vmalloc). Only meaningful with `memory`.
    pub all: bool,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            memory: true,
            swap: true,
            all: false,
        }
    }
}

/// Full export configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub activities: Vec<Activity>,
    pub memory: MemoryOptions,
    /// CPU numbers to export (the aggregate is always included). `None` or an
    /// empty list exports every CPU.
    pub cpus: Option<Vec<usize>>,
    /// Interface allow-list for the network categories. `None` or an empty
    /// list exports every interface.
    pub interfaces: Option<Vec<String>>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            activities: Activity::ALL.to_vec(),
            memory: MemoryOptions::default(),
            cpus: None,
            interfaces: None,
        }
    }
}

impl ExportConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn is_enabled(&self, activity: Activity) -> bool {
        self.activities.contains(&activity)
    }

    pub fn cpu_selection(&self) -> CpuSelection {
        match &self.cpus {
            Some(cpus) if !cpus.is_empty() => {
                CpuSelection::from_bitmap(CpuBitmap::from_cpus(cpus.iter().copied()))
            }
            _ => CpuSelection::All,
        }
    }

    pub fn device_filter(&self) -> DeviceFilter {
        match &self.interfaces {
            Some(names) => DeviceFilter::only(names.iter().cloned()),
            None => DeviceFilter::all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_names_round_trip() {
        for a in Activity::ALL {
            assert_eq!(a.name().parse::<Activity>().unwrap(), a);
        }
        assert_eq!("NET_DEV".parse::<Activity>().unwrap(), Activity::NetDev);
    }

    #[test]
    fn unknown_activity_is_error() {
        let err = "disk".parse::<Activity>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownActivity(ref n) if n == "disk"));
        assert_eq!(err.to_string(), "unknown activity 'disk'");
    }

    #[test]
    fn parse_list_sorts_and_dedups() {
        let list = Activity::parse_list("serial, cpu,cpu,,memory").unwrap();
        assert_eq!(list, vec![Activity::Cpu, Activity::Memory, Activity::Serial]);
        assert_eq!(Activity::parse_list("ALL").unwrap(), Activity::ALL.to_vec());
    }

    #[test]
    fn default_config_exports_everything() {
        let cfg = ExportConfig::default();
        assert!(Activity::ALL.iter().all(|&a| cfg.is_enabled(a)));
        assert_eq!(cfg.cpu_selection(), CpuSelection::All);
        assert!(cfg.device_filter().is_visible("anything"));
        assert!(cfg.memory.memory && cfg.memory.swap && !cfg.memory.all);
    }

    #[test]
    fn json_config_with_partial_fields() {
        let cfg = ExportConfig::from_json_str(
            r#"{"activities":["cpu","net-dev"],"cpus":[1],"interfaces":["eth0"],"memory":{"all":true}}"#,
        )
        .unwrap();
        assert_eq!(cfg.activities, vec![Activity::Cpu, Activity::NetDev]);
        assert!(cfg.memory.memory);
        assert!(cfg.memory.all);
        let sel = cfg.cpu_selection();
        assert!(sel.is_visible(0));
        assert!(sel.is_visible(2));
        assert!(!sel.is_visible(1));
        assert!(!cfg.device_filter().is_visible("lo"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, r#"{"activities":["queue"]}"#).unwrap();
        let cfg = ExportConfig::load(&path).unwrap();
        assert_eq!(cfg.activities, vec![Activity::Queue]);

        let err = ExportConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = ExportConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}

//! Optional JSON configuration, `~/.itemaudit/config.json` by default.

use crate::ItemId;
use crate::aggregate::DEFAULT_TICK_INTERVAL;
use crate::augment::DEFAULT_ROW_TICK_INTERVAL;
use crate::decoder::DecoderConfig;
use crate::error::{AuditError, Result};
use crate::exclusion::ExclusionFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionConfig {
    /// Replaces the built-in list when set
    pub ids: Option<Vec<ItemId>>,
    pub extra_ids: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub record_interval: u64,
    pub row_interval: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            record_interval: DEFAULT_TICK_INTERVAL,
            row_interval: DEFAULT_ROW_TICK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub exclusion: ExclusionConfig,
    pub decoder: DecoderConfig,
    pub progress: ProgressConfig,
}

impl AuditConfig {
    /// `~/.itemaudit/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".itemaudit").join(CONFIG_FILE_NAME))
    }

    /// Loads `explicit` when given (it must exist), otherwise the default file
    /// if present, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(AuditError::Config(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        let config = Self::from_json(&text)
            .map_err(|e| AuditError::Config(format!("{}: {e}", path.display())))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn exclusion_filter(&self) -> ExclusionFilter {
        let mut filter = match &self.exclusion.ids {
            Some(ids) => ExclusionFilter::from_ids(ids.iter().copied()),
            None => ExclusionFilter::builtin(),
        };
        filter.extend(self.exclusion.extra_ids.iter().copied());
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusion::BUILTIN_EXCLUDED_IDS;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(AuditConfig::from_json("{}").unwrap(), AuditConfig::default());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = AuditConfig::from_json(
            r#"{"decoder": {"memory_limit_mb": 2048}, "progress": {"row_interval": 50}}"#,
        )
        .unwrap();
        assert_eq!(config.decoder.program, DecoderConfig::default().program);
        assert_eq!(config.decoder.memory_limit_mb, Some(2048));
        assert_eq!(config.progress.row_interval, 50);
        assert_eq!(config.progress.record_interval, DEFAULT_TICK_INTERVAL);
    }

    #[test]
    fn extra_ids_extend_builtin() {
        let config = AuditConfig::from_json(r#"{"exclusion": {"extra_ids": [9000]}}"#).unwrap();
        let filter = config.exclusion_filter();
        assert!(filter.is_excluded(9000));
        assert!(filter.is_excluded(BUILTIN_EXCLUDED_IDS[0]));
    }

    #[test]
    fn ids_replace_builtin() {
        let config =
            AuditConfig::from_json(r#"{"exclusion": {"ids": [1], "extra_ids": [2]}}"#).unwrap();
        let filter = config.exclusion_filter();
        assert_eq!(filter.len(), 2);
        assert!(!filter.is_excluded(BUILTIN_EXCLUDED_IDS[0]));
    }

    #[test]
    fn explicit_missing_file_is_fatal() {
        let err = AuditConfig::load(Some(Path::new("/no/such/config.json"))).unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
    }

    #[test]
    fn invalid_json_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = AuditConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("config.json"));
    }
}

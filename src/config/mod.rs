//! Engine Configuration
//!
//! Scan-region, merge, and lookup tunables stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::geometry::Rect;

/// Engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Scan region settings
    pub region: RegionConfig,
    /// Fragment merge settings
    pub merge: MergeConfig,
    /// Catalog lookup settings
    pub lookup: LookupConfig,
}

/// Area of interest within the camera view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Normalized rectangle fragments must intersect to be considered
    pub scan_region: Rect,
    /// Minimum interval between processed frames in milliseconds;
    /// frames arriving faster are dropped
    pub min_frame_interval_ms: u64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            scan_region: Rect::new(0.3, 0.42, 0.4, 0.08),
            min_frame_interval_ms: 100,
        }
    }
}

/// Thresholds for merging same-line adjacent fragments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Minimum vertical bounding-box overlap (fraction of frame height)
    /// for two fragments to count as the same visual line
    pub vertical_overlap: f32,
    /// Maximum horizontal gap (fraction of frame width) for two same-line
    /// fragments to count as adjacent
    pub horizontal_gap: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            vertical_overlap: 0.01,
            horizontal_gap: 0.03,
        }
    }
}

/// Catalog lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Minimum normalized key length worth searching; shorter keys
    /// resolve to no-match without a lookup
    pub min_key_length: usize,
    /// Page size requested from the catalog service
    pub page_size: usize,
    /// Base URL of the catalog service (used by the HTTP client)
    pub catalog_url: Option<String>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            min_key_length: 3,
            page_size: 10,
            catalog_url: None,
        }
    }
}

/// Default config file location for this user
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "partscan", "partscan")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &EngineConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_engine_config() {
        let config = EngineConfig::default();

        // Check region defaults
        assert!((config.region.scan_region.x - 0.3).abs() < 1e-6);
        assert!((config.region.scan_region.y - 0.42).abs() < 1e-6);
        assert!((config.region.scan_region.w - 0.4).abs() < 1e-6);
        assert!((config.region.scan_region.h - 0.08).abs() < 1e-6);
        assert_eq!(config.region.min_frame_interval_ms, 100);

        // Check merge defaults
        assert!((config.merge.vertical_overlap - 0.01).abs() < 1e-6);
        assert!((config.merge.horizontal_gap - 0.03).abs() < 1e-6);

        // Check lookup defaults
        assert_eq!(config.lookup.min_key_length, 3);
        assert_eq!(config.lookup.page_size, 10);
        assert!(config.lookup.catalog_url.is_none());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = EngineConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.lookup.min_key_length, parsed.lookup.min_key_length);
        assert_eq!(config.lookup.page_size, parsed.lookup.page_size);
        assert_eq!(
            config.region.min_frame_interval_ms,
            parsed.region.min_frame_interval_ms
        );
        assert!((config.merge.horizontal_gap - parsed.merge.horizontal_gap).abs() < 1e-6);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = EngineConfig::default();
        config.lookup.catalog_url = Some("http://catalog.local/api".to_string());
        config.lookup.page_size = 25;
        config.merge.horizontal_gap = 0.05;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(
            parsed.lookup.catalog_url,
            Some("http://catalog.local/api".to_string())
        );
        assert_eq!(parsed.lookup.page_size, 25);
        assert!((parsed.merge.horizontal_gap - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = EngineConfig::default();

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.lookup.page_size, loaded.lookup.page_size);
        assert_eq!(
            config.region.min_frame_interval_ms,
            loaded.region.min_frame_interval_ms
        );
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}

use anyhow::Context;
use log::{info, warn};
use poolwatchcore::interface::ZoneConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON file holding the operator-drawn pool and safe polygons.
#[derive(Debug, Clone)]
pub struct ZoneStore {
    path: PathBuf,
}

impl ZoneStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the zone file; a missing or unreadable file means "no zones".
    pub fn load(&self) -> ZoneConfig {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                info!(
                    "no zone file at {} ({}), monitoring the whole frame",
                    self.path.display(),
                    err
                );
                return ZoneConfig::default();
            }
        };
        match ZoneConfig::from_json(&contents) {
            Ok(config) => config,
            Err(err) => {
                warn!("ignoring zone file {}: {}", self.path.display(), err);
                ZoneConfig::default()
            }
        }
    }

    pub fn save(&self, config: &ZoneConfig) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let json = config.to_json_pretty().context("serialising zones")?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing zone file {}", self.path.display()))?;
        info!("zones saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_returns_same_polygons() {
        let dir = tempfile::tempdir().unwrap();
        let store = ZoneStore::new(dir.path().join("nested/zones.json"));
        let config = ZoneConfig {
            pool_zone: Some(vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]),
            safe_zone: None,
        };
        store.save(&config).unwrap();
        assert_eq!(store.load(), config);
    }

    #[test]
    fn missing_and_corrupt_files_fall_back_to_no_zones() {
        let dir = tempfile::tempdir().unwrap();
        let store = ZoneStore::new(dir.path().join("zones.json"));
        assert!(store.load().is_empty());
        fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_empty());
    }
}

//! Immutable lookup data for CDCARM URL resolution.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_DASHBOARD_ORIGIN: &str = "https://cdcarm.win.ansys.com";
pub const DEFAULT_PLATFORM_ID: &str = "1";
pub const DEFAULT_RELEASE_ID: &str = "217";
pub const DEFAULT_APPLICATION_ID: &str = "-1";

/// Name->id tables and fallback ids. Built once at startup and shared
/// read-only between conversations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CdcarmCatalog {
    pub dashboard_origin: String,
    pub default_platform_id: String,
    pub default_release_id: String,
    pub default_application_id: String,
    pub platforms: BTreeMap<String, String>,
    pub releases: BTreeMap<String, String>,
}

impl Default for CdcarmCatalog {
    fn default() -> Self {
        Self {
            dashboard_origin: DEFAULT_DASHBOARD_ORIGIN.to_string(),
            default_platform_id: DEFAULT_PLATFORM_ID.to_string(),
            default_release_id: DEFAULT_RELEASE_ID.to_string(),
            default_application_id: DEFAULT_APPLICATION_ID.to_string(),
            platforms: BTreeMap::from([
                ("windows".to_string(), "1".to_string()),
                ("linux".to_string(), "2".to_string()),
                ("mac".to_string(), "3".to_string()),
            ]),
            releases: BTreeMap::from([("25.2".to_string(), "217".to_string())]),
        }
    }
}

impl CdcarmCatalog {
    /// Parses a TOML catalog. Omitted keys keep their built-in values.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let parsed: Self = toml::from_str(raw).context("failed to parse cdcarm catalog")?;
        Ok(parsed.normalized())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read cdcarm catalog {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("invalid cdcarm catalog {}", path.display()))
    }

    /// Overrides the dashboard origin, keeping every other entry.
    pub fn with_dashboard_origin(mut self, origin: impl Into<String>) -> Self {
        self.dashboard_origin = origin.into();
        self.normalized()
    }

    fn normalized(mut self) -> Self {
        self.dashboard_origin = self.dashboard_origin.trim().trim_end_matches('/').to_string();
        self.platforms = self
            .platforms
            .into_iter()
            .map(|(name, id)| (name.trim().to_lowercase(), id))
            .collect();
        self.releases = self
            .releases
            .into_iter()
            .map(|(name, id)| (name.trim().to_string(), id))
            .collect();
        self
    }

    /// Maps a platform name to its id, case-insensitively. Unknown names pass through.
    pub fn platform_id_for(&self, name: &str) -> String {
        self.platforms
            .get(&name.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Maps a release name to its id. Unknown names pass through.
    pub fn release_id_for(&self, name: &str) -> String {
        self.releases
            .get(name.trim())
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_map_known_names() {
        let catalog = CdcarmCatalog::default();
        assert_eq!(catalog.platform_id_for("Windows"), "1");
        assert_eq!(catalog.platform_id_for("linux"), "2");
        assert_eq!(catalog.platform_id_for("MAC"), "3");
        assert_eq!(catalog.release_id_for("25.2"), "217");
    }

    #[test]
    fn unknown_names_pass_through_unchanged() {
        let catalog = CdcarmCatalog::default();
        assert_eq!(catalog.platform_id_for("solaris"), "solaris");
        assert_eq!(catalog.release_id_for("26.1"), "26.1");
    }

    #[test]
    fn toml_tables_replace_builtin_tables() {
        let catalog = CdcarmCatalog::from_toml_str(
            r#"
            dashboard_origin = "https://arm.example.test/"
            default_release_id = "220"

            [platforms]
            Windows = "1"
            "Linux-ARM" = "7"

            [releases]
            "26.1" = "220"
            "#,
        )
        .expect("catalog");

        assert_eq!(catalog.dashboard_origin, "https://arm.example.test");
        assert_eq!(catalog.default_platform_id, DEFAULT_PLATFORM_ID);
        assert_eq!(catalog.default_release_id, "220");
        assert_eq!(catalog.platform_id_for("linux-arm"), "7");
        assert_eq!(catalog.platform_id_for("linux"), "linux");
        assert_eq!(catalog.release_id_for("26.1"), "220");
        assert_eq!(catalog.release_id_for("25.2"), "25.2");
    }

    #[test]
    fn malformed_toml_is_reported() {
        let error = CdcarmCatalog::from_toml_str("platforms = 3").expect_err("bad catalog");
        assert!(error.to_string().contains("cdcarm catalog"));
    }

    #[test]
    fn load_reads_catalog_from_disk() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("catalog.toml");
        std::fs::write(&path, "[releases]\n\"25.1\" = \"210\"\n").expect("write");
        let catalog = CdcarmCatalog::load(&path).expect("load");
        assert_eq!(catalog.release_id_for("25.1"), "210");
    }
}

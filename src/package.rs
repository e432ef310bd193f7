//! LFA package descriptor (`.lfa/package.json`).

use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::assets::write_file;
use crate::error::Result;
use crate::util::random_suffix;

/// Directory below the destination root holding the descriptor.
pub const PACKAGE_DIR: &str = ".lfa";

/// Descriptor file name.
pub const PACKAGE_FILE: &str = "package.json";

/// Length of the random part of the package name.
const NAME_SUFFIX_LEN: usize = 5;

/// Settings for the generated descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConfig {
    /// Package names are `<name_prefix>-<random>`.
    pub name_prefix: String,
    pub version: String,
    /// Supported LFA engine range.
    pub engine: String,
    pub external_plugins: Vec<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name_prefix: "scorm".to_string(),
            version: "1.0.0".to_string(),
            engine: "^0.8.8".to_string(),
            external_plugins: vec!["https://plugins.lfwd.io/lfa-core/0.8/plugin".to_string()],
        }
    }
}

/// Contents of `.lfa/package.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    pub keywords: Vec<String>,
    pub book: BookInfo,
    pub engines: Engines,
    pub lfa: LfaSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookInfo {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Engines {
    pub lfa: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LfaSettings {
    pub compile_core: bool,
    pub external_plugins: Vec<String>,
}

impl PackageDescriptor {
    /// Build the descriptor for a book, naming it with a suffix drawn from `seed`.
    pub fn new(title: &str, config: &PackageConfig, seed: u64) -> Self {
        Self {
            name: format!(
                "{}-{}",
                config.name_prefix,
                random_suffix(seed, NAME_SUFFIX_LEN)
            ),
            version: config.version.clone(),
            keywords: vec!["lfa-book".to_string()],
            book: BookInfo {
                title: title.to_string(),
            },
            engines: Engines {
                lfa: config.engine.clone(),
            },
            lfa: LfaSettings {
                compile_core: false,
                external_plugins: config.external_plugins.clone(),
            },
        }
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the descriptor to `<dest_root>/.lfa/package.json`.
    pub async fn write(&self, dest_root: &Path) -> Result<PathBuf> {
        let path = descriptor_path(dest_root);
        write_file(&path, self.to_json()?.as_bytes()).await?;
        info!("{}", path.display());
        Ok(path)
    }
}

/// Location of the descriptor below `dest_root`.
pub fn descriptor_path(dest_root: &Path) -> PathBuf {
    dest_root.join(PACKAGE_DIR).join(PACKAGE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_json_shape() {
        let descriptor = PackageDescriptor::new("Intro to Rust", &PackageConfig::default(), 42);
        let json: serde_json::Value = serde_json::from_str(&descriptor.to_json().unwrap()).unwrap();

        let name = json["name"].as_str().unwrap();
        let suffix = name.strip_prefix("scorm-").unwrap();
        assert_eq!(suffix.len(), 5);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );

        assert_eq!(json["version"], "1.0.0");
        assert_eq!(json["keywords"], serde_json::json!(["lfa-book"]));
        assert_eq!(json["book"]["title"], "Intro to Rust");
        assert_eq!(json["engines"]["lfa"], "^0.8.8");
        assert_eq!(json["lfa"]["compileCore"], false);
        assert_eq!(
            json["lfa"]["externalPlugins"],
            serde_json::json!(["https://plugins.lfwd.io/lfa-core/0.8/plugin"])
        );
    }

    #[test]
    fn test_json_is_indented_two_spaces() {
        let descriptor = PackageDescriptor::new("T", &PackageConfig::default(), 1);
        let json = descriptor.to_json().unwrap();
        assert!(json.contains("\n  \"version\": \"1.0.0\""), "{json}");
    }

    #[test]
    fn test_name_prefix_is_configurable() {
        let config = PackageConfig {
            name_prefix: "course".to_string(),
            ..PackageConfig::default()
        };
        let descriptor = PackageDescriptor::new("T", &config, 7);
        assert!(descriptor.name.starts_with("course-"));
    }

    #[tokio::test]
    async fn test_write_creates_lfa_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let descriptor = PackageDescriptor::new("T", &PackageConfig::default(), 3);
        let path = descriptor.write(dir.path()).await.unwrap();

        assert_eq!(path, dir.path().join(".lfa").join("package.json"));
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(written, descriptor.to_json().unwrap());
    }
}

use serde::Deserialize;
use std::path::PathBuf;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawHiveConfig {
    #[serde(default)]
    pub paths: RawPathsConfig,

    #[serde(default)]
    pub git: RawGitConfig,

    #[serde(default)]
    pub build: RawBuildConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPathsConfig {
    /// Root of the restore cache
    pub cache_dir: Option<PathBuf>,

    /// Location of the package reference document
    pub references_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawGitConfig {
    /// Program invoked for git operations
    pub program: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBuildConfig {
    /// Build program
    pub program: Option<String>,

    /// Build arguments, may use `{entrypoint}`, `{output}` and `{source}`
    pub args: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        let raw: RawHiveConfig = toml::from_str("").unwrap();
        assert!(raw.paths.cache_dir.is_none());
        assert!(raw.git.program.is_none());
        assert!(raw.build.args.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let raw: RawHiveConfig = toml::from_str(
            r#"
            [paths]
            cache_dir = "/var/cache/hive"

            [build]
            args = ["{entrypoint}"]
            "#,
        )
        .unwrap();
        assert_eq!(raw.paths.cache_dir, Some(PathBuf::from("/var/cache/hive")));
        assert!(raw.paths.references_file.is_none());
        assert!(raw.build.program.is_none());
        assert_eq!(raw.build.args, Some(vec!["{entrypoint}".to_string()]));
    }
}

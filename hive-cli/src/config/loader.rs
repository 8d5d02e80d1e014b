use super::types::{RawBuildConfig, RawGitConfig, RawHiveConfig, RawPathsConfig};
use anyhow::{Context, Result};
use hive_core::{CommandBuilder, GitConfig, HiveConfig, PathsConfig};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<HiveConfig> {
        Self::load_from(&Self::user_config_path(), &Self::project_config_path())
    }

    /// Load and merge the given files; missing files are skipped
    pub fn load_from(user_path: &Path, project_path: &Path) -> Result<HiveConfig> {
        let mut raw = RawHiveConfig::default();

        // Layer 1: User config
        if let Some(user_config) = Self::read(user_path)? {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read(project_path)? {
            raw = Self::merge_raw(raw, project_config);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path
    pub fn user_config_path() -> PathBuf {
        hive_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with HIVE_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("HIVE_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".hive/config.toml")
        }
    }

    fn read(path: &Path) -> Result<Option<RawHiveConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: RawHiveConfig = toml::from_str(&contents)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(Some(config))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawHiveConfig, overlay: RawHiveConfig) -> RawHiveConfig {
        RawHiveConfig {
            paths: RawPathsConfig {
                cache_dir: overlay.paths.cache_dir.or(base.paths.cache_dir),
                references_file: overlay.paths.references_file.or(base.paths.references_file),
            },
            git: RawGitConfig {
                program: overlay.git.program.or(base.git.program),
            },
            build: RawBuildConfig {
                program: overlay.build.program.or(base.build.program),
                args: overlay.build.args.or(base.build.args),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawHiveConfig) -> HiveConfig {
        let paths = PathsConfig::default();
        let build = CommandBuilder::default();

        HiveConfig {
            paths: PathsConfig {
                cache_dir: raw
                    .paths
                    .cache_dir
                    .map(expand_home)
                    .unwrap_or(paths.cache_dir),
                references_file: raw
                    .paths
                    .references_file
                    .map(expand_home)
                    .unwrap_or(paths.references_file),
            },
            git: GitConfig {
                program: raw.git.program.unwrap_or_else(|| GitConfig::default().program),
            },
            build: CommandBuilder {
                program: raw.build.program.unwrap_or(build.program),
                args: raw.build.args.unwrap_or(build.args),
            },
        }
    }
}

/// Replace a leading `~` with the home directory
fn expand_home(path: PathBuf) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_give_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_from(
            &dir.path().join("user.toml"),
            &dir.path().join("project.toml"),
        )
        .unwrap();

        assert_eq!(config.git.program, "git");
        assert_eq!(config.build, CommandBuilder::default());
    }

    #[test]
    fn test_project_overrides_user() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("user.toml");
        let project = dir.path().join("project.toml");

        std::fs::write(
            &user,
            r#"
            [paths]
            cache_dir = "/user/cache"
            references_file = "/user/references.json"

            [git]
            program = "user-git"
            "#,
        )
        .unwrap();
        std::fs::write(
            &project,
            r#"
            [paths]
            cache_dir = "/project/cache"

            [build]
            program = "make"
            "#,
        )
        .unwrap();

        let config = ConfigLoader::load_from(&user, &project).unwrap();
        assert_eq!(config.paths.cache_dir, PathBuf::from("/project/cache"));
        assert_eq!(
            config.paths.references_file,
            PathBuf::from("/user/references.json")
        );
        assert_eq!(config.git.program, "user-git");
        assert_eq!(config.build.program, "make");
        assert_eq!(config.build.args, CommandBuilder::default().args);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("user.toml");
        std::fs::write(&user, "[paths\n").unwrap();

        let err = ConfigLoader::load_from(&user, &dir.path().join("none.toml")).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(PathBuf::from("~/.cache/hive")),
                home.join(".cache/hive")
            );
        }
        assert_eq!(
            expand_home(PathBuf::from("/abs/path")),
            PathBuf::from("/abs/path")
        );
    }

    #[test]
    #[serial]
    fn test_project_config_path_env_override() {
        unsafe {
            std::env::set_var("HIVE_PROJECT_CONFIG_DIR", "/tmp/hive-project");
        }
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from("/tmp/hive-project/config.toml")
        );
        unsafe {
            std::env::remove_var("HIVE_PROJECT_CONFIG_DIR");
        }
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from(".hive/config.toml")
        );
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Settings consumed only by the title generator. The issue store itself has
/// no dependency on any of these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssuemakeConfig {
    /// Chat-completions endpoint for title generation.
    pub endpoint: Option<String>,
    /// Bearer credential sent to the endpoint.
    pub api_key: Option<String>,
    /// Model name passed through to the endpoint.
    pub model: Option<String>,
}

impl IssuemakeConfig {
    pub fn is_title_generation_configured(&self) -> bool {
        self.endpoint.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
    }
}

pub fn config_filename_candidates() -> [&'static str; 2] {
    [".issuemake.toml", ".issuemakerc"]
}

pub fn config_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".issuemake.toml")
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

pub fn resolve_issuemake_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("ISSUEMAKE_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".issuemake"))
}

pub fn global_config_path() -> Option<PathBuf> {
    resolve_issuemake_home_dir().map(|home| home.join("config.toml"))
}

pub fn find_config_root(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    for candidate in start.ancestors() {
        for name in config_filename_candidates() {
            if candidate.join(name).is_file() {
                return Some(candidate.to_path_buf());
            }
        }
    }
    None
}

pub fn load_config(repo_root: &Path) -> Option<IssuemakeConfig> {
    for name in config_filename_candidates() {
        let path = repo_root.join(name);
        if path.is_file() {
            if let Ok(text) = fs::read_to_string(&path) {
                if let Ok(config) = toml::from_str::<IssuemakeConfig>(&text) {
                    return Some(config);
                }
            }
        }
    }
    None
}

pub fn load_global_config() -> Option<IssuemakeConfig> {
    let path = global_config_path()?;
    if !path.is_file() {
        return None;
    }
    let text = fs::read_to_string(path).ok()?;
    toml::from_str::<IssuemakeConfig>(&text).ok()
}

/// Merge project config over global config, field by field.
pub fn effective_config(repo_root: &Path) -> IssuemakeConfig {
    let project = load_config(repo_root).unwrap_or_default();
    let global = load_global_config().unwrap_or_default();
    IssuemakeConfig {
        endpoint: project.endpoint.or(global.endpoint),
        api_key: project.api_key.or(global.api_key),
        model: project.model.or(global.model),
    }
}

pub fn write_config(repo_root: &Path, config: &IssuemakeConfig) -> Result<PathBuf, ConfigError> {
    let path = config_path(repo_root);
    let body = toml::to_string_pretty(config)?;
    fs::write(&path, body)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
        let _guard = crate::test_env::lock();
        f()
    }

    struct EnvGuard {
        issuemake_home: Option<OsString>,
        home: Option<OsString>,
        userprofile: Option<OsString>,
    }

    impl EnvGuard {
        fn capture() -> Self {
            Self {
                issuemake_home: std::env::var_os("ISSUEMAKE_HOME"),
                home: std::env::var_os("HOME"),
                userprofile: std::env::var_os("USERPROFILE"),
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.issuemake_home.as_ref() {
                std::env::set_var("ISSUEMAKE_HOME", value);
            } else {
                std::env::remove_var("ISSUEMAKE_HOME");
            }

            if let Some(value) = self.home.as_ref() {
                std::env::set_var("HOME", value);
            } else {
                std::env::remove_var("HOME");
            }

            if let Some(value) = self.userprofile.as_ref() {
                std::env::set_var("USERPROFILE", value);
            } else {
                std::env::remove_var("USERPROFILE");
            }
        }
    }

    #[test]
    fn write_and_read_config() {
        let temp = TempDir::new().expect("tempdir");
        let config = IssuemakeConfig {
            endpoint: Some("https://api.example.com/v1/chat/completions".to_string()),
            api_key: Some("sk-test".to_string()),
            model: Some("gpt-4o-mini".to_string()),
        };
        write_config(temp.path(), &config).expect("write config");
        let loaded = load_config(temp.path()).expect("load config");
        assert_eq!(
            loaded.endpoint.as_deref(),
            Some("https://api.example.com/v1/chat/completions")
        );
        assert_eq!(loaded.api_key.as_deref(), Some("sk-test"));
        assert_eq!(loaded.model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn find_config_root_walks_ancestors() {
        let temp = TempDir::new().expect("tempdir");
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("nested dirs");
        write_config(temp.path(), &IssuemakeConfig::default()).expect("write config");

        let root = find_config_root(&nested).expect("root");
        let expected = std::fs::canonicalize(temp.path()).unwrap_or_else(|_| temp.path().into());
        assert_eq!(root, expected);
    }

    #[test]
    fn effective_config_prefers_project_over_global() {
        with_env_lock(|| {
            let _env = EnvGuard::capture();
            let repo = TempDir::new().expect("repo tempdir");
            let home = TempDir::new().expect("home tempdir");
            std::env::set_var("ISSUEMAKE_HOME", home.path());

            std::fs::write(
                home.path().join("config.toml"),
                "endpoint = \"https://global.example\"\nmodel = \"global-model\"\n",
            )
            .expect("global config");
            std::fs::write(
                repo.path().join(".issuemake.toml"),
                "endpoint = \"https://project.example\"\n",
            )
            .expect("project config");

            let config = effective_config(repo.path());
            assert_eq!(config.endpoint.as_deref(), Some("https://project.example"));
            assert_eq!(config.model.as_deref(), Some("global-model"));
        });
    }

    #[test]
    fn title_generation_requires_endpoint() {
        let config = IssuemakeConfig::default();
        assert!(!config.is_title_generation_configured());
        let config = IssuemakeConfig {
            endpoint: Some("https://api.example.com".to_string()),
            ..Default::default()
        };
        assert!(config.is_title_generation_configured());
    }
}

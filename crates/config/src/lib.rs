//! Configuration resolution for Clawmeter.
//!
//! The tracking layer only needs an `(api_key, api_url)` pair. It is looked
//! up in priority order:
//!
//! 1. `CLAWMETER_API_KEY` / `CLAWMETER_API_URL` environment variables
//! 2. a `.env` file in the current directory
//! 3. `~/.clawmeter/config.toml` (written by `clawmeter setup`)
//! 4. `.clawmeter.toml` in the current directory
//!
//! Missing or unparseable sources are skipped, never errors; an absent key
//! just means the tracker is unconfigured.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Production usage API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.clawmeter.dev";

/// Environment variable holding the API key (highest priority).
pub const ENV_API_KEY: &str = "CLAWMETER_API_KEY";
/// Environment variable overriding the API URL.
pub const ENV_API_URL: &str = "CLAWMETER_API_URL";

/// Where the resolved API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Environment,
    DotEnv,
    UserConfig,
    ProjectConfig,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::DotEnv => write!(f, ".env"),
            Self::UserConfig => write!(f, "user config"),
            Self::ProjectConfig => write!(f, "project config"),
        }
    }
}

/// On-disk config shape (`config.toml` / `.clawmeter.toml`).
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Account email, recorded by `setup` for display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for FileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("email", &self.email)
            .finish()
    }
}

impl FileConfig {
    /// Read a config file, returning None for anything unusable.
    fn read(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping unparseable config file");
                None
            }
        }
    }
}

/// The resolved `(api_key, api_url)` pair the tracker consumes.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    /// Which source supplied the key (None when unconfigured).
    pub key_source: Option<ConfigSource>,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("key_source", &self.key_source)
            .finish()
    }
}

impl ResolvedConfig {
    /// Resolve from the process environment and the standard file locations.
    pub fn load() -> Self {
        ConfigLoader::from_environment().resolve()
    }

    /// Whether an API key was found anywhere.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Source locations for one resolution pass. Split out from [`ResolvedConfig::load`]
/// so tests can point it at temporary files instead of the real environment.
pub struct ConfigLoader {
    env_api_key: Option<String>,
    env_api_url: Option<String>,
    dotenv_path: PathBuf,
    user_path: PathBuf,
    project_path: PathBuf,
}

impl ConfigLoader {
    /// Loader bound to the real environment and standard paths.
    pub fn from_environment() -> Self {
        Self {
            env_api_key: std::env::var(ENV_API_KEY).ok().filter(|v| !v.is_empty()),
            env_api_url: std::env::var(ENV_API_URL).ok().filter(|v| !v.is_empty()),
            dotenv_path: PathBuf::from(".env"),
            user_path: user_config_path(),
            project_path: PathBuf::from(".clawmeter.toml"),
        }
    }

    /// Loader reading only the given files, ignoring the process environment.
    pub fn with_paths(dotenv: PathBuf, user: PathBuf, project: PathBuf) -> Self {
        Self {
            env_api_key: None,
            env_api_url: None,
            dotenv_path: dotenv,
            user_path: user,
            project_path: project,
        }
    }

    /// Inject environment values (tests; the process environment is global).
    pub fn with_env(mut self, api_key: Option<String>, api_url: Option<String>) -> Self {
        self.env_api_key = api_key;
        self.env_api_url = api_url;
        self
    }

    /// Walk the sources in priority order. Later sources are only consulted
    /// while no API key has been found; the first URL seen wins.
    pub fn resolve(&self) -> ResolvedConfig {
        let mut api_key = self.env_api_key.clone().filter(|k| !k.is_empty());
        let mut api_url = self.env_api_url.clone().filter(|u| !u.is_empty());
        let mut key_source = api_key.is_some().then_some(ConfigSource::Environment);

        let file_sources: [(ConfigSource, fn(&Self) -> Option<FileConfig>); 3] = [
            (ConfigSource::DotEnv, |l| l.read_dotenv()),
            (ConfigSource::UserConfig, |l| FileConfig::read(&l.user_path)),
            (ConfigSource::ProjectConfig, |l| {
                FileConfig::read(&l.project_path)
            }),
        ];

        for (source, read) in file_sources {
            if api_key.is_some() {
                break;
            }
            let Some(parsed) = read(self) else { continue };

            if let Some(key) = parsed.api_key.filter(|k| !k.is_empty()) {
                api_key = Some(key);
                key_source = Some(source);
            }
            if api_url.is_none() {
                api_url = parsed.api_url.filter(|u| !u.is_empty());
            }
        }

        ResolvedConfig {
            api_key,
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            key_source,
        }
    }

    /// Pull our keys out of a `.env` file without touching the process
    /// environment.
    fn read_dotenv(&self) -> Option<FileConfig> {
        if !self.dotenv_path.exists() {
            return None;
        }
        let iter = dotenvy::from_path_iter(&self.dotenv_path).ok()?;
        let mut config = FileConfig::default();
        for item in iter {
            let Ok((key, value)) = item else { continue };
            match key.as_str() {
                ENV_API_KEY => config.api_key = Some(value),
                ENV_API_URL => config.api_url = Some(value),
                _ => {}
            }
        }
        Some(config)
    }
}

/// Configuration errors (only writes can fail loudly; reads are best-effort).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to write config file at {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// The user-level configuration directory (`~/.clawmeter`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".clawmeter")
}

/// The user-level config file path.
pub fn user_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Persist the user-level config with owner-only permissions (it holds the
/// API key).
pub fn save_user_config(config: &FileConfig) -> Result<PathBuf, ConfigError> {
    let path = user_config_path();
    save_user_config_to(config, &path)?;
    Ok(path)
}

/// Persist a config to an explicit path (separated for tests).
pub fn save_user_config_to(config: &FileConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    }

    Ok(())
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader(dir: &Path) -> ConfigLoader {
        ConfigLoader::with_paths(
            dir.join(".env"),
            dir.join("config.toml"),
            dir.join(".clawmeter.toml"),
        )
    }

    #[test]
    fn nothing_configured_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = loader(dir.path()).resolve();
        assert!(!resolved.is_configured());
        assert_eq!(resolved.api_url, DEFAULT_API_URL);
        assert_eq!(resolved.key_source, None);
    }

    #[test]
    fn env_has_highest_priority() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "api_key = \"from-file\"\n").unwrap();

        let resolved = loader(dir.path())
            .with_env(Some("from-env".into()), None)
            .resolve();

        assert_eq!(resolved.api_key.as_deref(), Some("from-env"));
        assert_eq!(resolved.key_source, Some(ConfigSource::Environment));
    }

    #[test]
    fn dotenv_beats_user_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "CLAWMETER_API_KEY=from-dotenv\nCLAWMETER_API_URL=https://staging.clawmeter.dev\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("config.toml"), "api_key = \"from-file\"\n").unwrap();

        let resolved = loader(dir.path()).resolve();
        assert_eq!(resolved.api_key.as_deref(), Some("from-dotenv"));
        assert_eq!(resolved.api_url, "https://staging.clawmeter.dev");
        assert_eq!(resolved.key_source, Some(ConfigSource::DotEnv));
    }

    #[test]
    fn user_config_beats_project_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "api_key = \"from-user\"\n").unwrap();
        std::fs::write(
            dir.path().join(".clawmeter.toml"),
            "api_key = \"from-project\"\n",
        )
        .unwrap();

        let resolved = loader(dir.path()).resolve();
        assert_eq!(resolved.api_key.as_deref(), Some("from-user"));
        assert_eq!(resolved.key_source, Some(ConfigSource::UserConfig));
    }

    #[test]
    fn project_config_is_last_resort() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".clawmeter.toml"),
            "api_key = \"from-project\"\napi_url = \"https://self-hosted.example.com\"\n",
        )
        .unwrap();

        let resolved = loader(dir.path()).resolve();
        assert_eq!(resolved.api_key.as_deref(), Some("from-project"));
        assert_eq!(resolved.api_url, "https://self-hosted.example.com");
        assert_eq!(resolved.key_source, Some(ConfigSource::ProjectConfig));
    }

    #[test]
    fn malformed_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "this is not toml {{{").unwrap();
        std::fs::write(
            dir.path().join(".clawmeter.toml"),
            "api_key = \"fallback\"\n",
        )
        .unwrap();

        let resolved = loader(dir.path()).resolve();
        assert_eq!(resolved.api_key.as_deref(), Some("fallback"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "api_key = \"from-file\"\n").unwrap();
        let resolved = loader(dir.path())
            .with_env(Some(String::new()), None)
            .resolve();
        assert_eq!(resolved.api_key.as_deref(), Some("from-file"));
        assert_eq!(resolved.key_source, Some(ConfigSource::UserConfig));
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = FileConfig {
            api_key: Some("cm-test-key".into()),
            api_url: Some("https://api.clawmeter.dev".into()),
            email: Some("dev@example.com".into()),
        };

        save_user_config_to(&config, &path).unwrap();
        let reloaded = FileConfig::read(&path).unwrap();
        assert_eq!(reloaded.api_key.as_deref(), Some("cm-test-key"));
        assert_eq!(reloaded.email.as_deref(), Some("dev@example.com"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = FileConfig {
            api_key: Some("cm-supersecret".into()),
            api_url: None,
            email: None,
        };
        let repr = format!("{config:?}");
        assert!(!repr.contains("supersecret"));
        assert!(repr.contains("[REDACTED]"));

        let resolved = ResolvedConfig {
            api_key: Some("cm-supersecret".into()),
            api_url: DEFAULT_API_URL.into(),
            key_source: Some(ConfigSource::Environment),
        };
        let repr = format!("{resolved:?}");
        assert!(!repr.contains("supersecret"));
    }
}

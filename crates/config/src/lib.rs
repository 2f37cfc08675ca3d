//! Configuration for the cumulus client.
//!
//! Values are layered, later sources winning:
//! 1. built-in defaults (platform data directory for the database and the
//!    filesystem remote),
//! 2. an optional config file (TOML, YAML or JSON, chosen by extension),
//! 3. environment variables prefixed `CUMULUS_`, with `__` separating nested
//!    keys (`CUMULUS_SYNC__REMOTE_TIMEOUT_MS=5000`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "CUMULUS_";
const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Owner of every file this client uploads. Becomes the first component
    /// of each storage path, so it must be a single path segment.
    pub identity: String,
    /// SQLite database holding the offline cache and upload queue.
    pub database: PathBuf,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Used in logs only.
    pub name: String,
    /// Root directory of the filesystem remote. Must be absolute.
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Limit for each remote call during reconciliation.
    pub remote_timeout_ms: u64,
}
impl SyncConfig {
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// `host:port` to connect to when checking reachability.
    pub address: String,
    pub interval_ms: u64,
    pub timeout_ms: u64,
}
impl ProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "cumulus")
}

fn data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("cumulus"))
}

impl Default for Config {
    fn default() -> Self {
        let data = data_dir();
        Self {
            identity: "local".to_string(),
            database: data.join("offline.db"),
            remote: RemoteConfig {
                name: "local".to_string(),
                root: data.join("remote"),
            },
            sync: SyncConfig { remote_timeout_ms: 30_000 },
            probe: ProbeConfig {
                address: "127.0.0.1:443".to_string(),
                interval_ms: 15_000,
                timeout_ms: 3_000,
            },
        }
    }
}

impl Config {
    /// Where the config file is looked for when none is given.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|d| d.config_dir().join(DEFAULT_CONFIG_FILE))
    }

    /// Load and validate the configuration.
    ///
    /// An explicit `file` must exist. Without one, the default config file is
    /// used if present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(file)?.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// The layered sources, before extraction.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                figment = merge_file(figment, path)?;
            },
            None => {
                if let Some(path) = Self::default_path().filter(|p| p.is_file()) {
                    figment = merge_file(figment, &path)?;
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.identity.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("identity must not be empty"));
        }
        let components: Vec<_> = Path::new(&self.identity).components().collect();
        if !matches!(components.as_slice(), [Component::Normal(_)]) {
            exn::bail!(ErrorKind::Invalid("identity must be a single path segment"));
        }
        if !self.remote.root.is_absolute() {
            exn::bail!(ErrorKind::Invalid("remote root must be an absolute path"));
        }
        if self.sync.remote_timeout_ms == 0 {
            exn::bail!(ErrorKind::Invalid("sync.remote_timeout_ms must be greater than zero"));
        }
        if self.probe.interval_ms == 0 || self.probe.timeout_ms == 0 {
            exn::bail!(ErrorKind::Invalid("probe intervals must be greater than zero"));
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.remote_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "cumulus.toml",
                r#"
                    identity = "alice"
                    [sync]
                    remote_timeout_ms = 1000
                    [remote]
                    root = "/srv/cumulus"
                "#,
            )?;
            jail.set_env("CUMULUS_SYNC__REMOTE_TIMEOUT_MS", "2500");
            let config = Config::load(Some(Path::new("cumulus.toml"))).unwrap();
            assert_eq!(config.identity, "alice");
            assert_eq!(config.remote.root, PathBuf::from("/srv/cumulus"));
            // Untouched keys keep their defaults.
            assert_eq!(config.remote.name, "local");
            assert_eq!(config.sync.remote_timeout_ms, 2500);
            Ok(())
        });
    }

    #[rstest]
    #[case("cumulus.yaml", "identity: bob\n")]
    #[case("cumulus.yml", "identity: bob\n")]
    #[case("cumulus.json", r#"{"identity": "bob"}"#)]
    fn test_other_formats(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            assert_eq!(Config::load(Some(Path::new(name))).unwrap().identity, "bob");
            Ok(())
        });
    }

    #[test]
    fn test_missing_and_unsupported_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(missing));

        let ini = temp_dir.path().join("cumulus.ini");
        std::fs::write(&ini, "identity=x").unwrap();
        let err = Config::load(Some(&ini)).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFormat(ini));
    }

    #[test]
    fn test_parse_error() {
        Jail::expect_with(|jail| {
            jail.create_file("cumulus.toml", "sync = 5")?;
            let err = Config::load(Some(Path::new("cumulus.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Parse);
            Ok(())
        });
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("team/alice")]
    #[case("..")]
    #[case("/root")]
    fn test_invalid_identity(#[case] identity: &str) {
        let config = Config {
            identity: identity.to_string(),
            ..Config::default()
        };
        assert!(matches!(&*config.validate().unwrap_err(), ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = Config::default();
        config.sync.remote_timeout_ms = 0;
        assert!(config.validate().is_err());
        let mut config = Config::default();
        config.probe.interval_ms = 0;
        assert!(config.validate().is_err());
        let mut config = Config::default();
        config.remote.root = PathBuf::from("relative");
        assert!(config.validate().is_err());
    }
}

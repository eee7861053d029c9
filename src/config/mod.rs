//! Configuration types.
//!
//! Every configuration format is parsed by a [`ConfigLoader`] adapter into a
//! format-neutral [`RawConfig`], which is then validated into the one shape
//! the rest of the crate consumes: [`ConfigStore`]. Nothing downstream of
//! loading reads the file again.

mod ini;
mod raw;
mod yaml;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tracing::Level;

use crate::error::ConfigError;

pub use ini::IniLoader;
pub use raw::{RawAction, RawCondition, RawConfig, RawDebug, RawRule, RawSmtp, Recipients, Scalar};
pub use yaml::YamlLoader;

/// SMTP port used when the config doesn't name one.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Connect/IO timeout for the mail relay.
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Log file written next to the config file when `debug.debug` is on.
pub const DEFAULT_LOG_FILE: &str = "oem_notification.log";

/// Default config file name, looked up under `config/` beside the binary.
pub const DEFAULT_CONFIG_FILE: &str = "oemnotification.yaml";

// ── Evaluation mode ─────────────────────────────────────────────────

/// How the rule engine walks the rule list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Stop after the first rule that applies.
    FirstMatch,
    /// Fold in every rule that applies.
    #[default]
    AllMatches,
}

impl FromStr for EvaluationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first_match" => Ok(EvaluationMode::FirstMatch),
            "all_matches" => Ok(EvaluationMode::AllMatches),
            other => Err(format!(
                "'{other}' is not a rule evaluation mode (expected first_match or all_matches)"
            )),
        }
    }
}

impl fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationMode::FirstMatch => f.write_str("first_match"),
            EvaluationMode::AllMatches => f.write_str("all_matches"),
        }
    }
}

// ── SMTP ────────────────────────────────────────────────────────────

/// Transport security for the SMTP connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    /// Plain SMTP, no encryption.
    #[default]
    None,
    /// Upgrade with STARTTLS after connecting.
    Starttls,
    /// Implicit TLS from the first byte (SMTPS).
    Tls,
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "plain" => Ok(TlsMode::None),
            "starttls" => Ok(TlsMode::Starttls),
            "tls" | "smtps" => Ok(TlsMode::Tls),
            other => Err(format!(
                "'{other}' is not a TLS mode (expected none, starttls or tls)"
            )),
        }
    }
}

/// Mail relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    /// Envelope and `From:` address.
    pub sender: String,
    /// Base recipient; every notification goes here.
    pub recipient: String,
    pub tls: TlsMode,
    pub timeout: Duration,
}

// ── Debug / logging ─────────────────────────────────────────────────

/// Logging settings from the `debug` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugSettings {
    /// Log to a file instead of stderr.
    pub debug: bool,
    #[serde(serialize_with = "serialize_level")]
    pub level: Level,
    pub log_file: Option<PathBuf>,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::INFO,
            log_file: None,
        }
    }
}

fn serialize_level<S: serde::Serializer>(level: &Level, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(level.as_str())
}

/// Map a logging level name onto a tracing level.
///
/// Accepts the classic names (`DEBUG`, `INFO`, `WARNING`, `ERROR`,
/// `CRITICAL`) case-insensitively, plus `TRACE` and `WARN`.
pub fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_uppercase().as_str() {
        "TRACE" => Some(Level::TRACE),
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARN" | "WARNING" => Some(Level::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Some(Level::ERROR),
        _ => None,
    }
}

// ── Rules ───────────────────────────────────────────────────────────

/// Which events a rule applies to. All three fields are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Condition {
    /// Target name, or `all`. Absent never matches.
    pub target_name: Option<String>,
    /// Target type, or `all`. Absent never matches.
    pub target_type: Option<String>,
    /// Lifecycle status. Absent or empty matches every status.
    pub lifecycle_status: Option<String>,
}

/// What a matching rule contributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Action {
    pub recipients: Vec<String>,
    /// Integer-as-string; lower is more urgent.
    pub priority: Option<String>,
}

/// A condition/action pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub condition: Condition,
    pub action: Action,
}

// ── Store ───────────────────────────────────────────────────────────

/// Normalized, read-only configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigStore {
    pub smtp: SmtpSettings,
    pub debug: DebugSettings,
    pub evaluation_mode: EvaluationMode,
    /// In declaration order.
    pub rules: Vec<Rule>,
}

/// A format adapter turning file contents into a [`RawConfig`].
pub trait ConfigLoader {
    /// Short format name for diagnostics.
    fn name(&self) -> &'static str;

    /// Parse `contents`, read from `path`.
    fn parse(&self, path: &Path, contents: &str) -> Result<RawConfig, ConfigError>;
}

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Ini,
}

impl ConfigFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "ini" | "cfg" | "conf" => Ok(ConfigFormat::Ini),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// The adapter for this format.
    pub fn loader(self) -> &'static dyn ConfigLoader {
        match self {
            ConfigFormat::Yaml => &YamlLoader,
            ConfigFormat::Ini => &IniLoader,
        }
    }
}

impl ConfigStore {
    /// Load and validate the config file at `path`, picking the adapter by extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)?;
        Self::load_with(path, format.loader())
    }

    /// Load `path` with an explicit adapter.
    pub fn load_with(path: &Path, loader: &dyn ConfigLoader) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let mut store = loader.parse(path, &contents)?.normalize()?;

        // Relative log paths resolve against the config file's directory.
        let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
        store.debug.log_file = Some(match store.debug.log_file.take() {
            Some(file) if file.is_relative() => config_dir.join(file),
            Some(file) => file,
            None => config_dir.join(DEFAULT_LOG_FILE),
        });

        Ok(store)
    }

    /// Default config path: `config/oemnotification.yaml` beside the running binary.
    pub fn default_path() -> PathBuf {
        let base = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("config").join(DEFAULT_CONFIG_FILE)
    }
}

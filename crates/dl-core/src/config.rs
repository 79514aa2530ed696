use serde::Deserialize;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use dl_backend::OracleOptions;
use dl_report::{PageGeometry, Theme};
use tracing::warn;

const API_KEY_ENV: &str = "DOCKETLENS_API_KEY";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub oracle: OracleConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OracleConfig {
    /// Chat endpoint URL.
    pub endpoint: String,
    /// Model name forwarded with each request. Omitted when unset.
    pub model: Option<String>,
    /// Command to run to get the API key (e.g., "pass show docketlens/oracle").
    /// The command is run via `sh -c`.
    pub api_key_cmd: Option<String>,
    /// Overall request timeout, seconds.
    pub timeout_secs: u64,
    /// Connect timeout, seconds.
    pub connect_timeout_secs: u64,
    /// Claim rows sent with each request as a sample.
    pub sample_rows: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8787/api/oracle/chat".to_string(),
            model: None,
            api_key_cmd: None,
            timeout_secs: 120,
            connect_timeout_secs: 10,
            sample_rows: 250,
        }
    }
}

impl OracleConfig {
    /// Resolve the API key from api_key_cmd or the DOCKETLENS_API_KEY env var.
    pub fn resolve_api_key(&self) -> io::Result<String> {
        if let Some(cmd) = &self.api_key_cmd {
            let output = Command::new("sh").arg("-c").arg(cmd).output()?;

            if output.status.success() {
                let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !key.is_empty() {
                    return Ok(key);
                }
            } else {
                warn!(status = %output.status, "api_key_cmd failed");
            }
        }

        std::env::var(API_KEY_ENV).map_err(|_| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "DOCKETLENS_API_KEY not set and no api_key_cmd configured",
            )
        })
    }

    pub fn options(&self) -> OracleOptions {
        OracleOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// One of `executive`, `midnight`, `ivory`.
    pub theme: String,
    /// `a4` or `letter`.
    pub page: String,
    /// Where exported PDFs go. Defaults to the current directory.
    pub output_dir: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            theme: "executive".to_string(),
            page: "a4".to_string(),
            output_dir: None,
        }
    }
}

impl ReportConfig {
    /// Configured theme, falling back to the default for unknown names.
    pub fn theme(&self) -> Theme {
        Theme::by_name(&self.theme).unwrap_or_else(|| {
            warn!(theme = %self.theme, "unknown theme, using executive");
            Theme::default()
        })
    }

    pub fn geometry(&self) -> PageGeometry {
        PageGeometry::by_name(&self.page).unwrap_or_else(|| {
            warn!(page = %self.page, "unknown page size, using a4");
            PageGeometry::default()
        })
    }

    pub fn resolve_output_dir(&self) -> PathBuf {
        self.output_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Config {
    pub fn load_or_default() -> Self {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                warn!("failed to parse {}: {e}", path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }
}

fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("docketlens").join("config.toml")
}

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_QUERY_PATH: &str = "/chat/query";
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_SIGNUP_PATH: &str = "/signup";
pub const DEFAULT_ENTRY_ROUTE: &str = "/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

/// File looked up in the working directory when no config path is given.
const CWD_CONFIG_NAME: &str = "ragchat";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Base URL of the answering service
    #[arg(long)]
    pub base_url: Option<String>,

    /// Send the stored access token with each question
    #[arg(long)]
    pub attach_credential: Option<bool>,

    /// File used to persist the session between runs
    #[arg(long)]
    pub store_path: Option<String>,

    /// Redirect to the entry route when no session is stored
    #[arg(long)]
    pub require_session: Option<bool>,

    /// Gateway request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClientConfig {
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub query_path: String,
    pub timeout_secs: u64,
    /// Off by default: the answering endpoint is public.
    pub attach_credential: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AuthConfig {
    pub login_path: String,
    pub signup_path: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SessionConfig {
    #[serde(default)]
    pub store_path: Option<String>,
    pub require_session: bool,
    pub entry_route: String,
    pub placeholder_identity: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HistoryConfig {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    pub json: bool,
    pub filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                query_path: DEFAULT_QUERY_PATH.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                attach_credential: false,
            },
            auth: AuthConfig {
                login_path: DEFAULT_LOGIN_PATH.to_string(),
                signup_path: DEFAULT_SIGNUP_PATH.to_string(),
            },
            session: SessionConfig {
                store_path: None,
                require_session: false,
                entry_route: DEFAULT_ENTRY_ROUTE.to_string(),
                placeholder_identity: crate::session::DEFAULT_PLACEHOLDER.to_string(),
            },
            history: HistoryConfig {
                capacity: DEFAULT_HISTORY_CAPACITY,
            },
            logging: LoggingConfig {
                json: false,
                filter: "info".to_string(),
            },
        }
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve `path` under the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        join_endpoint(&self.base_url, path)
    }
}

/// Append `path` to `base_url`, keeping any path prefix on the base.
///
/// `http://host/api` + `/chat/query` is `http://host/api/chat/query`.
pub(crate) fn join_endpoint(base_url: &str, path: &str) -> Result<Url, ConfigError> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args)?;
        let defaults = Self::default();

        // 1. Defaults
        let mut builder = Config::builder()
            .set_default("gateway.base_url", defaults.gateway.base_url)?
            .set_default("gateway.query_path", defaults.gateway.query_path)?
            .set_default("gateway.timeout_secs", defaults.gateway.timeout_secs)?
            .set_default("gateway.attach_credential", false)?
            .set_default("auth.login_path", defaults.auth.login_path)?
            .set_default("auth.signup_path", defaults.auth.signup_path)?
            .set_default("session.require_session", false)?
            .set_default("session.entry_route", defaults.session.entry_route)?
            .set_default(
                "session.placeholder_identity",
                defaults.session.placeholder_identity,
            )?
            .set_default("history.capacity", defaults.history.capacity as u64)?
            .set_default("logging.json", false)?
            .set_default("logging.filter", defaults.logging.filter)?;

        // 2. Config file: explicit path must exist, ./ragchat.* is optional
        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(PathBuf::from(path)).required(true)),
            None => builder.add_source(File::with_name(CWD_CONFIG_NAME).required(false)),
        };

        // 3. Environment, e.g. RAGCHAT_GATEWAY__BASE_URL
        builder = builder.add_source(
            Environment::with_prefix("RAGCHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags win over everything
        if let Some(url) = cli.base_url {
            builder = builder.set_override("gateway.base_url", url)?;
        }
        if let Some(attach) = cli.attach_credential {
            builder = builder.set_override("gateway.attach_credential", attach)?;
        }
        if let Some(timeout) = cli.timeout_secs {
            builder = builder.set_override("gateway.timeout_secs", timeout)?;
        }
        if let Some(path) = cli.store_path {
            builder = builder.set_override("session.store_path", path)?;
        }
        if let Some(require) = cli.require_session {
            builder = builder.set_override("session.require_session", require)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.endpoint(&self.gateway.query_path)?;
        if self.history.capacity == 0 {
            return Err(config::ConfigError::Message(
                "history.capacity must be at least 1".to_string(),
            )
            .into());
        }
        Ok(())
    }

    #[must_use]
    pub fn store_path(&self) -> Option<&Path> {
        self.session.store_path.as_deref().map(Path::new)
    }
}

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, builder::BoolishValueParser};
use lightdash_core::client::ClientConfig;
use tracing_subscriber::filter::LevelFilter;

const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4030";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TILE_CONCURRENCY: usize = 5;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "lightdash-mcpd", version, about = "Lightdash MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "LIGHTDASH_URL")]
    url: Option<String>,

    #[arg(long, env = "LIGHTDASH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, env = "LIGHTDASH_PROJECT_UUID")]
    project_uuid: Option<String>,

    #[arg(long, env = "CF_ACCESS_CLIENT_ID")]
    cf_access_client_id: Option<String>,

    #[arg(long, env = "CF_ACCESS_CLIENT_SECRET", hide_env_values = true)]
    cf_access_client_secret: Option<String>,

    #[arg(long, env = "LIGHTDASH_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[arg(
        long,
        env = "LIGHTDASH_TILE_CONCURRENCY",
        default_value_t = DEFAULT_TILE_CONCURRENCY
    )]
    tile_concurrency: usize,

    #[arg(
        long = "stdio",
        env = "LIGHTDASH_MCP_STDIO",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(
        long = "http",
        env = "LIGHTDASH_MCP_HTTP",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    enable_http: bool,

    #[arg(long, env = "LIGHTDASH_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    http_addr: SocketAddr,

    #[arg(long, env = "LIGHTDASH_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,

    #[arg(
        long,
        env = "LIGHTDASH_LOG_JSON",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    log_json: bool,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Clone)]
pub struct LightdashConfig {
    pub base_url: String,
    pub token: String,
    pub project_uuid: Option<String>,
    pub cf_access: Option<(String, String)>,
    pub timeout: Duration,
    pub tile_concurrency: usize,
    pub enable_stdio: bool,
    pub enable_http: bool,
    pub http_addr: SocketAddr,
    pub log_level: LevelFilter,
    pub log_json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),
    #[error("invalid {name} value: {value}")]
    InvalidSetting { name: &'static str, value: String },
}

impl LightdashConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }

    /// Client settings for the configured instance.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(&self.base_url, &self.token).with_timeout(self.timeout);
        match &self.cf_access {
            Some((client_id, client_secret)) => config.with_cf_access(client_id, client_secret),
            None => config,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl TryFrom<CliArgs> for LightdashConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let base_url = non_blank(args.url).ok_or(ConfigError::MissingSetting("LIGHTDASH_URL"))?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidSetting {
                name: "LIGHTDASH_URL",
                value: base_url,
            });
        }
        let token = non_blank(args.token).ok_or(ConfigError::MissingSetting("LIGHTDASH_TOKEN"))?;

        let cf_access = match (
            non_blank(args.cf_access_client_id),
            non_blank(args.cf_access_client_secret),
        ) {
            (Some(id), Some(secret)) => Some((id, secret)),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingSetting("CF_ACCESS_CLIENT_SECRET")),
            (None, Some(_)) => return Err(ConfigError::MissingSetting("CF_ACCESS_CLIENT_ID")),
        };

        if args.timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "LIGHTDASH_TIMEOUT_SECS",
                value: args.timeout_secs.to_string(),
            });
        }
        if args.tile_concurrency == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "LIGHTDASH_TILE_CONCURRENCY",
                value: args.tile_concurrency.to_string(),
            });
        }
        if !args.enable_stdio && !args.enable_http {
            return Err(ConfigError::InvalidSetting {
                name: "LIGHTDASH_MCP_STDIO",
                value: "false (LIGHTDASH_MCP_HTTP is also false; enable at least one transport)"
                    .to_string(),
            });
        }
        let log_level = args
            .log_level
            .trim()
            .parse::<LevelFilter>()
            .map_err(|_| ConfigError::InvalidSetting {
                name: "LIGHTDASH_LOG_LEVEL",
                value: args.log_level.clone(),
            })?;

        Ok(Self {
            base_url,
            token,
            project_uuid: non_blank(args.project_uuid),
            cf_access,
            timeout: Duration::from_secs(args.timeout_secs),
            tile_concurrency: args.tile_concurrency,
            enable_stdio: args.enable_stdio,
            enable_http: args.enable_http,
            http_addr: args.http_addr,
            log_level,
            log_json: args.log_json,
        })
    }
}

use serde::Deserialize;

/// Deployment-tunable server configuration, layered over environment
/// variables via the `config` crate and overridable on the command line.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_rate_limit_ops_per_sec")]
    pub rate_limit_ops_per_sec: f64,
    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: f64,

    #[serde(default = "default_cleanup_sweep_interval_secs")]
    pub cleanup_sweep_interval_secs: u64,

    /// Hard ceiling on `createdAt + extension`, in milliseconds. Not named
    /// in the source protocol; this deployment must pick one to prevent
    /// perpetual extension. Defaults to 24h.
    #[serde(default = "default_extension_hard_cap_ms")]
    pub extension_hard_cap_ms: i64,

    #[serde(default = "default_join_handshake_timeout_secs")]
    pub join_handshake_timeout_secs: u64,
    #[serde(default = "default_idle_participant_timeout_secs")]
    pub idle_participant_timeout_secs: i64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_rate_limit_ops_per_sec() -> f64 {
    50.0
}

fn default_rate_limit_burst() -> f64 {
    100.0
}

fn default_cleanup_sweep_interval_secs() -> u64 {
    10
}

fn default_extension_hard_cap_ms() -> i64 {
    24 * 60 * 60 * 1000
}

fn default_join_handshake_timeout_secs() -> u64 {
    10
}

fn default_idle_participant_timeout_secs() -> i64 {
    60
}

impl ServerConfig {
    /// Loads configuration from environment variables (`HOST`, `PORT`,
    /// `RATE_LIMIT_OPS_PER_SEC`, ...), falling back to the defaults above
    /// for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .try_parsing(true)
                    .separator("__"),
            )
            .build()?;

        // `try_deserialize` only sees keys actually set in the
        // environment; serde's `#[serde(default = ...)]` fills the rest.
        let cfg = settings
            .try_deserialize::<PartialConfig>()
            .unwrap_or_default();

        Ok(Self {
            host: cfg.host.unwrap_or_else(default_host),
            port: cfg.port.unwrap_or_else(default_port),
            rate_limit_ops_per_sec: cfg
                .rate_limit_ops_per_sec
                .unwrap_or_else(default_rate_limit_ops_per_sec),
            rate_limit_burst: cfg.rate_limit_burst.unwrap_or_else(default_rate_limit_burst),
            cleanup_sweep_interval_secs: cfg
                .cleanup_sweep_interval_secs
                .unwrap_or_else(default_cleanup_sweep_interval_secs),
            extension_hard_cap_ms: cfg
                .extension_hard_cap_ms
                .unwrap_or_else(default_extension_hard_cap_ms),
            join_handshake_timeout_secs: cfg
                .join_handshake_timeout_secs
                .unwrap_or_else(default_join_handshake_timeout_secs),
            idle_participant_timeout_secs: cfg
                .idle_participant_timeout_secs
                .unwrap_or_else(default_idle_participant_timeout_secs),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    host: Option<String>,
    port: Option<u16>,
    rate_limit_ops_per_sec: Option<f64>,
    rate_limit_burst: Option<f64>,
    cleanup_sweep_interval_secs: Option<u64>,
    extension_hard_cap_ms: Option<i64>,
    join_handshake_timeout_secs: Option<u64>,
    idle_participant_timeout_secs: Option<i64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            rate_limit_ops_per_sec: default_rate_limit_ops_per_sec(),
            rate_limit_burst: default_rate_limit_burst(),
            cleanup_sweep_interval_secs: default_cleanup_sweep_interval_secs(),
            extension_hard_cap_ms: default_extension_hard_cap_ms(),
            join_handshake_timeout_secs: default_join_handshake_timeout_secs(),
            idle_participant_timeout_secs: default_idle_participant_timeout_secs(),
        }
    }
}

/// CLI overrides for `host`/`port`, layered on top of `ServerConfig::from_env`.
#[derive(Debug, clap::Parser)]
#[command(name = "eecp-server")]
pub struct CliArgs {
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
}

impl CliArgs {
    pub fn apply(self, mut cfg: ServerConfig) -> ServerConfig {
        if let Some(host) = self.host {
            cfg.host = host;
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        cfg
    }
}

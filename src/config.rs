use crate::prelude::*;

use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub inverter: Inverter,

    #[serde(default = "Config::default_influx")]
    pub influx: Influx,

    /// Poll period in seconds
    #[serde(default = "Config::default_period")]
    pub period: u64,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// Inverter {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Inverter {
    pub host: String,

    #[serde(default = "Config::default_inverter_port")]
    pub port: u16,

    #[serde(default = "Config::default_unit_id")]
    pub unit_id: u8,

    pub read_timeout: Option<u64>,
}
impl Inverter {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn read_timeout(&self) -> u64 {
        self.read_timeout.unwrap_or(10)
    }
} // }}}

// Influx {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Influx {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    #[serde(default = "Config::default_influx_host")]
    pub host: String,

    #[serde(default = "Config::default_influx_port")]
    pub port: u16,

    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default = "Config::default_influx_database")]
    pub database: String,
}
impl Influx {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn username(&self) -> &Option<String> {
        &self.username
    }

    pub fn password(&self) -> &Option<String> {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }
} // }}}

/// Read-only shared handle to the loaded configuration. The configuration
/// is supplied once at startup and never changes for the process lifetime.
#[derive(Clone)]
pub struct ConfigWrapper {
    config: Arc<Config>,
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self> {
        Ok(Self::from_config(Config::new(file)?))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn inverter(&self) -> Inverter {
        self.config.inverter.clone()
    }

    pub fn influx(&self) -> Influx {
        self.config.influx.clone()
    }

    pub fn period(&self) -> u64 {
        self.config.period
    }

    pub fn loglevel(&self) -> String {
        self.config.loglevel.clone()
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        info!("Reading configuration from {}", file);
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("error reading {}: {}", file, err))?;

        let config: Self = serde_yaml::from_str(&content)?;

        info!("Configuration loaded successfully:");
        info!("  Inverter:");
        info!("    Host: {}", config.inverter.host);
        info!("    Port: {}", config.inverter.port);
        info!("    Unit ID: {}", config.inverter.unit_id);
        info!("    Read Timeout: {}s", config.inverter.read_timeout());

        info!("  InfluxDB: {}", if config.influx.enabled { "enabled" } else { "disabled" });
        if config.influx.enabled {
            info!("    URL: {}", config.influx.url());
            info!("    Database: {}", config.influx.database);
        }

        info!("  Poll Period: {}s", config.period);
        info!("  Log Level: {}", config.loglevel);

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.inverter.host.is_empty() {
            bail!("inverter.host cannot be empty");
        }
        if self.inverter.port == 0 {
            bail!("inverter.port must be between 1 and 65535");
        }
        if self.period == 0 {
            bail!("period must be at least 1 second");
        }

        if self.influx.enabled {
            if let Err(e) = url::Url::parse(&self.influx.url()) {
                bail!("invalid InfluxDB URL {}: {}", self.influx.url(), e);
            }
            if self.influx.database.is_empty() {
                bail!("influx.database cannot be empty");
            }
        }

        Ok(())
    }

    fn default_inverter_port() -> u16 {
        502
    }

    fn default_unit_id() -> u8 {
        1
    }

    fn default_influx() -> Influx {
        Influx {
            enabled: Self::default_enabled(),
            host: Self::default_influx_host(),
            port: Self::default_influx_port(),
            username: None,
            password: None,
            database: Self::default_influx_database(),
        }
    }

    fn default_influx_host() -> String {
        "localhost".to_string()
    }

    fn default_influx_port() -> u16 {
        8086
    }

    fn default_influx_database() -> String {
        "solaredge".to_string()
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_period() -> u64 {
        5
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}

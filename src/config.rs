use std::{fs, io, net::Ipv4Addr, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    agent::{PenConfig, SpawnConfig},
    motion::MotionCommand,
};

pub const DEFAULT_SIMULATOR_IP: Ipv4Addr = Ipv4Addr::LOCALHOST;
pub const DEFAULT_SERVICE_PORT: u16 = 10400;
pub const DEFAULT_MOTION_PORT: u16 = 10401;

/// Environment variable naming an optional json config file.
pub const CONFIG_PATH_ENV: &str = "TURTLE_DRIVER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read config file: {0}")]
    Read(#[from] io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub ip: Ipv4Addr,
    pub service_port: u16,
    pub motion_port: u16,
    /// how often advertised services are queried while waiting for one
    pub availability_poll_ms: u64,
    /// how long a single advertised services query waits for its answer
    pub availability_query_timeout_ms: u64,
    /// unset means wait for a service forever
    pub service_wait_timeout_ms: Option<u64>,
    /// unset means wait for a response forever
    pub response_timeout_ms: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            ip: DEFAULT_SIMULATOR_IP,
            service_port: DEFAULT_SERVICE_PORT,
            motion_port: DEFAULT_MOTION_PORT,
            availability_poll_ms: 1000,
            availability_query_timeout_ms: 500,
            service_wait_timeout_ms: None,
            response_timeout_ms: None,
        }
    }
}

impl SimulatorConfig {
    pub fn availability_poll(&self) -> Duration {
        Duration::from_millis(self.availability_poll_ms)
    }

    pub fn availability_query_timeout(&self) -> Duration {
        Duration::from_millis(self.availability_query_timeout_ms)
    }

    pub fn service_wait_timeout(&self) -> Option<Duration> {
        self.service_wait_timeout_ms.map(Duration::from_millis)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// forward speed in units per second
    pub speed: f64,
    pub turn_radius: f64,
    pub period_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: 1.3,
            turn_radius: 0.7,
            period_ms: 1000,
        }
    }
}

impl MotionConfig {
    pub fn command(&self) -> MotionCommand {
        MotionCommand::circle(self.speed, self.turn_radius)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(invalid("motion.period_ms", "must be positive"));
        }
        if !self.speed.is_finite() {
            return Err(invalid("motion.speed", "must be a finite number"));
        }
        if !self.turn_radius.is_finite() || self.turn_radius <= 0. {
            return Err(invalid("motion.turn_radius", "must be a positive finite number"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub simulator: SimulatorConfig,
    pub spawn: SpawnConfig,
    /// agent whose pen is configured and which receives the motion commands
    pub driven_agent: String,
    pub pen: PenConfig,
    pub motion: MotionConfig,
    /// longest wait on the publisher's timer before checking the keyboard again
    pub spin_timeout_ms: u64,
    /// pause after the spawned agent is destroyed, before exiting
    pub cooldown_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            simulator: SimulatorConfig::default(),
            spawn: SpawnConfig::default(),
            driven_agent: "turtle1".to_string(),
            pen: PenConfig::default(),
            motion: MotionConfig::default(),
            spin_timeout_ms: 100,
            cooldown_ms: 15_000,
        }
    }
}

impl DriverConfig {
    /// Reads the config at `path`, or the defaults when there is none.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_json(&fs::read_to_string(path)?),
            None => Ok(Self::default()),
        }
    }

    /// Parses and checks a json config. Missing fields take their default.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulator.availability_poll_ms == 0 {
            return Err(invalid("simulator.availability_poll_ms", "must be positive"));
        }
        self.motion.validate()
    }

    /// Reads the config named by [`CONFIG_PATH_ENV`], if set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV);
        Self::load(path.as_deref().map(Path::new))
    }

    pub fn spin_timeout(&self) -> Duration {
        Duration::from_millis(self.spin_timeout_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

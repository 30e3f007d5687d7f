use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::classifier::builder::{
    DEFAULT_HIDDEN_UNITS, DEFAULT_LEARNING_RATE, DEFAULT_SEED, DEFAULT_STEPS,
};
use crate::model_manager::ModelManager;

pub const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 4011;
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 4096;
pub const DEFAULT_TRAINING_DATA: &str = "training.csv";
pub const DEFAULT_TEST_DATA: &str = "test.csv";

/// Settings for the classification daemon.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Requests larger than this are rejected without a response
    pub max_request_bytes: usize,
    /// Time a client has to deliver a complete request
    pub read_timeout: Duration,
    /// Connections handled at once; further accepts wait for a free slot
    pub max_connections: usize,
    /// How long shutdown waits for in-flight connections before aborting them
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            port: DEFAULT_PORT,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            read_timeout: Duration::from_secs(5),
            max_connections: 64,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Settings for one run of the training pipeline.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub training_data: PathBuf,
    pub test_data: PathBuf,
    /// Directory receiving timestamped model exports
    pub models_dir: PathBuf,
    pub hidden_units: Vec<usize>,
    pub steps: usize,
    pub learning_rate: f32,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            training_data: PathBuf::from(DEFAULT_TRAINING_DATA),
            test_data: PathBuf::from(DEFAULT_TEST_DATA),
            models_dir: ModelManager::get_default_models_dir(),
            hidden_units: DEFAULT_HIDDEN_UNITS.to_vec(),
            steps: DEFAULT_STEPS,
            learning_rate: DEFAULT_LEARNING_RATE,
            seed: DEFAULT_SEED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:4011");
        assert_eq!(config.max_request_bytes, 4096);
    }

    #[test]
    fn test_training_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.training_data, PathBuf::from("training.csv"));
        assert_eq!(config.test_data, PathBuf::from("test.csv"));
        assert_eq!(config.hidden_units, vec![10, 20, 10]);
    }
}

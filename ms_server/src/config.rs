//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Which server this process is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Serves the Memory-Scramble board.
    Board,
    /// Accepts writes and replicates them to followers.
    Leader,
    /// Accepts replication requests from the leader.
    Follower,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "board" => Ok(Mode::Board),
            "leader" => Ok(Mode::Leader),
            "follower" => Ok(Mode::Follower),
            other => Err(format!("unknown mode {other:?}")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Board => "board".fmt(f),
            Mode::Leader => "leader".fmt(f),
            Mode::Follower => "follower".fmt(f),
        }
    }
}

/// Complete server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// What this process serves
    pub mode: Mode,
    /// Path to the board file (board mode)
    pub board_path: Option<String>,
    /// Replication settings (leader and follower modes)
    pub replication: ReplicationConfig,
    /// Prometheus exporter bind address
    pub metrics_bind: SocketAddr,
}

/// Replication-related configuration.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Ordered follower endpoints, e.g. `http://127.0.0.1:8081`
    pub followers: Vec<String>,
    /// Follower acknowledgements required before a write succeeds
    pub write_quorum: usize,
    /// Minimum simulated delay per replication, milliseconds
    pub min_delay_ms: u64,
    /// Maximum simulated delay per replication, milliseconds
    pub max_delay_ms: u64,
    /// This follower's name in logs and acknowledgements
    pub follower_id: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// CLI overrides win over the environment; the environment wins over
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or unparsable.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        mode_override: Option<Mode>,
        board_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_else(|| {
                "127.0.0.1:8080"
                    .parse()
                    .expect("Default bind address is valid")
            });

        let mode = match mode_override {
            Some(mode) => mode,
            None => match std::env::var("MODE") {
                Ok(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                    var: "MODE".to_string(),
                    reason,
                })?,
                Err(_) => Mode::Board,
            },
        };

        let board_path = board_override.or_else(|| std::env::var("BOARD_PATH").ok());

        let followers = std::env::var("FOLLOWERS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let replication = ReplicationConfig {
            followers,
            write_quorum: parse_env_or("WRITE_QUORUM", 3),
            min_delay_ms: parse_env_or("MIN_DELAY", 0),
            max_delay_ms: parse_env_or("MAX_DELAY", 1000),
            follower_id: std::env::var("FOLLOWER_ID").unwrap_or_else(|_| "follower1".to_string()),
        };

        let metrics_bind = std::env::var("MS_METRICS_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| {
                "127.0.0.1:9100"
                    .parse()
                    .expect("Default metrics address is valid")
            });

        Ok(ServerConfig {
            bind,
            mode,
            board_path,
            replication,
            metrics_bind,
        })
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.mode {
            Mode::Board => {
                if self.board_path.as_deref().is_none_or(str::is_empty) {
                    return Err(ConfigError::MissingRequired {
                        var: "BOARD_PATH".to_string(),
                        hint: "Point it at a board file, e.g. boards/ab.txt".to_string(),
                    });
                }
            }
            Mode::Leader => {
                let n = self.replication.followers.len();
                if n == 0 {
                    return Err(ConfigError::MissingRequired {
                        var: "FOLLOWERS".to_string(),
                        hint: "Comma-separated follower endpoints, e.g. \
                               http://127.0.0.1:8081,http://127.0.0.1:8082"
                            .to_string(),
                    });
                }
                let quorum = self.replication.write_quorum;
                if quorum == 0 || quorum > n {
                    return Err(ConfigError::Invalid {
                        var: "WRITE_QUORUM".to_string(),
                        reason: format!("Must be between 1 and the follower count ({n})"),
                    });
                }
                if self.replication.max_delay_ms < self.replication.min_delay_ms {
                    return Err(ConfigError::Invalid {
                        var: "MAX_DELAY".to_string(),
                        reason: format!(
                            "Must be at least MIN_DELAY ({})",
                            self.replication.min_delay_ms
                        ),
                    });
                }
            }
            Mode::Follower => {}
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse an environment variable with a default fallback.
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(mode: Mode) -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            mode,
            board_path: Some("boards/ab.txt".to_string()),
            replication: ReplicationConfig {
                followers: vec![
                    "http://127.0.0.1:8081".to_string(),
                    "http://127.0.0.1:8082".to_string(),
                ],
                write_quorum: 2,
                min_delay_ms: 0,
                max_delay_ms: 100,
                follower_id: "follower1".to_string(),
            },
            metrics_bind: "127.0.0.1:9100".parse().unwrap(),
        }
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Board".parse::<Mode>().unwrap(), Mode::Board);
        assert_eq!("LEADER".parse::<Mode>().unwrap(), Mode::Leader);
        assert!("primary".parse::<Mode>().is_err());
    }

    #[test]
    fn board_mode_requires_a_board_path() {
        let mut config = base_config(Mode::Board);
        config.board_path = None;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
        assert!(err.to_string().contains("BOARD_PATH"));
    }

    #[test]
    fn leader_mode_requires_followers() {
        let mut config = base_config(Mode::Leader);
        config.replication.followers.clear();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }

    #[test]
    fn quorum_must_fit_follower_count() {
        let mut config = base_config(Mode::Leader);
        config.replication.write_quorum = 3;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid { .. }
        ));
        config.replication.write_quorum = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid { .. }
        ));
        config.replication.write_quorum = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn delay_range_must_be_ordered() {
        let mut config = base_config(Mode::Leader);
        config.replication.min_delay_ms = 500;
        config.replication.max_delay_ms = 100;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MAX_DELAY"));
    }

    #[test]
    fn follower_mode_validates_without_extras() {
        let mut config = base_config(Mode::Follower);
        config.board_path = None;
        config.replication.followers.clear();
        assert!(config.validate().is_ok());
    }
}

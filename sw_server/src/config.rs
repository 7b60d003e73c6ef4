//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use speed_war::{SessionConfig, db::DatabaseConfig};
use std::net::SocketAddr;

const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration; decks are kept in memory when absent
    pub database: Option<DatabaseConfig>,
    /// Configuration applied to every new session
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unusable value
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => match std::env::var("SERVER_BIND") {
                Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("'{value}' is not an IP:PORT address"),
                })?,
                Err(_) => DEFAULT_BIND.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: "default bind address is malformed".to_string(),
                })?,
            },
        };

        let database_url = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .filter(|url| !url.is_empty());

        // SW_STORAGE forces a backend; otherwise a database URL selects PostgreSQL
        let database = match std::env::var("SW_STORAGE").ok().as_deref() {
            None => database_url.map(DatabaseConfig::from_env),
            Some("memory") => None,
            Some("postgres") => {
                let url = database_url.ok_or_else(|| ConfigError::MissingRequired {
                    var: "DATABASE_URL".to_string(),
                    hint: "Set DATABASE_URL or pass --db-url when SW_STORAGE=postgres".to_string(),
                })?;
                Some(DatabaseConfig::from_env(url))
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "SW_STORAGE".to_string(),
                    reason: format!("'{other}' is not one of memory, postgres"),
                });
            }
        };

        if let Ok(speed) = std::env::var("SW_SPEED")
            && speed.parse::<speed_war::GameSpeed>().is_err()
        {
            return Err(ConfigError::Invalid {
                var: "SW_SPEED".to_string(),
                reason: format!("'{speed}' is not one of relaxed, normal, fast"),
            });
        }

        Ok(ServerConfig {
            bind,
            database,
            session: SessionConfig::from_env(),
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "SW_*".to_string(),
                reason,
            })?;

        if let Some(database) = &self.database {
            if database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        database.max_connections
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            database: None,
            session: SessionConfig::default(),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "SW_SPEED".to_string(),
            reason: "unknown".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SW_SPEED"));
        assert!(msg.contains("unknown"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let bind: SocketAddr = "0.0.0.0:7000".parse().unwrap();
        let config = ServerConfig::from_env(
            Some(bind),
            Some("postgres://localhost/speed_war".to_string()),
        )
        .unwrap();

        assert_eq!(config.bind, bind);
        assert_eq!(
            config.database.map(|db| db.database_url),
            Some("postgres://localhost/speed_war".to_string())
        );
    }

    #[test]
    fn test_validation_rejects_zero_flip_interval() {
        let mut config = config();
        config.session.flip_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_validation_rejects_inverted_pool_sizes() {
        let mut config = config();
        config.database = Some(DatabaseConfig {
            database_url: "postgres://localhost/test".to_string(),
            max_connections: 2,
            min_connections: 5,
            ..DatabaseConfig::default()
        });

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == "DB_MIN_CONNECTIONS"));
    }
}

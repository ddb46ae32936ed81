//! Runtime configuration from environment variables.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `STOWAGE_STORE` | `memory` or `postgres` | `memory` |
//! | `DATABASE_URL` | Postgres connection string | required for `postgres` |
//! | `STOWAGE_DB_MAX_CONNECTIONS` | pool size | `10` |
//! | `STOWAGE_LOG_FORMAT` | `json` or `pretty`, read by `stowage_observability::init` | `json` |

use thiserror::Error;

pub const STORE_VAR: &str = "STOWAGE_STORE";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const MAX_CONNECTIONS_VAR: &str = "STOWAGE_DB_MAX_CONNECTIONS";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StowageConfig {
    pub store: StoreBackend,
}

impl Default for StowageConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::Memory,
        }
    }
}

impl StowageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store = match get(STORE_VAR).as_deref() {
            None => StoreBackend::Memory,
            Some(s) if s.eq_ignore_ascii_case("memory") => StoreBackend::Memory,
            Some(s) if s.eq_ignore_ascii_case("postgres") => {
                let database_url = get(DATABASE_URL_VAR).ok_or(ConfigError::Missing(DATABASE_URL_VAR))?;
                let max_connections = match get(MAX_CONNECTIONS_VAR) {
                    None => DEFAULT_MAX_CONNECTIONS,
                    Some(raw) => raw
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or(ConfigError::Invalid {
                            var: MAX_CONNECTIONS_VAR,
                            value: raw,
                        })?,
                };
                StoreBackend::Postgres {
                    database_url,
                    max_connections,
                }
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: STORE_VAR,
                    value: other.to_string(),
                });
            }
        };

        Ok(Self { store })
    }
}

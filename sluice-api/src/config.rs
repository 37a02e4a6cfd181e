//! Server configuration
//!
//! All settings come from environment variables with sensible defaults so
//! that a bare `sluice-api` starts against an in-memory store.

/// API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; `None` selects the in-memory store
    pub database_url: Option<String>,

    /// Address the HTTP listener binds to
    pub bind_addr: String,

    /// Upper bound on request bodies read by the import handlers
    pub max_body_bytes: usize,

    /// Size of the database connection pool
    pub db_max_connections: u32,

    /// Capacity of the event broadcast channel
    pub event_buffer: usize,

    /// Token of the development consumer seeded into the in-memory store
    pub dev_token: Option<String>,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables:
    /// - DATABASE_URL (optional)
    /// - SLUICE_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - SLUICE_MAX_BODY_BYTES (optional, default: 4 MiB)
    /// - SLUICE_DB_MAX_CONNECTIONS (optional, default: 10)
    /// - SLUICE_EVENT_BUFFER (optional, default: 256)
    /// - SLUICE_DEV_TOKEN (optional, in-memory store only)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let bind_addr = lookup("SLUICE_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let max_body_bytes = parse_or(&lookup, "SLUICE_MAX_BODY_BYTES", defaults.max_body_bytes)?;

        let db_max_connections = parse_or(
            &lookup,
            "SLUICE_DB_MAX_CONNECTIONS",
            defaults.db_max_connections,
        )?;

        let event_buffer = parse_or(&lookup, "SLUICE_EVENT_BUFFER", defaults.event_buffer)?;

        let dev_token = lookup("SLUICE_DEV_TOKEN").filter(|s| !s.trim().is_empty());

        let config = Self {
            database_url,
            bind_addr,
            max_body_bytes,
            db_max_connections,
            event_buffer,
            dev_token,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                anyhow::bail!("DATABASE_URL must start with postgres:// or postgresql://");
            }
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than 0");
        }

        if self.db_max_connections == 0 {
            anyhow::bail!("db_max_connections must be greater than 0");
        }

        if self.event_buffer == 0 {
            anyhow::bail!("event_buffer must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:8080".to_string(),
            max_body_bytes: 4 * 1024 * 1024,
            db_max_connections: 10,
            event_buffer: 256,
            dev_token: None,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.max_body_bytes, 4 * 1024 * 1024);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.event_buffer, 256);
        assert!(config.dev_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://sluice:sluice@db/sluice"),
            ("SLUICE_BIND_ADDR", "127.0.0.1:9000"),
            ("SLUICE_MAX_BODY_BYTES", "1024"),
            ("SLUICE_DEV_TOKEN", "   "),
        ]))
        .unwrap();

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://sluice:sluice@db/sluice")
        );
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.max_body_bytes, 1024);
        assert!(config.dev_token.is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::from_lookup(lookup(&[("SLUICE_MAX_BODY_BYTES", "lots")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SLUICE_EVENT_BUFFER", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "mysql://db")])).is_err());

        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.bind_addr = String::new();
        assert!(config.validate().is_err());
    }
}

//! Server configuration for `Lander`.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `LANDER_*` environment variables.

use std::net::SocketAddr;

use url::Url;

const DEFAULT_PORT: u16 = 8080;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Where pages come from and conversions go.
    pub storage: StorageKind,
    /// Public origin of the site, used to validate redirects.
    pub public_origin: Url,
    /// Optional JSON-lines file that receives a copy of every conversion.
    pub conversion_log: Option<String>,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Add `Secure` to visitor cookies (set when served over HTTPS).
    pub secure_cookies: bool,
}

/// A setting that cannot be used as given.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `LANDER_PUBLIC_ORIGIN` is not an absolute `http`/`https` URL.
    #[error("LANDER_PUBLIC_ORIGIN '{value}' is invalid: {reason}")]
    InvalidOrigin { value: String, reason: String },
}

/// Supported storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    /// In-memory, optionally seeded from a JSON file.
    Memory { seed_file: Option<String> },
    /// PostgreSQL (feature `postgres-backend`).
    Postgres { url: String },
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`)
    /// - `LANDER_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:8080`)
    /// - `LANDER_STORAGE`: `memory` or `postgres` (default: `memory`)
    /// - `LANDER_SEED_FILE`: JSON page seed for the memory store (optional)
    /// - `DATABASE_URL`: PostgreSQL connection string (used when `LANDER_STORAGE=postgres`)
    /// - `LANDER_PUBLIC_ORIGIN`: site origin for redirect checks (default: `http://<bind addr>`)
    /// - `LANDER_CONVERSION_LOG`: JSON-lines conversion log path (optional)
    /// - `LANDER_LOG_LEVEL`: log filter (default: `info`)
    /// - `LANDER_SECURE_COOKIES`: mark cookies `Secure` (default: `false`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a setting is present but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a setting is present but unusable.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Priority: LANDER_BIND_ADDR > PORT > default 127.0.0.1:8080
        let bind_addr = if let Some(addr) = var("LANDER_BIND_ADDR") {
            addr.parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
        } else if let Some(port_str) = var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(DEFAULT_PORT);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
        };

        let storage = match var("LANDER_STORAGE")
            .unwrap_or_else(|| "memory".to_owned())
            .to_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => StorageKind::Postgres {
                url: var("DATABASE_URL")
                    .unwrap_or_else(|| "postgres://localhost/lander".to_owned()),
            },
            _ => StorageKind::Memory {
                seed_file: var("LANDER_SEED_FILE"),
            },
        };

        let public_origin = match var("LANDER_PUBLIC_ORIGIN").filter(|v| !v.trim().is_empty()) {
            Some(value) => parse_origin(&value)?,
            None => Url::parse(&format!("http://{bind_addr}")).unwrap_or_else(|_| fallback_origin()),
        };

        let conversion_log = var("LANDER_CONVERSION_LOG").filter(|p| !p.is_empty());

        let log_level = var("LANDER_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let secure_cookies = var("LANDER_SECURE_COOKIES")
            .is_some_and(|v| v == "true" || v == "1");

        Ok(Self {
            bind_addr,
            storage,
            public_origin,
            conversion_log,
            log_level,
            secure_cookies,
        })
    }
}

fn parse_origin(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidOrigin {
        value: value.to_owned(),
        reason,
    };
    let url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err(invalid("missing host".to_owned())),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

#[allow(clippy::expect_used)]
fn fallback_origin() -> Url {
    Url::parse("http://localhost").expect("static origin literal is a valid URL")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(cfg.storage, StorageKind::Memory { seed_file: None });
        assert_eq!(cfg.public_origin.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.conversion_log.is_none());
        assert!(!cfg.secure_cookies);
    }

    #[test]
    fn port_binds_all_interfaces() {
        let cfg = config(&[("PORT", "3000")]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([0, 0, 0, 0], 3000)));
    }

    #[test]
    fn bind_addr_overrides_port() {
        let cfg = config(&[("PORT", "3000"), ("LANDER_BIND_ADDR", "10.0.0.1:9000")]);
        assert_eq!(cfg.bind_addr, "10.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn postgres_storage() {
        let cfg = config(&[
            ("LANDER_STORAGE", "Postgres"),
            ("DATABASE_URL", "postgres://db/pages"),
        ]);
        assert_eq!(
            cfg.storage,
            StorageKind::Postgres {
                url: "postgres://db/pages".to_owned()
            }
        );
    }

    #[test]
    fn explicit_origin_and_flags() {
        let cfg = config(&[
            ("LANDER_PUBLIC_ORIGIN", "https://pages.example.com"),
            ("LANDER_SECURE_COOKIES", "true"),
            ("LANDER_SEED_FILE", "seed.json"),
            ("LANDER_CONVERSION_LOG", "/var/log/lander.jsonl"),
        ]);
        assert_eq!(cfg.public_origin.as_str(), "https://pages.example.com/");
        assert!(cfg.secure_cookies);
        assert_eq!(
            cfg.storage,
            StorageKind::Memory {
                seed_file: Some("seed.json".to_owned())
            }
        );
        assert_eq!(cfg.conversion_log.as_deref(), Some("/var/log/lander.jsonl"));
    }

    #[test]
    fn invalid_origin_is_an_error() {
        for value in ["not a url", "localhost:8080", "ftp://pages.example.com"] {
            let err = ServerConfig::from_lookup(|key| {
                (key == "LANDER_PUBLIC_ORIGIN").then(|| value.to_owned())
            })
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidOrigin { .. }), "{value}");
            assert!(err.to_string().contains(value));
        }
    }

    #[test]
    fn empty_origin_uses_bind_addr() {
        let cfg = config(&[("LANDER_PUBLIC_ORIGIN", " ")]);
        assert_eq!(cfg.public_origin.as_str(), "http://127.0.0.1:8080/");
    }
}

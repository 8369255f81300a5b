use anyhow::Context;

/// Runtime configuration, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub host: String,
    pub port: u16,
    /// Radius used by the coordinate room search.
    pub search_radius_km: f64,
    pub cors_origin: Option<String>,
}

const DEFAULT_JWT_TTL_SECS: i64 = 36_000;
const DEFAULT_SEARCH_RADIUS_KM: f64 = 10.0;

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET must be set")?;

        let jwt_ttl_secs = match get("JWT_TTL_SECS") {
            Some(v) => v.parse().context("JWT_TTL_SECS must be a number")?,
            None => DEFAULT_JWT_TTL_SECS,
        };
        let port = match get("PORT") {
            Some(v) => v.parse().context("PORT must be a port number")?,
            None => 3000,
        };
        let search_radius_km = match get("SEARCH_RADIUS_KM") {
            Some(v) => v.parse().context("SEARCH_RADIUS_KM must be a number")?,
            None => DEFAULT_SEARCH_RADIUS_KM,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite:rooms.db?mode=rwc".into()),
            jwt_secret,
            jwt_ttl_secs,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            search_radius_km,
            cors_origin: get("CORS_ORIGIN").filter(|s| !s.is_empty()),
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            jwt_secret: "test-secret".into(),
            jwt_ttl_secs: 3600,
            host: "127.0.0.1".into(),
            port: 0,
            search_radius_km: DEFAULT_SEARCH_RADIUS_KM,
            cors_origin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.database_url, "sqlite:rooms.db?mode=rwc");
        assert_eq!(config.jwt_ttl_secs, DEFAULT_JWT_TTL_SECS);
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn test_missing_secret_is_error() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", "")])).is_err());
    }

    #[test]
    fn test_invalid_port_is_error() {
        let result = Config::from_lookup(lookup(&[("JWT_SECRET", "x"), ("PORT", "http")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "x"),
            ("PORT", "8080"),
            ("SEARCH_RADIUS_KM", "2.5"),
            ("CORS_ORIGIN", "https://rooms.example"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.search_radius_km, 2.5);
        assert_eq!(config.cors_origin.as_deref(), Some("https://rooms.example"));
    }
}

// Configuration de l'application, lue une seule fois au démarrage
// (variables d'environnement + fichier .env via dotenv).

use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

const DEFAULT_JWT_SECRET: &str = "default-insecure-key-change-this";
/// Au plus un an
const JWT_TTL_HOURS_RANGE: RangeInclusive<i64> = 1..=8_760;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// Dossier racine des fichiers uploadés (images des recettes)
    pub media_root: PathBuf,
    pub password_iterations: u32,
    /// Taille de page par défaut quand `limit` n'est pas fourni
    pub page_size: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in .env file")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not found in .env, using default (INSECURE)");
            DEFAULT_JWT_SECRET.to_string()
        });

        Ok(Self {
            database_url,
            bind_addr: try_load("BIND_ADDR", "127.0.0.1:8080")?,
            jwt_secret,
            jwt_ttl_hours: in_range(
                "JWT_TTL_HOURS",
                try_load("JWT_TTL_HOURS", "24")?,
                JWT_TTL_HOURS_RANGE,
            )?,
            media_root: try_load("MEDIA_ROOT", "media")?,
            password_iterations: in_range(
                "PASSWORD_ITERATIONS",
                try_load("PASSWORD_ITERATIONS", "260000")?,
                1..=u32::MAX,
            )?,
            page_size: in_range("PAGE_SIZE", try_load("PAGE_SIZE", "6")?, 1..=100)?,
        })
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

fn in_range<T: PartialOrd + Display>(
    key: &'static str,
    value: T,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError> {
    if !range.contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("{value} is outside {}..={}", range.start(), range.end()),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_load_falls_back_to_default() {
        let value: u64 = try_load("FOODGRAM_TEST_UNSET_VARIABLE", "6").unwrap();
        assert_eq!(value, 6);
    }

    #[test]
    fn test_try_load_rejects_garbage_default() {
        let result: Result<u32, _> = try_load("FOODGRAM_TEST_UNSET_VARIABLE", "abc");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_jwt_ttl_bounds() {
        assert_eq!(in_range("JWT_TTL_HOURS", 24, JWT_TTL_HOURS_RANGE).unwrap(), 24);
        assert!(matches!(
            in_range("JWT_TTL_HOURS", 0, JWT_TTL_HOURS_RANGE),
            Err(ConfigError::Invalid { key: "JWT_TTL_HOURS", .. })
        ));
        assert!(in_range("JWT_TTL_HOURS", i64::MAX, JWT_TTL_HOURS_RANGE).is_err());
    }
}

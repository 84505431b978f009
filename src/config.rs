//! Service configuration from environment variables

use std::net::SocketAddr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::{AppError, Result};
use crate::orders::CodePolicy;
use crate::schedule::{DEFAULT_LEAD_MINUTES, DEFAULT_TIMEZONE};

/// Service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Timezone all schedules and discount hours are read in
    pub timezone: Tz,
    /// Lead for opening_soon / closing_soon; zero disables them
    pub status_lead: chrono::Duration,
    /// Lead for discount starting_soon / ending_soon; zero disables them
    pub discount_lead: chrono::Duration,
    pub code_policy: CodePolicy,
    /// Attempts for the checkout transaction on transient faults
    pub deduction_retries: u32,
    /// Order notification webhook; notifications are off when unset
    pub notify_webhook_url: Option<String>,
    pub notify_chat_id: Option<String>,
    pub geocoder_url: String,
    /// Minimum spacing between geocoder requests
    pub geocoder_min_interval: Duration,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL must be set".to_string()))?;

        let bind_addr = parse_or(
            get("BIND_ADDR"),
            "BIND_ADDR",
            SocketAddr::from(([0, 0, 0, 0], 8080)),
        )?;

        let timezone = match get("BUSINESS_TIMEZONE") {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|_| AppError::Config(format!("Unknown BUSINESS_TIMEZONE '{}'", name)))?,
            None => DEFAULT_TIMEZONE,
        };

        let status_lead: i64 = parse_or(
            get("STATUS_LEAD_MINUTES"),
            "STATUS_LEAD_MINUTES",
            DEFAULT_LEAD_MINUTES,
        )?;
        let discount_lead: i64 =
            parse_or(get("DISCOUNT_LEAD_MINUTES"), "DISCOUNT_LEAD_MINUTES", 0)?;
        if status_lead < 0 || discount_lead < 0 {
            return Err(AppError::Config("Lead minutes must not be negative".to_string()));
        }

        let defaults = CodePolicy::default();
        let code_policy = CodePolicy::new(
            parse_or(get("ORDER_CODE_LENGTH"), "ORDER_CODE_LENGTH", defaults.length())?,
            parse_or(
                get("ORDER_CODE_FALLBACK_LENGTH"),
                "ORDER_CODE_FALLBACK_LENGTH",
                defaults.fallback_length(),
            )?,
            parse_or(get("ORDER_CODE_ATTEMPTS"), "ORDER_CODE_ATTEMPTS", defaults.attempts())?,
        )
        .map_err(|e| AppError::Config(e.to_string()))?;

        let deduction_retries: u32 = parse_or(get("DEDUCTION_RETRIES"), "DEDUCTION_RETRIES", 3)?;
        let geocoder_interval_ms: u64 =
            parse_or(get("GEOCODER_MIN_INTERVAL_MS"), "GEOCODER_MIN_INTERVAL_MS", 1000)?;

        Ok(Self {
            database_url,
            bind_addr,
            timezone,
            status_lead: chrono::Duration::minutes(status_lead),
            discount_lead: chrono::Duration::minutes(discount_lead),
            code_policy,
            deduction_retries: deduction_retries.max(1),
            notify_webhook_url: get("NOTIFY_WEBHOOK_URL"),
            notify_chat_id: get("NOTIFY_CHAT_ID"),
            geocoder_url: get("GEOCODER_URL")
                .unwrap_or_else(|| "https://nominatim.openstreetmap.org".to_string()),
            geocoder_min_interval: Duration::from_millis(geocoder_interval_ms),
        })
    }
}

/// Parse a present value, or take the default
fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid {} '{}'", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/surplus")]).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.timezone, chrono_tz::Europe::Chisinau);
        assert_eq!(config.status_lead, chrono::Duration::minutes(30));
        assert_eq!(config.discount_lead, chrono::Duration::zero());
        assert_eq!(config.code_policy, CodePolicy::default());
        assert_eq!(config.deduction_retries, 3);
        assert!(config.notify_webhook_url.is_none());
        assert_eq!(config.geocoder_min_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_database_url_required() {
        assert!(matches!(load(&[]), Err(AppError::Config(_))));
        assert!(matches!(load(&[("DATABASE_URL", "  ")]), Err(AppError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/surplus"),
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("BUSINESS_TIMEZONE", "Europe/Bucharest"),
            ("STATUS_LEAD_MINUTES", "0"),
            ("ORDER_CODE_LENGTH", "7"),
            ("NOTIFY_WEBHOOK_URL", "https://hooks.example/notify"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.timezone, chrono_tz::Europe::Bucharest);
        assert_eq!(config.status_lead, chrono::Duration::zero());
        assert_eq!(config.code_policy.length(), 7);
        assert!(config.notify_webhook_url.is_some());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = ("DATABASE_URL", "postgres://db/surplus");
        assert!(load(&[base, ("BUSINESS_TIMEZONE", "Mars/Olympus")]).is_err());
        assert!(load(&[base, ("STATUS_LEAD_MINUTES", "-5")]).is_err());
        assert!(load(&[base, ("STATUS_LEAD_MINUTES", "soon")]).is_err());
        assert!(load(&[base, ("ORDER_CODE_LENGTH", "4")]).is_err());
    }
}

//! Address geocoding for pickup point data entry.
//!
//! Talks to a Nominatim-compatible search endpoint. Requests are spaced by a
//! minimum interval across all callers sharing the client.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::models::Coordinates;

const USER_AGENT: &str = concat!("surplus-web/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocoder returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Malformed geocoder response: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Extract the first hit of a search response; an empty list is `None`
pub fn parse_search_response(body: &str) -> Result<Option<Coordinates>, GeocodeError> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;

    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };

    let lat: f64 = hit
        .lat
        .trim()
        .parse()
        .map_err(|_| GeocodeError::Malformed(format!("latitude '{}'", hit.lat)))?;
    let lng: f64 = hit
        .lon
        .trim()
        .parse()
        .map_err(|_| GeocodeError::Malformed(format!("longitude '{}'", hit.lon)))?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(GeocodeError::Malformed(format!("out of range {lat},{lng}")));
    }

    Ok(Some(Coordinates { lat, lng }))
}

/// Free-text query for an address within a city
pub fn search_query(address: &str, city: &str) -> Option<String> {
    let address = address.trim();
    let city = city.trim();
    match (address.is_empty(), city.is_empty()) {
        (true, _) => None,
        (false, true) => Some(address.to_string()),
        (false, false) => Some(format!("{address}, {city}")),
    }
}

/// Rate-limited geocoding client
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
    min_interval: Duration,
    last_call: Arc<Mutex<Option<Instant>>>,
}

impl Geocoder {
    pub fn new(base_url: impl Into<String>, min_interval: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            min_interval,
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next request slot and claim it
    async fn throttle(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Coordinates of an address, or `None` when nothing matches
    pub async fn lookup(
        &self,
        address: &str,
        city: &str,
    ) -> Result<Option<Coordinates>, GeocodeError> {
        let Some(query) = search_query(address, city) else {
            return Ok(None);
        };

        self.throttle().await;
        tracing::debug!("Geocoding '{}'", query);

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_search_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_hit() {
        let body = r#"[
            {"lat": "47.0245117", "lon": "28.8322923", "display_name": "Chișinău"},
            {"lat": "1.0", "lon": "2.0"}
        ]"#;
        let coords = parse_search_response(body).unwrap().unwrap();
        assert!((coords.lat - 47.0245117).abs() < 1e-9);
        assert!((coords.lng - 28.8322923).abs() < 1e-9);
    }

    #[test]
    fn test_parse_no_match() {
        assert!(parse_search_response("[]").unwrap().is_none());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(parse_search_response("{}"), Err(GeocodeError::Malformed(_))));
        assert!(matches!(
            parse_search_response(r#"[{"lat": "north", "lon": "28.8"}]"#),
            Err(GeocodeError::Malformed(_))
        ));
        assert!(matches!(
            parse_search_response(r#"[{"lat": "147.0", "lon": "28.8"}]"#),
            Err(GeocodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_search_query() {
        assert_eq!(
            search_query(" str. Ștefan cel Mare 1 ", "Chișinău"),
            Some("str. Ștefan cel Mare 1, Chișinău".to_string())
        );
        assert_eq!(search_query("bd. Dacia 20", " "), Some("bd. Dacia 20".to_string()));
        assert_eq!(search_query("  ", "Chișinău"), None);
    }

    #[tokio::test]
    async fn test_throttle_spaces_calls() {
        let geocoder = Geocoder::new("http://localhost", Duration::from_millis(40));
        let start = Instant::now();
        geocoder.throttle().await;
        geocoder.throttle().await;
        geocoder.throttle().await;
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}

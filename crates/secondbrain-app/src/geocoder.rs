//! Google Maps geocoding client, the concrete `GeocodingProvider` the
//! Places service needs (spec §4.4/§6 `google.maps_api_key`). A `reqwest`
//! client plus an api key field, but blocking: `GeocodingProvider::enrich`
//! is a synchronous trait, called from inside `MessageProcessor::process`
//! which transports run via `spawn_blocking`.

use secondbrain_entities::error::Result;
use secondbrain_entities::places::{EnrichmentResult, GeocodingProvider};
use tracing::warn;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

pub struct GoogleGeocoder {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { client: reqwest::blocking::Client::new(), api_key: api_key.into() }
    }
}

impl GeocodingProvider for GoogleGeocoder {
    fn enrich(&self, query: &str) -> Result<EnrichmentResult> {
        let response = match self.client.get(GEOCODE_URL).query(&[("address", query), ("key", &self.api_key)]).send() {
            Ok(resp) => resp,
            Err(err) => {
                warn!(%err, "google geocoding request failed");
                return Ok(EnrichmentResult { success: false, error: Some(err.to_string()), ..Default::default() });
            }
        };

        let body: serde_json::Value = match response.json() {
            Ok(b) => b,
            Err(err) => {
                warn!(%err, "google geocoding response not JSON");
                return Ok(EnrichmentResult { success: false, error: Some(err.to_string()), ..Default::default() });
            }
        };

        if body.get("status").and_then(|s| s.as_str()) != Some("OK") {
            let status = body.get("status").and_then(|s| s.as_str()).unwrap_or("UNKNOWN").to_string();
            return Ok(EnrichmentResult { success: false, error: Some(status), ..Default::default() });
        }

        let Some(result) = body.get("results").and_then(|r| r.as_array()).and_then(|r| r.first()) else {
            return Ok(EnrichmentResult { success: false, error: Some("no results".to_string()), ..Default::default() });
        };

        let address = result.get("formatted_address").and_then(|a| a.as_str()).map(str::to_string);
        let location = result.get("geometry").and_then(|g| g.get("location"));
        let lat = location.and_then(|l| l.get("lat")).and_then(|v| v.as_f64());
        let lng = location.and_then(|l| l.get("lng")).and_then(|v| v.as_f64());
        let place_id = result.get("place_id").and_then(|p| p.as_str()).map(str::to_string);

        Ok(EnrichmentResult { success: true, address, lat, lng, external_place_id: place_id, error: None })
    }
}

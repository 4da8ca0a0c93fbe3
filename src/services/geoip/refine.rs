//! 反向地理编码精化
//!
//! 配置了增强精度 API key 时，用主提供方返回的坐标做一次反向
//! 地理编码，精化值覆盖 country/city/region。只对主提供方结果
//! 执行，失败静默跳过，不影响原始解析结果。

use std::sync::OnceLock;
use std::time::Duration;

use tracing::{trace, warn};
use ureq::Agent;

/// 反向地理编码请求超时时间
const GEOCODE_TIMEOUT_SECS: u64 = 3;

static GEOCODE_AGENT: OnceLock<Agent> = OnceLock::new();

fn get_agent() -> &'static Agent {
    GEOCODE_AGENT.get_or_init(|| {
        Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(GEOCODE_TIMEOUT_SECS)))
            .build()
            .into()
    })
}

/// 精化结果（只含行政区划字段，坐标不动）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefinedLocation {
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
}

/// Google Geocoding API 反向查询器
pub struct ReverseGeocoder {
    api_key: String,
}

impl ReverseGeocoder {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
        }
    }

    fn fetch_sync(url: String) -> Option<serde_json::Value> {
        let resp = match get_agent().get(&url).call() {
            Ok(r) => r,
            Err(e) => {
                warn!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        match resp.into_body().read_json() {
            Ok(j) => Some(j),
            Err(e) => {
                warn!("Reverse geocode response parse failed: {}", e);
                None
            }
        }
    }

    /// 从 Geocoding 应答的 address_components 提取行政区划
    fn parse(json: &serde_json::Value) -> Option<RefinedLocation> {
        if json["status"].as_str() != Some("OK") {
            trace!(
                "Reverse geocode returned status {:?}",
                json["status"].as_str()
            );
            return None;
        }

        let components = json["results"][0]["address_components"].as_array()?;
        let mut refined = RefinedLocation::default();

        for component in components {
            let Some(types) = component["types"].as_array() else {
                continue;
            };
            let has_type = |t: &str| types.iter().any(|v| v.as_str() == Some(t));
            let long_name = component["long_name"].as_str().map(String::from);

            if has_type("country") {
                refined.country = long_name;
            } else if has_type("locality") || has_type("postal_town") {
                refined.city = long_name;
            } else if has_type("administrative_area_level_1") {
                refined.region = long_name;
            }
        }

        if refined == RefinedLocation::default() {
            None
        } else {
            Some(refined)
        }
    }

    /// 反向地理编码坐标
    pub async fn reverse(&self, lat: f64, lon: f64) -> Option<RefinedLocation> {
        let url = format!(
            "https://maps.googleapis.com/maps/api/geocode/json?latlng={},{}&key={}&result_type=locality|administrative_area_level_1|country",
            lat, lon, self.api_key
        );

        let json = tokio::task::spawn_blocking(move || Self::fetch_sync(url))
            .await
            .unwrap_or_else(|e| {
                warn!("Reverse geocode spawn_blocking failed: {}", e);
                None
            })?;

        Self::parse(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_extracts_components() {
        let body = json!({
            "status": "OK",
            "results": [{
                "address_components": [
                    { "long_name": "Paris", "types": ["locality", "political"] },
                    { "long_name": "Île-de-France", "types": ["administrative_area_level_1", "political"] },
                    { "long_name": "France", "types": ["country", "political"] }
                ]
            }]
        });
        let refined = ReverseGeocoder::parse(&body).expect("refined");
        assert_eq!(refined.country.as_deref(), Some("France"));
        assert_eq!(refined.city.as_deref(), Some("Paris"));
        assert_eq!(refined.region.as_deref(), Some("Île-de-France"));
    }

    #[test]
    fn test_parse_rejects_non_ok_status() {
        let body = json!({ "status": "ZERO_RESULTS", "results": [] });
        assert!(ReverseGeocoder::parse(&body).is_none());
    }

    #[test]
    fn test_parse_empty_components_is_none() {
        let body = json!({
            "status": "OK",
            "results": [{ "address_components": [] }]
        });
        assert!(ReverseGeocoder::parse(&body).is_none());
    }
}

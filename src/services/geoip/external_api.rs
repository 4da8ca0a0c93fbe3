//! 外部 GeoIP API 实现
//!
//! 免费外部服务的 HTTP 查询：主提供方 ip-api.com、次级提供方 ipwho.is。
//! 同步的 ureq 请求通过 spawn_blocking 放进线程池执行。

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{trace, warn};
use ureq::Agent;

use super::provider::{GeoLookup, GeoRecord};

/// HTTP 请求超时时间
const HTTP_TIMEOUT_SECS: u64 = 2;

/// 全局 HTTP Agent（ureq 的 Agent 是 Send + Sync）
static HTTP_AGENT: OnceLock<Agent> = OnceLock::new();

fn get_agent() -> &'static Agent {
    HTTP_AGENT.get_or_init(|| {
        Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
            .build()
            .into()
    })
}

/// 同步获取 JSON（在 spawn_blocking 中调用）
fn fetch_json_sync(url: String) -> Option<serde_json::Value> {
    let agent = get_agent();

    let resp = match agent.get(&url).call() {
        Ok(r) => r,
        Err(e) => {
            warn!("GeoIP API request to \"{}\" failed: {}", url, e);
            return None;
        }
    };

    match resp.into_body().read_json() {
        Ok(j) => Some(j),
        Err(e) => {
            warn!("GeoIP API response from \"{}\" parse failed: {}", url, e);
            None
        }
    }
}

/// 异步包装：模板替换 + 线程池执行
async fn fetch_json(url_template: &str, ip: &str) -> Option<serde_json::Value> {
    let url = url_template.replace("{ip}", ip);

    tokio::task::spawn_blocking(move || fetch_json_sync(url))
        .await
        .unwrap_or_else(|e| {
            warn!("GeoIP spawn_blocking failed: {}", e);
            None
        })
}

fn json_str(value: &serde_json::Value, key: &str) -> Option<String> {
    value[key]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// 主提供方：ip-api.com
///
/// 成功返回形如 `{"status":"success","country":"France","regionName":"Île-de-France",
/// "city":"Paris","lat":48.85,"lon":2.35,"timezone":"Europe/Paris"}`，
/// 失败返回 `{"status":"fail",...}`。
pub struct IpApiProvider {
    url_template: String,
}

impl IpApiProvider {
    /// `url_template` 使用 `{ip}` 作为占位符
    pub fn new(url_template: &str) -> Self {
        Self {
            url_template: url_template.to_string(),
        }
    }

    fn parse(json: &serde_json::Value) -> Option<GeoRecord> {
        if json["status"].as_str() == Some("fail") {
            trace!("ip-api.com returned fail status");
            return None;
        }

        Some(GeoRecord {
            country: json_str(json, "country").or_else(|| json_str(json, "countryCode")),
            city: json_str(json, "city"),
            region: json_str(json, "regionName"),
            latitude: json["lat"].as_f64(),
            longitude: json["lon"].as_f64(),
            timezone: json_str(json, "timezone"),
        })
    }
}

#[async_trait]
impl GeoLookup for IpApiProvider {
    async fn lookup(&self, ip: &str) -> Option<GeoRecord> {
        let json = fetch_json(&self.url_template, ip).await?;
        let record = Self::parse(&json);
        trace!("ip-api.com lookup for {}: {:?}", ip, record);
        record
    }

    fn name(&self) -> &'static str {
        "ip-api.com"
    }
}

/// 次级提供方：ipwho.is
///
/// 成功返回 `{"success":true,"country":"France","region":"Île-de-France",
/// "city":"Paris","latitude":48.85,"longitude":2.35,"timezone":{"id":"Europe/Paris"}}`。
pub struct IpWhoProvider {
    url_template: String,
}

impl IpWhoProvider {
    pub fn new(url_template: &str) -> Self {
        Self {
            url_template: url_template.to_string(),
        }
    }

    fn parse(json: &serde_json::Value) -> Option<GeoRecord> {
        if json["success"].as_bool() == Some(false) {
            trace!("ipwho.is returned success=false");
            return None;
        }

        // timezone 可能是对象（{"id": "..."}）也可能是字符串
        let timezone = json["timezone"]["id"]
            .as_str()
            .or_else(|| json["timezone"].as_str())
            .filter(|s| !s.is_empty())
            .map(String::from);

        Some(GeoRecord {
            country: json_str(json, "country").or_else(|| json_str(json, "country_code")),
            city: json_str(json, "city"),
            region: json_str(json, "region"),
            latitude: json["latitude"].as_f64(),
            longitude: json["longitude"].as_f64(),
            timezone,
        })
    }
}

#[async_trait]
impl GeoLookup for IpWhoProvider {
    async fn lookup(&self, ip: &str) -> Option<GeoRecord> {
        let json = fetch_json(&self.url_template, ip).await?;
        let record = Self::parse(&json);
        trace!("ipwho.is lookup for {}: {:?}", ip, record);
        record
    }

    fn name(&self) -> &'static str {
        "ipwho.is"
    }
}

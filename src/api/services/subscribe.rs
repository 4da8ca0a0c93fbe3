//! 订阅（request access）端点
//!
//! 公开表单提交入口：email 校验失败硬 400；重复提交幂等吞掉
//! （email 唯一，不产生第二行）；成功创建后异步派发 Slack / 邮件
//! lead 提醒，派发失败不影响响应。入口按客户端 IP 限流。

use std::sync::Arc;

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use governor::middleware::NoOpMiddleware;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};
use ts_rs::TS;
use url::Url;

use crate::analytics::classify_entry;
use crate::api::services::admin::{ErrorCode, error_response, success_response};
use crate::services::{GeoResolver, NotificationDispatcher};
use crate::storage::SeaOrmStorage;
use crate::storage::subscriptions::NewSubscription;
use crate::utils::{extract_client_ip, extract_forwarded_ip_from_headers, parse_user_agent};

/// 输出目录常量
const TS_EXPORT_PATH: &str = "../admin-dashboard/src/services/types.generated.ts";

/// 订阅提交负载
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct SubscribeRequest {
    pub email: String,
    pub name: Option<String>,
    pub locale: Option<String>,
    pub session_id: Option<String>,
    pub page_url: Option<String>,
    pub referrer: Option<String>,
    pub screen_resolution: Option<String>,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    /// 行为快照：从 session_start 到提交的秒数
    pub time_to_subscribe_secs: Option<i64>,
    pub pages_viewed: Option<i32>,
    pub scroll_depth: Option<i32>,
}

/// 朴素但够用的 email 形状校验
fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() < 3 || email.len() > 254 || email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// 从页面 URL 提取 UTM 参数（payload 未显式携带时的兜底）
fn utm_from_page(page_url: Option<&str>, param: &str) -> Option<String> {
    let url = Url::parse(page_url?).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == param)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

pub struct SubscribeService;

impl SubscribeService {
    /// POST /api/subscriptions - 订阅提交
    pub async fn handle_subscribe(
        req: HttpRequest,
        payload: web::Json<SubscribeRequest>,
        storage: web::Data<Arc<SeaOrmStorage>>,
        resolver: web::Data<Arc<GeoResolver>>,
        dispatcher: web::Data<Arc<NotificationDispatcher>>,
    ) -> HttpResponse {
        let payload = payload.into_inner();
        let email = payload.email.trim().to_lowercase();

        if email.is_empty() {
            return error_response(
                StatusCode::BAD_REQUEST,
                ErrorCode::BadRequest,
                "email is required",
            );
        }
        if !is_valid_email(&email) {
            return error_response(
                StatusCode::BAD_REQUEST,
                ErrorCode::BadRequest,
                "invalid email format",
            );
        }

        // 富化：IP → 地理；UA → 设备；referrer/UTM → 入口分类
        let ip = extract_client_ip(&req);
        let geo = resolver.resolve(&ip).await;
        let user_agent = req
            .headers()
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(String::from);
        let device = user_agent.as_deref().map(parse_user_agent).unwrap_or_default();
        let entry = classify_entry(payload.page_url.as_deref(), payload.referrer.as_deref());

        let sub = NewSubscription {
            email: email.clone(),
            name: payload.name,
            locale: payload.locale,
            session_id: payload.session_id,
            ip_address: Some(ip),
            country: geo.as_ref().and_then(|g| g.country.clone()),
            city: geo.as_ref().and_then(|g| g.city.clone()),
            region: geo.as_ref().and_then(|g| g.region.clone()),
            latitude: geo.as_ref().and_then(|g| g.latitude),
            longitude: geo.as_ref().and_then(|g| g.longitude),
            timezone: geo.as_ref().and_then(|g| g.timezone.clone()),
            device_type: device.device_type,
            browser: device.browser,
            os: device.os,
            screen_resolution: payload.screen_resolution,
            referrer: payload.referrer,
            entry_point: Some(entry.label().to_string()),
            utm_source: payload
                .utm_source
                .or_else(|| utm_from_page(payload.page_url.as_deref(), "utm_source")),
            utm_campaign: payload
                .utm_campaign
                .or_else(|| utm_from_page(payload.page_url.as_deref(), "utm_campaign")),
            time_to_subscribe_secs: payload.time_to_subscribe_secs,
            pages_viewed: payload.pages_viewed,
            scroll_depth: payload.scroll_depth,
        };
        let (country, city) = (sub.country.clone(), sub.city.clone());

        let created = match storage.insert_subscription(sub).await {
            Ok(created) => created,
            Err(e) => {
                error!("Failed to store subscription: {}", e);
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::InternalServerError,
                    "Failed to store subscription",
                );
            }
        };

        if created {
            info!("New access request stored: {}", email);
            // lead 提醒异步派发，失败只记日志
            let dispatcher = Arc::clone(dispatcher.get_ref());
            let entry_label = entry.label();
            tokio::spawn(async move {
                let place = match (&city, &country) {
                    (Some(city), Some(country)) => format!("{}, {}", city, country),
                    (_, Some(country)) => country.clone(),
                    _ => "unknown location".to_string(),
                };
                dispatcher
                    .send_lead_notification(
                        &email,
                        country.as_deref(),
                        city.as_deref(),
                        Some(entry_label),
                    )
                    .await;
                dispatcher.send_lead_email(&email, &place).await;
            });
        } else {
            debug!("Duplicate subscription ignored");
        }

        success_response(json!({ "created": created }))
    }
}

/// 限流 key：转发头里的客户端 IP，退到连接 IP
#[derive(Clone)]
pub struct SubscribeKeyExtractor;

impl KeyExtractor for SubscribeKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        if let Some(forwarded) = extract_forwarded_ip_from_headers(req.headers()) {
            return Ok(forwarded);
        }
        req.connection_info()
            .peer_addr()
            .map(|s| s.to_string())
            .ok_or_else(|| SimpleKeyExtractionError::new("Unable to extract peer IP"))
    }
}

/// 订阅入口限流：每 2 秒补充 1 个令牌，突发 5 次
pub fn subscribe_rate_limiter() -> Governor<SubscribeKeyExtractor, NoOpMiddleware> {
    let config = GovernorConfigBuilder::default()
        .seconds_per_request(2)
        .burst_size(5)
        .key_extractor(SubscribeKeyExtractor)
        .finish()
        .expect("Invalid rate limit config");

    debug!("Subscribe rate limiter created: 1 req/2s, burst 5");
    Governor::new(&config)
}

/// 订阅路由 `/subscriptions`
pub fn subscribe_routes() -> actix_web::Scope {
    web::scope("/subscriptions").route(
        "",
        web::post()
            .to(SubscribeService::handle_subscribe)
            .wrap(subscribe_rate_limiter()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("client@maison.example"));
        assert!(is_valid_email("a.b+tag@sub.domain.fr"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("spaces in@mail.com"));
        assert!(!is_valid_email("@missing-local.com"));
        assert!(!is_valid_email("nodot@domain"));
    }

    #[test]
    fn test_utm_extraction_from_page_url() {
        let page = Some("https://maison.example/?utm_source=vogue&utm_campaign=ss26");
        assert_eq!(utm_from_page(page, "utm_source").as_deref(), Some("vogue"));
        assert_eq!(utm_from_page(page, "utm_campaign").as_deref(), Some("ss26"));
        assert_eq!(utm_from_page(page, "utm_medium"), None);
        assert_eq!(utm_from_page(None, "utm_source"), None);
    }

    #[test]
    fn export_typescript_types() {
        SubscribeRequest::export_all(&ts_rs::Config::from_env()).expect("Failed to export SubscribeRequest");
    }
}

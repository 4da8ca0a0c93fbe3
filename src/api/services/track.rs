//! 追踪采集端点
//!
//! POST /api/track 与 POST /api/visitors。基本法则：埋点永远不能
//! 破坏用户侧页面——负载解析、地理富化、落库、访客 upsert 任何一步
//! 失败都只记日志，响应始终是 success 形状。at-most-once、best-effort。

use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;
use tracing::{debug, warn};

use crate::analytics::{EventDetail, EventType};
use crate::services::{GeoResolver, VisitorService};
use crate::storage::{SeaOrmStorage, TrackingEventSink};
use crate::utils::{extract_client_ip, parse_user_agent};

pub struct TrackService;

/// 从 JSON 取首个非空字符串字段（兼容 camelCase 与 snake_case 线格式）
fn str_field(json: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| json[*k].as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

impl TrackService {
    /// 宽容解析请求体；解析不了也算"已送达"
    fn parse_body(body: &web::Bytes) -> Option<serde_json::Value> {
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(v) if v.is_object() => Some(v),
            Ok(_) => {
                debug!("Track: non-object payload ignored");
                None
            }
            Err(e) => {
                debug!("Track: unparseable payload ignored: {}", e);
                None
            }
        }
    }

    /// 标准化 + 富化：IP 提取 → 地理解析 → 设备兜底解析
    async fn build_detail(
        req: &HttpRequest,
        payload: &serde_json::Value,
        resolver: &GeoResolver,
    ) -> EventDetail {
        let session_id = str_field(payload, &["sessionId", "session_id"]).unwrap_or_default();
        let event_type = str_field(payload, &["eventType", "event_type"])
            .map(|s| EventType::parse_lossy(&s))
            .unwrap_or_default();

        let ip = extract_client_ip(req);
        let geo = resolver.resolve(&ip).await;

        let user_agent = str_field(payload, &["userAgent", "user_agent"]).or_else(|| {
            req.headers()
                .get("user-agent")
                .and_then(|h| h.to_str().ok())
                .map(String::from)
        });

        let mut detail = EventDetail::new(session_id, event_type)
            .with_page(
                str_field(payload, &["pageUrl", "page_url"]),
                str_field(payload, &["referrer"]),
            )
            .with_ip(ip)
            .with_geo(geo.as_ref());

        detail.user_agent = user_agent;
        detail.event_data = match &payload["eventData"] {
            serde_json::Value::Null => match &payload["event_data"] {
                serde_json::Value::Null => None,
                v => Some(v.clone()),
            },
            v => Some(v.clone()),
        };

        // 客户端上报的设备字段优先，UA 解析只补缺
        detail.device_type = str_field(payload, &["deviceType", "device_type"]);
        detail.browser = str_field(payload, &["browser"]);
        detail.os = str_field(payload, &["os"]);
        detail.screen_resolution = str_field(payload, &["screenResolution", "screen_resolution"]);
        if let Some(ref ua) = detail.user_agent {
            let parsed = parse_user_agent(ua);
            detail = detail.with_device(&parsed);
        }

        detail
    }

    /// POST /api/track - 事件采集
    pub async fn handle_track(
        req: HttpRequest,
        body: web::Bytes,
        storage: web::Data<Arc<SeaOrmStorage>>,
        resolver: web::Data<Arc<GeoResolver>>,
        visitors: web::Data<VisitorService>,
    ) -> HttpResponse {
        let Some(payload) = Self::parse_body(&body) else {
            return Self::received();
        };

        let detail = Self::build_detail(&req, &payload, &resolver).await;

        // 落库失败只记日志：事件视为"已接收"，与存储结果无关
        if let Err(e) = storage.log_event(detail.clone()).await {
            warn!("Track: failed to persist event: {}", e);
        }

        // 带 session 的调用同步推进访客行（同样 best-effort）
        if !detail.session_id.is_empty() {
            visitors.record_visit_best_effort(&detail).await;
        }

        Self::received()
    }

    /// POST /api/visitors - 显式访客 upsert 触发（同一条富化管线）
    pub async fn handle_visitor_upsert(
        req: HttpRequest,
        body: web::Bytes,
        resolver: web::Data<Arc<GeoResolver>>,
        visitors: web::Data<VisitorService>,
    ) -> HttpResponse {
        let Some(payload) = Self::parse_body(&body) else {
            return Self::received();
        };

        let mut detail = Self::build_detail(&req, &payload, &resolver).await;
        if detail.event_type == EventType::Other {
            detail.event_type = EventType::PageView;
        }

        if detail.session_id.is_empty() {
            debug!("Visitor upsert skipped: no session_id in payload");
            return Self::received();
        }

        match visitors.record_visit(&detail).await {
            Ok(outcome) => HttpResponse::Ok().json(json!({
                "success": true,
                "is_new_visitor": outcome.is_new_visitor,
                "visit_count": outcome.visitor.visit_count,
            })),
            Err(e) => {
                warn!("Visitor upsert failed: {}", e);
                Self::received()
            }
        }
    }

    /// 采集路径的统一应答：无论内部结果如何都是 success 形状
    fn received() -> HttpResponse {
        HttpResponse::Ok().json(json!({ "success": true }))
    }
}

/// 采集路由 `/api`
pub fn track_routes() -> actix_web::Scope {
    web::scope("/api")
        .route("/track", web::post().to(TrackService::handle_track))
        .route(
            "/visitors",
            web::post().to(TrackService::handle_visitor_upsert),
        )
        .service(super::subscribe::subscribe_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_field_prefers_camel_case_then_snake() {
        let v = json!({ "sessionId": "abc", "session_id": "def" });
        assert_eq!(str_field(&v, &["sessionId", "session_id"]).as_deref(), Some("abc"));

        let v = json!({ "session_id": "def" });
        assert_eq!(str_field(&v, &["sessionId", "session_id"]).as_deref(), Some("def"));

        let v = json!({ "sessionId": "   " });
        assert_eq!(str_field(&v, &["sessionId", "session_id"]), None);
    }

    #[test]
    fn test_parse_body_tolerates_garbage() {
        assert!(TrackService::parse_body(&web::Bytes::from_static(b"not json")).is_none());
        assert!(TrackService::parse_body(&web::Bytes::from_static(b"[1,2]")).is_none());
        assert!(TrackService::parse_body(&web::Bytes::from_static(b"{\"a\":1}")).is_some());
    }
}

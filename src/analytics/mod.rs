//! 行为分析核心类型
//!
//! 客户端采集（collector）与服务端入库（sink）共用的事件模型。

pub mod collector;
pub mod entry;
pub mod session;

pub use collector::{ChannelTransport, EventCollector, EventTransport, OutboundEvent};
pub use entry::{EntryPoint, classify_entry};
pub use session::generate_session_id;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

use crate::services::geoip::GeoRecord;
use crate::utils::DeviceInfo;

/// 事件类型
///
/// 线上载荷里是自由字符串；未知值归一化为 `Other`，
/// 追踪路径从不因枚举不认识而拒收。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString, AsRefStr, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    PageView,
    Subscription,
    Share,
    Exit,
    Click,
    Scroll,
    SessionStart,
    SessionEnd,
    #[default]
    Other,
}

impl EventType {
    /// 容错解析：未知字符串映射为 `Other`
    pub fn parse_lossy(s: &str) -> Self {
        EventType::from_str(s).unwrap_or(EventType::Other)
    }
}

/// 单条追踪事件明细（入库前的标准化形态）
#[derive(Debug, Clone)]
pub struct EventDetail {
    pub session_id: String,
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
    pub page_url: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    /// 自由格式负载，入库时序列化为 JSON 文本
    pub event_data: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub screen_resolution: Option<String>,
}

impl EventDetail {
    /// 创建新的事件明细，时间戳取服务端接收时刻
    pub fn new(session_id: impl Into<String>, event_type: EventType) -> Self {
        Self {
            session_id: session_id.into(),
            event_type,
            occurred_at: Utc::now(),
            page_url: None,
            referrer: None,
            user_agent: None,
            event_data: None,
            ip_address: None,
            country: None,
            city: None,
            region: None,
            latitude: None,
            longitude: None,
            timezone: None,
            device_type: None,
            browser: None,
            os: None,
            screen_resolution: None,
        }
    }

    pub fn with_page(mut self, page_url: Option<String>, referrer: Option<String>) -> Self {
        self.page_url = page_url;
        self.referrer = referrer;
        self
    }

    pub fn with_ip(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// 合并地理解析结果（None 表示解析失败或私有地址，字段保持空）
    pub fn with_geo(mut self, geo: Option<&GeoRecord>) -> Self {
        if let Some(geo) = geo {
            self.country = geo.country.clone();
            self.city = geo.city.clone();
            self.region = geo.region.clone();
            self.latitude = geo.latitude;
            self.longitude = geo.longitude;
            self.timezone = geo.timezone.clone();
        }
        self
    }

    /// 合并设备信息：客户端上报的字段优先，解析结果只做兜底
    pub fn with_device(mut self, parsed: &DeviceInfo) -> Self {
        if self.device_type.is_none() {
            self.device_type = parsed.device_type.clone();
        }
        if self.browser.is_none() {
            self.browser = parsed.browser.clone();
        }
        if self.os.is_none() {
            self.os = parsed.os.clone();
        }
        self
    }
}

/// 访客提醒载荷（Notification Dispatcher 的输入）
#[derive(Debug, Clone, Serialize)]
pub struct VisitorAlert {
    pub session_id: String,
    pub is_new_visitor: bool,
    pub visit_count: i32,
    pub country: Option<String>,
    pub city: Option<String>,
    pub page_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_round_trips_snake_case() {
        assert_eq!(EventType::PageView.to_string(), "page_view");
        assert_eq!(EventType::SessionStart.to_string(), "session_start");
        assert_eq!(EventType::parse_lossy("scroll"), EventType::Scroll);
    }

    #[test]
    fn test_unknown_event_type_is_lossy() {
        assert_eq!(EventType::parse_lossy("hover"), EventType::Other);
        assert_eq!(EventType::parse_lossy(""), EventType::Other);
    }

    #[test]
    fn test_detail_geo_merge_keeps_fields_empty_on_none() {
        let detail = EventDetail::new("s-1", EventType::PageView).with_geo(None);
        assert!(detail.country.is_none());
        assert!(detail.latitude.is_none());
    }

    #[test]
    fn test_detail_device_merge_prefers_client_fields() {
        let mut detail = EventDetail::new("s-1", EventType::PageView);
        detail.browser = Some("Arc".to_string());
        let parsed = DeviceInfo {
            device_type: Some("desktop".to_string()),
            browser: Some("Chrome".to_string()),
            os: Some("Mac OSX".to_string()),
        };
        let detail = detail.with_device(&parsed);
        // 客户端字段保留，缺失字段用解析结果补齐
        assert_eq!(detail.browser.as_deref(), Some("Arc"));
        assert_eq!(detail.device_type.as_deref(), Some("desktop"));
        assert_eq!(detail.os.as_deref(), Some("Mac OSX"));
    }
}

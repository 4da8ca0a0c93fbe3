//! 页面会话事件采集器
//!
//! 一次页面加载对应一个 `EventCollector`：构造时立即发出
//! `session_start` 和首个 `page_view`，之后在浏览器主线程的事件回调里
//! 累积计数并按需发事件。投递走 fire-and-forget 传输，unload 时
//! 页面随时被拆除，采集器从不等待投递结果。

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::Serialize;
use serde_json::json;
use tracing::trace;

use super::entry::{EntryPoint, classify_entry};
use super::session::generate_session_id;
use crate::analytics::EventType;

/// 滚动里程碑阈值（百分比），每个阈值整个会话只发一次
const SCROLL_MILESTONES: [u8; 5] = [25, 50, 75, 90, 100];

/// 采集器产出的出站事件（线格式）
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEvent {
    pub session_id: String,
    pub event_type: String,
    pub page_url: Option<String>,
    pub referrer: Option<String>,
    pub event_data: serde_json::Value,
}

/// 事件传输抽象
///
/// `deliver` 必须立即返回且不得失败到调用方——采集器运行在
/// 用户可见的页面流程里，投递问题只能被吞掉。
pub trait EventTransport: Send {
    fn deliver(&self, event: OutboundEvent);
}

/// 无界通道传输：send 从不阻塞，接收端异步消费并转发到 /api/track
pub struct ChannelTransport {
    tx: Sender<OutboundEvent>,
}

impl ChannelTransport {
    pub fn new() -> (Self, Receiver<OutboundEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl EventTransport for ChannelTransport {
    fn deliver(&self, event: OutboundEvent) {
        // 接收端已关闭时丢弃事件，采集路径不报错
        let _ = self.tx.send(event);
    }
}

/// 页面会话采集器
pub struct EventCollector {
    session_id: String,
    entry: EntryPoint,
    started_at: DateTime<Utc>,
    page_url: Option<String>,
    referrer: Option<String>,
    page_view_count: u32,
    click_count: u32,
    /// 滚动深度高水位（0-100，单调不减）
    max_scroll_depth: u8,
    /// 已触发的里程碑位掩码（与 SCROLL_MILESTONES 对齐）
    fired_milestones: u8,
    exit_fired: bool,
    ended: bool,
    transport: Box<dyn EventTransport>,
}

impl EventCollector {
    /// 创建采集器并立即发出 session_start + page_view
    pub fn new(
        page_url: Option<String>,
        referrer: Option<String>,
        transport: Box<dyn EventTransport>,
    ) -> Self {
        let entry = classify_entry(page_url.as_deref(), referrer.as_deref());
        let mut collector = Self {
            session_id: generate_session_id(),
            entry,
            started_at: Utc::now(),
            page_url,
            referrer,
            page_view_count: 0,
            click_count: 0,
            max_scroll_depth: 0,
            fired_milestones: 0,
            exit_fired: false,
            ended: false,
            transport,
        };

        collector.emit(
            EventType::SessionStart,
            json!({ "entry": collector.entry }),
        );
        collector.page_view_count = 1;
        collector.emit(EventType::PageView, json!({ "view_index": 1 }));
        collector
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn entry(&self) -> &EntryPoint {
        &self.entry
    }

    pub fn page_view_count(&self) -> u32 {
        self.page_view_count
    }

    pub fn click_count(&self) -> u32 {
        self.click_count
    }

    pub fn max_scroll_depth(&self) -> u8 {
        self.max_scroll_depth
    }

    fn emit(&self, event_type: EventType, event_data: serde_json::Value) {
        trace!("EventCollector: emitting {}", event_type);
        self.transport.deliver(OutboundEvent {
            session_id: self.session_id.clone(),
            event_type: event_type.to_string(),
            page_url: self.page_url.clone(),
            referrer: self.referrer.clone(),
            event_data,
        });
    }

    /// SPA 导航时记录新页面浏览
    pub fn track_page_view(&mut self, page_url: impl Into<String>) {
        self.page_url = Some(page_url.into());
        self.page_view_count += 1;
        self.emit(
            EventType::PageView,
            json!({ "view_index": self.page_view_count }),
        );
    }

    /// 订阅提交：携带截至此刻的行为快照
    pub fn track_subscription(&mut self, email: &str, extra: serde_json::Value) {
        let mut data = json!({
            "email": email,
            "time_to_subscribe_secs": self.elapsed_secs(),
            "pages_viewed": self.page_view_count,
            "scroll_depth": self.max_scroll_depth,
            "entry": self.entry,
        });
        if let (Some(obj), Some(extra_obj)) = (data.as_object_mut(), extra.as_object()) {
            for (k, v) in extra_obj {
                obj.insert(k.clone(), v.clone());
            }
        }
        self.emit(EventType::Subscription, data);
    }

    /// 任意自定义事件
    pub fn track_event(&mut self, event_type: EventType, extra: serde_json::Value) {
        self.emit(event_type, extra);
    }

    /// document 点击回调
    pub fn on_click(&mut self, target: Option<&str>) {
        self.click_count += 1;
        self.emit(
            EventType::Click,
            json!({ "click_index": self.click_count, "target": target }),
        );
    }

    /// 滚动回调：推进高水位，必要时发一次里程碑 scroll 事件
    ///
    /// 每次只结算当前深度所属的最高里程碑；跳跃滚动时被越过的
    /// 中间档位不补发。同一里程碑在整个会话内不重复。
    pub fn on_scroll(&mut self, depth_percent: u8) {
        let depth = depth_percent.min(100);
        if depth <= self.max_scroll_depth {
            return;
        }
        self.max_scroll_depth = depth;

        let reached = SCROLL_MILESTONES
            .iter()
            .enumerate()
            .rev()
            .find(|(_, m)| depth >= **m);
        if let Some((i, milestone)) = reached {
            let bit = 1u8 << i;
            if self.fired_milestones & bit == 0 {
                self.fired_milestones |= bit;
                self.emit(EventType::Scroll, json!({ "depth": milestone }));
            }
        }
    }

    /// 鼠标离开视口回调：从顶部离开视为退出意图，整个会话只发一次
    pub fn on_mouse_leave(&mut self, client_y: i32) {
        if client_y > 0 || self.exit_fired {
            return;
        }
        self.exit_fired = true;
        self.emit(
            EventType::Exit,
            json!({ "signal": "mouse_leave", "after_secs": self.elapsed_secs() }),
        );
    }

    /// 页面卸载回调：结算退出信号并发出带行为汇总的 session_end
    ///
    /// 投递是 fire-and-forget 的（beacon 语义），正常的请求完成
    /// 在卸载时刻无法保证。
    pub fn on_unload(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        // 卸载是第二种退出信号；退出意图已触发过则不重复
        if !self.exit_fired {
            self.exit_fired = true;
            self.emit(
                EventType::Exit,
                json!({ "signal": "unload", "after_secs": self.elapsed_secs() }),
            );
        }

        self.emit(
            EventType::SessionEnd,
            json!({
                "signal": "unload",
                "duration_secs": self.elapsed_secs(),
                "page_views": self.page_view_count,
                "clicks": self.click_count,
                "max_scroll_depth": self.max_scroll_depth,
            }),
        );
    }

    fn elapsed_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// 记录所有投递事件的测试传输
    struct RecordingTransport {
        events: Arc<Mutex<Vec<OutboundEvent>>>,
    }

    impl EventTransport for RecordingTransport {
        fn deliver(&self, event: OutboundEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn collector_with_recorder(
        page_url: Option<&str>,
        referrer: Option<&str>,
    ) -> (EventCollector, Arc<Mutex<Vec<OutboundEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let transport = RecordingTransport {
            events: Arc::clone(&events),
        };
        let collector = EventCollector::new(
            page_url.map(String::from),
            referrer.map(String::from),
            Box::new(transport),
        );
        (collector, events)
    }

    fn event_types(events: &Arc<Mutex<Vec<OutboundEvent>>>) -> Vec<String> {
        events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    #[test]
    fn test_construction_fires_session_start_then_page_view() {
        let (collector, events) = collector_with_recorder(Some("https://maison.example/"), None);
        assert_eq!(event_types(&events), vec!["session_start", "page_view"]);
        assert_eq!(collector.page_view_count(), 1);
    }

    #[test]
    fn test_scroll_milestones_fire_once_in_ascending_order() {
        let (mut collector, events) = collector_with_recorder(None, None);

        // 10% → 30% → 60% → 95%：只结算每步的最高档位，
        // 60→95 的跳跃越过 75，不补发
        for depth in [10u8, 30, 60, 95] {
            collector.on_scroll(depth);
        }

        let depths: Vec<u64> = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == "scroll")
            .map(|e| e.event_data["depth"].as_u64().unwrap())
            .collect();
        assert_eq!(depths, vec![25, 50, 90]);

        // 重复到达同一深度不再触发
        collector.on_scroll(95);
        collector.on_scroll(90);
        let scroll_count = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == "scroll")
            .count();
        assert_eq!(scroll_count, 3);
    }

    #[test]
    fn test_scroll_high_water_mark_is_monotonic() {
        let (mut collector, _events) = collector_with_recorder(None, None);
        collector.on_scroll(60);
        collector.on_scroll(20);
        assert_eq!(collector.max_scroll_depth(), 60);
        collector.on_scroll(130);
        assert_eq!(collector.max_scroll_depth(), 100);
    }

    #[test]
    fn test_gradual_scroll_fires_every_milestone() {
        let (mut collector, events) = collector_with_recorder(None, None);
        for depth in [25u8, 50, 75, 90, 100] {
            collector.on_scroll(depth);
        }
        let depths: Vec<u64> = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == "scroll")
            .map(|e| e.event_data["depth"].as_u64().unwrap())
            .collect();
        assert_eq!(depths, vec![25, 50, 75, 90, 100]);
    }

    #[test]
    fn test_jump_to_bottom_settles_only_highest_milestone() {
        let (mut collector, events) = collector_with_recorder(None, None);
        collector.on_scroll(100);
        let depths: Vec<u64> = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == "scroll")
            .map(|e| e.event_data["depth"].as_u64().unwrap())
            .collect();
        assert_eq!(depths, vec![100]);
    }

    #[test]
    fn test_click_counter_increments() {
        let (mut collector, events) = collector_with_recorder(None, None);
        collector.on_click(Some("cta-request-access"));
        collector.on_click(None);
        assert_eq!(collector.click_count(), 2);
        let clicks = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == "click")
            .count();
        assert_eq!(clicks, 2);
    }

    #[test]
    fn test_exit_intent_fires_once_and_only_from_top_edge() {
        let (mut collector, events) = collector_with_recorder(None, None);

        // 从侧边离开不算退出意图
        collector.on_mouse_leave(400);
        // 从顶部离开触发一次
        collector.on_mouse_leave(0);
        collector.on_mouse_leave(-5);

        let exits = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == "exit")
            .count();
        assert_eq!(exits, 1);
    }

    #[test]
    fn test_unload_emits_session_end_with_summary() {
        let (mut collector, events) = collector_with_recorder(None, None);
        collector.track_page_view("https://maison.example/collection");
        collector.on_click(None);
        collector.on_scroll(80);
        collector.on_unload();
        collector.on_unload(); // 幂等

        let all = events.lock().unwrap();
        let ends: Vec<_> = all.iter().filter(|e| e.event_type == "session_end").collect();
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0].event_data["page_views"].as_u64(), Some(2));
        assert_eq!(ends[0].event_data["clicks"].as_u64(), Some(1));
        assert_eq!(ends[0].event_data["max_scroll_depth"].as_u64(), Some(80));

        // 卸载同时结算退出信号
        let exits: Vec<_> = all.iter().filter(|e| e.event_type == "exit").collect();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].event_data["signal"].as_str(), Some("unload"));
    }

    #[test]
    fn test_unload_after_exit_intent_does_not_duplicate_exit() {
        let (mut collector, events) = collector_with_recorder(None, None);
        collector.on_mouse_leave(0);
        collector.on_unload();

        let exits = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == "exit")
            .count();
        assert_eq!(exits, 1);
    }

    #[test]
    fn test_subscription_carries_behavioral_snapshot() {
        let (mut collector, events) = collector_with_recorder(None, None);
        collector.track_page_view("https://maison.example/collection");
        collector.on_scroll(50);
        collector.track_subscription("client@example.com", serde_json::json!({"locale": "fr"}));

        let all = events.lock().unwrap();
        let sub = all
            .iter()
            .find(|e| e.event_type == "subscription")
            .expect("subscription event");
        assert_eq!(sub.event_data["email"].as_str(), Some("client@example.com"));
        assert_eq!(sub.event_data["pages_viewed"].as_u64(), Some(2));
        assert_eq!(sub.event_data["scroll_depth"].as_u64(), Some(50));
        assert_eq!(sub.event_data["locale"].as_str(), Some("fr"));
    }

    #[test]
    fn test_channel_transport_survives_dropped_receiver() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);
        // 接收端没了也不 panic，不阻塞
        transport.deliver(OutboundEvent {
            session_id: "s".into(),
            event_type: "click".into(),
            page_url: None,
            referrer: None,
            event_data: serde_json::Value::Null,
        });
    }

    #[test]
    fn test_channel_transport_delivers() {
        let (transport, rx) = ChannelTransport::new();
        let mut collector = EventCollector::new(None, None, Box::new(transport));
        collector.on_click(None);

        let received: Vec<OutboundEvent> = rx.try_iter().collect();
        let types: Vec<&str> = received.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["session_start", "page_view", "click"]);
    }
}

//! 访客 upsert 流程集成测试
//!
//! 覆盖：新访客创建、回访累计、visit_count 单调性、
//! pages_visited 追加语义、提醒派发次数。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use atelier::analytics::{EventDetail, EventType, VisitorAlert};
use atelier::services::{VisitorNotifier, VisitorService};
use atelier::storage::SeaOrmStorage;
use atelier::storage::visitors::pages_list;

// =============================================================================
// 测试基建
// =============================================================================

async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let td = TempDir::new().unwrap();
    let p = td.path().join("visitor_flow_test.db");
    let u = format!("sqlite://{}?mode=rwc", p.display());
    let s = SeaOrmStorage::new(&u, 5).await.unwrap();
    (Arc::new(s), td)
}

/// 记录每次提醒调用的计数 notifier
struct CountingNotifier {
    alerts: Mutex<Vec<VisitorAlert>>,
}

impl CountingNotifier {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            alerts: Mutex::new(Vec::new()),
        })
    }

    fn alerts(&self) -> Vec<VisitorAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisitorNotifier for CountingNotifier {
    async fn send_visitor_notification(&self, alert: &VisitorAlert) -> bool {
        self.alerts.lock().unwrap().push(alert.clone());
        true
    }
}

/// 等待异步派发落地（最多约 1 秒）
async fn wait_for_alerts(notifier: &CountingNotifier, expected: usize) {
    for _ in 0..100 {
        if notifier.alerts().len() >= expected {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

fn visit(session_id: &str, page: &str) -> EventDetail {
    EventDetail::new(session_id, EventType::PageView)
        .with_page(Some(page.to_string()), None)
        .with_ip("8.8.8.8")
}

// =============================================================================
// upsert 语义
// =============================================================================

#[tokio::test]
async fn test_new_visitor_creates_row_with_count_one() {
    let (storage, _td) = create_temp_storage().await;
    let notifier = CountingNotifier::new();
    let service = VisitorService::new(Arc::clone(&storage), notifier.clone());

    let outcome = service
        .record_visit(&visit("abc123", "/fr"))
        .await
        .unwrap();

    assert!(outcome.is_new_visitor);
    assert_eq!(outcome.visitor.visit_count, 1);
    assert_eq!(outcome.visitor.session_id, "abc123");
    assert_eq!(pages_list(&outcome.visitor), vec!["/fr"]);
    assert_eq!(outcome.visitor.first_visit, outcome.visitor.last_visit);
}

#[tokio::test]
async fn test_returning_visitor_accumulates() {
    let (storage, _td) = create_temp_storage().await;
    let notifier = CountingNotifier::new();
    let service = VisitorService::new(Arc::clone(&storage), notifier.clone());

    let first = service.record_visit(&visit("abc123", "/fr")).await.unwrap();
    let second = service
        .record_visit(&visit("abc123", "/fr/collection"))
        .await
        .unwrap();

    assert!(!second.is_new_visitor);
    assert_eq!(second.visitor.visit_count, 2);
    // first_visit 不变，last_visit 前进
    assert_eq!(second.visitor.first_visit, first.visitor.first_visit);
    assert!(second.visitor.first_visit <= second.visitor.last_visit);
    assert_eq!(
        pages_list(&second.visitor),
        vec!["/fr", "/fr/collection"]
    );
}

#[tokio::test]
async fn test_visit_count_equals_number_of_calls() {
    let (storage, _td) = create_temp_storage().await;
    let notifier = CountingNotifier::new();
    let service = VisitorService::new(Arc::clone(&storage), notifier.clone());

    const CALLS: usize = 7;
    let mut last = None;
    for i in 0..CALLS {
        let detail = visit("s-many", &format!("/page/{}", i % 3));
        last = Some(service.record_visit(&detail).await.unwrap());
    }

    let outcome = last.unwrap();
    assert_eq!(outcome.visitor.visit_count as usize, CALLS);
    assert_eq!(pages_list(&outcome.visitor).len(), CALLS);

    // 同一 session 只有一行
    let row = storage.find_visitor("s-many").await.unwrap();
    assert!(row.is_some());
}

#[tokio::test]
async fn test_duplicate_pages_are_kept() {
    let (storage, _td) = create_temp_storage().await;
    let notifier = CountingNotifier::new();
    let service = VisitorService::new(Arc::clone(&storage), notifier.clone());

    for _ in 0..3 {
        service.record_visit(&visit("s-dup", "/fr")).await.unwrap();
    }

    let row = storage.find_visitor("s-dup").await.unwrap().unwrap();
    // 不去重：同一页出现三次
    assert_eq!(pages_list(&row), vec!["/fr", "/fr", "/fr"]);
}

#[tokio::test]
async fn test_location_fields_frozen_at_creation() {
    let (storage, _td) = create_temp_storage().await;
    let notifier = CountingNotifier::new();
    let service = VisitorService::new(Arc::clone(&storage), notifier.clone());

    let mut first = visit("s-geo", "/fr");
    first.country = Some("France".into());
    first.city = Some("Paris".into());
    service.record_visit(&first).await.unwrap();

    // 第二次带不同位置（如 VPN 切换），不回写已有行
    let mut second = visit("s-geo", "/it");
    second.country = Some("Italy".into());
    let outcome = service.record_visit(&second).await.unwrap();

    assert_eq!(outcome.visitor.country.as_deref(), Some("France"));
    assert_eq!(outcome.visitor.city.as_deref(), Some("Paris"));
}

// =============================================================================
// 提醒派发
// =============================================================================

#[tokio::test]
async fn test_new_visitor_triggers_exactly_one_notification() {
    let (storage, _td) = create_temp_storage().await;
    let notifier = CountingNotifier::new();
    let service = VisitorService::new(Arc::clone(&storage), notifier.clone());

    let mut detail = visit("abc123", "/fr");
    detail.country = Some("France".into());
    service.record_visit(&detail).await.unwrap();

    wait_for_alerts(&notifier, 1).await;
    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].is_new_visitor);
    assert_eq!(alerts[0].visit_count, 1);
    assert_eq!(alerts[0].session_id, "abc123");
    assert_eq!(alerts[0].country.as_deref(), Some("France"));
}

#[tokio::test]
async fn test_ordinary_return_visits_do_not_notify() {
    let (storage, _td) = create_temp_storage().await;
    let notifier = CountingNotifier::new();
    let service = VisitorService::new(Arc::clone(&storage), notifier.clone());

    // 第 1 次：新访客提醒；第 2-5 次：普通回访，不提醒
    for _ in 0..5 {
        service.record_visit(&visit("s-quiet", "/fr")).await.unwrap();
    }

    wait_for_alerts(&notifier, 1).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(notifier.alerts().len(), 1);
}

#[tokio::test]
async fn test_milestone_visit_count_notifies() {
    let (storage, _td) = create_temp_storage().await;
    let notifier = CountingNotifier::new();
    let service = VisitorService::new(Arc::clone(&storage), notifier.clone());

    // 10 次访问：第 1 次（新访客）+ 第 10 次（里程碑）
    for _ in 0..10 {
        service
            .record_visit(&visit("s-milestone", "/fr"))
            .await
            .unwrap();
    }

    wait_for_alerts(&notifier, 2).await;
    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts[0].is_new_visitor);
    assert!(!alerts[1].is_new_visitor);
    assert_eq!(alerts[1].visit_count, 10);
}

#[tokio::test]
async fn test_best_effort_variant_swallows_errors() {
    let (storage, _td) = create_temp_storage().await;
    let notifier = CountingNotifier::new();
    let service = VisitorService::new(Arc::clone(&storage), notifier.clone());

    // 空 session_id 也不 panic、不返回错误（best-effort 路径）
    let detail = EventDetail::new("", EventType::PageView);
    service.record_visit_best_effort(&detail).await;
}

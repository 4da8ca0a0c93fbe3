//! 事件入库管线集成测试
//!
//! 覆盖：只追加 sink 的单条/批量写入、回读一致性（富化字段写入时
//! 冻结）、全部地理提供方失效时的空位置落库。

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use atelier::analytics::{EventDetail, EventType};
use atelier::services::geoip::{GeoLookup, GeoRecord, GeoResolver};
use atelier::storage::{SeaOrmStorage, TrackingEventSink};

async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let td = TempDir::new().unwrap();
    let p = td.path().join("tracking_pipeline_test.db");
    let u = format!("sqlite://{}?mode=rwc", p.display());
    let s = SeaOrmStorage::new(&u, 5).await.unwrap();
    (Arc::new(s), td)
}

struct FailingProvider;

#[async_trait]
impl GeoLookup for FailingProvider {
    async fn lookup(&self, _ip: &str) -> Option<GeoRecord> {
        None
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

// =============================================================================
// 写入 + 回读
// =============================================================================

#[tokio::test]
async fn test_event_round_trip_preserves_enrichment() {
    let (storage, _td) = create_temp_storage().await;

    let mut detail = EventDetail::new("s-rt", EventType::Scroll)
        .with_page(Some("/fr/collection".into()), Some("https://google.com".into()))
        .with_ip("8.8.8.8")
        .with_geo(Some(&GeoRecord {
            country: Some("France".into()),
            city: Some("Paris".into()),
            region: Some("Île-de-France".into()),
            latitude: Some(48.8566),
            longitude: Some(2.3522),
            timezone: Some("Europe/Paris".into()),
        }));
    detail.event_data = Some(serde_json::json!({ "depth": 75 }));
    detail.user_agent = Some("Mozilla/5.0 test".into());

    storage.log_event(detail.clone()).await.unwrap();

    let rows = storage.events_for_session("s-rt").await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];

    // 关键字段逐一回读：富化结果在写入时冻结，读路径不重算
    assert_eq!(row.session_id, "s-rt");
    assert_eq!(row.event_type, "scroll");
    assert_eq!(row.ip_address.as_deref(), Some("8.8.8.8"));
    assert_eq!(row.country.as_deref(), Some("France"));
    assert_eq!(row.city.as_deref(), Some("Paris"));
    assert_eq!(row.region.as_deref(), Some("Île-de-France"));
    assert_eq!(row.latitude, Some(48.8566));
    assert_eq!(row.longitude, Some(2.3522));
    assert_eq!(row.timezone.as_deref(), Some("Europe/Paris"));
    assert_eq!(row.page_url.as_deref(), Some("/fr/collection"));

    let data: serde_json::Value =
        serde_json::from_str(row.event_data.as_deref().unwrap()).unwrap();
    assert_eq!(data["depth"].as_u64(), Some(75));
}

#[tokio::test]
async fn test_batch_insert_appends_in_order() {
    let (storage, _td) = create_temp_storage().await;

    let details: Vec<EventDetail> = [
        EventType::SessionStart,
        EventType::PageView,
        EventType::Click,
        EventType::Scroll,
    ]
    .into_iter()
    .map(|t| EventDetail::new("s-batch", t))
    .collect();

    storage.log_events_batch(details).await.unwrap();

    let rows = storage.events_for_session("s-batch").await.unwrap();
    let types: Vec<&str> = rows.iter().map(|r| r.event_type.as_str()).collect();
    assert_eq!(types, vec!["session_start", "page_view", "click", "scroll"]);
}

#[tokio::test]
async fn test_empty_batch_is_noop() {
    let (storage, _td) = create_temp_storage().await;
    storage.log_events_batch(Vec::new()).await.unwrap();
}

#[tokio::test]
async fn test_unknown_event_type_stored_as_other() {
    let (storage, _td) = create_temp_storage().await;

    let detail = EventDetail::new("s-unk", EventType::parse_lossy("hover"));
    storage.log_event(detail).await.unwrap();

    let rows = storage.events_for_session("s-unk").await.unwrap();
    assert_eq!(rows[0].event_type, "other");
}

// =============================================================================
// 地理全挂场景
// =============================================================================

#[tokio::test]
async fn test_all_providers_down_event_still_persisted_with_null_location() {
    let (storage, _td) = create_temp_storage().await;
    let resolver = GeoResolver::with_providers(
        Arc::new(FailingProvider),
        vec![Arc::new(FailingProvider)],
        None,
    );

    // 解析返回 None，事件照常落库，位置字段为空
    let geo = resolver.resolve("8.8.8.8").await;
    assert!(geo.is_none());

    let detail = EventDetail::new("s-nogeo", EventType::PageView)
        .with_ip("8.8.8.8")
        .with_geo(geo.as_ref());
    storage.log_event(detail).await.unwrap();

    let rows = storage.events_for_session("s-nogeo").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].country.is_none());
    assert!(rows[0].latitude.is_none());
    assert_eq!(rows[0].ip_address.as_deref(), Some("8.8.8.8"));
}

//! TrackingEvent sink implementation for SeaOrmStorage
//!
//! 只追加的事件日志：单条 / 批量插入，不更新、不删除。
//! 瞬时数据库错误走有限重试，最终失败由调用方（ingest 边界）吞掉。

use async_trait::async_trait;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::debug;

use super::SeaOrmStorage;
use super::retry;
use crate::analytics::EventDetail;
use crate::errors::Result;

use migration::entities::tracking_event;

/// 只追加的事件日志 Sink
#[async_trait]
pub trait TrackingEventSink: Send + Sync {
    /// 记录单条事件
    async fn log_event(&self, detail: EventDetail) -> anyhow::Result<()>;

    /// 批量记录事件
    async fn log_events_batch(&self, details: Vec<EventDetail>) -> anyhow::Result<()>;
}

fn detail_to_active_model(detail: &EventDetail) -> tracking_event::ActiveModel {
    tracking_event::ActiveModel {
        session_id: Set(detail.session_id.clone()),
        event_type: Set(detail.event_type.to_string()),
        occurred_at: Set(detail.occurred_at),
        page_url: Set(detail.page_url.clone()),
        referrer: Set(detail.referrer.clone()),
        user_agent: Set(detail.user_agent.clone()),
        event_data: Set(detail
            .event_data
            .as_ref()
            .map(|v| v.to_string())),
        ip_address: Set(detail.ip_address.clone()),
        country: Set(detail.country.clone()),
        city: Set(detail.city.clone()),
        region: Set(detail.region.clone()),
        latitude: Set(detail.latitude),
        longitude: Set(detail.longitude),
        timezone: Set(detail.timezone.clone()),
        device_type: Set(detail.device_type.clone()),
        browser: Set(detail.browser.clone()),
        os: Set(detail.os.clone()),
        screen_resolution: Set(detail.screen_resolution.clone()),
        ..Default::default()
    }
}

#[async_trait]
impl TrackingEventSink for SeaOrmStorage {
    async fn log_event(&self, detail: EventDetail) -> anyhow::Result<()> {
        self.log_events_batch(vec![detail]).await
    }

    async fn log_events_batch(&self, details: Vec<EventDetail>) -> anyhow::Result<()> {
        if details.is_empty() {
            return Ok(());
        }

        let total_count = details.len();
        let models: Vec<tracking_event::ActiveModel> =
            details.iter().map(detail_to_active_model).collect();

        let db = self.get_db();
        retry::with_retry("log_events_batch", self.retry_config(), || async {
            tracking_event::Entity::insert_many(models.clone())
                .exec(db)
                .await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to insert tracking events: {}", e))?;

        debug!(
            "Tracking events written to {} database ({} records)",
            self.backend_name().to_uppercase(),
            total_count
        );

        Ok(())
    }
}

impl SeaOrmStorage {
    /// 按会话读取事件时间线（入库顺序）
    pub async fn events_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<tracking_event::Model>> {
        let rows = tracking_event::Entity::find()
            .filter(tracking_event::Column::SessionId.eq(session_id))
            .order_by_asc(tracking_event::Column::Id)
            .all(self.get_db())
            .await?;
        Ok(rows)
    }
}

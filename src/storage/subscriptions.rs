//! Subscription 写路径
//!
//! subscriptions 表的唯一写入方。email 唯一约束在库层兜底，
//! 重复提交按幂等 no-op 处理（不产生第二行，也不回写旧行）。

use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, EntityTrait, TryInsertResult};

use super::SeaOrmStorage;
use crate::errors::Result;

use migration::entities::subscription;

/// 一条待落库的订阅（已完成富化的最终形态）
#[derive(Debug, Clone, Default)]
pub struct NewSubscription {
    pub email: String,
    pub name: Option<String>,
    pub locale: Option<String>,
    pub session_id: Option<String>,
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
    pub referrer: Option<String>,
    pub entry_point: Option<String>,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub time_to_subscribe_secs: Option<i64>,
    pub pages_viewed: Option<i32>,
    pub scroll_depth: Option<i32>,
}

impl SeaOrmStorage {
    /// 插入订阅；email 冲突时不做任何事
    ///
    /// 返回本次调用是否真的创建了新行。
    pub async fn insert_subscription(&self, sub: NewSubscription) -> Result<bool> {
        let model = subscription::ActiveModel {
            email: Set(sub.email),
            name: Set(sub.name),
            locale: Set(sub.locale),
            session_id: Set(sub.session_id),
            ip_address: Set(sub.ip_address),
            country: Set(sub.country),
            city: Set(sub.city),
            region: Set(sub.region),
            latitude: Set(sub.latitude),
            longitude: Set(sub.longitude),
            timezone: Set(sub.timezone),
            device_type: Set(sub.device_type),
            browser: Set(sub.browser),
            os: Set(sub.os),
            screen_resolution: Set(sub.screen_resolution),
            referrer: Set(sub.referrer),
            entry_point: Set(sub.entry_point),
            utm_source: Set(sub.utm_source),
            utm_campaign: Set(sub.utm_campaign),
            time_to_subscribe_secs: Set(sub.time_to_subscribe_secs),
            pages_viewed: Set(sub.pages_viewed),
            scroll_depth: Set(sub.scroll_depth),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let result = subscription::Entity::insert(model)
            .on_conflict(
                OnConflict::column(subscription::Column::Email)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(self.get_db())
            .await?;

        Ok(matches!(result, TryInsertResult::Inserted(_)))
    }
}

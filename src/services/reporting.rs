//! 管理端报表服务
//!
//! Subscription / Visitor 的只读查询：筛选、分页、按 country/city
//! 的服务端聚合（聚合作用于完整筛选集而不是当前页）、地图子集与
//! CSV 导出。读路径与写路径相互独立，不依赖写入时序。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::{AtelierError, Result};
use crate::storage::SeaOrmStorage;
use crate::storage::visitors::pages_list;

use migration::entities::{subscription, visitor};

/// 输出目录常量
const TS_EXPORT_PATH: &str = "../admin-dashboard/src/services/types.generated.ts";

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 500;

// ============ 筛选条件 ============

/// 订阅筛选条件
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct SubscriptionFilter {
    pub country: Option<String>,
    pub city: Option<String>,
    /// email 子串匹配
    pub search: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// 访客筛选条件
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct VisitorFilter {
    pub country: Option<String>,
    /// session_id 子串匹配
    pub search: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

fn page_bounds(page: Option<u64>, page_size: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, page_size)
}

// ============ 响应结构 ============

/// 分页信息
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PaginationInfo {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

/// 订阅记录（管理端 DTO）
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct SubscriptionRecord {
    pub id: i64,
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
    pub created_at: DateTime<Utc>,
}

impl From<subscription::Model> for SubscriptionRecord {
    fn from(m: subscription::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            name: m.name,
            locale: m.locale,
            session_id: m.session_id,
            ip_address: m.ip_address,
            country: m.country,
            city: m.city,
            region: m.region,
            latitude: m.latitude,
            longitude: m.longitude,
            timezone: m.timezone,
            device_type: m.device_type,
            browser: m.browser,
            os: m.os,
            screen_resolution: m.screen_resolution,
            referrer: m.referrer,
            entry_point: m.entry_point,
            utm_source: m.utm_source,
            utm_campaign: m.utm_campaign,
            time_to_subscribe_secs: m.time_to_subscribe_secs,
            pages_viewed: m.pages_viewed,
            scroll_depth: m.scroll_depth,
            created_at: m.created_at,
        }
    }
}

/// 访客记录（管理端 DTO，pages_visited 展开为列表）
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct VisitorRecord {
    pub id: i64,
    pub session_id: String,
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
    pub pages_visited: Vec<String>,
    pub visit_count: i32,
    pub first_visit: DateTime<Utc>,
    pub last_visit: DateTime<Utc>,
}

impl From<visitor::Model> for VisitorRecord {
    fn from(m: visitor::Model) -> Self {
        let pages = pages_list(&m);
        Self {
            id: m.id,
            session_id: m.session_id,
            ip_address: m.ip_address,
            country: m.country,
            city: m.city,
            region: m.region,
            latitude: m.latitude,
            longitude: m.longitude,
            timezone: m.timezone,
            device_type: m.device_type,
            browser: m.browser,
            os: m.os,
            screen_resolution: m.screen_resolution,
            pages_visited: pages,
            visit_count: m.visit_count,
            first_visit: m.first_visit,
            last_visit: m.last_visit,
        }
    }
}

/// 国家计数
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CountryCount {
    pub country: String,
    pub count: u64,
}

/// 城市计数
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CityCount {
    pub city: String,
    pub country: Option<String>,
    pub count: u64,
}

/// 按 country/city 的聚合（完整筛选集，不是当前页）
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct GeoBreakdown {
    pub total: u64,
    pub countries: Vec<CountryCount>,
    pub cities: Vec<CityCount>,
}

/// 地图点位（只含坐标非空且非零的行）
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct MapPoint {
    pub email: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// 访客地理分布
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct VisitorGeoStat {
    pub country: String,
    pub city: Option<String>,
    pub count: u64,
}

// ============ SeaORM DSL 辅助结构 ============

#[derive(Debug, FromQueryResult)]
struct CountryCountResult {
    country: Option<String>,
    count: i64,
}

#[derive(Debug, FromQueryResult)]
struct CityCountResult {
    city: Option<String>,
    country: Option<String>,
    count: i64,
}

// ============ 服务 ============

/// 管理端报表服务
#[derive(Clone)]
pub struct ReportingService {
    storage: Arc<SeaOrmStorage>,
}

impl ReportingService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    fn filtered_subscriptions(filter: &SubscriptionFilter) -> Select<subscription::Entity> {
        let mut query = subscription::Entity::find();
        if let Some(ref country) = filter.country {
            query = query.filter(subscription::Column::Country.eq(country));
        }
        if let Some(ref city) = filter.city {
            query = query.filter(subscription::Column::City.eq(city));
        }
        if let Some(ref search) = filter.search
            && !search.is_empty()
        {
            query = query.filter(subscription::Column::Email.contains(search));
        }
        query
    }

    /// 订阅列表（筛选 + 分页，新订阅在前）
    pub async fn list_subscriptions(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<(Vec<SubscriptionRecord>, PaginationInfo)> {
        let db = self.storage.get_db();
        let (page, page_size) = page_bounds(filter.page, filter.page_size);

        let total = Self::filtered_subscriptions(filter).count(db).await?;

        let rows = Self::filtered_subscriptions(filter)
            .order_by_desc(subscription::Column::CreatedAt)
            .offset((page - 1) * page_size)
            .limit(page_size)
            .all(db)
            .await?;

        let pagination = PaginationInfo {
            page,
            page_size,
            total,
            total_pages: total.div_ceil(page_size),
        };
        Ok((rows.into_iter().map(Into::into).collect(), pagination))
    }

    /// 订阅聚合：GROUP BY country / city 作用于完整筛选集
    pub async fn subscription_breakdown(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<GeoBreakdown> {
        let db = self.storage.get_db();

        let total = Self::filtered_subscriptions(filter).count(db).await?;

        let country_rows = Self::filtered_subscriptions(filter)
            .select_only()
            .column(subscription::Column::Country)
            .column_as(subscription::Column::Id.count(), "count")
            .filter(subscription::Column::Country.is_not_null())
            .group_by(subscription::Column::Country)
            .order_by_desc(Expr::cust("count"))
            .into_model::<CountryCountResult>()
            .all(db)
            .await?;

        let city_rows = Self::filtered_subscriptions(filter)
            .select_only()
            .column(subscription::Column::City)
            .column(subscription::Column::Country)
            .column_as(subscription::Column::Id.count(), "count")
            .filter(subscription::Column::City.is_not_null())
            .group_by(subscription::Column::City)
            .group_by(subscription::Column::Country)
            .order_by_desc(Expr::cust("count"))
            .into_model::<CityCountResult>()
            .all(db)
            .await?;

        Ok(GeoBreakdown {
            total,
            countries: country_rows
                .into_iter()
                .map(|r| CountryCount {
                    country: r.country.unwrap_or_else(|| "Unknown".to_string()),
                    count: r.count as u64,
                })
                .collect(),
            cities: city_rows
                .into_iter()
                .map(|r| CityCount {
                    city: r.city.unwrap_or_else(|| "Unknown".to_string()),
                    country: r.country,
                    count: r.count as u64,
                })
                .collect(),
        })
    }

    /// 地图子集：只返回坐标非空且非零的订阅
    pub async fn subscription_map_points(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<MapPoint>> {
        let db = self.storage.get_db();

        let rows = Self::filtered_subscriptions(filter)
            .filter(subscription::Column::Latitude.is_not_null())
            .filter(subscription::Column::Longitude.is_not_null())
            .filter(subscription::Column::Latitude.ne(0.0))
            .filter(subscription::Column::Longitude.ne(0.0))
            .order_by_desc(subscription::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|m| {
                let (lat, lon) = (m.latitude?, m.longitude?);
                Some(MapPoint {
                    email: m.email,
                    latitude: lat,
                    longitude: lon,
                    city: m.city,
                    country: m.country,
                })
            })
            .collect())
    }

    /// 导出完整筛选集为 CSV
    pub async fn export_subscriptions_csv(&self, filter: &SubscriptionFilter) -> Result<String> {
        let db = self.storage.get_db();

        let rows = Self::filtered_subscriptions(filter)
            .order_by_desc(subscription::Column::CreatedAt)
            .all(db)
            .await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "email",
                "name",
                "created_at",
                "country",
                "city",
                "region",
                "latitude",
                "longitude",
                "entry_point",
                "utm_source",
                "utm_campaign",
                "referrer",
                "device_type",
                "browser",
                "os",
                "time_to_subscribe_secs",
                "pages_viewed",
                "scroll_depth",
                "ip_address",
            ])
            .map_err(|e| AtelierError::serialization(format!("CSV header: {}", e)))?;

        for m in rows {
            writer
                .write_record([
                    m.email,
                    m.name.unwrap_or_default(),
                    m.created_at.to_rfc3339(),
                    m.country.unwrap_or_default(),
                    m.city.unwrap_or_default(),
                    m.region.unwrap_or_default(),
                    m.latitude.map(|v| v.to_string()).unwrap_or_default(),
                    m.longitude.map(|v| v.to_string()).unwrap_or_default(),
                    m.entry_point.unwrap_or_default(),
                    m.utm_source.unwrap_or_default(),
                    m.utm_campaign.unwrap_or_default(),
                    m.referrer.unwrap_or_default(),
                    m.device_type.unwrap_or_default(),
                    m.browser.unwrap_or_default(),
                    m.os.unwrap_or_default(),
                    m.time_to_subscribe_secs
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    m.pages_viewed.map(|v| v.to_string()).unwrap_or_default(),
                    m.scroll_depth.map(|v| v.to_string()).unwrap_or_default(),
                    m.ip_address.unwrap_or_default(),
                ])
                .map_err(|e| AtelierError::serialization(format!("CSV row: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AtelierError::serialization(format!("CSV flush: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AtelierError::serialization(format!("CSV encoding: {}", e)))
    }

    fn filtered_visitors(filter: &VisitorFilter) -> Select<visitor::Entity> {
        let mut query = visitor::Entity::find();
        if let Some(ref country) = filter.country {
            query = query.filter(visitor::Column::Country.eq(country));
        }
        if let Some(ref search) = filter.search
            && !search.is_empty()
        {
            query = query.filter(visitor::Column::SessionId.contains(search));
        }
        query
    }

    /// 访客列表（筛选 + 分页，最近访问在前）
    pub async fn list_visitors(
        &self,
        filter: &VisitorFilter,
    ) -> Result<(Vec<VisitorRecord>, PaginationInfo)> {
        let db = self.storage.get_db();
        let (page, page_size) = page_bounds(filter.page, filter.page_size);

        let total = Self::filtered_visitors(filter).count(db).await?;

        let rows = Self::filtered_visitors(filter)
            .order_by_desc(visitor::Column::LastVisit)
            .offset((page - 1) * page_size)
            .limit(page_size)
            .all(db)
            .await?;

        let pagination = PaginationInfo {
            page,
            page_size,
            total,
            total_pages: total.div_ceil(page_size),
        };
        Ok((rows.into_iter().map(Into::into).collect(), pagination))
    }

    /// 访客地理分布：GROUP BY country/city
    pub async fn visitor_geo_stats(&self, limit: u64) -> Result<Vec<VisitorGeoStat>> {
        let db = self.storage.get_db();

        let rows = visitor::Entity::find()
            .select_only()
            .column(visitor::Column::Country)
            .column(visitor::Column::City)
            .column_as(visitor::Column::Id.count(), "count")
            .filter(visitor::Column::Country.is_not_null())
            .group_by(visitor::Column::Country)
            .group_by(visitor::Column::City)
            .order_by_desc(Expr::cust("count"))
            .limit(limit.min(500))
            .into_model::<CityCountResult>()
            .all(db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| VisitorGeoStat {
                country: r.country.unwrap_or_else(|| "Unknown".to_string()),
                city: r.city,
                count: r.count as u64,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds_defaults_and_clamps() {
        assert_eq!(page_bounds(None, None), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(page_bounds(Some(0), Some(0)), (1, 1));
        assert_eq!(page_bounds(Some(3), Some(9999)), (3, MAX_PAGE_SIZE));
    }

    #[test]
    fn export_typescript_types() {
        SubscriptionFilter::export_all(&ts_rs::Config::from_env()).expect("Failed to export SubscriptionFilter");
        VisitorFilter::export_all(&ts_rs::Config::from_env()).expect("Failed to export VisitorFilter");
        PaginationInfo::export_all(&ts_rs::Config::from_env()).expect("Failed to export PaginationInfo");
        SubscriptionRecord::export_all(&ts_rs::Config::from_env()).expect("Failed to export SubscriptionRecord");
        VisitorRecord::export_all(&ts_rs::Config::from_env()).expect("Failed to export VisitorRecord");
        GeoBreakdown::export_all(&ts_rs::Config::from_env()).expect("Failed to export GeoBreakdown");
        MapPoint::export_all(&ts_rs::Config::from_env()).expect("Failed to export MapPoint");
        VisitorGeoStat::export_all(&ts_rs::Config::from_env()).expect("Failed to export VisitorGeoStat");
    }
}

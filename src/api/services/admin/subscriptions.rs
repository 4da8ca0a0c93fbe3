//! 订阅报表端点
//!
//! 筛选 / 分页列表、完整筛选集上的 country/city 聚合、
//! 地图子集（坐标非空非零）与 CSV 导出。

use actix_web::{HttpResponse, web};
use tracing::error;

use crate::services::{ReportingService, SubscriptionFilter};

use super::helpers::{error_response, success_response};
use super::{ErrorCode, PaginatedResponse};
use actix_web::http::StatusCode;

/// GET /admin/v1/subscriptions - 订阅列表
pub async fn get_subscriptions(
    query: web::Query<SubscriptionFilter>,
    reporting: web::Data<ReportingService>,
) -> HttpResponse {
    match reporting.list_subscriptions(&query).await {
        Ok((items, pagination)) => HttpResponse::Ok().json(PaginatedResponse {
            code: ErrorCode::Success as i32,
            data: items,
            pagination,
        }),
        Err(e) => {
            error!("Failed to fetch subscriptions: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ReportQueryFailed,
                "Failed to fetch subscriptions",
            )
        }
    }
}

/// GET /admin/v1/subscriptions/aggregates - country/city 聚合
///
/// 聚合在数据库端对完整筛选集执行，不受分页影响。
pub async fn get_subscription_aggregates(
    query: web::Query<SubscriptionFilter>,
    reporting: web::Data<ReportingService>,
) -> HttpResponse {
    match reporting.subscription_breakdown(&query).await {
        Ok(breakdown) => success_response(breakdown),
        Err(e) => {
            error!("Failed to aggregate subscriptions: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ReportQueryFailed,
                "Failed to aggregate subscriptions",
            )
        }
    }
}

/// GET /admin/v1/subscriptions/map - 地图点位
pub async fn get_subscription_map(
    query: web::Query<SubscriptionFilter>,
    reporting: web::Data<ReportingService>,
) -> HttpResponse {
    match reporting.subscription_map_points(&query).await {
        Ok(points) => success_response(points),
        Err(e) => {
            error!("Failed to fetch map points: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ReportQueryFailed,
                "Failed to fetch map points",
            )
        }
    }
}

/// GET /admin/v1/subscriptions/export - 导出完整筛选集为 CSV
pub async fn export_subscriptions(
    query: web::Query<SubscriptionFilter>,
    reporting: web::Data<ReportingService>,
) -> HttpResponse {
    match reporting.export_subscriptions_csv(&query).await {
        Ok(csv_content) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                "Content-Disposition",
                format!(
                    "attachment; filename=\"subscriptions_{}.csv\"",
                    chrono::Utc::now().format("%Y%m%d_%H%M%S")
                ),
            ))
            .body(csv_content),
        Err(e) => {
            error!("Failed to export subscriptions: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ExportFailed,
                "Failed to export subscriptions",
            )
        }
    }
}

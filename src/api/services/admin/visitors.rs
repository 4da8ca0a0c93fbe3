//! 访客报表端点

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::error;

use crate::services::{ReportingService, VisitorFilter};

use super::helpers::{error_response, success_response};
use super::{ErrorCode, PaginatedResponse};
use actix_web::http::StatusCode;

#[derive(Debug, Deserialize)]
pub struct GeoStatsQuery {
    pub limit: Option<u64>,
}

/// GET /admin/v1/visitors - 访客列表
pub async fn get_visitors(
    query: web::Query<VisitorFilter>,
    reporting: web::Data<ReportingService>,
) -> HttpResponse {
    match reporting.list_visitors(&query).await {
        Ok((items, pagination)) => HttpResponse::Ok().json(PaginatedResponse {
            code: ErrorCode::Success as i32,
            data: items,
            pagination,
        }),
        Err(e) => {
            error!("Failed to fetch visitors: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ReportQueryFailed,
                "Failed to fetch visitors",
            )
        }
    }
}

/// GET /admin/v1/visitors/geo - 访客地理分布
pub async fn get_visitor_geo_stats(
    query: web::Query<GeoStatsQuery>,
    reporting: web::Data<ReportingService>,
) -> HttpResponse {
    match reporting.visitor_geo_stats(query.limit.unwrap_or(50)).await {
        Ok(stats) => success_response(stats),
        Err(e) => {
            error!("Failed to fetch visitor geo stats: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ReportQueryFailed,
                "Failed to fetch visitor geo stats",
            )
        }
    }
}

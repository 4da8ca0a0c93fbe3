//! IP 标签管理端点
//!
//! 管理面 CRUD：缺字段返回 4xx 描述性错误——这是整个系统里
//! 唯一允许硬失败的一类接口（追踪路径永不硬失败）。

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use tracing::error;

use crate::storage::SeaOrmStorage;

use super::helpers::{error_response, success_response};
use super::types::{IpLabelPayload, IpLabelRecord};
use super::ErrorCode;
use actix_web::http::StatusCode;

/// GET /admin/v1/ip-labels - 全部标签
pub async fn get_ip_labels(storage: web::Data<Arc<SeaOrmStorage>>) -> HttpResponse {
    match storage.list_ip_labels().await {
        Ok(rows) => {
            let records: Vec<IpLabelRecord> = rows.into_iter().map(Into::into).collect();
            success_response(records)
        }
        Err(e) => {
            error!("Failed to list ip labels: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalServerError,
                "Failed to list ip labels",
            )
        }
    }
}

/// POST /admin/v1/ip-labels - 创建或更新（按 ip_address upsert）
pub async fn post_ip_label(
    payload: web::Json<IpLabelPayload>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    let payload = payload.into_inner();

    if payload.ip_address.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::BadRequest,
            "ip_address is required",
        );
    }
    if payload.label.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::BadRequest,
            "label is required",
        );
    }

    match storage
        .upsert_ip_label(payload.ip_address.trim(), payload.label.trim(), payload.note)
        .await
    {
        Ok(model) => success_response(IpLabelRecord::from(model)),
        Err(e) => {
            error!("Failed to upsert ip label: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalServerError,
                "Failed to upsert ip label",
            )
        }
    }
}

/// DELETE /admin/v1/ip-labels/{ip} - 删除标签
pub async fn delete_ip_label(
    path: web::Path<String>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    let ip = path.into_inner();

    match storage.delete_ip_label(&ip).await {
        Ok(true) => success_response(serde_json::json!({ "deleted": true })),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            "No label for that ip_address",
        ),
        Err(e) => {
            error!("Failed to delete ip label: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalServerError,
                "Failed to delete ip label",
            )
        }
    }
}

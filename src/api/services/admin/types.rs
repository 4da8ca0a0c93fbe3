//! Admin API 类型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use migration::entities::ip_label;

/// 输出目录常量
pub const TS_EXPORT_PATH: &str = "../admin-dashboard/src/services/types.generated.ts";

/// 统一响应包装
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

/// 带分页信息的响应包装
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PaginatedResponse<T> {
    pub code: i32,
    pub data: T,
    pub pagination: crate::services::PaginationInfo,
}

/// IP 标签创建/更新请求
#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct IpLabelPayload {
    pub ip_address: String,
    pub label: String,
    pub note: Option<String>,
}

/// IP 标签记录
#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct IpLabelRecord {
    pub id: i64,
    pub ip_address: String,
    pub label: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ip_label::Model> for IpLabelRecord {
    fn from(m: ip_label::Model) -> Self {
        Self {
            id: m.id,
            ip_address: m.ip_address,
            label: m.label,
            note: m.note,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};
use ts_rs::TS;

use super::types::TS_EXPORT_PATH;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，ts-rs 自动生成 TypeScript 类型。
/// 按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 4000-4099: 导出错误
/// - 6000-6099: 报表查询错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[ts(rename = "ErrorCode")]
#[ts(repr(enum))]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1030,

    // 导出错误 4000-4099
    ExportFailed = 4001,

    // 报表错误 6000-6099
    ReportQueryFailed = 6000,
}

impl From<&crate::errors::AtelierError> for ErrorCode {
    fn from(err: &crate::errors::AtelierError) -> Self {
        use crate::errors::AtelierError;
        match err {
            AtelierError::Validation(_) => ErrorCode::BadRequest,
            AtelierError::NotFound(_) => ErrorCode::NotFound,
            AtelierError::Serialization(_) => ErrorCode::ExportFailed,
            AtelierError::DatabaseOperation(_) | AtelierError::DatabaseConnection(_) => {
                ErrorCode::ReportQueryFailed
            }
            _ => ErrorCode::InternalServerError,
        }
    }
}

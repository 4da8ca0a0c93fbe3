//! Admin API 服务模块
//!
//! 内部仪表盘的只读报表与 IP 标签管理：
//! - 订阅列表 / 聚合 / 地图 / 导出
//! - 访客列表 / 地理分布
//! - IP 标签 CRUD

pub mod error_code;
mod helpers;
mod ip_labels;
pub mod routes;
mod subscriptions;
mod types;
mod visitors;

// 重新导出类型
pub use types::*;

// 重新导出帮助函数
pub use helpers::{api_result, error_from_atelier, error_response, success_response};

// 重新导出错误码
pub use error_code::ErrorCode;

// 重新导出端点
pub use ip_labels::{delete_ip_label, get_ip_labels, post_ip_label};
pub use subscriptions::{
    export_subscriptions, get_subscription_aggregates, get_subscription_map, get_subscriptions,
};
pub use visitors::{get_visitor_geo_stats, get_visitors};

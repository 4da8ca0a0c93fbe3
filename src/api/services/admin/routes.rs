//! Admin API 路由配置
//!
//! /v1 下的路由按功能模块拆分。

use actix_web::web;

use super::ip_labels::{delete_ip_label, get_ip_labels, post_ip_label};
use super::subscriptions::{
    export_subscriptions, get_subscription_aggregates, get_subscription_map, get_subscriptions,
};
use super::visitors::{get_visitor_geo_stats, get_visitors};

/// 订阅报表路由 `/subscriptions`
///
/// 包含：
/// - GET /subscriptions - 筛选 + 分页列表
/// - GET /subscriptions/aggregates - country/city 聚合（完整筛选集）
/// - GET /subscriptions/map - 地图点位子集
/// - GET /subscriptions/export - CSV 导出
pub fn subscriptions_routes() -> actix_web::Scope {
    web::scope("/subscriptions")
        .route("", web::get().to(get_subscriptions))
        .route("", web::head().to(get_subscriptions))
        .route("/aggregates", web::get().to(get_subscription_aggregates))
        .route("/map", web::get().to(get_subscription_map))
        .route("/export", web::get().to(export_subscriptions))
}

/// 访客报表路由 `/visitors`
pub fn visitors_routes() -> actix_web::Scope {
    web::scope("/visitors")
        .route("", web::get().to(get_visitors))
        .route("/geo", web::get().to(get_visitor_geo_stats))
}

/// IP 标签路由 `/ip-labels`
pub fn ip_labels_routes() -> actix_web::Scope {
    web::scope("/ip-labels")
        .route("", web::get().to(get_ip_labels))
        .route("", web::post().to(post_ip_label))
        .route("/{ip}", web::delete().to(delete_ip_label))
}

/// Admin API v1 路由
///
/// 组合所有子模块路由
pub fn admin_v1_routes() -> actix_web::Scope {
    web::scope("/v1")
        .service(subscriptions_routes())
        .service(visitors_routes())
        .service(ip_labels_routes())
}

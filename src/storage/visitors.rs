//! Visitor upsert for SeaOrmStorage
//!
//! visitors 表的唯一写入方。按 session_id 原子 upsert：
//! 计数自增和页面追加都放在同一条 ON CONFLICT 语句里，
//! 应用层不做读-改-写循环，并发调用依赖数据库原生的
//! upsert 原子性，visit_count 不会丢更新。

use sea_orm::sea_query::{Expr, ExprTrait, OnConflict, SimpleExpr};
use sea_orm::{ActiveValue::Set, ColumnTrait, DbBackend, EntityTrait, QueryFilter};

use super::SeaOrmStorage;
use crate::analytics::EventDetail;
use crate::errors::{AtelierError, Result};

use migration::entities::visitor;

/// 一次 upsert 的结果
#[derive(Debug, Clone)]
pub struct VisitUpsertOutcome {
    /// 本次调用是否创建了新行
    pub is_new_visitor: bool,
    pub visitor: visitor::Model,
}

/// 把换行分隔的 pages_visited 展开为列表
pub fn pages_list(model: &visitor::Model) -> Vec<String> {
    model
        .pages_visited
        .split('\n')
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// 追加页面的 SET 表达式（按后端方言派发）
///
/// sqlite / postgres 用 `||`，mysql 用 CONCAT。追加保持在
/// upsert 语句内部，与计数自增同一原子单元。
fn append_page_expr(backend: DbBackend, page: &str) -> SimpleExpr {
    let suffix = format!("\n{}", page);
    match backend {
        DbBackend::MySql => {
            Expr::cust_with_values("CONCAT(pages_visited, ?)", [suffix])
        }
        _ => Expr::cust_with_values("pages_visited || ?", [suffix]),
    }
}

impl SeaOrmStorage {
    /// 按 session_id 原子 upsert 访客行
    ///
    /// 首次出现：visit_count = 1，first_visit = last_visit = now，
    /// pages_visited = [当前页]。已存在：last_visit = now，
    /// visit_count += 1，追加当前页（允许重复）。位置与设备字段
    /// 只在创建时落库，后续调用不回写。
    pub async fn upsert_visit(&self, detail: &EventDetail) -> Result<VisitUpsertOutcome> {
        let now = detail.occurred_at;
        let page = detail.page_url.clone().unwrap_or_default();

        let model = visitor::ActiveModel {
            session_id: Set(detail.session_id.clone()),
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
            pages_visited: Set(page.clone()),
            visit_count: Set(1),
            first_visit: Set(now),
            last_visit: Set(now),
            ..Default::default()
        };

        let mut on_conflict = OnConflict::column(visitor::Column::SessionId);
        on_conflict
            .value(visitor::Column::LastVisit, Expr::val(now))
            .value(
                visitor::Column::VisitCount,
                Expr::col(visitor::Column::VisitCount).add(1),
            );
        if !page.is_empty() {
            on_conflict.value(
                visitor::Column::PagesVisited,
                append_page_expr(self.db_backend(), &page),
            );
        }

        visitor::Entity::insert(model)
            .on_conflict(on_conflict)
            .exec_without_returning(self.get_db())
            .await?;

        // upsert 后读回整行：visit_count == 1 即本次创建
        let visitor = visitor::Entity::find()
            .filter(visitor::Column::SessionId.eq(detail.session_id.as_str()))
            .one(self.get_db())
            .await?
            .ok_or_else(|| {
                AtelierError::database_operation(format!(
                    "visitor row missing after upsert (session {})",
                    detail.session_id
                ))
            })?;

        Ok(VisitUpsertOutcome {
            is_new_visitor: visitor.visit_count == 1,
            visitor,
        })
    }

    /// 按 session_id 读取访客行
    pub async fn find_visitor(&self, session_id: &str) -> Result<Option<visitor::Model>> {
        let row = visitor::Entity::find()
            .filter(visitor::Column::SessionId.eq(session_id))
            .one(self.get_db())
            .await?;
        Ok(row)
    }
}

//! IP 标签 CRUD
//!
//! 运营标注，按 ip_address upsert-on-conflict。生命周期独立于
//! visitors / subscriptions，属管理面，错误正常上抛。

use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use super::SeaOrmStorage;
use crate::errors::{AtelierError, Result};

use migration::entities::ip_label;

impl SeaOrmStorage {
    /// 创建或更新 IP 标签（按 ip_address 冲突时更新 label/note）
    pub async fn upsert_ip_label(
        &self,
        ip_address: &str,
        label: &str,
        note: Option<String>,
    ) -> Result<ip_label::Model> {
        let now = chrono::Utc::now();
        let model = ip_label::ActiveModel {
            ip_address: Set(ip_address.to_string()),
            label: Set(label.to_string()),
            note: Set(note.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        ip_label::Entity::insert(model)
            .on_conflict(
                OnConflict::column(ip_label::Column::IpAddress)
                    .value(ip_label::Column::Label, Expr::val(label))
                    .value(ip_label::Column::Note, Expr::val(note))
                    .value(ip_label::Column::UpdatedAt, Expr::val(now))
                    .to_owned(),
            )
            .exec_without_returning(self.get_db())
            .await?;

        ip_label::Entity::find()
            .filter(ip_label::Column::IpAddress.eq(ip_address))
            .one(self.get_db())
            .await?
            .ok_or_else(|| {
                AtelierError::database_operation(format!(
                    "ip label missing after upsert ({})",
                    ip_address
                ))
            })
    }

    /// 列出所有 IP 标签（最近更新在前）
    pub async fn list_ip_labels(&self) -> Result<Vec<ip_label::Model>> {
        let rows = ip_label::Entity::find()
            .order_by_desc(ip_label::Column::UpdatedAt)
            .all(self.get_db())
            .await?;
        Ok(rows)
    }

    /// 删除 IP 标签，返回是否存在
    pub async fn delete_ip_label(&self, ip_address: &str) -> Result<bool> {
        let result = ip_label::Entity::delete_many()
            .filter(ip_label::Column::IpAddress.eq(ip_address))
            .exec(self.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }
}

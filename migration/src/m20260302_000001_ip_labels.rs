//! ip_labels 表迁移
//!
//! 运营人员为 IP 地址标注的人读标签，ip_address 唯一，
//! 生命周期独立于 visitors / subscriptions。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IpLabels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IpLabels::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IpLabels::IpAddress)
                            .string_len(45)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(IpLabels::Label).string_len(255).not_null())
                    .col(ColumnDef::new(IpLabels::Note).text().null())
                    .col(
                        ColumnDef::new(IpLabels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IpLabels::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IpLabels::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum IpLabels {
    #[sea_orm(iden = "ip_labels")]
    Table,
    Id,
    IpAddress,
    Label,
    Note,
    CreatedAt,
    UpdatedAt,
}

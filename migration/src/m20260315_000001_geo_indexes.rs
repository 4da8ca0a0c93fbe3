//! 地理聚合索引迁移
//!
//! 为管理端的 country/city 聚合与筛选补充索引。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tracking_events_country")
                    .table(TrackingEvents::Table)
                    .col(TrackingEvents::Country)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_visitors_country")
                    .table(Visitors::Table)
                    .col(Visitors::Country)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subscriptions_country")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::Country)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subscriptions_city")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::City)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_subscriptions_city").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_subscriptions_country").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_visitors_country").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_tracking_events_country")
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum TrackingEvents {
    #[sea_orm(iden = "tracking_events")]
    Table,
    Country,
}

#[derive(DeriveIden)]
enum Visitors {
    #[sea_orm(iden = "visitors")]
    Table,
    Country,
}

#[derive(DeriveIden)]
enum Subscriptions {
    #[sea_orm(iden = "subscriptions")]
    Table,
    Country,
    City,
}

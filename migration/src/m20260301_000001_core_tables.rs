//! 核心表迁移
//!
//! 创建分析管线的三张核心表：
//! - tracking_events：只追加的行为事件日志
//! - visitors：按 session_id 去重的访客累计行
//! - subscriptions：request-access 订阅（email 唯一）

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 tracking_events 表
        manager
            .create_table(
                Table::create()
                    .table(TrackingEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrackingEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TrackingEvents::SessionId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrackingEvents::EventType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrackingEvents::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrackingEvents::PageUrl).text().null())
                    .col(ColumnDef::new(TrackingEvents::Referrer).text().null())
                    .col(ColumnDef::new(TrackingEvents::UserAgent).text().null())
                    .col(ColumnDef::new(TrackingEvents::EventData).text().null())
                    .col(
                        ColumnDef::new(TrackingEvents::IpAddress)
                            .string_len(45)
                            .null(),
                    )
                    .col(ColumnDef::new(TrackingEvents::Country).string_len(100).null())
                    .col(ColumnDef::new(TrackingEvents::City).string_len(100).null())
                    .col(ColumnDef::new(TrackingEvents::Region).string_len(100).null())
                    .col(ColumnDef::new(TrackingEvents::Latitude).double().null())
                    .col(ColumnDef::new(TrackingEvents::Longitude).double().null())
                    .col(ColumnDef::new(TrackingEvents::Timezone).string_len(64).null())
                    .col(
                        ColumnDef::new(TrackingEvents::DeviceType)
                            .string_len(32)
                            .null(),
                    )
                    .col(ColumnDef::new(TrackingEvents::Browser).string_len(64).null())
                    .col(ColumnDef::new(TrackingEvents::Os).string_len(64).null())
                    .col(
                        ColumnDef::new(TrackingEvents::ScreenResolution)
                            .string_len(32)
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // session_id 索引（会话时间线查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tracking_events_session_id")
                    .table(TrackingEvents::Table)
                    .col(TrackingEvents::SessionId)
                    .to_owned(),
            )
            .await?;

        // occurred_at 索引（时间范围查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tracking_events_occurred_at")
                    .table(TrackingEvents::Table)
                    .col(TrackingEvents::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // 复合索引（按类型的时间序列查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tracking_events_type_time")
                    .table(TrackingEvents::Table)
                    .col(TrackingEvents::EventType)
                    .col(TrackingEvents::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // 创建 visitors 表
        manager
            .create_table(
                Table::create()
                    .table(Visitors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Visitors::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Visitors::SessionId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Visitors::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(Visitors::Country).string_len(100).null())
                    .col(ColumnDef::new(Visitors::City).string_len(100).null())
                    .col(ColumnDef::new(Visitors::Region).string_len(100).null())
                    .col(ColumnDef::new(Visitors::Latitude).double().null())
                    .col(ColumnDef::new(Visitors::Longitude).double().null())
                    .col(ColumnDef::new(Visitors::Timezone).string_len(64).null())
                    .col(ColumnDef::new(Visitors::DeviceType).string_len(32).null())
                    .col(ColumnDef::new(Visitors::Browser).string_len(64).null())
                    .col(ColumnDef::new(Visitors::Os).string_len(64).null())
                    .col(
                        ColumnDef::new(Visitors::ScreenResolution)
                            .string_len(32)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Visitors::PagesVisited)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Visitors::VisitCount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Visitors::FirstVisit)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Visitors::LastVisit)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // last_visit 索引（近期访客查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_visitors_last_visit")
                    .table(Visitors::Table)
                    .col(Visitors::LastVisit)
                    .to_owned(),
            )
            .await?;

        // 创建 subscriptions 表
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Subscriptions::Name).string_len(255).null())
                    .col(ColumnDef::new(Subscriptions::Locale).string_len(16).null())
                    .col(
                        ColumnDef::new(Subscriptions::SessionId)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::IpAddress)
                            .string_len(45)
                            .null(),
                    )
                    .col(ColumnDef::new(Subscriptions::Country).string_len(100).null())
                    .col(ColumnDef::new(Subscriptions::City).string_len(100).null())
                    .col(ColumnDef::new(Subscriptions::Region).string_len(100).null())
                    .col(ColumnDef::new(Subscriptions::Latitude).double().null())
                    .col(ColumnDef::new(Subscriptions::Longitude).double().null())
                    .col(ColumnDef::new(Subscriptions::Timezone).string_len(64).null())
                    .col(
                        ColumnDef::new(Subscriptions::DeviceType)
                            .string_len(32)
                            .null(),
                    )
                    .col(ColumnDef::new(Subscriptions::Browser).string_len(64).null())
                    .col(ColumnDef::new(Subscriptions::Os).string_len(64).null())
                    .col(
                        ColumnDef::new(Subscriptions::ScreenResolution)
                            .string_len(32)
                            .null(),
                    )
                    .col(ColumnDef::new(Subscriptions::Referrer).text().null())
                    .col(
                        ColumnDef::new(Subscriptions::EntryPoint)
                            .string_len(32)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UtmSource)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UtmCampaign)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::TimeToSubscribeSecs)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Subscriptions::PagesViewed).integer().null())
                    .col(ColumnDef::new(Subscriptions::ScrollDepth).integer().null())
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // created_at 索引（按时间列出新订阅）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subscriptions_created_at")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除索引
        manager
            .drop_index(
                Index::drop()
                    .name("idx_subscriptions_created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_visitors_last_visit").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_tracking_events_type_time").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_tracking_events_occurred_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_tracking_events_session_id")
                    .to_owned(),
            )
            .await?;

        // 删除表
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Visitors::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(TrackingEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TrackingEvents {
    #[sea_orm(iden = "tracking_events")]
    Table,
    Id,
    SessionId,
    EventType,
    OccurredAt,
    PageUrl,
    Referrer,
    UserAgent,
    EventData,
    IpAddress,
    Country,
    City,
    Region,
    Latitude,
    Longitude,
    Timezone,
    DeviceType,
    Browser,
    Os,
    ScreenResolution,
}

#[derive(DeriveIden)]
enum Visitors {
    #[sea_orm(iden = "visitors")]
    Table,
    Id,
    SessionId,
    IpAddress,
    Country,
    City,
    Region,
    Latitude,
    Longitude,
    Timezone,
    DeviceType,
    Browser,
    Os,
    ScreenResolution,
    PagesVisited,
    VisitCount,
    FirstVisit,
    LastVisit,
}

#[derive(DeriveIden)]
enum Subscriptions {
    #[sea_orm(iden = "subscriptions")]
    Table,
    Id,
    Email,
    Name,
    Locale,
    SessionId,
    IpAddress,
    Country,
    City,
    Region,
    Latitude,
    Longitude,
    Timezone,
    DeviceType,
    Browser,
    Os,
    ScreenResolution,
    Referrer,
    EntryPoint,
    UtmSource,
    UtmCampaign,
    TimeToSubscribeSecs,
    PagesViewed,
    ScrollDepth,
    CreatedAt,
}

//! SeaORM storage backend
//!
//! 关系存储是所有持久实体的唯一属主，支持 SQLite、MySQL/MariaDB
//! 和 PostgreSQL。`SeaOrmStorage` 由进程入口显式构造、显式关闭，
//! 通过 `web::Data` 注入各 handler，不存在全局单例池。

mod connection;
pub mod events;
pub mod ip_labels;
pub mod retry;
pub mod subscriptions;
pub mod visitors;

use sea_orm::{DatabaseConnection, DbBackend};
use tracing::{info, warn};

use crate::errors::{AtelierError, Result};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use events::TrackingEventSink;
pub use retry::RetryConfig;
pub use visitors::VisitUpsertOutcome;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(AtelierError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    /// 重试配置（事件 sink 使用）
    retry_config: RetryConfig,
}

impl SeaOrmStorage {
    /// 连接数据库并运行迁移
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self> {
        let backend_name = infer_backend_from_url(database_url)?;

        let db = match backend_name.as_str() {
            "sqlite" => connect_sqlite(database_url).await?,
            other => connect_generic(database_url, other, pool_size).await?,
        };

        run_migrations(&db).await?;
        info!("Storage initialized ({} backend)", backend_name);

        Ok(Self {
            db,
            backend_name,
            retry_config: RetryConfig::default(),
        })
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// sea_query 方言派发用的 DbBackend
    pub fn db_backend(&self) -> DbBackend {
        match self.backend_name.as_str() {
            "sqlite" => DbBackend::Sqlite,
            "mysql" => DbBackend::MySql,
            _ => DbBackend::Postgres,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry_config
    }

    /// 关闭连接池（进程退出前由入口调用）
    pub async fn close(self) {
        if let Err(e) = self.db.close().await {
            warn!("Failed to close database connection cleanly: {}", e);
        } else {
            info!("Storage connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(
            infer_backend_from_url("sqlite://atelier.db?mode=rwc").unwrap(),
            "sqlite"
        );
        assert_eq!(
            infer_backend_from_url("postgres://user:pw@localhost/atelier").unwrap(),
            "postgres"
        );
        assert_eq!(
            infer_backend_from_url("mysql://user:pw@localhost/atelier").unwrap(),
            "mysql"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }
}

//! 配置结构体定义
//!
//! 所有配置在启动时从环境变量一次性加载（.env 由 dotenvy 读取），
//! 之后以值的形式注入各组件，进程内不再读取环境。

use serde::{Deserialize, Serialize};

/// 顶层应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// 管理 API 路由前缀
    pub admin_prefix: String,
    /// 管理 API Bearer Token，空字符串表示管理端关闭
    pub admin_token: String,
    /// CORS 允许的源，空表示 allow_any_origin（marketing 站点多域名部署）
    pub cors_allowed_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: num_cpus::get(),
            admin_prefix: "/admin".to_string(),
            admin_token: String::new(),
            cors_allowed_origin: None,
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://atelier.db?mode=rwc".to_string(),
            pool_size: 10,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// 日志文件路径，空表示输出到控制台
    pub file: Option<String>,
    /// "json" 或 "text"
    pub format: String,
    pub enable_rotation: bool,
    pub max_backups: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "text".to_string(),
            enable_rotation: true,
            max_backups: 7,
        }
    }
}

/// 分析管线配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// 主 GeoIP 提供方 URL 模板，`{ip}` 为占位符
    pub geoip_primary_url: String,
    /// 次级 GeoIP 提供方 URL 模板（同样的请求形状，无精化）
    pub geoip_fallback_url: String,
    /// 反向地理编码精化 API key（未配置则跳过精化）
    pub geocoding_api_key: Option<String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            geoip_primary_url:
                "http://ip-api.com/json/{ip}?fields=status,country,countryCode,regionName,city,lat,lon,timezone"
                    .to_string(),
            geoip_fallback_url: "https://ipwho.is/{ip}".to_string(),
            geocoding_api_key: None,
        }
    }
}

/// 出站通知配置
///
/// webhook / email key 的回退链在加载时解析为单一值，
/// 调用点不再重复优先级判断。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifyConfig {
    /// 已解析的 Slack webhook URL（None = 通知关闭）
    pub slack_webhook_url: Option<String>,
    /// 已解析的邮件提供方（None = 邮件通知关闭）
    pub email_provider: Option<EmailProvider>,
    /// 通知收件地址
    pub email_to: Option<String>,
    /// 通知发件地址
    pub email_from: Option<String>,
}

/// 邮件提供方：首个配置了 API key 的提供方生效，不做多提供方扇出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailProvider {
    Resend { api_key: String },
    Sendgrid { api_key: String },
}

impl EmailProvider {
    pub fn name(&self) -> &'static str {
        match self {
            EmailProvider::Resend { .. } => "resend",
            EmailProvider::Sendgrid { .. } => "sendgrid",
        }
    }
}

//! 配置加载
//!
//! 环境变量是唯一的配置面。回退链（webhook、邮件 key）集中在这里
//! 解析一次，消除散落在调用点的重复优先级逻辑。

mod structs;

use std::env;

pub use structs::{
    AnalyticsConfig, AppConfig, DatabaseConfig, EmailProvider, LoggingConfig, NotifyConfig,
    ServerConfig,
};

/// 按顺序取第一个非空值
fn first_non_empty(candidates: &[Option<String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .map(|v| v.trim().to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Slack webhook 回退链：专用变量优先，依次退到更通用的变量
pub fn resolve_slack_webhook(
    leads: Option<String>,
    slack: Option<String>,
    generic: Option<String>,
) -> Option<String> {
    first_non_empty(&[leads, slack, generic])
}

/// 邮件提供方回退链：首个配置了 key 的提供方生效
pub fn resolve_email_provider(
    resend_key: Option<String>,
    sendgrid_key: Option<String>,
) -> Option<EmailProvider> {
    if let Some(key) = first_non_empty(&[resend_key]) {
        return Some(EmailProvider::Resend { api_key: key });
    }
    if let Some(key) = first_non_empty(&[sendgrid_key]) {
        return Some(EmailProvider::Sendgrid { api_key: key });
    }
    None
}

impl AppConfig {
    /// 从环境变量加载配置（启动时调用一次）
    pub fn from_env() -> Self {
        let defaults = AnalyticsConfig::default();

        Self {
            server: ServerConfig {
                host: env_or("SERVER_HOST", "127.0.0.1"),
                port: env_parse("SERVER_PORT", 8080),
                workers: env_parse("SERVER_WORKERS", num_cpus::get()),
                admin_prefix: env_or("ADMIN_ROUTE_PREFIX", "/admin"),
                admin_token: env_or("ADMIN_TOKEN", ""),
                cors_allowed_origin: env_opt("CORS_ALLOWED_ORIGIN"),
            },
            database: DatabaseConfig {
                database_url: env_or("DATABASE_URL", "sqlite://atelier.db?mode=rwc"),
                pool_size: env_parse("DATABASE_POOL_SIZE", 10),
            },
            logging: LoggingConfig {
                level: env_or("LOG_LEVEL", "info"),
                file: env_opt("LOG_FILE"),
                format: env_or("LOG_FORMAT", "text"),
                enable_rotation: env_parse("LOG_ROTATION", true),
                max_backups: env_parse("LOG_MAX_BACKUPS", 7),
            },
            analytics: AnalyticsConfig {
                geoip_primary_url: env_or("GEOIP_PRIMARY_URL", &defaults.geoip_primary_url),
                geoip_fallback_url: env_or("GEOIP_FALLBACK_URL", &defaults.geoip_fallback_url),
                geocoding_api_key: env_opt("GEOCODING_API_KEY"),
            },
            notify: NotifyConfig {
                slack_webhook_url: resolve_slack_webhook(
                    env_opt("SLACK_LEADS_WEBHOOK_URL"),
                    env_opt("SLACK_WEBHOOK_URL"),
                    env_opt("WEBHOOK_URL"),
                ),
                email_provider: resolve_email_provider(
                    env_opt("RESEND_API_KEY"),
                    env_opt("SENDGRID_API_KEY"),
                ),
                email_to: env_opt("NOTIFY_EMAIL_TO"),
                email_from: env_opt("NOTIFY_EMAIL_FROM"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_chain_specific_wins() {
        let resolved = resolve_slack_webhook(
            Some("https://hooks.slack.com/leads".into()),
            Some("https://hooks.slack.com/general".into()),
            Some("https://example.com/hook".into()),
        );
        assert_eq!(resolved.as_deref(), Some("https://hooks.slack.com/leads"));
    }

    #[test]
    fn test_webhook_chain_skips_empty_values() {
        let resolved = resolve_slack_webhook(
            Some("   ".into()),
            None,
            Some("https://example.com/hook".into()),
        );
        assert_eq!(resolved.as_deref(), Some("https://example.com/hook"));
    }

    #[test]
    fn test_webhook_chain_all_unset() {
        assert_eq!(resolve_slack_webhook(None, None, None), None);
    }

    #[test]
    fn test_email_provider_first_configured_wins() {
        let provider = resolve_email_provider(Some("re_123".into()), Some("SG.456".into()));
        assert_eq!(
            provider,
            Some(EmailProvider::Resend {
                api_key: "re_123".into()
            })
        );

        let provider = resolve_email_provider(None, Some("SG.456".into()));
        assert_eq!(
            provider,
            Some(EmailProvider::Sendgrid {
                api_key: "SG.456".into()
            })
        );

        assert_eq!(resolve_email_provider(None, None), None);
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.analytics.geoip_primary_url.contains("{ip}"));
        assert!(config.analytics.geoip_fallback_url.contains("{ip}"));
        assert!(config.notify.slack_webhook_url.is_none());
    }
}

//! 出站通知
//!
//! Slack webhook 与邮件提醒。webhook / 邮件提供方在启动时由配置层
//! 解析为单一值；未配置时这里直接短路返回 false，不产生任何网络 IO。
//! 每次限一次投递尝试，超时 10 秒，失败只记日志从不上抛。

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use ureq::Agent;

use crate::analytics::VisitorAlert;
use crate::config::{EmailProvider, NotifyConfig};

/// 出站通知超时时间
const NOTIFY_TIMEOUT_SECS: u64 = 10;

/// 通知专用 Agent：非 2xx 不作为错误抛出，便于捕获状态与响应体
static NOTIFY_AGENT: OnceLock<Agent> = OnceLock::new();

fn get_agent() -> &'static Agent {
    NOTIFY_AGENT.get_or_init(|| {
        Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(NOTIFY_TIMEOUT_SECS)))
            .http_status_as_error(false)
            .build()
            .into()
    })
}

/// 同步 POST JSON，返回是否 2xx（在 spawn_blocking 中调用）
fn post_json_sync(context: &'static str, url: String, body: serde_json::Value) -> bool {
    match get_agent().post(&url).send_json(&body) {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                debug!("{}: webhook delivered ({})", context, status);
                true
            } else {
                // 状态与响应体只进日志，从不上抛
                let text = resp
                    .into_body()
                    .read_to_string()
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                warn!("{}: webhook returned {}: {}", context, status, text);
                false
            }
        }
        Err(e) => {
            warn!("{}: webhook request failed: {}", context, e);
            false
        }
    }
}

async fn post_json(context: &'static str, url: String, body: serde_json::Value) -> bool {
    tokio::task::spawn_blocking(move || post_json_sync(context, url, body))
        .await
        .unwrap_or_else(|e| {
            warn!("{}: spawn_blocking failed: {}", context, e);
            false
        })
}

/// 访客通知接口（VisitorService 依赖此抽象，测试注入计数实现）
#[async_trait]
pub trait VisitorNotifier: Send + Sync {
    /// 发送访客提醒，返回投递是否成功
    async fn send_visitor_notification(&self, alert: &VisitorAlert) -> bool;
}

/// 出站通知调度器
pub struct NotificationDispatcher {
    webhook_url: Option<String>,
    email_provider: Option<EmailProvider>,
    email_to: Option<String>,
    email_from: Option<String>,
}

impl NotificationDispatcher {
    pub fn new(config: &NotifyConfig) -> Self {
        if config.slack_webhook_url.is_none() {
            debug!("Notify: no webhook configured, visitor notifications disabled");
        }
        if let Some(ref provider) = config.email_provider {
            debug!("Notify: email notifications via {}", provider.name());
        }

        Self {
            webhook_url: config.slack_webhook_url.clone(),
            email_provider: config.email_provider.clone(),
            email_to: config.email_to.clone(),
            email_from: config.email_from.clone(),
        }
    }

    pub fn webhook_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn describe_place(country: Option<&str>, city: Option<&str>) -> String {
        match (city, country) {
            (Some(city), Some(country)) => format!("{}, {}", city, country),
            (None, Some(country)) => country.to_string(),
            (Some(city), None) => city.to_string(),
            (None, None) => "somewhere unresolved".to_string(),
        }
    }

    /// 新订阅 lead 的 Slack 提醒
    pub async fn send_lead_notification(
        &self,
        email: &str,
        country: Option<&str>,
        city: Option<&str>,
        entry_point: Option<&str>,
    ) -> bool {
        let Some(url) = self.webhook_url.clone() else {
            debug!("Notify: lead notification skipped, webhook not configured");
            return false;
        };

        let body = json!({
            "text": format!(
                ":sparkles: New access request: {} — {} (entry: {})",
                email,
                Self::describe_place(country, city),
                entry_point.unwrap_or("unknown"),
            ),
        });

        post_json("lead_notification", url, body).await
    }

    /// 新订阅 lead 的邮件提醒（首个配置的提供方生效）
    pub async fn send_lead_email(&self, lead_email: &str, place: &str) -> bool {
        let Some(ref provider) = self.email_provider else {
            debug!("Notify: lead email skipped, no email provider configured");
            return false;
        };
        let (Some(to), Some(from)) = (self.email_to.clone(), self.email_from.clone()) else {
            debug!("Notify: lead email skipped, NOTIFY_EMAIL_TO/FROM not set");
            return false;
        };

        let subject = format!("New access request: {}", lead_email);
        let text = format!("{} requested access from {}.", lead_email, place);

        match provider {
            EmailProvider::Resend { api_key } => {
                let api_key = api_key.clone();
                let body = json!({
                    "from": from,
                    "to": [to],
                    "subject": subject,
                    "text": text,
                });
                tokio::task::spawn_blocking(move || {
                    match get_agent()
                        .post("https://api.resend.com/emails")
                        .header("Authorization", &format!("Bearer {}", api_key))
                        .send_json(&body)
                    {
                        Ok(resp) if resp.status().is_success() => true,
                        Ok(resp) => {
                            warn!("Notify: resend returned {}", resp.status());
                            false
                        }
                        Err(e) => {
                            warn!("Notify: resend request failed: {}", e);
                            false
                        }
                    }
                })
                .await
                .unwrap_or(false)
            }
            EmailProvider::Sendgrid { api_key } => {
                let api_key = api_key.clone();
                let body = json!({
                    "personalizations": [{ "to": [{ "email": to }] }],
                    "from": { "email": from },
                    "subject": subject,
                    "content": [{ "type": "text/plain", "value": text }],
                });
                tokio::task::spawn_blocking(move || {
                    match get_agent()
                        .post("https://api.sendgrid.com/v3/mail/send")
                        .header("Authorization", &format!("Bearer {}", api_key))
                        .send_json(&body)
                    {
                        Ok(resp) if resp.status().is_success() => true,
                        Ok(resp) => {
                            warn!("Notify: sendgrid returned {}", resp.status());
                            false
                        }
                        Err(e) => {
                            warn!("Notify: sendgrid request failed: {}", e);
                            false
                        }
                    }
                })
                .await
                .unwrap_or(false)
            }
        }
    }
}

#[async_trait]
impl VisitorNotifier for NotificationDispatcher {
    /// 访客提醒：未配置 webhook 时立即返回 false，零网络调用
    async fn send_visitor_notification(&self, alert: &VisitorAlert) -> bool {
        let Some(url) = self.webhook_url.clone() else {
            debug!(
                "Notify: visitor notification skipped, webhook not configured (session {})",
                alert.session_id
            );
            return false;
        };

        let headline = if alert.is_new_visitor {
            format!(
                ":eyes: New visitor from {}",
                Self::describe_place(alert.country.as_deref(), alert.city.as_deref())
            )
        } else {
            format!(
                ":fire: Returning visitor ({} visits) from {}",
                alert.visit_count,
                Self::describe_place(alert.country.as_deref(), alert.city.as_deref())
            )
        };

        let body = json!({
            "text": headline,
            "blocks": [{
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!(
                        "{}\n• session: `{}`\n• page: {}",
                        headline,
                        alert.session_id,
                        alert.page_url.as_deref().unwrap_or("-"),
                    ),
                },
            }],
        });

        post_json("visitor_notification", url, body).await
    }
}

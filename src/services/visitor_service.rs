//! 访客 upsert 服务
//!
//! visitors 行的业务入口：每次带 session 的追踪调用都会走到这里。
//! upsert 成功后评估是否值得提醒（新访客、访问次数里程碑），
//! 提醒异步派发，派发失败绝不影响 upsert 结果。

use std::sync::Arc;

use tracing::{debug, warn};

use crate::analytics::{EventDetail, VisitorAlert};
use crate::errors::Result;
use crate::services::notify::VisitorNotifier;
use crate::storage::{SeaOrmStorage, VisitUpsertOutcome};

/// 回头客提醒的访问次数里程碑
const VISIT_MILESTONES: [i32; 3] = [10, 50, 100];

/// 访客 upsert 服务
#[derive(Clone)]
pub struct VisitorService {
    storage: Arc<SeaOrmStorage>,
    notifier: Arc<dyn VisitorNotifier>,
}

impl VisitorService {
    pub fn new(storage: Arc<SeaOrmStorage>, notifier: Arc<dyn VisitorNotifier>) -> Self {
        Self { storage, notifier }
    }

    /// 记录一次访问：原子 upsert + 异步提醒
    pub async fn record_visit(&self, detail: &EventDetail) -> Result<VisitUpsertOutcome> {
        let outcome = self.storage.upsert_visit(detail).await?;

        if Self::is_noteworthy(&outcome) {
            let alert = VisitorAlert {
                session_id: outcome.visitor.session_id.clone(),
                is_new_visitor: outcome.is_new_visitor,
                visit_count: outcome.visitor.visit_count,
                country: outcome.visitor.country.clone(),
                city: outcome.visitor.city.clone(),
                page_url: detail.page_url.clone(),
            };
            let notifier = Arc::clone(&self.notifier);
            tokio::spawn(async move {
                if !notifier.send_visitor_notification(&alert).await {
                    debug!(
                        "Visitor notification not delivered (session {})",
                        alert.session_id
                    );
                }
            });
        }

        Ok(outcome)
    }

    /// 记录访问但吞掉存储错误（追踪路径的 best-effort 变体）
    pub async fn record_visit_best_effort(&self, detail: &EventDetail) {
        if let Err(e) = self.record_visit(detail).await {
            warn!(
                "Visitor upsert failed (session {}): {}",
                detail.session_id, e
            );
        }
    }

    /// 新访客或访问次数命中里程碑时值得提醒
    fn is_noteworthy(outcome: &VisitUpsertOutcome) -> bool {
        outcome.is_new_visitor || VISIT_MILESTONES.contains(&outcome.visitor.visit_count)
    }
}

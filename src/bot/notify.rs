//! Notification fan-out: per-stage admin reports and the bulk news
//! broadcast. One recipient's failure never blocks the others and never
//! surfaces to the user whose action triggered the notification.

use crate::bot::transport::{DeliveryError, Transport};
use crate::db;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use teloxide::types::ChatId;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Artifact of one committed quest stage, forwarded to every admin.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub user_id: i64,
    pub username: Option<String>,
    pub city: String,
    pub task_number: i32,
    pub photo_id: Option<String>,
    pub answer: Option<String>,
}

pub fn format_report(report: &StageReport) -> String {
    let username = report.username.as_deref().unwrap_or("Аноним");
    let mut text = format!(
        "📊 Новый отчет по заданию\n\
         ▪️ Юзер: @{} ({})\n\
         ▪️ Город: {}\n\
         ▪️ Задание: #{}\n",
        username, report.user_id, report.city, report.task_number
    );
    if let Some(answer) = &report.answer {
        text.push_str(&format!("📝 Ответ: {answer}\n"));
    }
    text
}

/// Deliver a stage report to the given admins, independently. Failures are
/// logged with the recipient and context; nothing propagates.
pub async fn fan_out_report(transport: &dyn Transport, admins: &[i64], report: &StageReport) {
    let text = format_report(report);
    for admin in admins {
        let chat = ChatId(*admin);
        let result = match &report.photo_id {
            Some(photo_id) => transport.send_photo(chat, photo_id, Some(&text)).await,
            None => transport.send_text(chat, &text).await,
        };
        if let Err(e) = result {
            tracing::error!(
                admin,
                user = report.user_id,
                task = report.task_number,
                "failed to deliver stage report: {e}"
            );
        }
    }
}

/// Look up the admin list and fan the report out. Any error here (including
/// the lookup itself) is logged and swallowed: reporting must never affect
/// the triggering user's flow.
pub async fn report_to_admins(pool: &PgPool, transport: &dyn Transport, report: &StageReport) {
    match db::admin_ids(pool).await {
        Ok(admins) => fan_out_report(transport, &admins, report).await,
        Err(e) => tracing::error!(user = report.user_id, "failed to load admin list: {e}"),
    }
}

/// Notify every admin that a user finished the whole quest.
pub async fn notify_quest_completed(pool: &PgPool, transport: &dyn Transport, username: &str) {
    let admins = match db::admin_ids(pool).await {
        Ok(admins) => admins,
        Err(e) => {
            tracing::error!("failed to load admin list: {e}");
            return;
        }
    };
    let text = format!("🚀 Пользователь @{username} завершил квест!");
    for admin in admins {
        if let Err(e) = transport.send_text(ChatId(admin), &text).await {
            tracing::error!(admin, "failed to deliver completion notice: {e}");
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BroadcastPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub concurrency: usize,
}

impl Default for BroadcastPolicy {
    fn default() -> Self {
        BroadcastPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            concurrency: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastStats {
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Bulk delivery with bounded concurrency. Transient errors are retried with
/// exponential backoff; permanent errors abort retrying for that recipient
/// only. Every recipient gets at least one attempt.
pub async fn broadcast(
    transport: Arc<dyn Transport>,
    recipients: &[i64],
    text: &str,
    policy: BroadcastPolicy,
) -> BroadcastStats {
    let total = recipients.len();
    let semaphore = Arc::new(Semaphore::new(policy.concurrency));
    let text: Arc<str> = Arc::from(text);

    let mut tasks = JoinSet::new();
    for recipient in recipients {
        let recipient = *recipient;
        let transport = transport.clone();
        let semaphore = semaphore.clone();
        let text = text.clone();
        tasks.spawn(async move {
            // Closed only on runtime shutdown.
            let Ok(_permit) = semaphore.acquire().await else {
                return false;
            };
            match deliver_with_retry(transport.as_ref(), ChatId(recipient), &text, policy).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(recipient, "broadcast delivery failed: {e}");
                    false
                }
            }
        });
    }

    let mut delivered = 0;
    while let Some(result) = tasks.join_next().await {
        if matches!(result, Ok(true)) {
            delivered += 1;
        }
    }

    BroadcastStats {
        total,
        delivered,
        failed: total - delivered,
    }
}

/// Every recipient gets at least one attempt, whatever the budget says.
async fn deliver_with_retry(
    transport: &dyn Transport,
    chat: ChatId,
    text: &str,
    policy: BroadcastPolicy,
) -> Result<(), DeliveryError> {
    let mut delay = policy.base_delay;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match transport.send_text(chat, text).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                tracing::debug!(chat = chat.0, attempt, "transient failure, retrying: {e}");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}

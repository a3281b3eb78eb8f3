use crate::biz_service::Repositories;
use crate::biz_service::push_service::{PushMessage, PushSender};
use crate::entitys::account_entity::Account;
use crate::entitys::notification_entity::{Notification, NotificationMeta};
use crate::manager::session_manager::SessionContext;
use common::errors::AppError;
use common::util::common_utils::build_id;
use common::util::date_util::now;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;

/// 群组通知收件人：所有非空小组的成员，去重后解析为账号，解析失败的直接丢弃
pub async fn compute_recipients(repos: &Repositories, group_id: &str) -> Result<Vec<Account>, AppError> {
    let Some(group) = repos.groups.find_by_id(group_id).await? else {
        log::warn!("recipients requested for missing group {}", group_id);
        return Ok(vec![]);
    };
    let member_ids = group.member_ids();
    let accounts = repos.accounts.find_by_ids(&member_ids).await?;
    if accounts.len() < member_ids.len() {
        log::debug!("group {}: {} member(s) no longer resolve", group_id, member_ids.len() - accounts.len());
    }
    Ok(accounts)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub inbox_written: usize,
    pub inbox_failed: usize,
    pub push_attempted: usize,
    pub push_failed: usize,
}

/// 先写收件箱（必须成功），再尽力推送；推送失败只记录日志
#[derive(Clone)]
pub struct NotificationDispatcher {
    repos: Repositories,
    push: Arc<dyn PushSender>,
}

impl NotificationDispatcher {
    pub fn new(repos: Repositories, push: Arc<dyn PushSender>) -> Self {
        Self { repos, push }
    }

    pub async fn compute_recipients(&self, group_id: &str) -> Result<Vec<Account>, AppError> {
        compute_recipients(&self.repos, group_id).await
    }

    pub async fn dispatch(&self, recipients: &[Account], title: &str, meta: &NotificationMeta) -> DispatchReport {
        let created_at = now();
        let writes = recipients.iter().map(|account| {
            let notification = Notification {
                id: build_id(),
                title: title.to_string(),
                category: meta.category,
                event_type: meta.event_type.clone(),
                event_id: meta.event_id.clone(),
                created_at,
            };
            async move {
                match self.repos.accounts.push_notification(&account.id, &notification).await {
                    Ok(true) => Some(notification.id),
                    Ok(false) => {
                        log::warn!("inbox write skipped, account {} is gone", account.id);
                        None
                    }
                    Err(e) => {
                        log::error!("inbox write failed for {}: {}", account.id, e);
                        None
                    }
                }
            }
        });
        let written = join_all(writes).await;

        let mut report = DispatchReport::default();
        let mut targets = Vec::new();
        let mut messages = Vec::new();
        for (account, notification_id) in recipients.iter().zip(written) {
            let Some(notification_id) = notification_id else {
                report.inbox_failed += 1;
                continue;
            };
            report.inbox_written += 1;
            if let Some(address) = account.push_address.as_deref().filter(|a| !a.is_empty()) {
                targets.push(account.id.as_str());
                messages.push(PushMessage {
                    to: address.to_string(),
                    body: title.to_string(),
                    // 客户端凭 notificationID 关闭对应的收件箱条目
                    data: json!({
                        "category": meta.category,
                        "type": meta.event_type,
                        "ID": meta.event_id,
                        "notificationID": notification_id,
                    }),
                    sound: Some("default".to_string()),
                });
            }
        }

        report.push_attempted = messages.len();
        if !messages.is_empty() {
            let results = self.push.send(messages).await;
            for (account_id, result) in targets.iter().zip(results) {
                match result {
                    Ok(ticket) => log::debug!("push ticket for {}: {:?}", account_id, ticket.id),
                    Err(e) => {
                        report.push_failed += 1;
                        log::warn!("push to {} failed: {}", account_id, e);
                    }
                }
            }
        }

        log::debug!("dispatch \"{}\": {:?}", title, report);
        report
    }

    /// 计算群组收件人并分发，错误全部吸收
    pub async fn notify_group(&self, group_id: &str, title: &str, meta: &NotificationMeta) -> DispatchReport {
        match self.compute_recipients(group_id).await {
            Ok(recipients) => self.dispatch(&recipients, title, meta).await,
            Err(e) => {
                log::error!("recipients for group {} unavailable: {}", group_id, e);
                DispatchReport::default()
            }
        }
    }

    /// 使用请求上下文中缓存的收件人列表
    pub async fn notify_context(&self, ctx: &SessionContext, title: &str, meta: &NotificationMeta) -> DispatchReport {
        match ctx.recipients().await {
            Ok(recipients) => self.dispatch(recipients, title, meta).await,
            Err(e) => {
                log::error!("recipients for request unavailable: {}", e);
                DispatchReport::default()
            }
        }
    }
}

use crate::biz_const::{REMINDER_TITLE_PREFIX, REMINDER_TITLE_SUFFIX};
use crate::biz_service::Repositories;
use crate::entitys::event_entity::Event;
use crate::entitys::notification_entity::{NotificationCategory, NotificationMeta};
use crate::manager::notification_manager::NotificationDispatcher;
use common::config::SweepConfig;
use common::errors::AppError;
use common::util::date_util::now;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub due: usize,
    pub fired: usize,
    /// 被其他扫描抢先认领
    pub skipped: usize,
    pub failed: usize,
}

/// 活动提醒扫描：认领 -> 分发 -> 确认。
/// 认领是比较并设置，并发扫描只有一个能赢；确认前崩溃的认领在租约过期后重新可见
#[derive(Clone)]
pub struct ReminderSweep {
    repos: Repositories,
    dispatcher: NotificationDispatcher,
    lease_secs: i64,
}

impl ReminderSweep {
    pub fn new(repos: Repositories, dispatcher: NotificationDispatcher, config: &SweepConfig) -> Self {
        Self { repos, dispatcher, lease_secs: config.claim_lease_secs }
    }

    pub fn reminder_title(event: &Event) -> String {
        format!("{}{}{}", REMINDER_TITLE_PREFIX, event.title, REMINDER_TITLE_SUFFIX)
    }

    pub async fn tick(&self, now: i64) -> Result<SweepReport, AppError> {
        let due = self.repos.events.find_due_reminders(now, now - self.lease_secs).await?;
        let mut report = SweepReport { due: due.len(), ..Default::default() };

        for event in due {
            match self.fire(&event, now).await {
                Ok(true) => report.fired += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    log::error!("reminder for event {} failed: {}", event.id, e);
                }
            }
        }
        Ok(report)
    }

    async fn fire(&self, event: &Event, now: i64) -> Result<bool, AppError> {
        let Some(due_at) = event.reminder_at else {
            return Ok(false);
        };
        if !self.repos.events.claim_reminder(&event.id, due_at, event.reminder_claimed_at, now).await? {
            return Ok(false);
        }

        let meta = NotificationMeta::for_event(NotificationCategory::Reminder, event.kind.clone(), event.id.clone());
        let report = self.dispatcher.notify_group(&event.group_id, &Self::reminder_title(event), &meta).await;
        log::debug!("reminder for event {} delivered: {:?}", event.id, report);

        if !self.repos.events.confirm_reminder(&event.id, now).await? {
            log::warn!("reminder for event {} was rescheduled while firing", event.id);
        }
        Ok(true)
    }

    /// 按固定间隔运行，直到任务被取消
    pub fn start(self, interval_secs: u64) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                ticker.tick().await;
                match self.tick(now()).await {
                    Ok(report) if report.due > 0 => {
                        log::info!(
                            "reminder sweep: due={} fired={} skipped={} failed={}",
                            report.due, report.fired, report.skipped, report.failed
                        );
                    }
                    Ok(_) => {}
                    Err(e) => log::error!("reminder sweep failed: {}", e),
                }
            }
        })
    }
}

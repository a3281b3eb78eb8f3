use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// 收件箱中的一条未读通知，内嵌于 Account.inbox
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub category: NotificationCategory,
    /// 关联活动的类型（如 "campout"）
    pub event_type: Option<String>,
    pub event_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationCategory {
    EventCreated,
    EventUpdated,
    EventCancelled,
    Reminder,
    #[default]
    Message,
}

/// 通知附带的元数据，每个收件人各自生成一条 Notification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationMeta {
    pub category: NotificationCategory,
    pub event_type: Option<String>,
    pub event_id: Option<String>,
}

impl NotificationMeta {
    pub fn new(category: NotificationCategory) -> Self {
        Self { category, ..Default::default() }
    }

    pub fn for_event(category: NotificationCategory, event_type: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self { category, event_type: Some(event_type.into()), event_id: Some(event_id.into()) }
    }
}

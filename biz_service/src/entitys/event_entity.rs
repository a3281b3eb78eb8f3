use common::index_trait::MongoIndexModelProvider;
use mongo_macro::MongoIndexModelProvider as MongoDeriveMongoIndex;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// 活动：受邀名单 + 三个互斥的回复集合
#[derive(Debug, Clone, Serialize, Deserialize, Default, MongoDeriveMongoIndex)]
#[mongo_index(fields["group_id"], name("idx_event_group"))]
#[mongo_index(fields["reminder_at"], name("idx_event_reminder"))]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: String,
    /// 所属群组
    pub group_id: String,
    pub sub_group_id: Option<String>,
    pub title: String,
    /// 活动类型（如 "campout"、"troop_meeting"）
    pub kind: String,
    pub description: Option<String>,
    /// 开始时间（Unix 秒）
    pub starts_at: i64,
    #[serde(default)]
    pub invited: Roster,
    #[serde(default)]
    pub attending: Attendance,
    pub creator_id: String,
    /// 提醒到期时间，为空表示无待发提醒
    pub reminder_at: Option<i64>,
    /// 扫描任务认领时间，租约过期前其他扫描不会重复认领
    pub reminder_claimed_at: Option<i64>,
    pub create_time: i64,
    pub update_time: i64,
}

/// 受邀名单：整群、小组或个人
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Roster {
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub sub_groups: Vec<String>,
    #[serde(default)]
    pub individuals: Vec<String>,
}

impl Roster {
    pub fn group(group_id: impl Into<String>) -> Self {
        Self { groups: vec![group_id.into()], ..Default::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Attendance {
    #[serde(default)]
    pub yes: Vec<String>,
    #[serde(default)]
    pub no: Vec<String>,
    #[serde(default)]
    pub maybe: Vec<String>,
}

impl Attendance {
    pub fn set(&self, response: RsvpResponse) -> &Vec<String> {
        match response {
            RsvpResponse::Yes => &self.yes,
            RsvpResponse::No => &self.no,
            RsvpResponse::Maybe => &self.maybe,
        }
    }

    pub fn set_mut(&mut self, response: RsvpResponse) -> &mut Vec<String> {
        match response {
            RsvpResponse::Yes => &mut self.yes,
            RsvpResponse::No => &mut self.no,
            RsvpResponse::Maybe => &mut self.maybe,
        }
    }

    /// 当前回复；三个集合互斥，最多命中一个
    pub fn response_of(&self, account_id: &str) -> Option<RsvpResponse> {
        RsvpResponse::iter().find(|r| self.set(*r).iter().any(|id| id == account_id))
    }

    pub fn has_responded(&self, account_id: &str) -> bool {
        self.response_of(account_id).is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RsvpResponse {
    Yes,
    No,
    Maybe,
}

impl RsvpResponse {
    /// 文档中对应的字段路径
    pub fn field(&self) -> &'static str {
        match self {
            RsvpResponse::Yes => "attending.yes",
            RsvpResponse::No => "attending.no",
            RsvpResponse::Maybe => "attending.maybe",
        }
    }

    pub fn others(&self) -> [RsvpResponse; 2] {
        match self {
            RsvpResponse::Yes => [RsvpResponse::No, RsvpResponse::Maybe],
            RsvpResponse::No => [RsvpResponse::Yes, RsvpResponse::Maybe],
            RsvpResponse::Maybe => [RsvpResponse::Yes, RsvpResponse::No],
        }
    }
}

use common::index_trait::MongoIndexModelProvider;
use mongo_macro::MongoIndexModelProvider as MongoDeriveMongoIndex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::entitys::notification_entity::Notification;

/// 账号信息：内嵌成员身份列表与未读通知收件箱
#[derive(Debug, Clone, Serialize, Deserialize, Default, MongoDeriveMongoIndex)]
#[mongo_index(fields["email"], unique, name("uniq_account_email"))]
pub struct Account {
    /// 账号唯一 ID（ObjectId 十六进制）
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// 登录邮箱（小写存储）
    pub email: String,
    /// 密码哈希（argon2 PHC 格式）
    pub password_hash: String,
    pub phone: Option<String>,
    /// 推送地址（可选，缺省时只写收件箱）
    pub push_address: Option<String>,
    /// 成员身份，按加入顺序排列
    #[serde(default)]
    pub memberships: Vec<Membership>,
    /// 未读通知，只由通知分发器写入
    #[serde(default)]
    pub inbox: Vec<Notification>,
    /// 创建时间（Unix 秒时间戳）
    pub create_time: i64,
    /// 最后更新时间（Unix 秒时间戳）
    pub update_time: i64,
}

impl Account {
    pub fn membership(&self, membership_id: &str) -> Option<&Membership> {
        self.memberships.iter().find(|m| m.id == membership_id)
    }

    /// 是否已在同一个 (group, sub_group) 下持有身份
    pub fn has_membership_in(&self, group_id: &str, sub_group_id: Option<&str>) -> bool {
        self.memberships
            .iter()
            .any(|m| m.group_id == group_id && m.sub_group_id.as_deref() == sub_group_id)
    }
}

/// 账号在某个群组（及可选小组）中的角色身份
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Membership {
    #[serde(rename = "_id")]
    pub id: String,
    pub group_id: String,
    /// 部分角色是全群范围的，不属于任何小组
    pub sub_group_id: Option<String>,
    pub role: Role,
    /// 群编号冗余副本，展示时不必再查群组
    pub group_number: String,
}

/// 角色（有序，越靠前权限越高）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Leader,
    AssistantLeader,
    SeniorMember,
    SubGroupLeader,
    AssistantSubGroupLeader,
    #[default]
    Member,
    Guardian,
    AdultVolunteer,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_names_round_trip_through_strum() {
        assert_eq!(Role::AssistantLeader.to_string(), "ASSISTANT_LEADER");
        assert_eq!(Role::from_str("GUARDIAN").unwrap(), Role::Guardian);
        assert!(Role::Leader < Role::Member);
    }

    #[test]
    fn test_email_index_is_unique() {
        let models = Account::index_models();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].keys.get_i32("email").unwrap(), 1);
        let options = models[0].options.as_ref().unwrap();
        assert_eq!(options.unique, Some(true));
        assert_eq!(options.name.as_deref(), Some("uniq_account_email"));
    }
}

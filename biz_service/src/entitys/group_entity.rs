use common::index_trait::MongoIndexModelProvider;
use mongo_macro::MongoIndexModelProvider as MongoDeriveMongoIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 群组（租户），成员按小组划分
#[derive(Debug, Clone, Serialize, Deserialize, Default, MongoDeriveMongoIndex)]
#[mongo_index(fields["number"], name("idx_group_number"))]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// 群编号（对外展示）
    pub number: String,
    /// 群主账号，以 Leader 角色加入时写入
    pub leader_id: Option<String>,
    #[serde(default)]
    pub sub_groups: Vec<SubGroup>,
    pub create_time: i64,
    pub update_time: i64,
}

impl Group {
    pub fn sub_group(&self, sub_group_id: &str) -> Option<&SubGroup> {
        self.sub_groups.iter().find(|s| s.id == sub_group_id)
    }

    /// 所有小组成员，按首次出现顺序去重
    pub fn member_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sub_groups
            .iter()
            .flat_map(|s| s.members.iter())
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SubGroup {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// 成员账号 ID，不重复
    #[serde(default)]
    pub members: Vec<String>,
}

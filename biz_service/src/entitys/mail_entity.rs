use serde::{Deserialize, Serialize};

/// 待发送邮件，写入 mail 集合后由外部投递进程发送
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MailEntity {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub subject: String,
    pub content: String,
    pub status: i32,
    pub create_time: i64,
    pub update_time: i64,
    pub send_count: i32,
}

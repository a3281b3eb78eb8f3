use crate::entitys::mail_entity::MailEntity;
use async_trait::async_trait;
use common::config::MailConfig;
use common::repository_util::{BaseRepository, Repository};
use common::util::common_utils::build_id;
use common::util::date_util::now;
use mongodb::Database;

#[async_trait]
pub trait MailServiceTrait: Send + Sync {
    async fn send_mail(&self, mail: &MailEntity) -> anyhow::Result<()>;
}

/// 邮件发件箱：只写入 mail 集合，由投递进程异步发送
#[derive(Debug, Clone)]
pub struct MailService {
    pub dao: BaseRepository<MailEntity>,
}

impl MailService {
    pub fn new(db: &Database) -> Self {
        Self { dao: BaseRepository::new(db, "mail") }
    }
}

#[async_trait]
impl MailServiceTrait for MailService {
    async fn send_mail(&self, mail: &MailEntity) -> anyhow::Result<()> {
        self.dao.insert(mail).await?;
        Ok(())
    }
}

/// 渲染重置密码邮件
pub fn render_reset_mail(config: &MailConfig, receiver: &str, name: &str, token: &str) -> MailEntity {
    let time = now();
    MailEntity {
        id: build_id(),
        sender: format!("{} <{}>", config.from_name, config.from_address),
        receiver: receiver.to_string(),
        subject: format!("{} password reset", config.from_name),
        content: format!(
            "Hi {},\n\nUse this code to reset your password: {}\n\nThe code expires in one hour. If you did not request a reset you can ignore this message.\n",
            name, token
        ),
        status: 0,
        create_time: time,
        update_time: time,
        send_count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_mail_carries_token() {
        let mail = render_reset_mail(&MailConfig::default(), "a@example.com", "Ann", "abc123");
        assert_eq!(mail.receiver, "a@example.com");
        assert!(mail.content.contains("abc123"));
        assert!(mail.sender.contains("info@example.com"));
        assert_eq!(mail.status, 0);
    }
}

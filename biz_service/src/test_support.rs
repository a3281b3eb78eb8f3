use crate::biz_service::Repositories;
use crate::biz_service::mail_service::MailServiceTrait;
use crate::biz_service::push_service::{PushError, PushMessage, PushSender, PushTicket, is_push_address};
use crate::entitys::account_entity::{Account, Membership, Role};
use crate::entitys::event_entity::{Event, Roster};
use crate::entitys::group_entity::{Group, SubGroup};
use crate::entitys::mail_entity::MailEntity;
use crate::manager::notification_manager::NotificationDispatcher;
use crate::manager::session_manager::{SessionContext, SessionResolver};
use crate::manager::token_codec::TokenCodec;
use async_trait::async_trait;
use common::config::AuthConfig;
use common::util::common_utils::build_id;
use common::util::date_util::now;
use std::sync::{Arc, Mutex};

pub const VALID_PUSH: &str = "ExponentPushToken[valid-device]";

/// 记录所有推送请求；地址格式与真实发送方一致地校验
#[derive(Default)]
pub struct RecordingPush {
    failing: Vec<String>,
    sent: Mutex<Vec<String>>,
    payloads: Mutex<Vec<serde_json::Value>>,
    errors: Mutex<Vec<PushError>>,
}

impl RecordingPush {
    pub fn failing_for(addresses: &[&str]) -> Self {
        Self { failing: addresses.iter().map(|a| a.to_string()).collect(), ..Default::default() }
    }

    pub fn sent_to(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// 按发送顺序记录的 data 字段
    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<PushError> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushSender for RecordingPush {
    async fn send(&self, messages: Vec<PushMessage>) -> Vec<Result<PushTicket, PushError>> {
        messages
            .into_iter()
            .map(|m| {
                self.sent.lock().unwrap().push(m.to.clone());
                self.payloads.lock().unwrap().push(m.data.clone());
                let result = if !is_push_address(&m.to) {
                    Err(PushError::InvalidAddress(m.to))
                } else if self.failing.contains(&m.to) {
                    Err(PushError::Transport("simulated".to_string()))
                } else {
                    Ok(PushTicket { status: "ok".to_string(), id: Some(build_id()), message: None })
                };
                if let Err(e) = &result {
                    self.errors.lock().unwrap().push(e.clone());
                }
                result
            })
            .collect()
    }
}

#[derive(Default)]
pub struct RecordingMail {
    pub sent: Mutex<Vec<MailEntity>>,
}

#[async_trait]
impl MailServiceTrait for RecordingMail {
    async fn send_mail(&self, mail: &MailEntity) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: "test-secret".to_string(), ..Default::default() }
}

pub fn membership(group_id: &str, sub_group_id: Option<&str>, role: Role) -> Membership {
    Membership {
        id: build_id(),
        group_id: group_id.to_string(),
        sub_group_id: sub_group_id.map(str::to_string),
        role,
        group_number: "101".to_string(),
    }
}

pub struct Fixture {
    pub repos: Repositories,
    pub codec: TokenCodec,
    pub push: Arc<RecordingPush>,
    pub mail: Arc<RecordingMail>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_push(RecordingPush::default())
    }

    pub fn with_push(push: RecordingPush) -> Self {
        Self {
            repos: Repositories::memory(),
            codec: TokenCodec::new(&auth_config()),
            push: Arc::new(push),
            mail: Arc::new(RecordingMail::default()),
        }
    }

    pub fn resolver(&self) -> SessionResolver {
        SessionResolver::new(self.repos.clone(), self.codec.clone())
    }

    pub fn dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(self.repos.clone(), self.push.clone())
    }

    pub async fn account_with(&self, email: &str, memberships: Vec<Membership>, push_address: Option<&str>) -> Account {
        let account = Account {
            id: build_id(),
            name: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
            push_address: push_address.map(str::to_string),
            memberships,
            create_time: now(),
            update_time: now(),
            ..Default::default()
        };
        self.repos.accounts.insert(&account).await.unwrap();
        account
    }

    pub async fn group_with(&self, sub_groups: Vec<(&str, Vec<&str>)>) -> Group {
        let group = Group {
            id: build_id(),
            name: "Troop".to_string(),
            number: "101".to_string(),
            sub_groups: sub_groups
                .into_iter()
                .map(|(id, members)| SubGroup {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    members: members.into_iter().map(str::to_string).collect(),
                })
                .collect(),
            ..Default::default()
        };
        self.repos.groups.insert(&group).await.unwrap();
        group
    }

    pub async fn event_in(&self, group_id: &str, invited: Roster) -> Event {
        let event = Event {
            id: build_id(),
            group_id: group_id.to_string(),
            title: "Campout".to_string(),
            kind: "campout".to_string(),
            starts_at: now() + 86_400,
            invited,
            ..Default::default()
        };
        self.repos.events.insert(&event).await.unwrap();
        event
    }

    /// 重新读取账号后解析上下文
    pub async fn context_for(&self, account: &Account, selector: Option<&str>) -> SessionContext {
        let token = self.codec.issue(&account.id).unwrap();
        self.resolver().resolve(Some(&token), selector).await
    }
}

//! 基于 DashMap 的内存存储，与 Mongo 实现语义一致：
//! 每个文档的修改都在 get_mut 持有的分片锁内完成。

use crate::biz_service::account_service::{AccountStore, order_by_ids};
use crate::biz_service::event_service::EventStore;
use crate::biz_service::group_service::GroupStore;
use crate::biz_service::reset_token_service::ResetTokenStore;
use crate::entitys::account_entity::{Account, Membership};
use crate::entitys::event_entity::{Event, RsvpResponse};
use crate::entitys::group_entity::Group;
use crate::entitys::notification_entity::Notification;
use crate::entitys::reset_token_entity::{ResetToken, TokenKind};
use async_trait::async_trait;
use common::errors::AppError;
use common::util::date_util::now;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mongodb::bson::DateTime;

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: DashMap<String, Account>,
    /// email -> account_id，模拟唯一索引
    emails: DashMap<String, String>,
}

impl MemoryAccountStore {
    fn update<F>(&self, account_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Account) -> bool,
    {
        match self.accounts.get_mut(account_id) {
            Some(mut account) => {
                let changed = f(&mut account);
                if changed {
                    account.update_time = now();
                }
                changed
            }
            None => false,
        }
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: &Account) -> Result<(), AppError> {
        let email = account.email.to_lowercase();
        match self.emails.entry(email) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!("email already registered: {}", account.email))),
            Entry::Vacant(slot) => {
                slot.insert(account.id.clone());
                self.accounts.insert(account.id.clone(), account.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, account_id: &str) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.get(account_id).map(|a| a.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let account_id = match self.emails.get(&email.to_lowercase()) {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        self.find_by_id(&account_id).await
    }

    async fn find_by_ids(&self, account_ids: &[String]) -> Result<Vec<Account>, AppError> {
        let found = account_ids.iter().filter_map(|id| self.accounts.get(id).map(|a| a.clone())).collect();
        Ok(order_by_ids(account_ids, found))
    }

    async fn push_membership(&self, account_id: &str, membership: &Membership) -> Result<bool, AppError> {
        Ok(self.update(account_id, |account| {
            if account.has_membership_in(&membership.group_id, membership.sub_group_id.as_deref()) {
                return false;
            }
            account.memberships.push(membership.clone());
            true
        }))
    }

    async fn pull_membership(&self, account_id: &str, membership_id: &str) -> Result<bool, AppError> {
        Ok(self.update(account_id, |account| {
            let before = account.memberships.len();
            account.memberships.retain(|m| m.id != membership_id);
            account.memberships.len() != before
        }))
    }

    async fn push_notification(&self, account_id: &str, notification: &Notification) -> Result<bool, AppError> {
        Ok(match self.accounts.get_mut(account_id) {
            Some(mut account) => {
                account.inbox.push(notification.clone());
                true
            }
            None => false,
        })
    }

    async fn pull_notification(&self, account_id: &str, notification_id: &str) -> Result<bool, AppError> {
        Ok(match self.accounts.get_mut(account_id) {
            Some(mut account) => {
                let before = account.inbox.len();
                account.inbox.retain(|n| n.id != notification_id);
                account.inbox.len() != before
            }
            None => false,
        })
    }

    async fn set_push_address(&self, account_id: &str, push_address: Option<&str>) -> Result<bool, AppError> {
        Ok(self.update(account_id, |account| {
            account.push_address = push_address.map(str::to_string);
            true
        }))
    }

    async fn set_password_hash(&self, account_id: &str, password_hash: &str) -> Result<bool, AppError> {
        Ok(self.update(account_id, |account| {
            account.password_hash = password_hash.to_string();
            true
        }))
    }

    async fn delete(&self, account_id: &str) -> Result<bool, AppError> {
        match self.accounts.remove(account_id) {
            Some((_, account)) => {
                self.emails.remove(&account.email.to_lowercase());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryGroupStore {
    groups: DashMap<String, Group>,
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn insert(&self, group: &Group) -> Result<(), AppError> {
        match self.groups.entry(group.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!("group exists: {}", group.id))),
            Entry::Vacant(slot) => {
                slot.insert(group.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, group_id: &str) -> Result<Option<Group>, AppError> {
        Ok(self.groups.get(group_id).map(|g| g.clone()))
    }

    async fn add_member(&self, group_id: &str, sub_group_id: &str, account_id: &str) -> Result<bool, AppError> {
        let Some(mut group) = self.groups.get_mut(group_id) else {
            return Ok(false);
        };
        let Some(sub_group) = group.sub_groups.iter_mut().find(|s| s.id == sub_group_id) else {
            return Ok(false);
        };
        if !sub_group.members.iter().any(|m| m == account_id) {
            sub_group.members.push(account_id.to_string());
        }
        group.update_time = now();
        Ok(true)
    }

    async fn remove_member(&self, group_id: &str, sub_group_id: &str, account_id: &str) -> Result<bool, AppError> {
        let Some(mut group) = self.groups.get_mut(group_id) else {
            return Ok(false);
        };
        let Some(sub_group) = group.sub_groups.iter_mut().find(|s| s.id == sub_group_id) else {
            return Ok(false);
        };
        sub_group.members.retain(|m| m != account_id);
        group.update_time = now();
        Ok(true)
    }

    async fn set_leader(&self, group_id: &str, account_id: Option<&str>) -> Result<bool, AppError> {
        Ok(match self.groups.get_mut(group_id) {
            Some(mut group) => {
                group.leader_id = account_id.map(str::to_string);
                group.update_time = now();
                true
            }
            None => false,
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: DashMap<String, Event>,
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: &Event) -> Result<(), AppError> {
        match self.events.entry(event.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!("event exists: {}", event.id))),
            Entry::Vacant(slot) => {
                slot.insert(event.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, event_id: &str) -> Result<Option<Event>, AppError> {
        Ok(self.events.get(event_id).map(|e| e.clone()))
    }

    async fn delete(&self, event_id: &str) -> Result<bool, AppError> {
        Ok(self.events.remove(event_id).is_some())
    }

    async fn set_response(&self, event_id: &str, account_id: &str, response: RsvpResponse) -> Result<bool, AppError> {
        let Some(mut event) = self.events.get_mut(event_id) else {
            return Ok(false);
        };
        for other in response.others() {
            event.attending.set_mut(other).retain(|id| id != account_id);
        }
        let target = event.attending.set_mut(response);
        if !target.iter().any(|id| id == account_id) {
            target.push(account_id.to_string());
        }
        event.update_time = now();
        Ok(true)
    }

    async fn schedule_reminder(&self, event_id: &str, reminder_at: Option<i64>) -> Result<bool, AppError> {
        Ok(match self.events.get_mut(event_id) {
            Some(mut event) => {
                event.reminder_at = reminder_at;
                event.reminder_claimed_at = None;
                true
            }
            None => false,
        })
    }

    async fn find_due_reminders(&self, now: i64, stale_before: i64) -> Result<Vec<Event>, AppError> {
        let mut due: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.reminder_at.is_some_and(|at| at <= now))
            .filter(|e| e.reminder_claimed_at.is_none_or(|claimed| claimed <= stale_before))
            .map(|e| e.clone())
            .collect();
        due.sort_by_key(|e| e.reminder_at);
        Ok(due)
    }

    async fn claim_reminder(&self, event_id: &str, due_at: i64, prev_claim: Option<i64>, claimed_at: i64) -> Result<bool, AppError> {
        let Some(mut event) = self.events.get_mut(event_id) else {
            return Ok(false);
        };
        if event.reminder_at != Some(due_at) || event.reminder_claimed_at != prev_claim {
            return Ok(false);
        }
        event.reminder_claimed_at = Some(claimed_at);
        Ok(true)
    }

    async fn confirm_reminder(&self, event_id: &str, claimed_at: i64) -> Result<bool, AppError> {
        let Some(mut event) = self.events.get_mut(event_id) else {
            return Ok(false);
        };
        if event.reminder_claimed_at != Some(claimed_at) {
            return Ok(false);
        }
        event.reminder_at = None;
        event.reminder_claimed_at = None;
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct MemoryResetTokenStore {
    tokens: DashMap<String, ResetToken>,
}

#[async_trait]
impl ResetTokenStore for MemoryResetTokenStore {
    async fn insert(&self, token: &ResetToken) -> Result<(), AppError> {
        self.tokens.insert(token.id.clone(), token.clone());
        Ok(())
    }

    async fn take(&self, account_id: &str, token: &str, kind: TokenKind, not_before: DateTime) -> Result<Option<ResetToken>, AppError> {
        let found = self
            .tokens
            .iter()
            .find(|t| t.account_id == account_id && t.token == token && t.kind == kind && t.created_at >= not_before)
            .map(|t| t.id.clone());
        // remove 返回 None 说明被并发取走
        Ok(found.and_then(|id| self.tokens.remove(&id)).map(|(_, t)| t))
    }
}

use crate::biz_const::RSVP_ROLES;
use crate::biz_service::Repositories;
use crate::entitys::account_entity::Account;
use crate::entitys::event_entity::{Event, RsvpResponse};
use crate::entitys::group_entity::Group;
use crate::manager::auth_manager::authorize_in_group;
use crate::manager::session_manager::SessionContext;
use common::errors::AppError;
use std::collections::HashSet;

/// 活动回复台账：yes/no/maybe 三个互斥集合，未回复名单实时推导
#[derive(Clone)]
pub struct RosterLedger {
    repos: Repositories,
}

impl RosterLedger {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    async fn load_event(&self, event_id: &str) -> Result<Event, AppError> {
        self.repos
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("event {}", event_id)))
    }

    /// 当前账号回复活动；重复同一回复不改变台账。
    /// 活动不存在与跨群访问返回同一种拒绝
    pub async fn respond(&self, ctx: &SessionContext, event_id: &str, response: RsvpResponse) -> Result<(), AppError> {
        ctx.require_membership()?;
        let Some(event) = self.repos.events.find_by_id(event_id).await? else {
            log::debug!("event {} not found", event_id);
            return Err(AppError::Unauthorized);
        };
        authorize_in_group(ctx, RSVP_ROLES, &event.group_id)?;

        let account = ctx.require_account()?;
        if !self.invited_member_ids(&event).await?.contains(&account.id) {
            log::debug!("account {} is not invited to event {}", account.id, event_id);
            return Err(AppError::Unauthorized);
        }
        if !self.repos.events.set_response(event_id, &account.id, response).await? {
            return Err(AppError::Unauthorized);
        }
        log::debug!("event {}: {} -> {}", event_id, account.id, response);
        Ok(())
    }

    /// 受邀成员 - (yes ∪ no ∪ maybe)，每次调用重新计算
    pub async fn non_responders(&self, event_id: &str) -> Result<Vec<Account>, AppError> {
        let event = self.load_event(event_id).await?;
        let pending: Vec<String> = self
            .invited_member_ids(&event)
            .await?
            .into_iter()
            .filter(|id| !event.attending.has_responded(id))
            .collect();
        self.repos.accounts.find_by_ids(&pending).await
    }

    /// 展开受邀名单：整群取所有小组成员，小组在所属群与受邀群中查找，个人直接加入
    pub async fn invited_member_ids(&self, event: &Event) -> Result<Vec<String>, AppError> {
        let mut group_ids: Vec<&str> = vec![event.group_id.as_str()];
        for id in &event.invited.groups {
            if !group_ids.contains(&id.as_str()) {
                group_ids.push(id);
            }
        }
        let mut groups: Vec<Group> = Vec::with_capacity(group_ids.len());
        for id in group_ids {
            match self.repos.groups.find_by_id(id).await? {
                Some(group) => groups.push(group),
                None => log::warn!("event {} references missing group {}", event.id, id),
            }
        }

        let mut seen = HashSet::new();
        let mut members = Vec::new();
        let mut add = |id: &String| {
            if seen.insert(id.clone()) {
                members.push(id.clone());
            }
        };

        for group in groups.iter().filter(|g| event.invited.groups.contains(&g.id)) {
            group.member_ids().iter().for_each(&mut add);
        }
        for sub_group_id in &event.invited.sub_groups {
            if let Some(sub_group) = groups.iter().find_map(|g| g.sub_group(sub_group_id)) {
                sub_group.members.iter().for_each(&mut add);
            }
        }
        event.invited.individuals.iter().for_each(&mut add);
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitys::account_entity::Role;
    use crate::entitys::event_entity::Roster;
    use crate::test_support::{Fixture, membership};
    use common::util::common_utils::build_id;

    fn ids(accounts: Vec<Account>) -> Vec<String> {
        accounts.into_iter().map(|a| a.id).collect()
    }

    #[tokio::test]
    async fn test_responses_are_mutually_exclusive() {
        let fx = Fixture::new();
        let group = fx.group_with(vec![("s1", vec![])]).await;
        let m = membership(&group.id, Some("s1"), Role::Member);
        let u1 = fx.account_with("u1@example.com", vec![m.clone()], None).await;
        fx.repos.groups.add_member(&group.id, "s1", &u1.id).await.unwrap();
        let event = fx.event_in(&group.id, Roster::group(&group.id)).await;
        let ledger = RosterLedger::new(fx.repos.clone());
        let ctx = fx.context_for(&u1, Some(&m.id)).await;

        ledger.respond(&ctx, &event.id, RsvpResponse::Yes).await.unwrap();
        ledger.respond(&ctx, &event.id, RsvpResponse::No).await.unwrap();
        let stored = fx.repos.events.find_by_id(&event.id).await.unwrap().unwrap();
        assert_eq!(stored.attending.no, vec![u1.id.clone()]);
        assert!(stored.attending.yes.is_empty() && stored.attending.maybe.is_empty());

        ledger.respond(&ctx, &event.id, RsvpResponse::No).await.unwrap();
        let again = fx.repos.events.find_by_id(&event.id).await.unwrap().unwrap();
        assert_eq!(again.attending, stored.attending);
    }

    #[tokio::test]
    async fn test_non_responders_scenario() {
        let fx = Fixture::new();
        let group = fx.group_with(vec![("s1", vec![])]).await;
        let m1 = membership(&group.id, Some("s1"), Role::Member);
        let m2 = membership(&group.id, Some("s1"), Role::Member);
        let u1 = fx.account_with("u1@example.com", vec![m1.clone()], None).await;
        let u2 = fx.account_with("u2@example.com", vec![m2.clone()], None).await;
        fx.repos.groups.add_member(&group.id, "s1", &u1.id).await.unwrap();
        fx.repos.groups.add_member(&group.id, "s1", &u2.id).await.unwrap();
        let event = fx.event_in(&group.id, Roster::group(&group.id)).await;
        let ledger = RosterLedger::new(fx.repos.clone());

        assert_eq!(ids(ledger.non_responders(&event.id).await.unwrap()), vec![u1.id.clone(), u2.id.clone()]);

        let ctx1 = fx.context_for(&u1, Some(&m1.id)).await;
        ledger.respond(&ctx1, &event.id, RsvpResponse::Yes).await.unwrap();
        assert_eq!(ids(ledger.non_responders(&event.id).await.unwrap()), vec![u2.id.clone()]);

        let ctx2 = fx.context_for(&u2, Some(&m2.id)).await;
        ledger.respond(&ctx2, &event.id, RsvpResponse::Maybe).await.unwrap();
        assert!(ledger.non_responders(&event.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_leaving_the_group_leaves_the_universe() {
        let fx = Fixture::new();
        let u1 = fx.account_with("u1@example.com", vec![], None).await;
        let u2 = fx.account_with("u2@example.com", vec![], None).await;
        let group = fx.group_with(vec![("s1", vec![u1.id.as_str(), u2.id.as_str()])]).await;
        let event = fx.event_in(&group.id, Roster::group(&group.id)).await;
        let ledger = RosterLedger::new(fx.repos.clone());

        fx.repos.groups.remove_member(&group.id, "s1", &u2.id).await.unwrap();
        assert_eq!(ids(ledger.non_responders(&event.id).await.unwrap()), vec![u1.id.clone()]);
    }

    #[tokio::test]
    async fn test_invited_universe_mixes_sub_groups_and_individuals() {
        let fx = Fixture::new();
        let group = fx.group_with(vec![("s1", vec!["a", "b"]), ("s2", vec!["c"])]).await;
        let invited = Roster { groups: vec![], sub_groups: vec!["s2".into()], individuals: vec!["a".into(), "c".into()] };
        let event = fx.event_in(&group.id, invited).await;
        let ledger = RosterLedger::new(fx.repos.clone());
        assert_eq!(ledger.invited_member_ids(&event).await.unwrap(), vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_cross_tenant_and_uninvited_rejected() {
        let fx = Fixture::new();
        let home = fx.group_with(vec![("s1", vec![])]).await;
        let other = fx.group_with(vec![("s1", vec![])]).await;
        let m = membership(&home.id, Some("s1"), Role::Leader);
        let u1 = fx.account_with("u1@example.com", vec![m.clone()], None).await;
        fx.repos.groups.add_member(&home.id, "s1", &u1.id).await.unwrap();
        let ctx = fx.context_for(&u1, Some(&m.id)).await;
        let ledger = RosterLedger::new(fx.repos.clone());

        let foreign = fx.event_in(&other.id, Roster::group(&other.id)).await;
        let foreign_err = ledger.respond(&ctx, &foreign.id, RsvpResponse::Yes).await.unwrap_err();
        assert!(matches!(foreign_err, AppError::Unauthorized));

        let private = fx.event_in(&home.id, Roster { individuals: vec!["someone-else".into()], ..Default::default() }).await;
        assert!(matches!(ledger.respond(&ctx, &private.id, RsvpResponse::Yes).await, Err(AppError::Unauthorized)));

        let missing_err = ledger.respond(&ctx, &build_id(), RsvpResponse::Yes).await.unwrap_err();
        assert_eq!(missing_err.to_string(), foreign_err.to_string());
        assert!(matches!(ledger.non_responders(&build_id()).await, Err(AppError::NotFound(_))));

        let no_selector = fx.context_for(&u1, None).await;
        let home_event = fx.event_in(&home.id, Roster::group(&home.id)).await;
        assert!(matches!(ledger.respond(&no_selector, &home_event.id, RsvpResponse::Yes).await, Err(AppError::Unauthorized)));
    }
}

use crate::entitys::event_entity::{Event, RsvpResponse};
use async_trait::async_trait;
use common::errors::AppError;
use common::repository_util::{BaseRepository, OrderType, Repository};
use common::util::date_util::now;
use mongodb::Database;
use mongodb::bson::doc;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: &Event) -> Result<(), AppError>;
    async fn find_by_id(&self, event_id: &str) -> Result<Option<Event>, AppError>;
    async fn delete(&self, event_id: &str) -> Result<bool, AppError>;

    /// 从另外两个集合移除并加入目标集合，一次更新完成
    async fn set_response(&self, event_id: &str, account_id: &str, response: RsvpResponse) -> Result<bool, AppError>;

    /// 设置（或取消）提醒时间，同时清除旧的认领
    async fn schedule_reminder(&self, event_id: &str, reminder_at: Option<i64>) -> Result<bool, AppError>;
    /// reminder_at <= now 且未被认领，或认领时间不晚于 stale_before
    async fn find_due_reminders(&self, now: i64, stale_before: i64) -> Result<Vec<Event>, AppError>;
    /// 比较并设置：只有 (reminder_at, reminder_claimed_at) 仍为读取时的值才认领成功
    async fn claim_reminder(&self, event_id: &str, due_at: i64, prev_claim: Option<i64>, claimed_at: i64) -> Result<bool, AppError>;
    /// 仅当认领仍归自己时清除提醒
    async fn confirm_reminder(&self, event_id: &str, claimed_at: i64) -> Result<bool, AppError>;
}

#[derive(Debug, Clone)]
pub struct EventService {
    pub dao: BaseRepository<Event>,
}

impl EventService {
    pub fn new(db: &Database) -> Self {
        Self { dao: BaseRepository::new(db, "event") }
    }
}

#[async_trait]
impl EventStore for EventService {
    async fn insert(&self, event: &Event) -> Result<(), AppError> {
        self.dao.insert(event).await
    }

    async fn find_by_id(&self, event_id: &str) -> Result<Option<Event>, AppError> {
        self.dao.find_by_id(event_id).await
    }

    async fn delete(&self, event_id: &str) -> Result<bool, AppError> {
        Ok(self.dao.delete_one(doc! { "_id": event_id }).await? == 1)
    }

    async fn set_response(&self, event_id: &str, account_id: &str, response: RsvpResponse) -> Result<bool, AppError> {
        let [a, b] = response.others();
        let update = doc! {
            "$pull": { a.field(): account_id, b.field(): account_id },
            "$addToSet": { response.field(): account_id },
            "$set": { "update_time": now() },
        };
        let result = self.dao.update_one(doc! { "_id": event_id }, update).await?;
        Ok(result.matched_count == 1)
    }

    async fn schedule_reminder(&self, event_id: &str, reminder_at: Option<i64>) -> Result<bool, AppError> {
        let update = doc! { "$set": { "reminder_at": reminder_at, "reminder_claimed_at": None::<i64> } };
        let result = self.dao.update_one(doc! { "_id": event_id }, update).await?;
        Ok(result.matched_count == 1)
    }

    async fn find_due_reminders(&self, now: i64, stale_before: i64) -> Result<Vec<Event>, AppError> {
        let filter = doc! {
            "reminder_at": { "$lte": now },
            "$or": [
                { "reminder_claimed_at": null },
                { "reminder_claimed_at": { "$lte": stale_before } },
            ],
        };
        self.dao.find_many(filter, None, Some(("reminder_at", OrderType::Asc))).await
    }

    async fn claim_reminder(&self, event_id: &str, due_at: i64, prev_claim: Option<i64>, claimed_at: i64) -> Result<bool, AppError> {
        let filter = doc! {
            "_id": event_id,
            "reminder_at": due_at,
            "reminder_claimed_at": prev_claim,
        };
        let update = doc! { "$set": { "reminder_claimed_at": claimed_at } };
        let result = self.dao.update_one(filter, update).await?;
        Ok(result.modified_count == 1)
    }

    async fn confirm_reminder(&self, event_id: &str, claimed_at: i64) -> Result<bool, AppError> {
        let filter = doc! { "_id": event_id, "reminder_claimed_at": claimed_at };
        let update = doc! { "$set": { "reminder_at": None::<i64>, "reminder_claimed_at": None::<i64> } };
        let result = self.dao.update_one(filter, update).await?;
        Ok(result.modified_count == 1)
    }
}

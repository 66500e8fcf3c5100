use crate::schemas::{Group, GroupExpense, GroupRecord, Member};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("group {0} not found")]
    GroupNotFound(String),
    #[error("group {0} already exists")]
    GroupExists(String),
    #[error("member {member_id} is already in group {group_id}")]
    MemberExists { group_id: String, member_id: String },
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] bson::ser::Error),
}

/// Read and append access to groups and their expense ledgers.
///
/// Expenses come back in the order they were added.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    async fn insert_group(&self, record: GroupRecord) -> Result<(), StoreError>;

    async fn find_group(&self, id: &str) -> Result<GroupRecord, StoreError>;

    async fn add_member(&self, group_id: &str, member: Member) -> Result<(), StoreError>;

    async fn add_expense(&self, group_id: &str, expense: GroupExpense) -> Result<(), StoreError>;

    async fn find_expenses(&self, group_id: &str) -> Result<Vec<GroupExpense>, StoreError> {
        Ok(self.find_group(group_id).await?.expenses)
    }
}

fn ensure_new_member(record: &GroupRecord, member: &Member) -> Result<(), StoreError> {
    if record.members.iter().any(|m| m.id == member.id) {
        return Err(StoreError::MemberExists {
            group_id: record.id.clone(),
            member_id: member.id.clone(),
        });
    }
    Ok(())
}

// An update that matched nothing wrote nothing.
fn ensure_matched(
    matched_count: u64,
    missing: impl FnOnce() -> StoreError,
) -> Result<(), StoreError> {
    if matched_count == 0 {
        return Err(missing());
    }
    Ok(())
}

pub struct MongoStore {
    groups: Collection<GroupRecord>,
}

impl MongoStore {
    pub fn new(client: &Client, database: &str) -> Self {
        Self {
            groups: client.database(database).collection("Groups"),
        }
    }
}

#[async_trait]
impl LedgerStore for MongoStore {
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let cursor = self.groups.find(None, None).await?;
        let records: Vec<GroupRecord> = cursor.try_collect().await?;
        Ok(records.iter().map(GroupRecord::group).collect())
    }

    async fn insert_group(&self, record: GroupRecord) -> Result<(), StoreError> {
        if self.groups.find_one(doc! { "id": record.id.as_str() }, None).await?.is_some() {
            return Err(StoreError::GroupExists(record.id));
        }
        self.groups.insert_one(record, None).await?;
        Ok(())
    }

    async fn find_group(&self, id: &str) -> Result<GroupRecord, StoreError> {
        self.groups
            .find_one(doc! { "id": id }, None)
            .await?
            .ok_or_else(|| StoreError::GroupNotFound(id.to_string()))
    }

    async fn add_member(&self, group_id: &str, member: Member) -> Result<(), StoreError> {
        let record = self.find_group(group_id).await?;
        ensure_new_member(&record, &member)?;
        let result = self
            .groups
            .update_one(
                doc! { "id": group_id, "members.id": { "$ne": member.id.as_str() } },
                doc! { "$push": { "members": bson::to_bson(&member)? } },
                None,
            )
            .await?;
        // The group was found above; no match means the member got in first.
        ensure_matched(result.matched_count, || StoreError::MemberExists {
            group_id: group_id.to_string(),
            member_id: member.id.clone(),
        })
    }

    async fn add_expense(&self, group_id: &str, expense: GroupExpense) -> Result<(), StoreError> {
        let result = self
            .groups
            .update_one(
                doc! { "id": group_id },
                doc! { "$push": { "expenses": bson::to_bson(&expense)? } },
                None,
            )
            .await?;
        ensure_matched(result.matched_count, || {
            StoreError::GroupNotFound(group_id.to_string())
        })
    }
}

/// In-process store used when no MongoDB URI is configured.
#[derive(Default)]
pub struct MemoryStore {
    groups: RwLock<Vec<GroupRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.groups.read().await.iter().map(GroupRecord::group).collect())
    }

    async fn insert_group(&self, record: GroupRecord) -> Result<(), StoreError> {
        let mut groups = self.groups.write().await;
        if groups.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::GroupExists(record.id));
        }
        groups.push(record);
        Ok(())
    }

    async fn find_group(&self, id: &str) -> Result<GroupRecord, StoreError> {
        self.groups
            .read()
            .await
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| StoreError::GroupNotFound(id.to_string()))
    }

    async fn add_member(&self, group_id: &str, member: Member) -> Result<(), StoreError> {
        let mut groups = self.groups.write().await;
        let record = groups
            .iter_mut()
            .find(|record| record.id == group_id)
            .ok_or_else(|| StoreError::GroupNotFound(group_id.to_string()))?;
        ensure_new_member(record, &member)?;
        record.members.push(member);
        Ok(())
    }

    async fn add_expense(&self, group_id: &str, expense: GroupExpense) -> Result<(), StoreError> {
        let mut groups = self.groups.write().await;
        let record = groups
            .iter_mut()
            .find(|record| record.id == group_id)
            .ok_or_else(|| StoreError::GroupNotFound(group_id.to_string()))?;
        record.expenses.push(expense);
        Ok(())
    }
}

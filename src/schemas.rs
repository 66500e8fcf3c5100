use crate::money::Money;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type MemberId = String;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Membership order is used to break ties when settling.
    pub members: Vec<Member>,
}

impl Group {
    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    pub fn is_member(&self, id: &str) -> bool {
        self.member(id).is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GroupExpense {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub amount: Money,
    pub paid_by: MemberId,
    pub split_among: Vec<MemberId>,
    pub date: DateTime<Utc>,
}

/// The stored form of a group: its members and the expense ledger in the
/// order the expenses were added.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
    pub members: Vec<Member>,
    #[serde(default)]
    pub expenses: Vec<GroupExpense>,
}

impl GroupRecord {
    pub fn group(&self) -> Group {
        Group {
            id: self.id.clone(),
            name: self.name.clone(),
            members: self.members.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewExpense {
    #[serde(default)]
    pub description: String,
    pub amount: Money,
    pub paid_by: MemberId,
    pub split_among: Vec<MemberId>,
    pub date: Option<DateTime<Utc>>,
}

impl NewExpense {
    pub fn into_expense(self) -> GroupExpense {
        GroupExpense {
            id: ObjectId::new().to_hex(),
            description: self.description,
            amount: self.amount,
            paid_by: self.paid_by,
            split_among: self.split_among,
            date: self.date.unwrap_or_else(Utc::now),
        }
    }
}

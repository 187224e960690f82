use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Member,
}

#[derive(Debug, Clone)]
pub struct Poll {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Membership {
    pub account_id: Uuid,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// A poll as seen by one of its members.
#[derive(Debug, Clone, Serialize)]
pub struct PollView {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub members: Vec<Uuid>,
}

impl PollView {
    pub fn new(poll: &Poll, role: Role, members: &[Membership]) -> Self {
        Self {
            id: poll.id,
            name: poll.name.clone(),
            role,
            invite_code: match role {
                Role::Owner => Some(poll.invite_code.clone()),
                Role::Member => None,
            },
            created_by: poll.created_by,
            created_at: poll.created_at,
            updated_at: poll.updated_at,
            members: members.iter().map(|m| m.account_id).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Create {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Join {
    pub invite_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rename {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub name: String,
    pub created_by: Uuid,
}

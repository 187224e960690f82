use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// How many votes a member may hold inside one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VotePolicy {
    /// One vote per (voter, option); a member may back several options.
    #[default]
    Multi,
    /// One vote per (voter, poll).
    Single,
}

impl FromStr for VotePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multi" => Ok(VotePolicy::Multi),
            "single" => Ok(VotePolicy::Single),
            other => Err(Error::Invalid(format!("unknown vote policy: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Vote {
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub voter_id: Uuid,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ballot {
    pub option_id: Uuid,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PollOptionResult {
    pub option_id: Uuid,
    pub option_name: String,
    pub vote_count: usize,
    pub voter_ids: Vec<Uuid>,
}

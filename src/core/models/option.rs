use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Opt {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub name: String,
    pub added_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptCreate {
    pub name: String,
    pub restaurant_id: Option<String>,
    pub image_url: Option<String>,
    pub menu_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub name: String,
    pub added_by: Uuid,
    pub restaurant_id: Option<String>,
    pub image_url: Option<String>,
    pub menu_url: Option<String>,
}

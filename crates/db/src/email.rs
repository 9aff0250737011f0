use diesel::prelude::Queryable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Queryable, Serialize, Deserialize, Clone)]
pub struct EmailRow {
    pub id: i64,
    pub message_id: String,
    pub recipients: String,
    pub contents: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

use chrono::NaiveDateTime;
use diesel::{prelude::*, sql_types::Bool, sqlite::Sqlite};
use serde::Serialize;

use crate::schema::registrations;

pub const STATUS_REGISTERED: &str = "registered";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_ATTENDED: &str = "attended";
pub const STATUS_CANCELLED: &str = "cancelled";

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct Registration {
    pub id: i64,
    pub public_id: String,
    pub hub_event_id: i64,
    pub user_id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    // JSON array of interest area tags
    pub interest_areas: String,
    pub note: Option<String>,
    // one of "registered", "confirmed", "attended", "cancelled"
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl Registration {
    /// Filter for the live (non-cancelled) registration occupying the
    /// uniqueness slot for this hub-event and email, if any.
    pub fn live_slot<'a>(
        hub_event_id: i64,
        email: &'a str,
    ) -> Box<
        dyn BoxableExpression<registrations::table, Sqlite, SqlType = Bool>
            + 'a,
    > {
        Box::new(
            registrations::hub_event_id
                .eq(hub_event_id)
                .and(registrations::email.eq(email))
                .and(registrations::status.ne(STATUS_CANCELLED)),
        )
    }

    pub fn interest_areas(&self) -> Vec<String> {
        serde_json::from_str(&self.interest_areas).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSerializer {
    pub id: String,
    pub hub_event_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub interest_areas: Vec<String>,
    pub note: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl RegistrationSerializer {
    pub fn from_db_ty(
        registration: Registration,
        hub_event_public_id: String,
    ) -> RegistrationSerializer {
        RegistrationSerializer {
            id: registration.public_id.clone(),
            hub_event_id: hub_event_public_id,
            first_name: registration.first_name.clone(),
            last_name: registration.last_name.clone(),
            email: registration.email.clone(),
            interest_areas: registration.interest_areas(),
            note: registration.note.clone(),
            status: registration.status.clone(),
            created_at: registration.created_at,
        }
    }
}

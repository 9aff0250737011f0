use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::{
    hub::{Hub, HubSerializer},
    schema::{hub_events, hubs},
    TracedConn,
};

pub const EVENT_TYPES: &[&str] =
    &["workshop", "meetup", "hackathon", "conference"];

pub const FOCUS_AREAS: &[&str] =
    &["product", "design", "engineering", "general"];

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct Event {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    // one of "workshop", "meetup", "hackathon", "conference"
    pub event_type: String,
    // JSON array of focus area tags
    pub focus_areas: String,
    pub published: bool,
    pub created_at: NaiveDateTime,
}

impl Event {
    pub fn focus_areas(&self) -> Vec<String> {
        serde_json::from_str(&self.focus_areas).unwrap_or_default()
    }

    pub fn validate_event_type(event_type: &str) -> bool {
        EVENT_TYPES.contains(&event_type)
    }

    pub fn validate_focus_areas(areas: &[String]) -> bool {
        areas.iter().all(|area| FOCUS_AREAS.contains(&area.as_str()))
    }
}

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct HubEvent {
    pub id: i64,
    pub public_id: String,
    pub hub_id: i64,
    pub event_id: i64,
    pub is_primary: bool,
    pub created_at: NaiveDateTime,
}

#[diesel::dsl::auto_type]
/// Filter for the junction row linking this hub to this event.
pub fn hub_event_pair(hub_id: i64, event_id: i64) -> _ {
    hub_events::hub_id
        .eq(hub_id)
        .and(hub_events::event_id.eq(event_id))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubEventSerializer {
    pub id: String,
    pub hub: HubSerializer,
    pub is_primary: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSerializer {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub event_type: String,
    pub focus_areas: Vec<String>,
    pub published: bool,
    pub hubs: Vec<HubEventSerializer>,
}

impl EventSerializer {
    pub fn from_db_ty(
        event: Event,
        conn: &mut TracedConn,
    ) -> QueryResult<EventSerializer> {
        let hosted_at = hub_events::table
            .filter(hub_events::event_id.eq(event.id))
            .inner_join(hubs::table)
            .load::<(HubEvent, Hub)>(conn)?;

        Ok(EventSerializer {
            id: event.public_id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            event_type: event.event_type.clone(),
            focus_areas: event.focus_areas(),
            published: event.published,
            hubs: hosted_at
                .into_iter()
                .map(|(hub_event, hub)| HubEventSerializer {
                    id: hub_event.public_id,
                    hub: HubSerializer::from_db_ty(&hub),
                    is_primary: hub_event.is_primary,
                })
                .collect(),
        })
    }
}

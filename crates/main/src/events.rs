//! Event listings and the admin surface for managing events and the
//! hubs hosting them.

use chrono::{NaiveDateTime, Utc};
use db::{
    event::{hub_event_pair, Event, EventSerializer, HubEvent},
    hub::{Hub, HubSerializer},
    schema::{events, hub_events, hubs},
    user::User,
    DbConn,
};
use diesel::prelude::*;
use rocket::{response::status, serde::json::Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{ApiError, ApiResult},
    permissions::{is_staff, AdminUser, StaffUser},
};

#[get("/api/events")]
pub async fn list_events(db: DbConn) -> ApiResult<Json<Vec<EventSerializer>>> {
    db.run(|conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let published = events::table
                .filter(events::published.eq(true))
                .order_by(events::starts_at.asc())
                .load::<Event>(conn)?;

            let mut serialized = Vec::with_capacity(published.len());
            for event in published {
                serialized.push(EventSerializer::from_db_ty(event, conn)?);
            }

            Ok(Json(serialized))
        })
    })
    .await
}

#[get("/api/events/<event_id>")]
pub async fn get_event(
    event_id: String,
    user: Option<User>,
    db: DbConn,
) -> ApiResult<Json<EventSerializer>> {
    let caller_is_staff = user.as_ref().map(is_staff).unwrap_or(false);

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let event = events::table
                .filter(events::public_id.eq(&event_id))
                .first::<Event>(conn)
                .optional()?
                .ok_or(ApiError::NotFound)?;

            // unpublished events are only visible to staff
            if !event.published && !caller_is_staff {
                return Err(ApiError::NotFound);
            }

            Ok(Json(EventSerializer::from_db_ty(event, conn)?))
        })
    })
    .await
}

#[get("/api/admin/events")]
pub async fn admin_list_events(
    _staff: StaffUser,
    db: DbConn,
) -> ApiResult<Json<Vec<EventSerializer>>> {
    db.run(|conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let all = events::table
                .order_by(events::starts_at.asc())
                .load::<Event>(conn)?;

            let mut serialized = Vec::with_capacity(all.len());
            for event in all {
                serialized.push(EventSerializer::from_db_ty(event, conn)?);
            }

            Ok(Json(serialized))
        })
    })
    .await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub event_type: String,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub published: bool,
}

#[post("/api/events", data = "<form>")]
pub async fn do_create_event(
    _admin: AdminUser,
    form: Json<CreateEventRequest>,
    db: DbConn,
) -> ApiResult<status::Created<Json<EventSerializer>>> {
    let form = form.into_inner();

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            if form.title.trim().is_empty() {
                return Err(ApiError::Validation(
                    "an event needs a title".to_string(),
                ));
            }

            if !Event::validate_event_type(&form.event_type) {
                return Err(ApiError::Validation(format!(
                    "unknown event type {:?}",
                    form.event_type
                )));
            }

            if !Event::validate_focus_areas(&form.focus_areas) {
                return Err(ApiError::Validation(
                    "unknown focus area".to_string(),
                ));
            }

            if form.ends_at < form.starts_at {
                return Err(ApiError::Validation(
                    "an event cannot end before it starts".to_string(),
                ));
            }

            let event = diesel::insert_into(events::table)
                .values((
                    events::public_id.eq(Uuid::now_v7().to_string()),
                    events::title.eq(form.title.trim()),
                    events::description.eq(&form.description),
                    events::starts_at.eq(form.starts_at),
                    events::ends_at.eq(form.ends_at),
                    events::event_type.eq(&form.event_type),
                    events::focus_areas
                        .eq(serde_json::to_string(&form.focus_areas)
                            .unwrap()),
                    events::published.eq(form.published),
                    events::created_at.eq(Utc::now().naive_utc()),
                ))
                .returning(events::all_columns)
                .get_result::<Event>(conn)?;

            Ok(status::Created::new(format!(
                "/api/events/{}",
                event.public_id
            ))
            .body(Json(EventSerializer::from_db_ty(event, conn)?)))
        })
    })
    .await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkHubRequest {
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedHubSerializer {
    pub id: String,
    pub event_id: String,
    pub hub: HubSerializer,
    pub is_primary: bool,
}

/// Links a hub to an event. The `(hub, event)` pair is unique: linking
/// the same pair twice is a conflict.
#[post("/api/events/<event_id>/hubs/<hub_id>", data = "<form>")]
pub async fn do_link_hub(
    event_id: String,
    hub_id: String,
    _admin: AdminUser,
    form: Json<LinkHubRequest>,
    db: DbConn,
) -> ApiResult<status::Created<Json<LinkedHubSerializer>>> {
    let form = form.into_inner();

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let event = events::table
                .filter(events::public_id.eq(&event_id))
                .first::<Event>(conn)
                .optional()?
                .ok_or(ApiError::NotFound)?;

            let hub = hubs::table
                .filter(hubs::public_id.eq(&hub_id))
                .first::<Hub>(conn)
                .optional()?
                .ok_or(ApiError::NotFound)?;

            let already_linked = hub_events::table
                .filter(hub_event_pair(hub.id, event.id))
                .first::<HubEvent>(conn)
                .optional()?;

            if already_linked.is_some() {
                return Err(ApiError::Conflict(
                    "this hub already hosts this event".to_string(),
                ));
            }

            // the UNIQUE (hub_id, event_id) constraint backstops the
            // check above
            let hub_event = diesel::insert_into(hub_events::table)
                .values((
                    hub_events::public_id.eq(Uuid::now_v7().to_string()),
                    hub_events::hub_id.eq(hub.id),
                    hub_events::event_id.eq(event.id),
                    hub_events::is_primary.eq(form.is_primary),
                    hub_events::created_at.eq(Utc::now().naive_utc()),
                ))
                .returning(hub_events::all_columns)
                .get_result::<HubEvent>(conn)?;

            Ok(status::Created::new(format!(
                "/api/hub-events/{}",
                hub_event.public_id
            ))
            .body(Json(LinkedHubSerializer {
                id: hub_event.public_id,
                event_id: event.public_id,
                hub: HubSerializer::from_db_ty(&hub),
                is_primary: hub_event.is_primary,
            })))
        })
    })
    .await
}

//! The registration flow: signing people up for a hub-hosted event,
//! with at-most-one live registration per (hub-event, email).
//!
//! Two call shapes arrive here. The modern one names a hub-event
//! directly; the historical "waitlist" one carries no event context at
//! all and is routed through a well-known fallback hub/event pair which
//! is created on first use and reused forever after.

use std::sync::Arc;

use chrono::Utc;
use db::{
    event::{hub_event_pair, Event, HubEvent},
    hub::Hub,
    registration::{
        Registration, RegistrationSerializer, STATUS_CANCELLED,
        STATUS_REGISTERED,
    },
    schema::{events, hub_events, hubs, registrations},
    user::User,
    DbConn, TracedConn,
};
use diesel::prelude::*;
use email::{MailingList, Notifier, RegistrationNotice};
use rocket::{
    http::Status, response::status, serde::json::Json, State,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{ApiError, ApiResult},
    permissions::{AdminUser, StaffUser},
};

pub const WAITLIST_EVENT_TITLE: &str = "BuildClub Waitlist";
pub const GLOBAL_HUB_NAME: &str = "BuildClub Global";

#[derive(Debug, Clone)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Registers `contact` for the given hub-event with status
/// "registered".
///
/// The application-level lookup gives duplicate submissions a friendly
/// Conflict; the partial unique index over non-cancelled
/// `(hub_event_id, email)` rows is the authoritative guard, so two
/// concurrent submissions cannot both get past the check. A cancelled
/// registration does not occupy the slot.
pub fn register(
    conn: &mut TracedConn,
    hub_event: &HubEvent,
    user: Option<&User>,
    contact: &Contact,
    interest_areas: &[String],
    note: Option<String>,
) -> Result<Registration, ApiError> {
    if contact.first_name.trim().is_empty() {
        return Err(ApiError::Validation(
            "a first name is required".to_string(),
        ));
    }

    if !User::validate_email(&contact.email) {
        return Err(ApiError::Validation(
            "that email address is not valid".to_string(),
        ));
    }

    if !Event::validate_focus_areas(interest_areas) {
        return Err(ApiError::Validation(
            "unknown interest area".to_string(),
        ));
    }

    let occupied = registrations::table
        .filter(Registration::live_slot(hub_event.id, &contact.email))
        .first::<Registration>(conn)
        .optional()?
        .is_some();

    if occupied {
        return Err(ApiError::Conflict(
            "this email is already registered for this event".to_string(),
        ));
    }

    let registration = diesel::insert_into(registrations::table)
        .values((
            registrations::public_id.eq(Uuid::now_v7().to_string()),
            registrations::hub_event_id.eq(hub_event.id),
            registrations::user_id.eq(user.map(|user| user.id)),
            registrations::first_name.eq(contact.first_name.trim()),
            registrations::last_name.eq(contact.last_name.trim()),
            registrations::email.eq(&contact.email),
            registrations::interest_areas
                .eq(serde_json::to_string(interest_areas).unwrap()),
            registrations::note.eq(&note),
            registrations::status.eq(STATUS_REGISTERED),
            registrations::created_at.eq(Utc::now().naive_utc()),
        ))
        .returning(registrations::all_columns)
        .get_result::<Registration>(conn)?;

    Ok(registration)
}

/// Resolves or creates the fallback hub/event pair behind the legacy
/// waitlist shape.
///
/// Lookup is by natural key (the well-known title and hub name), so
/// repeated calls reuse the same rows and at most one fallback Event,
/// Hub and HubEvent ever exist.
pub fn fallback_hub_event(
    conn: &mut TracedConn,
) -> Result<HubEvent, diesel::result::Error> {
    let now = Utc::now().naive_utc();

    let event = match events::table
        .filter(events::title.eq(WAITLIST_EVENT_TITLE))
        .first::<Event>(conn)
        .optional()?
    {
        Some(event) => event,
        None => diesel::insert_into(events::table)
            .values((
                events::public_id.eq(Uuid::now_v7().to_string()),
                events::title.eq(WAITLIST_EVENT_TITLE),
                events::starts_at.eq(now),
                events::ends_at.eq(now),
                events::event_type.eq("meetup"),
                events::focus_areas.eq("[]"),
                events::published.eq(false),
                events::created_at.eq(now),
            ))
            .returning(events::all_columns)
            .get_result::<Event>(conn)?,
    };

    let hub = match hubs::table
        .filter(Hub::with_name(GLOBAL_HUB_NAME))
        .first::<Hub>(conn)
        .optional()?
    {
        Some(hub) => hub,
        None => diesel::insert_into(hubs::table)
            .values((
                hubs::public_id.eq(Uuid::now_v7().to_string()),
                hubs::name.eq(GLOBAL_HUB_NAME),
                hubs::city.eq("Global"),
                hubs::country.eq("Global"),
                hubs::created_at.eq(now),
            ))
            .returning(hubs::all_columns)
            .get_result::<Hub>(conn)?,
    };

    let hub_event = match hub_events::table
        .filter(hub_event_pair(hub.id, event.id))
        .first::<HubEvent>(conn)
        .optional()?
    {
        Some(hub_event) => hub_event,
        None => diesel::insert_into(hub_events::table)
            .values((
                hub_events::public_id.eq(Uuid::now_v7().to_string()),
                hub_events::hub_id.eq(hub.id),
                hub_events::event_id.eq(event.id),
                hub_events::is_primary.eq(true),
                hub_events::created_at.eq(now),
            ))
            .returning(hub_events::all_columns)
            .get_result::<HubEvent>(conn)?,
    };

    Ok(hub_event)
}

fn notice_for(
    conn: &mut TracedConn,
    hub_event: &HubEvent,
    registration: &Registration,
) -> Result<RegistrationNotice, diesel::result::Error> {
    let event = events::table
        .filter(events::id.eq(hub_event.event_id))
        .first::<Event>(conn)?;
    let hub = hubs::table
        .filter(hubs::id.eq(hub_event.hub_id))
        .first::<Hub>(conn)?;

    Ok(RegistrationNotice {
        first_name: registration.first_name.clone(),
        last_name: registration.last_name.clone(),
        email: registration.email.clone(),
        event_title: event.title,
        hub_name: hub.name,
        interest_areas: registration.interest_areas(),
    })
}

/// Fires the three post-commit side effects. Each one is independent
/// and best-effort: a failure is logged inside the collaborator and
/// never reaches the client.
fn dispatch_side_effects(
    notifier: &Arc<dyn Notifier>,
    list: &Arc<dyn MailingList>,
    notice: &RegistrationNotice,
    db: Arc<DbConn>,
) {
    list.upsert_contact(notice);
    notifier.registration_confirmed(notice, db.clone());
    notifier.operator_alert(notice, db);
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub interest_areas: Vec<String>,
    pub ai_interests: Option<String>,
}

/// The historical signup shape: no hub or event context at all.
#[post("/api/waitlist", data = "<form>")]
pub async fn do_waitlist_signup(
    form: Json<WaitlistRequest>,
    db: DbConn,
    notifier: &State<Arc<dyn Notifier>>,
    list: &State<Arc<dyn MailingList>>,
) -> ApiResult<status::Created<Json<RegistrationSerializer>>> {
    let db = Arc::new(db);
    let form = form.into_inner();

    let (serialized, notice) = db
        .run(move |conn| {
            conn.transaction::<_, ApiError, _>(|conn| {
                let hub_event = fallback_hub_event(conn)?;

                let contact = Contact {
                    first_name: form.first_name,
                    last_name: form.last_name,
                    email: form.email,
                };

                let registration = register(
                    conn,
                    &hub_event,
                    None,
                    &contact,
                    &form.interest_areas,
                    form.ai_interests,
                )?;

                let notice = notice_for(conn, &hub_event, &registration)?;

                Ok((
                    RegistrationSerializer::from_db_ty(
                        registration,
                        hub_event.public_id,
                    ),
                    notice,
                ))
            })
        })
        .await?;

    dispatch_side_effects(notifier, list, &notice, db);

    Ok(status::Created::new(format!(
        "/api/registrations/{}",
        serialized.id
    ))
    .body(Json(serialized)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub hub_event_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub interest_areas: Vec<String>,
    pub notes: Option<String>,
}

/// The modern signup shape: a hub-event reference plus either explicit
/// guest contact details or the authenticated caller's identity.
#[post("/api/events/register", data = "<form>")]
pub async fn do_event_registration(
    form: Json<RegisterRequest>,
    user: Option<User>,
    db: DbConn,
    notifier: &State<Arc<dyn Notifier>>,
    list: &State<Arc<dyn MailingList>>,
) -> ApiResult<status::Created<Json<RegistrationSerializer>>> {
    let db = Arc::new(db);
    let form = form.into_inner();

    let contact = match &user {
        Some(user) => Contact {
            first_name: form
                .first_name
                .clone()
                .unwrap_or_else(|| user.username.clone()),
            last_name: form.last_name.clone().unwrap_or_default(),
            email: match form.email.clone().or_else(|| user.email.clone()) {
                Some(email) => email,
                None => {
                    return Err(ApiError::Validation(
                        "an email address is required".to_string(),
                    ))
                }
            },
        },
        None => match (
            form.first_name.clone(),
            form.last_name.clone(),
            form.email.clone(),
        ) {
            (Some(first_name), Some(last_name), Some(email)) => Contact {
                first_name,
                last_name,
                email,
            },
            _ => {
                return Err(ApiError::Validation(
                    "first name, last name and email are required for \
                     guest registrations"
                        .to_string(),
                ))
            }
        },
    };

    let (serialized, notice) = db
        .run(move |conn| {
            conn.transaction::<_, ApiError, _>(|conn| {
                let hub_event = hub_events::table
                    .filter(hub_events::public_id.eq(&form.hub_event_id))
                    .first::<HubEvent>(conn)
                    .optional()?
                    .ok_or(ApiError::NotFound)?;

                let registration = register(
                    conn,
                    &hub_event,
                    user.as_ref(),
                    &contact,
                    &form.interest_areas,
                    form.notes,
                )?;

                let notice = notice_for(conn, &hub_event, &registration)?;

                Ok((
                    RegistrationSerializer::from_db_ty(
                        registration,
                        hub_event.public_id,
                    ),
                    notice,
                ))
            })
        })
        .await?;

    dispatch_side_effects(notifier, list, &notice, db);

    Ok(status::Created::new(format!(
        "/api/registrations/{}",
        serialized.id
    ))
    .body(Json(serialized)))
}

/// Read-only query surface: everyone registered for a hub-event,
/// optionally narrowed to a single email for existence checks.
#[get("/api/hub-events/<hub_event_id>/registrations?<email>")]
pub async fn list_registrations(
    hub_event_id: String,
    email: Option<String>,
    _staff: StaffUser,
    db: DbConn,
) -> ApiResult<Json<Vec<RegistrationSerializer>>> {
    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let hub_event = hub_events::table
                .filter(hub_events::public_id.eq(&hub_event_id))
                .first::<HubEvent>(conn)
                .optional()?
                .ok_or(ApiError::NotFound)?;

            let mut query = registrations::table
                .filter(registrations::hub_event_id.eq(hub_event.id))
                .order_by(registrations::created_at.asc())
                .into_boxed();

            if let Some(email) = &email {
                query = query.filter(registrations::email.eq(email));
            }

            let rows = query.load::<Registration>(conn)?;

            Ok(Json(
                rows.into_iter()
                    .map(|registration| {
                        RegistrationSerializer::from_db_ty(
                            registration,
                            hub_event.public_id.clone(),
                        )
                    })
                    .collect(),
            ))
        })
    })
    .await
}

/// Cancellation is a soft status change: the row stays, but the
/// uniqueness slot is freed for re-registration.
#[post("/api/registrations/<registration_id>/cancel")]
pub async fn do_cancel_registration(
    registration_id: String,
    _staff: StaffUser,
    db: DbConn,
) -> ApiResult<Json<RegistrationSerializer>> {
    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let registration = registrations::table
                .filter(registrations::public_id.eq(&registration_id))
                .first::<Registration>(conn)
                .optional()?
                .ok_or(ApiError::NotFound)?;

            let n = diesel::update(
                registrations::table
                    .filter(registrations::id.eq(registration.id)),
            )
            .set(registrations::status.eq(STATUS_CANCELLED))
            .execute(conn)?;
            assert_eq!(n, 1);

            let hub_event = hub_events::table
                .filter(hub_events::id.eq(registration.hub_event_id))
                .first::<HubEvent>(conn)?;

            Ok(Json(RegistrationSerializer::from_db_ty(
                Registration {
                    status: STATUS_CANCELLED.to_string(),
                    ..registration
                },
                hub_event.public_id,
            )))
        })
    })
    .await
}

#[delete("/api/registrations/<registration_id>")]
pub async fn do_delete_registration(
    registration_id: String,
    _admin: AdminUser,
    db: DbConn,
) -> ApiResult<Status> {
    db.run(move |conn| {
        let n = diesel::delete(
            registrations::table
                .filter(registrations::public_id.eq(&registration_id)),
        )
        .execute(conn)
        .map_err(ApiError::from)?;

        if n == 0 {
            return Err(ApiError::NotFound);
        }

        Ok(Status::NoContent)
    })
    .await
}

//! A test of application behaviour over the HTTP surface, with direct
//! database assertions through a second connection. Focuses on the
//! registration uniqueness guarantees, the fallback waitlist bootstrap
//! and identity resolution.

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use chrono::Utc;
use db::{
    registration::STATUS_CANCELLED,
    schema::{events, hub_events, hubs, registrations, users},
    token,
    user::User,
};
use diesel::{prelude::*, sql_query, SqliteConnection};
use rand::rngs::OsRng;
use rocket::{
    http::{ContentType, Header, Status},
    local::blocking::Client,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::make_rocket;

use crate::registration::{GLOBAL_HUB_NAME, WAITLIST_EVENT_TITLE};

fn get_test_client() -> (Client, SqliteConnection) {
    std::env::set_var("JWT_SECRET", "test-secret");
    std::env::remove_var("DATABASE_URL");

    let db_name = std::env::temp_dir()
        .join(format!("{}.db", Uuid::now_v7()))
        .display()
        .to_string();

    let mut conn = SqliteConnection::establish(&db_name)
        .expect("Database connection failed");
    sql_query("PRAGMA journal_mode=WAL")
        .execute(&mut conn)
        .expect("Failed to enable WAL mode");
    sql_query("PRAGMA foreign_keys=ON")
        .execute(&mut conn)
        .expect("Failed to enable foreign keys");

    let rocket = make_rocket(&db_name);
    (Client::tracked(rocket).unwrap(), conn)
}

/// Creates a hub, an event and the junction row linking them, returning
/// the hub-event public id.
fn seed_hub_event(conn: &mut SqliteConnection) -> String {
    let now = Utc::now().naive_utc();

    let hub_id = diesel::insert_into(hubs::table)
        .values((
            hubs::public_id.eq(Uuid::now_v7().to_string()),
            hubs::name.eq("Lisbon Hub"),
            hubs::city.eq("Lisbon"),
            hubs::country.eq("Portugal"),
            hubs::created_at.eq(now),
        ))
        .returning(hubs::id)
        .get_result::<i64>(conn)
        .unwrap();

    let event_id = diesel::insert_into(events::table)
        .values((
            events::public_id.eq(Uuid::now_v7().to_string()),
            events::title.eq("Design Workshop"),
            events::starts_at.eq(now),
            events::ends_at.eq(now),
            events::event_type.eq("workshop"),
            events::focus_areas.eq(r#"["design"]"#),
            events::published.eq(true),
            events::created_at.eq(now),
        ))
        .returning(events::id)
        .get_result::<i64>(conn)
        .unwrap();

    diesel::insert_into(hub_events::table)
        .values((
            hub_events::public_id.eq(Uuid::now_v7().to_string()),
            hub_events::hub_id.eq(hub_id),
            hub_events::event_id.eq(event_id),
            hub_events::is_primary.eq(true),
            hub_events::created_at.eq(now),
        ))
        .returning(hub_events::public_id)
        .get_result::<String>(conn)
        .unwrap()
}

fn make_user(
    conn: &mut SqliteConnection,
    username: &str,
    role: &str,
    password: Option<&str>,
) -> User {
    let password_hash = password.map(|password| {
        Argon2::default()
            .hash_password(
                password.as_bytes(),
                &SaltString::generate(&mut OsRng),
            )
            .unwrap()
            .to_string()
    });

    diesel::insert_into(users::table)
        .values((
            users::public_id.eq(Uuid::now_v7().to_string()),
            users::username.eq(username),
            users::email.eq(Some(format!("{username}@example.com"))),
            users::password_hash.eq(password_hash),
            users::role.eq(role),
            users::created_at.eq(Utc::now().naive_utc()),
        ))
        .returning(users::all_columns)
        .get_result::<User>(conn)
        .unwrap()
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

fn body_json(response: rocket::local::blocking::LocalResponse) -> Value {
    serde_json::from_str(&response.into_string().unwrap()).unwrap()
}

#[test]
fn guest_registration_dedupes_by_email() {
    let (client, mut conn) = get_test_client();
    let hub_event = seed_hub_event(&mut conn);

    let body = json!({
        "hubEventId": hub_event,
        "firstName": "Ana",
        "lastName": "Lee",
        "email": "ana@example.com",
        "interestAreas": ["design"],
    })
    .to_string();

    let response = client
        .post("/api/events/register")
        .header(ContentType::JSON)
        .body(&body)
        .dispatch();
    assert_eq!(response.status(), Status::Created);
    let created = body_json(response);
    assert_eq!(created["status"], "registered");
    assert_eq!(created["email"], "ana@example.com");

    // the identical call again must not create a second row
    let response = client
        .post("/api/events/register")
        .header(ContentType::JSON)
        .body(&body)
        .dispatch();
    assert_eq!(response.status(), Status::Conflict);

    let count = registrations::table
        .filter(registrations::email.eq("ana@example.com"))
        .count()
        .get_result::<i64>(&mut conn)
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn registration_validates_guest_contact() {
    let (client, mut conn) = get_test_client();
    let hub_event = seed_hub_event(&mut conn);

    // no contact details and no identity
    let response = client
        .post("/api/events/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "hubEventId": hub_event,
                "interestAreas": ["design"],
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    // unknown interest area
    let response = client
        .post("/api/events/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "hubEventId": hub_event,
                "firstName": "Ana",
                "lastName": "Lee",
                "email": "ana@example.com",
                "interestAreas": ["juggling"],
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let count = registrations::table
        .count()
        .get_result::<i64>(&mut conn)
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn waitlist_bootstrap_is_idempotent() {
    let (client, mut conn) = get_test_client();

    for email in ["sam@x.com", "ng@x.com"] {
        let response = client
            .post("/api/waitlist")
            .header(ContentType::JSON)
            .body(
                json!({
                    "firstName": "Sam",
                    "lastName": "Ng",
                    "email": email,
                    "interestAreas": ["engineering"],
                })
                .to_string(),
            )
            .dispatch();
        assert_eq!(response.status(), Status::Created);
    }

    let fallback_events = events::table
        .filter(events::title.eq(WAITLIST_EVENT_TITLE))
        .count()
        .get_result::<i64>(&mut conn)
        .unwrap();
    assert_eq!(fallback_events, 1);

    let fallback_hubs = hubs::table
        .filter(hubs::name.eq(GLOBAL_HUB_NAME))
        .count()
        .get_result::<i64>(&mut conn)
        .unwrap();
    assert_eq!(fallback_hubs, 1);

    let junctions = hub_events::table
        .count()
        .get_result::<i64>(&mut conn)
        .unwrap();
    assert_eq!(junctions, 1);

    // both registrations hang off the same hub-event
    let hub_event_ids = registrations::table
        .select(registrations::hub_event_id)
        .load::<i64>(&mut conn)
        .unwrap();
    assert_eq!(hub_event_ids.len(), 2);
    assert_eq!(hub_event_ids[0], hub_event_ids[1]);
}

#[test]
fn waitlist_duplicate_email_conflicts() {
    let (client, _conn) = get_test_client();

    let body = json!({
        "firstName": "Sam",
        "lastName": "Ng",
        "email": "sam@x.com",
        "interestAreas": [],
    })
    .to_string();

    let response = client
        .post("/api/waitlist")
        .header(ContentType::JSON)
        .body(&body)
        .dispatch();
    assert_eq!(response.status(), Status::Created);

    let response = client
        .post("/api/waitlist")
        .header(ContentType::JSON)
        .body(&body)
        .dispatch();
    assert_eq!(response.status(), Status::Conflict);
}

#[test]
fn session_outranks_bearer_token() {
    let (client, mut conn) = get_test_client();
    make_user(&mut conn, "ana", "member", Some("correct-horse-9"));
    let ben = make_user(&mut conn, "ben", "member", None);

    let response = client
        .post("/api/auth/login")
        .header(ContentType::JSON)
        .body(
            json!({
                "username": "ana",
                "password": "correct-horse-9",
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    // the tracked client now carries ana's session; presenting ben's
    // (valid) token on the same request must not override it
    let ben_token = token::issue_token(&ben).unwrap();
    let response = client
        .get("/api/user")
        .header(bearer(&ben_token))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body_json(response)["user"]["username"], "ana");
}

#[test]
fn bad_tokens_resolve_to_anonymous() {
    let (client, mut conn) = get_test_client();
    let ana = make_user(&mut conn, "ana", "member", None);

    let response = client.get("/api/user").dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    let expired = token::issue_token_expiring_at(
        &ana,
        (Utc::now() - chrono::Duration::hours(2)).timestamp(),
    )
    .unwrap();
    let response =
        client.get("/api/user").header(bearer(&expired)).dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    let valid = token::issue_token(&ana).unwrap();
    let parts: Vec<&str> = valid.split('.').collect();
    let tampered = format!(
        "{}.{}.{}",
        parts[0],
        parts[1],
        parts[2].chars().rev().collect::<String>()
    );
    let response =
        client.get("/api/user").header(bearer(&tampered)).dispatch();
    assert_eq!(response.status(), Status::Unauthorized);
}

#[test]
fn role_gates_distinguish_anonymous_from_forbidden() {
    let (client, mut conn) = get_test_client();
    let member = make_user(&mut conn, "mem", "member", None);
    let ambassador = make_user(&mut conn, "amb", "ambassador", None);
    let admin = make_user(&mut conn, "adm", "admin", None);

    let response = client.get("/api/admin/events").dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .get("/api/admin/events")
        .header(bearer(&token::issue_token(&member).unwrap()))
        .dispatch();
    assert_eq!(response.status(), Status::Forbidden);

    let response = client
        .get("/api/admin/events")
        .header(bearer(&token::issue_token(&ambassador).unwrap()))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .get("/api/admin/events")
        .header(bearer(&token::issue_token(&admin).unwrap()))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    // ambassadors can view, but only admins can create
    let response = client
        .post("/api/hubs")
        .header(ContentType::JSON)
        .header(bearer(&token::issue_token(&ambassador).unwrap()))
        .body(
            json!({
                "name": "Berlin Hub",
                "city": "Berlin",
                "country": "Germany",
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Forbidden);
}

#[test]
fn cancelled_registration_frees_the_slot() {
    let (client, mut conn) = get_test_client();
    let hub_event = seed_hub_event(&mut conn);
    let admin = make_user(&mut conn, "adm", "admin", None);
    let admin_token = token::issue_token(&admin).unwrap();

    let body = json!({
        "hubEventId": hub_event,
        "firstName": "Ana",
        "lastName": "Lee",
        "email": "ana@example.com",
        "interestAreas": ["design"],
    })
    .to_string();

    let response = client
        .post("/api/events/register")
        .header(ContentType::JSON)
        .body(&body)
        .dispatch();
    assert_eq!(response.status(), Status::Created);
    let registration_id =
        body_json(response)["id"].as_str().unwrap().to_string();

    let response = client
        .post(format!("/api/registrations/{registration_id}/cancel"))
        .header(bearer(&admin_token))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body_json(response)["status"], STATUS_CANCELLED);

    // the same email can now register again
    let response = client
        .post("/api/events/register")
        .header(ContentType::JSON)
        .body(&body)
        .dispatch();
    assert_eq!(response.status(), Status::Created);

    let count = registrations::table
        .filter(registrations::email.eq("ana@example.com"))
        .count()
        .get_result::<i64>(&mut conn)
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn account_registration_and_login() {
    let (client, _conn) = get_test_client();

    let response = client
        .post("/api/auth/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "username": "sam",
                "email": "sam@x.com",
                "password": "longenough1",
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Created);

    // registering set a session for the new account
    let response = client.get("/api/user").dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body_json(response)["user"]["username"], "sam");

    let response = client
        .post("/api/auth/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "username": "sam",
                "email": "other@x.com",
                "password": "longenough1",
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Conflict);

    let response = client.post("/api/auth/logout").dispatch();
    assert_eq!(response.status(), Status::NoContent);

    let response = client.get("/api/me").dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body = body_json(response);
    assert_eq!(body["isAuthenticated"], false);
    assert_eq!(body["user"], Value::Null);
}

#[test]
fn admin_event_flow() {
    let (client, mut conn) = get_test_client();
    let admin = make_user(&mut conn, "adm", "admin", None);
    let admin_token = token::issue_token(&admin).unwrap();

    let response = client
        .post("/api/hubs")
        .header(ContentType::JSON)
        .header(bearer(&admin_token))
        .body(
            json!({
                "name": "Berlin Hub",
                "city": "Berlin",
                "country": "Germany",
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Created);
    let hub_id = body_json(response)["id"].as_str().unwrap().to_string();

    let response = client
        .post("/api/events")
        .header(ContentType::JSON)
        .header(bearer(&admin_token))
        .body(
            json!({
                "title": "Intro to Systems Programming",
                "startsAt": "2026-09-01T18:00:00",
                "endsAt": "2026-09-01T20:00:00",
                "eventType": "workshop",
                "focusAreas": ["engineering"],
                "published": true,
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Created);
    let event_id = body_json(response)["id"].as_str().unwrap().to_string();

    let response = client
        .post(format!("/api/events/{event_id}/hubs/{hub_id}"))
        .header(ContentType::JSON)
        .header(bearer(&admin_token))
        .body(json!({ "isPrimary": true }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Created);

    // linking the same pair twice is a conflict
    let response = client
        .post(format!("/api/events/{event_id}/hubs/{hub_id}"))
        .header(ContentType::JSON)
        .header(bearer(&admin_token))
        .body(json!({ "isPrimary": false }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Conflict);

    // the published event is publicly listed, with its hub attached
    let response = client.get("/api/events").dispatch();
    assert_eq!(response.status(), Status::Ok);
    let listed = body_json(response);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["hubs"][0]["hub"]["name"], "Berlin Hub");
    assert_eq!(listed[0]["hubs"][0]["isPrimary"], true);
}

#[test]
fn unpublished_events_are_hidden_from_guests() {
    let (client, mut conn) = get_test_client();
    let admin = make_user(&mut conn, "adm", "admin", None);
    let admin_token = token::issue_token(&admin).unwrap();

    let response = client
        .post("/api/events")
        .header(ContentType::JSON)
        .header(bearer(&admin_token))
        .body(
            json!({
                "title": "Secret Planning Session",
                "startsAt": "2026-09-01T18:00:00",
                "endsAt": "2026-09-01T20:00:00",
                "eventType": "meetup",
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Created);
    let event_id = body_json(response)["id"].as_str().unwrap().to_string();

    let response = client.get("/api/events").dispatch();
    assert_eq!(body_json(response).as_array().unwrap().len(), 0);

    let response = client.get(format!("/api/events/{event_id}")).dispatch();
    assert_eq!(response.status(), Status::NotFound);

    let response = client
        .get(format!("/api/events/{event_id}"))
        .header(bearer(&admin_token))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
}

#[test]
fn authenticated_registration_uses_identity_contact() {
    let (client, mut conn) = get_test_client();
    let hub_event = seed_hub_event(&mut conn);
    make_user(&mut conn, "ana", "member", Some("correct-horse-9"));

    let response = client
        .post("/api/auth/login")
        .header(ContentType::JSON)
        .body(
            json!({
                "username": "ana",
                "password": "correct-horse-9",
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .post("/api/events/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "hubEventId": hub_event,
                "interestAreas": [],
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Created);
    let created = body_json(response);
    assert_eq!(created["firstName"], "ana");
    assert_eq!(created["email"], "ana@example.com");

    // the registration row is linked back to the account
    let ana_rows = registrations::table
        .inner_join(users::table)
        .filter(users::username.eq("ana"))
        .count()
        .get_result::<i64>(&mut conn)
        .unwrap();
    assert_eq!(ana_rows, 1);
}

#[test]
fn registration_queries_are_staff_only() {
    let (client, mut conn) = get_test_client();
    let hub_event = seed_hub_event(&mut conn);
    let member = make_user(&mut conn, "mem", "member", None);
    let ambassador = make_user(&mut conn, "amb", "ambassador", None);

    for (name, email) in [("Ana", "ana@example.com"), ("Ben", "ben@x.com")]
    {
        let response = client
            .post("/api/events/register")
            .header(ContentType::JSON)
            .body(
                json!({
                    "hubEventId": hub_event,
                    "firstName": name,
                    "lastName": "Lee",
                    "email": email,
                    "interestAreas": [],
                })
                .to_string(),
            )
            .dispatch();
        assert_eq!(response.status(), Status::Created);
    }

    let path = format!("/api/hub-events/{hub_event}/registrations");

    let response = client
        .get(path.clone())
        .header(bearer(&token::issue_token(&member).unwrap()))
        .dispatch();
    assert_eq!(response.status(), Status::Forbidden);

    let ambassador_token = token::issue_token(&ambassador).unwrap();
    let response = client
        .get(path.clone())
        .header(bearer(&ambassador_token))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body_json(response).as_array().unwrap().len(), 2);

    let response = client
        .get(format!("{path}?email=ben%40x.com"))
        .header(bearer(&ambassador_token))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let narrowed = body_json(response);
    assert_eq!(narrowed.as_array().unwrap().len(), 1);
    assert_eq!(narrowed[0]["email"], "ben@x.com");
}

#[test]
fn email_audit_log_is_staff_only() {
    let (client, mut conn) = get_test_client();
    let ambassador = make_user(&mut conn, "amb", "ambassador", None);

    let response = client.get("/api/admin/emails").dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .get("/api/admin/emails")
        .header(bearer(&token::issue_token(&ambassador).unwrap()))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body_json(response).as_array().unwrap().len(), 0);
}

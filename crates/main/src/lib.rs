use auth::{
    google::{google_callback, google_login},
    login::do_login,
    logout::do_logout,
    me::{current_user, me},
    register::do_register,
};
use db::{user::User, DbConn};
use diesel_migrations::{
    embed_migrations, EmbeddedMigrations, MigrationHarness,
};
use emails::admin_list_emails;
use events::{
    admin_list_events, do_create_event, do_link_hub, get_event, list_events,
};
use html::page_of_body;
use hubs::{admin_list_hubs, do_create_hub, list_hubs};
use registration::{
    do_cancel_registration, do_delete_registration, do_event_registration,
    do_waitlist_signup, list_registrations,
};
use request_ids::RequestIdFairing;
use rocket::{
    fairing::AdHoc,
    figment::{
        util::map,
        value::{Map, Value},
    },
    Build, Rocket,
};

pub mod api;
pub mod auth;
pub mod emails;
pub mod events;
pub mod html;
pub mod hubs;
pub mod pages;
pub mod permissions;
pub mod registration;
pub mod request_ids;
pub mod util;

#[cfg(test)]
mod tests;

#[macro_use]
extern crate rocket;

#[get("/")]
fn index(user: Option<User>) -> maud::Markup {
    page_of_body(
        maud::html! {
            div {
                h1 { "BuildClub" }
                p {
                    "A community of builders. Find a hub near you, come
                     to a workshop, meetup, hackathon or conference, and
                     make something."
                }
                a class="btn btn-primary" href="/events" {
                    "See upcoming events"
                }
            }
        },
        user,
    )
}

pub const MIGRATIONS: EmbeddedMigrations =
    embed_migrations!("../../migrations");

pub fn make_rocket(default_db: &str) -> Rocket<Build> {
    let db: Map<_, Value> = map![
        "url" => std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| default_db.to_string())
            .into(),
        "pool_size" => 10.into(),
        "timeout" => 5.into(),
    ];

    let figment =
        rocket::Config::figment().merge(("databases", map!["database" => db]));

    rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(AdHoc::try_on_ignite("migrations", |rocket| async move {
            let db_conn = DbConn::get_one(&rocket).await.unwrap();

            let ret: Result<(), Box<dyn std::error::Error + Send + Sync>> =
                db_conn
                    .run(move |conn| {
                        conn.run_pending_migrations(MIGRATIONS)?;
                        Ok(())
                    })
                    .await;

            match ret {
                Ok(_) => Ok(rocket),
                Err(_) => Err(rocket),
            }
        }))
        .manage(email::notifier_from_env())
        .manage(email::mailing_list_from_env())
        .mount(
            "/",
            routes![
                index,
                pages::events_page,
                do_login,
                do_logout,
                do_register,
                current_user,
                me,
                google_login,
                google_callback,
                list_events,
                get_event,
                admin_list_events,
                do_create_event,
                do_link_hub,
                list_hubs,
                admin_list_hubs,
                do_create_hub,
                do_waitlist_signup,
                do_event_registration,
                list_registrations,
                do_cancel_registration,
                do_delete_registration,
                admin_list_emails
            ],
        )
        .register(
            "/",
            catchers![
                api::bad_request,
                api::unauthorized,
                api::forbidden,
                api::not_found,
                api::unprocessable,
                api::internal_error
            ],
        )
        .attach(RequestIdFairing)
}

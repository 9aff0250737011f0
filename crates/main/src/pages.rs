//! The public marketing pages.

use db::{
    event::Event,
    hub::Hub,
    schema::{events, hub_events, hubs},
    user::User,
    DbConn,
};
use diesel::prelude::*;
use maud::{html, Markup};

use crate::html::{page_of_body, page_title};

#[get("/events")]
pub async fn events_page(db: DbConn, user: Option<User>) -> Markup {
    db.run(|conn| {
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let upcoming = events::table
                .filter(events::published.eq(true))
                .order_by(events::starts_at.asc())
                .load::<Event>(conn)?;

            let mut listings = Vec::with_capacity(upcoming.len());
            for event in upcoming {
                let hosted_at = hub_events::table
                    .filter(hub_events::event_id.eq(event.id))
                    .inner_join(hubs::table)
                    .select(hubs::all_columns)
                    .load::<Hub>(conn)?;
                listings.push((event, hosted_at));
            }

            Ok(page_of_body(
                html! {
                    (page_title("Upcoming events"))
                    @if listings.is_empty() {
                        p { "Nothing scheduled right now - check back soon!" }
                    } @else {
                        table class="table" {
                            thead {
                                tr {
                                    th scope="col" { "Event" }
                                    th scope="col" { "Type" }
                                    th scope="col" { "Starts" }
                                    th scope="col" { "Hubs" }
                                }
                            }
                            tbody {
                                @for (event, hosted_at) in &listings {
                                    tr {
                                        th scope="row" { (event.title) }
                                        td { (event.event_type) }
                                        td { (event.starts_at.format("%Y-%m-%d %H:%M")) }
                                        td {
                                            @for hub in hosted_at {
                                                span class="badge text-bg-secondary me-1" {
                                                    (hub.name) ", " (hub.city)
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                user,
            ))
        })
        .unwrap()
    })
    .await
}

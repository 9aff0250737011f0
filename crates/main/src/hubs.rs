//! The hub directory and its admin surface.

use chrono::Utc;
use db::{
    hub::{Hub, HubSerializer},
    schema::{hub_events, hubs},
    DbConn,
};
use diesel::{
    dsl::{exists, select},
    prelude::*,
};
use rocket::{response::status, serde::json::Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{ApiError, ApiResult},
    permissions::{AdminUser, StaffUser},
};

#[get("/api/hubs")]
pub async fn list_hubs(db: DbConn) -> ApiResult<Json<Vec<HubSerializer>>> {
    db.run(|conn| {
        let all = hubs::table
            .order_by(hubs::name.asc())
            .load::<Hub>(conn)
            .map_err(ApiError::from)?;

        Ok(Json(all.iter().map(HubSerializer::from_db_ty).collect()))
    })
    .await
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminHubSerializer {
    #[serde(flatten)]
    pub hub: HubSerializer,
    pub linked_events: i64,
}

#[get("/api/admin/hubs")]
pub async fn admin_list_hubs(
    _staff: StaffUser,
    db: DbConn,
) -> ApiResult<Json<Vec<AdminHubSerializer>>> {
    db.run(|conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let all = hubs::table
                .order_by(hubs::name.asc())
                .load::<Hub>(conn)?;

            let mut listings = Vec::with_capacity(all.len());
            for hub in all {
                let linked_events = hub_events::table
                    .filter(hub_events::hub_id.eq(hub.id))
                    .count()
                    .get_result::<i64>(conn)?;
                listings.push(AdminHubSerializer {
                    hub: HubSerializer::from_db_ty(&hub),
                    linked_events,
                });
            }

            Ok(Json(listings))
        })
    })
    .await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHubRequest {
    pub name: String,
    pub city: String,
    pub country: String,
}

#[post("/api/hubs", data = "<form>")]
pub async fn do_create_hub(
    _admin: AdminUser,
    form: Json<CreateHubRequest>,
    db: DbConn,
) -> ApiResult<status::Created<Json<HubSerializer>>> {
    let form = form.into_inner();

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            if !Hub::validate_name(&form.name) {
                return Err(ApiError::Validation(
                    "hub names must be between 1 and 120 characters"
                        .to_string(),
                ));
            }

            if form.city.trim().is_empty() || form.country.trim().is_empty() {
                return Err(ApiError::Validation(
                    "a hub needs both a city and a country".to_string(),
                ));
            }

            let name_taken = select(exists(
                hubs::table.filter(Hub::with_name(form.name.trim())),
            ))
            .get_result::<bool>(conn)?;

            if name_taken {
                return Err(ApiError::Conflict(
                    "a hub with that name already exists".to_string(),
                ));
            }

            let hub = diesel::insert_into(hubs::table)
                .values((
                    hubs::public_id.eq(Uuid::now_v7().to_string()),
                    hubs::name.eq(form.name.trim()),
                    hubs::city.eq(form.city.trim()),
                    hubs::country.eq(form.country.trim()),
                    hubs::created_at.eq(Utc::now().naive_utc()),
                ))
                .returning(hubs::all_columns)
                .get_result::<Hub>(conn)?;

            Ok(status::Created::new(format!("/api/hubs/{}", hub.public_id))
                .body(Json(HubSerializer::from_db_ty(&hub))))
        })
    })
    .await
}

//! Audit log of outbound email.

use db::{email::EmailRow, schema::emails, DbConn};
use diesel::prelude::*;
use rocket::serde::json::Json;

use crate::{
    api::{ApiError, ApiResult},
    permissions::StaffUser,
};

#[get("/api/admin/emails")]
pub async fn admin_list_emails(
    _staff: StaffUser,
    db: DbConn,
) -> ApiResult<Json<Vec<EmailRow>>> {
    db.run(|conn| {
        let sent = emails::table
            .order_by(emails::created_at.desc())
            .load::<EmailRow>(conn)
            .map_err(ApiError::from)?;

        Ok(Json(sent))
    })
    .await
}

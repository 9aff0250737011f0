use db::user::{PublicUser, User};
use rocket::serde::json::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub user: Option<PublicUser>,
    pub is_authenticated: bool,
}

/// Strict identity endpoint: anonymous callers get a 401.
#[get("/api/user")]
pub async fn current_user(user: User) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        user: Some(user.to_public()),
        is_authenticated: true,
    })
}

/// Lenient identity endpoint: always answers 200, so the web client can
/// poll it without special-casing guests.
#[get("/api/me")]
pub async fn me(user: Option<User>) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        is_authenticated: user.is_some(),
        user: user.map(|user| user.to_public()),
    })
}

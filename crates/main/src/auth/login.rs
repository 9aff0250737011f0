use argon2::{Argon2, PasswordHash, PasswordVerifier};
use db::{
    schema::users,
    token,
    user::{set_login_cookie, set_token_cookie, PublicUser, User},
    DbConn,
};
use diesel::prelude::*;
use rocket::{http::CookieJar, serde::json::Json};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email address.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

/// Interactive login. On success this sets both a server-side session
/// and a freshly issued bearer token, so browser and API callers are
/// both covered.
#[post("/api/auth/login", data = "<form>")]
pub async fn do_login(
    form: Json<LoginRequest>,
    jar: &CookieJar<'_>,
    db: DbConn,
) -> ApiResult<Json<AuthResponse>> {
    let LoginRequest { username, password } = form.into_inner();

    let user = db
        .run(move |conn| {
            users::table
                .filter(
                    users::username
                        .eq(&username)
                        .or(users::email.eq(Some(username.as_str()))),
                )
                .first::<User>(conn)
                .optional()
                .map_err(ApiError::from)
        })
        .await?;

    let user = user.ok_or(ApiError::Unauthorized)?;

    let hash = user.password_hash.as_deref().ok_or(ApiError::Unauthorized)?;
    let parsed_hash = PasswordHash::new(hash).map_err(|_| {
        tracing::error!("corrupt password hash for user {}", user.public_id);
        ApiError::Internal
    })?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(ApiError::Unauthorized);
    }

    set_login_cookie(user.id, jar);
    let token = token::issue_token(&user).map_err(|_| ApiError::Internal)?;
    set_token_cookie(&token, jar);

    Ok(Json(AuthResponse {
        user: user.to_public(),
        token,
    }))
}

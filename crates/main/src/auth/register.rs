use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use chrono::Utc;
use db::{
    schema::users,
    token,
    user::{set_login_cookie, set_token_cookie, Role, User},
    DbConn,
};
use diesel::{
    dsl::{exists, select},
    insert_into,
    prelude::*,
};
use rand::rngs::OsRng;
use rocket::{http::CookieJar, response::status, serde::json::Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{ApiError, ApiResult},
    auth::login::AuthResponse,
};

#[derive(Debug, Deserialize)]
pub struct RegisterAccountRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[post("/api/auth/register", data = "<form>")]
pub async fn do_register(
    form: Json<RegisterAccountRequest>,
    jar: &CookieJar<'_>,
    db: DbConn,
) -> ApiResult<status::Created<Json<AuthResponse>>> {
    let form = form.into_inner();

    if !User::validate_username(&form.username) {
        return Err(ApiError::Validation(
            "usernames must be at least three characters of letters, \
             digits, '_' or '-'"
                .to_string(),
        ));
    }

    if !User::validate_email(&form.email) {
        return Err(ApiError::Validation(
            "that email address is not valid".to_string(),
        ));
    }

    if form.password.chars().count() < 8 {
        return Err(ApiError::Validation(
            "passwords must be at least eight characters".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(form.password.as_bytes(), &salt)
        .map_err(|_| ApiError::Internal)?
        .to_string();

    let user = db
        .run(move |conn| {
            conn.transaction::<_, ApiError, _>(|conn| {
                let username_taken = select(exists(
                    users::table.filter(User::with_username(&form.username)),
                ))
                .get_result::<bool>(conn)?;

                if username_taken {
                    return Err(ApiError::Conflict(
                        "that username is taken".to_string(),
                    ));
                }

                let email_taken = select(exists(users::table.filter(
                    users::email.eq(Some(form.email.as_str())),
                )))
                .get_result::<bool>(conn)?;

                if email_taken {
                    return Err(ApiError::Conflict(
                        "an account with that email already exists"
                            .to_string(),
                    ));
                }

                let user = insert_into(users::table)
                    .values((
                        users::public_id.eq(Uuid::now_v7().to_string()),
                        users::username.eq(&form.username),
                        users::email.eq(Some(form.email.as_str())),
                        users::password_hash.eq(Some(&password_hash)),
                        users::role.eq(Role::Member.as_str()),
                        users::created_at.eq(Utc::now().naive_utc()),
                    ))
                    .returning(users::all_columns)
                    .get_result::<User>(conn)?;

                Ok(user)
            })
        })
        .await?;

    set_login_cookie(user.id, jar);
    let token = token::issue_token(&user).map_err(|_| ApiError::Internal)?;
    set_token_cookie(&token, jar);

    Ok(status::Created::new(format!("/api/users/{}", user.public_id))
        .body(Json(AuthResponse {
            user: user.to_public(),
            token,
        })))
}

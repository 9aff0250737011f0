//! The Google OAuth handshake.
//!
//! The callback resolves an account in three steps: by the OAuth
//! subject, then by verified email (linking the subject to an account
//! created by other means), and finally by creating a fresh member
//! account with a username derived from the email local part.

use chrono::Utc;
use db::{
    schema::users,
    token,
    user::{set_login_cookie, set_token_cookie, Role, User},
    DbConn, TracedConn,
};
use diesel::{
    dsl::{exists, select},
    prelude::*,
};
use rocket::{http::CookieJar, response::Redirect};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{ApiError, ApiResult},
    util::short_random,
};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str =
    "https://openidconnect.googleapis.com/v1/userinfo";

const EXCHANGE_TIMEOUT_SECS: u64 = 10;

struct GoogleConfig {
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl GoogleConfig {
    fn from_env() -> Option<GoogleConfig> {
        Some(GoogleConfig {
            client_id: std::env::var("GOOGLE_CLIENT_ID").ok()?,
            client_secret: std::env::var("GOOGLE_CLIENT_SECRET").ok()?,
            redirect_url: std::env::var("GOOGLE_REDIRECT_URL").ok()?,
        })
    }
}

#[get("/auth/google")]
pub async fn google_login() -> ApiResult<Redirect> {
    let config = GoogleConfig::from_env().ok_or_else(|| {
        tracing::warn!("Google OAuth is not configured");
        ApiError::NotFound
    })?;

    let mut url = url::Url::parse(AUTH_URL).unwrap();
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_url)
        .append_pair("response_type", "code")
        .append_pair("scope", "openid email profile");

    Ok(Redirect::to(url.to_string()))
}

#[derive(Debug, Deserialize)]
struct ExchangedToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    sub: String,
    email: Option<String>,
}

fn oauth_failure(error: reqwest::Error) -> ApiError {
    tracing::warn!("Google OAuth exchange failed: {error}");
    ApiError::Internal
}

#[get("/auth/google/callback?<code>&<error>")]
pub async fn google_callback(
    code: Option<String>,
    error: Option<String>,
    jar: &CookieJar<'_>,
    db: DbConn,
) -> ApiResult<Redirect> {
    if let Some(error) = error {
        tracing::warn!("Google OAuth was denied: {error}");
        return Ok(Redirect::to("/"));
    }

    let code = code.ok_or_else(|| {
        ApiError::Validation("missing authorization code".to_string())
    })?;

    let config = GoogleConfig::from_env().ok_or_else(|| {
        tracing::warn!("Google OAuth is not configured");
        ApiError::NotFound
    })?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(EXCHANGE_TIMEOUT_SECS))
        .build()
        .map_err(oauth_failure)?;

    let exchanged: ExchangedToken = client
        .post(TOKEN_URL)
        .form(&[
            ("code", code.as_str()),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(oauth_failure)?
        .json()
        .await
        .map_err(oauth_failure)?;

    let profile: GoogleProfile = client
        .get(USERINFO_URL)
        .bearer_auth(&exchanged.access_token)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(oauth_failure)?
        .json()
        .await
        .map_err(oauth_failure)?;

    let user = db
        .run(move |conn| {
            conn.transaction::<_, ApiError, _>(|conn| {
                resolve_google_user(conn, &profile)
            })
        })
        .await?;

    set_login_cookie(user.id, jar);
    let token = token::issue_token(&user).map_err(|_| ApiError::Internal)?;
    set_token_cookie(&token, jar);

    Ok(Redirect::to("/"))
}

fn resolve_google_user(
    conn: &mut TracedConn,
    profile: &GoogleProfile,
) -> Result<User, ApiError> {
    if let Some(user) = users::table
        .filter(User::with_google_id(&profile.sub))
        .first::<User>(conn)
        .optional()?
    {
        return Ok(user);
    }

    if let Some(email) = &profile.email {
        if let Some(mut user) = users::table
            .filter(users::email.eq(Some(email.as_str())))
            .first::<User>(conn)
            .optional()?
        {
            // first Google sign-in for an account created by other
            // means: attach the subject to it
            let n = diesel::update(
                users::table.filter(users::id.eq(user.id)),
            )
            .set(users::google_id.eq(Some(profile.sub.as_str())))
            .execute(conn)?;
            assert_eq!(n, 1);

            user.google_id = Some(profile.sub.clone());
            return Ok(user);
        }
    }

    let base: String = profile
        .email
        .as_deref()
        .and_then(|email| email.split('@').next())
        .unwrap_or("member")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    let mut username = if User::validate_username(&base) {
        base.clone()
    } else {
        format!("member-{}", short_random(6))
    };

    while select(exists(
        users::table.filter(User::with_username(&username)),
    ))
    .get_result::<bool>(conn)?
    {
        username = format!("{}-{}", base, short_random(4));
    }

    let user = diesel::insert_into(users::table)
        .values((
            users::public_id.eq(Uuid::now_v7().to_string()),
            users::username.eq(&username),
            users::email.eq(&profile.email),
            users::google_id.eq(Some(profile.sub.as_str())),
            users::role.eq(Role::Member.as_str()),
            users::created_at.eq(Utc::now().naive_utc()),
        ))
        .returning(users::all_columns)
        .get_result::<User>(conn)?;

    Ok(user)
}

use chrono::NaiveDateTime;
use diesel::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use rocket::{
    http::{Cookie, CookieJar, Status},
    outcome::try_outcome,
    request::{self, FromRequest},
    Request,
};
use serde::{Deserialize, Serialize};

use crate::{schema, token, DbConn};

pub const LOGIN_COOKIE: &str = "clubhouse";
pub const TOKEN_COOKIE: &str = "buildclub_token";

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub public_id: String,
    pub username: String,
    pub email: Option<String>,
    pub google_id: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    // one of "admin", "ambassador", "member"
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Ambassador,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Ambassador => "ambassador",
            Role::Member => "member",
        }
    }

    /// Unknown role strings demote to `Member` rather than erroring, so
    /// a bad row can never grant elevated access.
    pub fn parse(role: &str) -> Role {
        match role {
            "admin" => Role::Admin,
            "ambassador" => Role::Ambassador,
            _ => Role::Member,
        }
    }
}

/// The shape of a user record handed to API clients.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
}

type WithUsername<'a> =
    diesel::dsl::Eq<crate::schema::users::username, &'a str>;

type WithGoogleId<'a> =
    diesel::dsl::Eq<crate::schema::users::google_id, Option<&'a str>>;

impl User {
    pub fn with_username(name: &str) -> WithUsername {
        crate::schema::users::username.eq(name)
    }

    pub fn with_google_id(subject: &str) -> WithGoogleId {
        crate::schema::users::google_id.eq(Some(subject))
    }

    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.public_id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }

    pub fn validate_email(string: &str) -> bool {
        static RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?m)^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
            )
            .unwrap()
        });
        RE.is_match(string)
    }

    pub fn validate_username(name: &str) -> bool {
        name.chars().count() >= 3
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

#[derive(Debug)]
pub enum AuthError {
    NoCredentials,
    NoDatabase,
}

#[derive(Serialize, Deserialize)]
pub struct LoginSession {
    id: i64,
}

fn bearer_token(request: &Request<'_>) -> Option<String> {
    request
        .headers()
        .get("Authorization")
        .filter_map(|value| {
            let parts: Vec<_> = value.split(' ').collect();
            if parts.len() == 2 && parts[0] == "Bearer" {
                Some(parts[1].to_string())
            } else {
                None
            }
        })
        .next()
        .or_else(|| {
            request
                .cookies()
                .get(TOKEN_COOKIE)
                .map(|cookie| cookie.value().to_string())
        })
}

/// Resolves the identity behind a request.
///
/// A server-side session (set at interactive login) takes precedence; a
/// signed bearer token, from the `Authorization` header or the token
/// cookie, is the fallback for stateless clients. A token only names an
/// id: the user record is always re-fetched, so role changes made after
/// issuance take effect immediately. Every failure mode resolves to
/// anonymous (`Option<User>` yields `None`) rather than aborting the
/// request.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = AuthError;

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, AuthError> {
        let db = try_outcome!(request
            .guard::<DbConn>()
            .await
            .map_error(|(t, _)| (t, AuthError::NoDatabase)));

        if let Some(cookie) = request.cookies().get_private(LOGIN_COOKIE) {
            match serde_json::from_str::<LoginSession>(cookie.value()) {
                Ok(session) => {
                    let user = db
                        .run(move |conn| {
                            schema::users::table
                                .filter(schema::users::id.eq(session.id))
                                .first::<User>(conn)
                                .optional()
                        })
                        .await;

                    match user {
                        Ok(Some(user)) => {
                            return request::Outcome::Success(user);
                        }
                        Ok(None) => {
                            // the account behind this session is gone
                            request.cookies().remove_private(LOGIN_COOKIE);
                        }
                        Err(_) => {
                            return request::Outcome::Error((
                                Status::InternalServerError,
                                AuthError::NoDatabase,
                            ));
                        }
                    }
                }
                Err(_) => {
                    // a malformed cookie would otherwise persist and
                    // lock the user out
                    request.cookies().remove_private(LOGIN_COOKIE);
                }
            }
        }

        if let Some(token) = bearer_token(request) {
            if let Ok(claims) = token::verify_token(&token) {
                let user = db
                    .run(move |conn| {
                        schema::users::table
                            .filter(schema::users::id.eq(claims.sub))
                            .first::<User>(conn)
                            .optional()
                    })
                    .await;

                match user {
                    Ok(Some(user)) => {
                        return request::Outcome::Success(user);
                    }
                    Ok(None) => {}
                    Err(_) => {
                        return request::Outcome::Error((
                            Status::InternalServerError,
                            AuthError::NoDatabase,
                        ));
                    }
                }
            }
        }

        request::Outcome::Error((
            Status::Unauthorized,
            AuthError::NoCredentials,
        ))
    }
}

pub fn set_login_cookie(id: i64, jar: &CookieJar) {
    jar.add_private(Cookie::new(
        LOGIN_COOKIE,
        serde_json::to_string(&LoginSession { id }).unwrap(),
    ));
}

pub fn set_token_cookie(token: &str, jar: &CookieJar) {
    jar.add(Cookie::new(TOKEN_COOKIE, token.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_forgiving() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("ambassador"), Role::Ambassador);
        assert_eq!(Role::parse("member"), Role::Member);
        assert_eq!(Role::parse("superuser"), Role::Member);
    }

    #[test]
    fn email_validation() {
        assert!(User::validate_email("ana@example.com"));
        assert!(!User::validate_email("not-an-email"));
    }

    #[test]
    fn username_validation() {
        assert!(User::validate_username("ana_lee"));
        assert!(!User::validate_username("x"));
        assert!(!User::validate_username("no spaces"));
    }
}

use db::user::{LOGIN_COOKIE, TOKEN_COOKIE};
use rocket::http::{CookieJar, Status};

#[post("/api/auth/logout")]
pub async fn do_logout(jar: &CookieJar<'_>) -> Status {
    jar.remove_private(LOGIN_COOKIE);
    jar.remove(TOKEN_COOKIE);
    Status::NoContent
}

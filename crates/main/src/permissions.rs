//! Role gates for the admin surface.
//!
//! Both gates resolve the caller through the usual identity resolution
//! (session first, then signed token) and then compare the resolved
//! role. An unresolved caller fails with 401; a resolved caller with an
//! insufficient role fails with 403.

use db::user::{Role, User};
use rocket::{
    http::Status,
    outcome::try_outcome,
    request::{self, FromRequest},
    Request,
};

/// Admin-only gate.
pub struct AdminUser(pub User);

/// Admin-or-ambassador gate.
pub struct StaffUser(pub User);

pub fn is_staff(user: &User) -> bool {
    matches!(user.role(), Role::Admin | Role::Ambassador)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = ();

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, ()> {
        let user = try_outcome!(request
            .guard::<User>()
            .await
            .map_error(|(status, _)| (status, ())));

        if user.role() == Role::Admin {
            request::Outcome::Success(AdminUser(user))
        } else {
            request::Outcome::Error((Status::Forbidden, ()))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StaffUser {
    type Error = ();

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, ()> {
        let user = try_outcome!(request
            .guard::<User>()
            .await
            .map_error(|(status, _)| (status, ())));

        if is_staff(&user) {
            request::Outcome::Success(StaffUser(user))
        } else {
            request::Outcome::Error((Status::Forbidden, ()))
        }
    }
}

//! JSON error responses for the API surface.

use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing input; nothing was persisted.
    Validation(String),
    /// The request would violate a uniqueness guarantee; the existing
    /// record is left untouched.
    Conflict(String),
    Unauthorized,
    Forbidden,
    NotFound,
    /// Unexpected storage failure. The cause is logged server-side and
    /// never shown to the caller.
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Unauthorized => Status::Unauthorized,
            ApiError::Forbidden => Status::Forbidden,
            ApiError::NotFound => Status::NotFound,
            ApiError::Internal => Status::InternalServerError,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Validation(msg) | ApiError::Conflict(msg) => {
                msg.clone()
            }
            ApiError::Unauthorized => "authentication required".to_string(),
            ApiError::Forbidden => {
                "you do not have permission to do that".to_string()
            }
            ApiError::NotFound => "no such resource".to_string(),
            ApiError::Internal => "internal server error".to_string(),
        }
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(error: diesel::result::Error) -> ApiError {
        use diesel::result::{DatabaseErrorKind, Error};

        match error {
            Error::NotFound => ApiError::NotFound,
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ApiError::Conflict("that record already exists".to_string())
            }
            error => {
                tracing::error!("database error: {error}");
                ApiError::Internal
            }
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(
        self,
        request: &'r Request<'_>,
    ) -> response::Result<'static> {
        let status = self.status();
        let mut response = Json(ErrorBody {
            error: self.message(),
        })
        .respond_to(request)?;
        response.set_status(status);
        Ok(response)
    }
}

#[catch(400)]
pub fn bad_request() -> ApiError {
    ApiError::Validation("malformed request".to_string())
}

// Rocket answers 422 when a JSON body fails to deserialize; the API
// contract calls that a plain validation failure.
#[catch(422)]
pub fn unprocessable() -> ApiError {
    ApiError::Validation("malformed request body".to_string())
}

#[catch(401)]
pub fn unauthorized() -> ApiError {
    ApiError::Unauthorized
}

#[catch(403)]
pub fn forbidden() -> ApiError {
    ApiError::Forbidden
}

#[catch(404)]
pub fn not_found() -> ApiError {
    ApiError::NotFound
}

#[catch(500)]
pub fn internal_error() -> ApiError {
    ApiError::Internal
}

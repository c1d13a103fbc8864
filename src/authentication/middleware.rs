use std::convert::Infallible;

use warp::{http::StatusCode, reject::Rejection, reply::Reply, Filter};

use crate::constants::SESSION_COOKIE;
use crate::error::ApiError;

use super::jwt::{verify_jwt_session, SessionData};

/// Requires a valid session cookie without extracting it.
pub fn with_auth() -> impl Filter<Extract = ((),), Error = Rejection> + Copy {
    warp::cookie::<String>(SESSION_COOKIE).and_then(|session: String| async move {
        match verify_jwt_session(session) {
            Ok(_) => Ok(()),
            Err(e) => Err(warp::reject::custom(e)),
        }
    })
}

pub fn with_session() -> impl Filter<Extract = (SessionData,), Error = Rejection> + Copy {
    warp::cookie::<String>(SESSION_COOKIE).and_then(|session: String| async move {
        match verify_jwt_session(session) {
            Ok(data) => Ok(SessionData::from(data)),
            Err(e) => Err(warp::reject::custom(e)),
        }
    })
}

/// A missing or invalid cookie extracts `None` instead of rejecting, so
/// anonymous read requests pass through.
pub fn with_possible_session(
) -> impl Filter<Extract = (Option<SessionData>,), Error = Infallible> + Copy {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(|session: Option<String>| {
        session.and_then(|session| verify_jwt_session(session).ok().map(SessionData::from))
    })
}

/// Renders `ApiError` rejections as the uniform JSON error body; anything
/// else stays a rejection for warp's default handling.
pub async fn recover_api_error(rejection: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(error) = rejection.find::<ApiError>() {
        let code =
            StatusCode::from_u16(error.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Ok(warp::reply::with_status(
            warp::reply::json(&error.body()),
            code,
        ));
    }

    Err(rejection)
}

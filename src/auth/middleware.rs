//! Authentication middleware that validates session cookies and refreshes them.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use crate::{AppState, Error};

use super::{
    AuthEvent, AuthEvents,
    cookie::{get_session, invalidate_auth_cookie, set_auth_cookie},
};

/// The state needed for sessions and the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    /// The database connection for reading and creating profiles.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which session cookies are valid.
    pub cookie_duration: Duration,
    /// The bcrypt cost for hashing new passwords.
    pub password_cost: u32,
    /// Where sign in, sign out and expiry events are published.
    pub auth_events: AuthEvents,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            password_cost: state.password_cost,
            auth_events: state.auth_events.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid session cookie.
///
/// The user ID is placed into the request extensions and the request executed
/// normally if the session is valid, and the session is then extended by
/// [AuthState::cookie_duration]. Otherwise a 401 response is returned, and if
/// the session had expired a [AuthEvent::SessionExpired] event is published.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserId>` to receive the user ID.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());

    let session = match get_session(&jar) {
        Ok(session) => session,
        Err(error) => {
            tracing::debug!("rejecting request to {} without a session", parts.uri);
            return error.into_response();
        }
    };

    if session.is_expired(OffsetDateTime::now_utc()) {
        tracing::info!("session for user {} has expired", session.user_id);
        state
            .auth_events
            .publish(AuthEvent::SessionExpired(session.user_id));

        return (invalidate_auth_cookie(jar), Error::SessionExpired).into_response();
    }

    parts.extensions.insert(session.user_id);
    let response = next.run(Request::from_parts(parts, body)).await;

    let jar = match set_auth_cookie(jar, session.user_id, state.cookie_duration) {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("could not extend the session cookie: {error}");
            return response;
        }
    };

    let (mut parts, body) = response.into_parts();
    for value in jar.into_response().headers().get_all(SET_COOKIE) {
        parts.headers.append(SET_COOKIE, value.to_owned());
    }

    Response::from_parts(parts, body)
}

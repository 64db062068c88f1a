//! Handlers for starting and ending a session.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use crate::{Alert, Error};

use super::{
    AuthEvent, AuthState,
    cookie::{get_session, invalidate_auth_cookie, set_auth_cookie},
    user::{ProfileView, get_user_by_email},
};

/// The credentials for logging in.
#[derive(Debug, Deserialize)]
pub struct LogInForm {
    /// The email the user registered with.
    pub email: String,
    /// The user's password.
    pub password: String,
}

/// A route handler that checks the user's credentials and starts a session.
///
/// Responds with the user's profile and the session cookies on success.
pub async fn post_log_in(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Json(form): Json<LogInForm>,
) -> Response {
    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match get_user_by_email(form.email.trim(), &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Error::InvalidCredentials.into_response(),
            Err(error) => return error.into_response(),
        }
    };

    match user.password_hash.verify(&form.password) {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!("failed log in attempt for user {}", user.id);
            return Error::InvalidCredentials.into_response();
        }
        Err(error) => return Error::HashingError(error.to_string()).into_response(),
    }

    let jar = match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(jar) => jar,
        Err(error) => return Error::InvalidDateFormat(error.to_string()).into_response(),
    };

    state.auth_events.publish(AuthEvent::SignedIn(user.id));

    (jar, Json(ProfileView::from(&user))).into_response()
}

/// A route handler that ends the current session.
///
/// Always succeeds, even if there was no session.
pub async fn post_log_out(State(state): State<AuthState>, jar: PrivateCookieJar) -> Response {
    if let Ok(session) = get_session(&jar) {
        state
            .auth_events
            .publish(AuthEvent::SignedOut(session.user_id));
    }

    (
        invalidate_auth_cookie(jar),
        Alert::success("Logged out", "See you next time."),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
    use axum_extra::extract::PrivateCookieJar;

    use crate::{
        AuthEvent, PasswordHash,
        auth::{
            cookie::{get_session, set_auth_cookie},
            create_user,
            user::ProfileView,
        },
        test_utils::{parse_json_body, test_auth_state},
    };

    use super::{LogInForm, post_log_in, post_log_out};

    const PASSWORD: &str = "correct horse battery staple";

    fn state_with_user() -> crate::auth::AuthState {
        let state = test_auth_state();
        let hash = PasswordHash::from_raw_password(PASSWORD, 4).unwrap();
        create_user(
            "ana@example.com",
            &hash,
            None,
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
        state
    }

    #[tokio::test]
    async fn logs_in_with_valid_credentials() {
        let state = state_with_user();
        let mut events = state.auth_events.subscribe();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(
            State(state),
            jar,
            Json(LogInForm {
                email: "ana@example.com".to_owned(),
                password: PASSWORD.to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("set-cookie"));
        let profile: ProfileView = parse_json_body(response).await;
        assert_eq!(profile.email, "ana@example.com");
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn(profile.id));
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let state = state_with_user();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(
            State(state),
            jar,
            Json(LogInForm {
                email: "ana@example.com".to_owned(),
                password: "wrong".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_unknown_email() {
        let state = state_with_user();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(
            State(state),
            jar,
            Json(LogInForm {
                email: "bruno@example.com".to_owned(),
                password: PASSWORD.to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn log_out_publishes_event_and_clears_cookie() {
        let state = test_auth_state();
        let mut events = state.auth_events.subscribe();
        let user_id = crate::UserId::new(7);
        let jar = set_auth_cookie(
            PrivateCookieJar::new(state.cookie_key.clone()),
            user_id,
            state.cookie_duration,
        )
        .unwrap();
        assert!(get_session(&jar).is_ok());

        let response = post_log_out(State(state), jar).await.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("set-cookie"));
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut(user_id));
    }
}

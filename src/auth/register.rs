//! Handler for creating a new profile.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use crate::{Error, PasswordHash, phone::validate_phone};

use super::{
    AuthEvent, AuthState,
    cookie::set_auth_cookie,
    user::{ProfileView, create_user},
};

/// The details for a new profile.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    /// The email the user will log in with.
    pub email: String,
    /// The password, checked for strength before hashing.
    pub password: String,
    /// An optional phone number in any common format.
    #[serde(default)]
    pub phone: Option<String>,
}

/// A route handler for registering a new user, which also starts a session.
pub async fn register_user(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Json(form): Json<RegisterForm>,
) -> Response {
    let email = form.email.trim();
    if !is_plausible_email(email) {
        return Error::InvalidEmail(email.to_owned()).into_response();
    }

    let phone = match form.phone.as_deref().map(str::trim) {
        Some(phone) if !phone.is_empty() => match validate_phone(phone) {
            Ok(phone) => Some(phone),
            Err(error) => return error.into_response(),
        },
        _ => None,
    };

    let password_hash = match PasswordHash::from_raw_password(&form.password, state.password_cost)
    {
        Ok(password_hash) => password_hash,
        Err(error) => return error.into_response(),
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match create_user(email, &password_hash, phone.as_deref(), &connection) {
            Ok(user) => user,
            Err(error) => return error.into_response(),
        }
    };

    tracing::info!("registered user {}", user.id);

    let jar = match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(jar) => jar,
        Err(error) => return Error::InvalidDateFormat(error.to_string()).into_response(),
    };

    state.auth_events.publish(AuthEvent::SignedIn(user.id));

    (StatusCode::CREATED, jar, Json(ProfileView::from(&user))).into_response()
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use axum::{Json, extract::State, http::StatusCode};
    use axum_extra::extract::PrivateCookieJar;

    use crate::{
        Alert,
        auth::user::ProfileView,
        test_utils::{parse_json_body, test_auth_state},
    };

    use super::{RegisterForm, is_plausible_email, register_user};

    fn form(email: &str, password: &str, phone: Option<&str>) -> Json<RegisterForm> {
        Json(RegisterForm {
            email: email.to_owned(),
            password: password.to_owned(),
            phone: phone.map(str::to_owned),
        })
    }

    #[tokio::test]
    async fn registers_user_with_normalized_phone() {
        let state = test_auth_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = register_user(
            State(state),
            jar,
            form(
                "ana@example.com",
                "correct horse battery staple",
                Some("(11) 98765-4321"),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key("set-cookie"));
        let profile: ProfileView = parse_json_body(response).await;
        assert_eq!(profile.phone.as_deref(), Some("551187654321"));
    }

    #[tokio::test]
    async fn rejects_invalid_phone() {
        let state = test_auth_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = register_user(
            State(state),
            jar,
            form(
                "ana@example.com",
                "correct horse battery staple",
                Some("123"),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let alert: Alert = parse_json_body(response).await;
        assert_eq!(alert.details, "\"123\" is not a valid phone number");
    }

    #[tokio::test]
    async fn rejects_weak_password() {
        let state = test_auth_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = register_user(State(state), jar, form("ana@example.com", "1234", None)).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let state = test_auth_state();

        let first = register_user(
            State(state.clone()),
            PrivateCookieJar::new(state.cookie_key.clone()),
            form("ana@example.com", "correct horse battery staple", None),
        )
        .await;
        let second = register_user(
            State(state.clone()),
            PrivateCookieJar::new(state.cookie_key.clone()),
            form("ana@example.com", "another correct horse staple", None),
        )
        .await;

        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn email_check() {
        assert!(is_plausible_email("ana@example.com"));
        assert!(!is_plausible_email("ana"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("ana@localhost"));
    }
}

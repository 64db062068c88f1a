//! Sessions, profiles and the auth-state events other parts of the app observe.

mod cookie;
mod events;
mod log_in;
mod middleware;
mod password;
mod register;
mod user;

pub use cookie::{
    COOKIE_GRACE_PERIOD, DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie,
};
pub use events::{AuthEvent, AuthEvents, AuthStateObserver, CacheInvalidationObserver, spawn_observer};
pub use log_in::{post_log_in, post_log_out};
pub use middleware::{AuthState, auth_guard};
pub use password::{PasswordHash, ValidatedPassword};
pub use register::register_user;
pub use user::{User, UserId, create_user, create_user_table, get_user_by_email, get_user_by_id};

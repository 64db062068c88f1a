//! Defines functions for handling user sessions with private cookies.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{
    Duration, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::Error;

use super::UserId;

pub(crate) const COOKIE_USER_ID: &str = "user_id";
pub(crate) const COOKIE_EXPIRY: &str = "expiry";
/// The default duration for which session cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(30);
/// How long the browser keeps the session cookies after the session itself expires.
///
/// Within this window the auth guard still receives the cookies and can report
/// the session as expired rather than missing.
pub const COOKIE_GRACE_PERIOD: Duration = Duration::hours(12);

/// Date time format for the cookie expiry, e.g. "2021-01-01 00:00:00.000000 +00:00:00".
const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
         sign:mandatory]:[offset_minute]:[offset_second]"
);

/// The user and expiry stored in the session cookies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Session {
    pub user_id: UserId,
    pub expires_at: OffsetDateTime,
}

impl Session {
    pub(crate) fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

fn session_cookie(name: &'static str, value: String, expiry: OffsetDateTime) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .expires(expiry)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build()
}

/// Add the session cookies to `jar`, logging in `user_id` until `duration` from now.
///
/// The cookies themselves expire [COOKIE_GRACE_PERIOD] after the session.
///
/// # Errors
///
/// Returns a [time::error::Format] if the expiry time cannot be formatted.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserId,
    duration: Duration,
) -> Result<PrivateCookieJar, time::error::Format> {
    let expiry = OffsetDateTime::now_utc() + duration;
    // Use format instead of to_string so the hour always has two digits.
    let expiry_string = expiry.format(DATE_TIME_FORMAT)?;

    let cookie_expiry = expiry + COOKIE_GRACE_PERIOD;

    Ok(jar
        .add(session_cookie(
            COOKIE_USER_ID,
            user_id.as_i64().to_string(),
            cookie_expiry,
        ))
        .add(session_cookie(COOKIE_EXPIRY, expiry_string, cookie_expiry)))
}

/// Overwrite the session cookies with values that expire immediately.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    let expired = |name: &'static str| {
        let mut cookie = session_cookie(name, "deleted".to_owned(), OffsetDateTime::UNIX_EPOCH);
        cookie.set_max_age(Duration::ZERO);
        cookie
    };

    jar.add(expired(COOKIE_USER_ID)).add(expired(COOKIE_EXPIRY))
}

/// Read the session from `jar`.
///
/// # Errors
///
/// Returns [Error::Unauthenticated] if either cookie is missing, could not be
/// decrypted or holds an invalid value.
pub(crate) fn get_session(jar: &PrivateCookieJar) -> Result<Session, Error> {
    let user_id = jar
        .get(COOKIE_USER_ID)
        .and_then(|cookie| cookie.value_trimmed().parse::<i64>().ok())
        .map(UserId::new)
        .ok_or(Error::Unauthenticated)?;

    let expires_at = jar
        .get(COOKIE_EXPIRY)
        .and_then(|cookie| OffsetDateTime::parse(cookie.value_trimmed(), DATE_TIME_FORMAT).ok())
        .ok_or(Error::Unauthenticated)?;

    Ok(Session {
        user_id,
        expires_at,
    })
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{Error, auth::UserId};

    use super::{
        COOKIE_EXPIRY, COOKIE_GRACE_PERIOD, COOKIE_USER_ID, get_session, invalidate_auth_cookie,
        set_auth_cookie,
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");
        let key = Key::from(&hash);

        PrivateCookieJar::new(key)
    }

    #[test]
    fn can_read_session_back() {
        let user_id = UserId::new(42);
        let jar = set_auth_cookie(get_jar(), user_id, Duration::minutes(5)).unwrap();

        let session = get_session(&jar).unwrap();

        assert_eq!(session.user_id, user_id);
        assert!(!session.is_expired(OffsetDateTime::now_utc()));
        assert!(session.is_expired(OffsetDateTime::now_utc() + Duration::minutes(6)));
    }

    #[test]
    fn cookies_outlive_the_session() {
        let jar = set_auth_cookie(get_jar(), UserId::new(1), Duration::minutes(5)).unwrap();

        let session = get_session(&jar).unwrap();

        for name in [COOKIE_USER_ID, COOKIE_EXPIRY] {
            let cookie_expiry = jar.get(name).unwrap().expires_datetime().unwrap();
            let difference = cookie_expiry - (session.expires_at + COOKIE_GRACE_PERIOD);
            assert!(
                difference.abs() < Duration::seconds(1),
                "{name} cookie expires at {cookie_expiry}, session at {}",
                session.expires_at
            );
        }
    }

    #[test]
    fn empty_jar_is_unauthenticated() {
        assert_eq!(get_session(&get_jar()), Err(Error::Unauthenticated));
    }

    #[test]
    fn invalidated_cookie_is_unauthenticated() {
        let jar = set_auth_cookie(get_jar(), UserId::new(1), Duration::minutes(5)).unwrap();

        let jar = invalidate_auth_cookie(jar);

        assert_eq!(jar.get(COOKIE_USER_ID).unwrap().value(), "deleted");
        assert_eq!(jar.get(COOKIE_EXPIRY).unwrap().value(), "deleted");
        assert_eq!(get_session(&jar), Err(Error::Unauthenticated));
    }

    #[test]
    fn negative_duration_gives_expired_session() {
        let jar = set_auth_cookie(get_jar(), UserId::new(1), Duration::minutes(-1)).unwrap();

        let session = get_session(&jar).unwrap();

        assert!(session.is_expired(OffsetDateTime::now_utc()));
    }
}

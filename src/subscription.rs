//! The subscription plan stored on each profile and whether it is still active.

use std::{
    fmt::Display,
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::{Connection, types::Type};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{AppState, Error, UserId, timezone::local_today};

/// The paid plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// A single user.
    Solo,
    /// A couple sharing one account.
    Casal,
}

impl Plan {
    /// The value stored in the `subscription_tier` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Solo => "solo",
            Plan::Casal => "casal",
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solo" => Ok(Plan::Solo),
            "casal" => Ok(Plan::Casal),
            other => Err(format!("unknown plan \"{other}\"")),
        }
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's plan and whether it is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    /// Whether the user has a plan that has not ended yet.
    pub subscribed: bool,
    /// The plan, if the user ever subscribed.
    pub subscription_tier: Option<Plan>,
    /// The last day the plan is valid.
    pub subscription_end: Option<Date>,
}

impl SubscriptionStatus {
    /// Build the status for `today`.
    ///
    /// A plan with no end date is treated as ended.
    pub fn new(tier: Option<Plan>, end: Option<Date>, today: Date) -> Self {
        let subscribed = tier.is_some() && end.is_some_and(|end| end >= today);

        Self {
            subscribed,
            subscription_tier: tier,
            subscription_end: end,
        }
    }
}

/// Read the subscription columns of `user_id`'s profile.
///
/// # Errors
/// Returns [Error::NotFound] if the profile does not exist.
pub fn check_subscription(
    user_id: UserId,
    today: Date,
    connection: &Connection,
) -> Result<SubscriptionStatus, Error> {
    let (tier, end): (Option<String>, Option<Date>) = connection.query_row(
        "SELECT subscription_tier, subscription_end FROM profiles WHERE id = ?1",
        (user_id.as_i64(),),
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let tier = tier
        .map(|tier| {
            tier.parse::<Plan>().map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, error.into())
            })
        })
        .transpose()?;

    Ok(SubscriptionStatus::new(tier, end, today))
}

/// Set or clear the plan on `user_id`'s profile.
///
/// Passing `None` for `plan` cancels the subscription.
///
/// # Errors
/// Returns [Error::NotFound] if the profile does not exist.
pub fn set_subscription(
    user_id: UserId,
    plan: Option<Plan>,
    end: Option<Date>,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE profiles SET subscription_tier = ?1, subscription_end = ?2 WHERE id = ?3",
        (plan.map(|plan| plan.as_str()), end, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Checks whether a user's plan is active.
#[derive(Debug, Clone)]
pub struct SubscriptionState {
    /// The database connection for reading profiles.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone that decides what "today" is.
    pub local_timezone: String,
}

impl FromRef<AppState> for SubscriptionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Return the logged in user's subscription status.
pub async fn get_subscription_endpoint(
    State(state): State<SubscriptionState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<SubscriptionStatus>, Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    check_subscription(user_id, today, &connection).map(Json)
}

//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    extract::FromRef,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};

use crate::{
    Alert, AppState,
    auth::{AuthState, auth_guard, post_log_in, post_log_out, register_user},
    budget::{
        delete_budget_endpoint, get_budget_usage_endpoint, get_budgets_endpoint,
        put_budget_endpoint,
    },
    card::{
        create_card_endpoint, delete_card_endpoint, get_cards_endpoint, get_orphan_cards_endpoint,
        register_orphan_cards_endpoint, update_card_endpoint,
    },
    endpoints,
    invoice::{
        get_invoice_candidates_endpoint, link_invoice_endpoint, reconcile_transaction_endpoint,
    },
    subscription::get_subscription_endpoint,
    summary::get_summary_endpoint,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, export_transactions_endpoint,
        get_transaction_endpoint, get_transactions_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Everything except registering, logging in and logging out requires a session.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, post(post_log_out));

    let protected_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::RECONCILE_TRANSACTION,
            post(reconcile_transaction_endpoint),
        )
        .route(
            endpoints::EXPORT_TRANSACTIONS,
            get(export_transactions_endpoint),
        )
        .route(
            endpoints::CARDS,
            get(get_cards_endpoint).post(create_card_endpoint),
        )
        .route(
            endpoints::CARD,
            put(update_card_endpoint).delete(delete_card_endpoint),
        )
        .route(
            endpoints::ORPHAN_CARDS,
            get(get_orphan_cards_endpoint).post(register_orphan_cards_endpoint),
        )
        .route(
            endpoints::INVOICE_CANDIDATES,
            get(get_invoice_candidates_endpoint),
        )
        .route(endpoints::LINK_INVOICE, post(link_invoice_endpoint))
        .route(
            endpoints::BUDGETS,
            get(get_budgets_endpoint).put(put_budget_endpoint),
        )
        .route(endpoints::BUDGET, delete(delete_budget_endpoint))
        .route(endpoints::BUDGET_USAGE, get(get_budget_usage_endpoint))
        .route(endpoints::SUMMARY, get(get_summary_endpoint))
        .route(endpoints::SUBSCRIPTION, get(get_subscription_endpoint))
        .route_layer(middleware::from_fn_with_state(
            AuthState::from_ref(&state),
            auth_guard,
        ));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Alert::error(
            "Not found",
            "The requested resource does not exist. Check the address and try again.",
        ),
    )
        .into_response()
}

//! Alipay return page and asynchronous notification endpoints.

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;
use std::collections::BTreeMap;

use crate::config::RedirectConfig;
use crate::handlers::pages::{render, MessagePage, RedirectPage};
use crate::models::PaymentKind;
use crate::services::{record_callback, record_error, CallbackOutcome};
use crate::startup::AppState;

const RETURN_CHANNEL: &str = "return";
const NOTIFY_CHANNEL: &str = "notify";

/// Synchronous return: the buyer's browser lands here after paying.
pub async fn return_page(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let result = state.processor.process(&params).await;
    track(RETURN_CHANNEL, &result);

    match result {
        Ok(outcome) => outcome_page(&outcome, &state.config.redirect),
        Err(e) => error_page(&e),
    }
}

/// Asynchronous notification: server-to-server, retried by the gateway
/// until it reads `success`.
pub async fn notify(
    State(state): State<AppState>,
    Form(params): Form<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let result = state.processor.process(&params).await;
    track(NOTIFY_CHANNEL, &result);

    match result {
        Ok(outcome) if outcome.acknowledged() => (StatusCode::OK, "success"),
        _ => (StatusCode::OK, "fail"),
    }
}

fn track(channel: &str, result: &Result<CallbackOutcome, AppError>) {
    match result {
        Ok(outcome) => record_callback(channel, outcome.label()),
        Err(e) => {
            record_callback(channel, "error");
            record_error(e.kind());
            if e.status_code().is_server_error() {
                tracing::error!(channel = channel, error = %e, "Callback processing failed");
            } else {
                tracing::warn!(channel = channel, error = %e, "Callback could not be fulfilled");
            }
        }
    }
}

fn outcome_page(outcome: &CallbackOutcome, redirect: &RedirectConfig) -> Response {
    match outcome {
        CallbackOutcome::SignatureRejected => render(
            StatusCode::BAD_REQUEST,
            &MessagePage {
                title: "Verification failed",
                message: "We could not verify this payment notification.",
                detail: None,
            },
        ),
        CallbackOutcome::StatusIgnored { trade_status } => render(
            StatusCode::OK,
            &MessagePage {
                title: "Payment not completed",
                message: "The payment has not been completed yet.",
                detail: Some(trade_status.as_str()),
            },
        ),
        CallbackOutcome::PayloadRejected { .. } => render(
            StatusCode::BAD_REQUEST,
            &MessagePage {
                title: "Invalid payment data",
                message: "The payment data returned by the gateway is invalid.",
                detail: None,
            },
        ),
        CallbackOutcome::AlreadyProcessed { kind } | CallbackOutcome::Fulfilled { kind, .. } => {
            let (message, url) = match kind {
                PaymentKind::Goods => ("Your order has been paid.", redirect.goods_url.as_str()),
                PaymentKind::Recharge => {
                    ("Your account has been recharged.", redirect.recharge_url.as_str())
                }
            };
            render(
                StatusCode::OK,
                &RedirectPage {
                    title: "Payment received",
                    message,
                    url,
                    delay_seconds: redirect.delay_seconds,
                },
            )
        }
    }
}

fn error_page(error: &AppError) -> Response {
    let message = error.public_message();
    render(
        error.status_code(),
        &MessagePage {
            title: "Payment could not be completed",
            message: &message,
            detail: None,
        },
    )
}

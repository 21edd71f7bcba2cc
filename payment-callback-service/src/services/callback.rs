//! Processing of a gateway return or notification.

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, Secret};
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::models::{
    FulfillmentResult, GoodsFulfillment, PaymentKind, PaymentRecord, Recharge, VoucherPair,
};
use crate::services::gateway::GatewayVerifier;
use crate::services::metrics::record_fulfillment;
use crate::services::payload::CallbackPayload;
use crate::services::store::FulfillmentStore;

const SUCCESS_STATUSES: [&str; 2] = ["TRADE_FINISHED", "TRADE_SUCCESS"];

/// Money columns are stored with two decimal places.
const MAX_FEE_SCALE: u32 = 2;

/// How a callback ended, when it did not end in an [`AppError`].
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    SignatureRejected,
    StatusIgnored { trade_status: String },
    PayloadRejected { reason: String },
    AlreadyProcessed { kind: PaymentKind },
    Fulfilled { kind: PaymentKind, record: PaymentRecord },
}

impl CallbackOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SignatureRejected => "signature_rejected",
            Self::StatusIgnored { .. } => "status_ignored",
            Self::PayloadRejected { .. } => "payload_rejected",
            Self::AlreadyProcessed { .. } => "already_processed",
            Self::Fulfilled { .. } => "fulfilled",
        }
    }

    /// Whether the gateway should stop re-sending this callback.
    pub fn acknowledged(&self) -> bool {
        matches!(
            self,
            Self::StatusIgnored { .. } | Self::AlreadyProcessed { .. } | Self::Fulfilled { .. }
        )
    }
}

#[derive(Clone)]
pub struct CallbackProcessor {
    store: Arc<dyn FulfillmentStore>,
    verifier: Arc<dyn GatewayVerifier>,
    checksum_key: Secret<String>,
}

impl CallbackProcessor {
    pub fn new(
        store: Arc<dyn FulfillmentStore>,
        verifier: Arc<dyn GatewayVerifier>,
        checksum_key: Secret<String>,
    ) -> Self {
        Self {
            store,
            verifier,
            checksum_key,
        }
    }

    #[instrument(
        skip(self, params),
        fields(
            out_trade_no = params.get("out_trade_no").map(String::as_str).unwrap_or_default(),
            trade_no = params.get("trade_no").map(String::as_str).unwrap_or_default()
        )
    )]
    pub async fn process(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<CallbackOutcome, AppError> {
        if !self.verifier.verify(params) {
            warn!("Gateway signature rejected");
            return Ok(CallbackOutcome::SignatureRejected);
        }

        let trade_status = param(params, "trade_status");
        if !SUCCESS_STATUSES.contains(&trade_status) {
            info!(trade_status = %trade_status, "Trade not in a success state; nothing to do");
            return Ok(CallbackOutcome::StatusIgnored {
                trade_status: trade_status.to_string(),
            });
        }

        let payload =
            match CallbackPayload::open(param(params, "body"), self.checksum_key.expose_secret()) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "Payment payload rejected");
                    return Ok(rejected(e.to_string()));
                }
            };

        let raw_fee = param(params, "total_fee");
        let total_fee = match Decimal::from_str(raw_fee.trim()) {
            Ok(fee) if !fee.is_sign_negative() && fee.normalize().scale() <= MAX_FEE_SCALE => fee,
            _ => {
                warn!(total_fee = %raw_fee, "Unusable total_fee");
                return Ok(rejected(format!("invalid total_fee '{}'", raw_fee)));
            }
        };

        let out_trade_no = param(params, "out_trade_no");
        let trade_no = param(params, "trade_no");
        if out_trade_no.is_empty() || trade_no.is_empty() {
            warn!("Callback is missing its voucher numbers");
            return Ok(rejected("missing out_trade_no or trade_no".to_string()));
        }
        let voucher = VoucherPair::new(out_trade_no, trade_no);

        if let Some(record) = self.store.find_payment_record(&voucher).await? {
            info!(payment_record_id = record.id, "Voucher pair already processed");
            return Ok(CallbackOutcome::AlreadyProcessed { kind: payload.kind });
        }

        let result = match payload.kind {
            PaymentKind::Goods => {
                let request = GoodsFulfillment {
                    voucher,
                    user_email: payload.user_email,
                    order_ids: payload.order_ids,
                    coupon: payload.coupon,
                    address_id: payload.address_id,
                    total_fee,
                };
                self.store.fulfill_goods(&request).await?
            }
            PaymentKind::Recharge => {
                let request = Recharge {
                    voucher,
                    user_email: payload.user_email,
                    amount: total_fee,
                };
                self.store.recharge(&request).await?
            }
        };

        match result {
            FulfillmentResult::Applied(record) => {
                record_fulfillment(payload.kind.as_str());
                info!(
                    kind = payload.kind.as_str(),
                    payment_record_id = record.id,
                    "Payment fulfilled"
                );
                Ok(CallbackOutcome::Fulfilled {
                    kind: payload.kind,
                    record,
                })
            }
            FulfillmentResult::Duplicate => {
                Ok(CallbackOutcome::AlreadyProcessed { kind: payload.kind })
            }
        }
    }
}

fn param<'a>(params: &'a BTreeMap<String, String>, name: &str) -> &'a str {
    params.get(name).map(String::as_str).unwrap_or_default()
}

fn rejected(reason: String) -> CallbackOutcome {
    CallbackOutcome::PayloadRejected { reason }
}

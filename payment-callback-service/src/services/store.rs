use async_trait::async_trait;
use service_core::error::AppError;

use crate::models::{FulfillmentResult, GoodsFulfillment, PaymentRecord, Recharge, VoucherPair};

/// Persistence seam for the payment return flow.
///
/// `fulfill_goods` and `recharge` are all-or-nothing: on any error no table
/// is left modified. Both record the voucher pair first and report
/// [`FulfillmentResult::Duplicate`] if it was already present.
#[async_trait]
pub trait FulfillmentStore: Send + Sync {
    async fn find_payment_record(
        &self,
        voucher: &VoucherPair,
    ) -> Result<Option<PaymentRecord>, AppError>;

    async fn fulfill_goods(&self, request: &GoodsFulfillment)
        -> Result<FulfillmentResult, AppError>;

    async fn recharge(&self, request: &Recharge) -> Result<FulfillmentResult, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

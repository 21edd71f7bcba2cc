//! Checks and arithmetic shared by every [`FulfillmentStore`](super::FulfillmentStore).

use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashSet;

use crate::models::{Coupon, GoodsFulfillment, Order, Product};

/// Validate the locked orders against the request.
///
/// Every requested id must be present exactly once, belong to the paying
/// user and still be unpaid.
pub fn check_orders(request: &GoodsFulfillment, orders: &[Order]) -> Result<(), AppError> {
    let requested: HashSet<i64> = request.order_ids.iter().copied().collect();
    if requested.len() != request.order_ids.len() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Duplicate order ids in payment payload"
        )));
    }

    for id in &request.order_ids {
        let order = orders
            .iter()
            .find(|o| o.id == *id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order {} not found", id)))?;

        if order.user_email != request.user_email {
            // Same message as a missing order so ids of other users stay hidden.
            return Err(AppError::NotFound(anyhow::anyhow!("Order {} not found", id)));
        }
        if order.is_paid {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Order {} is already paid",
                id
            )));
        }
    }

    Ok(())
}

/// `Σ(unit_price × quantity + freight) − coupon`, floored at zero.
pub fn goods_total(orders: &[Order], coupon: Option<&Coupon>) -> Decimal {
    let gross: Decimal = orders
        .iter()
        .map(|o| o.unit_price * Decimal::from(o.quantity) + o.freight)
        .sum();
    let discount = coupon.map(|c| c.amount).unwrap_or(Decimal::ZERO);
    (gross - discount).max(Decimal::ZERO)
}

/// The gateway must have collected exactly what the orders are worth.
pub fn check_amount(expected: Decimal, total_fee: Decimal) -> Result<(), AppError> {
    if expected.normalize() != total_fee.normalize() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Paid amount {} does not match order total {}",
            total_fee,
            expected
        )));
    }
    Ok(())
}

pub fn check_recharge_amount(amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Recharge amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

/// Loyalty points earned by buying `quantity` units of `product`.
pub fn integral_points(product: &Product, quantity: i32) -> i32 {
    product.integral.saturating_mul(quantity).max(0)
}

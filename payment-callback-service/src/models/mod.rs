//! Storefront records touched by the payment return flow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What a payment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Goods,
    Recharge,
}

impl PaymentKind {
    /// Parse the flag carried in the first payload field.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "1" => Some(Self::Goods),
            "2" => Some(Self::Recharge),
            _ => None,
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Self::Goods => "1",
            Self::Recharge => "2",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Goods => "goods",
            Self::Recharge => "recharge",
        }
    }
}

/// The (merchant order number, gateway transaction number) idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoucherPair {
    pub out_trade_no: String,
    pub trade_no: String,
}

impl VoucherPair {
    pub fn new(out_trade_no: impl Into<String>, trade_no: impl Into<String>) -> Self {
        Self {
            out_trade_no: out_trade_no.into(),
            trade_no: trade_no.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub email: String,
    pub money: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub market_price: Decimal,
    /// Loyalty points credited per unit sold.
    pub integral: i32,
    /// Per-variant stock, see [`crate::services::spec_stock`].
    pub spec: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_email: String,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub freight: Decimal,
    /// Variant name inside the product's specification string; empty for
    /// single-stock products.
    pub spec_ref: String,
    pub is_paid: bool,
    pub order_list_id: Option<i64>,
}

/// The entry a batch of paid orders is linked to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrderList {
    pub id: i64,
    pub user_email: String,
    pub address_id: i64,
    pub coupon_id: Option<i64>,
    pub coupon_amount: Decimal,
    pub total_amount: Decimal,
    pub out_trade_no: String,
    pub trade_no: String,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PaymentRecord {
    pub id: i64,
    pub out_trade_no: String,
    pub trade_no: String,
    pub kind: String,
    pub user_email: String,
    pub amount: Decimal,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct IntegralEntry {
    pub id: i64,
    pub user_email: String,
    pub product_id: i64,
    pub order_id: i64,
    pub points: i32,
    pub title: String,
    pub created_utc: DateTime<Utc>,
}

/// Coupon applied to a goods payment.
#[derive(Debug, Clone, PartialEq)]
pub struct Coupon {
    pub id: i64,
    pub amount: Decimal,
}

/// Everything needed to settle a goods payment.
#[derive(Debug, Clone)]
pub struct GoodsFulfillment {
    pub voucher: VoucherPair,
    pub user_email: String,
    pub order_ids: Vec<i64>,
    pub coupon: Option<Coupon>,
    pub address_id: i64,
    pub total_fee: Decimal,
}

/// Everything needed to settle an account recharge.
#[derive(Debug, Clone)]
pub struct Recharge {
    pub voucher: VoucherPair,
    pub user_email: String,
    pub amount: Decimal,
}

/// Result of an atomic fulfilment attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FulfillmentResult {
    Applied(PaymentRecord),
    /// Another request already recorded this voucher pair.
    Duplicate,
}

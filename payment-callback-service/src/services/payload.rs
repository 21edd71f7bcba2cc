//! The opaque payload echoed back by the gateway in the `body` parameter.
//!
//! Layout: `kind|order_ids|user_email|coupon_id|coupon_amount|address_id|checksum`
//! where `checksum` is the hex HMAC-SHA256 of the first six fields (joined by
//! `|`) under the payload key.

use rust_decimal::Decimal;
use service_core::utils::signature::{keyed_digest, verify_keyed_digest};
use std::str::FromStr;
use thiserror::Error;

use crate::models::{Coupon, PaymentKind};

const FIELD_COUNT: usize = 7;
const DELIMITER: char = '|';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("expected 7 payload fields, got {0}")]
    FieldCount(usize),

    #[error("invalid payload field '{field}': '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("goods payment carries no order ids")]
    MissingOrders,

    #[error("payload checksum mismatch")]
    ChecksumMismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallbackPayload {
    pub kind: PaymentKind,
    pub order_ids: Vec<i64>,
    pub user_email: String,
    pub coupon: Option<Coupon>,
    pub address_id: i64,
}

impl CallbackPayload {
    /// Parse `body` and check its trailing checksum under `key`.
    pub fn open(body: &str, key: &str) -> Result<Self, PayloadError> {
        let (signed, checksum) = body
            .rsplit_once(DELIMITER)
            .ok_or(PayloadError::FieldCount(1))?;

        let fields: Vec<&str> = signed.split(DELIMITER).collect();
        if fields.len() + 1 != FIELD_COUNT {
            return Err(PayloadError::FieldCount(fields.len() + 1));
        }

        // A digest failure only happens on an unusable key; treat it as a mismatch.
        if !verify_keyed_digest(key, signed, checksum).unwrap_or(false) {
            return Err(PayloadError::ChecksumMismatch);
        }

        Self::from_fields(&fields)
    }

    fn from_fields(fields: &[&str]) -> Result<Self, PayloadError> {
        let kind = PaymentKind::from_flag(fields[0].trim()).ok_or_else(|| invalid("kind", fields[0]))?;

        let order_ids = fields[1]
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<i64>().map_err(|_| invalid("order_ids", fields[1])))
            .collect::<Result<Vec<_>, _>>()?;

        let user_email = fields[2].trim();
        if user_email.is_empty() {
            return Err(invalid("user_email", fields[2]));
        }

        let coupon_id = match fields[3].trim() {
            "" | "0" => None,
            raw => Some(raw.parse::<i64>().map_err(|_| invalid("coupon_id", fields[3]))?),
        };
        let coupon_amount = match fields[4].trim() {
            "" => Decimal::ZERO,
            raw => Decimal::from_str(raw).map_err(|_| invalid("coupon_amount", fields[4]))?,
        };
        if coupon_amount.is_sign_negative() {
            return Err(invalid("coupon_amount", fields[4]));
        }
        let coupon = coupon_id.map(|id| Coupon {
            id,
            amount: coupon_amount,
        });

        let address_id = match fields[5].trim() {
            "" => 0,
            raw => raw.parse::<i64>().map_err(|_| invalid("address_id", fields[5]))?,
        };

        if kind == PaymentKind::Goods && order_ids.is_empty() {
            return Err(PayloadError::MissingOrders);
        }

        Ok(Self {
            kind,
            order_ids,
            user_email: user_email.to_string(),
            coupon,
            address_id,
        })
    }

    /// Encode this payload and append its checksum under `key`.
    pub fn seal(&self, key: &str) -> Result<String, anyhow::Error> {
        let order_ids = self
            .order_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let (coupon_id, coupon_amount) = match &self.coupon {
            Some(coupon) => (coupon.id.to_string(), coupon.amount.to_string()),
            None => (String::new(), "0".to_string()),
        };

        let signed = [
            self.kind.flag().to_string(),
            order_ids,
            self.user_email.clone(),
            coupon_id,
            coupon_amount,
            self.address_id.to_string(),
        ]
        .join("|");

        let checksum = keyed_digest(key, &signed)?;
        Ok(format!("{}{}{}", signed, DELIMITER, checksum))
    }
}

fn invalid(field: &'static str, value: &str) -> PayloadError {
    PayloadError::InvalidField {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const KEY: &str = "payload-key";

    fn goods() -> CallbackPayload {
        CallbackPayload {
            kind: PaymentKind::Goods,
            order_ids: vec![11, 12],
            user_email: "buyer@example.com".to_string(),
            coupon: Some(Coupon {
                id: 5,
                amount: dec!(10.00),
            }),
            address_id: 3,
        }
    }

    #[test]
    fn sealed_payload_opens() {
        let body = goods().seal(KEY).unwrap();
        assert!(body.starts_with("1|11,12|buyer@example.com|5|10.00|3|"));
        assert_eq!(CallbackPayload::open(&body, KEY).unwrap(), goods());
    }

    #[test]
    fn recharge_payload_has_no_orders_or_coupon() {
        let payload = CallbackPayload {
            kind: PaymentKind::Recharge,
            order_ids: vec![],
            user_email: "buyer@example.com".to_string(),
            coupon: None,
            address_id: 0,
        };
        let body = payload.seal(KEY).unwrap();
        assert_eq!(CallbackPayload::open(&body, KEY).unwrap(), payload);
    }

    #[test]
    fn any_tampered_field_fails_the_checksum() {
        let body = goods().seal(KEY).unwrap();
        let tampered = body.replacen("buyer@example.com", "thief@example.com", 1);
        assert_eq!(
            CallbackPayload::open(&tampered, KEY).unwrap_err(),
            PayloadError::ChecksumMismatch
        );

        let (signed, _) = body.rsplit_once('|').unwrap();
        let forged = format!("{}|{}", signed, "0".repeat(64));
        assert_eq!(
            CallbackPayload::open(&forged, KEY).unwrap_err(),
            PayloadError::ChecksumMismatch
        );

        assert_eq!(
            CallbackPayload::open(&body, "another-key").unwrap_err(),
            PayloadError::ChecksumMismatch
        );
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        assert_eq!(
            CallbackPayload::open("1|11|buyer@example.com", KEY).unwrap_err(),
            PayloadError::FieldCount(3)
        );
        assert_eq!(
            CallbackPayload::open("no-delimiters", KEY).unwrap_err(),
            PayloadError::FieldCount(1)
        );
    }

    #[test]
    fn goods_without_orders_is_rejected_after_checksum() {
        let signed = "1||buyer@example.com||0|3";
        let body = format!("{}|{}", signed, keyed_digest(KEY, signed).unwrap());
        assert_eq!(
            CallbackPayload::open(&body, KEY).unwrap_err(),
            PayloadError::MissingOrders
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let signed = "9|11|buyer@example.com||0|3";
        let body = format!("{}|{}", signed, keyed_digest(KEY, signed).unwrap());
        assert!(matches!(
            CallbackPayload::open(&body, KEY).unwrap_err(),
            PayloadError::InvalidField { field: "kind", .. }
        ));
    }
}

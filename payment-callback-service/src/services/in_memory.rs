use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{
    FulfillmentResult, GoodsFulfillment, IntegralEntry, Order, OrderList, PaymentKind,
    PaymentRecord, Product, Recharge, User, VoucherPair,
};
use crate::services::fulfillment::{
    check_amount, check_orders, check_recharge_amount, goods_total, integral_points,
};
use crate::services::spec_stock::decrement_spec;
use crate::services::store::FulfillmentStore;

/// Full contents of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub users: BTreeMap<String, User>,
    pub products: BTreeMap<i64, Product>,
    pub orders: BTreeMap<i64, Order>,
    pub order_lists: Vec<OrderList>,
    pub payment_records: Vec<PaymentRecord>,
    pub integral_entries: Vec<IntegralEntry>,
}

impl StoreSnapshot {
    fn claim_voucher(
        &mut self,
        voucher: &VoucherPair,
        kind: PaymentKind,
        user_email: &str,
        amount: rust_decimal::Decimal,
    ) -> Option<PaymentRecord> {
        if self.find_record(voucher).is_some() {
            return None;
        }
        let record = PaymentRecord {
            id: self.payment_records.len() as i64 + 1,
            out_trade_no: voucher.out_trade_no.clone(),
            trade_no: voucher.trade_no.clone(),
            kind: kind.as_str().to_string(),
            user_email: user_email.to_string(),
            amount,
            created_utc: Utc::now(),
        };
        self.payment_records.push(record.clone());
        Some(record)
    }

    fn find_record(&self, voucher: &VoucherPair) -> Option<&PaymentRecord> {
        self.payment_records.iter().find(|r| {
            r.out_trade_no == voucher.out_trade_no && r.trade_no == voucher.trade_no
        })
    }

    fn fulfill_goods(&mut self, request: &GoodsFulfillment) -> Result<FulfillmentResult, AppError> {
        let record = match self.claim_voucher(
            &request.voucher,
            PaymentKind::Goods,
            &request.user_email,
            request.total_fee,
        ) {
            Some(record) => record,
            None => return Ok(FulfillmentResult::Duplicate),
        };

        let orders: Vec<Order> = request
            .order_ids
            .iter()
            .filter_map(|id| self.orders.get(id).cloned())
            .collect();
        check_orders(request, &orders)?;

        let total = goods_total(&orders, request.coupon.as_ref());
        check_amount(total, request.total_fee)?;

        for order in &orders {
            let product = self.products.get_mut(&order.product_id).ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Product {} not found", order.product_id))
            })?;
            product.spec = decrement_spec(&product.spec, &order.spec_ref, order.quantity)?;

            let points = integral_points(product, order.quantity);
            if points > 0 {
                let entry = IntegralEntry {
                    id: self.integral_entries.len() as i64 + 1,
                    user_email: request.user_email.clone(),
                    product_id: product.id,
                    order_id: order.id,
                    points,
                    title: product.title.clone(),
                    created_utc: Utc::now(),
                };
                self.integral_entries.push(entry);
            }
        }

        let order_list_id = self.order_lists.len() as i64 + 1;
        self.order_lists.push(OrderList {
            id: order_list_id,
            user_email: request.user_email.clone(),
            address_id: request.address_id,
            coupon_id: request.coupon.as_ref().map(|c| c.id),
            coupon_amount: request
                .coupon
                .as_ref()
                .map(|c| c.amount)
                .unwrap_or_default(),
            total_amount: total,
            out_trade_no: request.voucher.out_trade_no.clone(),
            trade_no: request.voucher.trade_no.clone(),
            created_utc: Utc::now(),
        });

        for id in &request.order_ids {
            if let Some(order) = self.orders.get_mut(id) {
                order.is_paid = true;
                order.order_list_id = Some(order_list_id);
            }
        }

        Ok(FulfillmentResult::Applied(record))
    }

    fn recharge(&mut self, request: &Recharge) -> Result<FulfillmentResult, AppError> {
        check_recharge_amount(request.amount)?;

        let record = match self.claim_voucher(
            &request.voucher,
            PaymentKind::Recharge,
            &request.user_email,
            request.amount,
        ) {
            Some(record) => record,
            None => return Ok(FulfillmentResult::Duplicate),
        };

        let user = self.users.get_mut(&request.user_email).ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("User {} not found", request.user_email))
        })?;
        user.money += request.amount;

        Ok(FulfillmentResult::Applied(record))
    }
}

/// Store kept in process memory.
///
/// Each fulfilment runs against a copy of the current snapshot and replaces
/// it only when every step succeeded, which gives the same all-or-nothing
/// behaviour as the database transaction.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreSnapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.state.lock().await.users.insert(user.email.clone(), user);
    }

    pub async fn insert_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn insert_order(&self, order: Order) {
        self.state.lock().await.orders.insert(order.id, order);
    }

    pub async fn user(&self, email: &str) -> Option<User> {
        self.state.lock().await.users.get(email).cloned()
    }

    pub async fn product(&self, id: i64) -> Option<Product> {
        self.state.lock().await.products.get(&id).cloned()
    }

    pub async fn order(&self, id: i64) -> Option<Order> {
        self.state.lock().await.orders.get(&id).cloned()
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.lock().await.clone()
    }

    async fn apply<F>(&self, step: F) -> Result<FulfillmentResult, AppError>
    where
        F: FnOnce(&mut StoreSnapshot) -> Result<FulfillmentResult, AppError>,
    {
        let mut state = self.state.lock().await;
        let mut working = state.clone();
        let result = step(&mut working)?;
        *state = working;
        Ok(result)
    }
}

#[async_trait]
impl FulfillmentStore for InMemoryStore {
    async fn find_payment_record(
        &self,
        voucher: &VoucherPair,
    ) -> Result<Option<PaymentRecord>, AppError> {
        Ok(self.state.lock().await.find_record(voucher).cloned())
    }

    async fn fulfill_goods(
        &self,
        request: &GoodsFulfillment,
    ) -> Result<FulfillmentResult, AppError> {
        self.apply(|state| state.fulfill_goods(request)).await
    }

    async fn recharge(&self, request: &Recharge) -> Result<FulfillmentResult, AppError> {
        self.apply(|state| state.recharge(request)).await
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

//! PostgreSQL-backed fulfilment store.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::models::{
    FulfillmentResult, GoodsFulfillment, Order, PaymentKind, PaymentRecord, Product, Recharge,
    VoucherPair,
};
use crate::services::fulfillment::{
    check_amount, check_orders, check_recharge_amount, goods_total, integral_points,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::spec_stock::decrement_spec;
use crate::services::store::FulfillmentStore;

const PAYMENT_RECORD_COLUMNS: &str =
    "id, out_trade_no, trade_no, kind, user_email, amount, created_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "payment-callback-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })
    }

    /// Claim the voucher pair inside `tx`; `None` means it was already taken.
    async fn insert_payment_record(
        tx: &mut Transaction<'static, Postgres>,
        voucher: &VoucherPair,
        kind: PaymentKind,
        user_email: &str,
        amount: rust_decimal::Decimal,
    ) -> Result<Option<PaymentRecord>, AppError> {
        let query = format!(
            r#"
            INSERT INTO payment_records (out_trade_no, trade_no, kind, user_email, amount)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (out_trade_no, trade_no) DO NOTHING
            RETURNING {}
            "#,
            PAYMENT_RECORD_COLUMNS
        );

        sqlx::query_as::<_, PaymentRecord>(&query)
            .bind(&voucher.out_trade_no)
            .bind(&voucher.trade_no)
            .bind(kind.as_str())
            .bind(user_email)
            .bind(amount)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert payment record: {}", e))
            })
    }
}

#[async_trait]
impl FulfillmentStore for Database {
    #[instrument(skip(self), fields(out_trade_no = %voucher.out_trade_no, trade_no = %voucher.trade_no))]
    async fn find_payment_record(
        &self,
        voucher: &VoucherPair,
    ) -> Result<Option<PaymentRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_payment_record"])
            .start_timer();

        let query = format!(
            "SELECT {} FROM payment_records WHERE out_trade_no = $1 AND trade_no = $2",
            PAYMENT_RECORD_COLUMNS
        );
        let record = sqlx::query_as::<_, PaymentRecord>(&query)
            .bind(&voucher.out_trade_no)
            .bind(&voucher.trade_no)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to look up payment record: {}", e))
            })?;

        timer.observe_duration();

        Ok(record)
    }

    #[instrument(
        skip(self, request),
        fields(
            out_trade_no = %request.voucher.out_trade_no,
            user_email = %request.user_email,
            order_count = request.order_ids.len()
        )
    )]
    async fn fulfill_goods(
        &self,
        request: &GoodsFulfillment,
    ) -> Result<FulfillmentResult, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fulfill_goods"])
            .start_timer();

        let mut tx = self.begin().await?;

        let record = match Self::insert_payment_record(
            &mut tx,
            &request.voucher,
            PaymentKind::Goods,
            &request.user_email,
            request.total_fee,
        )
        .await?
        {
            Some(record) => record,
            None => {
                tx.rollback().await.ok();
                warn!("Voucher pair already recorded by a concurrent request");
                return Ok(FulfillmentResult::Duplicate);
            }
        };

        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_email, product_id, quantity, unit_price, freight, spec_ref, is_paid, order_list_id
            FROM orders
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(&request.order_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock orders: {}", e)))?;

        check_orders(request, &orders)?;

        let total = goods_total(&orders, request.coupon.as_ref());
        check_amount(total, request.total_fee)?;

        for order in &orders {
            let product = sqlx::query_as::<_, Product>(
                r#"
                SELECT id, title, market_price, integral, spec
                FROM products
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(order.product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to lock product: {}", e))
            })?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Product {} not found", order.product_id))
            })?;

            let spec = decrement_spec(&product.spec, &order.spec_ref, order.quantity)?;
            sqlx::query("UPDATE products SET spec = $2 WHERE id = $1")
                .bind(product.id)
                .bind(&spec)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to update stock: {}", e))
                })?;

            let points = integral_points(&product, order.quantity);
            if points > 0 {
                sqlx::query(
                    r#"
                    INSERT INTO integral_entries (user_email, product_id, order_id, points, title)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(&request.user_email)
                .bind(product.id)
                .bind(order.id)
                .bind(points)
                .bind(&product.title)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to credit integral: {}", e))
                })?;
            }
        }

        let order_list_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO order_lists (user_email, address_id, coupon_id, coupon_amount, total_amount, out_trade_no, trade_no)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&request.user_email)
        .bind(request.address_id)
        .bind(request.coupon.as_ref().map(|c| c.id))
        .bind(
            request
                .coupon
                .as_ref()
                .map(|c| c.amount)
                .unwrap_or_default(),
        )
        .bind(total)
        .bind(&request.voucher.out_trade_no)
        .bind(&request.voucher.trade_no)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create order list: {}", e))
        })?;

        sqlx::query("UPDATE orders SET is_paid = TRUE, order_list_id = $1 WHERE id = ANY($2)")
            .bind(order_list_id)
            .bind(&request.order_ids)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to mark orders paid: {}", e))
            })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            payment_record_id = record.id,
            order_list_id = order_list_id,
            total = %total,
            "Goods payment fulfilled"
        );

        Ok(FulfillmentResult::Applied(record))
    }

    #[instrument(
        skip(self, request),
        fields(out_trade_no = %request.voucher.out_trade_no, user_email = %request.user_email)
    )]
    async fn recharge(&self, request: &Recharge) -> Result<FulfillmentResult, AppError> {
        check_recharge_amount(request.amount)?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["recharge"])
            .start_timer();

        let mut tx = self.begin().await?;

        let record = match Self::insert_payment_record(
            &mut tx,
            &request.voucher,
            PaymentKind::Recharge,
            &request.user_email,
            request.amount,
        )
        .await?
        {
            Some(record) => record,
            None => {
                tx.rollback().await.ok();
                warn!("Voucher pair already recorded by a concurrent request");
                return Ok(FulfillmentResult::Duplicate);
            }
        };

        let updated = sqlx::query("UPDATE users SET money = money + $2 WHERE email = $1")
            .bind(&request.user_email)
            .bind(request.amount)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to credit balance: {}", e))
            })?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Err(AppError::NotFound(anyhow::anyhow!(
                "User {} not found",
                request.user_email
            )));
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            payment_record_id = record.id,
            amount = %request.amount,
            "Account recharged"
        );

        Ok(FulfillmentResult::Applied(record))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

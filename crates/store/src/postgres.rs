//! PostgreSQL storage backend.
//!
//! All shared-counter mutations (stock decrement, voucher redemption,
//! status transitions) are single conditional `UPDATE` statements whose
//! guard is evaluated at write time, with the affected-row count
//! deciding success. There is no read-then-write anywhere on a mutation
//! path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{
    CartLine, Money, Order, OrderLine, OrderStatus, ProductId, Voucher, VoucherCode,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{OrderRepository, ProductRecord, StockLedger, VoucherStore};

/// PostgreSQL-backed store implementing all three storage roles.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given database URL with a small pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<ProductRecord> {
        Ok(ProductRecord {
            product_id: ProductId::new(row.try_get::<String, _>("id")?),
            price: Money::from_cents(row.try_get("price")?),
            available_quantity: quantity_from_db(row.try_get("available_quantity")?)?,
        })
    }

    fn row_to_voucher(row: PgRow) -> Result<Voucher> {
        let max_usage: Option<i64> = row.try_get("max_usage")?;
        Ok(Voucher {
            code: VoucherCode::new(row.try_get::<String, _>("code")?),
            discount_percent: row.try_get::<i16, _>("discount_percent")? as u8,
            valid_from: row.try_get("valid_from")?,
            valid_until: row.try_get("valid_until")?,
            min_order_amount: Money::from_cents(row.try_get("min_order_amount")?),
            max_usage: max_usage.map(quantity_from_db).transpose()?,
            current_usage: quantity_from_db(row.try_get("current_usage")?)?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_str)
            .ok_or_else(|| StoreError::InvalidRecord(format!("unknown order status: {status_str}")))?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: row
                .try_get::<Option<Uuid>, _>("customer_id")?
                .map(domain::CustomerId::from_uuid),
            channel_ref: row.try_get("channel_ref")?,
            notes: row.try_get("notes")?,
            subtotal: Money::from_cents(row.try_get("subtotal")?),
            discount_amount: Money::from_cents(row.try_get("discount_amount")?),
            final_amount: Money::from_cents(row.try_get("final_amount")?),
            status,
            voucher_code: row
                .try_get::<Option<String>, _>("voucher_code")?
                .map(VoucherCode::new),
            voucher_redemption_failed: row.try_get("voucher_redemption_failed")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            quantity: quantity_from_db(row.try_get("quantity")?)?,
            unit_price_at_purchase: Money::from_cents(row.try_get("unit_price_at_purchase")?),
        })
    }

    async fn fetch_status(&self, order_id: OrderId) -> Result<Option<OrderStatus>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        status
            .map(|s| {
                OrderStatus::parse(&s)
                    .ok_or_else(|| StoreError::InvalidRecord(format!("unknown order status: {s}")))
            })
            .transpose()
    }
}

fn quantity_from_db(value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("quantity out of range: {value}")))
}

#[async_trait]
impl StockLedger for PostgresStore {
    async fn check_availability(&self, lines: &[CartLine]) -> Result<()> {
        for line in lines {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT available_quantity FROM products WHERE id = $1")
                    .bind(line.product_id.as_str())
                    .fetch_optional(&self.pool)
                    .await?;

            let available = quantity_from_db(
                available.ok_or_else(|| StoreError::ProductNotFound(line.product_id.clone()))?,
            )?;

            if available < line.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    requested: line.quantity,
                    available,
                });
            }
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn decrement(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET available_quantity = available_quantity - $2
            WHERE id = $1 AND available_quantity >= $2
            "#,
        )
        .bind(product_id.as_str())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing product from a shortfall.
            let available: Option<i64> =
                sqlx::query_scalar("SELECT available_quantity FROM products WHERE id = $1")
                    .bind(product_id.as_str())
                    .fetch_optional(&self.pool)
                    .await?;

            return match available {
                None => Err(StoreError::ProductNotFound(product_id.clone())),
                Some(available) => Err(StoreError::InsufficientStock {
                    product_id: product_id.clone(),
                    requested: quantity,
                    available: quantity_from_db(available)?,
                }),
            };
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn increment(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET available_quantity = available_quantity + $2 WHERE id = $1",
        )
        .bind(product_id.as_str())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(product_id.clone()));
        }

        Ok(())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query("SELECT id, price, available_quantity FROM products WHERE id = $1")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn put_product(&self, product: ProductRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, price, available_quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                price = EXCLUDED.price,
                available_quantity = EXCLUDED.available_quantity
            "#,
        )
        .bind(product.product_id.as_str())
        .bind(product.price.cents())
        .bind(i64::from(product.available_quantity))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl VoucherStore for PostgresStore {
    async fn get_voucher(&self, code: &VoucherCode) -> Result<Option<Voucher>> {
        let row = sqlx::query(
            r#"
            SELECT code, discount_percent, valid_from, valid_until,
                   min_order_amount, max_usage, current_usage
            FROM vouchers
            WHERE code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_voucher).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn redeem(&self, code: &VoucherCode) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE vouchers
            SET current_usage = current_usage + 1
            WHERE code = $1
              AND (max_usage IS NULL OR current_usage < max_usage)
            "#,
        )
        .bind(code.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i32> =
                sqlx::query_scalar("SELECT 1 FROM vouchers WHERE code = $1")
                    .bind(code.as_str())
                    .fetch_optional(&self.pool)
                    .await?;

            return match exists {
                None => Err(StoreError::VoucherNotFound(code.clone())),
                Some(_) => Err(StoreError::VoucherExhausted(code.clone())),
            };
        }

        Ok(())
    }

    async fn put_voucher(&self, voucher: Voucher) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO vouchers (code, discount_percent, valid_from, valid_until,
                                  min_order_amount, max_usage, current_usage)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (code) DO UPDATE SET
                discount_percent = EXCLUDED.discount_percent,
                valid_from = EXCLUDED.valid_from,
                valid_until = EXCLUDED.valid_until,
                min_order_amount = EXCLUDED.min_order_amount,
                max_usage = EXCLUDED.max_usage,
                current_usage = EXCLUDED.current_usage
            "#,
        )
        .bind(voucher.code.as_str())
        .bind(i16::from(voucher.discount_percent))
        .bind(voucher.valid_from)
        .bind(voucher.valid_until)
        .bind(voucher.min_order_amount.cents())
        .bind(voucher.max_usage.map(i64::from))
        .bind(i64::from(voucher.current_usage))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    #[tracing::instrument(skip(self, order, lines), fields(order_id = %order.id))]
    async fn create(&self, order: &Order, lines: &[OrderLine]) -> Result<OrderId> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, channel_ref, notes, subtotal,
                                discount_amount, final_amount, status, voucher_code,
                                voucher_redemption_failed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.map(|c| c.as_uuid()))
        .bind(&order.channel_ref)
        .bind(&order.notes)
        .bind(order.subtotal.cents())
        .bind(order.discount_amount.cents())
        .bind(order.final_amount.cents())
        .bind(order.status.as_str())
        .bind(order.voucher_code.as_ref().map(|c| c.as_str()))
        .bind(order.voucher_redemption_failed)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, product_id, quantity, unit_price_at_purchase)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(line.order_id.as_uuid())
            .bind(line.product_id.as_str())
            .bind(i64::from(line.quantity))
            .bind(line.unit_price_at_purchase.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(order.id)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<(Order, Vec<OrderLine>)>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, channel_ref, notes, subtotal, discount_amount,
                   final_amount, status, voucher_code, voucher_redemption_failed, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = Self::row_to_order(row)?;

        let lines = sqlx::query(
            r#"
            SELECT order_id, product_id, quantity, unit_price_at_purchase
            FROM order_lines
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Self::row_to_line)
        .collect::<Result<Vec<_>>>()?;

        Ok(Some((order, lines)))
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        // Both legal transitions start from Processing; the guard is
        // part of the update statement so two racing transitions cannot
        // both apply.
        if OrderStatus::Processing.can_transition_to(status) {
            let result = sqlx::query(
                "UPDATE orders SET status = $2 WHERE id = $1 AND status = 'Processing'",
            )
            .bind(order_id.as_uuid())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() > 0 {
                return Ok(());
            }
        }

        match self.fetch_status(order_id).await? {
            None => Err(StoreError::OrderNotFound(order_id)),
            Some(from) => Err(StoreError::IllegalStatusTransition { from, to: status }),
        }
    }

    async fn flag_redemption_failed(&self, order_id: OrderId) -> Result<()> {
        let result =
            sqlx::query("UPDATE orders SET voucher_redemption_failed = TRUE WHERE id = $1")
                .bind(order_id.as_uuid())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order_id));
        }

        Ok(())
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        // order_lines cascade on delete.
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

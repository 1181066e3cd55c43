use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{History, Order, OrderId, OrderStatus, Role, User, UserId, Version};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    OrderQuery, Result, StoreError,
    store::{OrderStore, UserStore},
};

const ORDER_COLUMNS: &str = "id, user_id, transaction_id, address_id, status, note, service_type, \
     order_type, weight, price, collect_date, estimate_date, created_at, updated_at, version";

const HISTORY_COLUMNS: &str = "id, user_id, transaction_id, address_id, status, note, \
     service_type, order_type, weight, price, reason, collect_date, estimate_date, created_at, \
     updated_at, deleted_at";

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password, role, is_banned, created_at, updated_at, version";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and wraps the pool in a store.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        tracing::info!("running database migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::new(row.try_get::<String, _>("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            transaction_id: row.try_get("transaction_id")?,
            address_id: row.try_get("address_id")?,
            status: parse_status(row.try_get("status")?)?,
            note: row.try_get("note")?,
            service_type: row.try_get("service_type")?,
            order_type: row.try_get("order_type")?,
            weight: row.try_get("weight")?,
            price: row.try_get::<Option<Decimal>, _>("price")?,
            collect_date: row.try_get::<DateTime<Utc>, _>("collect_date")?,
            estimate_date: row.try_get("estimate_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_history(row: PgRow) -> Result<History> {
        Ok(History {
            id: OrderId::new(row.try_get::<String, _>("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            transaction_id: row.try_get("transaction_id")?,
            address_id: row.try_get("address_id")?,
            status: parse_status(row.try_get("status")?)?,
            note: row.try_get("note")?,
            service_type: row.try_get("service_type")?,
            order_type: row.try_get("order_type")?,
            weight: row.try_get("weight")?,
            price: row.try_get::<Option<Decimal>, _>("price")?,
            reason: row.try_get("reason")?,
            collect_date: row.try_get("collect_date")?,
            estimate_date: row.try_get("estimate_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        Ok(User {
            id: UserId::new(row.try_get("id")?),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            password: row.try_get("password")?,
            role: parse_role(row.try_get("role")?)?,
            is_banned: row.try_get("is_banned")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    /// Distinguishes NotFound from VersionConflict after a CAS write
    /// matched zero rows.
    async fn order_cas_failure<'e, E>(&self, executor: E, order: &Order) -> StoreError
    where
        E: sqlx::PgExecutor<'e>,
    {
        let actual: std::result::Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                .bind(order.id.as_str())
                .fetch_optional(executor)
                .await;

        match actual {
            Ok(Some(version)) => StoreError::VersionConflict {
                id: order.id.to_string(),
                expected: order.version,
                actual: Version::new(version),
            },
            Ok(None) => StoreError::NotFound(order.id.to_string()),
            Err(e) => StoreError::Database(e),
        }
    }
}

fn parse_status(raw: String) -> Result<OrderStatus> {
    raw.parse()
        .map_err(|e: common::ParseEnumError| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn parse_role(raw: String) -> Result<Role> {
    raw.parse()
        .map_err(|e: common::ParseEnumError| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: Order) -> Result<Order> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, transaction_id, address_id, status, note,
                service_type, order_type, weight, price, collect_date, estimate_date,
                created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(order.id.as_str())
        .bind(order.user_id.as_i64())
        .bind(&order.transaction_id)
        .bind(order.address_id)
        .bind(order.status.as_str())
        .bind(&order.note)
        .bind(&order.service_type)
        .bind(&order.order_type)
        .bind(order.weight)
        .bind(order.price)
        .bind(order.collect_date)
        .bind(order.estimate_date)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(order.id.to_string())
            } else {
                StoreError::Database(e)
            }
        })?;

        Ok(order)
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders");
        let mut param_count = 0;

        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" WHERE user_id = ${param_count}"));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        param_count += 1;
        sql.push_str(&format!(" LIMIT ${param_count}"));
        param_count += 1;
        sql.push_str(&format!(" OFFSET ${param_count}"));

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(user_id) = query.user_id {
            sqlx_query = sqlx_query.bind(user_id.as_i64());
        }
        sqlx_query = sqlx_query
            .bind(query.effective_limit() as i64)
            .bind(query.effective_offset() as i64);

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn update_order(&self, order: &Order) -> Result<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET transaction_id = $1, address_id = $2, status = $3, note = $4,
                service_type = $5, order_type = $6, weight = $7, price = $8,
                collect_date = $9, estimate_date = $10, updated_at = NOW(),
                version = version + 1
            WHERE id = $11 AND version = $12
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(&order.transaction_id)
        .bind(order.address_id)
        .bind(order.status.as_str())
        .bind(&order.note)
        .bind(&order.service_type)
        .bind(&order.order_type)
        .bind(order.weight)
        .bind(order.price)
        .bind(order.collect_date)
        .bind(order.estimate_date)
        .bind(order.id.as_str())
        .bind(order.version.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_order(row),
            None => Err(self.order_cas_failure(&self.pool, order).await),
        }
    }

    async fn archive_order(&self, order: &Order, history: History) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1 AND version = $2")
            .bind(order.id.as_str())
            .bind(order.version.as_i64())
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(self.order_cas_failure(&mut *tx, order).await);
        }

        sqlx::query(
            r#"
            INSERT INTO histories (id, user_id, transaction_id, address_id, status, note,
                service_type, order_type, weight, price, reason, collect_date, estimate_date,
                created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(history.id.as_str())
        .bind(history.user_id.as_i64())
        .bind(&history.transaction_id)
        .bind(history.address_id)
        .bind(history.status.as_str())
        .bind(&history.note)
        .bind(&history.service_type)
        .bind(&history.order_type)
        .bind(history.weight)
        .bind(history.price)
        .bind(&history.reason)
        .bind(history.collect_date)
        .bind(history.estimate_date)
        .bind(history.created_at)
        .bind(history.updated_at)
        .bind(history.deleted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(history.id.to_string())
            } else {
                StoreError::Database(e)
            }
        })?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_history(&self, id: &OrderId) -> Result<Option<History>> {
        let row = sqlx::query(&format!(
            "SELECT {HISTORY_COLUMNS} FROM histories WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_history).transpose()
    }

    async fn list_history(&self, query: OrderQuery) -> Result<Vec<History>> {
        let mut sql = format!("SELECT {HISTORY_COLUMNS} FROM histories");
        let mut param_count = 0;

        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" WHERE user_id = ${param_count}"));
        }
        sql.push_str(" ORDER BY deleted_at DESC, id DESC");
        param_count += 1;
        sql.push_str(&format!(" LIMIT ${param_count}"));
        param_count += 1;
        sql.push_str(&format!(" OFFSET ${param_count}"));

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(user_id) = query.user_id {
            sqlx_query = sqlx_query.bind(user_id.as_i64());
        }
        sqlx_query = sqlx_query
            .bind(query.effective_limit() as i64)
            .bind(query.effective_offset() as i64);

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_history).collect()
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password, role, is_banned,
                created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id.as_i64())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role.as_str())
        .bind(user.is_banned)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(user.email.clone())
            } else {
                StoreError::Database(e)
            }
        })?;

        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn list_users(&self, banned_only: bool) -> Result<Vec<User>> {
        let mut sql = format!("SELECT {USER_COLUMNS} FROM users");
        if banned_only {
            sql.push_str(" WHERE is_banned");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_user).collect()
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET first_name = $1, last_name = $2, email = $3, password = $4,
                role = $5, is_banned = $6, updated_at = NOW(), version = version + 1
            WHERE id = $7 AND version = $8
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role.as_str())
        .bind(user.is_banned)
        .bind(user.id.as_i64())
        .bind(user.version.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_user(row),
            None => {
                let actual: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM users WHERE id = $1")
                        .bind(user.id.as_i64())
                        .fetch_optional(&self.pool)
                        .await?;

                Err(match actual {
                    Some(version) => StoreError::VersionConflict {
                        id: user.id.to_string(),
                        expected: user.version,
                        actual: Version::new(version),
                    },
                    None => StoreError::NotFound(user.id.to_string()),
                })
            }
        }
    }
}

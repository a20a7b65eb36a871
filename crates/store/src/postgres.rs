use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    NewTravelOrder, OrderPage, OrderQuery, Result, SortField, StoreError, TravelOrder, TravelOrderId,
    TravelOrderStatus, User, UserId,
    store::{OrderStore, UserDirectory},
};

const ORDER_COLUMNS: &str = "id, user_id, requester_name, destination, departure_date, return_date, status, created_at, updated_at, deleted_at";

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

    /// Connects to `database_url` and returns a store over a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<TravelOrder> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<TravelOrderStatus>()
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

        Ok(TravelOrder {
            id: TravelOrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            requester_name: row.try_get("requester_name")?,
            destination: row.try_get("destination")?,
            departure_date: row.try_get("departure_date")?,
            return_date: row.try_get("return_date")?,
            status,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    /// Appends the scope and filter predicates shared by the count and page queries.
    fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, query: &OrderQuery) {
        builder.push(" WHERE deleted_at IS NULL");

        if let Some(owner) = query.owner() {
            builder.push(" AND user_id = ").push_bind(owner.as_uuid());
        }

        let filters = query.filters();
        if let Some(status) = filters.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(ref needle) = filters.destination {
            builder
                .push(" AND LOWER(destination) LIKE ")
                .push_bind(format!("%{}%", escape_like(&needle.to_lowercase())));
        }
        if let Some(from) = filters.departure_from {
            builder.push(" AND departure_date >= ").push_bind(from);
        }
        if let Some(to) = filters.return_to {
            builder.push(" AND return_date <= ").push_bind(to);
        }
        if let Some(from) = filters.created_from {
            builder
                .push(" AND (created_at AT TIME ZONE 'UTC')::date >= ")
                .push_bind(from);
        }
        if let Some(to) = filters.created_to {
            builder
                .push(" AND (created_at AT TIME ZONE 'UTC')::date <= ")
                .push_bind(to);
        }
    }
}

/// Escapes LIKE wildcards so user input only ever matches literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[tracing::instrument(skip(self, order), fields(user_id = %order.user_id))]
    async fn insert(&self, order: NewTravelOrder) -> Result<TravelOrder> {
        let order = order.into_order(Utc::now());

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO travel_orders (id, user_id, requester_name, destination, departure_date, return_date, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(&order.requester_name)
        .bind(&order.destination)
        .bind(order.departure_date)
        .bind(order.return_date)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_order(row)
    }

    async fn find(&self, id: TravelOrderId) -> Result<Option<TravelOrder>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM travel_orders WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn update_status_if(
        &self,
        id: TravelOrderId,
        expected: TravelOrderStatus,
        to: TravelOrderStatus,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE travel_orders
            SET status = $1, updated_at = $2
            WHERE id = $3 AND status = $4 AND deleted_at IS NULL
            "#,
        )
        .bind(to.as_str())
        .bind(Utc::now())
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, query: &OrderQuery) -> Result<OrderPage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM travel_orders");
        Self::push_conditions(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM travel_orders"));
        Self::push_conditions(&mut select, query);

        // Columns come from the SortField enum, never from request text.
        select.push(" ORDER BY ");
        for key in query.sort_keys() {
            match key.field {
                SortField::Destination => select.push("LOWER(destination)"),
                field => select.push(field.as_str()),
            };
            select
                .push(" ")
                .push(key.direction.as_sql())
                .push(", ");
        }
        select.push("id ASC");

        select
            .push(" LIMIT ")
            .push_bind(i64::from(query.per_page()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderPage {
            items,
            total: u64::try_from(total).unwrap_or_default(),
            page: query.page(),
            per_page: query.per_page(),
        })
    }

    async fn soft_delete(&self, id: TravelOrderId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE travel_orders SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl UserDirectory for PostgresStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<PgRow> =
            sqlx::query("SELECT id, name, email, is_admin FROM users WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Ok(Some(User {
                id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                is_admin: row.try_get("is_admin")?,
            })),
            None => Ok(None),
        }
    }

    async fn upsert_user(&self, user: User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, is_admin)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                is_admin = EXCLUDED.is_admin
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.is_admin)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

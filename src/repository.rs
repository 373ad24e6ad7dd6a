use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgRow, query_builder::QueryBuilder};
use uuid::Uuid;

use crate::{
    models::{
        Bootcamp, BootcampSummary, CreateBootcampRequest, CreateReviewRequest, CreateUserRequest,
        Review, UpdateBootcampRequest, UpdateReviewRequest, UpdateUserRequest, User,
    },
    query::{ListQuery, ListResult, push_order_and_page, push_where},
};

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers depend on
/// this trait only, which keeps them testable against the in-memory mock and
/// keeps every raw `sqlx::Error` flowing back through the single
/// normalization point instead of being interpreted ad hoc.
///
/// Ownership checks do NOT live here: the guard runs between a fetch and the
/// subsequent write, so the write methods trust their caller.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Bootcamps ---
    async fn list_bootcamps(&self, query: &ListQuery) -> Result<ListResult<Bootcamp>, sqlx::Error>;
    async fn get_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, sqlx::Error>;
    // One-bootcamp-per-publisher rule support.
    async fn owner_has_bootcamp(&self, owner_id: Uuid) -> Result<bool, sqlx::Error>;
    async fn create_bootcamp(
        &self,
        req: CreateBootcampRequest,
        owner_id: Uuid,
    ) -> Result<Bootcamp, sqlx::Error>;
    async fn update_bootcamp(
        &self,
        id: Uuid,
        req: UpdateBootcampRequest,
    ) -> Result<Option<Bootcamp>, sqlx::Error>;
    // Returns true if a row was deleted. Reviews cascade with the bootcamp.
    async fn delete_bootcamp(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    // --- Reviews ---
    async fn list_reviews(&self, query: &ListQuery) -> Result<ListResult<Review>, sqlx::Error>;
    async fn get_review(&self, id: Uuid, populate: bool) -> Result<Option<Review>, sqlx::Error>;
    async fn create_review(
        &self,
        req: CreateReviewRequest,
        bootcamp_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Review, sqlx::Error>;
    async fn update_review(
        &self,
        id: Uuid,
        req: UpdateReviewRequest,
    ) -> Result<Option<Review>, sqlx::Error>;
    async fn delete_review(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    // --- Users ---
    async fn list_users(&self, query: &ListQuery) -> Result<ListResult<User>, sqlx::Error>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;
    async fn create_user(&self, req: CreateUserRequest) -> Result<User, sqlx::Error>;
    async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<Option<User>, sqlx::Error>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, sqlx::Error>;
}

/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

// Column lists returned to the typed models. Kept in one place so the
// generic list executor and the single-row queries stay in sync.
const BOOTCAMP_COLUMNS: &str = "id, owner_id, name, description, website, phone, email, address, \
     careers, housing, average_rating, average_cost, created_at, updated_at";
const REVIEW_COLUMNS: &str =
    "id, owner_id, bootcamp_id, title, text, rating, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, email, role, created_at";

/// PostgresRepository
///
/// The concrete implementation of `Repository` backed by PostgreSQL. Queries
/// are built at runtime with `QueryBuilder` (all values bound, all
/// identifiers from allow-lists), so the crate compiles without a live
/// database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// run_list
    ///
    /// Executes a `ListQuery` against one table: a COUNT over the filtered
    /// set (pre-pagination) and the page fetch share the same WHERE clause,
    /// so `total_count` always matches the filters that produced the items.
    async fn run_list<T>(
        &self,
        table: &str,
        columns: &str,
        query: &ListQuery,
    ) -> Result<ListResult<T>, sqlx::Error>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut count_builder: QueryBuilder<'_, sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {table}"));
        push_where(&mut count_builder, &query.filters);
        let total_count: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<'_, sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {columns} FROM {table}"));
        push_where(&mut builder, &query.filters);
        push_order_and_page(&mut builder, query);
        let items = builder.build_query_as::<T>().fetch_all(&self.pool).await?;

        Ok(ListResult {
            items,
            total_count,
            page: query.page,
            limit: query.limit,
        })
    }

    /// Fetches the embedded bootcamp summaries for a set of reviews in one
    /// round trip.
    async fn bootcamp_summaries(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, BootcampSummary>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, name, description FROM bootcamps WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, description)| {
                (
                    id,
                    BootcampSummary {
                        id,
                        name,
                        description,
                    },
                )
            })
            .collect())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_bootcamps(&self, query: &ListQuery) -> Result<ListResult<Bootcamp>, sqlx::Error> {
        self.run_list("bootcamps", BOOTCAMP_COLUMNS, query).await
    }

    async fn get_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, sqlx::Error> {
        sqlx::query_as::<_, Bootcamp>(&format!(
            "SELECT {BOOTCAMP_COLUMNS} FROM bootcamps WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn owner_has_bootcamp(&self, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM bootcamps WHERE owner_id = $1)")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn create_bootcamp(
        &self,
        req: CreateBootcampRequest,
        owner_id: Uuid,
    ) -> Result<Bootcamp, sqlx::Error> {
        sqlx::query_as::<_, Bootcamp>(&format!(
            "INSERT INTO bootcamps \
                 (id, owner_id, name, description, website, phone, email, address, \
                  careers, housing, average_cost, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW()) \
             RETURNING {BOOTCAMP_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.website)
        .bind(req.phone)
        .bind(req.email)
        .bind(req.address)
        .bind(req.careers)
        .bind(req.housing)
        .bind(req.average_cost)
        .fetch_one(&self.pool)
        .await
    }

    /// COALESCE keeps unset `Option` fields at their current value, matching
    /// the partial-update payloads.
    async fn update_bootcamp(
        &self,
        id: Uuid,
        req: UpdateBootcampRequest,
    ) -> Result<Option<Bootcamp>, sqlx::Error> {
        sqlx::query_as::<_, Bootcamp>(&format!(
            "UPDATE bootcamps \
             SET name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 website = COALESCE($4, website), \
                 phone = COALESCE($5, phone), \
                 email = COALESCE($6, email), \
                 address = COALESCE($7, address), \
                 housing = COALESCE($8, housing), \
                 average_cost = COALESCE($9, average_cost), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {BOOTCAMP_COLUMNS}"
        ))
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.website)
        .bind(req.phone)
        .bind(req.email)
        .bind(req.address)
        .bind(req.housing)
        .bind(req.average_cost)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_bootcamp(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bootcamps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reviews(&self, query: &ListQuery) -> Result<ListResult<Review>, sqlx::Error> {
        let mut result = self
            .run_list::<Review>("reviews", REVIEW_COLUMNS, query)
            .await?;

        // Relation hints change embedding only, never the plan itself.
        if query.wants("bootcamp") {
            let ids = result.items.iter().map(|r| r.bootcamp_id).collect();
            let summaries = self.bootcamp_summaries(ids).await?;
            for review in &mut result.items {
                review.bootcamp = summaries.get(&review.bootcamp_id).cloned();
            }
        }

        Ok(result)
    }

    async fn get_review(&self, id: Uuid, populate: bool) -> Result<Option<Review>, sqlx::Error> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut review) = review else {
            return Ok(None);
        };

        if populate {
            let summaries = self.bootcamp_summaries(vec![review.bootcamp_id]).await?;
            review.bootcamp = summaries.get(&review.bootcamp_id).cloned();
        }

        Ok(Some(review))
    }

    async fn create_review(
        &self,
        req: CreateReviewRequest,
        bootcamp_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Review, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (id, owner_id, bootcamp_id, title, text, rating, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(bootcamp_id)
        .bind(req.title)
        .bind(req.text)
        .bind(req.rating)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_review(
        &self,
        id: Uuid,
        req: UpdateReviewRequest,
    ) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews \
             SET title = COALESCE($2, title), \
                 text = COALESCE($3, text), \
                 rating = COALESCE($4, rating), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .bind(req.title)
        .bind(req.text)
        .bind(req.rating)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, query: &ListQuery) -> Result<ListResult<User>, sqlx::Error> {
        self.run_list("users", USER_COLUMNS, query).await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_user(&self, req: CreateUserRequest) -> Result<User, sqlx::Error> {
        // New users mirror the external auth provider's id when one is
        // supplied; otherwise a fresh id is generated.
        let id = req.id.unwrap_or_else(Uuid::new_v4);
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, role, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(req.name)
        .bind(req.email)
        .bind(req.role.as_str())
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET name = COALESCE($2, name), \
                 email = COALESCE($3, email), \
                 role = COALESCE($4, role) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(req.name)
        .bind(req.email)
        .bind(req.role.map(|r| r.as_str()))
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

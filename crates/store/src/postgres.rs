use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ActivityId, DestinationId, ItineraryId, RankedDestinationId, UserId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Activity, Destination, DestinationDetails, DestinationFields, Itinerary, ItineraryFields,
    NewRankedDestination, PageRequest, RankedDestination, Result,
    store::{DestinationCatalog, ItineraryStore, ItineraryTransaction},
};

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

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    fn row_to_itinerary(row: PgRow) -> Result<Itinerary> {
        Ok(Itinerary {
            id: ItineraryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            author_id: UserId::from_uuid(row.try_get::<Uuid, _>("author_id")?),
            fields: ItineraryFields {
                title: row.try_get("title")?,
                description: row.try_get("description")?,
                start_date: row.try_get("start_date")?,
                end_date: row.try_get("end_date")?,
            },
            likes_count: row.try_get("likes_count")?,
            comments_count: row.try_get("comments_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_destination(row: &PgRow) -> Result<Destination> {
        Ok(Destination {
            id: DestinationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            itinerary_id: ItineraryId::from_uuid(row.try_get::<Uuid, _>("itinerary_id")?),
            position: row.try_get("position")?,
            fields: DestinationFields {
                name: row.try_get("name")?,
                start_date: row.try_get("start_date")?,
                end_date: row.try_get("end_date")?,
            },
        })
    }

    fn row_to_activity(row: PgRow) -> Result<Activity> {
        Ok(Activity {
            id: ActivityId::from_uuid(row.try_get::<Uuid, _>("id")?),
            destination_id: DestinationId::from_uuid(row.try_get::<Uuid, _>("destination_id")?),
            position: row.try_get("position")?,
            activity: row.try_get("activity")?,
        })
    }

    fn row_to_ranked(row: PgRow) -> Result<RankedDestination> {
        Ok(RankedDestination {
            id: RankedDestinationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            country: row.try_get("country")?,
            description: row.try_get("description")?,
            popularity_score: row.try_get("popularity_score")?,
        })
    }
}

fn page_bounds(page: PageRequest) -> (i64, i64) {
    (
        i64::try_from(page.limit()).unwrap_or(i64::MAX),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

#[async_trait]
impl ItineraryStore for PostgresStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }

    async fn get_itinerary(&self, id: ItineraryId) -> Result<Option<Itinerary>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, title, description, start_date, end_date, author_id,
                   likes_count, comments_count, created_at, updated_at
            FROM itineraries
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_itinerary).transpose()
    }

    async fn get_destinations(
        &self,
        itinerary_id: ItineraryId,
    ) -> Result<Vec<DestinationDetails>> {
        let destination_rows = sqlx::query(
            r#"
            SELECT id, itinerary_id, position, name, start_date, end_date
            FROM itinerary_destinations
            WHERE itinerary_id = $1 AND deleted_at IS NULL
            ORDER BY position ASC
            "#,
        )
        .bind(itinerary_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::with_capacity(destination_rows.len());
        for row in &destination_rows {
            let destination = Self::row_to_destination(row)?;
            let activities = sqlx::query(
                r#"
                SELECT id, destination_id, position, activity
                FROM itinerary_activities
                WHERE destination_id = $1 AND deleted_at IS NULL
                ORDER BY position ASC
                "#,
            )
            .bind(destination.id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Self::row_to_activity)
            .collect::<Result<Vec<_>>>()?;

            details.push(DestinationDetails {
                destination,
                activities,
            });
        }

        Ok(details)
    }

    async fn list_itineraries(&self, page: PageRequest) -> Result<Vec<Itinerary>> {
        let (limit, offset) = page_bounds(page);
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, start_date, end_date, author_id,
                   likes_count, comments_count, created_at, updated_at
            FROM itineraries
            WHERE deleted_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_itinerary).collect()
    }

    async fn count_itineraries(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM itineraries WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn soft_delete_itinerary(&self, id: ItineraryId, at: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE itineraries SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(at)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn soft_delete_destination(&self, id: DestinationId, at: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE itinerary_destinations SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(at)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn soft_delete_activity(&self, id: ActivityId, at: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE itinerary_activities SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(at)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// A transaction on the PostgreSQL store.
///
/// Wraps a `sqlx` transaction; dropping it unfinished rolls back.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ItineraryTransaction for PostgresTransaction {
    async fn insert_itinerary(&mut self, itinerary: &Itinerary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO itineraries (id, title, description, start_date, end_date, author_id,
                                     likes_count, comments_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(itinerary.id.as_uuid())
        .bind(&itinerary.fields.title)
        .bind(&itinerary.fields.description)
        .bind(itinerary.fields.start_date)
        .bind(itinerary.fields.end_date)
        .bind(itinerary.author_id.as_uuid())
        .bind(itinerary.likes_count)
        .bind(itinerary.comments_count)
        .bind(itinerary.created_at)
        .bind(itinerary.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_destination(&mut self, destination: &Destination) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO itinerary_destinations (id, itinerary_id, position, name, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(destination.id.as_uuid())
        .bind(destination.itinerary_id.as_uuid())
        .bind(destination.position)
        .bind(&destination.fields.name)
        .bind(destination.fields.start_date)
        .bind(destination.fields.end_date)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_activity(&mut self, activity: &Activity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO itinerary_activities (id, destination_id, position, activity)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(activity.id.as_uuid())
        .bind(activity.destination_id.as_uuid())
        .bind(activity.position)
        .bind(&activity.activity)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_itinerary(
        &mut self,
        id: ItineraryId,
        fields: &ItineraryFields,
        updated_at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE itineraries
            SET title = $1, description = $2, start_date = $3, end_date = $4, updated_at = $5
            WHERE id = $6 AND deleted_at IS NULL
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .bind(updated_at)
        .bind(id.as_uuid())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn update_destination(
        &mut self,
        itinerary_id: ItineraryId,
        id: DestinationId,
        fields: &DestinationFields,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE itinerary_destinations
            SET name = $1, start_date = $2, end_date = $3
            WHERE id = $4 AND itinerary_id = $5 AND deleted_at IS NULL
            "#,
        )
        .bind(&fields.name)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .bind(id.as_uuid())
        .bind(itinerary_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn update_activity(
        &mut self,
        destination_id: DestinationId,
        id: ActivityId,
        activity: &str,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE itinerary_activities
            SET activity = $1
            WHERE id = $2 AND destination_id = $3 AND deleted_at IS NULL
            "#,
        )
        .bind(activity)
        .bind(id.as_uuid())
        .bind(destination_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}

#[async_trait]
impl DestinationCatalog for PostgresStore {
    async fn create_destination(&self, new: &NewRankedDestination) -> Result<RankedDestination> {
        let id = RankedDestinationId::new();
        sqlx::query(
            r#"
            INSERT INTO destinations (id, name, country, description, best_time_to_visit,
                                      average_cost_per_day, currency, language, popularity_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&new.name)
        .bind(&new.country)
        .bind(&new.description)
        .bind(&new.best_time_to_visit)
        .bind(new.average_cost_per_day)
        .bind(&new.currency)
        .bind(&new.language)
        .bind(new.popularity_score)
        .execute(&self.pool)
        .await?;

        Ok(RankedDestination {
            id,
            name: new.name.clone(),
            country: new.country.clone(),
            description: new.description.clone(),
            popularity_score: new.popularity_score,
        })
    }

    async fn top_destinations(&self, page: PageRequest) -> Result<Vec<RankedDestination>> {
        let (limit, offset) = page_bounds(page);
        tracing::debug!(limit, offset, "querying top destinations");
        let rows = sqlx::query(
            r#"
            SELECT id, name, country, description, popularity_score
            FROM destinations
            WHERE deleted_at IS NULL
            ORDER BY popularity_score DESC, name ASC
            LIMIT $1
            OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_ranked).collect()
    }
}

//! PostgreSQL lifecycle store.
//!
//! Transactions hold `SELECT ... FOR UPDATE` row locks until commit. Unique
//! violations (SQLSTATE 23505) surface as `StoreError::Duplicate` carrying the
//! constraint name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{DonationQuery, LifecycleStore, LifecycleTx, RadiusQuery, StoreError, StoreResult};
use crate::models::{
    Donation, DonationCounts, DonationStatus, FoodType, GeoPoint, LeaderboardEntry, Quantity,
    QuantityUnit, Report, ReportStatus, Request, Review, UserCounts, UserStats,
};

const UNIQUE_VIOLATION: &str = "23505";

const DONATION_COLUMNS: &str = r#"
    id, donor_id, food_type, food_name, quantity_value, quantity_unit,
    prepared_time, pickup_time_start, pickup_time_end,
    location_lng, location_lat, location_address, will_deliver,
    status, receiver_id, expires_at, created_at, updated_at, confirmed_at, picked_up_at
"#;

const REQUEST_COLUMNS: &str = r#"
    id, donation_id, receiver_id, donor_id, status, note, reviewed,
    decline_reason, cancellation_reason,
    confirmed_at, declined_at, completed_at, cancelled_at, created_at, updated_at
"#;

const REVIEW_COLUMNS: &str =
    "id, donation_id, reviewer_id, reviewee_id, rating, comment, food_quality, created_at";

const REPORT_COLUMNS: &str = r#"
    id, reporter_id, reported_user_id, donation_id, report_type, reason, evidence,
    status, admin_notes, resolved_at, created_at, updated_at
"#;

const USER_STATS_COLUMNS: &str =
    "user_id, average_rating, review_count, total_donations, total_quantity_donated, updated_at";

/// Flat `donations` row; quantity and location are folded back into their structs
#[derive(Debug, FromRow)]
struct DonationRow {
    id: Uuid,
    donor_id: Uuid,
    food_type: FoodType,
    food_name: String,
    quantity_value: f64,
    quantity_unit: QuantityUnit,
    prepared_time: DateTime<Utc>,
    pickup_time_start: DateTime<Utc>,
    pickup_time_end: DateTime<Utc>,
    location_lng: f64,
    location_lat: f64,
    location_address: Option<String>,
    will_deliver: bool,
    status: DonationStatus,
    receiver_id: Option<Uuid>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    picked_up_at: Option<DateTime<Utc>>,
}

impl From<DonationRow> for Donation {
    fn from(row: DonationRow) -> Self {
        Donation {
            id: row.id,
            donor_id: row.donor_id,
            food_type: row.food_type,
            food_name: row.food_name,
            quantity: Quantity {
                value: row.quantity_value,
                unit: row.quantity_unit,
            },
            prepared_time: row.prepared_time,
            pickup_time_start: row.pickup_time_start,
            pickup_time_end: row.pickup_time_end,
            location: GeoPoint {
                lng: row.location_lng,
                lat: row.location_lat,
                address: row.location_address,
            },
            will_deliver: row.will_deliver,
            status: row.status,
            receiver_id: row.receiver_id,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            confirmed_at: row.confirmed_at,
            picked_up_at: row.picked_up_at,
        }
    }
}

fn into_donations(rows: Vec<DonationRow>) -> Vec<Donation> {
    rows.into_iter().map(Donation::from).collect()
}

/// Map unique violations to `Duplicate`, everything else to `Database`
fn map_write_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Duplicate {
                constraint: db_err.constraint().unwrap_or("unknown").to_string(),
            };
        }
    }
    StoreError::Database(err)
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Clone)]
pub struct PgLifecycleStore {
    pool: PgPool,
}

impl PgLifecycleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl LifecycleStore for PgLifecycleStore {
    async fn begin<'a>(&'a self) -> StoreResult<Box<dyn LifecycleTx + 'a>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_donation(&self, id: Uuid) -> StoreResult<Option<Donation>> {
        let sql = format!("SELECT {} FROM donations WHERE id = $1", DONATION_COLUMNS);
        let row = sqlx::query_as::<_, DonationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Donation::from))
    }

    async fn list_nearby_donations(
        &self,
        query: RadiusQuery,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Donation>> {
        // Haversine on a 6371 km sphere; LEAST guards ASIN against rounding above 1
        let sql = format!(
            r#"
            SELECT * FROM (
                SELECT {},
                       2 * 6371 * ASIN(LEAST(1.0, SQRT(
                           POWER(SIN(RADIANS(location_lat - $2) / 2), 2)
                           + COS(RADIANS($2)) * COS(RADIANS(location_lat))
                             * POWER(SIN(RADIANS(location_lng - $1) / 2), 2)
                       ))) AS distance_km
                FROM donations
                WHERE status = 'pending' AND expires_at > $3
            ) nearby
            WHERE distance_km <= $4
            ORDER BY distance_km ASC
            "#,
            DONATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, DonationRow>(&sql)
            .bind(query.lng)
            .bind(query.lat)
            .bind(now)
            .bind(query.radius_km)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_donations(rows))
    }

    async fn list_donations_by_donor(&self, donor_id: Uuid) -> StoreResult<Vec<Donation>> {
        let sql = format!(
            "SELECT {} FROM donations WHERE donor_id = $1 ORDER BY created_at DESC",
            DONATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, DonationRow>(&sql)
            .bind(donor_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_donations(rows))
    }

    async fn list_donations(&self, query: &DonationQuery) -> StoreResult<Vec<Donation>> {
        let sql = format!(
            r#"
            SELECT {} FROM donations
            WHERE ($1::donation_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR location_address ILIKE '%' || $2 || '%')
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at <= $4)
            ORDER BY created_at DESC
            "#,
            DONATION_COLUMNS
        );
        let area = query.area.as_deref().map(escape_like);
        let rows = sqlx::query_as::<_, DonationRow>(&sql)
            .bind(query.status)
            .bind(area)
            .bind(query.created_from)
            .bind(query.created_to)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_donations(rows))
    }

    async fn list_requests_by_donor(&self, donor_id: Uuid) -> StoreResult<Vec<Request>> {
        let sql = format!(
            "SELECT {} FROM requests WHERE donor_id = $1 ORDER BY created_at DESC",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, Request>(&sql)
            .bind(donor_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_requests_by_receiver(&self, receiver_id: Uuid) -> StoreResult<Vec<Request>> {
        let sql = format!(
            "SELECT {} FROM requests WHERE receiver_id = $1 ORDER BY created_at DESC",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, Request>(&sql)
            .bind(receiver_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_review(
        &self,
        donation_id: Uuid,
        reviewer_id: Uuid,
    ) -> StoreResult<Option<Review>> {
        let sql = format!(
            "SELECT {} FROM reviews WHERE donation_id = $1 AND reviewer_id = $2",
            REVIEW_COLUMNS
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(donation_id)
            .bind(reviewer_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn list_reviews_for_user(&self, reviewee_id: Uuid) -> StoreResult<Vec<Review>> {
        let sql = format!(
            "SELECT {} FROM reviews WHERE reviewee_id = $1 ORDER BY created_at DESC",
            REVIEW_COLUMNS
        );
        let rows = sqlx::query_as::<_, Review>(&sql)
            .bind(reviewee_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_reviews(&self) -> StoreResult<Vec<Review>> {
        let sql = format!("SELECT {} FROM reviews ORDER BY created_at DESC", REVIEW_COLUMNS);
        let rows = sqlx::query_as::<_, Review>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_reports_by_reporter(&self, reporter_id: Uuid) -> StoreResult<Vec<Report>> {
        let sql = format!(
            "SELECT {} FROM reports WHERE reporter_id = $1 ORDER BY created_at DESC",
            REPORT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Report>(&sql)
            .bind(reporter_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_reports_against(&self, user_id: Uuid) -> StoreResult<Vec<Report>> {
        let sql = format!(
            "SELECT {} FROM reports WHERE reported_user_id = $1 ORDER BY created_at DESC",
            REPORT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Report>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_reports(&self, status: Option<ReportStatus>) -> StoreResult<Vec<Report>> {
        let sql = format!(
            r#"
            SELECT {} FROM reports
            WHERE ($1::report_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
            REPORT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Report>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_user_stats(&self, user_id: Uuid) -> StoreResult<Option<UserStats>> {
        let sql = format!(
            "SELECT {} FROM user_stats WHERE user_id = $1",
            USER_STATS_COLUMNS
        );
        let stats = sqlx::query_as::<_, UserStats>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(stats)
    }

    async fn leaderboard(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<LeaderboardEntry>> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT donor_id,
                   COUNT(*)::BIGINT AS total_donations,
                   COALESCE(SUM(quantity_value), 0)::DOUBLE PRECISION AS total_quantity
            FROM donations
            WHERE status IN ('allotted', 'picked_up') AND created_at >= $1
            GROUP BY donor_id
            ORDER BY total_donations DESC, total_quantity DESC, donor_id ASC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn user_counts(&self) -> StoreResult<UserCounts> {
        let (total_donors, total_receivers, total) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(DISTINCT donor_id) FROM donations),
                (SELECT COUNT(DISTINCT receiver_id) FROM requests),
                (SELECT COUNT(*) FROM (
                    SELECT donor_id AS user_id FROM donations
                    UNION
                    SELECT receiver_id AS user_id FROM requests
                ) users)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(UserCounts {
            total_donors,
            total_receivers,
            total,
        })
    }

    async fn donation_counts(&self) -> StoreResult<DonationCounts> {
        let (total, completed, pending) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'picked_up'),
                   COUNT(*) FILTER (WHERE status = 'pending')
            FROM donations
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DonationCounts {
            total,
            completed,
            pending,
        })
    }

    async fn food_saved(&self) -> StoreResult<f64> {
        let saved = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT COALESCE(SUM(quantity_value), 0)::DOUBLE PRECISION
            FROM donations
            WHERE status = 'picked_up'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn recent_donations(&self, limit: i64) -> StoreResult<Vec<Donation>> {
        let sql = format!(
            "SELECT {} FROM donations ORDER BY created_at DESC LIMIT $1",
            DONATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, DonationRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_donations(rows))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LifecycleTx for PgTx {
    async fn lock_donation(&mut self, id: Uuid) -> StoreResult<Option<Donation>> {
        let sql = format!(
            "SELECT {} FROM donations WHERE id = $1 FOR UPDATE",
            DONATION_COLUMNS
        );
        let row = sqlx::query_as::<_, DonationRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Donation::from))
    }

    async fn insert_donation(&mut self, donation: &Donation) -> StoreResult<()> {
        let sql = format!(
            r#"
            INSERT INTO donations ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
            DONATION_COLUMNS
        );
        sqlx::query(&sql)
            .bind(donation.id)
            .bind(donation.donor_id)
            .bind(donation.food_type)
            .bind(&donation.food_name)
            .bind(donation.quantity.value)
            .bind(donation.quantity.unit)
            .bind(donation.prepared_time)
            .bind(donation.pickup_time_start)
            .bind(donation.pickup_time_end)
            .bind(donation.location.lng)
            .bind(donation.location.lat)
            .bind(&donation.location.address)
            .bind(donation.will_deliver)
            .bind(donation.status)
            .bind(donation.receiver_id)
            .bind(donation.expires_at)
            .bind(donation.created_at)
            .bind(donation.updated_at)
            .bind(donation.confirmed_at)
            .bind(donation.picked_up_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_err)?;
        Ok(())
    }

    async fn update_donation(&mut self, donation: &Donation) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE donations
            SET status = $2, receiver_id = $3, confirmed_at = $4, picked_up_at = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(donation.id)
        .bind(donation.status)
        .bind(donation.receiver_id)
        .bind(donation.confirmed_at)
        .bind(donation.picked_up_at)
        .bind(donation.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_err)?;
        Ok(())
    }

    async fn lock_expired_donations(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Donation>> {
        let sql = format!(
            r#"
            SELECT {} FROM donations
            WHERE status = 'pending' AND expires_at <= $1
            ORDER BY expires_at ASC
            FOR UPDATE
            "#,
            DONATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, DonationRow>(&sql)
            .bind(now)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(into_donations(rows))
    }

    async fn get_request(&mut self, id: Uuid) -> StoreResult<Option<Request>> {
        let sql = format!("SELECT {} FROM requests WHERE id = $1", REQUEST_COLUMNS);
        let request = sqlx::query_as::<_, Request>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(request)
    }

    async fn lock_request(&mut self, id: Uuid) -> StoreResult<Option<Request>> {
        let sql = format!(
            "SELECT {} FROM requests WHERE id = $1 FOR UPDATE",
            REQUEST_COLUMNS
        );
        let request = sqlx::query_as::<_, Request>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(request)
    }

    async fn find_request(
        &mut self,
        donation_id: Uuid,
        receiver_id: Uuid,
    ) -> StoreResult<Option<Request>> {
        let sql = format!(
            "SELECT {} FROM requests WHERE donation_id = $1 AND receiver_id = $2",
            REQUEST_COLUMNS
        );
        let request = sqlx::query_as::<_, Request>(&sql)
            .bind(donation_id)
            .bind(receiver_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(request)
    }

    async fn insert_request(&mut self, request: &Request) -> StoreResult<()> {
        let sql = format!(
            r#"
            INSERT INTO requests ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
            REQUEST_COLUMNS
        );
        sqlx::query(&sql)
            .bind(request.id)
            .bind(request.donation_id)
            .bind(request.receiver_id)
            .bind(request.donor_id)
            .bind(request.status)
            .bind(&request.note)
            .bind(request.reviewed)
            .bind(&request.decline_reason)
            .bind(&request.cancellation_reason)
            .bind(request.confirmed_at)
            .bind(request.declined_at)
            .bind(request.completed_at)
            .bind(request.cancelled_at)
            .bind(request.created_at)
            .bind(request.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_err)?;
        Ok(())
    }

    async fn update_request(&mut self, request: &Request) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE requests
            SET status = $2, reviewed = $3, decline_reason = $4, cancellation_reason = $5,
                confirmed_at = $6, declined_at = $7, completed_at = $8, cancelled_at = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(request.id)
        .bind(request.status)
        .bind(request.reviewed)
        .bind(&request.decline_reason)
        .bind(&request.cancellation_reason)
        .bind(request.confirmed_at)
        .bind(request.declined_at)
        .bind(request.completed_at)
        .bind(request.cancelled_at)
        .bind(request.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_err)?;
        Ok(())
    }

    async fn lock_pending_requests(
        &mut self,
        donation_id: Uuid,
        except: Option<Uuid>,
    ) -> StoreResult<Vec<Request>> {
        let sql = format!(
            r#"
            SELECT {} FROM requests
            WHERE donation_id = $1
              AND status = 'pending'
              AND ($2::uuid IS NULL OR id <> $2)
            ORDER BY created_at DESC
            FOR UPDATE
            "#,
            REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, Request>(&sql)
            .bind(donation_id)
            .bind(except)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn insert_review(&mut self, review: &Review) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO reviews ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            REVIEW_COLUMNS
        );
        sqlx::query(&sql)
            .bind(review.id)
            .bind(review.donation_id)
            .bind(review.reviewer_id)
            .bind(review.reviewee_id)
            .bind(review.rating)
            .bind(&review.comment)
            .bind(review.food_quality)
            .bind(review.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_err)?;
        Ok(())
    }

    async fn delete_review(&mut self, id: Uuid) -> StoreResult<Option<Review>> {
        let sql = format!("DELETE FROM reviews WHERE id = $1 RETURNING {}", REVIEW_COLUMNS);
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(review)
    }

    async fn ratings_for(&mut self, reviewee_id: Uuid) -> StoreResult<Vec<i16>> {
        let ratings = sqlx::query_scalar::<_, i16>("SELECT rating FROM reviews WHERE reviewee_id = $1")
            .bind(reviewee_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(ratings)
    }

    async fn insert_report(&mut self, report: &Report) -> StoreResult<()> {
        let sql = format!(
            r#"
            INSERT INTO reports ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
            REPORT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(report.id)
            .bind(report.reporter_id)
            .bind(report.reported_user_id)
            .bind(report.donation_id)
            .bind(report.report_type)
            .bind(&report.reason)
            .bind(&report.evidence)
            .bind(report.status)
            .bind(&report.admin_notes)
            .bind(report.resolved_at)
            .bind(report.created_at)
            .bind(report.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_err)?;
        Ok(())
    }

    async fn lock_report(&mut self, id: Uuid) -> StoreResult<Option<Report>> {
        let sql = format!(
            "SELECT {} FROM reports WHERE id = $1 FOR UPDATE",
            REPORT_COLUMNS
        );
        let report = sqlx::query_as::<_, Report>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(report)
    }

    async fn update_report(&mut self, report: &Report) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE reports
            SET status = $2, admin_notes = $3, resolved_at = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(report.id)
        .bind(report.status)
        .bind(&report.admin_notes)
        .bind(report.resolved_at)
        .bind(report.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_err)?;
        Ok(())
    }

    async fn lock_user_stats(&mut self, user_id: Uuid) -> StoreResult<UserStats> {
        sqlx::query(
            r#"
            INSERT INTO user_stats (user_id, updated_at)
            VALUES ($1, NOW())
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        let sql = format!(
            "SELECT {} FROM user_stats WHERE user_id = $1 FOR UPDATE",
            USER_STATS_COLUMNS
        );
        let stats = sqlx::query_as::<_, UserStats>(&sql)
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(stats)
    }

    async fn save_user_stats(&mut self, stats: &UserStats) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE user_stats
            SET average_rating = $2, review_count = $3, total_donations = $4,
                total_quantity_donated = $5, updated_at = $6
            WHERE user_id = $1
            "#,
        )
        .bind(stats.user_id)
        .bind(stats.average_rating)
        .bind(stats.review_count)
        .bind(stats.total_donations)
        .bind(stats.total_quantity_donated)
        .bind(stats.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

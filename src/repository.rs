use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, query_builder::QueryBuilder};
use uuid::Uuid;

use crate::{
    error::RepoResult,
    models::{
        Admin, AdminDashboardStats, AuthEvent, BankDetailsInput, BankDetailsWithDealer, Car,
        CarFlagsUpdate, CarImage, CarListing, Dealer, DealerBadge, DealerBankDetails,
        DealerContact, DealerSession, DealerStatus, NewCar, NewDealer, NewSession,
        SubscriptionTier,
    },
};

/// Repository Trait
///
/// Abstract contract for every persistence operation against the hosted database.
/// Handlers only ever see `Arc<dyn Repository>`, which lets tests swap in an
/// in-memory implementation.
///
/// State-changing dealer operations take the expected source status and return
/// `None` when the row no longer matches, which makes each transition atomic.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Dealers ---
    async fn get_dealer(&self, id: Uuid) -> RepoResult<Option<Dealer>>;
    async fn get_dealer_by_email(&self, email: &str) -> RepoResult<Option<Dealer>>;
    async fn get_dealer_by_setup_token(&self, email: &str, token: &str)
    -> RepoResult<Option<Dealer>>;
    async fn create_dealer(&self, dealer: NewDealer) -> RepoResult<Dealer>;
    async fn list_dealers(&self, status: Option<DealerStatus>) -> RepoResult<Vec<Dealer>>;
    // pending -> active, stamping the approving admin.
    async fn approve_dealer(
        &self,
        id: Uuid,
        admin_id: Uuid,
        notes: Option<String>,
    ) -> RepoResult<Option<Dealer>>;
    // verified -> active, storing the first password and burning the setup token.
    async fn complete_password_setup(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> RepoResult<Option<Dealer>>;
    async fn transition_dealer_status(
        &self,
        id: Uuid,
        from: DealerStatus,
        to: DealerStatus,
    ) -> RepoResult<Option<Dealer>>;
    async fn set_subscription_tier(
        &self,
        id: Uuid,
        tier: SubscriptionTier,
    ) -> RepoResult<Option<Dealer>>;
    async fn record_dealer_login(&self, id: Uuid) -> RepoResult<()>;

    // --- Dealer Sessions ---
    async fn create_session(&self, session: NewSession) -> RepoResult<DealerSession>;
    // Only returns sessions whose `expires_at` is still in the future.
    async fn find_active_session(&self, token: &str) -> RepoResult<Option<DealerSession>>;
    async fn touch_session(&self, id: Uuid) -> RepoResult<()>;
    async fn delete_session(&self, token: &str) -> RepoResult<bool>;
    async fn delete_dealer_sessions(&self, dealer_id: Uuid) -> RepoResult<u64>;
    async fn delete_expired_sessions(&self) -> RepoResult<u64>;

    // --- Admins & Audit ---
    async fn get_active_admin(&self, auth_id: Uuid) -> RepoResult<Option<Admin>>;
    async fn record_auth_event(&self, event: AuthEvent) -> RepoResult<()>;

    // --- Bank Details ---
    async fn get_bank_details(&self, dealer_id: Uuid) -> RepoResult<Option<DealerBankDetails>>;
    // Insert-or-update; any change puts the account back into the verification queue.
    async fn upsert_bank_details(
        &self,
        dealer_id: Uuid,
        input: BankDetailsInput,
    ) -> RepoResult<DealerBankDetails>;
    async fn delete_bank_details(&self, dealer_id: Uuid) -> RepoResult<bool>;
    async fn list_bank_details(
        &self,
        dealer_id: Option<Uuid>,
    ) -> RepoResult<Vec<BankDetailsWithDealer>>;
    async fn set_bank_details_verified(
        &self,
        id: Uuid,
        is_verified: bool,
    ) -> RepoResult<Option<DealerBankDetails>>;

    // --- Cars ---
    async fn latest_arrivals(&self, limit: i64) -> RepoResult<Vec<CarListing>>;
    async fn cars_priced_from(&self, min_price: i64, limit: i64) -> RepoResult<Vec<CarListing>>;
    async fn premium_dealer_cars(&self, limit: i64) -> RepoResult<Vec<CarListing>>;
    async fn list_dealer_cars(&self, dealer_id: Uuid) -> RepoResult<Vec<Car>>;
    async fn create_car(&self, dealer_id: Uuid, car: NewCar) -> RepoResult<Car>;
    async fn update_car_flags(&self, id: Uuid, flags: CarFlagsUpdate) -> RepoResult<Option<Car>>;

    // --- Dashboard ---
    async fn get_stats(&self) -> RepoResult<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the hosted Postgres instance. Queries are checked at runtime,
/// so the crate builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

macro_rules! dealer_columns {
    () => {
        "id, business_name, email, phone, whatsapp, location, address, \
         business_registration_number, status, subscription_tier, is_verified, verified_at, \
         verified_by_admin_id, verification_notes, password_hash, password_set_at, setup_token, \
         setup_token_expires_at, last_login_at, created_at, updated_at"
    };
}

macro_rules! car_columns {
    () => {
        "c.id, c.dealer_id, c.make, c.model, c.year, c.price, c.description, c.status, \
         c.collection, c.is_verified, c.is_featured, c.is_premium_verified, c.is_just_arrived, \
         c.just_arrived_date, c.is_blocked, c.created_at, c.updated_at"
    };
}

macro_rules! listing_select {
    () => {
        concat!(
            "SELECT ",
            car_columns!(),
            ", d.business_name AS dealer_business_name, d.phone AS dealer_phone, \
             d.subscription_tier AS dealer_subscription_tier \
             FROM cars c JOIN dealers d ON d.id = c.dealer_id \
             WHERE c.is_blocked = false AND d.status = 'active' "
        )
    };
}

const SESSION_COLUMNS: &str =
    "id, dealer_id, session_token, ip_address, user_agent, expires_at, last_active_at, created_at";

const BANK_COLUMNS: &str = "id, dealer_id, account_name, account_number, bank_name, bank_code, \
     account_type, is_verified, verified_at, created_at, updated_at";

/// Listing row before its images are attached.
#[derive(FromRow)]
struct CarListingRow {
    #[sqlx(flatten)]
    car: Car,
    dealer_business_name: String,
    dealer_phone: String,
    dealer_subscription_tier: SubscriptionTier,
}

#[derive(FromRow)]
struct CarImageRow {
    car_id: Uuid,
    image_url: String,
    is_primary: bool,
}

#[derive(FromRow)]
struct BankDetailsRow {
    #[sqlx(flatten)]
    bank_details: DealerBankDetails,
    dealer_business_name: String,
    dealer_email: String,
    dealer_phone: String,
    dealer_is_verified: bool,
    dealer_subscription_tier: SubscriptionTier,
}

impl From<BankDetailsRow> for BankDetailsWithDealer {
    fn from(row: BankDetailsRow) -> Self {
        let dealer = DealerContact {
            id: row.bank_details.dealer_id,
            business_name: row.dealer_business_name,
            email: row.dealer_email,
            phone: row.dealer_phone,
            is_verified: row.dealer_is_verified,
            subscription_tier: row.dealer_subscription_tier,
        };
        Self {
            bank_details: row.bank_details,
            dealer,
        }
    }
}

impl PostgresRepository {
    /// attach_images
    ///
    /// Loads every image of the given listings in one round trip and groups them
    /// per car, primary image first.
    async fn attach_images(&self, rows: Vec<CarListingRow>) -> RepoResult<Vec<CarListing>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<Uuid> = rows.iter().map(|row| row.car.id).collect();
        let images = sqlx::query_as::<_, CarImageRow>(
            "SELECT car_id, image_url, is_primary FROM car_images \
             WHERE car_id = ANY($1) ORDER BY is_primary DESC, created_at ASC",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_car: HashMap<Uuid, Vec<CarImage>> = HashMap::new();
        for image in images {
            by_car.entry(image.car_id).or_default().push(CarImage {
                image_url: image.image_url,
                is_primary: image.is_primary,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| CarListing {
                images: by_car.remove(&row.car.id).unwrap_or_default(),
                dealer: DealerBadge {
                    id: row.car.dealer_id,
                    business_name: row.dealer_business_name,
                    phone: row.dealer_phone,
                    subscription_tier: row.dealer_subscription_tier,
                },
                car: row.car,
            })
            .collect())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_dealer(&self, id: Uuid) -> RepoResult<Option<Dealer>> {
        let dealer = sqlx::query_as::<_, Dealer>(concat!(
            "SELECT ",
            dealer_columns!(),
            " FROM dealers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dealer)
    }

    async fn get_dealer_by_email(&self, email: &str) -> RepoResult<Option<Dealer>> {
        let dealer = sqlx::query_as::<_, Dealer>(concat!(
            "SELECT ",
            dealer_columns!(),
            " FROM dealers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dealer)
    }

    async fn get_dealer_by_setup_token(
        &self,
        email: &str,
        token: &str,
    ) -> RepoResult<Option<Dealer>> {
        let dealer = sqlx::query_as::<_, Dealer>(concat!(
            "SELECT ",
            dealer_columns!(),
            " FROM dealers WHERE email = $1 AND setup_token = $2"
        ))
        .bind(email)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dealer)
    }

    /// create_dealer
    ///
    /// Plain insert; the unique index on `email` turns a duplicate into
    /// `RepositoryError::Conflict`, covering the race between two registrations.
    /// Dealers inserted as `verified` (admin onboarding) are stamped verified immediately.
    async fn create_dealer(&self, dealer: NewDealer) -> RepoResult<Dealer> {
        let created = sqlx::query_as::<_, Dealer>(concat!(
            "INSERT INTO dealers (business_name, email, phone, whatsapp, location, address, \
             business_registration_number, status, subscription_tier, password_hash, \
             password_set_at, setup_token, setup_token_expires_at, is_verified, verified_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, \
             CASE WHEN $10::text IS NULL THEN NULL ELSE NOW() END, $11, $12, \
             $8 = 'verified'::dealer_status, \
             CASE WHEN $8 = 'verified'::dealer_status THEN NOW() ELSE NULL END) \
             RETURNING ",
            dealer_columns!()
        ))
        .bind(&dealer.business_name)
        .bind(&dealer.email)
        .bind(&dealer.phone)
        .bind(&dealer.whatsapp)
        .bind(&dealer.location)
        .bind(&dealer.address)
        .bind(&dealer.business_registration_number)
        .bind(dealer.status)
        .bind(dealer.subscription_tier)
        .bind(&dealer.password_hash)
        .bind(&dealer.setup_token)
        .bind(dealer.setup_token_expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_dealers(&self, status: Option<DealerStatus>) -> RepoResult<Vec<Dealer>> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(concat!("SELECT ", dealer_columns!(), " FROM dealers"));
        if let Some(status) = status {
            builder.push(" WHERE status = ");
            builder.push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC");

        let dealers = builder
            .build_query_as::<Dealer>()
            .fetch_all(&self.pool)
            .await?;
        Ok(dealers)
    }

    async fn approve_dealer(
        &self,
        id: Uuid,
        admin_id: Uuid,
        notes: Option<String>,
    ) -> RepoResult<Option<Dealer>> {
        let dealer = sqlx::query_as::<_, Dealer>(concat!(
            "UPDATE dealers SET status = 'active', is_verified = true, verified_at = NOW(), \
             verified_by_admin_id = $2, verification_notes = $3, updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' AND password_hash IS NOT NULL \
             RETURNING ",
            dealer_columns!()
        ))
        .bind(id)
        .bind(admin_id)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dealer)
    }

    async fn complete_password_setup(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> RepoResult<Option<Dealer>> {
        let dealer = sqlx::query_as::<_, Dealer>(concat!(
            "UPDATE dealers SET password_hash = $2, password_set_at = NOW(), status = 'active', \
             setup_token = NULL, setup_token_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = 'verified' AND password_hash IS NULL \
             RETURNING ",
            dealer_columns!()
        ))
        .bind(id)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dealer)
    }

    async fn transition_dealer_status(
        &self,
        id: Uuid,
        from: DealerStatus,
        to: DealerStatus,
    ) -> RepoResult<Option<Dealer>> {
        let dealer = sqlx::query_as::<_, Dealer>(concat!(
            "UPDATE dealers SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING ",
            dealer_columns!()
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dealer)
    }

    async fn set_subscription_tier(
        &self,
        id: Uuid,
        tier: SubscriptionTier,
    ) -> RepoResult<Option<Dealer>> {
        let dealer = sqlx::query_as::<_, Dealer>(concat!(
            "UPDATE dealers SET subscription_tier = $2, updated_at = NOW() WHERE id = $1 RETURNING ",
            dealer_columns!()
        ))
        .bind(id)
        .bind(tier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dealer)
    }

    async fn record_dealer_login(&self, id: Uuid) -> RepoResult<()> {
        sqlx::query("UPDATE dealers SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_session(&self, session: NewSession) -> RepoResult<DealerSession> {
        let sql = format!(
            "INSERT INTO dealer_sessions (dealer_id, session_token, ip_address, user_agent, expires_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SESSION_COLUMNS}"
        );
        let created = sqlx::query_as::<_, DealerSession>(&sql)
            .bind(session.dealer_id)
            .bind(&session.session_token)
            .bind(&session.ip_address)
            .bind(&session.user_agent)
            .bind(session.expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_active_session(&self, token: &str) -> RepoResult<Option<DealerSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM dealer_sessions \
             WHERE session_token = $1 AND expires_at > NOW()"
        );
        let session = sqlx::query_as::<_, DealerSession>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn touch_session(&self, id: Uuid) -> RepoResult<()> {
        sqlx::query("UPDATE dealer_sessions SET last_active_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM dealer_sessions WHERE session_token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_dealer_sessions(&self, dealer_id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM dealer_sessions WHERE dealer_id = $1")
            .bind(dealer_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired_sessions(&self) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM dealer_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn get_active_admin(&self, auth_id: Uuid) -> RepoResult<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT id, auth_id, email, full_name, role, is_active FROM admins \
             WHERE auth_id = $1 AND is_active = true",
        )
        .bind(auth_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn record_auth_event(&self, event: AuthEvent) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO dealer_auth_logs (dealer_id, dealer_email, event_type, success, \
             ip_address, user_agent, admin_id, admin_notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.dealer_id)
        .bind(&event.dealer_email)
        .bind(event.event_type.as_str())
        .bind(event.success)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(event.admin_id)
        .bind(&event.admin_notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_bank_details(&self, dealer_id: Uuid) -> RepoResult<Option<DealerBankDetails>> {
        let sql = format!("SELECT {BANK_COLUMNS} FROM dealer_bank_details WHERE dealer_id = $1");
        let details = sqlx::query_as::<_, DealerBankDetails>(&sql)
            .bind(dealer_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(details)
    }

    async fn upsert_bank_details(
        &self,
        dealer_id: Uuid,
        input: BankDetailsInput,
    ) -> RepoResult<DealerBankDetails> {
        let sql = format!(
            "INSERT INTO dealer_bank_details \
             (dealer_id, account_name, account_number, bank_name, bank_code, account_type, is_verified) \
             VALUES ($1, $2, $3, $4, $5, $6, false) \
             ON CONFLICT (dealer_id) DO UPDATE SET \
                account_name = EXCLUDED.account_name, \
                account_number = EXCLUDED.account_number, \
                bank_name = EXCLUDED.bank_name, \
                bank_code = EXCLUDED.bank_code, \
                account_type = EXCLUDED.account_type, \
                is_verified = false, \
                verified_at = NULL, \
                updated_at = NOW() \
             RETURNING {BANK_COLUMNS}"
        );
        let details = sqlx::query_as::<_, DealerBankDetails>(&sql)
            .bind(dealer_id)
            .bind(&input.account_name)
            .bind(&input.account_number)
            .bind(&input.bank_name)
            .bind(&input.bank_code)
            .bind(&input.account_type)
            .fetch_one(&self.pool)
            .await?;
        Ok(details)
    }

    async fn delete_bank_details(&self, dealer_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM dealer_bank_details WHERE dealer_id = $1")
            .bind(dealer_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_bank_details(
        &self,
        dealer_id: Option<Uuid>,
    ) -> RepoResult<Vec<BankDetailsWithDealer>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT b.id, b.dealer_id, b.account_name, b.account_number, b.bank_name, \
             b.bank_code, b.account_type, b.is_verified, b.verified_at, b.created_at, b.updated_at, \
             d.business_name AS dealer_business_name, d.email AS dealer_email, \
             d.phone AS dealer_phone, d.is_verified AS dealer_is_verified, \
             d.subscription_tier AS dealer_subscription_tier \
             FROM dealer_bank_details b JOIN dealers d ON d.id = b.dealer_id",
        );
        if let Some(dealer_id) = dealer_id {
            builder.push(" WHERE b.dealer_id = ");
            builder.push_bind(dealer_id);
        }
        builder.push(" ORDER BY b.created_at DESC");

        let rows = builder
            .build_query_as::<BankDetailsRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_bank_details_verified(
        &self,
        id: Uuid,
        is_verified: bool,
    ) -> RepoResult<Option<DealerBankDetails>> {
        let sql = format!(
            "UPDATE dealer_bank_details SET is_verified = $2, \
             verified_at = CASE WHEN $2 THEN NOW() ELSE NULL END, updated_at = NOW() \
             WHERE id = $1 RETURNING {BANK_COLUMNS}"
        );
        let details = sqlx::query_as::<_, DealerBankDetails>(&sql)
            .bind(id)
            .bind(is_verified)
            .fetch_optional(&self.pool)
            .await?;
        Ok(details)
    }

    /// latest_arrivals
    ///
    /// "Just arrived" cars that have at least one image, newest arrival first.
    async fn latest_arrivals(&self, limit: i64) -> RepoResult<Vec<CarListing>> {
        let rows = sqlx::query_as::<_, CarListingRow>(concat!(
            listing_select!(),
            "AND c.is_just_arrived = true \
             AND EXISTS (SELECT 1 FROM car_images ci WHERE ci.car_id = c.id) \
             ORDER BY c.just_arrived_date DESC NULLS LAST LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        self.attach_images(rows).await
    }

    async fn cars_priced_from(&self, min_price: i64, limit: i64) -> RepoResult<Vec<CarListing>> {
        let rows = sqlx::query_as::<_, CarListingRow>(concat!(
            listing_select!(),
            "AND c.status = 'active' AND c.price >= $1 ORDER BY c.price DESC LIMIT $2"
        ))
        .bind(min_price)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        self.attach_images(rows).await
    }

    async fn premium_dealer_cars(&self, limit: i64) -> RepoResult<Vec<CarListing>> {
        let rows = sqlx::query_as::<_, CarListingRow>(concat!(
            listing_select!(),
            "AND c.status = 'active' AND d.subscription_tier IN ('premium', 'luxury') \
             ORDER BY c.created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        self.attach_images(rows).await
    }

    async fn list_dealer_cars(&self, dealer_id: Uuid) -> RepoResult<Vec<Car>> {
        let cars = sqlx::query_as::<_, Car>(concat!(
            "SELECT ",
            car_columns!(),
            " FROM cars c WHERE c.dealer_id = $1 ORDER BY c.created_at DESC"
        ))
        .bind(dealer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(cars)
    }

    /// create_car
    ///
    /// Inserts the car and its images in one transaction; the first image is primary.
    async fn create_car(&self, dealer_id: Uuid, car: NewCar) -> RepoResult<Car> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Car>(concat!(
            "WITH c AS (INSERT INTO cars (dealer_id, make, model, year, price, description, collection) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *) SELECT ",
            car_columns!(),
            " FROM c"
        ))
        .bind(dealer_id)
        .bind(&car.make)
        .bind(&car.model)
        .bind(car.year)
        .bind(car.price)
        .bind(&car.description)
        .bind(car.collection)
        .fetch_one(&mut *tx)
        .await?;

        for (position, url) in car.image_urls.iter().enumerate() {
            sqlx::query("INSERT INTO car_images (car_id, image_url, is_primary) VALUES ($1, $2, $3)")
                .bind(created.id)
                .bind(url)
                .bind(position == 0)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// update_car_flags
    ///
    /// COALESCE keeps every flag that was not supplied. Switching `is_just_arrived` on
    /// stamps the arrival date; switching it off clears it.
    async fn update_car_flags(&self, id: Uuid, flags: CarFlagsUpdate) -> RepoResult<Option<Car>> {
        let car = sqlx::query_as::<_, Car>(concat!(
            "WITH c AS (UPDATE cars SET \
                is_verified = COALESCE($2, is_verified), \
                is_featured = COALESCE($3, is_featured), \
                is_premium_verified = COALESCE($4, is_premium_verified), \
                just_arrived_date = CASE \
                    WHEN $5 = true AND is_just_arrived = false THEN NOW() \
                    WHEN $5 = false THEN NULL \
                    ELSE just_arrived_date END, \
                is_just_arrived = COALESCE($5, is_just_arrived), \
                is_blocked = COALESCE($6, is_blocked), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING *) SELECT ",
            car_columns!(),
            " FROM c"
        ))
        .bind(id)
        .bind(flags.is_verified)
        .bind(flags.is_featured)
        .bind(flags.is_premium_verified)
        .bind(flags.is_just_arrived)
        .bind(flags.is_blocked)
        .fetch_optional(&self.pool)
        .await?;
        Ok(car)
    }

    /// get_stats
    ///
    /// The three aggregates are independent, so they run concurrently.
    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        let dealers = sqlx::query_as::<_, (DealerStatus, i64)>(
            "SELECT status, COUNT(*) FROM dealers GROUP BY status",
        )
        .fetch_all(&self.pool);
        let cars = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_blocked) FROM cars",
        )
        .fetch_one(&self.pool);
        let bank = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM dealer_bank_details WHERE is_verified = false",
        )
        .fetch_one(&self.pool);

        let (dealer_counts, (total_cars, blocked_cars), pending_bank_verifications) =
            tokio::try_join!(dealers, cars, bank)?;

        let mut stats = AdminDashboardStats {
            total_cars,
            blocked_cars,
            pending_bank_verifications,
            ..AdminDashboardStats::default()
        };
        for (status, count) in dealer_counts {
            stats.total_dealers += count;
            match status {
                DealerStatus::Pending => stats.pending_dealers = count,
                DealerStatus::Verified => stats.verified_dealers = count,
                DealerStatus::Active => stats.active_dealers = count,
                DealerStatus::Suspended => stats.suspended_dealers = count,
            }
        }
        Ok(stats)
    }
}

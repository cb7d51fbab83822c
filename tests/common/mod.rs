#![allow(dead_code)]

use std::sync::{Arc, LazyLock, Mutex};

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use justcars_api::{
    AppState,
    auth::{AdminUser, AuthDealer},
    config::AppConfig,
    error::{RepoResult, RepositoryError},
    models::{
        Admin, AdminDashboardStats, AdminRole, AuthEvent, BankDetailsInput,
        BankDetailsWithDealer, Car, CarFlagsUpdate, CarImage, CarListing, Dealer, DealerBadge,
        DealerBankDetails, DealerContact, DealerSession, DealerStatus, NewCar, NewDealer,
        NewSession, SubscriptionTier,
    },
    password::hash_password,
    repository::Repository,
    storage::MockStorageService,
};
use serde_json::Value;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "Str0ngPassword";

/// Hashing is slow in debug builds, so every fixture shares one hash.
pub static TEST_PASSWORD_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password(TEST_PASSWORD).expect("hash test password"));

// --- In-memory Repository ---

#[derive(Default)]
pub struct RepoData {
    pub dealers: Vec<Dealer>,
    pub sessions: Vec<DealerSession>,
    pub admins: Vec<Admin>,
    pub events: Vec<AuthEvent>,
    pub bank_details: Vec<DealerBankDetails>,
    pub cars: Vec<Car>,
    pub images: Vec<(Uuid, CarImage)>,
}

/// InMemoryRepo
///
/// Stateful stand-in for `PostgresRepository` that mirrors its filters and guarded
/// updates, so handler flows can be exercised end to end without a database.
#[derive(Default)]
pub struct InMemoryRepo {
    pub data: Mutex<RepoData>,
    /// Every car feed query fails with a database error.
    pub fail_car_feeds: bool,
    /// The price feed ignores its floor, as a misbehaving backend would.
    pub ignore_price_floor: bool,
    /// Another request moves the dealer to this status just before a guarded update runs.
    pub status_race: Option<DealerStatus>,
}

fn db_error() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

impl InMemoryRepo {
    pub fn with_dealers(dealers: Vec<Dealer>) -> Self {
        let repo = Self::default();
        repo.data.lock().unwrap().dealers = dealers;
        repo
    }

    pub fn add_admin(&self, admin: Admin) {
        self.data.lock().unwrap().admins.push(admin);
    }

    pub fn add_car(&self, car: Car, image_urls: &[&str]) {
        let mut data = self.data.lock().unwrap();
        for (i, url) in image_urls.iter().enumerate() {
            data.images.push((
                car.id,
                CarImage {
                    image_url: url.to_string(),
                    is_primary: i == 0,
                },
            ));
        }
        data.cars.push(car);
    }

    pub fn add_session(&self, session: DealerSession) {
        self.data.lock().unwrap().sessions.push(session);
    }

    pub fn add_bank_details(&self, details: DealerBankDetails) {
        self.data.lock().unwrap().bank_details.push(details);
    }

    pub fn dealer(&self, id: Uuid) -> Option<Dealer> {
        self.data.lock().unwrap().dealers.iter().find(|d| d.id == id).cloned()
    }

    pub fn events(&self) -> Vec<AuthEvent> {
        self.data.lock().unwrap().events.clone()
    }

    pub fn session_count(&self) -> usize {
        self.data.lock().unwrap().sessions.len()
    }

    fn listings<F>(&self, filter: F) -> Vec<CarListing>
    where
        F: Fn(&Car, &Dealer) -> bool,
    {
        let data = self.data.lock().unwrap();
        data.cars
            .iter()
            .filter_map(|car| {
                let dealer = data.dealers.iter().find(|d| d.id == car.dealer_id)?;
                if car.is_blocked || dealer.status != DealerStatus::Active || !filter(car, dealer)
                {
                    return None;
                }
                Some(CarListing {
                    car: car.clone(),
                    dealer: DealerBadge {
                        id: dealer.id,
                        business_name: dealer.business_name.clone(),
                        phone: dealer.phone.clone(),
                        subscription_tier: dealer.subscription_tier,
                    },
                    images: data
                        .images
                        .iter()
                        .filter(|(car_id, _)| *car_id == car.id)
                        .map(|(_, image)| image.clone())
                        .collect(),
                })
            })
            .collect()
    }

    fn update_dealer<F>(&self, id: Uuid, guard: impl Fn(&Dealer) -> bool, apply: F) -> Option<Dealer>
    where
        F: FnOnce(&mut Dealer),
    {
        let mut data = self.data.lock().unwrap();
        let dealer = data.dealers.iter_mut().find(|d| d.id == id)?;
        if let Some(status) = self.status_race {
            dealer.status = status;
        }
        if !guard(dealer) {
            return None;
        }
        apply(dealer);
        dealer.updated_at = Utc::now();
        Some(dealer.clone())
    }
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_dealer(&self, id: Uuid) -> RepoResult<Option<Dealer>> {
        Ok(self.dealer(id))
    }

    async fn get_dealer_by_email(&self, email: &str) -> RepoResult<Option<Dealer>> {
        let data = self.data.lock().unwrap();
        Ok(data.dealers.iter().find(|d| d.email == email).cloned())
    }

    async fn get_dealer_by_setup_token(
        &self,
        email: &str,
        token: &str,
    ) -> RepoResult<Option<Dealer>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .dealers
            .iter()
            .find(|d| d.email == email && d.setup_token.as_deref() == Some(token))
            .cloned())
    }

    async fn create_dealer(&self, dealer: NewDealer) -> RepoResult<Dealer> {
        let mut data = self.data.lock().unwrap();
        if data.dealers.iter().any(|d| d.email == dealer.email) {
            return Err(RepositoryError::Conflict("dealers_email_key".into()));
        }
        let now = Utc::now();
        let verified = dealer.status == DealerStatus::Verified;
        let created = Dealer {
            id: Uuid::new_v4(),
            business_name: dealer.business_name,
            email: dealer.email,
            phone: dealer.phone,
            whatsapp: dealer.whatsapp,
            location: dealer.location,
            address: dealer.address,
            business_registration_number: dealer.business_registration_number,
            status: dealer.status,
            subscription_tier: dealer.subscription_tier,
            is_verified: verified,
            verified_at: verified.then_some(now),
            password_set_at: dealer.password_hash.as_ref().map(|_| now),
            password_hash: dealer.password_hash,
            setup_token: dealer.setup_token,
            setup_token_expires_at: dealer.setup_token_expires_at,
            created_at: now,
            updated_at: now,
            ..Dealer::default()
        };
        data.dealers.push(created.clone());
        Ok(created)
    }

    async fn list_dealers(&self, status: Option<DealerStatus>) -> RepoResult<Vec<Dealer>> {
        let data = self.data.lock().unwrap();
        let mut dealers: Vec<Dealer> = data
            .dealers
            .iter()
            .filter(|d| status.is_none_or(|s| d.status == s))
            .cloned()
            .collect();
        dealers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(dealers)
    }

    async fn approve_dealer(
        &self,
        id: Uuid,
        admin_id: Uuid,
        notes: Option<String>,
    ) -> RepoResult<Option<Dealer>> {
        Ok(self.update_dealer(
            id,
            |d| d.status == DealerStatus::Pending && d.password_hash.is_some(),
            |d| {
                d.status = DealerStatus::Active;
                d.is_verified = true;
                d.verified_at = Some(Utc::now());
                d.verified_by_admin_id = Some(admin_id);
                d.verification_notes = notes;
            },
        ))
    }

    async fn complete_password_setup(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> RepoResult<Option<Dealer>> {
        Ok(self.update_dealer(
            id,
            |d| d.status == DealerStatus::Verified && d.password_hash.is_none(),
            |d| {
                d.password_hash = Some(password_hash.to_string());
                d.password_set_at = Some(Utc::now());
                d.status = DealerStatus::Active;
                d.setup_token = None;
                d.setup_token_expires_at = None;
            },
        ))
    }

    async fn transition_dealer_status(
        &self,
        id: Uuid,
        from: DealerStatus,
        to: DealerStatus,
    ) -> RepoResult<Option<Dealer>> {
        Ok(self.update_dealer(id, |d| d.status == from, |d| d.status = to))
    }

    async fn set_subscription_tier(
        &self,
        id: Uuid,
        tier: SubscriptionTier,
    ) -> RepoResult<Option<Dealer>> {
        Ok(self.update_dealer(id, |_| true, |d| d.subscription_tier = tier))
    }

    async fn record_dealer_login(&self, id: Uuid) -> RepoResult<()> {
        self.update_dealer(id, |_| true, |d| d.last_login_at = Some(Utc::now()));
        Ok(())
    }

    async fn create_session(&self, session: NewSession) -> RepoResult<DealerSession> {
        let now = Utc::now();
        let created = DealerSession {
            id: Uuid::new_v4(),
            dealer_id: session.dealer_id,
            session_token: session.session_token,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            expires_at: session.expires_at,
            last_active_at: now,
            created_at: now,
        };
        self.data.lock().unwrap().sessions.push(created.clone());
        Ok(created)
    }

    async fn find_active_session(&self, token: &str) -> RepoResult<Option<DealerSession>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .sessions
            .iter()
            .find(|s| s.session_token == token && !s.is_expired())
            .cloned())
    }

    async fn touch_session(&self, id: Uuid) -> RepoResult<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(session) = data.sessions.iter_mut().find(|s| s.id == id) {
            session.last_active_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> RepoResult<bool> {
        let mut data = self.data.lock().unwrap();
        let before = data.sessions.len();
        data.sessions.retain(|s| s.session_token != token);
        Ok(data.sessions.len() < before)
    }

    async fn delete_dealer_sessions(&self, dealer_id: Uuid) -> RepoResult<u64> {
        let mut data = self.data.lock().unwrap();
        let before = data.sessions.len();
        data.sessions.retain(|s| s.dealer_id != dealer_id);
        Ok((before - data.sessions.len()) as u64)
    }

    async fn delete_expired_sessions(&self) -> RepoResult<u64> {
        let mut data = self.data.lock().unwrap();
        let before = data.sessions.len();
        data.sessions.retain(|s| !s.is_expired());
        Ok((before - data.sessions.len()) as u64)
    }

    async fn get_active_admin(&self, auth_id: Uuid) -> RepoResult<Option<Admin>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .admins
            .iter()
            .find(|a| a.auth_id == auth_id && a.is_active)
            .cloned())
    }

    async fn record_auth_event(&self, event: AuthEvent) -> RepoResult<()> {
        self.data.lock().unwrap().events.push(event);
        Ok(())
    }

    async fn get_bank_details(&self, dealer_id: Uuid) -> RepoResult<Option<DealerBankDetails>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .bank_details
            .iter()
            .find(|b| b.dealer_id == dealer_id)
            .cloned())
    }

    async fn upsert_bank_details(
        &self,
        dealer_id: Uuid,
        input: BankDetailsInput,
    ) -> RepoResult<DealerBankDetails> {
        let mut data = self.data.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = data.bank_details.iter_mut().find(|b| b.dealer_id == dealer_id) {
            existing.account_name = input.account_name;
            existing.account_number = input.account_number;
            existing.bank_name = input.bank_name;
            existing.bank_code = input.bank_code;
            existing.account_type = input.account_type;
            existing.is_verified = false;
            existing.verified_at = None;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let created = DealerBankDetails {
            id: Uuid::new_v4(),
            dealer_id,
            account_name: input.account_name,
            account_number: input.account_number,
            bank_name: input.bank_name,
            bank_code: input.bank_code,
            account_type: input.account_type,
            is_verified: false,
            verified_at: None,
            created_at: now,
            updated_at: now,
        };
        data.bank_details.push(created.clone());
        Ok(created)
    }

    async fn delete_bank_details(&self, dealer_id: Uuid) -> RepoResult<bool> {
        let mut data = self.data.lock().unwrap();
        let before = data.bank_details.len();
        data.bank_details.retain(|b| b.dealer_id != dealer_id);
        Ok(data.bank_details.len() < before)
    }

    async fn list_bank_details(
        &self,
        dealer_id: Option<Uuid>,
    ) -> RepoResult<Vec<BankDetailsWithDealer>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .bank_details
            .iter()
            .filter(|b| dealer_id.is_none_or(|id| b.dealer_id == id))
            .filter_map(|b| {
                let dealer = data.dealers.iter().find(|d| d.id == b.dealer_id)?;
                Some(BankDetailsWithDealer {
                    bank_details: b.clone(),
                    dealer: DealerContact {
                        id: dealer.id,
                        business_name: dealer.business_name.clone(),
                        email: dealer.email.clone(),
                        phone: dealer.phone.clone(),
                        is_verified: dealer.is_verified,
                        subscription_tier: dealer.subscription_tier,
                    },
                })
            })
            .collect())
    }

    async fn set_bank_details_verified(
        &self,
        id: Uuid,
        is_verified: bool,
    ) -> RepoResult<Option<DealerBankDetails>> {
        let mut data = self.data.lock().unwrap();
        let Some(details) = data.bank_details.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        details.is_verified = is_verified;
        details.verified_at = is_verified.then(Utc::now);
        Ok(Some(details.clone()))
    }

    async fn latest_arrivals(&self, limit: i64) -> RepoResult<Vec<CarListing>> {
        if self.fail_car_feeds {
            return Err(db_error());
        }
        let mut cars = self.listings(|car, _| car.is_just_arrived);
        cars.retain(|listing| !listing.images.is_empty());
        cars.sort_by(|a, b| b.car.just_arrived_date.cmp(&a.car.just_arrived_date));
        cars.truncate(limit as usize);
        Ok(cars)
    }

    async fn cars_priced_from(&self, min_price: i64, limit: i64) -> RepoResult<Vec<CarListing>> {
        if self.fail_car_feeds {
            return Err(db_error());
        }
        let ignore_floor = self.ignore_price_floor;
        let mut cars =
            self.listings(|car, _| car.status == "active" && (ignore_floor || car.price >= min_price));
        cars.sort_by(|a, b| b.car.price.cmp(&a.car.price));
        cars.truncate(limit as usize);
        Ok(cars)
    }

    async fn premium_dealer_cars(&self, limit: i64) -> RepoResult<Vec<CarListing>> {
        if self.fail_car_feeds {
            return Err(db_error());
        }
        let mut cars = self.listings(|car, dealer| {
            car.status == "active" && dealer.subscription_tier != SubscriptionTier::Basic
        });
        cars.sort_by(|a, b| b.car.created_at.cmp(&a.car.created_at));
        cars.truncate(limit as usize);
        Ok(cars)
    }

    async fn list_dealer_cars(&self, dealer_id: Uuid) -> RepoResult<Vec<Car>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .cars
            .iter()
            .filter(|c| c.dealer_id == dealer_id)
            .cloned()
            .collect())
    }

    async fn create_car(&self, dealer_id: Uuid, car: NewCar) -> RepoResult<Car> {
        let now = Utc::now();
        let created = Car {
            id: Uuid::new_v4(),
            dealer_id,
            make: car.make,
            model: car.model,
            year: car.year,
            price: car.price,
            description: car.description,
            status: "active".into(),
            collection: car.collection,
            created_at: now,
            updated_at: now,
            ..Car::default()
        };
        let urls: Vec<&str> = car.image_urls.iter().map(String::as_str).collect();
        self.add_car(created.clone(), &urls);
        Ok(created)
    }

    async fn update_car_flags(&self, id: Uuid, flags: CarFlagsUpdate) -> RepoResult<Option<Car>> {
        let mut data = self.data.lock().unwrap();
        let Some(car) = data.cars.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        match flags.is_just_arrived {
            Some(true) if !car.is_just_arrived => car.just_arrived_date = Some(Utc::now()),
            Some(false) => car.just_arrived_date = None,
            _ => {}
        }
        car.is_verified = flags.is_verified.unwrap_or(car.is_verified);
        car.is_featured = flags.is_featured.unwrap_or(car.is_featured);
        car.is_premium_verified = flags.is_premium_verified.unwrap_or(car.is_premium_verified);
        car.is_just_arrived = flags.is_just_arrived.unwrap_or(car.is_just_arrived);
        car.is_blocked = flags.is_blocked.unwrap_or(car.is_blocked);
        Ok(Some(car.clone()))
    }

    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        let data = self.data.lock().unwrap();
        let count = |status: DealerStatus| {
            data.dealers.iter().filter(|d| d.status == status).count() as i64
        };
        Ok(AdminDashboardStats {
            total_dealers: data.dealers.len() as i64,
            pending_dealers: count(DealerStatus::Pending),
            verified_dealers: count(DealerStatus::Verified),
            active_dealers: count(DealerStatus::Active),
            suspended_dealers: count(DealerStatus::Suspended),
            total_cars: data.cars.len() as i64,
            blocked_cars: data.cars.iter().filter(|c| c.is_blocked).count() as i64,
            pending_bank_verifications: data
                .bank_details
                .iter()
                .filter(|b| !b.is_verified)
                .count() as i64,
        })
    }
}

// --- Fixtures ---

pub fn test_dealer(status: DealerStatus, tier: SubscriptionTier) -> Dealer {
    let id = Uuid::new_v4();
    Dealer {
        id,
        business_name: "Lekki Motors".into(),
        email: format!("dealer-{}@justcars.ng", id.simple()),
        phone: "+2348012345678".into(),
        whatsapp: Some("+2348012345678".into()),
        location: "Lagos".into(),
        status,
        subscription_tier: tier,
        is_verified: status == DealerStatus::Active,
        password_hash: Some(TEST_PASSWORD_HASH.clone()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        ..Dealer::default()
    }
}

pub fn test_car(dealer_id: Uuid, price: i64) -> Car {
    let now = Utc::now();
    Car {
        id: Uuid::new_v4(),
        dealer_id,
        make: "Toyota".into(),
        model: "Land Cruiser".into(),
        year: 2024,
        price,
        status: "active".into(),
        created_at: now,
        updated_at: now,
        ..Car::default()
    }
}

pub fn test_admin(role: AdminRole) -> Admin {
    Admin {
        id: Uuid::new_v4(),
        auth_id: Uuid::new_v4(),
        email: "ops@justcars.ng".into(),
        full_name: Some("Ops Admin".into()),
        role,
        is_active: true,
    }
}

pub fn admin_user(role: AdminRole) -> AdminUser {
    AdminUser {
        admin: test_admin(role),
    }
}

pub fn auth_dealer(dealer: &Dealer) -> AuthDealer {
    AuthDealer {
        dealer: dealer.clone(),
        session_id: Uuid::new_v4(),
    }
}

/// Builds an `AppState` around the repository and hands back a typed handle to it.
pub fn create_test_state(repo: InMemoryRepo) -> (AppState, Arc<InMemoryRepo>) {
    create_test_state_with(repo, MockStorageService::new(), AppConfig::default())
}

pub fn create_test_state_with(
    repo: InMemoryRepo,
    storage: MockStorageService,
    config: AppConfig,
) -> (AppState, Arc<InMemoryRepo>) {
    let repo = Arc::new(repo);
    let state = AppState::new(repo.clone(), Arc::new(storage), config);
    (state, repo)
}

/// Drains any response into its status and parsed JSON body.
pub async fn into_json(response: impl IntoResponse) -> (StatusCode, Value) {
    let response: Response = response.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, body)
}

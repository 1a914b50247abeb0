//! Bloodlink Core Library
//!
//! Veterinary blood-donor matching and appointment lifecycle.
//!
//! # Architecture
//!
//! ```text
//!   Clinic UI ──► Candidate Finder ──► Eligibility + Scorer
//!                        │
//!                 clinic picks donor
//!                        │
//!        ┌───────────────▼───────────────┐
//!        │         create_match          │
//!        │  appointment + notifications  │
//!        │  + pending_matches (1 batch)  │
//!        └───────────────┬───────────────┘
//!                        │
//!                   Donor inbox
//!                        │
//!            ┌───────────┴───────────┐
//!            ▼                       ▼
//!       accept_match           decline_match
//!     (CAS on status)         (CAS on status)
//!            │                       │
//!            ▼                       ▼
//!   Patient + clinic inbox     Patient inbox
//!            │
//!            ▼
//!  complete / cancel / close (clinic)
//! ```
//!
//! # Core Principle
//!
//! **First response wins.** Every status change is a compare-and-swap inside
//! one atomic batch; a late response fails with `AlreadyResolved` and changes
//! nothing.
//!
//! # Modules
//!
//! - [`db`]: SQLite key-document store with atomic batches and a hash-chained ledger
//! - [`models`]: Domain types (Donor, PatientRequest, Appointment, Notification, etc.)
//! - [`matching`]: Eligibility, scoring and candidate search
//! - [`lifecycle`]: Match, response and clinic follow-up transactions
//! - [`config`]: Settings loaded from file and environment

pub mod clock;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod matching;
pub mod models;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use crate::config::{EligibilityPolicy, Settings, StoreSettings};
pub use db::{Database, DbError, WriteOp};
pub use lifecycle::{CounterAudit, Lifecycle, LinkRequest};
pub use matching::{CandidateFinder, DonorCandidate, Eligibility, MatchError, SortOrder};
pub use models::{
    Appointment, AppointmentStatus, Clinic, Donor, Notification, NotificationType,
    PatientRequest, RequestStatus, Urgency, UserRole,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum BloodlinkError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Already resolved: {0}")]
    AlreadyResolved(String),

    #[error("Request closed: {0}")]
    RequestClosed(String),

    #[error("Not allowed: {0}")]
    NotAllowed(String),

    #[error("Write failed, nothing applied: {0}")]
    PartialWriteFailure(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for BloodlinkError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => BloodlinkError::NotFound(what),
            db::DbError::Json(e) => BloodlinkError::SerializationError(e.to_string()),
            db::DbError::Constraint(msg) => BloodlinkError::InvalidInput(msg),
            other => BloodlinkError::DatabaseError(other.to_string()),
        }
    }
}

impl From<matching::MatchError> for BloodlinkError {
    fn from(e: matching::MatchError) -> Self {
        match e {
            MatchError::NotFound(what) => BloodlinkError::NotFound(what),
            e @ MatchError::AlreadyResolved { .. } => BloodlinkError::AlreadyResolved(e.to_string()),
            MatchError::Validation(msg) => BloodlinkError::InvalidInput(msg),
            MatchError::RequestClosed(msg) => BloodlinkError::RequestClosed(msg),
            MatchError::WrongActor(msg) => BloodlinkError::NotAllowed(msg),
            MatchError::PartialWriteFailure(e) => BloodlinkError::PartialWriteFailure(e.to_string()),
            MatchError::Database(e) => e.into(),
        }
    }
}

impl From<serde_json::Error> for BloodlinkError {
    fn from(e: serde_json::Error) -> Self {
        BloodlinkError::SerializationError(e.to_string())
    }
}

impl From<::config::ConfigError> for BloodlinkError {
    fn from(e: ::config::ConfigError) -> Self {
        BloodlinkError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for BloodlinkError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        BloodlinkError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path with default settings.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<BloodlinkCore>, BloodlinkError> {
    let settings = Settings {
        store: StoreSettings {
            path,
            ..StoreSettings::default()
        },
        ..Settings::default()
    };
    BloodlinkCore::with_settings(settings, Arc::new(SystemClock))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<BloodlinkCore>, BloodlinkError> {
    BloodlinkCore::with_settings(Settings::default(), Arc::new(SystemClock))
}

/// Open the database described by a settings file, or by
/// `config/bloodlink.toml` and `BLOODLINK__*` variables when no path is given.
#[uniffi::export]
pub fn open_database_from_config(
    config_path: Option<String>,
) -> Result<Arc<BloodlinkCore>, BloodlinkError> {
    let settings = match config_path {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    BloodlinkCore::with_settings(settings, Arc::new(SystemClock))
}

/// Install a global `tracing` subscriber.
///
/// `filter` uses `EnvFilter` syntax; without one `RUST_LOG` is read, falling
/// back to `info`. Returns false when a subscriber was already installed.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct BloodlinkCore {
    db: Arc<Mutex<Database>>,
    settings: Settings,
    clock: Arc<dyn Clock>,
}

impl BloodlinkCore {
    /// Open the store described by `settings`, reading time from `clock`.
    pub fn with_settings(
        settings: Settings,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, BloodlinkError> {
        settings.eligibility.validate()?;
        let db = Database::open_with_settings(&settings.store)?;
        tracing::info!(
            path = %settings.store.path,
            min_interval_days = settings.eligibility.min_interval_days,
            "bloodlink core opened"
        );
        Ok(Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            settings,
            clock,
        }))
    }

    fn policy(&self) -> &EligibilityPolicy {
        &self.settings.eligibility
    }
}

#[uniffi::export]
impl BloodlinkCore {
    // =========================================================================
    // Donor / Clinic / Request Operations
    // =========================================================================

    /// Add or update a donor profile.
    ///
    /// The creation timestamp of an existing profile is kept.
    pub fn upsert_donor(&self, donor: FfiDonor) -> Result<FfiDonor, BloodlinkError> {
        let db = self.db.lock()?;
        let now = self.clock.now();
        let created_at = db.get_donor(&donor.id)?.map(|d| d.created_at);
        let mut donor = donor.into_donor(now)?;
        donor.created_at = created_at.unwrap_or(now);
        donor.updated_at = now;
        db.put_donor(&donor)?;
        Ok(donor.into())
    }

    /// Get a donor by ID.
    pub fn get_donor(&self, id: String) -> Result<Option<FfiDonor>, BloodlinkError> {
        let db = self.db.lock()?;
        Ok(db.get_donor(&id)?.map(|d| d.into()))
    }

    /// Add or update a clinic.
    pub fn upsert_clinic(&self, clinic: FfiClinic) -> Result<(), BloodlinkError> {
        let db = self.db.lock()?;
        let created_at = db
            .get_clinic(&clinic.id)?
            .map(|c| c.created_at)
            .unwrap_or_else(|| self.clock.now());
        db.put_clinic(&Clinic {
            id: clinic.id,
            name: clinic.name,
            city: clinic.city,
            created_at,
        })?;
        Ok(())
    }

    /// Open a new blood request for a patient.
    pub fn create_request(
        &self,
        patient_id: String,
        dog_name: String,
        blood_type: String,
        urgency: String,
        quantity_ml: u32,
        city: String,
    ) -> Result<FfiPatientRequest, BloodlinkError> {
        let urgency = Urgency::parse(&urgency)
            .ok_or_else(|| BloodlinkError::InvalidInput(format!("Unknown urgency: {}", urgency)))?;
        if blood_type.trim().is_empty() {
            return Err(BloodlinkError::InvalidInput("blood_type is required".into()));
        }

        let db = self.db.lock()?;
        let mut request =
            PatientRequest::new(patient_id, dog_name, blood_type, urgency, quantity_ml, city);
        request.created_at = self.clock.now();
        request.updated_at = request.created_at;
        db.put_request(&request)?;
        Ok(FfiPatientRequest::new(request, self.clock.now()))
    }

    /// Get a request by ID.
    pub fn get_request(&self, id: String) -> Result<Option<FfiPatientRequest>, BloodlinkError> {
        let db = self.db.lock()?;
        let now = self.clock.now();
        Ok(db
            .get_request(&id)?
            .map(|r| FfiPatientRequest::new(r, now)))
    }

    /// A patient's requests, newest first.
    pub fn requests_for_patient(
        &self,
        patient_id: String,
    ) -> Result<Vec<FfiPatientRequest>, BloodlinkError> {
        let db = self.db.lock()?;
        let now = self.clock.now();
        let requests = db.requests_for_patient(&patient_id)?;
        Ok(requests
            .into_iter()
            .map(|r| FfiPatientRequest::new(r, now))
            .collect())
    }

    /// List open requests, optionally for one blood type.
    pub fn open_requests(
        &self,
        blood_type: Option<String>,
    ) -> Result<Vec<FfiPatientRequest>, BloodlinkError> {
        let db = self.db.lock()?;
        let now = self.clock.now();
        let requests = db.open_requests(blood_type.as_deref())?;
        Ok(requests
            .into_iter()
            .map(|r| FfiPatientRequest::new(r, now))
            .collect())
    }

    // =========================================================================
    // Matching Operations
    // =========================================================================

    /// Ranked donor candidates for a request.
    pub fn find_candidates(
        &self,
        request_id: String,
        clinic_id: Option<String>,
        sort: FfiSortOrder,
    ) -> Result<Vec<FfiDonorCandidate>, BloodlinkError> {
        let db = self.db.lock()?;
        let finder = CandidateFinder::new(&db, self.policy());
        let candidates = finder.find(
            &request_id,
            clinic_id.as_deref(),
            self.clock.today(),
            sort.into(),
        )?;
        Ok(candidates.into_iter().map(|c| c.into()).collect())
    }

    /// Eligibility of one donor today.
    pub fn donor_eligibility(&self, donor_id: String) -> Result<FfiEligibility, BloodlinkError> {
        let db = self.db.lock()?;
        let donor = db
            .get_donor(&donor_id)?
            .ok_or_else(|| BloodlinkError::NotFound(format!("donor {}", donor_id)))?;
        let eligibility = matching::evaluate(&donor, self.clock.today(), self.policy());
        Ok(eligibility.into())
    }

    // =========================================================================
    // Lifecycle Operations
    // =========================================================================

    /// Link a donor to a request.
    pub fn create_match(&self, link: FfiLinkRequest) -> Result<FfiAppointment, BloodlinkError> {
        let link = link.into_link_request()?;
        let db = self.db.lock()?;
        let lifecycle = Lifecycle::new(&db, self.clock.as_ref(), self.policy());
        Ok(lifecycle.create_match(&link)?.into())
    }

    /// Donor accepts; `date` is `YYYY-MM-DD`.
    pub fn accept_match(
        &self,
        appointment_id: String,
        date: String,
        time: String,
        donor_id: String,
    ) -> Result<FfiAppointment, BloodlinkError> {
        let date = parse_optional_date(&date)?;
        let db = self.db.lock()?;
        let lifecycle = Lifecycle::new(&db, self.clock.as_ref(), self.policy());
        Ok(lifecycle
            .accept_match(&appointment_id, date, &time, &donor_id)?
            .into())
    }

    /// Donor declines.
    pub fn decline_match(
        &self,
        appointment_id: String,
        donor_id: String,
    ) -> Result<FfiAppointment, BloodlinkError> {
        let db = self.db.lock()?;
        let lifecycle = Lifecycle::new(&db, self.clock.as_ref(), self.policy());
        Ok(lifecycle.decline_match(&appointment_id, &donor_id)?.into())
    }

    /// Clinic cancels a pending or confirmed appointment.
    pub fn cancel_appointment(
        &self,
        appointment_id: String,
        clinic_id: String,
        reason: Option<String>,
    ) -> Result<FfiAppointment, BloodlinkError> {
        let db = self.db.lock()?;
        let lifecycle = Lifecycle::new(&db, self.clock.as_ref(), self.policy());
        Ok(lifecycle
            .cancel_appointment(&appointment_id, &clinic_id, reason.as_deref())?
            .into())
    }

    /// Clinic records a completed donation.
    pub fn complete_appointment(
        &self,
        appointment_id: String,
        clinic_id: String,
    ) -> Result<FfiAppointment, BloodlinkError> {
        let db = self.db.lock()?;
        let lifecycle = Lifecycle::new(&db, self.clock.as_ref(), self.policy());
        Ok(lifecycle
            .complete_appointment(&appointment_id, &clinic_id)?
            .into())
    }

    /// Clinic closes a request; `outcome` is `completed` or `rejected`.
    pub fn close_request(
        &self,
        request_id: String,
        clinic_id: String,
        outcome: String,
    ) -> Result<FfiPatientRequest, BloodlinkError> {
        let outcome = RequestStatus::parse(&outcome)
            .ok_or_else(|| BloodlinkError::InvalidInput(format!("Unknown outcome: {}", outcome)))?;
        let db = self.db.lock()?;
        let lifecycle = Lifecycle::new(&db, self.clock.as_ref(), self.policy());
        let request = lifecycle.close_request(&request_id, &clinic_id, outcome)?;
        Ok(FfiPatientRequest::new(request, self.clock.now()))
    }

    /// Appointments linked to a request, oldest first.
    pub fn appointments_for_request(
        &self,
        request_id: String,
    ) -> Result<Vec<FfiAppointment>, BloodlinkError> {
        let db = self.db.lock()?;
        let appointments = db.appointments_for_request(&request_id)?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    /// Appointments for a donor.
    pub fn appointments_for_donor(
        &self,
        donor_id: String,
    ) -> Result<Vec<FfiAppointment>, BloodlinkError> {
        let db = self.db.lock()?;
        let appointments = db.appointments_for_donor(&donor_id)?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    /// Compare a request's counters with its appointments.
    pub fn audit_request_counters(
        &self,
        request_id: String,
    ) -> Result<FfiCounterAudit, BloodlinkError> {
        let db = self.db.lock()?;
        let lifecycle = Lifecycle::new(&db, self.clock.as_ref(), self.policy());
        Ok(lifecycle.audit_request_counters(&request_id)?.into())
    }

    // =========================================================================
    // Inbox Operations
    // =========================================================================

    /// A user's notifications, newest first.
    pub fn notifications_for_user(
        &self,
        user_id: String,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<FfiNotification>, BloodlinkError> {
        let db = self.db.lock()?;
        let notifications = db.notifications_for_user(&user_id, unread_only, limit as usize)?;
        Ok(notifications.into_iter().map(|n| n.into()).collect())
    }

    /// Number of unread notifications for a user.
    pub fn unread_count(&self, user_id: String) -> Result<u32, BloodlinkError> {
        let db = self.db.lock()?;
        Ok(db.unread_notification_count(&user_id)?)
    }

    /// Mark a notification read.
    pub fn mark_notification_read(&self, notification_id: String) -> Result<(), BloodlinkError> {
        let db = self.db.lock()?;
        db.mark_notification_read(&notification_id, self.clock.now())?;
        Ok(())
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Number of committed batches.
    pub fn batch_count(&self) -> Result<u32, BloodlinkError> {
        let db = self.db.lock()?;
        Ok(db.batch_count()?)
    }

    /// Check that the batch ledger hash chain is intact.
    pub fn verify_ledger(&self) -> Result<bool, BloodlinkError> {
        let db = self.db.lock()?;
        Ok(db.verify_batch_chain()?)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, BloodlinkError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| BloodlinkError::InvalidInput(format!("Invalid date '{}': {}", value, e)))
}

/// Empty means absent.
fn parse_optional_date(value: &str) -> Result<Option<NaiveDate>, BloodlinkError> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        parse_date(value).map(Some)
    }
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe donor. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDonor {
    pub id: String,
    pub dog_name: String,
    pub city: String,
    pub blood_type: String,
    pub weight_kg: f64,
    pub last_donation: Option<String>,
    pub is_medical_condition: bool,
    pub donation_count: u32,
}

impl FfiDonor {
    fn into_donor(self, now: DateTime<Utc>) -> Result<Donor, BloodlinkError> {
        if self.id.trim().is_empty() {
            return Err(BloodlinkError::InvalidInput("donor id is required".into()));
        }
        let last_donation = match self.last_donation.as_deref() {
            Some(value) => parse_optional_date(value)?,
            None => None,
        };
        Ok(Donor {
            id: self.id,
            dog_name: self.dog_name,
            city: self.city,
            blood_type: self.blood_type,
            weight_kg: self.weight_kg,
            last_donation,
            is_medical_condition: self.is_medical_condition,
            donation_count: self.donation_count,
            created_at: now,
            updated_at: now,
        })
    }
}

impl From<Donor> for FfiDonor {
    fn from(donor: Donor) -> Self {
        Self {
            id: donor.id,
            dog_name: donor.dog_name,
            city: donor.city,
            blood_type: donor.blood_type,
            weight_kg: donor.weight_kg,
            last_donation: format_date(donor.last_donation),
            is_medical_condition: donor.is_medical_condition,
            donation_count: donor.donation_count,
        }
    }
}

/// FFI-safe clinic.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiClinic {
    pub id: String,
    pub name: String,
    pub city: Option<String>,
}

/// FFI-safe patient request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientRequest {
    pub id: String,
    pub patient_id: String,
    pub dog_name: String,
    pub blood_type: String,
    pub urgency: String,
    pub quantity_ml: u32,
    pub city: String,
    pub request_status: String,
    pub pending_matches: u32,
    pub confirmed_matches: u32,
    pub assigned_clinic_id: Option<String>,
    pub is_expired: bool,
}

impl FfiPatientRequest {
    /// Convert a request, judging expiry against `now`.
    fn new(request: PatientRequest, now: DateTime<Utc>) -> Self {
        Self {
            is_expired: request.is_expired(now),
            id: request.id,
            patient_id: request.patient_id,
            dog_name: request.dog_name,
            blood_type: request.blood_type,
            urgency: request.urgency.as_str().to_string(),
            quantity_ml: request.quantity_ml,
            city: request.city,
            request_status: request.request_status.as_str().to_string(),
            pending_matches: request.pending_matches,
            confirmed_matches: request.confirmed_matches,
            assigned_clinic_id: request.assigned_clinic_id,
        }
    }
}

/// Candidate list ordering.
#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiSortOrder {
    Distance,
    BestMatch,
    Experience,
}

impl From<FfiSortOrder> for SortOrder {
    fn from(sort: FfiSortOrder) -> Self {
        match sort {
            FfiSortOrder::Distance => SortOrder::Distance,
            FfiSortOrder::BestMatch => SortOrder::BestMatch,
            FfiSortOrder::Experience => SortOrder::Experience,
        }
    }
}

/// FFI-safe eligibility.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEligibility {
    pub is_eligible: bool,
    pub is_fit: bool,
    pub next_eligible_date: Option<String>,
    pub needs_manual_review: bool,
    pub reasons: Vec<String>,
}

impl From<Eligibility> for FfiEligibility {
    fn from(eligibility: Eligibility) -> Self {
        Self {
            needs_manual_review: eligibility.needs_manual_review(),
            is_eligible: eligibility.is_eligible,
            is_fit: eligibility.is_fit,
            next_eligible_date: format_date(eligibility.next_eligible_date),
            reasons: eligibility
                .reasons
                .iter()
                .map(|r| match r {
                    matching::IneligibilityReason::RecentDonation => "recent_donation",
                    matching::IneligibilityReason::MedicalCondition => "medical_condition",
                    matching::IneligibilityReason::Underweight => "underweight",
                })
                .map(String::from)
                .collect(),
        }
    }
}

/// FFI-safe donor candidate.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDonorCandidate {
    pub donor: FfiDonor,
    pub eligibility: FfiEligibility,
    pub is_fit: bool,
    pub is_same_city: bool,
    pub distance: u8,
    pub already_linked: bool,
    pub match_score: u32,
}

impl From<DonorCandidate> for FfiDonorCandidate {
    fn from(candidate: DonorCandidate) -> Self {
        Self {
            donor: candidate.donor.into(),
            eligibility: candidate.eligibility.into(),
            is_fit: candidate.is_fit,
            is_same_city: candidate.is_same_city,
            distance: candidate.distance,
            already_linked: candidate.already_linked,
            match_score: candidate.match_score,
        }
    }
}

/// FFI-safe link request. `proposed_date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLinkRequest {
    pub donor_id: String,
    pub request_id: String,
    pub clinic_id: String,
    pub proposed_date: Option<String>,
    pub proposed_time: Option<String>,
}

impl FfiLinkRequest {
    fn into_link_request(self) -> Result<LinkRequest, BloodlinkError> {
        let proposed_date = match self.proposed_date.as_deref() {
            Some(value) => parse_optional_date(value)?,
            None => None,
        };
        Ok(LinkRequest {
            donor_id: self.donor_id,
            request_id: self.request_id,
            clinic_id: self.clinic_id,
            proposed_date,
            proposed_time: self.proposed_time.filter(|t| !t.trim().is_empty()),
        })
    }
}

/// FFI-safe appointment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub id: String,
    pub donor_id: String,
    pub request_id: String,
    pub patient_user_id: String,
    pub clinic_id: String,
    pub status: String,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub match_score: u32,
    pub matched_at: String,
    pub cancel_reason: Option<String>,
}

impl From<Appointment> for FfiAppointment {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id,
            donor_id: appointment.donor_id,
            request_id: appointment.linked_patient_id,
            patient_user_id: appointment.patient_user_id,
            clinic_id: appointment.clinic_id,
            status: appointment.status.as_str().to_string(),
            appointment_date: format_date(appointment.appointment_date),
            appointment_time: appointment.appointment_time,
            match_score: appointment.match_score,
            matched_at: appointment.matched_at.to_rfc3339(),
            cancel_reason: appointment.cancel_reason,
        }
    }
}

/// FFI-safe notification. `data_json` is the raw JSON payload.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNotification {
    pub id: String,
    pub user_id: String,
    pub user_role: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data_json: String,
    pub read: bool,
    pub created_at: String,
}

impl From<Notification> for FfiNotification {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            user_id: notification.user_id,
            user_role: notification.user_role.as_str().to_string(),
            kind: notification.kind.as_str().to_string(),
            title: notification.title,
            message: notification.message,
            data_json: notification.data.to_string(),
            read: notification.read,
            created_at: notification.created_at.to_rfc3339(),
        }
    }
}

/// FFI-safe counter audit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCounterAudit {
    pub recorded_pending: u32,
    pub recorded_confirmed: u32,
    pub actual_pending: u32,
    pub actual_confirmed: u32,
    pub is_consistent: bool,
}

impl From<CounterAudit> for FfiCounterAudit {
    fn from(audit: CounterAudit) -> Self {
        Self {
            is_consistent: audit.is_consistent(),
            recorded_pending: audit.recorded_pending,
            recorded_confirmed: audit.recorded_confirmed,
            actual_pending: audit.actual_pending,
            actual_confirmed: audit.actual_confirmed,
        }
    }
}

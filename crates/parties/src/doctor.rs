use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use medflow_core::{DoctorId, Persisted};

/// One weekly availability window of a doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A practicing doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub email: String,
    pub phone: String,
    /// Fee in smallest currency unit (e.g., cents).
    pub consultation_fee_cents: u64,
    pub availability: Vec<AvailabilityWindow>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        specialization: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: DoctorId::new(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            specialization: specialization.into(),
            email: String::new(),
            phone: String::new(),
            consultation_fee_cents: 0,
            availability: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether `at` falls inside one of the doctor's weekly windows.
    pub fn is_available_at(&self, day: Weekday, at: NaiveTime) -> bool {
        self.availability
            .iter()
            .any(|w| w.day == day && w.start <= at && at < w.end)
    }
}

impl Persisted for Doctor {
    type Id = DoctorId;

    fn id(&self) -> DoctorId {
        self.id
    }

    fn set_id(&mut self, id: DoctorId) {
        self.id = id;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

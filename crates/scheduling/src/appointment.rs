use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use medflow_core::{AppointmentId, DoctorId, PatientId, Persisted};

/// Appointment status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

/// A booked appointment between a patient and a doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(
        patient_id: PatientId,
        doctor_id: DoctorId,
        scheduled_at: DateTime<Utc>,
        duration_minutes: u32,
        reason: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AppointmentId::new(),
            patient_id,
            doctor_id,
            scheduled_at,
            duration_minutes,
            status: AppointmentStatus::Scheduled,
            reason: reason.into(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether the scheduled time has already passed at `now`.
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at <= now
    }

    /// Two appointments overlap when they are booked with the same doctor
    /// and their time ranges intersect.
    pub fn overlaps(&self, other: &Appointment) -> bool {
        self.doctor_id == other.doctor_id
            && self.scheduled_at < other.end_time()
            && other.scheduled_at < self.end_time()
    }
}

impl Persisted for Appointment {
    type Id = AppointmentId;

    fn id(&self) -> AppointmentId {
        self.id
    }

    fn set_id(&mut self, id: AppointmentId) {
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

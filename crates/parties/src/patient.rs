use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use medflow_core::{PatientId, Persisted};

/// Postal address of a patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PatientId::new(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth,
            email: String::new(),
            phone: String::new(),
            address: Address::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Persisted for Patient {
    type Id = PatientId;

    fn id(&self) -> PatientId {
        self.id
    }

    fn set_id(&mut self, id: PatientId) {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_both_parts() {
        let patient = Patient::new("Ada", "Lovelace", NaiveDate::from_ymd_opt(1990, 3, 14).unwrap());
        assert_eq!(patient.full_name(), "Ada Lovelace");
        assert!(!patient.id.is_nil());
    }
}

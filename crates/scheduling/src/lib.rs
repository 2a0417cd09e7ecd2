//! Scheduling domain module (appointments).
//!
//! This crate contains the appointment lifecycle, implemented purely as
//! deterministic domain data (no IO, no HTTP, no storage).

pub mod appointment;

pub use appointment::{Appointment, AppointmentStatus};

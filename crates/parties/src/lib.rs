//! Parties domain module (patients and doctors).
//!
//! This crate contains the people records the clinic deals with, implemented
//! purely as deterministic domain data (no IO, no HTTP, no storage).

pub mod doctor;
pub mod patient;

pub use doctor::{AvailabilityWindow, Doctor};
pub use patient::{Address, Patient};

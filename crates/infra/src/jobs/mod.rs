//! Background job system with bounded concurrency and status tracking.
//!
//! ## Design
//!
//! - Jobs are submitted as boxed async bodies and identified by `JobId`
//! - A single dispatch task drains the FIFO queue, woken on submit
//! - A counting semaphore bounds simultaneously running jobs
//! - Status lives in a process-wide registry polled by callers
//! - Submission never blocks and never fails back to the caller
//!
//! ## Components
//!
//! - `JobRecord`/`JobState`: status bookkeeping per submitted job
//! - `JobRegistry`: concurrency-safe id → record map
//! - `JobEngine`: queue, dispatch loop, and per-job execution units

pub mod engine;
pub mod registry;
pub mod types;

pub use engine::{JobContext, JobEngine, JobEngineConfig};
pub use registry::JobRegistry;
pub use types::{JobError, JobId, JobRecord, JobState};

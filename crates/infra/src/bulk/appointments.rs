//! Bulk appointment status updates.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use medflow_core::AppointmentId;
use medflow_scheduling::AppointmentStatus;

use crate::jobs::{JobContext, JobEngine, JobError, JobId};
use crate::store::UnitOfWork;

use super::{BATCH_SIZE, BulkAbort, BulkOperationResult, ensure_not_cancelled};

/// Set `new_status` on every appointment in `appointment_ids`.
///
/// Appointments already in the target status (or unknown ids) are skipped
/// silently; moving a past appointment back to `Scheduled` is a per-item
/// soft failure.
pub async fn update_appointment_status(
    ctx: &JobContext,
    appointment_ids: &[AppointmentId],
    new_status: AppointmentStatus,
    notes: Option<String>,
) -> Result<BulkOperationResult, JobError> {
    let mut result = BulkOperationResult::started("BulkUpdateAppointmentStatus");
    let mut uow = ctx.unit_of_work();
    info!(
        count = appointment_ids.len(),
        status = ?new_status,
        "starting bulk appointment status update"
    );

    match stage_updates(
        &mut uow,
        ctx,
        appointment_ids,
        new_status,
        notes.as_deref(),
        &mut result,
    )
    .await
    {
        Ok(data) => {
            info!(
                updated = result.success_count,
                total = appointment_ids.len(),
                "bulk appointment status update completed"
            );
            Ok(result.succeeded(appointment_ids.len(), Some(data)))
        }
        Err(BulkAbort::Cancelled) => {
            warn!("bulk appointment status update cancelled");
            Err(JobError::Cancelled)
        }
        Err(BulkAbort::Infra(err)) => {
            error!(error = %err, "bulk appointment status update failed, rolling back");
            uow.rollback_transaction();
            Ok(result.failed(err.to_string()))
        }
    }
}

async fn stage_updates(
    uow: &mut UnitOfWork,
    ctx: &JobContext,
    appointment_ids: &[AppointmentId],
    new_status: AppointmentStatus,
    notes: Option<&str>,
    result: &mut BulkOperationResult,
) -> Result<serde_json::Value, BulkAbort> {
    uow.begin_transaction()?;
    let repo = uow.appointments();
    let mut updated = Vec::new();

    for batch in appointment_ids.chunks(BATCH_SIZE) {
        ensure_not_cancelled(ctx)?;

        for &id in batch {
            let Some(mut appointment) = repo.get_by_id(id) else {
                continue;
            };
            if appointment.status == new_status {
                continue;
            }
            if appointment.is_past(Utc::now()) && new_status == AppointmentStatus::Scheduled {
                result
                    .errors
                    .push(format!("Cannot reschedule past appointment {id}"));
                continue;
            }

            appointment.status = new_status;
            if let Some(notes) = notes {
                appointment.notes = notes.to_string();
            }
            let appointment = repo.update(appointment).await?;
            updated.push(serde_json::json!({
                "id": appointment.id,
                "status": appointment.status,
                "updated_at": appointment.updated_at,
            }));
            result.success_count += 1;
        }

        uow.save_changes().await?;
        debug!(batch = batch.len(), "processed appointment batch");
    }

    uow.commit_transaction().await?;
    Ok(serde_json::Value::Array(updated))
}

/// Queue a bulk status update on `engine`; the result lands in the job record.
pub fn submit_status_update(
    engine: &JobEngine,
    appointment_ids: Vec<AppointmentId>,
    new_status: AppointmentStatus,
    notes: Option<String>,
) -> JobId {
    let name = format!(
        "BulkUpdateAppointments-{}-{}",
        appointment_ids.len(),
        Utc::now().format("%Y%m%d-%H%M%S")
    );
    engine.submit(name, move |ctx| async move {
        let result = update_appointment_status(&ctx, &appointment_ids, new_status, notes).await?;
        Ok(serde_json::to_value(result)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonStore;
    use chrono::{DateTime, Duration};
    use medflow_core::{DoctorId, PatientId};
    use medflow_scheduling::Appointment;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn test_ctx(store: Arc<JsonStore>) -> JobContext {
        JobContext {
            job_id: JobId::new(),
            store,
            cancellation: CancellationToken::new(),
        }
    }

    fn seeded(
        store: &Arc<JsonStore>,
        scheduled_at: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> AppointmentId {
        let mut appointment =
            Appointment::new(PatientId::new(), DoctorId::new(), scheduled_at, 30, "checkup");
        appointment.status = status;
        let id = appointment.id;
        store.write(|d| d.appointments.push(appointment));
        id
    }

    #[tokio::test]
    async fn past_appointment_cannot_go_back_to_scheduled() {
        let store = JsonStore::in_memory_arc();
        let now = Utc::now();
        let future_a = seeded(&store, now + Duration::days(1), AppointmentStatus::Cancelled);
        let past = seeded(&store, now - Duration::days(1), AppointmentStatus::Cancelled);
        let future_b = seeded(&store, now + Duration::days(2), AppointmentStatus::Cancelled);
        let ctx = test_ctx(store.clone());

        let result = update_appointment_status(
            &ctx,
            &[future_a, past, future_b],
            AppointmentStatus::Scheduled,
            None,
        )
        .await
        .unwrap();

        assert!(result.is_success);
        assert_eq!(result.processed_count, 3);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failed_count(), 1);
        assert_eq!(
            result.errors,
            vec![format!("Cannot reschedule past appointment {past}")]
        );

        let statuses: Vec<_> =
            store.read(|d| d.appointments.iter().map(|a| (a.id, a.status)).collect());
        for (id, status) in statuses {
            if id == past {
                assert_eq!(status, AppointmentStatus::Cancelled);
            } else {
                assert_eq!(status, AppointmentStatus::Scheduled);
            }
        }
    }

    #[tokio::test]
    async fn same_status_and_unknown_ids_are_skipped_silently() {
        let store = JsonStore::in_memory_arc();
        let now = Utc::now();
        let unchanged = seeded(&store, now + Duration::days(1), AppointmentStatus::Completed);
        let ctx = test_ctx(store.clone());

        let result = update_appointment_status(
            &ctx,
            &[unchanged, AppointmentId::new()],
            AppointmentStatus::Completed,
            None,
        )
        .await
        .unwrap();

        assert!(result.is_success);
        assert_eq!(result.processed_count, 2);
        assert_eq!(result.success_count, 0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn notes_are_applied_on_success() {
        let store = JsonStore::in_memory_arc();
        let id = seeded(
            &store,
            Utc::now() + chrono::Duration::days(1),
            AppointmentStatus::Scheduled,
        );
        let ctx = test_ctx(store.clone());

        let result = update_appointment_status(
            &ctx,
            &[id],
            AppointmentStatus::Completed,
            Some("seen by Dr. House".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(result.success_count, 1);
        let appointment = store.read(|d| d.appointments[0].clone());
        assert_eq!(appointment.status, AppointmentStatus::Completed);
        assert_eq!(appointment.notes, "seen by Dr. House");
    }

    #[tokio::test]
    async fn cancellation_propagates_without_touching_later_batches() {
        let store = JsonStore::in_memory_arc();
        let id = seeded(
            &store,
            Utc::now() + chrono::Duration::days(1),
            AppointmentStatus::Scheduled,
        );
        let ctx = test_ctx(store.clone());
        ctx.cancellation.cancel();

        let outcome =
            update_appointment_status(&ctx, &[id], AppointmentStatus::Completed, None).await;
        assert!(matches!(outcome, Err(JobError::Cancelled)));

        // Nothing was staged before the first batch boundary.
        let appointment = store.read(|d| d.appointments[0].clone());
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    }

    #[tokio::test]
    async fn persistence_failure_rolls_the_whole_run_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.json");
        let store = Arc::new(JsonStore::open(&path).unwrap());
        let id = seeded(
            &store,
            Utc::now() + chrono::Duration::days(1),
            AppointmentStatus::Scheduled,
        );
        let before = store.snapshot();

        drop(dir); // every durable write from here on fails
        let ctx = test_ctx(store.clone());

        let result = update_appointment_status(&ctx, &[id], AppointmentStatus::Completed, None)
            .await
            .unwrap();

        assert!(!result.is_success);
        assert!(result.error_message.unwrap().contains("i/o failure"));
        assert_eq!(store.snapshot(), before);
    }
}

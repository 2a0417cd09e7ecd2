//! Integration tests for the full background-job pipeline.
//!
//! Tests: submit → queue → dispatch → bulk body → unit of work → registry
//!
//! Verifies:
//! - Bulk submissions land their results in the job registry
//! - A staged billing flow (complete → invoice → pay) works end to end
//! - Hard failures roll the store back while the job itself completes

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use medflow_core::{AppointmentId, DoctorId, InvoiceId, PatientId};
    use medflow_scheduling::{Appointment, AppointmentStatus};

    use crate::bulk::{
        self, BulkOperationResult, DEFAULT_INVOICE_AMOUNT_CENTS, DEFAULT_PAYMENT_METHOD,
    };
    use crate::jobs::{JobEngine, JobEngineConfig, JobId, JobRegistry, JobState};
    use crate::store::JsonStore;

    fn engine_on(store: Arc<JsonStore>) -> JobEngine {
        medflow_observability::init_with_filter("warn");
        JobEngine::start(JobEngineConfig::default(), Arc::new(JobRegistry::new()), store)
    }

    fn seeded_appointment(store: &Arc<JsonStore>, status: AppointmentStatus) -> AppointmentId {
        let mut appointment = Appointment::new(
            PatientId::new(),
            DoctorId::new(),
            Utc::now() - chrono::Duration::days(1),
            30,
            "checkup",
        );
        appointment.status = status;
        let id = appointment.id;
        store.write(|d| d.appointments.push(appointment));
        id
    }

    async fn wait_for_terminal(engine: &JobEngine, id: JobId) -> JobState {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let state = engine.status(id);
                if state.is_terminal() {
                    return state;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job did not reach a terminal state in time")
    }

    fn result_of(engine: &JobEngine, id: JobId) -> BulkOperationResult {
        let record = engine.registry().get(id).unwrap();
        serde_json::from_value(record.result.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn bulk_submission_lands_its_result_in_the_registry() {
        let store = JsonStore::in_memory_arc();
        let done = seeded_appointment(&store, AppointmentStatus::Completed);
        let scheduled = seeded_appointment(&store, AppointmentStatus::Scheduled);
        let engine = engine_on(store.clone());

        let job_id = bulk::submit_invoice_generation(
            &engine,
            vec![done, scheduled],
            DEFAULT_INVOICE_AMOUNT_CENTS,
        );

        assert_eq!(wait_for_terminal(&engine, job_id).await, JobState::Completed);

        let record = engine.registry().get(job_id).unwrap();
        assert!(record.name.starts_with("BulkGenerateInvoices-2-"));

        let result = result_of(&engine, job_id);
        assert!(result.is_success);
        assert_eq!(result.processed_count, 2);
        assert_eq!(result.success_count, 1);
        assert_eq!(
            result.errors,
            vec![format!("Appointment {scheduled} is not completed")]
        );
        assert_eq!(store.read(|d| d.invoices.len()), 1);
    }

    #[tokio::test]
    async fn staged_billing_flow_completes_end_to_end() {
        let store = JsonStore::in_memory_arc();
        let appointment = seeded_appointment(&store, AppointmentStatus::Scheduled);
        let engine = engine_on(store.clone());

        // Mark the visit completed.
        let update = bulk::submit_status_update(
            &engine,
            vec![appointment],
            AppointmentStatus::Completed,
            Some("seen".to_string()),
        );
        assert_eq!(wait_for_terminal(&engine, update).await, JobState::Completed);

        // Bill it.
        let invoicing = bulk::submit_invoice_generation(
            &engine,
            vec![appointment],
            DEFAULT_INVOICE_AMOUNT_CENTS,
        );
        assert_eq!(
            wait_for_terminal(&engine, invoicing).await,
            JobState::Completed
        );
        let invoice_id: InvoiceId = store.read(|d| d.invoices[0].id);

        // Settle it.
        let paying = bulk::submit_payment_run(
            &engine,
            vec![invoice_id],
            DEFAULT_PAYMENT_METHOD.to_string(),
        );
        assert_eq!(wait_for_terminal(&engine, paying).await, JobState::Completed);

        let result = result_of(&engine, paying);
        assert!(result.is_success);
        assert_eq!(result.success_count, 1);

        store.read(|d| {
            assert_eq!(d.payments.len(), 1);
            assert_eq!(d.payments[0].amount_cents, DEFAULT_INVOICE_AMOUNT_CENTS);
            assert_eq!(
                d.invoices[0].status,
                medflow_billing::InvoiceStatus::Paid
            );
        });

        // The cleanup report sees the completed appointment and paid invoice.
        let cleanup = bulk::submit_cleanup(&engine, Utc::now() + chrono::Duration::days(1));
        assert_eq!(wait_for_terminal(&engine, cleanup).await, JobState::Completed);
        let result = result_of(&engine, cleanup);
        assert_eq!(result.processed_count, 2);
        store.read(|d| assert_eq!(d.appointments.len(), 1)); // still read-only
    }

    #[tokio::test]
    async fn hard_failure_rolls_back_but_the_job_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.json");
        let store = Arc::new(JsonStore::open(&path).unwrap());
        let appointment = seeded_appointment(&store, AppointmentStatus::Scheduled);
        let before = store.snapshot();
        let engine = engine_on(store.clone());

        drop(dir); // durable writes fail from here on

        let job_id = bulk::submit_status_update(
            &engine,
            vec![appointment],
            AppointmentStatus::Completed,
            None,
        );

        // The bulk body absorbs the hard failure into its result; the job
        // itself terminates as completed, exactly like a successful run.
        assert_eq!(wait_for_terminal(&engine, job_id).await, JobState::Completed);

        let result = result_of(&engine, job_id);
        assert!(!result.is_success);
        assert!(result.error_message.is_some());
        assert_eq!(store.snapshot(), before);
    }
}

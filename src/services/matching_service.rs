// ==================== MUTUAL MATCHING ENGINE ====================
// A selection by an applicant becomes a match once the job side already
// selected that applicant. Match state is materialized on both documents
// with no cross-document transaction: the two writes run as a saga of
// idempotent set operations, the second one retried with backoff, and a
// reconcile pass repairs any asymmetry left behind by a partial failure.

use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::{
    services::store::{ApplicantSetField, ApplicantStore, JobSetField, JobStore},
    utils::error::AppError,
};

/// Attempts for the job-side write of a match promotion.
const RETRY_ATTEMPTS: u32 = 3;
/// Base delay before the first retry; doubles each attempt.
const RETRY_BASE_DELAY_MS: u64 = 50;

/// Which branch `register_interest` took.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub is_match: bool,
}

pub struct MatchingEngine<A, J> {
    applicants: A,
    jobs: J,
}

impl<A: ApplicantStore, J: JobStore> MatchingEngine<A, J> {
    pub fn new(applicants: A, jobs: J) -> Self {
        Self { applicants, jobs }
    }

    /// Records the acting applicant's interest in `job_id`.
    ///
    /// One-sided interest lands in the applicant's `selectedJobs`. If the
    /// job side already selected this applicant, the pair is promoted to a
    /// match on both documents; a prior one-sided selection is superseded,
    /// never duplicated, so an id is never in both sets of one document.
    ///
    /// Repeat calls converge: every mutation is a set operation, and an
    /// already-matched pair reports `is_match: true` without growing any
    /// set.
    pub async fn register_interest(
        &self,
        account_id: ObjectId,
        job_id: ObjectId,
    ) -> Result<MatchOutcome, AppError> {
        let applicant = self
            .applicants
            .find_by_user(account_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No applicant from account {} was registered in our database",
                    account_id
                ))
            })?;
        let applicant_id = applicant
            .id
            .ok_or_else(|| AppError::Store("applicant document has no id".to_string()))?;

        let job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        // Reciprocity test. An already-promoted pair (either side) counts
        // as reciprocal so a repeat call re-asserts the match instead of
        // demoting it back into a selection.
        let reciprocal = job.selected_applicants.contains(&applicant_id)
            || job.matched_applicants.contains(&applicant_id)
            || applicant.matched_jobs.contains(&job_id);

        if !reciprocal {
            self.applicants
                .add_to_set(applicant_id, ApplicantSetField::SelectedJobs, job_id)
                .await?;

            log::info!(
                "📝 Applicant {} selected job {} (no reciprocity yet)",
                applicant_id,
                job_id
            );
            return Ok(MatchOutcome { is_match: false });
        }

        // Promote on the applicant side first: this service owns the
        // applicant document, and reconciliation can complete the job side
        // from applicant state.
        self.applicants
            .move_between_sets(
                applicant_id,
                job_id,
                ApplicantSetField::SelectedJobs,
                ApplicantSetField::MatchedJobs,
            )
            .await?;

        // Job side is the second half of the dual write. Not rolled back
        // on failure; retried, then surfaced as a consistency fault.
        let jobs = &self.jobs;
        with_retry(|| {
            jobs.move_between_sets(
                job_id,
                applicant_id,
                JobSetField::SelectedApplicants,
                JobSetField::MatchedApplicants,
            )
        })
        .await
        .map_err(|e| {
            log::error!(
                "❌ Consistency violation: applicant {} holds match with job {} but job-side promotion failed: {}",
                applicant_id,
                job_id,
                e
            );
            AppError::Consistency(format!(
                "match promotion incomplete for applicant {} and job {}: {}",
                applicant_id, job_id, e
            ))
        })?;

        log::info!("🤝 It's a match: applicant {} and job {}", applicant_id, job_id);
        Ok(MatchOutcome { is_match: true })
    }

    /// Read-repair for the acting applicant: recomputes match state from
    /// both sides and completes whichever half of a promotion went
    /// missing. Returns the number of repaired pairs.
    pub async fn reconcile_matches(&self, account_id: ObjectId) -> Result<u64, AppError> {
        let applicant = self
            .applicants
            .find_by_user(account_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No applicant from account {} was registered in our database",
                    account_id
                ))
            })?;
        let applicant_id = applicant
            .id
            .ok_or_else(|| AppError::Store("applicant document has no id".to_string()))?;

        let mut repaired: u64 = 0;

        // Applicant says matched, job side does not: complete the job side.
        for job_id in &applicant.matched_jobs {
            match self.jobs.find_by_id(*job_id).await? {
                Some(job) => {
                    if !job.matched_applicants.contains(&applicant_id) {
                        log::warn!(
                            "⚠️  Asymmetric match detected: job {} missing applicant {} - repairing job side",
                            job_id,
                            applicant_id
                        );
                        self.jobs
                            .move_between_sets(
                                *job_id,
                                applicant_id,
                                JobSetField::SelectedApplicants,
                                JobSetField::MatchedApplicants,
                            )
                            .await?;
                        repaired += 1;
                    }
                }
                None => {
                    // Dangling reference: the job was deleted out from
                    // under us. Left in place; deletion cleanup is the
                    // job-side service's coordinated-delete concern.
                    log::warn!("⚠️  Matched job {} no longer exists", job_id);
                }
            }
        }

        // Job says matched, applicant side does not: complete the
        // applicant side.
        for job in self.jobs.find_matched_for(applicant_id).await? {
            let Some(job_id) = job.id else { continue };
            if !applicant.matched_jobs.contains(&job_id) {
                log::warn!(
                    "⚠️  Asymmetric match detected: applicant {} missing job {} - repairing applicant side",
                    applicant_id,
                    job_id
                );
                self.applicants
                    .move_between_sets(
                        applicant_id,
                        job_id,
                        ApplicantSetField::SelectedJobs,
                        ApplicantSetField::MatchedJobs,
                    )
                    .await?;
                repaired += 1;
            }
        }

        if repaired > 0 {
            log::info!(
                "🔧 Reconciled {} asymmetric match(es) for applicant {}",
                repaired,
                applicant_id
            );
        }
        Ok(repaired)
    }
}

/// Runs `op` up to RETRY_ATTEMPTS times with exponential backoff. Safe
/// only for idempotent operations, which every store primitive is.
async fn with_retry<F, Fut>(mut op: F) -> Result<(), AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), AppError>>,
{
    let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < RETRY_ATTEMPTS => {
                log::warn!("⚠️  Write attempt {}/{} failed: {}", attempt, RETRY_ATTEMPTS, e);
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::models::{Applicant, Job};

    // In-memory stores mirroring the Mongo set semantics, so the matching
    // protocol can be exercised without a database.

    #[derive(Clone, Default)]
    struct MemApplicants {
        docs: Arc<Mutex<HashMap<ObjectId, Applicant>>>,
    }

    impl MemApplicants {
        fn insert(&self, applicant: Applicant) {
            let id = applicant.id.unwrap();
            self.docs.lock().unwrap().insert(id, applicant);
        }

        fn get(&self, id: ObjectId) -> Applicant {
            self.docs.lock().unwrap().get(&id).unwrap().clone()
        }
    }

    fn add_if_absent(set: &mut Vec<ObjectId>, value: ObjectId) {
        if !set.contains(&value) {
            set.push(value);
        }
    }

    #[async_trait]
    impl ApplicantStore for MemApplicants {
        async fn find_by_user(&self, account_id: ObjectId) -> Result<Option<Applicant>, AppError> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .values()
                .find(|a| a.user == account_id)
                .cloned())
        }

        async fn add_to_set(
            &self,
            applicant_id: ObjectId,
            field: ApplicantSetField,
            job_id: ObjectId,
        ) -> Result<(), AppError> {
            let mut docs = self.docs.lock().unwrap();
            let applicant = docs
                .get_mut(&applicant_id)
                .ok_or_else(|| AppError::NotFound("applicant".into()))?;
            let set = match field {
                ApplicantSetField::SelectedJobs => &mut applicant.selected_jobs,
                ApplicantSetField::MatchedJobs => &mut applicant.matched_jobs,
            };
            add_if_absent(set, job_id);
            Ok(())
        }

        async fn move_between_sets(
            &self,
            applicant_id: ObjectId,
            job_id: ObjectId,
            from: ApplicantSetField,
            to: ApplicantSetField,
        ) -> Result<(), AppError> {
            let mut docs = self.docs.lock().unwrap();
            let applicant = docs
                .get_mut(&applicant_id)
                .ok_or_else(|| AppError::NotFound("applicant".into()))?;
            match from {
                ApplicantSetField::SelectedJobs => applicant.selected_jobs.retain(|j| *j != job_id),
                ApplicantSetField::MatchedJobs => applicant.matched_jobs.retain(|j| *j != job_id),
            }
            let set = match to {
                ApplicantSetField::SelectedJobs => &mut applicant.selected_jobs,
                ApplicantSetField::MatchedJobs => &mut applicant.matched_jobs,
            };
            add_if_absent(set, job_id);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MemJobs {
        docs: Arc<Mutex<HashMap<ObjectId, Job>>>,
        // Job-side write failures to inject before letting writes through.
        fail_moves: Arc<AtomicU32>,
    }

    impl MemJobs {
        fn insert(&self, job: Job) {
            let id = job.id.unwrap();
            self.docs.lock().unwrap().insert(id, job);
        }

        fn get(&self, id: ObjectId) -> Job {
            self.docs.lock().unwrap().get(&id).unwrap().clone()
        }

        fn fail_next_moves(&self, n: u32) {
            self.fail_moves.store(n, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl JobStore for MemJobs {
        async fn find_by_id(&self, job_id: ObjectId) -> Result<Option<Job>, AppError> {
            Ok(self.docs.lock().unwrap().get(&job_id).cloned())
        }

        async fn find_matched_for(&self, applicant_id: ObjectId) -> Result<Vec<Job>, AppError> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .values()
                .filter(|j| j.matched_applicants.contains(&applicant_id))
                .cloned()
                .collect())
        }

        async fn add_to_set(
            &self,
            job_id: ObjectId,
            field: JobSetField,
            applicant_id: ObjectId,
        ) -> Result<(), AppError> {
            let mut docs = self.docs.lock().unwrap();
            let job = docs
                .get_mut(&job_id)
                .ok_or_else(|| AppError::NotFound("job".into()))?;
            let set = match field {
                JobSetField::SelectedApplicants => &mut job.selected_applicants,
                JobSetField::MatchedApplicants => &mut job.matched_applicants,
            };
            add_if_absent(set, applicant_id);
            Ok(())
        }

        async fn move_between_sets(
            &self,
            job_id: ObjectId,
            applicant_id: ObjectId,
            from: JobSetField,
            to: JobSetField,
        ) -> Result<(), AppError> {
            if self
                .fail_moves
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AppError::Store("injected write failure".into()));
            }
            let mut docs = self.docs.lock().unwrap();
            let job = docs
                .get_mut(&job_id)
                .ok_or_else(|| AppError::NotFound("job".into()))?;
            match from {
                JobSetField::SelectedApplicants => {
                    job.selected_applicants.retain(|a| *a != applicant_id)
                }
                JobSetField::MatchedApplicants => {
                    job.matched_applicants.retain(|a| *a != applicant_id)
                }
            }
            let set = match to {
                JobSetField::SelectedApplicants => &mut job.selected_applicants,
                JobSetField::MatchedApplicants => &mut job.matched_applicants,
            };
            add_if_absent(set, applicant_id);
            Ok(())
        }

        async fn pull_applicant_everywhere(
            &self,
            applicant_id: ObjectId,
        ) -> Result<u64, AppError> {
            let mut touched = 0;
            for job in self.docs.lock().unwrap().values_mut() {
                let before =
                    job.selected_applicants.len() + job.matched_applicants.len();
                job.selected_applicants.retain(|a| *a != applicant_id);
                job.matched_applicants.retain(|a| *a != applicant_id);
                if job.selected_applicants.len() + job.matched_applicants.len() != before {
                    touched += 1;
                }
            }
            Ok(touched)
        }
    }

    fn applicant(account_id: ObjectId) -> Applicant {
        Applicant {
            id: Some(ObjectId::new()),
            user: account_id,
            profile_type: "APPLICANT".to_string(),
            slug: "sam".to_string(),
            first_name: "Sam".to_string(),
            surname: None,
            short_description: None,
            description: None,
            place: None,
            sectors: vec![],
            education: vec![],
            work_experiences: vec![],
            employment_types: vec![],
            skills: vec![],
            selected_jobs: vec![],
            matched_jobs: vec![],
            created_at: None,
            updated_at: None,
        }
    }

    fn job() -> Job {
        Job {
            id: Some(ObjectId::new()),
            title: "Backend Engineer".to_string(),
            company: None,
            slug: None,
            selected_applicants: vec![],
            matched_applicants: vec![],
            created_at: None,
            updated_at: None,
        }
    }

    fn engine() -> (MatchingEngine<MemApplicants, MemJobs>, MemApplicants, MemJobs) {
        let applicants = MemApplicants::default();
        let jobs = MemJobs::default();
        (
            MatchingEngine::new(applicants.clone(), jobs.clone()),
            applicants,
            jobs,
        )
    }

    /// No overlap between the selected and matched sets of a document.
    fn assert_disjoint(selected: &[ObjectId], matched: &[ObjectId]) {
        for id in selected {
            assert!(!matched.contains(id), "id {} present in both sets", id);
        }
    }

    #[tokio::test]
    async fn one_sided_selection_lands_in_selected_jobs() {
        let (engine, applicants, jobs) = engine();
        let account_id = ObjectId::new();
        let a = applicant(account_id);
        let a_id = a.id.unwrap();
        applicants.insert(a);
        let j = job();
        let j_id = j.id.unwrap();
        jobs.insert(j);

        let outcome = engine.register_interest(account_id, j_id).await.unwrap();

        assert!(!outcome.is_match);
        let a = applicants.get(a_id);
        assert_eq!(a.selected_jobs, vec![j_id]);
        assert!(a.matched_jobs.is_empty());
    }

    #[tokio::test]
    async fn reciprocal_selection_promotes_both_sides() {
        let (engine, applicants, jobs) = engine();
        let account_id = ObjectId::new();
        let a = applicant(account_id);
        let a_id = a.id.unwrap();
        applicants.insert(a);
        let mut j = job();
        let j_id = j.id.unwrap();
        j.selected_applicants.push(a_id);
        jobs.insert(j);

        let outcome = engine.register_interest(account_id, j_id).await.unwrap();

        assert!(outcome.is_match);
        let a = applicants.get(a_id);
        let j = jobs.get(j_id);
        assert_eq!(a.matched_jobs, vec![j_id]);
        assert!(a.selected_jobs.is_empty());
        assert_eq!(j.matched_applicants, vec![a_id]);
        assert!(j.selected_applicants.is_empty());
    }

    #[tokio::test]
    async fn promotion_supersedes_prior_selection() {
        // Sam selects j1 one-sided, the employer later selects Sam,
        // and a repeat selection promotes without duplicating.
        let (engine, applicants, jobs) = engine();
        let account_id = ObjectId::new();
        let a = applicant(account_id);
        let a_id = a.id.unwrap();
        applicants.insert(a);
        let j = job();
        let j_id = j.id.unwrap();
        jobs.insert(j);

        let outcome = engine.register_interest(account_id, j_id).await.unwrap();
        assert!(!outcome.is_match);
        assert_eq!(applicants.get(a_id).selected_jobs, vec![j_id]);

        // Employer side selects Sam.
        jobs.add_to_set(j_id, JobSetField::SelectedApplicants, a_id)
            .await
            .unwrap();

        let outcome = engine.register_interest(account_id, j_id).await.unwrap();
        assert!(outcome.is_match);
        let a = applicants.get(a_id);
        assert_eq!(a.matched_jobs, vec![j_id]);
        assert!(a.selected_jobs.is_empty());
        assert_disjoint(&a.selected_jobs, &a.matched_jobs);
    }

    #[tokio::test]
    async fn selection_is_idempotent() {
        let (engine, applicants, jobs) = engine();
        let account_id = ObjectId::new();
        let a = applicant(account_id);
        let a_id = a.id.unwrap();
        applicants.insert(a);
        let j = job();
        let j_id = j.id.unwrap();
        jobs.insert(j);

        let first = engine.register_interest(account_id, j_id).await.unwrap();
        let second = engine.register_interest(account_id, j_id).await.unwrap();

        assert_eq!(first.is_match, second.is_match);
        assert_eq!(applicants.get(a_id).selected_jobs, vec![j_id]);
    }

    #[tokio::test]
    async fn matched_pair_stays_matched_on_repeat() {
        let (engine, applicants, jobs) = engine();
        let account_id = ObjectId::new();
        let a = applicant(account_id);
        let a_id = a.id.unwrap();
        applicants.insert(a);
        let mut j = job();
        let j_id = j.id.unwrap();
        j.selected_applicants.push(a_id);
        jobs.insert(j);

        assert!(engine.register_interest(account_id, j_id).await.unwrap().is_match);
        // Repeat after the pair is fully promoted on both sides.
        let repeat = engine.register_interest(account_id, j_id).await.unwrap();

        assert!(repeat.is_match);
        let a = applicants.get(a_id);
        let j = jobs.get(j_id);
        assert_eq!(a.matched_jobs, vec![j_id]);
        assert!(a.selected_jobs.is_empty());
        assert_eq!(j.matched_applicants, vec![a_id]);
        assert_disjoint(&a.selected_jobs, &a.matched_jobs);
        assert_disjoint(&j.selected_applicants, &j.matched_applicants);
    }

    #[tokio::test]
    async fn missing_job_is_not_found() {
        let (engine, applicants, _jobs) = engine();
        let account_id = ObjectId::new();
        applicants.insert(applicant(account_id));

        let err = engine
            .register_interest(account_id, ObjectId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_applicant_is_not_found() {
        let (engine, _applicants, jobs) = engine();
        let j = job();
        let j_id = j.id.unwrap();
        jobs.insert(j);

        let err = engine
            .register_interest(ObjectId::new(), j_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn job_side_write_recovers_within_retry_budget() {
        let (engine, applicants, jobs) = engine();
        let account_id = ObjectId::new();
        let a = applicant(account_id);
        let a_id = a.id.unwrap();
        applicants.insert(a);
        let mut j = job();
        let j_id = j.id.unwrap();
        j.selected_applicants.push(a_id);
        jobs.insert(j);

        // Two transient failures, third attempt succeeds.
        jobs.fail_next_moves(2);

        let outcome = engine.register_interest(account_id, j_id).await.unwrap();
        assert!(outcome.is_match);
        assert_eq!(jobs.get(j_id).matched_applicants, vec![a_id]);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_consistency_error() {
        let (engine, applicants, jobs) = engine();
        let account_id = ObjectId::new();
        let a = applicant(account_id);
        let a_id = a.id.unwrap();
        applicants.insert(a);
        let mut j = job();
        let j_id = j.id.unwrap();
        j.selected_applicants.push(a_id);
        jobs.insert(j);

        jobs.fail_next_moves(RETRY_ATTEMPTS);

        let err = engine.register_interest(account_id, j_id).await.unwrap_err();
        assert!(matches!(err, AppError::Consistency(_)));

        // First write is not rolled back: the applicant side holds the
        // match, and the asymmetry is reconcilable.
        let a = applicants.get(a_id);
        assert_eq!(a.matched_jobs, vec![j_id]);
        assert_eq!(jobs.get(j_id).selected_applicants, vec![a_id]);

        let repaired = engine.reconcile_matches(account_id).await.unwrap();
        assert_eq!(repaired, 1);
        let j = jobs.get(j_id);
        assert_eq!(j.matched_applicants, vec![a_id]);
        assert!(j.selected_applicants.is_empty());
    }

    #[tokio::test]
    async fn reconcile_completes_missing_applicant_side() {
        let (engine, applicants, jobs) = engine();
        let account_id = ObjectId::new();
        let a = applicant(account_id);
        let a_id = a.id.unwrap();
        applicants.insert(a);
        // Job already shows the match; the applicant still shows only a
        // one-sided selection.
        let mut j = job();
        let j_id = j.id.unwrap();
        j.matched_applicants.push(a_id);
        jobs.insert(j);
        applicants
            .add_to_set(a_id, ApplicantSetField::SelectedJobs, j_id)
            .await
            .unwrap();

        let repaired = engine.reconcile_matches(account_id).await.unwrap();

        assert_eq!(repaired, 1);
        let a = applicants.get(a_id);
        assert_eq!(a.matched_jobs, vec![j_id]);
        assert!(a.selected_jobs.is_empty());
    }

    #[tokio::test]
    async fn reconcile_is_a_no_op_on_symmetric_state() {
        let (engine, applicants, jobs) = engine();
        let account_id = ObjectId::new();
        let a = applicant(account_id);
        let a_id = a.id.unwrap();
        applicants.insert(a);
        let mut j = job();
        let j_id = j.id.unwrap();
        j.selected_applicants.push(a_id);
        jobs.insert(j);

        assert!(engine.register_interest(account_id, j_id).await.unwrap().is_match);
        let repaired = engine.reconcile_matches(account_id).await.unwrap();
        assert_eq!(repaired, 0);
    }

    #[tokio::test]
    async fn example_scenario_sam_selects_then_matches() {
        // The full walkthrough: empty sets, one-sided selection, employer
        // reciprocates externally, repeat call promotes.
        let (engine, applicants, jobs) = engine();
        let account_id = ObjectId::new();
        let a = applicant(account_id);
        let a_id = a.id.unwrap();
        applicants.insert(a);
        let j = job();
        let j_id = j.id.unwrap();
        jobs.insert(j);

        let outcome = engine.register_interest(account_id, j_id).await.unwrap();
        assert!(!outcome.is_match);
        assert_eq!(applicants.get(a_id).selected_jobs, vec![j_id]);

        jobs.add_to_set(j_id, JobSetField::SelectedApplicants, a_id)
            .await
            .unwrap();

        let outcome = engine.register_interest(account_id, j_id).await.unwrap();
        assert!(outcome.is_match);
        let a = applicants.get(a_id);
        assert_eq!(a.matched_jobs, vec![j_id]);
        assert!(a.selected_jobs.is_empty());
    }
}

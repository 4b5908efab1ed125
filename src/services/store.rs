// ==================== PROFILE STORE PRIMITIVES ====================
// Set-oriented mutation primitives over the applicant and job documents.
// Every operation is idempotent ($addToSet / $pull), so each one is safe
// to retry, and move_between_sets runs as a single update so a document
// never shows the same id in both its selected and matched sets.

use async_trait::async_trait;
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};

use crate::{
    database::MongoDB,
    models::{Applicant, Job},
    utils::error::AppError,
};

/// The two applicant-side sets a job id can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicantSetField {
    SelectedJobs,
    MatchedJobs,
}

impl ApplicantSetField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicantSetField::SelectedJobs => "selectedJobs",
            ApplicantSetField::MatchedJobs => "matchedJobs",
        }
    }
}

/// The two job-side sets an applicant id can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSetField {
    SelectedApplicants,
    MatchedApplicants,
}

impl JobSetField {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSetField::SelectedApplicants => "selectedApplicants",
            JobSetField::MatchedApplicants => "matchedApplicants",
        }
    }
}

/// Applicant side of the matching protocol.
#[async_trait]
pub trait ApplicantStore: Send + Sync {
    async fn find_by_user(&self, account_id: ObjectId) -> Result<Option<Applicant>, AppError>;

    /// Adds `job_id` to one of the applicant's sets; no-op if present.
    async fn add_to_set(
        &self,
        applicant_id: ObjectId,
        field: ApplicantSetField,
        job_id: ObjectId,
    ) -> Result<(), AppError>;

    /// Removes `job_id` from `from` and inserts it into `to` in a single
    /// update, so the two sets never overlap on this document.
    async fn move_between_sets(
        &self,
        applicant_id: ObjectId,
        job_id: ObjectId,
        from: ApplicantSetField,
        to: ApplicantSetField,
    ) -> Result<(), AppError>;
}

/// Job side of the matching protocol. The job documents are owned by the
/// employer-side service; this service touches only their selection and
/// match sets.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_by_id(&self, job_id: ObjectId) -> Result<Option<Job>, AppError>;

    /// Jobs whose `matchedApplicants` set contains the applicant. Used by
    /// reconciliation to recompute match state from the job side.
    async fn find_matched_for(&self, applicant_id: ObjectId) -> Result<Vec<Job>, AppError>;

    async fn add_to_set(
        &self,
        job_id: ObjectId,
        field: JobSetField,
        applicant_id: ObjectId,
    ) -> Result<(), AppError>;

    async fn move_between_sets(
        &self,
        job_id: ObjectId,
        applicant_id: ObjectId,
        from: JobSetField,
        to: JobSetField,
    ) -> Result<(), AppError>;

    /// Pulls the applicant out of every job's selection and match sets.
    /// Returns how many job documents were touched. Used by the
    /// coordinated applicant delete.
    async fn pull_applicant_everywhere(&self, applicant_id: ObjectId) -> Result<u64, AppError>;
}

// ==================== MONGO IMPLEMENTATIONS ====================

#[derive(Clone)]
pub struct MongoApplicantStore {
    db: MongoDB,
}

impl MongoApplicantStore {
    pub fn new(db: MongoDB) -> Self {
        Self { db }
    }

    fn collection(&self) -> mongodb::Collection<Applicant> {
        self.db.collection::<Applicant>("applicants")
    }
}

#[async_trait]
impl ApplicantStore for MongoApplicantStore {
    async fn find_by_user(&self, account_id: ObjectId) -> Result<Option<Applicant>, AppError> {
        let applicant = self
            .collection()
            .find_one(doc! { "user": account_id })
            .await?;
        Ok(applicant)
    }

    async fn add_to_set(
        &self,
        applicant_id: ObjectId,
        field: ApplicantSetField,
        job_id: ObjectId,
    ) -> Result<(), AppError> {
        let mut add = Document::new();
        add.insert(field.as_str(), job_id);

        let result = self
            .collection()
            .update_one(
                doc! { "_id": applicant_id },
                doc! {
                    "$addToSet": add,
                    "$set": { "updatedAt": DateTime::now() },
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Applicant {} not found",
                applicant_id
            )));
        }
        Ok(())
    }

    async fn move_between_sets(
        &self,
        applicant_id: ObjectId,
        job_id: ObjectId,
        from: ApplicantSetField,
        to: ApplicantSetField,
    ) -> Result<(), AppError> {
        let mut pull = Document::new();
        pull.insert(from.as_str(), job_id);
        let mut add = Document::new();
        add.insert(to.as_str(), job_id);

        // Single update: the document never shows job_id in both sets.
        let result = self
            .collection()
            .update_one(
                doc! { "_id": applicant_id },
                doc! {
                    "$pull": pull,
                    "$addToSet": add,
                    "$set": { "updatedAt": DateTime::now() },
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Applicant {} not found",
                applicant_id
            )));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct MongoJobStore {
    db: MongoDB,
}

impl MongoJobStore {
    pub fn new(db: MongoDB) -> Self {
        Self { db }
    }

    fn collection(&self) -> mongodb::Collection<Job> {
        self.db.collection::<Job>("jobs")
    }
}

#[async_trait]
impl JobStore for MongoJobStore {
    async fn find_by_id(&self, job_id: ObjectId) -> Result<Option<Job>, AppError> {
        let job = self.collection().find_one(doc! { "_id": job_id }).await?;
        Ok(job)
    }

    async fn find_matched_for(&self, applicant_id: ObjectId) -> Result<Vec<Job>, AppError> {
        let mut cursor = self
            .collection()
            .find(doc! { "matchedApplicants": applicant_id })
            .await?;

        let mut jobs = Vec::new();
        while let Some(job) = cursor.next().await {
            jobs.push(job?);
        }
        Ok(jobs)
    }

    async fn add_to_set(
        &self,
        job_id: ObjectId,
        field: JobSetField,
        applicant_id: ObjectId,
    ) -> Result<(), AppError> {
        let mut add = Document::new();
        add.insert(field.as_str(), applicant_id);

        let result = self
            .collection()
            .update_one(
                doc! { "_id": job_id },
                doc! {
                    "$addToSet": add,
                    "$set": { "updatedAt": DateTime::now() },
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Job {} not found", job_id)));
        }
        Ok(())
    }

    async fn move_between_sets(
        &self,
        job_id: ObjectId,
        applicant_id: ObjectId,
        from: JobSetField,
        to: JobSetField,
    ) -> Result<(), AppError> {
        let mut pull = Document::new();
        pull.insert(from.as_str(), applicant_id);
        let mut add = Document::new();
        add.insert(to.as_str(), applicant_id);

        let result = self
            .collection()
            .update_one(
                doc! { "_id": job_id },
                doc! {
                    "$pull": pull,
                    "$addToSet": add,
                    "$set": { "updatedAt": DateTime::now() },
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Job {} not found", job_id)));
        }
        Ok(())
    }

    async fn pull_applicant_everywhere(&self, applicant_id: ObjectId) -> Result<u64, AppError> {
        let result = self
            .collection()
            .update_many(
                doc! {
                    "$or": [
                        { "selectedApplicants": applicant_id },
                        { "matchedApplicants": applicant_id },
                    ]
                },
                doc! {
                    "$pull": {
                        "selectedApplicants": applicant_id,
                        "matchedApplicants": applicant_id,
                    },
                    "$set": { "updatedAt": DateTime::now() },
                },
            )
            .await?;

        Ok(result.modified_count)
    }
}

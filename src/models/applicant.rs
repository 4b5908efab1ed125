use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::models::Job;

/// Applicant profile document (`applicants` collection).
///
/// Field names stay camelCase on the wire and in BSON. `selectedJobs` and
/// `matchedJobs` carry set semantics: a job id never appears in both at
/// once, and duplicates never accumulate.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId, // owning account - unique, one applicant per account
    #[serde(default = "default_profile_type")]
    pub profile_type: String,
    pub slug: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    #[serde(default)]
    pub employment_types: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub selected_jobs: Vec<ObjectId>,
    #[serde(default)]
    pub matched_jobs: Vec<ObjectId>,
    pub created_at: Option<BsonDateTime>,
    pub updated_at: Option<BsonDateTime>,
}

fn default_profile_type() -> String {
    "APPLICANT".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub school: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_year: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub company: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

// ==================== REQUEST MODELS ====================

/// POST /applicants body. Identity, slug and match state are never
/// client-writable; the owning account comes from the verified token.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicantRequest {
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub place: Option<Place>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    #[serde(default)]
    pub employment_types: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// PUT /applicants body - every field optional, only present fields change.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicantRequest {
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub place: Option<Place>,
    pub sectors: Option<Vec<String>>,
    pub education: Option<Vec<Education>>,
    pub work_experiences: Option<Vec<WorkExperience>>,
    pub employment_types: Option<Vec<String>>,
    pub skills: Option<Vec<String>>,
}

/// PATCH /applicants/select-job body - the id of the job being selected.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SelectJobRequest {
    pub id: String,
}

// ==================== RESPONSE MODELS ====================

/// Applicant with `matchedJobs` expanded into full job documents.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedApplicant {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    pub profile_type: String,
    pub slug: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
    pub sectors: Vec<String>,
    pub education: Vec<Education>,
    pub work_experiences: Vec<WorkExperience>,
    pub employment_types: Vec<String>,
    pub skills: Vec<String>,
    pub selected_jobs: Vec<ObjectId>,
    pub matched_jobs: Vec<Job>,
    pub created_at: Option<BsonDateTime>,
    pub updated_at: Option<BsonDateTime>,
}

impl ExpandedApplicant {
    pub fn new(applicant: Applicant, matched_jobs: Vec<Job>) -> Self {
        Self {
            id: applicant.id,
            user: applicant.user,
            profile_type: applicant.profile_type,
            slug: applicant.slug,
            first_name: applicant.first_name,
            surname: applicant.surname,
            short_description: applicant.short_description,
            description: applicant.description,
            place: applicant.place,
            sectors: applicant.sectors,
            education: applicant.education,
            work_experiences: applicant.work_experiences,
            employment_types: applicant.employment_types,
            skills: applicant.skills,
            selected_jobs: applicant.selected_jobs,
            matched_jobs,
            created_at: applicant.created_at,
            updated_at: applicant.updated_at,
        }
    }

    /// Display name for response messages.
    pub fn display_name(&self) -> String {
        match &self.surname {
            Some(surname) => format!("{} {}", self.first_name, surname),
            None => self.first_name.clone(),
        }
    }
}

impl Applicant {
    pub fn display_name(&self) -> String {
        match &self.surname {
            Some(surname) => format!("{} {}", self.first_name, surname),
            None => self.first_name.clone(),
        }
    }
}

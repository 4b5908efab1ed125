use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// Job posting document (`jobs` collection).
///
/// Owned by the employer-side service; this service only reads it and
/// mutates its `selectedApplicants`/`matchedApplicants` sets, which mirror
/// the applicant-side `selectedJobs`/`matchedJobs` pair.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub selected_applicants: Vec<ObjectId>,
    #[serde(default)]
    pub matched_applicants: Vec<ObjectId>,
    pub created_at: Option<BsonDateTime>,
    pub updated_at: Option<BsonDateTime>,
}

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Owning account (`accounts` collection). Authentication lives in a
/// separate service; this one only resolves the account from verified
/// token claims and maintains the `applicantProfile` back-reference.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_profile: Option<ObjectId>,
}

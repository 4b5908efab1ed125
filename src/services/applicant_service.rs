// ==================== APPLICANT PROFILE MANAGEMENT ====================
// CRUD over the applicant document. One applicant per account, slug
// allocated uniquely at write time, and deletion coordinated with the
// job side so no job keeps a reference to a removed applicant.

use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime};
use mongodb::options::ReturnDocument;

use crate::{
    database::MongoDB,
    models::{
        Account, Applicant, CreateApplicantRequest, ExpandedApplicant, Job,
        UpdateApplicantRequest,
    },
    services::store::{JobStore, MongoJobStore},
    utils::error::AppError,
    utils::slug::{slug_candidate, slugify},
};

/// Collision suffixes tried before giving up on a slug.
const MAX_SLUG_ATTEMPTS: u32 = 50;

fn applicants(db: &MongoDB) -> mongodb::Collection<Applicant> {
    db.collection::<Applicant>("applicants")
}

fn accounts(db: &MongoDB) -> mongodb::Collection<Account> {
    db.collection::<Account>("accounts")
}

/// POST /applicants - creates the applicant profile for the acting account.
pub async fn create_applicant(
    db: &MongoDB,
    account_id: ObjectId,
    request: CreateApplicantRequest,
) -> Result<(Applicant, Account), AppError> {
    let first_name = match request.first_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(AppError::Validation("Applicant name is missing".to_string())),
    };

    log::info!("📝 Creating applicant profile for account {}", account_id);

    if let Some(existing) = applicants(db).find_one(doc! { "user": account_id }).await? {
        log::warn!("⚠️  Account {} already has an applicant profile", account_id);
        return Err(AppError::Conflict {
            msg: "Applicant with that user already exists".to_string(),
            applicant: Box::new(existing),
        });
    }

    let slug = unique_slug(db, &slugify(&first_name, request.surname.as_deref()), None).await?;

    let now = DateTime::now();
    let applicant = Applicant {
        id: Some(ObjectId::new()),
        user: account_id,
        profile_type: "APPLICANT".to_string(),
        slug,
        first_name,
        surname: request.surname,
        short_description: request.short_description,
        description: request.description,
        place: request.place,
        sectors: request.sectors,
        education: request.education,
        work_experiences: request.work_experiences,
        employment_types: request.employment_types,
        skills: request.skills,
        selected_jobs: vec![],
        matched_jobs: vec![],
        created_at: Some(now),
        updated_at: Some(now),
    };

    applicants(db).insert_one(&applicant).await?;

    // Back-reference so the account resolves straight to its profile.
    let account = accounts(db)
        .find_one_and_update(
            doc! { "_id": account_id },
            doc! { "$set": { "applicantProfile": applicant.id } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Account {} not found", account_id)))?;

    log::info!(
        "✅ Applicant {} created with slug '{}'",
        applicant.display_name(),
        applicant.slug
    );
    Ok((applicant, account))
}

/// GET /applicants - the acting account's applicant, matched jobs expanded.
pub async fn get_by_account(
    db: &MongoDB,
    account_id: ObjectId,
) -> Result<ExpandedApplicant, AppError> {
    let applicant = applicants(db)
        .find_one(doc! { "user": account_id })
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Applicant retrieval failed: no applicant from account {} was registered in our database",
                account_id
            ))
        })?;

    expand(db, applicant).await
}

/// GET /applicants/slug/{slug} - public lookup, matched jobs expanded.
pub async fn get_by_slug(db: &MongoDB, slug: &str) -> Result<ExpandedApplicant, AppError> {
    let applicant = applicants(db)
        .find_one(doc! { "slug": slug })
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Applicant retrieval failed: no applicant with slug {} was registered in our database",
                slug
            ))
        })?;

    expand(db, applicant).await
}

/// PUT /applicants - partial update of the profile fields. Identity, slug
/// and match state are never client-writable; the slug is regenerated
/// when the name changes.
pub async fn update_applicant(
    db: &MongoDB,
    account_id: ObjectId,
    request: UpdateApplicantRequest,
) -> Result<Applicant, AppError> {
    let current = applicants(db)
        .find_one(doc! { "user": account_id })
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Applicant update failed: no applicant from account {} was registered in our database",
                account_id
            ))
        })?;

    let mut set = doc! { "updatedAt": DateTime::now() };

    if let Some(first_name) = request.first_name.as_deref().map(str::trim) {
        if first_name.is_empty() {
            return Err(AppError::Validation("Applicant name is missing".to_string()));
        }
        set.insert("firstName", first_name);
    }
    if let Some(surname) = &request.surname {
        set.insert("surname", surname);
    }
    if let Some(short_description) = &request.short_description {
        set.insert("shortDescription", short_description);
    }
    if let Some(description) = &request.description {
        set.insert("description", description);
    }
    if let Some(place) = &request.place {
        set.insert("place", to_bson(place)?);
    }
    if let Some(sectors) = &request.sectors {
        set.insert("sectors", to_bson(sectors)?);
    }
    if let Some(education) = &request.education {
        set.insert("education", to_bson(education)?);
    }
    if let Some(work_experiences) = &request.work_experiences {
        set.insert("workExperiences", to_bson(work_experiences)?);
    }
    if let Some(employment_types) = &request.employment_types {
        set.insert("employmentTypes", to_bson(employment_types)?);
    }
    if let Some(skills) = &request.skills {
        set.insert("skills", to_bson(skills)?);
    }

    // Slug follows the name.
    let new_first = request
        .first_name
        .as_deref()
        .map(str::trim)
        .unwrap_or(&current.first_name);
    let new_surname = request
        .surname
        .as_deref()
        .or(current.surname.as_deref());
    let name_changed = new_first != current.first_name
        || new_surname != current.surname.as_deref();
    if name_changed {
        let slug =
            unique_slug(db, &slugify(new_first, new_surname), current.id).await?;
        set.insert("slug", slug);
    }

    let updated = applicants(db)
        .find_one_and_update(doc! { "user": account_id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Applicant update failed: no applicant from account {} was registered in our database",
                account_id
            ))
        })?;

    log::info!("✅ Applicant {} updated", updated.display_name());
    Ok(updated)
}

/// DELETE /applicants - hard delete, coordinated with the job side: the
/// applicant id is pulled from every job's selection and match sets and
/// the account back-reference is cleared.
pub async fn delete_applicant(db: &MongoDB, account_id: ObjectId) -> Result<Applicant, AppError> {
    let applicant = applicants(db)
        .find_one_and_delete(doc! { "user": account_id })
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Applicant deletion failed: no applicant from account {} was registered in our database",
                account_id
            ))
        })?;

    if let Some(applicant_id) = applicant.id {
        let touched = MongoJobStore::new(db.clone())
            .pull_applicant_everywhere(applicant_id)
            .await?;
        if touched > 0 {
            log::info!(
                "🗑️  Removed applicant {} from {} job document(s)",
                applicant_id,
                touched
            );
        }
    }

    accounts(db)
        .update_one(
            doc! { "_id": account_id },
            doc! { "$unset": { "applicantProfile": "" } },
        )
        .await?;

    log::info!("🗑️  Applicant {} deleted", applicant.display_name());
    Ok(applicant)
}

/// Expands `matchedJobs` into full job documents on read.
async fn expand(db: &MongoDB, applicant: Applicant) -> Result<ExpandedApplicant, AppError> {
    if applicant.matched_jobs.is_empty() {
        return Ok(ExpandedApplicant::new(applicant, vec![]));
    }

    let mut cursor = db
        .collection::<Job>("jobs")
        .find(doc! { "_id": { "$in": &applicant.matched_jobs } })
        .await?;

    let mut jobs = Vec::with_capacity(applicant.matched_jobs.len());
    while let Some(job) = cursor.next().await {
        jobs.push(job?);
    }

    Ok(ExpandedApplicant::new(applicant, jobs))
}

/// First free slug starting from `base`, suffixing `-2`, `-3`, ... on
/// collision. `exclude` keeps an applicant from colliding with itself on
/// rename.
async fn unique_slug(
    db: &MongoDB,
    base: &str,
    exclude: Option<ObjectId>,
) -> Result<String, AppError> {
    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let candidate = slug_candidate(base, attempt);
        let mut filter = doc! { "slug": &candidate };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id });
        }
        if applicants(db).find_one(filter).await?.is_none() {
            return Ok(candidate);
        }
    }
    Err(AppError::Store(format!(
        "could not allocate a unique slug for '{}'",
        base
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateApplicantRequest;

    fn create_request(first_name: Option<&str>) -> CreateApplicantRequest {
        CreateApplicantRequest {
            first_name: first_name.map(str::to_string),
            surname: Some("Porter".to_string()),
            short_description: None,
            description: None,
            place: None,
            sectors: vec![],
            education: vec![],
            work_experiences: vec![],
            employment_types: vec![],
            skills: vec![],
        }
    }

    async fn test_db() -> MongoDB {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/JobMatchTest".to_string());
        MongoDB::new(&uri).await.expect("test MongoDB")
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn create_rejects_missing_name() {
        let db = test_db().await;
        let err = create_applicant(&db, ObjectId::new(), create_request(None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn second_create_for_same_account_conflicts() {
        let db = test_db().await;
        let account_id = ObjectId::new();
        db.collection::<Account>("accounts")
            .insert_one(Account {
                id: Some(account_id),
                email: format!("{}@test.local", account_id),
                name: None,
                applicant_profile: None,
            })
            .await
            .unwrap();

        let (first, account) = create_applicant(&db, account_id, create_request(Some("Sam")))
            .await
            .unwrap();
        assert_eq!(account.applicant_profile, first.id);

        let err = create_applicant(&db, account_id, create_request(Some("Sam")))
            .await
            .unwrap_err();
        match err {
            AppError::Conflict { applicant, .. } => assert_eq!(applicant.id, first.id),
            other => panic!("expected Conflict, got {:?}", other),
        }
    }
}

use actix_web::{web, HttpResponse};
use mongodb::bson::oid::ObjectId;

use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{CreateApplicantRequest, SelectJobRequest, UpdateApplicantRequest},
    services::{
        applicant_service, matching_service::MatchingEngine, MongoApplicantStore, MongoJobStore,
    },
    utils::error::AppError,
};

/// The acting account id, taken exclusively from the verified token.
fn account_id(user: &Claims) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(&user.sub)
        .map_err(|_| AppError::Validation("Invalid account id in token".to_string()))
}

fn matching_engine(db: &web::Data<MongoDB>) -> MatchingEngine<MongoApplicantStore, MongoJobStore> {
    MatchingEngine::new(
        MongoApplicantStore::new(db.get_ref().clone()),
        MongoJobStore::new(db.get_ref().clone()),
    )
}

/// POST /api/v1/applicants - creates the applicant profile for the acting
/// account and writes the back-reference onto it.
#[utoipa::path(
    post,
    path = "/api/v1/applicants",
    tag = "Applicants",
    request_body = CreateApplicantRequest,
    responses(
        (status = 200, description = "Applicant created"),
        (status = 400, description = "Missing name or applicant already exists"),
        (status = 500, description = "Store failure")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_applicant(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<CreateApplicantRequest>,
) -> Result<HttpResponse, AppError> {
    let account_id = account_id(&user)?;

    let (applicant, account) =
        applicant_service::create_applicant(&db, account_id, request.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "msg": format!("Applicant {} was added to database", applicant.display_name()),
        "applicant": applicant,
        "account": account,
    })))
}

/// GET /api/v1/applicants - the acting account's applicant with matched
/// jobs expanded.
#[utoipa::path(
    get,
    path = "/api/v1/applicants",
    tag = "Applicants",
    responses(
        (status = 200, description = "Applicant retrieved"),
        (status = 400, description = "No applicant for this account")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_applicant(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
) -> Result<HttpResponse, AppError> {
    let account_id = account_id(&user)?;

    let applicant = applicant_service::get_by_account(&db, account_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "msg": format!("Applicant {} successfully retrieved", applicant.display_name()),
        "applicant": applicant,
    })))
}

/// GET /api/v1/applicants/slug/{slug} - public profile lookup.
#[utoipa::path(
    get,
    path = "/api/v1/applicants/slug/{slug}",
    tag = "Applicants",
    params(("slug" = String, Path, description = "Applicant slug")),
    responses(
        (status = 200, description = "Applicant retrieved"),
        (status = 400, description = "No applicant with that slug")
    )
)]
pub async fn get_applicant_by_slug(
    db: web::Data<MongoDB>,
    slug: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let applicant = applicant_service::get_by_slug(&db, &slug).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "msg": format!("Applicant {} successfully retrieved", applicant.display_name()),
        "applicant": applicant,
    })))
}

/// PUT /api/v1/applicants - partial profile update.
#[utoipa::path(
    put,
    path = "/api/v1/applicants",
    tag = "Applicants",
    request_body = UpdateApplicantRequest,
    responses(
        (status = 200, description = "Applicant updated"),
        (status = 400, description = "No applicant for this account")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_applicant(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<UpdateApplicantRequest>,
) -> Result<HttpResponse, AppError> {
    let account_id = account_id(&user)?;

    let applicant =
        applicant_service::update_applicant(&db, account_id, request.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "msg": format!("Applicant {} successfully updated", applicant.display_name()),
        "applicant": applicant,
    })))
}

/// PATCH /api/v1/applicants/select-job - records interest in a job and
/// reports whether it completed a mutual match.
#[utoipa::path(
    patch,
    path = "/api/v1/applicants/select-job",
    tag = "Matching",
    request_body = SelectJobRequest,
    responses(
        (status = 200, description = "Selection recorded", body = crate::services::matching_service::MatchOutcome),
        (status = 400, description = "Job or applicant not found"),
        (status = 500, description = "Store or consistency failure")
    ),
    security(("bearer_auth" = []))
)]
pub async fn select_job(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<SelectJobRequest>,
) -> Result<HttpResponse, AppError> {
    let account_id = account_id(&user)?;
    let job_id = ObjectId::parse_str(&request.id)
        .map_err(|_| AppError::Validation(format!("Invalid job id: {}", request.id)))?;

    let outcome = matching_engine(&db)
        .register_interest(account_id, job_id)
        .await?;

    let msg = if outcome.is_match {
        "It's a match!"
    } else {
        "Selected job added to list"
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "msg": msg,
        "isMatch": outcome.is_match,
    })))
}

/// POST /api/v1/applicants/reconcile - read-repair of asymmetric match
/// state for the acting applicant.
#[utoipa::path(
    post,
    path = "/api/v1/applicants/reconcile",
    tag = "Matching",
    responses(
        (status = 200, description = "Reconciliation finished"),
        (status = 400, description = "No applicant for this account"),
        (status = 500, description = "Store failure")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reconcile_matches(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
) -> Result<HttpResponse, AppError> {
    let account_id = account_id(&user)?;

    let repaired = matching_engine(&db).reconcile_matches(account_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "msg": format!("Reconciled {} match(es)", repaired),
        "repaired": repaired,
    })))
}

/// DELETE /api/v1/applicants - hard delete with job-side cleanup.
#[utoipa::path(
    delete,
    path = "/api/v1/applicants",
    tag = "Applicants",
    responses(
        (status = 200, description = "Applicant deleted"),
        (status = 400, description = "No applicant for this account")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_applicant(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
) -> Result<HttpResponse, AppError> {
    let account_id = account_id(&user)?;

    let applicant = applicant_service::delete_applicant(&db, account_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "msg": format!("Applicant {} was deleted from the database", applicant.display_name()),
        "applicant": applicant,
    })))
}

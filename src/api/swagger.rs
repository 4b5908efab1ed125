use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "JobMatch Service API",
        version = "1.0.0",
        description = "Profile-management backend for a job-matching platform. \n\n**Authentication:** Applicant endpoints require a JWT Bearer token; the acting account is always resolved from the token, never from the request body.\n\n**Features:**\n- Applicant profile CRUD (one profile per account)\n- Public profile lookup by slug\n- Mutual-interest matching (selection vs. match)\n- Match-state reconciliation (read-repair)\n- Health monitoring",
        contact(
            name = "JobMatch Team",
            email = "support@jobmatch-service.com"
        )
    ),
    paths(
        // Applicants
        crate::api::applicants::create_applicant,
        crate::api::applicants::get_applicant,
        crate::api::applicants::get_applicant_by_slug,
        crate::api::applicants::update_applicant,
        crate::api::applicants::delete_applicant,

        // Matching
        crate::api::applicants::select_job,
        crate::api::applicants::reconcile_matches,

        // Health
        crate::api::health::health_check,
    ),
    components(
        schemas(
            // Applicants
            crate::models::applicant::CreateApplicantRequest,
            crate::models::applicant::UpdateApplicantRequest,
            crate::models::applicant::SelectJobRequest,
            crate::models::applicant::Education,
            crate::models::applicant::WorkExperience,
            crate::models::applicant::Place,

            // Matching
            crate::services::matching_service::MatchOutcome,

            // Health
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Applicants", description = "Applicant profile management. One profile per account; slug is a stable public lookup key."),
        (name = "Matching", description = "Mutual-interest matching. A one-sided selection becomes a match once the job side has selected the applicant too."),
        (name = "Health", description = "Health check endpoint for monitoring service status."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build(),
                ),
            );
        }
    }
}

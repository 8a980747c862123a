use actix_web::{HttpResponse, web};
use shared::{MessageResponse, ModelInfoResponse, VerificationResultsResponse};

use super::{ProjectPath, VerifyLabelPath};
use crate::auth::middleware::AuthenticatedUser;
use crate::error::ApiError;
use crate::jobs::JobCoordinator;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/{project}/train").route(web::post().to(train)))
        .service(web::resource("/{project}/model-info").route(web::get().to(model_info)))
        .service(
            web::resource("/{project}/verify-data/labels/{label}/verify")
                .route(web::post().to(verify)),
        )
        .service(
            web::resource("/{project}/verify-data/labels/{label}/verification-results")
                .route(web::get().to(verification_results)),
        );
}

async fn train(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<ProjectPath>,
    jobs: web::Data<JobCoordinator>,
) -> Result<HttpResponse, ApiError> {
    jobs.train(&session, &path.project).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: "training started".into(),
    }))
}

async fn model_info(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<ProjectPath>,
    jobs: web::Data<JobCoordinator>,
) -> Result<HttpResponse, ApiError> {
    let model_info = jobs.model_info(&session.user, &path.project).await?;
    Ok(HttpResponse::Ok().json(ModelInfoResponse {
        success: true,
        model_info,
    }))
}

async fn verify(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<VerifyLabelPath>,
    jobs: web::Data<JobCoordinator>,
) -> Result<HttpResponse, ApiError> {
    jobs.verify(&session, &path.project, &path.label).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: "verification started".into(),
    }))
}

async fn verification_results(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<VerifyLabelPath>,
    jobs: web::Data<JobCoordinator>,
) -> Result<HttpResponse, ApiError> {
    let results = jobs
        .verification_results(&session.user, &path.project, &path.label)
        .await?;
    Ok(HttpResponse::Ok().json(VerificationResultsResponse {
        success: true,
        results,
    }))
}

use actix_web::{HttpResponse, web};
use shared::{CreateLabelRequest, LabelsResponse, MessageResponse, PushEvent, RenameLabelRequest};

use super::{DataTypePath, LabelPath};
use crate::auth::middleware::AuthenticatedUser;
use crate::error::ApiError;
use crate::push::SessionRegistry;
use crate::storage::project_store::ProjectStore;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/{project}/{data_type}/labels")
            .route(web::get().to(list_labels))
            .route(web::post().to(add_label)),
    )
    .service(web::resource("/{project}/{data_type}/labels/{label}").route(web::delete().to(delete_label)))
    .service(
        web::resource("/{project}/{data_type}/labels/{label}/rename")
            .route(web::put().to(rename_label)),
    );
}

async fn list_labels(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<DataTypePath>,
    projects: web::Data<ProjectStore>,
) -> Result<HttpResponse, ApiError> {
    let labels = projects
        .list_labels(&session.user, &path.project, path.data_type)
        .await?;
    Ok(HttpResponse::Ok().json(LabelsResponse {
        success: true,
        labels,
    }))
}

async fn add_label(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<DataTypePath>,
    body: web::Json<CreateLabelRequest>,
    projects: web::Data<ProjectStore>,
    registry: web::Data<SessionRegistry>,
) -> Result<HttpResponse, ApiError> {
    let label = projects
        .add_label(&session.user, &path.project, path.data_type, &body.label_name)
        .await?;

    registry.push(
        &session.session_id,
        PushEvent::LabelAdded {
            project_name: path.project.trim().to_string(),
            data_type: path.data_type,
            label_name: label.name.clone(),
        },
    );
    Ok(HttpResponse::Created().json(MessageResponse {
        success: true,
        message: format!("label {} added", label.name),
    }))
}

async fn rename_label(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<LabelPath>,
    body: web::Json<RenameLabelRequest>,
    projects: web::Data<ProjectStore>,
) -> Result<HttpResponse, ApiError> {
    projects
        .rename_label(
            &session.user,
            &path.project,
            path.data_type,
            &path.label,
            &body.new_label_name,
        )
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: format!("label renamed to {}", body.new_label_name.trim()),
    }))
}

async fn delete_label(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<LabelPath>,
    projects: web::Data<ProjectStore>,
) -> Result<HttpResponse, ApiError> {
    projects
        .delete_label(&session.user, &path.project, path.data_type, &path.label)
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: format!("label {} deleted", path.label),
    }))
}

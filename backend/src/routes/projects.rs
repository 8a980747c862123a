use actix_web::{HttpResponse, web};
use shared::{
    CreateProjectRequest, MessageResponse, ProjectResponse, ProjectsResponse, PushEvent,
    RenameProjectRequest,
};

use super::ProjectPath;
use crate::auth::middleware::AuthenticatedUser;
use crate::error::ApiError;
use crate::jobs::JobCoordinator;
use crate::push::SessionRegistry;
use crate::storage::project_store::ProjectStore;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list_projects))
            .route(web::post().to(create_project)),
    )
    .service(
        web::resource("/{project}")
            .route(web::get().to(get_project))
            .route(web::delete().to(delete_project)),
    )
    .service(web::resource("/{project}/rename").route(web::put().to(rename_project)));
}

async fn list_projects(
    AuthenticatedUser(session): AuthenticatedUser,
    projects: web::Data<ProjectStore>,
) -> Result<HttpResponse, ApiError> {
    let names = projects.list_projects(&session.user).await?;
    Ok(HttpResponse::Ok().json(ProjectsResponse {
        success: true,
        projects: names,
    }))
}

async fn create_project(
    AuthenticatedUser(session): AuthenticatedUser,
    body: web::Json<CreateProjectRequest>,
    projects: web::Data<ProjectStore>,
    registry: web::Data<SessionRegistry>,
) -> Result<HttpResponse, ApiError> {
    let project = projects
        .create_project(&session.user, &body.project_name)
        .await?;

    registry.push(
        &session.session_id,
        PushEvent::ProjectCreated {
            project_name: project.name.clone(),
        },
    );
    Ok(HttpResponse::Created().json(MessageResponse {
        success: true,
        message: format!("project {} created", project.name),
    }))
}

async fn get_project(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<ProjectPath>,
    projects: web::Data<ProjectStore>,
) -> Result<HttpResponse, ApiError> {
    let project = projects
        .project_details(&session.user, &path.project)
        .await?;
    Ok(HttpResponse::Ok().json(ProjectResponse {
        success: true,
        project,
    }))
}

async fn delete_project(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<ProjectPath>,
    projects: web::Data<ProjectStore>,
    jobs: web::Data<JobCoordinator>,
) -> Result<HttpResponse, ApiError> {
    jobs.board()
        .ensure_project_idle(session.user.id, path.project.trim())?;
    projects.delete_project(&session.user, &path.project).await?;
    jobs.board().forget_project(session.user.id, path.project.trim());

    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: format!("project {} deleted", path.project),
    }))
}

async fn rename_project(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<ProjectPath>,
    body: web::Json<RenameProjectRequest>,
    projects: web::Data<ProjectStore>,
    jobs: web::Data<JobCoordinator>,
) -> Result<HttpResponse, ApiError> {
    jobs.board()
        .ensure_project_idle(session.user.id, path.project.trim())?;
    projects
        .rename_project(&session.user, &path.project, &body.new_project_name)
        .await?;
    jobs.board().forget_project(session.user.id, path.project.trim());

    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: format!("project renamed to {}", body.new_project_name.trim()),
    }))
}

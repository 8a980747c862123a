mod events;
mod images;
mod jobs;
mod labels;
mod projects;
mod uploads;

use actix_files::{Files, NamedFile};
use actix_web::dev::{ServiceRequest, ServiceResponse, fn_service};
use actix_web::web;
use serde::Deserialize;
use shared::DataType;
use std::path::PathBuf;

use crate::auth::middleware::AuthMiddleware;

/// `/api/image-classing/projects/{project}`
#[derive(Debug, Deserialize)]
pub struct ProjectPath {
    pub project: String,
}

/// `/api/image-classing/projects/{project}/{data_type}/labels`
#[derive(Debug, Deserialize)]
pub struct DataTypePath {
    pub project: String,
    pub data_type: DataType,
}

/// `/api/image-classing/projects/{project}/{data_type}/labels/{label}`
#[derive(Debug, Deserialize)]
pub struct LabelPath {
    pub project: String,
    pub data_type: DataType,
    pub label: String,
}

/// `.../labels/{label}/images/{image}`
#[derive(Debug, Deserialize)]
pub struct ImagePath {
    pub project: String,
    pub data_type: DataType,
    pub label: String,
    pub image: String,
}

/// `.../{project}/verify-data/labels/{label}`
#[derive(Debug, Deserialize)]
pub struct VerifyLabelPath {
    pub project: String,
    pub label: String,
}

pub fn configure_routes(
    cfg: &mut web::ServiceConfig,
    frontend_dir: PathBuf,
    auth_middleware: AuthMiddleware,
) {
    cfg.service(
        web::scope("/api")
            .wrap(auth_middleware.clone())
            .service(web::scope("/auth").configure(crate::auth::routes::configure))
            .service(web::resource("/events").route(web::get().to(events::subscribe)))
            .service(
                web::scope("/image-classing/projects")
                    .configure(projects::configure)
                    .configure(jobs::configure)
                    .configure(labels::configure)
                    .configure(images::configure),
            ),
    )
    .service(
        web::scope("/uploads")
            .wrap(auth_middleware)
            .service(
                web::resource("/{username}/image-classing/{tail:.*}")
                    .route(web::get().to(uploads::serve)),
            ),
    )
    .service(spa_files(frontend_dir));
}

/// Static bundle with `index.html` served for every unknown path.
fn spa_files(frontend_dir: PathBuf) -> Files {
    let index = frontend_dir.join("index.html");
    Files::new("/", frontend_dir)
        .index_file("index.html")
        .default_handler(fn_service(move |req: ServiceRequest| {
            let index = index.clone();
            async move {
                let (req, _) = req.into_parts();
                let file = NamedFile::open_async(&index).await?;
                let res = file.into_response(&req);
                Ok(ServiceResponse::new(req, res))
            }
        }))
}

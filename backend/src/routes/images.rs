use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use shared::{
    DeleteImagesRequest, ImagesResponse, MessageResponse, MoveImagesRequest, PushEvent,
    RenameImageRequest,
};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{ImagePath, LabelPath};
use crate::auth::middleware::AuthenticatedUser;
use crate::auth::models::AuthUser;
use crate::config::StorageConfig;
use crate::error::ApiError;
use crate::push::SessionRegistry;
use crate::storage::image_store::{ImageLocation, ImageStore, PendingUpload, discard_staged};
use crate::storage::naming::{IMAGE_EXTENSIONS, is_image_file_name};

const UPLOAD_FIELD: &str = "images";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenamedImageResponse {
    success: bool,
    image_name: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    let label = "/{project}/{data_type}/labels/{label}";
    cfg.service(web::resource(format!("{}/images", label)).route(web::get().to(list_images)))
        .service(web::resource(format!("{}/upload", label)).route(web::post().to(upload_images)))
        .service(
            web::resource(format!("{}/images/{{image}}", label))
                .route(web::delete().to(delete_image)),
        )
        .service(
            web::resource(format!("{}/images/{{image}}/rename", label))
                .route(web::put().to(rename_image)),
        )
        .service(
            web::resource(format!("{}/move-images", label)).route(web::post().to(move_images)),
        )
        .service(
            web::resource(format!("{}/delete-images", label))
                .route(web::post().to(delete_images)),
        );
}

fn location<'a>(user: &'a AuthUser, path: &'a LabelPath) -> ImageLocation<'a> {
    ImageLocation {
        user,
        project: &path.project,
        data_type: path.data_type,
        label: &path.label,
    }
}

async fn list_images(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<LabelPath>,
    images: web::Data<ImageStore>,
) -> Result<HttpResponse, ApiError> {
    let names = images.list_images(&location(&session.user, &path)).await?;
    Ok(HttpResponse::Ok().json(ImagesResponse {
        success: true,
        images: names,
    }))
}

/// Streams every `images` part into `staging_dir`, rejecting the whole
/// request on the first unsupported or oversized file or when there are too
/// many. Nothing staged survives a rejection.
async fn read_upload(
    payload: Multipart,
    limits: &StorageConfig,
    staging_dir: &Path,
) -> Result<Vec<PendingUpload>, ApiError> {
    let mut files = Vec::new();
    if let Err(e) = stage_fields(payload, limits, staging_dir, &mut files).await {
        discard_staged(&files).await;
        return Err(e);
    }
    if files.is_empty() {
        return Err(ApiError::validation("no files uploaded"));
    }
    Ok(files)
}

async fn stage_fields(
    mut payload: Multipart,
    limits: &StorageConfig,
    staging_dir: &Path,
    files: &mut Vec<PendingUpload>,
) -> Result<(), ApiError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::validation(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            while field.next().await.is_some() {}
            continue;
        }

        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(|name| name.to_string())
            .unwrap_or_default();
        if !is_image_file_name(&original_name) {
            return Err(ApiError::validation(format!(
                "unsupported file '{}': allowed types are {}",
                original_name,
                IMAGE_EXTENSIONS.join(", ")
            )));
        }
        if files.len() == limits.max_files_per_upload {
            return Err(ApiError::validation(format!(
                "at most {} files per upload",
                limits.max_files_per_upload
            )));
        }

        let pending = PendingUpload::new(original_name.clone(), staging_dir);
        let mut out = fs::File::create(&pending.staged).await?;
        files.push(pending);

        let mut written: u64 = 0;
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ApiError::validation(format!("upload interrupted: {}", e)))?;
            written += data.len() as u64;
            if written > limits.max_upload_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "file '{}' is larger than {} bytes",
                    original_name, limits.max_upload_bytes
                )));
            }
            out.write_all(&data).await?;
        }
        out.flush().await?;
    }
    Ok(())
}

async fn upload_images(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<LabelPath>,
    payload: Multipart,
    images: web::Data<ImageStore>,
    registry: web::Data<SessionRegistry>,
    storage: web::Data<StorageConfig>,
) -> Result<HttpResponse, ApiError> {
    let at = location(&session.user, &path);
    let staging_dir = images.staging_dir(&at).await?;
    let files = read_upload(payload, &storage, &staging_dir).await?;
    let project_name = path.project.trim().to_string();
    let label_name = path.label.trim().to_string();

    let stored = images
        .upload(&at, files, |processed, total| {
            registry.push(
                &session.session_id,
                PushEvent::UploadProgress {
                    project_name: project_name.clone(),
                    data_type: path.data_type,
                    label_name: label_name.clone(),
                    processed,
                    total,
                },
            );
        })
        .await?;

    registry.push(
        &session.session_id,
        PushEvent::UploadCompleted {
            project_name,
            data_type: path.data_type,
            label_name,
            images: stored.clone(),
        },
    );
    Ok(HttpResponse::Ok().json(ImagesResponse {
        success: true,
        images: stored,
    }))
}

async fn delete_image(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<ImagePath>,
    images: web::Data<ImageStore>,
    registry: web::Data<SessionRegistry>,
) -> Result<HttpResponse, ApiError> {
    let ImagePath {
        project,
        data_type,
        label,
        image,
    } = path.into_inner();
    let at = ImageLocation {
        user: &session.user,
        project: &project,
        data_type,
        label: &label,
    };
    images.delete_image(&at, &image).await?;

    registry.push(
        &session.session_id,
        PushEvent::ImageDeleted {
            project_name: project.trim().to_string(),
            data_type,
            label_name: label.trim().to_string(),
            images: vec![image.trim().to_string()],
        },
    );
    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: format!("image {} deleted", image.trim()),
    }))
}

async fn delete_images(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<LabelPath>,
    body: web::Json<DeleteImagesRequest>,
    images: web::Data<ImageStore>,
    registry: web::Data<SessionRegistry>,
) -> Result<HttpResponse, ApiError> {
    let deleted = images
        .delete_images(&location(&session.user, &path), &body.images)
        .await?;

    registry.push(
        &session.session_id,
        PushEvent::ImageDeleted {
            project_name: path.project.trim().to_string(),
            data_type: path.data_type,
            label_name: path.label.trim().to_string(),
            images: deleted.clone(),
        },
    );
    Ok(HttpResponse::Ok().json(ImagesResponse {
        success: true,
        images: deleted,
    }))
}

async fn move_images(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<LabelPath>,
    body: web::Json<MoveImagesRequest>,
    images: web::Data<ImageStore>,
    registry: web::Data<SessionRegistry>,
) -> Result<HttpResponse, ApiError> {
    let report = images
        .move_images(&location(&session.user, &path), &body.target_label, &body.images)
        .await?;

    let project_name = path.project.trim().to_string();
    let target = body.target_label.trim().to_string();
    if report.target_created {
        registry.push(
            &session.session_id,
            PushEvent::LabelAdded {
                project_name: project_name.clone(),
                data_type: path.data_type,
                label_name: target.clone(),
            },
        );
    }
    registry.push(
        &session.session_id,
        PushEvent::ImageMoved {
            project_name,
            data_type: path.data_type,
            from_label: path.label.trim().to_string(),
            to_label: target.clone(),
            images: report.moved.clone(),
        },
    );

    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: format!("{} image(s) moved to {}", report.moved.len(), target),
    }))
}

async fn rename_image(
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<ImagePath>,
    body: web::Json<RenameImageRequest>,
    images: web::Data<ImageStore>,
) -> Result<HttpResponse, ApiError> {
    let at = ImageLocation {
        user: &session.user,
        project: &path.project,
        data_type: path.data_type,
        label: &path.label,
    };
    let image_name = images
        .rename_image(&at, &path.image, &body.new_image_name)
        .await?;

    Ok(HttpResponse::Ok().json(RenamedImageResponse {
        success: true,
        image_name,
    }))
}

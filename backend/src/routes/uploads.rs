use actix_files::NamedFile;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use std::path::PathBuf;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::ApiError;
use crate::storage::layout::UploadLayout;
use crate::storage::naming::validate_segment;

#[derive(Debug, Deserialize)]
pub struct UploadPath {
    username: String,
    tail: String,
}

/// Resolves `<tail>` under the caller's own app directory. Any other user's
/// tree, or a segment that would climb out, is reported as missing.
fn resolve(layout: &UploadLayout, owner: &str, path: &UploadPath) -> Result<PathBuf, ApiError> {
    if path.username != owner {
        return Err(ApiError::not_found("file not found"));
    }

    let mut resolved = layout.user_dir(owner);
    let mut segments = 0;
    for segment in path.tail.split('/').filter(|s| !s.is_empty()) {
        let segment = validate_segment("path", segment)
            .map_err(|_| ApiError::not_found("file not found"))?;
        resolved.push(segment);
        segments += 1;
    }
    if segments == 0 {
        return Err(ApiError::not_found("file not found"));
    }
    Ok(resolved)
}

pub async fn serve(
    req: HttpRequest,
    AuthenticatedUser(session): AuthenticatedUser,
    path: web::Path<UploadPath>,
    layout: web::Data<UploadLayout>,
) -> Result<HttpResponse, ApiError> {
    let file_path = resolve(&layout, &session.user.username, &path)?;
    let file = NamedFile::open_async(&file_path).await.map_err(|e| {
        log::warn!("Upload {} not served: {}", file_path.display(), e);
        ApiError::from(e)
    })?;
    if !file.metadata().is_file() {
        return Err(ApiError::not_found("file not found"));
    }
    Ok(file.into_response(&req))
}

use std::path::Path;
use uuid::Uuid;

use super::StorageError;

/// Extensions accepted for upload and shown in image listings.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

const MAX_SEGMENT_LEN: usize = 128;

/// Checks that a user-supplied name is safe to use as a single path segment.
pub fn validate_segment<'a>(kind: &str, name: &'a str) -> Result<&'a str, StorageError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StorageError::InvalidName(format!("{} name is required", kind)));
    }
    if trimmed.len() > MAX_SEGMENT_LEN {
        return Err(StorageError::InvalidName(format!(
            "{} name must be at most {} characters",
            kind, MAX_SEGMENT_LEN
        )));
    }
    if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidName(format!(
            "{} name contains forbidden characters",
            kind
        )));
    }
    Ok(trimmed)
}

pub fn validate_username(username: &str) -> Result<&str, StorageError> {
    let valid = !username.is_empty()
        && username.len() <= 64
        && username != "."
        && username != ".."
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(username)
    } else {
        Err(StorageError::InvalidName(
            "username must be 1-64 characters of letters, digits, '_', '.' or '-'".into(),
        ))
    }
}

/// Lower-cased extension without the dot, if the file has one.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_image_file_name(file_name: &str) -> bool {
    extension_of(file_name)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// `<uuid-v4>.<ext>` where `ext` keeps the spelling of the uploaded name.
pub fn generate_image_name(original_name: &str) -> Result<String, StorageError> {
    if !is_image_file_name(original_name) {
        return Err(StorageError::Unsupported(format!(
            "unsupported image type: {} (allowed: {})",
            original_name,
            IMAGE_EXTENSIONS.join(", ")
        )));
    }
    let ext = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    Ok(format!("{}.{}", Uuid::new_v4(), ext))
}

/// Hidden name an upload is streamed to before it gets its final name.
/// Listings skip it because the extension is not an image one.
pub fn staged_upload_name() -> String {
    format!(".upload-{}.part", Uuid::new_v4())
}

/// Resolves the target name for an image rename. A name without an extension
/// keeps the current one.
pub fn renamed_image_name(current: &str, requested: &str) -> Result<String, StorageError> {
    let requested = validate_segment("image", requested)?;
    if extension_of(requested).is_some() {
        if !is_image_file_name(requested) {
            return Err(StorageError::Unsupported(format!(
                "unsupported image type: {}",
                requested
            )));
        }
        return Ok(requested.to_string());
    }
    match Path::new(current).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => Ok(format!("{}.{}", requested, ext)),
        None => Ok(requested.to_string()),
    }
}

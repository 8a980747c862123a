use shared::{DataType, IntoEnumIterator};
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "image-classing";
pub const MODEL_DIR: &str = "model";
pub const MODEL_FILE: &str = "model.json";
pub const CLASSES_FILE: &str = "classes.json";
pub const VERIFY_RESULT_FILE: &str = "verify-result.json";

/// Maps (user, project, data type, label, image) onto the uploads tree:
/// `<root>/<username>/image-classing/<project>/<data type>/<label>/<image>`.
///
/// Callers validate every segment before resolving a path.
#[derive(Debug, Clone)]
pub struct UploadLayout {
    root: PathBuf,
}

impl UploadLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_dir(&self, username: &str) -> PathBuf {
        self.root.join(username).join(APP_DIR)
    }

    pub fn project_dir(&self, username: &str, project: &str) -> PathBuf {
        self.user_dir(username).join(project)
    }

    pub fn data_dir(&self, username: &str, project: &str, data_type: DataType) -> PathBuf {
        self.project_dir(username, project).join(data_type.dir_name())
    }

    pub fn label_dir(
        &self,
        username: &str,
        project: &str,
        data_type: DataType,
        label: &str,
    ) -> PathBuf {
        self.data_dir(username, project, data_type).join(label)
    }

    pub fn image_path(
        &self,
        username: &str,
        project: &str,
        data_type: DataType,
        label: &str,
        image: &str,
    ) -> PathBuf {
        self.label_dir(username, project, data_type, label).join(image)
    }

    pub fn model_dir(&self, username: &str, project: &str) -> PathBuf {
        self.project_dir(username, project).join(MODEL_DIR)
    }

    pub fn model_file(&self, username: &str, project: &str) -> PathBuf {
        self.model_dir(username, project).join(MODEL_FILE)
    }

    pub fn classes_file(&self, username: &str, project: &str) -> PathBuf {
        self.model_dir(username, project).join(CLASSES_FILE)
    }

    pub fn verify_result_file(&self, username: &str, project: &str, label: &str) -> PathBuf {
        self.label_dir(username, project, DataType::Verification, label)
            .join(VERIFY_RESULT_FILE)
    }

    /// Directories every project starts with.
    pub fn project_skeleton(&self, username: &str, project: &str) -> Vec<PathBuf> {
        DataType::iter()
            .map(|data_type| self.data_dir(username, project, data_type))
            .collect()
    }
}

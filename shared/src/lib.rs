use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub use strum::IntoEnumIterator;

/// The two fixed sub-collections every project carries.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
    EnumIter,
)]
pub enum DataType {
    #[serde(rename = "training-data")]
    #[strum(serialize = "training-data")]
    Training,
    #[serde(rename = "verify-data")]
    #[strum(serialize = "verify-data")]
    Verification,
}

impl DataType {
    /// Directory name used on disk and in API paths.
    pub fn dir_name(&self) -> &'static str {
        match self {
            DataType::Training => "training-data",
            DataType::Verification => "verify-data",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Training,
    Verifying,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, JobStatus::Training | JobStatus::Verifying)
    }
}

/// Events delivered over the push channel. Serialized as
/// `{"event": "<name>", "data": {...}}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
#[serde(rename_all_fields = "camelCase")]
pub enum PushEvent {
    Connected,
    SessionExpired,
    ProjectCreated {
        project_name: String,
    },
    LabelAdded {
        project_name: String,
        data_type: DataType,
        label_name: String,
    },
    ImageMoved {
        project_name: String,
        data_type: DataType,
        from_label: String,
        to_label: String,
        images: Vec<String>,
    },
    ImageDeleted {
        project_name: String,
        data_type: DataType,
        label_name: String,
        images: Vec<String>,
    },
    UploadProgress {
        project_name: String,
        data_type: DataType,
        label_name: String,
        processed: usize,
        total: usize,
    },
    UploadCompleted {
        project_name: String,
        data_type: DataType,
        label_name: String,
        images: Vec<String>,
    },
    TrainingProgress {
        project_name: String,
        status: JobStatus,
        message: String,
    },
    ValidationProgress {
        project_name: String,
        label_name: String,
        status: JobStatus,
        message: String,
    },
}

impl PushEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::Connected => "connected",
            PushEvent::SessionExpired => "sessionExpired",
            PushEvent::ProjectCreated { .. } => "projectCreated",
            PushEvent::LabelAdded { .. } => "labelAdded",
            PushEvent::ImageMoved { .. } => "imageMoved",
            PushEvent::ImageDeleted { .. } => "imageDeleted",
            PushEvent::UploadProgress { .. } => "uploadProgress",
            PushEvent::UploadCompleted { .. } => "uploadCompleted",
            PushEvent::TrainingProgress { .. } => "trainingProgress",
            PushEvent::ValidationProgress { .. } => "validationProgress",
        }
    }
}

// Request bodies

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub project_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RenameProjectRequest {
    #[serde(default)]
    pub new_project_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabelRequest {
    #[serde(default)]
    pub label_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RenameLabelRequest {
    #[serde(default)]
    pub new_label_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RenameImageRequest {
    #[serde(default)]
    pub new_image_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct MoveImagesRequest {
    #[serde(default)]
    pub target_label: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DeleteImagesRequest {
    #[serde(default)]
    pub images: Vec<String>,
}

// Response bodies

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProjectsResponse {
    pub success: bool,
    pub projects: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    pub id: String,
    pub created_at: String,
    pub trained: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProjectResponse {
    pub success: bool,
    pub project: ProjectDetails,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LabelsResponse {
    pub success: bool,
    pub labels: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImagesResponse {
    pub success: bool,
    pub images: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub trained: bool,
    pub classes: Vec<String>,
    pub training_status: JobStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfoResponse {
    pub success: bool,
    pub model_info: ModelInfo,
}

/// Per-image, per-class confidence mapping returned to the client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResults {
    pub classes: Vec<String>,
    pub images: BTreeMap<String, BTreeMap<String, f64>>,
    pub exec_time_ms: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VerificationResultsResponse {
    pub success: bool,
    pub results: VerificationResults,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn data_type_uses_directory_names() {
        assert_eq!(DataType::from_str("training-data").unwrap(), DataType::Training);
        assert_eq!(DataType::from_str("verify-data").unwrap(), DataType::Verification);
        assert!(DataType::from_str("training").is_err());
        assert_eq!(DataType::Verification.to_string(), "verify-data");
        assert_eq!(
            serde_json::to_string(&DataType::Training).unwrap(),
            "\"training-data\""
        );
    }

    #[test]
    fn push_event_is_tagged() {
        let event = PushEvent::TrainingProgress {
            project_name: "cats".into(),
            status: JobStatus::Completed,
            message: "training finished".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "trainingProgress");
        assert_eq!(json["data"]["projectName"], "cats");
        assert_eq!(json["data"]["status"], "completed");
        assert_eq!(event.name(), "trainingProgress");

        let expired = serde_json::to_value(PushEvent::SessionExpired).unwrap();
        assert_eq!(expired["event"], "sessionExpired");
    }

    #[test]
    fn move_request_reads_camel_case() {
        let body: MoveImagesRequest =
            serde_json::from_str(r#"{"targetLabel":"dogs","images":["a.png"]}"#).unwrap();
        assert_eq!(body.target_label, "dogs");
        assert_eq!(body.images, vec!["a.png".to_string()]);
    }
}

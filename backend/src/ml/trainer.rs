use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::VerificationResults;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),
    #[error("Trainer responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Trainer returned an unusable result: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfidences {
    pub name: String,
    pub confidences: Vec<f64>,
}

/// Document returned by a verification run and stored as `verify-result.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub classes: Vec<String>,
    #[serde(default)]
    pub images: Vec<ImageConfidences>,
    #[serde(rename = "execTime_ms", default, skip_serializing_if = "Option::is_none")]
    pub exec_time_ms: Option<f64>,
}

impl VerificationReport {
    /// Every image needs one confidence per class.
    pub fn validate(&self) -> Result<(), TrainerError> {
        match self
            .images
            .iter()
            .find(|image| image.confidences.len() != self.classes.len())
        {
            Some(image) => Err(TrainerError::InvalidResponse(format!(
                "{} has {} confidences for {} classes",
                image.name,
                image.confidences.len(),
                self.classes.len()
            ))),
            None => Ok(()),
        }
    }
}

impl From<VerificationReport> for VerificationResults {
    fn from(report: VerificationReport) -> Self {
        let images = report
            .images
            .into_iter()
            .map(|image| {
                let by_class: BTreeMap<String, f64> = report
                    .classes
                    .iter()
                    .cloned()
                    .zip(image.confidences)
                    .collect();
                (image.name, by_class)
            })
            .collect();

        VerificationResults {
            classes: report.classes,
            images,
            exec_time_ms: report.exec_time_ms,
        }
    }
}

/// The external helper that fits and evaluates models. Long-running: callers
/// spawn these and report back over the push channel.
#[async_trait]
pub trait ModelTrainer: Send + Sync {
    async fn train(
        &self,
        training_data_dir: &Path,
        model_dir: &Path,
    ) -> Result<TrainingOutcome, TrainerError>;

    async fn verify(
        &self,
        model_dir: &Path,
        verify_data_dir: &Path,
    ) -> Result<VerificationReport, TrainerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_maps_confidences_by_class() {
        let report: VerificationReport = serde_json::from_str(
            r#"{
                "classes": ["cat", "dog"],
                "images": [{"name": "a.png", "confidences": [0.9, 0.1]}],
                "execTime_ms": 12.5
            }"#,
        )
        .unwrap();
        report.validate().unwrap();

        let results = VerificationResults::from(report);
        assert_eq!(results.classes, vec!["cat", "dog"]);
        assert_eq!(results.images["a.png"]["cat"], 0.9);
        assert_eq!(results.images["a.png"]["dog"], 0.1);
        assert_eq!(results.exec_time_ms, Some(12.5));
    }

    #[test]
    fn mismatched_confidences_are_rejected() {
        let report = VerificationReport {
            classes: vec!["cat".into(), "dog".into()],
            images: vec![ImageConfidences {
                name: "a.png".into(),
                confidences: vec![1.0],
            }],
            exec_time_ms: None,
        };
        assert!(matches!(
            report.validate(),
            Err(TrainerError::InvalidResponse(_))
        ));
    }
}

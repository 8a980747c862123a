use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use url::Url;

use super::trainer::{ModelTrainer, TrainerError, TrainingOutcome, VerificationReport};
use crate::config::TrainerConfig;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrainRequest<'a> {
    training_data_dir: &'a str,
    model_dir: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    model_dir: &'a str,
    verify_data_dir: &'a str,
}

/// Talks to the ML helper service over HTTP. Directories are passed as
/// absolute paths; the helper shares the uploads volume.
#[derive(Clone)]
pub struct HttpTrainer {
    http_client: HttpClient,
    base_url: Url,
}

impl HttpTrainer {
    pub fn new(config: &TrainerConfig) -> Result<Self, TrainerError> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(&base)?,
        })
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, TrainerError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.base_url.join(endpoint)?;
        log::debug!("POST {}", url);

        let response = self.http_client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrainerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

fn path_str(path: &Path) -> Result<&str, TrainerError> {
    path.to_str()
        .ok_or_else(|| TrainerError::InvalidResponse(format!("non UTF-8 path {}", path.display())))
}

#[async_trait]
impl ModelTrainer for HttpTrainer {
    async fn train(
        &self,
        training_data_dir: &Path,
        model_dir: &Path,
    ) -> Result<TrainingOutcome, TrainerError> {
        let request = TrainRequest {
            training_data_dir: path_str(training_data_dir)?,
            model_dir: path_str(model_dir)?,
        };
        self.post("train", &request).await
    }

    async fn verify(
        &self,
        model_dir: &Path,
        verify_data_dir: &Path,
    ) -> Result<VerificationReport, TrainerError> {
        let request = VerifyRequest {
            model_dir: path_str(model_dir)?,
            verify_data_dir: path_str(verify_data_dir)?,
        };
        let report: VerificationReport = self.post("verify", &request).await?;
        report.validate()?;
        Ok(report)
    }
}

use shared::{DataType, JobStatus, ModelInfo, PushEvent, VerificationResults};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;

use super::JobError;
use super::state::{JobBoard, JobKey};
use crate::auth::models::{AuthUser, SessionContext};
use crate::ml::{ModelTrainer, TrainingOutcome, VerificationReport};
use crate::push::SessionRegistry;
use crate::storage::StorageError;
use crate::storage::project_store::ProjectStore;

/// Starts training and verification runs on the external helper and reports
/// their outcome over the push channel. Requests return as soon as a run is
/// spawned.
#[derive(Clone)]
pub struct JobCoordinator {
    projects: ProjectStore,
    registry: SessionRegistry,
    trainer: Arc<dyn ModelTrainer>,
    board: JobBoard,
}

impl JobCoordinator {
    pub fn new(
        projects: ProjectStore,
        registry: SessionRegistry,
        trainer: Arc<dyn ModelTrainer>,
        board: JobBoard,
    ) -> Self {
        Self {
            projects,
            registry,
            trainer,
            board,
        }
    }

    pub fn board(&self) -> &JobBoard {
        &self.board
    }

    pub async fn train(&self, session: &SessionContext, project: &str) -> Result<(), JobError> {
        let user = &session.user;
        let project = self.projects.require_project(user, project).await?;
        if !self.registry.is_connected(&session.session_id) {
            log::warn!("Training of {} refused: no push connection", project.name);
            return Err(JobError::NotConnected);
        }

        let key = JobKey::training(user.id, &project.name);
        self.board.start(&key)?;

        let layout = self.projects.layout();
        let data_dir = layout.data_dir(&user.username, &project.name, DataType::Training);
        let model_dir = layout.model_dir(&user.username, &project.name);
        let classes_file = layout.classes_file(&user.username, &project.name);
        if let Err(e) = fs::create_dir_all(&model_dir).await {
            self.board.fail(&key, e.to_string());
            return Err(e.into());
        }

        log::info!("Training started for {}", project.name);
        self.registry.push(
            &session.session_id,
            PushEvent::TrainingProgress {
                project_name: project.name.clone(),
                status: JobStatus::Training,
                message: "training started".into(),
            },
        );

        let run = TrainingRun {
            key,
            session_id: session.session_id.clone(),
            data_dir,
            model_dir,
            classes_file,
        };
        let this = self.clone();
        tokio::spawn(async move { this.finish_training(run).await });
        Ok(())
    }

    async fn finish_training(&self, run: TrainingRun) {
        let project = run.key.project.clone();
        let result = match self.trainer.train(&run.data_dir, &run.model_dir).await {
            Ok(outcome) => write_classes(&run.classes_file, &outcome)
                .await
                .map(|_| outcome)
                .map_err(|e| format!("could not store classes: {}", e)),
            Err(e) => Err(e.to_string()),
        };

        let event = match result {
            Ok(outcome) => {
                self.board.complete(&run.key);
                log::info!(
                    "Training of {} completed with {} classes",
                    project,
                    outcome.classes.len()
                );
                PushEvent::TrainingProgress {
                    project_name: project,
                    status: JobStatus::Completed,
                    message: format!("training completed ({} classes)", outcome.classes.len()),
                }
            }
            Err(reason) => {
                log::error!("Training of {} failed: {}", project, reason);
                self.board.fail(&run.key, reason.clone());
                PushEvent::TrainingProgress {
                    project_name: project,
                    status: JobStatus::Failed,
                    message: format!("training failed: {}", reason),
                }
            }
        };
        self.registry.push(&run.session_id, event);
    }

    pub async fn verify(
        &self,
        session: &SessionContext,
        project: &str,
        label: &str,
    ) -> Result<(), JobError> {
        let user = &session.user;
        let project = self.projects.require_project(user, project).await?;
        let label = self
            .projects
            .require_label(&project, DataType::Verification, label)
            .await?;

        let layout = self.projects.layout();
        if !fs::try_exists(layout.model_file(&user.username, &project.name)).await? {
            log::warn!("Verification of {} refused: model missing", project.name);
            return Err(JobError::ModelNotFound);
        }

        let key = JobKey::verification(user.id, &project.name, &label.name);
        self.board.start(&key)?;

        let run = VerificationRun {
            key,
            session_id: session.session_id.clone(),
            label: label.name.clone(),
            model_dir: layout.model_dir(&user.username, &project.name),
            label_dir: layout.label_dir(
                &user.username,
                &project.name,
                DataType::Verification,
                &label.name,
            ),
            result_file: layout.verify_result_file(&user.username, &project.name, &label.name),
        };

        log::info!("Verification started for {}/{}", project.name, label.name);
        self.registry.push(
            &session.session_id,
            PushEvent::ValidationProgress {
                project_name: project.name.clone(),
                label_name: label.name.clone(),
                status: JobStatus::Verifying,
                message: "verification started".into(),
            },
        );

        let this = self.clone();
        tokio::spawn(async move { this.finish_verification(run).await });
        Ok(())
    }

    async fn finish_verification(&self, run: VerificationRun) {
        let project = run.key.project.clone();
        let result = match self.trainer.verify(&run.model_dir, &run.label_dir).await {
            Ok(report) => write_report(&run.result_file, &report)
                .await
                .map_err(|e| format!("could not store results: {}", e)),
            Err(e) => Err(e.to_string()),
        };

        let (status, message) = match result {
            Ok(()) => {
                self.board.complete(&run.key);
                log::info!("Verification of {}/{} completed", project, run.label);
                (JobStatus::Completed, "verification completed".to_string())
            }
            Err(reason) => {
                log::error!("Verification of {}/{} failed: {}", project, run.label, reason);
                self.board.fail(&run.key, reason.clone());
                (JobStatus::Failed, format!("verification failed: {}", reason))
            }
        };

        // No connection is required to verify; a missing one just drops the event.
        self.registry.push(
            &run.session_id,
            PushEvent::ValidationProgress {
                project_name: project,
                label_name: run.label,
                status,
                message,
            },
        );
    }

    pub async fn model_info(&self, user: &AuthUser, project: &str) -> Result<ModelInfo, JobError> {
        let project = self.projects.require_project(user, project).await?;
        let trained = self.projects.is_trained(user, &project.name).await;

        let classes_file = self
            .projects
            .layout()
            .classes_file(&user.username, &project.name);
        let classes = match fs::read(&classes_file).await {
            Ok(bytes) => serde_json::from_slice::<TrainingOutcome>(&bytes)
                .map(|outcome| outcome.classes)
                .map_err(|e| JobError::Corrupt(format!("{}: {}", classes_file.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let key = JobKey::training(user.id, &project.name);
        Ok(ModelInfo {
            trained,
            classes,
            training_status: self.board.state(&key).status(key.kind),
        })
    }

    pub async fn verification_results(
        &self,
        user: &AuthUser,
        project: &str,
        label: &str,
    ) -> Result<VerificationResults, JobError> {
        let project = self.projects.require_project(user, project).await?;
        let label = self
            .projects
            .require_label(&project, DataType::Verification, label)
            .await?;

        let path = self
            .projects
            .layout()
            .verify_result_file(&user.username, &project.name, &label.name);
        let bytes = fs::read(&path).await.map_err(|e| {
            StorageError::io_for(e, format!("verification results for {}", label.name))
        })?;
        let report: VerificationReport = serde_json::from_slice(&bytes)
            .map_err(|e| JobError::Corrupt(format!("{}: {}", path.display(), e)))?;
        Ok(report.into())
    }
}

struct TrainingRun {
    key: JobKey,
    session_id: String,
    data_dir: PathBuf,
    model_dir: PathBuf,
    classes_file: PathBuf,
}

struct VerificationRun {
    key: JobKey,
    session_id: String,
    label: String,
    model_dir: PathBuf,
    label_dir: PathBuf,
    result_file: PathBuf,
}

async fn write_classes(path: &std::path::Path, outcome: &TrainingOutcome) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(outcome)?;
    fs::write(path, json).await
}

async fn write_report(path: &std::path::Path, report: &VerificationReport) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(report)?;
    fs::write(path, json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::TrainerError;
    use crate::ml::trainer::ImageConfidences;
    use crate::push::PushStream;
    use crate::push::registry::tests::RecordingLifecycle;
    use crate::storage::project_store::tests::store;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use futures::StreamExt;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeTrainer {
        train_calls: AtomicUsize,
        verify_calls: AtomicUsize,
        fail: bool,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl ModelTrainer for FakeTrainer {
        async fn train(
            &self,
            _training_data_dir: &Path,
            model_dir: &Path,
        ) -> Result<TrainingOutcome, TrainerError> {
            self.train_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(TrainerError::InvalidResponse("helper exploded".into()));
            }
            std::fs::write(model_dir.join("model.json"), "{}").unwrap();
            Ok(TrainingOutcome {
                classes: vec!["cat".into(), "dog".into()],
            })
        }

        async fn verify(
            &self,
            _model_dir: &Path,
            _verify_data_dir: &Path,
        ) -> Result<VerificationReport, TrainerError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            Ok(VerificationReport {
                classes: vec!["cat".into(), "dog".into()],
                images: vec![ImageConfidences {
                    name: "a.png".into(),
                    confidences: vec![0.75, 0.25],
                }],
                exec_time_ms: Some(3.0),
            })
        }
    }

    struct Fixture {
        coordinator: JobCoordinator,
        projects: ProjectStore,
        registry: SessionRegistry,
        trainer: Arc<FakeTrainer>,
        session: SessionContext,
        _dir: TempDir,
    }

    async fn fixture(trainer: FakeTrainer) -> Fixture {
        let (projects, user, dir) = store().await;
        projects.create_project(&user, "cats").await.unwrap();
        projects
            .add_label(&user, "cats", DataType::Verification, "batch")
            .await
            .unwrap();

        let registry = SessionRegistry::new(Arc::new(RecordingLifecycle::default()));
        let trainer = Arc::new(trainer);
        let coordinator = JobCoordinator::new(
            projects.clone(),
            registry.clone(),
            trainer.clone(),
            JobBoard::new(),
        );
        let session = SessionContext {
            session_id: "session-1".into(),
            user,
            expires_at: Utc::now() + Duration::minutes(30),
        };
        Fixture {
            coordinator,
            projects,
            registry,
            trainer,
            session,
            _dir: dir,
        }
    }

    async fn next_event(stream: &mut PushStream) -> PushEvent {
        let frame = tokio::time::timeout(std::time::Duration::from_secs(5), stream.next())
            .await
            .expect("no event in time")
            .expect("stream ended")
            .unwrap();
        let text = std::str::from_utf8(&frame).unwrap();
        serde_json::from_str(text.trim_start_matches("data: ").trim()).unwrap()
    }

    async fn wait_for_status(stream: &mut PushStream, wanted: JobStatus) -> PushEvent {
        loop {
            let event = next_event(stream).await;
            match &event {
                PushEvent::TrainingProgress { status, .. }
                | PushEvent::ValidationProgress { status, .. }
                    if *status == wanted =>
                {
                    return event;
                }
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn train_without_connection_never_calls_the_helper() {
        let f = fixture(FakeTrainer::default()).await;

        let result = f.coordinator.train(&f.session, "cats").await;
        assert!(matches!(result, Err(JobError::NotConnected)));
        assert_eq!(f.trainer.train_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn verify_before_training_reports_missing_model() {
        let f = fixture(FakeTrainer::default()).await;

        let result = f.coordinator.verify(&f.session, "cats", "batch").await;
        assert!(matches!(result, Err(JobError::ModelNotFound)));
        assert_eq!(f.trainer.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let f = fixture(FakeTrainer::default()).await;
        let result = f.coordinator.train(&f.session, "dogs").await;
        assert!(matches!(
            result,
            Err(JobError::Storage(StorageError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn training_then_verification_round() {
        let f = fixture(FakeTrainer::default()).await;
        let mut stream = f
            .registry
            .connect(&f.session.session_id, f.session.expires_at);
        assert_eq!(next_event(&mut stream).await, PushEvent::Connected);

        f.coordinator.train(&f.session, "cats").await.unwrap();
        wait_for_status(&mut stream, JobStatus::Completed).await;

        let info = f
            .coordinator
            .model_info(&f.session.user, "cats")
            .await
            .unwrap();
        assert!(info.trained);
        assert_eq!(info.classes, vec!["cat", "dog"]);
        assert_eq!(info.training_status, JobStatus::Completed);

        f.coordinator
            .verify(&f.session, "cats", "batch")
            .await
            .unwrap();
        let event = wait_for_status(&mut stream, JobStatus::Completed).await;
        assert!(matches!(event, PushEvent::ValidationProgress { .. }));

        let results = f
            .coordinator
            .verification_results(&f.session.user, "cats", "batch")
            .await
            .unwrap();
        assert_eq!(results.images["a.png"]["cat"], 0.75);
        assert!(
            f.projects
                .layout()
                .verify_result_file("alice", "cats", "batch")
                .exists()
        );
    }

    #[tokio::test]
    async fn training_failure_is_pushed() {
        let f = fixture(FakeTrainer {
            fail: true,
            ..FakeTrainer::default()
        })
        .await;
        let mut stream = f
            .registry
            .connect(&f.session.session_id, f.session.expires_at);

        f.coordinator.train(&f.session, "cats").await.unwrap();
        let event = wait_for_status(&mut stream, JobStatus::Failed).await;
        match event {
            PushEvent::TrainingProgress { message, .. } => {
                assert!(message.contains("helper exploded"))
            }
            other => panic!("unexpected event {:?}", other),
        }

        let info = f
            .coordinator
            .model_info(&f.session.user, "cats")
            .await
            .unwrap();
        assert!(!info.trained);
        assert_eq!(info.training_status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn second_training_while_running_conflicts() {
        let gate = Arc::new(Notify::new());
        let f = fixture(FakeTrainer {
            gate: Some(gate.clone()),
            ..FakeTrainer::default()
        })
        .await;
        let mut stream = f
            .registry
            .connect(&f.session.session_id, f.session.expires_at);

        f.coordinator.train(&f.session, "cats").await.unwrap();
        assert!(matches!(
            f.coordinator.train(&f.session, "cats").await,
            Err(JobError::AlreadyRunning(_))
        ));

        gate.notify_one();
        wait_for_status(&mut stream, JobStatus::Completed).await;
        assert_eq!(f.trainer.train_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_results_are_not_found() {
        let f = fixture(FakeTrainer::default()).await;
        let result = f
            .coordinator
            .verification_results(&f.session.user, "cats", "batch")
            .await;
        assert!(matches!(
            result,
            Err(JobError::Storage(StorageError::NotFound(_)))
        ));
    }
}

use chrono::{DateTime, Utc};
use shared::JobStatus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::JobError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Training,
    Verification,
}

/// Training is tracked per project, verification per verify-data label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub user_id: i64,
    pub project: String,
    pub kind: JobKind,
    pub label: Option<String>,
}

impl JobKey {
    pub fn training(user_id: i64, project: &str) -> Self {
        Self {
            user_id,
            project: project.to_string(),
            kind: JobKind::Training,
            label: None,
        }
    }

    pub fn verification(user_id: i64, project: &str, label: &str) -> Self {
        Self {
            user_id,
            project: project.to_string(),
            kind: JobKind::Verification,
            label: Some(label.to_string()),
        }
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.label) {
            (JobKind::Verification, Some(label)) => {
                format!("verification of {}/{}", self.project, label)
            }
            _ => format!("training of {}", self.project),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Idle,
    Running { started_at: DateTime<Utc> },
    Completed { finished_at: DateTime<Utc> },
    Failed { finished_at: DateTime<Utc>, reason: String },
}

impl JobState {
    pub fn status(&self, kind: JobKind) -> JobStatus {
        match (self, kind) {
            (JobState::Idle, _) => JobStatus::Idle,
            (JobState::Running { .. }, JobKind::Training) => JobStatus::Training,
            (JobState::Running { .. }, JobKind::Verification) => JobStatus::Verifying,
            (JobState::Completed { .. }, _) => JobStatus::Completed,
            (JobState::Failed { .. }, _) => JobStatus::Failed,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running { .. })
    }
}

/// In-memory job states. Only `start` may enter `Running`, and only
/// `complete`/`fail` may leave it.
#[derive(Clone, Default)]
pub struct JobBoard {
    states: Arc<Mutex<HashMap<JobKey, JobState>>>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn states(&self) -> MutexGuard<'_, HashMap<JobKey, JobState>> {
        match self.states.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn start(&self, key: &JobKey) -> Result<(), JobError> {
        let mut states = self.states();
        if states.get(key).map(JobState::is_running).unwrap_or(false) {
            return Err(JobError::AlreadyRunning(key.describe()));
        }
        states.insert(
            key.clone(),
            JobState::Running {
                started_at: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn complete(&self, key: &JobKey) {
        self.finish(
            key,
            JobState::Completed {
                finished_at: Utc::now(),
            },
        );
    }

    pub fn fail(&self, key: &JobKey, reason: impl Into<String>) {
        self.finish(
            key,
            JobState::Failed {
                finished_at: Utc::now(),
                reason: reason.into(),
            },
        );
    }

    fn finish(&self, key: &JobKey, next: JobState) {
        let mut states = self.states();
        match states.get_mut(key) {
            Some(state) if state.is_running() => *state = next,
            _ => log::warn!("Ignoring finish of {} which is not running", key.describe()),
        }
    }

    pub fn state(&self, key: &JobKey) -> JobState {
        self.states().get(key).cloned().unwrap_or(JobState::Idle)
    }

    /// Fails while any job of the project is running; its spawned run still
    /// points at the project's current directory.
    pub fn ensure_project_idle(&self, user_id: i64, project: &str) -> Result<(), JobError> {
        let states = self.states();
        match states.iter().find(|(key, state)| {
            key.user_id == user_id && key.project == project && state.is_running()
        }) {
            Some((key, _)) => Err(JobError::AlreadyRunning(key.describe())),
            None => Ok(()),
        }
    }

    /// Drops finished entries of a project that was deleted or renamed.
    pub fn forget_project(&self, user_id: i64, project: &str) {
        self.states().retain(|key, state| {
            key.user_id != user_id || key.project != project || state.is_running()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_jobs_cannot_restart() {
        let board = JobBoard::new();
        let key = JobKey::training(1, "cats");
        assert_eq!(board.state(&key), JobState::Idle);

        board.start(&key).unwrap();
        assert_eq!(board.state(&key).status(key.kind), JobStatus::Training);
        assert!(matches!(board.start(&key), Err(JobError::AlreadyRunning(_))));

        board.fail(&key, "helper down");
        assert_eq!(board.state(&key).status(key.kind), JobStatus::Failed);

        board.start(&key).unwrap();
        board.complete(&key);
        assert_eq!(board.state(&key).status(key.kind), JobStatus::Completed);
    }

    #[test]
    fn finishing_an_idle_job_is_ignored() {
        let board = JobBoard::new();
        let key = JobKey::verification(1, "cats", "batch");
        board.complete(&key);
        assert_eq!(board.state(&key), JobState::Idle);
    }

    #[test]
    fn verification_is_tracked_per_label() {
        let board = JobBoard::new();
        let a = JobKey::verification(1, "cats", "a");
        let b = JobKey::verification(1, "cats", "b");
        board.start(&a).unwrap();
        board.start(&b).unwrap();
        assert_eq!(board.state(&a).status(a.kind), JobStatus::Verifying);

        board.complete(&a);
        board.forget_project(1, "cats");
        assert_eq!(board.state(&a), JobState::Idle);
        assert!(board.state(&b).is_running());
    }

    #[test]
    fn a_project_is_busy_while_any_of_its_jobs_runs() {
        let board = JobBoard::new();
        let training = JobKey::training(1, "cats");
        let verification = JobKey::verification(1, "cats", "batch");
        board.ensure_project_idle(1, "cats").unwrap();

        board.start(&verification).unwrap();
        assert!(matches!(
            board.ensure_project_idle(1, "cats"),
            Err(JobError::AlreadyRunning(_))
        ));
        board.ensure_project_idle(1, "dogs").unwrap();
        board.ensure_project_idle(2, "cats").unwrap();

        board.complete(&verification);
        board.start(&training).unwrap();
        assert!(board.ensure_project_idle(1, "cats").is_err());
        board.fail(&training, "helper down");
        board.ensure_project_idle(1, "cats").unwrap();
    }
}

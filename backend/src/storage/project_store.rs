use chrono::SecondsFormat;
use shared::{DataType, ProjectDetails};
use tokio::fs;
use tokio::sync::OwnedMutexGuard;

use super::StorageError;
use super::layout::UploadLayout;
use super::locks::ProjectLocks;
use super::naming::{validate_segment, validate_username};
use crate::auth::models::AuthUser;
use crate::db::RepositoryError;
use crate::db::catalog_repository::CatalogRepository;
use crate::db::models::{LabelRecord, ProjectRecord};

/// Projects and labels. The catalog is written first; the directory tree
/// follows and a failed filesystem step undoes the catalog write.
#[derive(Clone)]
pub struct ProjectStore {
    catalog: CatalogRepository,
    layout: UploadLayout,
    locks: ProjectLocks,
}

fn catalog_error(err: RepositoryError, what: String) -> StorageError {
    match err {
        RepositoryError::Conflict(_) => StorageError::AlreadyExists(what),
        RepositoryError::NotFound => StorageError::NotFound(what),
        other => StorageError::Repository(other),
    }
}

async fn remove_dir_if_present(path: &std::path::Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl ProjectStore {
    pub fn new(catalog: CatalogRepository, layout: UploadLayout, locks: ProjectLocks) -> Self {
        Self {
            catalog,
            layout,
            locks,
        }
    }

    pub fn layout(&self) -> &UploadLayout {
        &self.layout
    }

    pub async fn lock(&self, user: &AuthUser, project: &str) -> OwnedMutexGuard<()> {
        self.locks.lock(user.id, project.trim()).await
    }

    pub async fn ensure_user_root(&self, username: &str) -> Result<(), StorageError> {
        validate_username(username)?;
        fs::create_dir_all(self.layout.user_dir(username)).await?;
        Ok(())
    }

    // Projects

    pub async fn list_projects(&self, user: &AuthUser) -> Result<Vec<String>, StorageError> {
        Ok(self
            .catalog
            .list_projects(user.id)
            .await?
            .into_iter()
            .map(|project| project.name)
            .collect())
    }

    pub async fn require_project(
        &self,
        user: &AuthUser,
        name: &str,
    ) -> Result<ProjectRecord, StorageError> {
        let name = validate_segment("project", name)?;
        self.catalog
            .get_project(user.id, name)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("project {}", name)))
    }

    pub async fn create_project(
        &self,
        user: &AuthUser,
        name: &str,
    ) -> Result<ProjectRecord, StorageError> {
        let name = validate_segment("project", name)?;
        let _guard = self.lock(user, name).await;

        let project = self
            .catalog
            .create_project(user.id, name)
            .await
            .map_err(|e| catalog_error(e, format!("project {}", name)))?;

        for dir in self.layout.project_skeleton(&user.username, name) {
            if let Err(e) = fs::create_dir_all(&dir).await {
                log::error!("Failed to create {}: {}", dir.display(), e);
                self.catalog.delete_project(project.id).await?;
                return Err(e.into());
            }
        }

        log::info!("Project {} created for {}", name, user.username);
        Ok(project)
    }

    pub async fn project_details(
        &self,
        user: &AuthUser,
        name: &str,
    ) -> Result<ProjectDetails, StorageError> {
        let project = self.require_project(user, name).await?;
        let trained = self.is_trained(user, &project.name).await;
        Ok(ProjectDetails {
            id: project.name,
            created_at: project.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            trained,
        })
    }

    pub async fn is_trained(&self, user: &AuthUser, project: &str) -> bool {
        fs::try_exists(self.layout.model_file(&user.username, project))
            .await
            .unwrap_or(false)
    }

    pub async fn delete_project(&self, user: &AuthUser, name: &str) -> Result<(), StorageError> {
        let guard = self.lock(user, name).await;
        let project = self.require_project(user, name).await?;

        self.catalog.delete_project(project.id).await?;
        remove_dir_if_present(&self.layout.project_dir(&user.username, &project.name)).await?;

        drop(guard);
        self.locks.forget(user.id, &project.name);
        log::info!("Project {} deleted for {}", project.name, user.username);
        Ok(())
    }

    pub async fn rename_project(
        &self,
        user: &AuthUser,
        name: &str,
        new_name: &str,
    ) -> Result<(), StorageError> {
        let new_name = validate_segment("project", new_name)?;
        let guard = self.lock(user, name).await;
        let project = self.require_project(user, name).await?;
        if project.name == new_name {
            return Ok(());
        }

        let from = self.layout.project_dir(&user.username, &project.name);
        let to = self.layout.project_dir(&user.username, new_name);
        if fs::try_exists(&to).await? {
            return Err(StorageError::AlreadyExists(format!("project {}", new_name)));
        }

        self.catalog
            .rename_project(project.id, new_name)
            .await
            .map_err(|e| catalog_error(e, format!("project {}", new_name)))?;

        if let Err(e) = fs::rename(&from, &to).await {
            log::error!("Failed to rename project directory {}: {}", from.display(), e);
            self.catalog.rename_project(project.id, &project.name).await?;
            return Err(StorageError::io_for(e, format!("project {}", project.name)));
        }

        drop(guard);
        self.locks.forget(user.id, &project.name);
        log::info!("Project {} renamed to {}", project.name, new_name);
        Ok(())
    }

    // Labels

    pub async fn list_labels(
        &self,
        user: &AuthUser,
        project: &str,
        data_type: DataType,
    ) -> Result<Vec<String>, StorageError> {
        let project = self.require_project(user, project).await?;
        Ok(self
            .catalog
            .list_labels(project.id, data_type)
            .await?
            .into_iter()
            .map(|label| label.name)
            .collect())
    }

    pub async fn require_label(
        &self,
        project: &ProjectRecord,
        data_type: DataType,
        label: &str,
    ) -> Result<LabelRecord, StorageError> {
        let label = validate_segment("label", label)?;
        self.catalog
            .get_label(project.id, data_type, label)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("label {}", label)))
    }

    pub async fn add_label(
        &self,
        user: &AuthUser,
        project: &str,
        data_type: DataType,
        label: &str,
    ) -> Result<LabelRecord, StorageError> {
        let label = validate_segment("label", label)?;
        let _guard = self.lock(user, project).await;
        let project = self.require_project(user, project).await?;
        self.create_label_locked(user, &project, data_type, label).await
    }

    /// Caller holds the project lock.
    pub(crate) async fn create_label_locked(
        &self,
        user: &AuthUser,
        project: &ProjectRecord,
        data_type: DataType,
        label: &str,
    ) -> Result<LabelRecord, StorageError> {
        let record = self
            .catalog
            .create_label(project.id, data_type, label)
            .await
            .map_err(|e| catalog_error(e, format!("label {}", label)))?;

        let dir = self
            .layout
            .label_dir(&user.username, &project.name, data_type, label);
        if let Err(e) = fs::create_dir_all(&dir).await {
            log::error!("Failed to create label directory {}: {}", dir.display(), e);
            self.catalog.delete_label(record.id).await?;
            return Err(e.into());
        }

        log::info!(
            "Label {} added to {}/{}",
            label,
            project.name,
            data_type.dir_name()
        );
        Ok(record)
    }

    pub async fn rename_label(
        &self,
        user: &AuthUser,
        project: &str,
        data_type: DataType,
        label: &str,
        new_label: &str,
    ) -> Result<(), StorageError> {
        let new_label = validate_segment("label", new_label)?;
        let _guard = self.lock(user, project).await;
        let project = self.require_project(user, project).await?;
        let record = self.require_label(&project, data_type, label).await?;
        if record.name == new_label {
            return Ok(());
        }

        let from = self
            .layout
            .label_dir(&user.username, &project.name, data_type, &record.name);
        let to = self
            .layout
            .label_dir(&user.username, &project.name, data_type, new_label);
        if fs::try_exists(&to).await? {
            return Err(StorageError::AlreadyExists(format!("label {}", new_label)));
        }

        self.catalog
            .rename_label(record.id, new_label)
            .await
            .map_err(|e| catalog_error(e, format!("label {}", new_label)))?;

        if let Err(e) = fs::rename(&from, &to).await {
            if e.kind() == std::io::ErrorKind::NotFound {
                // Catalogued label without a directory: recreate it empty.
                fs::create_dir_all(&to).await?;
            } else {
                log::error!("Failed to rename label directory {}: {}", from.display(), e);
                self.catalog.rename_label(record.id, &record.name).await?;
                return Err(e.into());
            }
        }

        log::info!("Label {} renamed to {} in {}", record.name, new_label, project.name);
        Ok(())
    }

    pub async fn delete_label(
        &self,
        user: &AuthUser,
        project: &str,
        data_type: DataType,
        label: &str,
    ) -> Result<(), StorageError> {
        let _guard = self.lock(user, project).await;
        let project = self.require_project(user, project).await?;
        let record = self.require_label(&project, data_type, label).await?;

        self.catalog.delete_label(record.id).await?;
        remove_dir_if_present(&self.layout.label_dir(
            &user.username,
            &project.name,
            data_type,
            &record.name,
        ))
        .await?;

        log::info!("Label {} deleted from {}", record.name, project.name);
        Ok(())
    }
}

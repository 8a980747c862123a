use chrono::Utc;
use shared::DataType;
use sqlx::SqlitePool;

use super::RepositoryError;
use super::models::{LabelRecord, ProjectRecord};

/// Explicit record of every project and label. Directories on disk mirror it.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Projects

    pub async fn create_project(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<ProjectRecord, RepositoryError> {
        sqlx::query_as::<_, ProjectRecord>(
            r#"
            INSERT INTO projects (user_id, name, created_at)
            VALUES (?1, ?2, ?3)
            RETURNING id, user_id, name, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, name))
    }

    pub async fn get_project(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<ProjectRecord>, RepositoryError> {
        let project = sqlx::query_as::<_, ProjectRecord>(
            "SELECT id, user_id, name, created_at FROM projects WHERE user_id = ?1 AND name = ?2",
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(project)
    }

    pub async fn list_projects(&self, user_id: i64) -> Result<Vec<ProjectRecord>, RepositoryError> {
        let projects = sqlx::query_as::<_, ProjectRecord>(
            "SELECT id, user_id, name, created_at FROM projects WHERE user_id = ?1 ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    pub async fn rename_project(
        &self,
        project_id: i64,
        new_name: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE projects SET name = ?1 WHERE id = ?2")
            .bind(new_name)
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, new_name))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Removes the project and, through the cascade, its labels.
    pub async fn delete_project(&self, project_id: i64) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM labels WHERE project_id = ?1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // Labels

    pub async fn create_label(
        &self,
        project_id: i64,
        data_type: DataType,
        name: &str,
    ) -> Result<LabelRecord, RepositoryError> {
        sqlx::query_as::<_, LabelRecord>(
            r#"
            INSERT INTO labels (project_id, data_type, name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, project_id, data_type, name, created_at
            "#,
        )
        .bind(project_id)
        .bind(data_type.dir_name())
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, name))
    }

    pub async fn get_label(
        &self,
        project_id: i64,
        data_type: DataType,
        name: &str,
    ) -> Result<Option<LabelRecord>, RepositoryError> {
        let label = sqlx::query_as::<_, LabelRecord>(
            r#"
            SELECT id, project_id, data_type, name, created_at
            FROM labels WHERE project_id = ?1 AND data_type = ?2 AND name = ?3
            "#,
        )
        .bind(project_id)
        .bind(data_type.dir_name())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(label)
    }

    pub async fn list_labels(
        &self,
        project_id: i64,
        data_type: DataType,
    ) -> Result<Vec<LabelRecord>, RepositoryError> {
        let labels = sqlx::query_as::<_, LabelRecord>(
            r#"
            SELECT id, project_id, data_type, name, created_at
            FROM labels WHERE project_id = ?1 AND data_type = ?2 ORDER BY name
            "#,
        )
        .bind(project_id)
        .bind(data_type.dir_name())
        .fetch_all(&self.pool)
        .await?;
        Ok(labels)
    }

    pub async fn rename_label(&self, label_id: i64, new_name: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE labels SET name = ?1 WHERE id = ?2")
            .bind(new_name)
            .bind(label_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, new_name))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn delete_label(&self, label_id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM labels WHERE id = ?1")
            .bind(label_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

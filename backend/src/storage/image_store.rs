use futures::stream::{FuturesUnordered, StreamExt};
use shared::DataType;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::StorageError;
use super::compression::{CompressionOutcome, CompressionSettings, compress_image};
use super::naming::{
    generate_image_name, is_image_file_name, renamed_image_name, staged_upload_name,
    validate_segment,
};
use super::project_store::ProjectStore;
use crate::auth::models::AuthUser;

/// A file streamed from a multipart request into its label directory under a
/// hidden name, waiting for its final one.
#[derive(Debug)]
pub struct PendingUpload {
    pub original_name: String,
    pub staged: PathBuf,
}

impl PendingUpload {
    pub fn new(original_name: impl Into<String>, staging_dir: &Path) -> Self {
        Self {
            original_name: original_name.into(),
            staged: staging_dir.join(staged_upload_name()),
        }
    }
}

/// Removes whatever staged files are still around.
pub async fn discard_staged(files: &[PendingUpload]) {
    for file in files {
        match fs::remove_file(&file.staged).await {
            Ok(()) => log::debug!("Discarded staged upload {}", file.staged.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove {}: {}", file.staged.display(), e),
        }
    }
}

/// Result of a batch move.
#[derive(Debug)]
pub struct MoveReport {
    pub moved: Vec<String>,
    pub target_created: bool,
}

/// Where one image lives on disk, resolved from the names in a request.
pub struct ImageLocation<'a> {
    pub user: &'a AuthUser,
    pub project: &'a str,
    pub data_type: DataType,
    pub label: &'a str,
}

#[derive(Clone)]
pub struct ImageStore {
    projects: ProjectStore,
    compression: CompressionSettings,
}

impl ImageStore {
    pub fn new(projects: ProjectStore, compression: CompressionSettings) -> Self {
        Self {
            projects,
            compression,
        }
    }

    fn label_dir(&self, at: &ImageLocation<'_>, project: &str, label: &str) -> PathBuf {
        self.projects
            .layout()
            .label_dir(&at.user.username, project, at.data_type, label)
    }

    /// Whitelisted image files in the label directory, sorted by name.
    pub async fn list_images(&self, at: &ImageLocation<'_>) -> Result<Vec<String>, StorageError> {
        let project = self.projects.require_project(at.user, at.project).await?;
        let label = self
            .projects
            .require_label(&project, at.data_type, at.label)
            .await?;

        let dir = self.label_dir(at, &project.name, &label.name);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut images = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_image_file_name(name) {
                    images.push(name.to_string());
                }
            }
        }
        images.sort();
        Ok(images)
    }

    /// Directory an upload into this label is streamed to.
    pub async fn staging_dir(&self, at: &ImageLocation<'_>) -> Result<PathBuf, StorageError> {
        let project = self.projects.require_project(at.user, at.project).await?;
        let label = self
            .projects
            .require_label(&project, at.data_type, at.label)
            .await?;
        let dir = self.label_dir(at, &project.name, &label.name);
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Gives a staged batch generated names and compresses the files
    /// concurrently. `on_progress(done, total)` runs after each file. Staged
    /// files that were not kept are removed whatever the outcome.
    pub async fn upload<F>(
        &self,
        at: &ImageLocation<'_>,
        files: Vec<PendingUpload>,
        on_progress: F,
    ) -> Result<Vec<String>, StorageError>
    where
        F: Fn(usize, usize),
    {
        let result = self.store_staged(at, &files, on_progress).await;
        discard_staged(&files).await;
        result
    }

    async fn store_staged<F>(
        &self,
        at: &ImageLocation<'_>,
        files: &[PendingUpload],
        on_progress: F,
    ) -> Result<Vec<String>, StorageError>
    where
        F: Fn(usize, usize),
    {
        let mut named = Vec::with_capacity(files.len());
        for file in files {
            named.push((generate_image_name(&file.original_name)?, file));
        }

        let _guard = self.projects.lock(at.user, at.project).await;
        let project = self.projects.require_project(at.user, at.project).await?;
        let label = self
            .projects
            .require_label(&project, at.data_type, at.label)
            .await?;
        let dir = self.label_dir(at, &project.name, &label.name);

        let mut stored = Vec::with_capacity(named.len());
        for (name, file) in named {
            let path = dir.join(&name);
            fs::rename(&file.staged, &path)
                .await
                .map_err(|e| StorageError::io_for(e, format!("upload {}", file.original_name)))?;
            log::debug!("Stored {} as {}", file.original_name, path.display());
            stored.push((name, path));
        }

        let total = stored.len();
        let mut pending: FuturesUnordered<_> = stored
            .iter()
            .map(|(name, path)| {
                let name = name.clone();
                let settings = self.compression;
                let path = path.clone();
                async move { (name, compress_image(path, settings).await) }
            })
            .collect();

        let mut done = 0;
        while let Some((name, outcome)) = pending.next().await {
            done += 1;
            match outcome {
                Ok(CompressionOutcome::GaveUp { attempts }) => {
                    log::warn!("{} kept uncompressed after {} attempts", name, attempts)
                }
                Ok(_) => {}
                Err(e) => log::warn!("Compression of {} failed, keeping upload as is: {}", name, e),
            }
            on_progress(done, total);
        }

        log::info!(
            "Uploaded {} image(s) to {}/{}/{}",
            total,
            project.name,
            at.data_type,
            label.name
        );
        Ok(stored.into_iter().map(|(name, _)| name).collect())
    }

    pub async fn delete_image(
        &self,
        at: &ImageLocation<'_>,
        image: &str,
    ) -> Result<(), StorageError> {
        let image = validate_segment("image", image)?;
        let _guard = self.projects.lock(at.user, at.project).await;
        let project = self.projects.require_project(at.user, at.project).await?;
        let label = self
            .projects
            .require_label(&project, at.data_type, at.label)
            .await?;

        let path = self.label_dir(at, &project.name, &label.name).join(image);
        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::io_for(e, format!("image {}", image)))?;
        log::info!("Deleted image {}", path.display());
        Ok(())
    }

    /// Deletes every listed image that exists and returns the ones removed.
    pub async fn delete_images(
        &self,
        at: &ImageLocation<'_>,
        images: &[String],
    ) -> Result<Vec<String>, StorageError> {
        if images.is_empty() {
            return Err(StorageError::InvalidName("no images given".into()));
        }
        for image in images {
            validate_segment("image", image)?;
        }

        let _guard = self.projects.lock(at.user, at.project).await;
        let project = self.projects.require_project(at.user, at.project).await?;
        let label = self
            .projects
            .require_label(&project, at.data_type, at.label)
            .await?;
        let dir = self.label_dir(at, &project.name, &label.name);

        let mut deleted = Vec::new();
        for image in images {
            let image = image.trim();
            match fs::remove_file(dir.join(image)).await {
                Ok(()) => deleted.push(image.to_string()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::warn!("Skipping missing image {} in {}", image, label.name)
                }
                Err(e) => return Err(e.into()),
            }
        }
        log::info!("Deleted {} image(s) from {}", deleted.len(), dir.display());
        Ok(deleted)
    }

    /// Moves images into `target`, creating that label when needed. Every
    /// source and destination is checked first, so a rejected batch changes
    /// nothing. Files moved before a later I/O failure stay moved.
    pub async fn move_images(
        &self,
        at: &ImageLocation<'_>,
        target: &str,
        images: &[String],
    ) -> Result<MoveReport, StorageError> {
        let target = validate_segment("label", target)?;
        if images.is_empty() {
            return Err(StorageError::InvalidName("no images given".into()));
        }
        let mut names = Vec::with_capacity(images.len());
        for image in images {
            let image = validate_segment("image", image)?;
            if names.contains(&image) {
                return Err(StorageError::InvalidName(format!(
                    "image {} listed twice",
                    image
                )));
            }
            names.push(image);
        }

        let _guard = self.projects.lock(at.user, at.project).await;
        let project = self.projects.require_project(at.user, at.project).await?;
        let source = self
            .projects
            .require_label(&project, at.data_type, at.label)
            .await?;
        if source.name == target {
            return Err(StorageError::InvalidName(
                "source and target label are the same".into(),
            ));
        }
        let existing_target = match self
            .projects
            .require_label(&project, at.data_type, target)
            .await
        {
            Ok(label) => Some(label),
            Err(StorageError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let from_dir = self.label_dir(at, &project.name, &source.name);
        let target_name = existing_target
            .as_ref()
            .map(|label| label.name.clone())
            .unwrap_or_else(|| target.to_string());
        let to_dir = self.label_dir(at, &project.name, &target_name);
        for image in &names {
            if !fs::try_exists(from_dir.join(image)).await? {
                return Err(StorageError::NotFound(format!("image {}", image)));
            }
            if fs::try_exists(to_dir.join(image)).await? {
                return Err(StorageError::AlreadyExists(format!(
                    "image {} in label {}",
                    image, target_name
                )));
            }
        }

        let target_created = existing_target.is_none();
        if target_created {
            self.projects
                .create_label_locked(at.user, &project, at.data_type, target)
                .await?;
        }
        fs::create_dir_all(&to_dir).await?;

        let mut moved = Vec::with_capacity(names.len());
        for image in names {
            fs::rename(from_dir.join(image), to_dir.join(image))
                .await
                .map_err(|e| StorageError::io_for(e, format!("image {}", image)))?;
            moved.push(image.to_string());
        }

        log::info!(
            "Moved {} image(s) from {} to {} in {}",
            moved.len(),
            source.name,
            target_name,
            project.name
        );
        Ok(MoveReport {
            moved,
            target_created,
        })
    }

    /// Returns the name the image ended up with.
    pub async fn rename_image(
        &self,
        at: &ImageLocation<'_>,
        image: &str,
        new_name: &str,
    ) -> Result<String, StorageError> {
        let image = validate_segment("image", image)?;
        let new_name = renamed_image_name(image, new_name)?;

        let _guard = self.projects.lock(at.user, at.project).await;
        let project = self.projects.require_project(at.user, at.project).await?;
        let label = self
            .projects
            .require_label(&project, at.data_type, at.label)
            .await?;
        let dir = self.label_dir(at, &project.name, &label.name);

        if new_name == image {
            return Ok(new_name);
        }
        let destination = dir.join(&new_name);
        if fs::try_exists(&destination).await? {
            return Err(StorageError::AlreadyExists(format!("image {}", new_name)));
        }
        fs::rename(dir.join(image), &destination)
            .await
            .map_err(|e| StorageError::io_for(e, format!("image {}", image)))?;

        log::info!("Renamed image {} to {} in {}", image, new_name, label.name);
        Ok(new_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::project_store::tests::store;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    async fn setup() -> (ImageStore, ProjectStore, AuthUser, TempDir) {
        let (projects, user, dir) = store().await;
        projects.create_project(&user, "cats").await.unwrap();
        for label in ["A", "B"] {
            projects
                .add_label(&user, "cats", DataType::Training, label)
                .await
                .unwrap();
        }
        let images = ImageStore::new(projects.clone(), CompressionSettings::default());
        (images, projects, user, dir)
    }

    fn at<'a>(user: &'a AuthUser, label: &'a str) -> ImageLocation<'a> {
        ImageLocation {
            user,
            project: "cats",
            data_type: DataType::Training,
            label,
        }
    }

    fn staged(projects: &ProjectStore, label: &str, name: &str, bytes: &[u8]) -> PendingUpload {
        let dir = projects
            .layout()
            .label_dir("alice", "cats", DataType::Training, label);
        let file = PendingUpload::new(name, &dir);
        std::fs::write(&file.staged, bytes).unwrap();
        file
    }

    fn entries(projects: &ProjectStore, label: &str) -> usize {
        let dir = projects
            .layout()
            .label_dir("alice", "cats", DataType::Training, label);
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn upload_stores_generated_names_and_reports_progress() {
        let (images, projects, user, _dir) = setup().await;
        let calls = AtomicUsize::new(0);

        let stored = images
            .upload(
                &at(&user, "A"),
                vec![
                    staged(&projects, "A", "one.png", b"a"),
                    staged(&projects, "A", "two.JPG", b"b"),
                ],
                |done, total| {
                    assert_eq!(total, 2);
                    assert!(done <= total);
                    calls.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert!(stored[0].ends_with(".png"));
        assert!(stored[1].ends_with(".JPG"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let mut listed = images.list_images(&at(&user, "A")).await.unwrap();
        listed.sort();
        let mut expected = stored.clone();
        expected.sort();
        assert_eq!(listed, expected);
        assert_eq!(entries(&projects, "A"), 2);
    }

    #[tokio::test]
    async fn upload_rejects_unsupported_and_discards_the_batch() {
        let (images, projects, user, _dir) = setup().await;
        let result = images
            .upload(
                &at(&user, "A"),
                vec![
                    staged(&projects, "A", "ok.png", b"a"),
                    staged(&projects, "A", "notes.txt", b"b"),
                ],
                |_, _| {},
            )
            .await;

        assert!(matches!(result, Err(StorageError::Unsupported(_))));
        assert_eq!(entries(&projects, "A"), 0);
    }

    #[tokio::test]
    async fn staging_requires_an_existing_label() {
        let (images, _, user, _dir) = setup().await;
        let dir = images.staging_dir(&at(&user, "A")).await.unwrap();
        assert!(dir.ends_with("training-data/A"));
        assert!(matches!(
            images.staging_dir(&at(&user, "missing")).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn move_is_byte_identical_and_creates_target() {
        let (images, projects, user, _dir) = setup().await;
        let stored = images
            .upload(
                &at(&user, "A"),
                vec![staged(&projects, "A", "x.png", b"pixels")],
                |_, _| {},
            )
            .await
            .unwrap();
        let name = stored[0].clone();

        let report = images
            .move_images(&at(&user, "A"), "C", &[name.clone()])
            .await
            .unwrap();
        assert_eq!(report.moved, vec![name.clone()]);
        assert!(report.target_created);

        assert!(images.list_images(&at(&user, "A")).await.unwrap().is_empty());
        assert_eq!(images.list_images(&at(&user, "C")).await.unwrap(), vec![name.clone()]);
        let moved = projects
            .layout()
            .image_path("alice", "cats", DataType::Training, "C", &name);
        assert_eq!(std::fs::read(moved).unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn move_reports_missing_and_colliding_images() {
        let (images, projects, user, _dir) = setup().await;
        assert!(matches!(
            images
                .move_images(&at(&user, "A"), "B", &["ghost.png".to_string()])
                .await,
            Err(StorageError::NotFound(_))
        ));

        let layout = projects.layout();
        std::fs::write(
            layout.image_path("alice", "cats", DataType::Training, "A", "x.png"),
            b"a",
        )
        .unwrap();
        std::fs::write(
            layout.image_path("alice", "cats", DataType::Training, "B", "x.png"),
            b"b",
        )
        .unwrap();
        assert!(matches!(
            images
                .move_images(&at(&user, "A"), "B", &["x.png".to_string()])
                .await,
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn rejected_move_leaves_labels_and_files_alone() {
        let (images, projects, user, _dir) = setup().await;
        let layout = projects.layout();
        std::fs::write(
            layout.image_path("alice", "cats", DataType::Training, "A", "x.png"),
            b"a",
        )
        .unwrap();

        let result = images
            .move_images(
                &at(&user, "A"),
                "NEW",
                &["x.png".to_string(), "ghost.png".to_string()],
            )
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        assert_eq!(
            projects
                .list_labels(&user, "cats", DataType::Training)
                .await
                .unwrap(),
            vec!["A", "B"]
        );
        assert!(!layout
            .label_dir("alice", "cats", DataType::Training, "NEW")
            .exists());
        assert_eq!(images.list_images(&at(&user, "A")).await.unwrap(), vec!["x.png"]);

        assert!(matches!(
            images
                .move_images(
                    &at(&user, "A"),
                    "B",
                    &["x.png".to_string(), "x.png".to_string()],
                )
                .await,
            Err(StorageError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn rename_and_delete_images() {
        let (images, projects, user, _dir) = setup().await;
        let layout = projects.layout();
        for name in ["x.png", "y.png", "z.png"] {
            std::fs::write(
                layout.image_path("alice", "cats", DataType::Training, "A", name),
                b"a",
            )
            .unwrap();
        }

        let renamed = images
            .rename_image(&at(&user, "A"), "x.png", "cat")
            .await
            .unwrap();
        assert_eq!(renamed, "cat.png");
        assert!(matches!(
            images.rename_image(&at(&user, "A"), "cat.png", "y.png").await,
            Err(StorageError::AlreadyExists(_))
        ));

        images.delete_image(&at(&user, "A"), "cat.png").await.unwrap();
        assert!(matches!(
            images.delete_image(&at(&user, "A"), "cat.png").await,
            Err(StorageError::NotFound(_))
        ));

        let deleted = images
            .delete_images(
                &at(&user, "A"),
                &["y.png".to_string(), "missing.png".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(deleted, vec!["y.png"]);
        assert_eq!(images.list_images(&at(&user, "A")).await.unwrap(), vec!["z.png"]);
    }
}

use actix_web::web;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::CookieSettings;
use crate::auth::jwt::JwtService;
use crate::auth::middleware::AuthMiddleware;
use crate::auth::session::SessionService;
use crate::config::{AppConfig, StorageConfig};
use crate::db::catalog_repository::CatalogRepository;
use crate::db::session_repository::SessionRepository;
use crate::db::user_repository::UserRepository;
use crate::jobs::{JobBoard, JobCoordinator};
use crate::ml::ModelTrainer;
use crate::push::SessionRegistry;
use crate::routes::configure_routes;
use crate::storage::compression::CompressionSettings;
use crate::storage::image_store::ImageStore;
use crate::storage::layout::UploadLayout;
use crate::storage::locks::ProjectLocks;
use crate::storage::project_store::ProjectStore;

/// Every service the HTTP layer hands to its handlers, built once and cloned
/// into each worker.
#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub sessions: SessionService,
    pub registry: SessionRegistry,
    pub layout: UploadLayout,
    pub projects: ProjectStore,
    pub images: ImageStore,
    pub jobs: JobCoordinator,
    pub cookie: CookieSettings,
    pub storage: StorageConfig,
    pub frontend_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &AppConfig, pool: SqlitePool, trainer: Arc<dyn ModelTrainer>) -> Self {
        let users = UserRepository::new(pool.clone());
        let sessions = SessionService::new(
            JwtService::new(&config.session.secret),
            SessionRepository::new(pool.clone()),
            config.session.ttl_minutes,
        );
        let registry = SessionRegistry::new(Arc::new(sessions.clone()));

        let layout = UploadLayout::new(config.storage.uploads_dir.clone());
        let projects = ProjectStore::new(
            CatalogRepository::new(pool),
            layout.clone(),
            ProjectLocks::new(),
        );
        let images = ImageStore::new(
            projects.clone(),
            CompressionSettings::from(&config.compression),
        );
        let jobs = JobCoordinator::new(
            projects.clone(),
            registry.clone(),
            trainer,
            JobBoard::new(),
        );

        Self {
            users,
            sessions,
            registry,
            layout,
            projects,
            images,
            jobs,
            cookie: CookieSettings::from(&config.session),
            storage: config.storage.clone(),
            frontend_dir: config.server.frontend_dir.clone(),
        }
    }

    pub fn auth_middleware(&self) -> AuthMiddleware {
        AuthMiddleware::new(self.sessions.clone(), &self.cookie.name)
    }

    /// Registers the shared services and every route on an `App`.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.users.clone()))
            .app_data(web::Data::new(self.sessions.clone()))
            .app_data(web::Data::new(self.registry.clone()))
            .app_data(web::Data::new(self.layout.clone()))
            .app_data(web::Data::new(self.projects.clone()))
            .app_data(web::Data::new(self.images.clone()))
            .app_data(web::Data::new(self.jobs.clone()))
            .app_data(web::Data::new(self.cookie.clone()))
            .app_data(web::Data::new(self.storage.clone()));
        configure_routes(cfg, self.frontend_dir.clone(), self.auth_middleware());
    }
}

mod api;
mod components;
mod push;

use api::ApiError;
use gloo_file::File as GlooFile;
use push::PushChannel;
use shared::{
    DataType, JobStatus, ModelInfo, ProjectDetails, PushEvent, UserProfile, VerificationResults,
};
use std::collections::BTreeSet;
use std::future::Future;
use wasm_bindgen_futures::spawn_local;
use web_sys::DragEvent;
use yew::prelude::*;

use components::dark_mode::Theme;
use components::utils::{confirm, prompt};

pub const MAX_FILES_PER_UPLOAD: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub enum Page {
    Loading,
    Login,
    Projects,
    Project(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Field {
    Username,
    Password,
    ProjectName,
    LabelName,
    MoveTarget,
}

#[derive(Default)]
pub struct Drafts {
    pub username: String,
    pub password: String,
    pub project_name: String,
    pub label_name: String,
    pub move_target: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UploadState {
    pub processed: usize,
    pub total: usize,
}

pub enum Msg {
    // Session
    ProfileLoaded(Option<UserProfile>),
    Input(Field, String),
    Login,
    Register,
    Registered,
    Logout,
    LoggedOut,
    Push(PushEvent),
    PushLost,

    // Projects
    ProjectsLoaded(Vec<String>),
    CreateProject,
    OpenProject(String),
    CloseProject,
    ProjectLoaded(ProjectDetails),
    RenameProject(String),
    DeleteProject(String),

    // Labels
    SelectDataType(DataType),
    LabelsLoaded(Vec<String>),
    SelectLabel(String),
    AddLabel,
    RenameLabel(String),
    DeleteLabel(String),

    // Images
    ImagesLoaded(Vec<String>),
    ToggleImage(String),
    SelectAllImages,
    ClearSelection,
    FilesAdded(Vec<GlooFile>),
    HandleDrop(DragEvent),
    SetDragging(bool),
    UploadFinished(Vec<String>),
    DeleteSelected,
    MoveSelected,
    RenameImage(String),

    // Model
    ModelInfoLoaded(ModelInfo),
    Train,
    Verify,
    VerificationLoaded(Option<VerificationResults>),

    // UI states
    Failed(ApiError),
    SetError(Option<String>),
    Notice(String),
    ToggleTheme,
}

pub struct Model {
    pub page: Page,
    pub user: Option<UserProfile>,
    pub drafts: Drafts,
    pub theme: Theme,
    pub error: Option<String>,
    pub notice: Option<String>,
    push: Option<PushChannel>,

    pub projects: Vec<String>,
    pub project: Option<ProjectDetails>,
    pub data_type: DataType,
    pub labels: Vec<String>,
    pub label: Option<String>,
    pub images: Vec<String>,
    pub selected: BTreeSet<String>,
    pub upload: Option<UploadState>,
    pub is_dragging: bool,

    pub model_info: Option<ModelInfo>,
    pub verify_status: Option<JobStatus>,
    pub verification: Option<VerificationResults>,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let theme = Theme::load();
        theme.apply();

        run(ctx, api::profile(), Msg::ProfileLoaded);

        Self {
            page: Page::Loading,
            user: None,
            drafts: Drafts::default(),
            theme,
            error: None,
            notice: None,
            push: None,
            projects: Vec::new(),
            project: None,
            data_type: DataType::Training,
            labels: Vec::new(),
            label: None,
            images: Vec::new(),
            selected: BTreeSet::new(),
            upload: None,
            is_dragging: false,
            model_info: None,
            verify_status: None,
            verification: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            // Session
            Msg::ProfileLoaded(user) => self.handle_profile_loaded(ctx, user),
            Msg::Input(field, value) => self.handle_input(field, value),
            Msg::Login => self.handle_login(ctx),
            Msg::Register => self.handle_register(ctx),
            Msg::Registered => {
                self.notice = Some("Registration successful, you can log in now.".into());
                self.drafts.password.clear();
                true
            }
            Msg::Logout => {
                run(ctx, api::logout(), |_| Msg::LoggedOut);
                false
            }
            Msg::LoggedOut => self.end_session(None),
            Msg::Push(event) => self.handle_push(ctx, event),
            Msg::PushLost => {
                self.push = None;
                run(ctx, api::profile(), Msg::ProfileLoaded);
                false
            }

            // Projects
            Msg::ProjectsLoaded(projects) => {
                self.projects = projects;
                true
            }
            Msg::CreateProject => self.handle_create_project(ctx),
            Msg::OpenProject(name) => self.handle_open_project(ctx, name),
            Msg::CloseProject => {
                self.page = Page::Projects;
                self.reset_project_view();
                run(ctx, api::list_projects(), Msg::ProjectsLoaded);
                true
            }
            Msg::ProjectLoaded(details) => {
                self.project = Some(details);
                true
            }
            Msg::RenameProject(name) => self.handle_rename_project(ctx, name),
            Msg::DeleteProject(name) => self.handle_delete_project(ctx, name),

            // Labels
            Msg::SelectDataType(data_type) => self.handle_select_data_type(ctx, data_type),
            Msg::LabelsLoaded(labels) => {
                if let Some(current) = &self.label {
                    if !labels.contains(current) {
                        self.label = None;
                        self.images.clear();
                        self.selected.clear();
                    }
                }
                self.labels = labels;
                true
            }
            Msg::SelectLabel(label) => self.handle_select_label(ctx, label),
            Msg::AddLabel => self.handle_add_label(ctx),
            Msg::RenameLabel(label) => self.handle_rename_label(ctx, label),
            Msg::DeleteLabel(label) => self.handle_delete_label(ctx, label),

            // Images
            Msg::ImagesLoaded(images) => {
                self.selected.retain(|name| images.contains(name));
                self.images = images;
                true
            }
            Msg::ToggleImage(name) => {
                if !self.selected.remove(&name) {
                    self.selected.insert(name);
                }
                true
            }
            Msg::SelectAllImages => {
                self.selected = self.images.iter().cloned().collect();
                true
            }
            Msg::ClearSelection => {
                self.selected.clear();
                true
            }
            Msg::FilesAdded(files) => self.handle_files_added(ctx, files),
            Msg::HandleDrop(event) => self.handle_drop(ctx, event),
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }
            Msg::UploadFinished(stored) => {
                self.upload = None;
                self.notice = Some(format!("Uploaded {} image(s)", stored.len()));
                self.reload_images(ctx);
                true
            }
            Msg::DeleteSelected => self.handle_delete_selected(ctx),
            Msg::MoveSelected => self.handle_move_selected(ctx),
            Msg::RenameImage(image) => self.handle_rename_image(ctx, image),

            // Model
            Msg::ModelInfoLoaded(info) => {
                self.model_info = Some(info);
                true
            }
            Msg::Train => self.handle_train(ctx),
            Msg::Verify => self.handle_verify(ctx),
            Msg::VerificationLoaded(results) => {
                self.verification = results;
                true
            }

            // UI states
            Msg::Failed(ApiError::Unauthorized) => {
                self.end_session(Some("Your session is no longer valid, please log in.".into()))
            }
            Msg::Failed(err) => {
                self.upload = None;
                self.error = Some(err.to_string());
                true
            }
            Msg::SetError(error) => {
                self.error = error;
                true
            }
            Msg::Notice(message) => {
                self.notice = Some(message);
                true
            }
            Msg::ToggleTheme => self.handle_toggle_theme(),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let content = match &self.page {
            Page::Loading => html! {
                <div class="loading"><i class="fa-solid fa-spinner fa-spin"></i>{" Loading..."}</div>
            },
            Page::Login => components::auth_form::render_auth_form(self, ctx),
            Page::Projects => components::project_list::render_project_list(self, ctx),
            Page::Project(_) => components::project_view::render_project_view(self, ctx),
        };

        html! {
            <div class="container">
                { components::header::render_header(self, ctx) }

                <main class="main-content">
                    { components::utils::render_notice(self, ctx) }
                    { components::utils::render_error_message(self, ctx) }
                    { content }
                </main>

                <footer class="app-footer">
                    <p>{"Image Classing | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }
}

/// Runs an API call and feeds the outcome back as a message.
fn run<T, Fut, F>(ctx: &Context<Model>, request: Fut, on_ok: F)
where
    T: 'static,
    Fut: Future<Output = Result<T, ApiError>> + 'static,
    F: FnOnce(T) -> Msg + 'static,
{
    let link = ctx.link().clone();
    spawn_local(async move {
        match request.await {
            Ok(value) => link.send_message(on_ok(value)),
            Err(err) => link.send_message(Msg::Failed(err)),
        }
    });
}

// Session handlers
impl Model {
    fn handle_profile_loaded(&mut self, ctx: &Context<Self>, user: Option<UserProfile>) -> bool {
        match user {
            Some(user) => {
                log::info!("Signed in as {}", user.username);
                self.user = Some(user);
                self.open_push_channel(ctx);
                if matches!(self.page, Page::Loading | Page::Login) {
                    self.page = Page::Projects;
                    self.error = None;
                    run(ctx, api::list_projects(), Msg::ProjectsLoaded);
                }
            }
            None => {
                self.user = None;
                self.push = None;
                self.page = Page::Login;
            }
        }
        true
    }

    fn open_push_channel(&mut self, ctx: &Context<Self>) {
        if self.push.is_some() {
            return;
        }
        let link = ctx.link();
        match PushChannel::open(link.callback(Msg::Push), link.callback(|_| Msg::PushLost)) {
            Ok(channel) => self.push = Some(channel),
            Err(e) => log::error!("Could not open the push channel: {:?}", e),
        }
    }

    fn handle_input(&mut self, field: Field, value: String) -> bool {
        let slot = match field {
            Field::Username => &mut self.drafts.username,
            Field::Password => &mut self.drafts.password,
            Field::ProjectName => &mut self.drafts.project_name,
            Field::LabelName => &mut self.drafts.label_name,
            Field::MoveTarget => &mut self.drafts.move_target,
        };
        *slot = value;
        false
    }

    fn credentials(&mut self) -> Option<(String, String)> {
        let username = self.drafts.username.trim().to_string();
        if username.is_empty() || self.drafts.password.is_empty() {
            self.error = Some("Username and password are required.".into());
            return None;
        }
        self.error = None;
        Some((username, self.drafts.password.clone()))
    }

    fn handle_login(&mut self, ctx: &Context<Self>) -> bool {
        let Some((username, password)) = self.credentials() else {
            return true;
        };
        let link = ctx.link().clone();
        spawn_local(async move {
            match api::login(&username, &password).await {
                Ok(_) => match api::profile().await {
                    Ok(user) => link.send_message(Msg::ProfileLoaded(user)),
                    Err(e) => link.send_message(Msg::Failed(e)),
                },
                Err(ApiError::Unauthorized) => link.send_message(Msg::SetError(Some(
                    "Invalid username or password.".into(),
                ))),
                Err(e) => link.send_message(Msg::Failed(e)),
            }
        });
        true
    }

    fn handle_register(&mut self, ctx: &Context<Self>) -> bool {
        let Some((username, password)) = self.credentials() else {
            return true;
        };
        run(
            ctx,
            async move { api::register(&username, &password).await },
            |_| Msg::Registered,
        );
        true
    }

    fn end_session(&mut self, error: Option<String>) -> bool {
        self.push = None;
        self.user = None;
        self.page = Page::Login;
        self.projects.clear();
        self.reset_project_view();
        self.drafts = Drafts::default();
        self.notice = None;
        self.error = error;
        true
    }

    fn handle_push(&mut self, ctx: &Context<Self>, event: PushEvent) -> bool {
        log::debug!("Push event: {}", event.name());
        match event {
            PushEvent::Connected => false,
            PushEvent::SessionExpired => {
                self.end_session(Some("Your session has expired, please log in again.".into()))
            }
            PushEvent::ProjectCreated { .. } => {
                if self.page == Page::Projects {
                    run(ctx, api::list_projects(), Msg::ProjectsLoaded);
                }
                false
            }
            PushEvent::LabelAdded {
                project_name,
                data_type,
                ..
            } => {
                if self.viewing(&project_name, data_type) {
                    self.reload_labels(ctx);
                }
                false
            }
            PushEvent::ImageMoved {
                project_name,
                data_type,
                from_label,
                to_label,
                ..
            } => {
                if self.viewing(&project_name, data_type)
                    && (self.label_is(&from_label) || self.label_is(&to_label))
                {
                    self.reload_images(ctx);
                }
                false
            }
            PushEvent::ImageDeleted {
                project_name,
                data_type,
                label_name,
                images,
            } => {
                if self.viewing(&project_name, data_type) && self.label_is(&label_name) {
                    self.images.retain(|name| !images.contains(name));
                    self.selected.retain(|name| !images.contains(name));
                    return true;
                }
                false
            }
            PushEvent::UploadProgress {
                project_name,
                data_type,
                label_name,
                processed,
                total,
            } => {
                if self.viewing(&project_name, data_type) && self.label_is(&label_name) {
                    self.upload = Some(UploadState { processed, total });
                    return true;
                }
                false
            }
            PushEvent::UploadCompleted {
                project_name,
                data_type,
                label_name,
                ..
            } => {
                if self.viewing(&project_name, data_type) && self.label_is(&label_name) {
                    self.upload = None;
                    self.reload_images(ctx);
                    return true;
                }
                false
            }
            PushEvent::TrainingProgress {
                project_name,
                status,
                message,
            } => {
                if !self.in_project(&project_name) {
                    return false;
                }
                if let Some(info) = &mut self.model_info {
                    info.training_status = status;
                }
                match status {
                    JobStatus::Completed => {
                        self.notice = Some(message);
                        self.reload_model(ctx);
                    }
                    JobStatus::Failed => self.error = Some(message),
                    _ => self.notice = Some(message),
                }
                true
            }
            PushEvent::ValidationProgress {
                project_name,
                label_name,
                status,
                message,
            } => {
                if !self.in_project(&project_name) || !self.label_is(&label_name) {
                    return false;
                }
                self.verify_status = Some(status);
                match status {
                    JobStatus::Completed => {
                        self.notice = Some(message);
                        self.reload_verification(ctx);
                    }
                    JobStatus::Failed => self.error = Some(message),
                    _ => self.notice = Some(message),
                }
                true
            }
        }
    }
}

// Project handlers
impl Model {
    pub fn current_project(&self) -> Option<&str> {
        match &self.page {
            Page::Project(name) => Some(name),
            _ => None,
        }
    }

    fn in_project(&self, project: &str) -> bool {
        self.current_project() == Some(project)
    }

    fn viewing(&self, project: &str, data_type: DataType) -> bool {
        self.in_project(project) && self.data_type == data_type
    }

    fn label_is(&self, label: &str) -> bool {
        self.label.as_deref() == Some(label)
    }

    fn reset_project_view(&mut self) {
        self.project = None;
        self.data_type = DataType::Training;
        self.labels.clear();
        self.label = None;
        self.images.clear();
        self.selected.clear();
        self.upload = None;
        self.model_info = None;
        self.verify_status = None;
        self.verification = None;
    }

    fn handle_create_project(&mut self, ctx: &Context<Self>) -> bool {
        let name = self.drafts.project_name.trim().to_string();
        if name.is_empty() {
            self.error = Some("Project name is required.".into());
            return true;
        }
        self.drafts.project_name.clear();
        self.error = None;
        let link = ctx.link().clone();
        spawn_local(async move {
            match api::create_project(&name).await {
                Ok(_) => link.send_message(Msg::OpenProject(name)),
                Err(e) => link.send_message(Msg::Failed(e)),
            }
        });
        true
    }

    fn handle_open_project(&mut self, ctx: &Context<Self>, name: String) -> bool {
        self.reset_project_view();
        self.error = None;
        self.notice = None;
        self.page = Page::Project(name.clone());

        let project = name.clone();
        run(ctx, async move { api::project_details(&project).await }, Msg::ProjectLoaded);
        self.reload_labels(ctx);
        self.reload_model(ctx);
        true
    }

    fn handle_rename_project(&mut self, ctx: &Context<Self>, name: String) -> bool {
        let Some(new_name) = prompt("New project name", &name) else {
            return false;
        };
        let link = ctx.link().clone();
        spawn_local(async move {
            match api::rename_project(&name, &new_name).await {
                Ok(_) => {
                    link.send_message(Msg::Notice(format!("Project renamed to {}", new_name)));
                    link.send_message(Msg::CloseProject);
                }
                Err(e) => link.send_message(Msg::Failed(e)),
            }
        });
        false
    }

    fn handle_delete_project(&mut self, ctx: &Context<Self>, name: String) -> bool {
        if !confirm(&format!("Delete project {} and all of its images?", name)) {
            return false;
        }
        let link = ctx.link().clone();
        spawn_local(async move {
            match api::delete_project(&name).await {
                Ok(_) => {
                    link.send_message(Msg::Notice(format!("Project {} deleted", name)));
                    link.send_message(Msg::CloseProject);
                }
                Err(e) => link.send_message(Msg::Failed(e)),
            }
        });
        false
    }
}

// Label handlers
impl Model {
    fn reload_labels(&self, ctx: &Context<Self>) {
        let Some(project) = self.current_project().map(str::to_string) else {
            return;
        };
        let data_type = self.data_type;
        run(
            ctx,
            async move { api::list_labels(&project, data_type).await },
            Msg::LabelsLoaded,
        );
    }

    fn handle_select_data_type(&mut self, ctx: &Context<Self>, data_type: DataType) -> bool {
        if self.data_type == data_type {
            return false;
        }
        self.data_type = data_type;
        self.labels.clear();
        self.label = None;
        self.images.clear();
        self.selected.clear();
        self.verify_status = None;
        self.verification = None;
        self.reload_labels(ctx);
        true
    }

    fn handle_select_label(&mut self, ctx: &Context<Self>, label: String) -> bool {
        self.label = Some(label);
        self.images.clear();
        self.selected.clear();
        self.verify_status = None;
        self.verification = None;
        self.reload_images(ctx);
        if self.data_type == DataType::Verification {
            self.reload_verification(ctx);
        }
        true
    }

    fn handle_add_label(&mut self, ctx: &Context<Self>) -> bool {
        let Some(project) = self.current_project().map(str::to_string) else {
            return false;
        };
        let label = self.drafts.label_name.trim().to_string();
        if label.is_empty() {
            self.error = Some("Label name is required.".into());
            return true;
        }
        self.drafts.label_name.clear();
        self.error = None;
        let data_type = self.data_type;
        let link = ctx.link().clone();
        spawn_local(async move {
            match api::add_label(&project, data_type, &label).await {
                Ok(_) => link.send_message(Msg::SelectLabel(label)),
                Err(e) => link.send_message(Msg::Failed(e)),
            }
        });
        true
    }

    fn handle_rename_label(&mut self, ctx: &Context<Self>, label: String) -> bool {
        let Some(project) = self.current_project().map(str::to_string) else {
            return false;
        };
        let Some(new_name) = prompt("New label name", &label) else {
            return false;
        };
        let data_type = self.data_type;
        let link = ctx.link().clone();
        spawn_local(async move {
            match api::rename_label(&project, data_type, &label, &new_name).await {
                Ok(_) => {
                    link.send_message(Msg::SelectLabel(new_name.trim().to_string()));
                    match api::list_labels(&project, data_type).await {
                        Ok(labels) => link.send_message(Msg::LabelsLoaded(labels)),
                        Err(e) => link.send_message(Msg::Failed(e)),
                    }
                }
                Err(e) => link.send_message(Msg::Failed(e)),
            }
        });
        false
    }

    fn handle_delete_label(&mut self, ctx: &Context<Self>, label: String) -> bool {
        let Some(project) = self.current_project().map(str::to_string) else {
            return false;
        };
        if !confirm(&format!("Delete label {} and its images?", label)) {
            return false;
        }
        let data_type = self.data_type;
        let link = ctx.link().clone();
        spawn_local(async move {
            match api::delete_label(&project, data_type, &label).await {
                Ok(_) => match api::list_labels(&project, data_type).await {
                    Ok(labels) => link.send_message(Msg::LabelsLoaded(labels)),
                    Err(e) => link.send_message(Msg::Failed(e)),
                },
                Err(e) => link.send_message(Msg::Failed(e)),
            }
        });
        false
    }
}

// Image handlers
impl Model {
    fn label_target(&self) -> Option<(String, DataType, String)> {
        let project = self.current_project()?.to_string();
        let label = self.label.clone()?;
        Some((project, self.data_type, label))
    }

    fn reload_images(&self, ctx: &Context<Self>) {
        let Some((project, data_type, label)) = self.label_target() else {
            return;
        };
        run(
            ctx,
            async move { api::list_images(&project, data_type, &label).await },
            Msg::ImagesLoaded,
        );
    }

    fn handle_files_added(&mut self, ctx: &Context<Self>, files: Vec<GlooFile>) -> bool {
        let Some((project, data_type, label)) = self.label_target() else {
            self.error = Some("Select a label before uploading.".into());
            return true;
        };
        if files.len() > MAX_FILES_PER_UPLOAD {
            self.error = Some(format!(
                "Upload limit exceeded. You can upload at most {} images at once.",
                MAX_FILES_PER_UPLOAD
            ));
            return true;
        }

        self.error = None;
        self.upload = Some(UploadState {
            processed: 0,
            total: files.len(),
        });
        run(
            ctx,
            async move { api::upload_images(&project, data_type, &label, &files).await },
            Msg::UploadFinished,
        );
        true
    }

    fn handle_drop(&mut self, ctx: &Context<Self>, event: DragEvent) -> bool {
        event.prevent_default();
        self.is_dragging = false;

        let files = event
            .data_transfer()
            .and_then(|transfer| transfer.files())
            .map(|list| components::utils::extract_image_files(&list))
            .unwrap_or_default();
        if files.is_empty() {
            self.error = Some("No valid image files dropped.".into());
            return true;
        }
        ctx.link().send_message(Msg::FilesAdded(files));
        true
    }

    fn handle_delete_selected(&mut self, ctx: &Context<Self>) -> bool {
        let Some((project, data_type, label)) = self.label_target() else {
            return false;
        };
        if self.selected.is_empty() {
            return false;
        }
        if !confirm(&format!("Delete {} image(s)?", self.selected.len())) {
            return false;
        }
        let images: Vec<String> = self.selected.iter().cloned().collect();
        run(
            ctx,
            async move { api::delete_images(&project, data_type, &label, images).await },
            |deleted| Msg::Notice(format!("Deleted {} image(s)", deleted.len())),
        );
        false
    }

    fn handle_move_selected(&mut self, ctx: &Context<Self>) -> bool {
        let Some((project, data_type, label)) = self.label_target() else {
            return false;
        };
        let target = self.drafts.move_target.trim().to_string();
        if target.is_empty() || self.selected.is_empty() {
            self.error = Some("Select images and a target label first.".into());
            return true;
        }
        if target == label {
            self.error = Some("Images are already in this label.".into());
            return true;
        }
        self.error = None;
        let images: Vec<String> = self.selected.iter().cloned().collect();
        let link = ctx.link().clone();
        spawn_local(async move {
            match api::move_images(&project, data_type, &label, &target, images).await {
                Ok(response) => {
                    link.send_message(Msg::Notice(response.message));
                    match api::list_images(&project, data_type, &label).await {
                        Ok(images) => link.send_message(Msg::ImagesLoaded(images)),
                        Err(e) => link.send_message(Msg::Failed(e)),
                    }
                    match api::list_labels(&project, data_type).await {
                        Ok(labels) => link.send_message(Msg::LabelsLoaded(labels)),
                        Err(e) => link.send_message(Msg::Failed(e)),
                    }
                }
                Err(e) => link.send_message(Msg::Failed(e)),
            }
        });
        true
    }

    fn handle_rename_image(&mut self, ctx: &Context<Self>, image: String) -> bool {
        let Some((project, data_type, label)) = self.label_target() else {
            return false;
        };
        let Some(new_name) = prompt("New image name", &image) else {
            return false;
        };
        let link = ctx.link().clone();
        spawn_local(async move {
            match api::rename_image(&project, data_type, &label, &image, &new_name).await {
                Ok(renamed) => {
                    link.send_message(Msg::Notice(format!("Renamed to {}", renamed)));
                    match api::list_images(&project, data_type, &label).await {
                        Ok(images) => link.send_message(Msg::ImagesLoaded(images)),
                        Err(e) => link.send_message(Msg::Failed(e)),
                    }
                }
                Err(e) => link.send_message(Msg::Failed(e)),
            }
        });
        false
    }
}

// Model handlers
impl Model {
    fn reload_model(&self, ctx: &Context<Self>) {
        let Some(project) = self.current_project().map(str::to_string) else {
            return;
        };
        run(ctx, async move { api::model_info(&project).await }, Msg::ModelInfoLoaded);
    }

    fn reload_verification(&self, ctx: &Context<Self>) {
        let Some((project, _, label)) = self.label_target() else {
            return;
        };
        run(
            ctx,
            async move { api::verification_results(&project, &label).await },
            Msg::VerificationLoaded,
        );
    }

    fn handle_train(&mut self, ctx: &Context<Self>) -> bool {
        let Some(project) = self.current_project().map(str::to_string) else {
            return false;
        };
        if self.push.is_none() {
            self.open_push_channel(ctx);
        }
        self.error = None;
        run(ctx, async move { api::train(&project).await }, |response| {
            Msg::Notice(response.message)
        });
        true
    }

    fn handle_verify(&mut self, ctx: &Context<Self>) -> bool {
        let Some((project, _, label)) = self.label_target() else {
            return false;
        };
        self.error = None;
        self.verification = None;
        run(ctx, async move { api::verify(&project, &label).await }, |response| {
            Msg::Notice(response.message)
        });
        true
    }

    fn handle_toggle_theme(&mut self) -> bool {
        self.theme = self.theme.toggled();
        self.theme.apply();
        self.theme.store();
        true
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}

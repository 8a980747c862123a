use gloo_net::http::{Request, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{
    CreateLabelRequest, CreateProjectRequest, Credentials, DataType, DeleteImagesRequest,
    ImagesResponse, LabelsResponse, MessageResponse, ModelInfo, ModelInfoResponse,
    MoveImagesRequest, ProfileResponse, ProjectDetails, ProjectResponse, ProjectsResponse,
    RenameImageRequest, RenameLabelRequest, RenameProjectRequest, UserProfile,
    VerificationResults, VerificationResultsResponse,
};
use web_sys::FormData;

const PROJECTS: &str = "/api/image-classing/projects";

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The session is gone; the caller should return to the login page.
    Unauthorized,
    NotFound(String),
    Server(String),
    Network(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "Please log in again."),
            ApiError::NotFound(message) | ApiError::Server(message) => write!(f, "{}", message),
            ApiError::Network(message) => write!(f, "Network error: {}", message),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn enc(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

pub fn project_url(project: &str) -> String {
    format!("{}/{}", PROJECTS, enc(project))
}

fn labels_url(project: &str, data_type: DataType) -> String {
    format!("{}/{}/labels", project_url(project), data_type.dir_name())
}

fn label_url(project: &str, data_type: DataType, label: &str) -> String {
    format!("{}/{}", labels_url(project, data_type), enc(label))
}

/// Where the backend serves a stored image from.
pub fn image_src(
    username: &str,
    project: &str,
    data_type: DataType,
    label: &str,
    image: &str,
) -> String {
    format!(
        "/uploads/{}/image-classing/{}/{}/{}/{}",
        enc(username),
        enc(project),
        data_type.dir_name(),
        enc(label),
        enc(image)
    )
}

async fn read<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    if response.ok() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Server(format!("Unexpected response: {}", e)));
    }

    let status = response.status();
    let message = match response.json::<MessageResponse>().await {
        Ok(body) => body.message,
        Err(_) => format!("Server error: {}", status),
    };
    log::warn!("Request failed with {}: {}", status, message);
    match status {
        401 => Err(ApiError::Unauthorized),
        404 => Err(ApiError::NotFound(message)),
        _ => Err(ApiError::Server(message)),
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> ApiResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    read(response).await
}

async fn send_json<B: Serialize, T: DeserializeOwned>(
    request: RequestBuilder,
    body: &B,
) -> ApiResult<T> {
    let response = request
        .json(body)
        .map_err(|e| ApiError::Network(e.to_string()))?
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    read(response).await
}

// Auth

pub async fn register(username: &str, password: &str) -> ApiResult<MessageResponse> {
    send_json(
        Request::post("/api/auth/register"),
        &Credentials {
            username: username.to_string(),
            password: password.to_string(),
        },
    )
    .await
}

pub async fn login(username: &str, password: &str) -> ApiResult<MessageResponse> {
    send_json(
        Request::post("/api/auth/login"),
        &Credentials {
            username: username.to_string(),
            password: password.to_string(),
        },
    )
    .await
}

pub async fn logout() -> ApiResult<MessageResponse> {
    send(Request::post("/api/auth/logout")).await
}

pub async fn profile() -> ApiResult<Option<UserProfile>> {
    let response: ProfileResponse = send(Request::get("/api/auth/profile")).await?;
    Ok(response.user.filter(|_| response.success))
}

// Projects

pub async fn list_projects() -> ApiResult<Vec<String>> {
    let response: ProjectsResponse = send(Request::get(PROJECTS)).await?;
    Ok(response.projects)
}

pub async fn create_project(name: &str) -> ApiResult<MessageResponse> {
    send_json(
        Request::post(PROJECTS),
        &CreateProjectRequest {
            project_name: name.to_string(),
        },
    )
    .await
}

pub async fn project_details(name: &str) -> ApiResult<ProjectDetails> {
    let response: ProjectResponse = send(Request::get(&project_url(name))).await?;
    Ok(response.project)
}

pub async fn delete_project(name: &str) -> ApiResult<MessageResponse> {
    send(Request::delete(&project_url(name))).await
}

pub async fn rename_project(name: &str, new_name: &str) -> ApiResult<MessageResponse> {
    send_json(
        Request::put(&format!("{}/rename", project_url(name))),
        &RenameProjectRequest {
            new_project_name: new_name.to_string(),
        },
    )
    .await
}

// Labels

pub async fn list_labels(project: &str, data_type: DataType) -> ApiResult<Vec<String>> {
    let response: LabelsResponse = send(Request::get(&labels_url(project, data_type))).await?;
    Ok(response.labels)
}

pub async fn add_label(project: &str, data_type: DataType, label: &str) -> ApiResult<MessageResponse> {
    send_json(
        Request::post(&labels_url(project, data_type)),
        &CreateLabelRequest {
            label_name: label.to_string(),
        },
    )
    .await
}

pub async fn rename_label(
    project: &str,
    data_type: DataType,
    label: &str,
    new_name: &str,
) -> ApiResult<MessageResponse> {
    send_json(
        Request::put(&format!("{}/rename", label_url(project, data_type, label))),
        &RenameLabelRequest {
            new_label_name: new_name.to_string(),
        },
    )
    .await
}

pub async fn delete_label(project: &str, data_type: DataType, label: &str) -> ApiResult<MessageResponse> {
    send(Request::delete(&label_url(project, data_type, label))).await
}

// Images

pub async fn list_images(project: &str, data_type: DataType, label: &str) -> ApiResult<Vec<String>> {
    let url = format!("{}/images", label_url(project, data_type, label));
    let response: ImagesResponse = send(Request::get(&url)).await?;
    Ok(response.images)
}

pub async fn upload_images(
    project: &str,
    data_type: DataType,
    label: &str,
    files: &[gloo_file::File],
) -> ApiResult<Vec<String>> {
    let form = FormData::new().map_err(|_| ApiError::Network("FormData unavailable".into()))?;
    for file in files {
        form.append_with_blob_and_filename("images", file.as_ref(), &file.name())
            .map_err(|_| ApiError::Network(format!("could not attach {}", file.name())))?;
    }

    let url = format!("{}/upload", label_url(project, data_type, label));
    let response = Request::post(&url)
        .body(form)
        .map_err(|e| ApiError::Network(e.to_string()))?
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    let response: ImagesResponse = read(response).await?;
    Ok(response.images)
}

pub async fn delete_images(
    project: &str,
    data_type: DataType,
    label: &str,
    images: Vec<String>,
) -> ApiResult<Vec<String>> {
    let url = format!("{}/delete-images", label_url(project, data_type, label));
    let response: ImagesResponse =
        send_json(Request::post(&url), &DeleteImagesRequest { images }).await?;
    Ok(response.images)
}

pub async fn move_images(
    project: &str,
    data_type: DataType,
    label: &str,
    target_label: &str,
    images: Vec<String>,
) -> ApiResult<MessageResponse> {
    let url = format!("{}/move-images", label_url(project, data_type, label));
    send_json(
        Request::post(&url),
        &MoveImagesRequest {
            target_label: target_label.to_string(),
            images,
        },
    )
    .await
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenamedImage {
    image_name: String,
}

pub async fn rename_image(
    project: &str,
    data_type: DataType,
    label: &str,
    image: &str,
    new_name: &str,
) -> ApiResult<String> {
    let url = format!(
        "{}/images/{}/rename",
        label_url(project, data_type, label),
        enc(image)
    );
    let response: RenamedImage = send_json(
        Request::put(&url),
        &RenameImageRequest {
            new_image_name: new_name.to_string(),
        },
    )
    .await?;
    Ok(response.image_name)
}

// Model

pub async fn train(project: &str) -> ApiResult<MessageResponse> {
    send(Request::post(&format!("{}/train", project_url(project)))).await
}

pub async fn model_info(project: &str) -> ApiResult<ModelInfo> {
    let response: ModelInfoResponse =
        send(Request::get(&format!("{}/model-info", project_url(project)))).await?;
    Ok(response.model_info)
}

pub async fn verify(project: &str, label: &str) -> ApiResult<MessageResponse> {
    let url = format!("{}/verify", label_url(project, DataType::Verification, label));
    send(Request::post(&url)).await
}

/// `None` until a verification run for this label has finished.
pub async fn verification_results(project: &str, label: &str) -> ApiResult<Option<VerificationResults>> {
    let url = format!(
        "{}/verification-results",
        label_url(project, DataType::Verification, label)
    );
    match send::<VerificationResultsResponse>(Request::get(&url)).await {
        Ok(response) => Ok(Some(response.results)),
        Err(ApiError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

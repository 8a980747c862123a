use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::{HttpResponse, web};
use shared::{Credentials, MessageResponse, ProfileResponse};

use super::CookieSettings;
use super::middleware::AuthenticatedUser;
use super::models::AuthUser;
use super::password::{hash_password, verify_password};
use super::session::SessionService;
use crate::db::RepositoryError;
use crate::db::user_repository::UserRepository;
use crate::error::ApiError;
use crate::push::SessionRegistry;
use crate::storage::naming::validate_username;
use crate::storage::project_store::ProjectStore;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/register").route(web::post().to(register)))
        .service(web::resource("/login").route(web::post().to(login)))
        .service(web::resource("/logout").route(web::post().to(logout)))
        .service(web::resource("/profile").route(web::get().to(profile)));
}

fn session_cookie(settings: &CookieSettings, value: String, max_age_minutes: i64) -> Cookie<'static> {
    Cookie::build(settings.name.clone(), value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure)
        .max_age(CookieDuration::minutes(max_age_minutes))
        .finish()
}

pub async fn register(
    body: web::Json<Credentials>,
    users: web::Data<UserRepository>,
    projects: web::Data<ProjectStore>,
) -> Result<HttpResponse, ApiError> {
    let Credentials { username, password } = body.into_inner();
    let username = username.trim().to_string();
    validate_username(&username)?;
    if password.is_empty() {
        return Err(ApiError::validation("password is required"));
    }

    let password_hash = hash_password(&password)?;
    let user = users
        .create_user(&username, &password_hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => ApiError::Conflict("username already exists".into()),
            other => other.into(),
        })?;
    projects.ensure_user_root(&user.username).await?;

    log::info!("User registered: {}", user.username);
    Ok(HttpResponse::Created().json(MessageResponse {
        success: true,
        message: "registration successful".into(),
    }))
}

pub async fn login(
    body: web::Json<Credentials>,
    users: web::Data<UserRepository>,
    sessions: web::Data<SessionService>,
    cookie: web::Data<CookieSettings>,
) -> Result<HttpResponse, ApiError> {
    let Credentials { username, password } = body.into_inner();
    if username.trim().is_empty() || password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }

    let user = match users.get_user_by_username(username.trim()).await? {
        Some(user) => user,
        None => {
            log::warn!("Login failed for unknown user");
            return Err(ApiError::InvalidCredentials);
        }
    };
    if !verify_password(&password, &user.password_hash)? {
        log::warn!("Login failed for {}", user.username);
        return Err(ApiError::InvalidCredentials);
    }

    let user = AuthUser::from(user);
    let (token, _context) = sessions.create(&user).await?;
    log::info!("User logged in: {}", user.username);

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&cookie, token, sessions.ttl().num_minutes()))
        .json(MessageResponse {
            success: true,
            message: "login successful".into(),
        }))
}

pub async fn logout(
    user: Option<AuthenticatedUser>,
    sessions: web::Data<SessionService>,
    registry: web::Data<SessionRegistry>,
    cookie: web::Data<CookieSettings>,
) -> Result<HttpResponse, ApiError> {
    if let Some(AuthenticatedUser(context)) = user {
        registry.remove_session(&context.session_id);
        sessions.destroy(&context.session_id).await?;
        log::info!("User logged out: {}", context.user.username);
    }

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&cookie, String::new(), 0))
        .json(MessageResponse {
            success: true,
            message: "logged out".into(),
        }))
}

pub async fn profile(user: Option<AuthenticatedUser>) -> HttpResponse {
    match user {
        Some(AuthenticatedUser(context)) => HttpResponse::Ok().json(ProfileResponse {
            success: true,
            user: Some(context.user.into()),
            message: None,
        }),
        None => HttpResponse::Ok().json(ProfileResponse {
            success: false,
            user: None,
            message: Some(ApiError::Unauthorized.to_string()),
        }),
    }
}

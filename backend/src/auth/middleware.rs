use super::models::SessionContext;
use super::session::SessionService;
use crate::error::ApiError;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use actix_web::{FromRequest, HttpRequest};
use futures::future::{Ready, ok, ready};
use shared::MessageResponse;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Resolves the session cookie and attaches a [`SessionContext`] to the request.
/// Everything under `/api/auth/` is reachable without one; every other wrapped
/// path answers 401 when the cookie is missing, forged or expired.
#[derive(Clone)]
pub struct AuthMiddleware {
    sessions: Arc<SessionService>,
    cookie_name: Arc<str>,
}

impl AuthMiddleware {
    pub fn new(sessions: SessionService, cookie_name: &str) -> Self {
        Self {
            sessions: Arc::new(sessions),
            cookie_name: Arc::from(cookie_name),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Arc::new(service),
            sessions: self.sessions.clone(),
            cookie_name: self.cookie_name.clone(),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    sessions: Arc<SessionService>,
    cookie_name: Arc<str>,
}

#[derive(Debug)]
enum AuthError {
    NoCookie,
    Rejected(String),
}

impl AuthError {
    fn log_message(&self, path: &str) -> String {
        match self {
            AuthError::NoCookie => format!("No session cookie for path: {}", path),
            AuthError::Rejected(e) => format!("Session rejected for path {}: {}", path, e),
        }
    }
}

fn is_public(path: &str) -> bool {
    path.starts_with("/api/auth/")
}

async fn resolve_session(
    req: &ServiceRequest,
    sessions: &SessionService,
    cookie_name: &str,
) -> Result<SessionContext, AuthError> {
    let token = req
        .cookie(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::NoCookie)?;

    sessions
        .resolve(&token)
        .await
        .map_err(|e| AuthError::Rejected(e.to_string()))
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let sessions = self.sessions.clone();
        let cookie_name = self.cookie_name.clone();

        Box::pin(async move {
            let path_str = req.path().to_string();
            log::debug!("Auth middleware processing path: {}", &path_str);

            match resolve_session(&req, &sessions, &cookie_name).await {
                Ok(context) => {
                    req.extensions_mut().insert(context);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(_) if is_public(&path_str) => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(auth_error) => {
                    log::warn!("{}", auth_error.log_message(&path_str));

                    let (http_req, _payload) = req.into_parts();
                    let response = HttpResponse::Unauthorized()
                        .json(MessageResponse {
                            success: false,
                            message: ApiError::Unauthorized.to_string(),
                        })
                        .map_into_right_body();
                    Ok(ServiceResponse::new(http_req, response))
                }
            }
        })
    }
}

/// The session attached by [`AuthMiddleware`]. Use `Option<AuthenticatedUser>`
/// on routes that also serve anonymous callers.
pub struct AuthenticatedUser(pub SessionContext);

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<SessionContext>() {
            Some(context) => ok(AuthenticatedUser(context.clone())),
            None => {
                log::warn!("No session attached to request for path: {}", req.path());
                ready(Err(ApiError::Unauthorized))
            }
        }
    }
}

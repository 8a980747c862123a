use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::{HttpResponse, web};

use crate::auth::middleware::AuthenticatedUser;
use crate::push::SessionRegistry;

/// Opens the push channel for the caller's session.
pub async fn subscribe(
    AuthenticatedUser(session): AuthenticatedUser,
    registry: web::Data<SessionRegistry>,
) -> HttpResponse {
    log::info!("Push channel opened for {}", session.user.username);
    let stream = registry.connect(&session.session_id, session.expires_at);

    HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .streaming(stream)
}

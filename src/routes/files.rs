//! Download endpoints for stored attachments and avatars. Both are served
//! without a bearer token so plain `<img>` tags can load them.

use actix_web::{get, web, HttpResponse};

use crate::error::AppError;
use crate::services::attachment_store;
use crate::state::AppState;

/// Content type derived from the stored file's extension. Anything that is
/// not a known image type is served as a generic byte stream.
fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// GET /attachments/{year}/{name}
/// Download a stored attachment.
#[get("/attachments/{year}/{name}")]
pub async fn get_attachment(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (year, name) = path.into_inner();
    match state.attachments.read(&year, &name).await? {
        Some(bytes) => Ok(HttpResponse::Ok()
            .content_type(content_type_for(&name))
            .body(bytes)),
        None => Ok(HttpResponse::NotFound().finish()),
    }
}

/// GET /avatars/{name}
/// Download an uploaded group avatar.
#[get("/avatars/{name}")]
pub async fn get_avatar(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let name = path.into_inner();
    match attachment_store::read_avatar(&state.config.avatar_root, &name).await? {
        Some(bytes) => Ok(HttpResponse::Ok()
            .content_type(content_type_for(&name))
            .body(bytes)),
        None => Ok(HttpResponse::NotFound().finish()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("report.pdf"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}

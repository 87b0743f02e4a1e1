use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::new_code;

/// Verify that a resolved path stays within the expected base directory.
/// Prevents path traversal attacks.
fn ensure_within(base: &Path, target: &Path) -> AppResult<PathBuf> {
    // Canonicalize base; target may not exist yet so normalize manually
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(&canonical_base)
        .unwrap_or(target)
        .components()
    {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            std::path::Component::ParentDir => {
                return Err(AppError::BadRequest("path traversal detected".to_string()));
            }
            _ => {} // RootDir, CurDir, Prefix: skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(AppError::BadRequest("path traversal detected".to_string()));
    }
    Ok(resolved)
}

fn reject_separators(segment: &str) -> AppResult<()> {
    if segment.contains('/') || segment.contains('\\') || segment.contains("..") {
        return Err(AppError::BadRequest("path traversal detected".to_string()));
    }
    Ok(())
}

/// A stored attachment: where it landed and what the client called it.
#[derive(Debug, Clone)]
pub struct StoredAttachment {
    /// Public path recorded on the message, e.g. `/attachments/2026/<name>`
    pub public_path: String,
    /// Original client-side filename, used as content for caption-less sends
    pub original_name: String,
}

/// Filesystem store for message attachments, partitioned by year so a
/// single directory never accumulates unbounded entries.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub async fn new(root: PathBuf) -> AppResult<Self> {
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::AttachmentWrite(format!(
                "failed to create attachment root '{}': {}",
                root.display(),
                e
            ))
        })?;

        info!(path = %root.display(), "attachment store initialized");

        Ok(Self { root })
    }

    /// Persist one attachment under the current year. The stored name is a
    /// fresh random identifier with the original extension, so uploads can
    /// never collide or overwrite each other.
    pub async fn store(&self, original_name: &str, data: &[u8]) -> AppResult<StoredAttachment> {
        let year = Utc::now().year().to_string();
        let dir = self.root.join(&year);
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::AttachmentWrite(format!("failed to create '{}': {}", dir.display(), e))
        })?;

        let stored_name = stored_name(original_name);
        let path = ensure_within(&self.root, &dir.join(&stored_name))?;

        fs::write(&path, data).await.map_err(|e| {
            AppError::AttachmentWrite(format!("failed to write '{}': {}", stored_name, e))
        })?;

        debug!(name = %stored_name, size = data.len(), "stored attachment");

        Ok(StoredAttachment {
            public_path: format!("/attachments/{}/{}", year, stored_name),
            original_name: original_name.to_string(),
        })
    }

    /// Read an attachment back for download. `Ok(None)` when the file does
    /// not exist; traversal attempts are rejected outright.
    pub async fn read(&self, year: &str, name: &str) -> AppResult<Option<Vec<u8>>> {
        reject_separators(year)?;
        reject_separators(name)?;

        let path = ensure_within(&self.root, &self.root.join(year).join(name))?;
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(&path).await.map_err(|e| {
            AppError::AttachmentWrite(format!("failed to read '{}': {}", name, e))
        })?;
        Ok(Some(data))
    }
}

/// Collision-resistant stored filename: random 32-hex identifier plus the
/// original extension (if any), so the served file keeps a usable type.
pub fn stored_name(original: &str) -> String {
    match Path::new(original).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", new_code(), ext),
        _ => new_code(),
    }
}

/// Store a decoded avatar image under a flat directory, returning its
/// public path (`/avatars/<name>`).
pub async fn store_avatar(root: &Path, data: &[u8]) -> AppResult<String> {
    fs::create_dir_all(root).await.map_err(|e| {
        AppError::AttachmentWrite(format!(
            "failed to create avatar root '{}': {}",
            root.display(),
            e
        ))
    })?;

    let name = format!("{}.jpg", new_code());
    let path = ensure_within(root, &root.join(&name))?;
    fs::write(&path, data)
        .await
        .map_err(|e| AppError::AttachmentWrite(format!("failed to write avatar: {}", e)))?;

    debug!(name = %name, size = data.len(), "stored avatar");
    Ok(format!("/avatars/{}", name))
}

/// Read an avatar back for serving. Same contract as `AttachmentStore::read`.
pub async fn read_avatar(root: &Path, name: &str) -> AppResult<Option<Vec<u8>>> {
    reject_separators(name)?;
    let path = ensure_within(root, &root.join(name))?;
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(&path)
        .await
        .map_err(|e| AppError::AttachmentWrite(format!("failed to read avatar: {}", e)))?;
    Ok(Some(data))
}

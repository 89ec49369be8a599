/// Resume and profile photo uploads
///
/// Files are content-addressed: the key is the SHA-256 of the bytes plus
/// the detected extension. The key is recorded on the user row.
pub mod disk;

pub use disk::DiskStorage;

use crate::{
    account::{AccountManager, User},
    config::StorageConfig,
    error::{BoardError, BoardResult},
};
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;

/// Upload storage backend
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn put(&self, key: &str, data: &[u8]) -> BoardResult<()>;

    async fn get(&self, key: &str) -> BoardResult<Option<Vec<u8>>>;

    async fn delete(&self, key: &str) -> BoardResult<()>;

    async fn exists(&self, key: &str) -> BoardResult<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Resume,
    Photo,
}

impl UploadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Resume => "resume",
            UploadKind::Photo => "photo",
        }
    }

    fn accepts(&self, format: FileFormat) -> bool {
        match self {
            UploadKind::Resume => matches!(format, FileFormat::Pdf | FileFormat::Doc | FileFormat::Docx),
            UploadKind::Photo => matches!(format, FileFormat::Jpeg | FileFormat::Png | FileFormat::Webp),
        }
    }

    fn allowed(&self) -> &'static str {
        match self {
            UploadKind::Resume => "pdf, doc, docx",
            UploadKind::Photo => "jpeg, png, webp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pdf,
    Doc,
    Docx,
    Jpeg,
    Png,
    Webp,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Pdf => "pdf",
            FileFormat::Doc => "doc",
            FileFormat::Docx => "docx",
            FileFormat::Jpeg => "jpg",
            FileFormat::Png => "png",
            FileFormat::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileFormat::Pdf => "application/pdf",
            FileFormat::Doc => "application/msword",
            FileFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileFormat::Jpeg => "image/jpeg",
            FileFormat::Png => "image/png",
            FileFormat::Webp => "image/webp",
        }
    }

    fn from_extension(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileFormat::Pdf),
            "doc" => Some(FileFormat::Doc),
            "docx" => Some(FileFormat::Docx),
            "jpg" | "jpeg" => Some(FileFormat::Jpeg),
            "png" => Some(FileFormat::Png),
            "webp" => Some(FileFormat::Webp),
            _ => None,
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
        [
            FileFormat::Pdf,
            FileFormat::Doc,
            FileFormat::Docx,
            FileFormat::Jpeg,
            FileFormat::Png,
            FileFormat::Webp,
        ]
        .into_iter()
        .find(|f| f.content_type() == essence)
    }

    /// Leading bytes expected for the format
    fn matches_magic(&self, data: &[u8]) -> bool {
        match self {
            FileFormat::Pdf => data.starts_with(b"%PDF"),
            FileFormat::Doc => data.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]),
            // docx is a zip container
            FileFormat::Docx => data.starts_with(b"PK\x03\x04"),
            FileFormat::Jpeg => data.starts_with(&[0xFF, 0xD8, 0xFF]),
            FileFormat::Png => data.starts_with(b"\x89PNG\r\n\x1a\n"),
            FileFormat::Webp => data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP",
        }
    }
}

/// Result of a stored upload
#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    pub key: String,
    pub size: usize,
    pub content_type: &'static str,
}

/// An incoming file as read from the multipart field
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct UploadService {
    backend: Arc<dyn StorageBackend>,
    accounts: AccountManager,
    resume_limit: usize,
    photo_limit: usize,
}

impl UploadService {
    pub fn new(backend: Arc<dyn StorageBackend>, accounts: AccountManager, config: &StorageConfig) -> Self {
        Self {
            backend,
            accounts,
            resume_limit: config.resume_upload_limit,
            photo_limit: config.photo_upload_limit,
        }
    }

    pub fn limit(&self, kind: UploadKind) -> usize {
        match kind {
            UploadKind::Resume => self.resume_limit,
            UploadKind::Photo => self.photo_limit,
        }
    }

    /// Check type and size, store the bytes and record the key on the user
    pub async fn store(&self, user: &User, kind: UploadKind, file: IncomingFile) -> BoardResult<(StoredUpload, User)> {
        if file.data.is_empty() {
            return Err(BoardError::invalid_field("file", "must not be empty"));
        }
        if file.data.len() > self.limit(kind) {
            return Err(BoardError::invalid_field(
                "file",
                &format!("must be at most {} bytes", self.limit(kind)),
            ));
        }

        let format = file
            .file_name
            .as_deref()
            .and_then(FileFormat::from_extension)
            .or_else(|| file.content_type.as_deref().and_then(FileFormat::from_content_type))
            .filter(|format| kind.accepts(*format))
            .ok_or_else(|| {
                BoardError::invalid_field("file", &format!("must be one of: {}", kind.allowed()))
            })?;

        if !format.matches_magic(&file.data) {
            return Err(BoardError::invalid_field(
                "file",
                &format!("content is not a valid {} file", format.extension()),
            ));
        }

        let key = format!("{}.{}", hex::encode(Sha256::digest(&file.data)), format.extension());
        if !self.backend.exists(&key).await? {
            self.backend.put(&key, &file.data).await?;
        }

        let user = match kind {
            UploadKind::Resume => self.accounts.set_resume(user.id, &key).await?,
            UploadKind::Photo => self.accounts.set_photo(user.id, &key).await?,
        };
        info!(user_id = %user.id, kind = kind.as_str(), key = %key, size = file.data.len(), "upload stored");

        Ok((
            StoredUpload {
                key,
                size: file.data.len(),
                content_type: format.content_type(),
            },
            user,
        ))
    }

    pub async fn fetch(&self, key: &str) -> BoardResult<Vec<u8>> {
        self.backend
            .get(key)
            .await?
            .ok_or_else(|| BoardError::NotFound(format!("Upload {} not found", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::UserRole;
    use crate::test_support::TestContext;

    fn pdf() -> IncomingFile {
        IncomingFile {
            file_name: Some("cv.PDF".into()),
            content_type: Some("application/pdf".into()),
            data: b"%PDF-1.7 resume".to_vec(),
        }
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("photo.JPEG"), Some(FileFormat::Jpeg));
        assert_eq!(FileFormat::from_extension("noext"), None);
        assert_eq!(
            FileFormat::from_content_type("image/png; charset=binary"),
            Some(FileFormat::Png)
        );
        assert!(UploadKind::Resume.accepts(FileFormat::Docx));
        assert!(!UploadKind::Photo.accepts(FileFormat::Pdf));
    }

    #[tokio::test]
    async fn test_resume_upload_is_recorded() {
        let t = TestContext::new().await;
        let seeker = t.user(UserRole::JobSeeker).await;

        let (stored, user) = t
            .ctx
            .uploads
            .store(&seeker, UploadKind::Resume, pdf())
            .await
            .unwrap();
        assert!(stored.key.ends_with(".pdf"));
        assert_eq!(stored.key.len(), 64 + 4);
        assert_eq!(user.resume_path.as_deref(), Some(stored.key.as_str()));
        assert_eq!(
            t.ctx.uploads.fetch(&stored.key).await.unwrap(),
            b"%PDF-1.7 resume".to_vec()
        );

        // Same bytes, same key
        let (again, _) = t
            .ctx
            .uploads
            .store(&seeker, UploadKind::Resume, pdf())
            .await
            .unwrap();
        assert_eq!(again.key, stored.key);
    }

    #[tokio::test]
    async fn test_rejects_wrong_type_and_size() {
        let t = TestContext::new().await;
        let seeker = t.user(UserRole::JobSeeker).await;

        assert!(matches!(
            t.ctx.uploads.store(&seeker, UploadKind::Photo, pdf()).await,
            Err(BoardError::InvalidFields(_))
        ));

        let disguised = IncomingFile {
            file_name: Some("cv.pdf".into()),
            content_type: None,
            data: b"MZ not a pdf".to_vec(),
        };
        assert!(t
            .ctx
            .uploads
            .store(&seeker, UploadKind::Resume, disguised)
            .await
            .is_err());

        let limit = t.ctx.uploads.limit(UploadKind::Photo);
        let mut big = b"\x89PNG\r\n\x1a\n".to_vec();
        big.resize(limit + 1, 0);
        let oversized = IncomingFile {
            file_name: Some("me.png".into()),
            content_type: None,
            data: big,
        };
        assert!(matches!(
            t.ctx.uploads.store(&seeker, UploadKind::Photo, oversized).await,
            Err(BoardError::InvalidFields(_))
        ));
    }
}

//! Local storage for letter images.
//!
//! Images are stored under UUID names in a sharded directory tree and
//! referenced from letters by their public URL:
//! ```text
//! {base_path}/ab/ab12cd34-5678-90ab-cdef-123456789012.png
//!   -> {public_url}/ab/ab12cd34-5678-90ab-cdef-123456789012.png
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::config::UploadsConfig;
use crate::{MailroomError, Result};

/// Accepted image extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Image store backed by a local directory.
#[derive(Debug, Clone)]
pub struct ImageStorage {
    base_path: PathBuf,
    public_url: String,
    max_bytes: u64,
}

impl ImageStorage {
    /// Create the store, creating the base directory if needed.
    pub fn new(
        base_path: impl Into<PathBuf>,
        public_url: impl Into<String>,
        max_bytes: u64,
    ) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).map_err(|e| {
            MailroomError::Storage(format!("cannot create {}: {e}", base_path.display()))
        })?;

        Ok(Self {
            base_path,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            max_bytes,
        })
    }

    pub fn from_config(config: &UploadsConfig) -> Result<Self> {
        Self::new(&config.path, &config.public_url, config.max_upload_bytes())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Route the images are served under, when the public URL is local.
    pub fn mount_path(&self) -> Option<&str> {
        Some(self.public_url.as_str()).filter(|url| url.starts_with('/'))
    }

    /// Store an uploaded image and return its public URL.
    pub fn save(&self, content: &[u8], original_name: &str) -> Result<String> {
        if content.is_empty() {
            return Err(MailroomError::Validation("image file is empty".to_string()));
        }
        if content.len() as u64 > self.max_bytes {
            return Err(MailroomError::Validation(format!(
                "image exceeds the {} MB limit",
                self.max_bytes / (1024 * 1024)
            )));
        }
        let ext = image_extension(original_name)?;

        let stored_name = format!("{}.{ext}", Uuid::new_v4());
        let path = self.path_for(&stored_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;

        debug!(path = %path.display(), size = content.len(), "Image stored");
        Ok(format!(
            "{}/{}/{}",
            self.public_url,
            shard(&stored_name),
            stored_name
        ))
    }

    /// Delete the image behind a URL produced by [`save`](Self::save).
    ///
    /// Returns false when the URL is not one of ours or the file is gone.
    pub fn delete_by_url(&self, url: &str) -> Result<bool> {
        let Some(path) = self.path_for_url(url) else {
            return Ok(false);
        };
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Image deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists_url(&self, url: &str) -> bool {
        self.path_for_url(url).is_some_and(|path| path.exists())
    }

    /// Map a public URL back to the stored file.
    fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let rest = url.strip_prefix(&self.public_url)?.strip_prefix('/')?;
        let (dir, name) = rest.split_once('/')?;
        let safe = |s: &str| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        };
        if !safe(dir) || !safe(name) || name.starts_with('.') || dir != shard(name) {
            return None;
        }
        Some(self.path_for(name))
    }

    fn path_for(&self, stored_name: &str) -> PathBuf {
        self.base_path.join(shard(stored_name)).join(stored_name)
    }
}

/// First two characters of a stored name.
fn shard(stored_name: &str) -> &str {
    stored_name.get(..2).unwrap_or(stored_name)
}

/// Lowercased extension of an accepted image file name.
fn image_extension(filename: &str) -> Result<String> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let is_image = mime_guess::from_ext(&ext)
        .first()
        .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE);
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) && is_image {
        Ok(ext)
    } else {
        Err(MailroomError::Validation(format!(
            "unsupported image type '{filename}' (allowed: {})",
            IMAGE_EXTENSIONS.join(", ")
        )))
    }
}

// Local-disk storage for uploaded restaurant images, served as static
// files under the configured public base URL

use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::app_config::StorageConfig;
use crate::utils::booking_errors::BookingError;

/// Content types accepted for restaurant images, with their extensions
const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

/// A stored file, ready to be recorded in the database
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub url: String,
    pub byte_size: i64,
}

#[derive(Clone)]
pub struct StorageService {
    root_dir: PathBuf,
    public_base_url: String,
    max_upload_bytes: u64,
}

impl StorageService {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root_dir: PathBuf::from(&config.root_dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn extension_for(content_type: &str) -> Option<&'static str> {
        ALLOWED_IMAGE_TYPES
            .iter()
            .find(|(ct, _)| *ct == content_type)
            .map(|(_, ext)| *ext)
    }

    /// Validate and persist an uploaded image. File names are generated
    /// server side; client names never touch the filesystem.
    pub async fn store_image(
        &self,
        restaurant_id: Uuid,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, BookingError> {
        let extension = Self::extension_for(content_type)
            .ok_or_else(|| BookingError::UnsupportedMediaType(content_type.to_string()))?;

        if bytes.is_empty() {
            return Err(BookingError::BadRequest("Empty upload".to_string()));
        }
        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(BookingError::UploadTooLarge {
                size: bytes.len() as u64,
                max: self.max_upload_bytes,
            });
        }

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let dir = self.root_dir.join(restaurant_id.to_string());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| BookingError::StorageError(e.to_string()))?;

        let path = dir.join(&file_name);
        fs::write(&path, bytes)
            .await
            .map_err(|e| BookingError::StorageError(e.to_string()))?;

        tracing::info!(restaurant_id = %restaurant_id, file = %file_name, "Stored uploaded image");

        Ok(StoredFile {
            url: format!("{}/{}/{}", self.public_base_url, restaurant_id, file_name),
            file_name,
            byte_size: bytes.len() as i64,
        })
    }

    /// Remove a stored image file. Missing files are not an error (the
    /// database row is the source of truth).
    pub async fn delete_image(
        &self,
        restaurant_id: Uuid,
        file_name: &str,
    ) -> Result<(), BookingError> {
        // File names are server-generated UUIDs; refuse anything else
        if file_name.contains('/') || file_name.contains("..") {
            return Err(BookingError::BadRequest("Invalid file name".to_string()));
        }

        let path = self.root_dir.join(restaurant_id.to_string()).join(file_name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(?path, "Image file already gone");
                Ok(())
            },
            Err(e) => Err(BookingError::StorageError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(max: u64) -> StorageService {
        StorageService {
            root_dir: std::env::temp_dir().join(format!("ct-test-{}", Uuid::new_v4())),
            public_base_url: "/uploads".to_string(),
            max_upload_bytes: max,
        }
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(StorageService::extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(StorageService::extension_for("image/png"), Some("png"));
        assert_eq!(StorageService::extension_for("image/webp"), Some("webp"));
        assert_eq!(StorageService::extension_for("image/gif"), None);
        assert_eq!(StorageService::extension_for("text/html"), None);
    }

    #[tokio::test]
    async fn test_store_and_delete_image() {
        let service = service(1024);
        let restaurant = Uuid::new_v4();

        let stored = service
            .store_image(restaurant, "image/png", b"fake png bytes")
            .await
            .expect("Should store");

        assert!(stored.file_name.ends_with(".png"));
        assert!(stored.url.starts_with("/uploads/"));
        assert_eq!(stored.byte_size, 14);

        let on_disk = service
            .root_dir()
            .join(restaurant.to_string())
            .join(&stored.file_name);
        assert!(on_disk.exists());

        service
            .delete_image(restaurant, &stored.file_name)
            .await
            .expect("Should delete");
        assert!(!on_disk.exists());

        // Deleting again is fine
        service
            .delete_image(restaurant, &stored.file_name)
            .await
            .expect("Should tolerate missing file");
    }

    #[tokio::test]
    async fn test_rejects_oversized_and_unsupported() {
        let service = service(8);
        let restaurant = Uuid::new_v4();

        let too_big = service
            .store_image(restaurant, "image/png", b"way more than eight")
            .await;
        assert!(matches!(too_big, Err(BookingError::UploadTooLarge { .. })));

        let bad_type = service.store_image(restaurant, "image/gif", b"gif").await;
        assert!(matches!(
            bad_type,
            Err(BookingError::UnsupportedMediaType(_))
        ));

        let empty = service.store_image(restaurant, "image/png", b"").await;
        assert!(matches!(empty, Err(BookingError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_rejects_path_traversal() {
        let service = service(1024);
        let result = service
            .delete_image(Uuid::new_v4(), "../../etc/passwd")
            .await;
        assert!(matches!(result, Err(BookingError::BadRequest(_))));
    }
}

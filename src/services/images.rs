use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

use crate::{constants::RECIPE_IMAGE_DIR, error::Error};

/// A decoded `data:image/<subtype>;base64,<payload>` string.
#[derive(Debug, PartialEq)]
pub struct DataUri {
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl TryFrom<&str> for DataUri {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let invalid = || Error::InvalidRequest(String::from("Invalid image; Expected a base64 data URI"));

        if !value.starts_with("data:image") {
            return Err(invalid());
        }
        let (format, payload) = value.split_once(";base64,").ok_or_else(invalid)?;
        let extension = format
            .rsplit('/')
            .next()
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '+'))
            .ok_or_else(invalid)?
            .to_ascii_lowercase();
        let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
        if bytes.is_empty() {
            return Err(invalid());
        }

        Ok(Self { extension, bytes })
    }
}

/// Writes uploaded recipe images below the media root.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Decodes and stores the image, returning its path relative to the media root.
    pub async fn save_data_uri(&self, data: &str) -> Result<String, Error> {
        let image = DataUri::try_from(data)?;
        let relative = format!("{RECIPE_IMAGE_DIR}/{}.{}", Uuid::new_v4(), image.extension);

        let directory = self.root.join(RECIPE_IMAGE_DIR);
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| Error::Internal(format!("Could not create media directory: {e}")))?;
        tokio::fs::write(self.root.join(&relative), &image.bytes)
            .await
            .map_err(|e| Error::Internal(format!("Could not store image: {e}")))?;

        log::trace!("> Stored image {relative} ({} bytes)", image.bytes.len());
        Ok(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::PIXEL;

    #[test]
    fn extension_comes_from_mime_subtype() {
        let image = DataUri::try_from(PIXEL).unwrap();

        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn rejects_non_image_payloads() {
        assert!(DataUri::try_from("hello").is_err());
        assert!(DataUri::try_from("data:image/png,abc").is_err());
        assert!(DataUri::try_from("data:image/png;base64,***").is_err());
        assert!(DataUri::try_from("data:text/plain;base64,aGk=").is_err());
    }

    #[tokio::test]
    async fn stores_file_under_media_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let path = store.save_data_uri(PIXEL).await.unwrap();

        assert!(path.starts_with(RECIPE_IMAGE_DIR));
        assert!(path.ends_with(".png"));
        let written = std::fs::read(dir.path().join(&path)).unwrap();
        assert_eq!(written, DataUri::try_from(PIXEL).unwrap().bytes);
    }
}

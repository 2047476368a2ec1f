//! Local blob references
//!
//! Bytes fetched through the binary-blob endpoint are written once to a
//! temporary file so embeds and external opens have a location for them. The
//! file is removed together with the blob.

use std::io::Write;
use std::sync::Arc;

use reqwest::Url;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Fetched document bytes with their spilled file location
pub struct LocalBlob {
    id: Uuid,
    file_name: String,
    bytes: Arc<Vec<u8>>,
    file: NamedTempFile,
    location: String,
}

impl LocalBlob {
    /// Write `bytes` to a temporary file.
    ///
    /// Blocking; async callers go through [`LocalBlob::spill_blocking`].
    pub fn spill(bytes: Arc<Vec<u8>>, file_name: impl Into<String>) -> std::io::Result<Self> {
        let id = Uuid::new_v4();
        let file_name = file_name.into();

        let mut file = tempfile::Builder::new()
            .prefix(&format!("pdfview-{}-", id.simple()))
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;

        let location = Url::from_file_path(file.path())
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "temporary path is not absolute",
                )
            })?
            .to_string();

        tracing::debug!(
            blob = %id,
            name = %file_name,
            bytes = bytes.len(),
            path = %file.path().display(),
            "Spilled blob to temporary file"
        );

        Ok(Self {
            id,
            file_name,
            bytes,
            file,
            location,
        })
    }

    /// [`LocalBlob::spill`] on the blocking pool
    pub async fn spill_blocking(
        bytes: Arc<Vec<u8>>,
        file_name: String,
    ) -> std::io::Result<Self> {
        tokio::task::spawn_blocking(move || Self::spill(bytes, file_name))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> Arc<Vec<u8>> {
        self.bytes.clone()
    }

    /// `file://` URL of the spilled copy
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl std::fmt::Debug for LocalBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBlob")
            .field("id", &self.id)
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .field("path", &self.file.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spills_eagerly_and_cleans_up() {
        let blob = LocalBlob::spill_blocking(Arc::new(b"%PDF-1.4 test".to_vec()), "a.pdf".into())
            .await
            .unwrap();
        assert!(blob.location().starts_with("file://"));

        let path = Url::parse(blob.location()).unwrap().to_file_path().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 test");
        assert_eq!(blob.len(), 13);

        drop(blob);
        assert!(!path.exists());
    }
}

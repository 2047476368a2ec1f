//! HTTP client for the directory/file collaborator API

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

use crate::credentials::CredentialProvider;

use super::error::DirectoryError;
use super::types::{DirectoryListing, FileEntry, UploadRequest};
use super::DirectoryApi;

/// reqwest-backed directory client
#[derive(Clone)]
pub struct HttpDirectoryClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpDirectoryClient {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(
        response: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, DirectoryError> {
        let status = response.status();
        match status {
            s if s.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(DirectoryError::Unauthorized),
            StatusCode::NOT_FOUND => Err(DirectoryError::NotFound(what.to_string())),
            _ => {
                let message = response.text().await.unwrap_or_default();
                Err(DirectoryError::Http {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectoryClient {
    async fn get_listing(&self, slug: &str) -> Result<DirectoryListing, DirectoryError> {
        let url = self.url(&format!("/directories/{}/", urlencoding::encode(slug)));
        tracing::debug!(slug = %slug, url = %url, "Fetching directory listing");

        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = Self::check(response, slug).await?;
        Ok(response.json().await?)
    }

    async fn upload_file(
        &self,
        slug: &str,
        upload: UploadRequest,
    ) -> Result<FileEntry, DirectoryError> {
        let mime = mime_guess::from_path(&upload.file_name).first_or_octet_stream();
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name.clone())
            .mime_str(mime.essence_str())?;

        let form = Form::new()
            .part("file", part)
            .text("description", upload.description.unwrap_or_default())
            .text("directory_slug", slug.to_string());

        let url = self.url("/files/upload/");
        tracing::info!(slug = %slug, file = %upload.file_name, "Uploading file");

        let response = self
            .authorized(self.client.post(&url))
            .query(&[("directory_slug", slug)])
            .multipart(form)
            .send()
            .await?;
        let response = Self::check(response, slug).await?;
        Ok(response.json().await?)
    }

    async fn delete_file(&self, id: &str) -> Result<(), DirectoryError> {
        let url = self.url(&format!("/files/{}/", urlencoding::encode(id)));
        tracing::info!(id = %id, "Deleting file");

        let response = self.authorized(self.client.delete(&url)).send().await?;
        Self::check(response, id).await?;
        Ok(())
    }
}

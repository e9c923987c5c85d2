//! Thin client for the Google Drive v3 REST API.
//!
//! Listing and content download only; authentication is a caller-supplied
//! OAuth bearer token (kept in the secrets overlay as
//! `google_drive.access_token`).

use reqwest::Client;

use super::types::{DriveFile, DriveFileList};
use crate::core::errors::ApiError;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,size,webViewLink)";
const PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct DriveClient {
    client: Client,
    base_url: String,
}

impl DriveClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// List the files under `folder_id`, descending into subfolders when
    /// `recursive` is set. Folders themselves are not returned.
    pub async fn list_folder(
        &self,
        access_token: &str,
        folder_id: &str,
        recursive: bool,
    ) -> Result<Vec<DriveFile>, ApiError> {
        let mut files = Vec::new();
        let mut pending = vec![folder_id.to_string()];

        while let Some(current) = pending.pop() {
            let mut page_token: Option<String> = None;

            loop {
                let page = self.list_page(access_token, &current, page_token.as_deref()).await?;

                for file in page.files {
                    if file.is_folder() {
                        if recursive {
                            pending.push(file.id.clone());
                        }
                        continue;
                    }
                    files.push(file);
                }

                match page.next_page_token {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }
        }

        Ok(files)
    }

    async fn list_page(
        &self,
        access_token: &str,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<DriveFileList, ApiError> {
        let query = format!("'{}' in parents and trashed = false", folder_id);
        let mut url = format!(
            "{}/files?q={}&fields={}&pageSize={}",
            self.base_url,
            urlencoding::encode(&query),
            urlencoding::encode(LIST_FIELDS),
            PAGE_SIZE
        );
        if let Some(token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(&urlencoding::encode(token));
        }

        let res = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Drive list failed ({}): {}",
                status, body
            )));
        }

        res.json::<DriveFileList>().await.map_err(ApiError::internal)
    }

    /// Fetch the plain-text content of a file, or `None` when the file has no
    /// text rendition worth indexing (images, archives, ...).
    pub async fn fetch_text(
        &self,
        access_token: &str,
        file: &DriveFile,
    ) -> Result<Option<String>, ApiError> {
        let url = match export_mime_type(&file.mime_type) {
            Some(export_mime) => format!(
                "{}/files/{}/export?mimeType={}",
                self.base_url,
                urlencoding::encode(&file.id),
                urlencoding::encode(export_mime)
            ),
            None if is_downloadable_text(&file.mime_type) => format!(
                "{}/files/{}?alt=media",
                self.base_url,
                urlencoding::encode(&file.id)
            ),
            None => return Ok(None),
        };

        let res = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Drive download of {} failed ({}): {}",
                file.id, status, body
            )));
        }

        let text = res.text().await.map_err(ApiError::internal)?;
        Ok(Some(text))
    }
}

impl Default for DriveClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Google-native formats have to go through the export endpoint.
fn export_mime_type(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "application/vnd.google-apps.document" => Some("text/plain"),
        "application/vnd.google-apps.spreadsheet" => Some("text/csv"),
        "application/vnd.google-apps.presentation" => Some("text/plain"),
        _ => None,
    }
}

fn is_downloadable_text(mime_type: &str) -> bool {
    mime_type.starts_with("text/")
        || mime_type == "application/json"
        || mime_type == "application/xml"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::types::FOLDER_MIME_TYPE;

    #[test]
    fn export_mime_type_covers_google_native_formats() {
        assert_eq!(
            export_mime_type("application/vnd.google-apps.document"),
            Some("text/plain")
        );
        assert_eq!(
            export_mime_type("application/vnd.google-apps.spreadsheet"),
            Some("text/csv")
        );
        assert_eq!(export_mime_type("text/plain"), None);
        assert_eq!(export_mime_type(FOLDER_MIME_TYPE), None);
    }

    #[test]
    fn downloadable_text_covers_plain_formats_only() {
        assert!(is_downloadable_text("text/markdown"));
        assert!(is_downloadable_text("application/json"));
        assert!(!is_downloadable_text("application/pdf"));
        assert!(!is_downloadable_text("image/jpeg"));
    }
}

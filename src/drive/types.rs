use serde::{Deserialize, Serialize};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A file as returned by the Drive v3 `files.list` endpoint.
///
/// Only `id` is guaranteed; everything else is best-effort metadata used for
/// display and for the per-type index statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "mimeType")]
    pub mime_type: String,
    /// Drive reports sizes as decimal strings; Google-native docs have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, rename = "webViewLink", skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Short label used for aggregate statistics ("document", "pdf", ...).
    pub fn type_label(&self) -> &'static str {
        file_type_label(&self.mime_type)
    }

    /// Browser URL for the file, preferring the link Drive reported.
    pub fn view_url(&self) -> String {
        self.web_view_link
            .clone()
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", self.id))
    }
}

pub fn file_type_label(mime_type: &str) -> &'static str {
    match mime_type {
        "application/vnd.google-apps.document" => "document",
        "application/vnd.google-apps.spreadsheet" => "spreadsheet",
        "application/vnd.google-apps.presentation" => "presentation",
        FOLDER_MIME_TYPE => "folder",
        "application/pdf" => "pdf",
        "application/json" => "text",
        other if other.starts_with("text/") => "text",
        _ => "other",
    }
}

#[derive(Debug, Deserialize)]
pub struct DriveFileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default, rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_label_maps_common_mime_types() {
        assert_eq!(file_type_label("application/vnd.google-apps.document"), "document");
        assert_eq!(file_type_label("application/pdf"), "pdf");
        assert_eq!(file_type_label("text/markdown"), "text");
        assert_eq!(file_type_label("image/png"), "other");
    }

    #[test]
    fn view_url_falls_back_to_drive_link() {
        let file = DriveFile {
            id: "abc123".to_string(),
            name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
            size: None,
            web_view_link: None,
        };

        assert_eq!(file.view_url(), "https://drive.google.com/file/d/abc123/view");
    }

    #[test]
    fn deserializes_with_only_an_id() {
        let file: DriveFile = serde_json::from_value(serde_json::json!({ "id": "a" })).unwrap();

        assert_eq!(file.id, "a");
        assert!(file.name.is_empty());
        assert!(!file.is_folder());
    }
}

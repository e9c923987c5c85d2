use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::drive::DriveFile;

/// Aggregate statistics over the indexed files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    #[serde(default)]
    pub total_files: u64,
    /// Count per file-type label ("document", "pdf", ...).
    #[serde(default)]
    pub file_types: BTreeMap<String, u64>,
}

impl IndexStats {
    pub fn from_files(files: &[DriveFile]) -> Self {
        let mut file_types: BTreeMap<String, u64> = BTreeMap::new();
        for file in files {
            *file_types.entry(file.type_label().to_string()).or_default() += 1;
        }
        Self {
            total_files: files.len() as u64,
            file_types,
        }
    }
}

/// State of the Google Drive integration panel for one session.
///
/// Replaced wholesale on every dispatched action; consumers always observe a
/// complete snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelState {
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub indexing: bool,
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub folder_id: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub stats: IndexStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, mime: &str) -> DriveFile {
        DriveFile {
            id: id.to_string(),
            name: format!("{id}.dat"),
            mime_type: mime.to_string(),
            size: None,
            web_view_link: None,
        }
    }

    #[test]
    fn stats_count_files_per_type_label() {
        let files = vec![
            file("a", "application/vnd.google-apps.document"),
            file("b", "application/vnd.google-apps.document"),
            file("c", "application/pdf"),
            file("d", "text/plain"),
        ];

        let stats = IndexStats::from_files(&files);

        assert_eq!(stats.total_files, 4);
        assert_eq!(stats.file_types.get("document"), Some(&2));
        assert_eq!(stats.file_types.get("pdf"), Some(&1));
        assert_eq!(stats.file_types.get("text"), Some(&1));
    }

    #[test]
    fn initial_state_has_fixed_values() {
        let state = PanelState::default();

        assert!(!state.loading);
        assert!(!state.indexing);
        assert!(state.files.is_empty());
        assert!(state.folder_id.is_empty());
        assert!(state.error.is_none());
        assert!(state.success.is_none());
        assert_eq!(state.stats, IndexStats::default());
    }
}

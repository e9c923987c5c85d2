use serde::{Deserialize, Serialize};

use super::state::IndexStats;
use crate::drive::DriveFile;

/// The panel's mutation vocabulary.
///
/// Actions also travel as tagged JSON (`{"type": "set_loading", ...}`) from
/// the frontend; `PanelStore::dispatch_value` is the wire boundary, where an
/// unrecognized tag is treated as a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelAction {
    SetLoading { value: bool },
    SetIndexing { value: bool },
    SetFiles { files: Vec<DriveFile> },
    SetFolderId { folder_id: String },
    SetError { message: Option<String> },
    SetSuccess { message: Option<String> },
    SetStats { stats: IndexStats },
    RemoveFile { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_tagged_wire_actions() {
        let action: PanelAction =
            serde_json::from_value(json!({ "type": "set_loading", "value": true })).unwrap();
        assert_eq!(action, PanelAction::SetLoading { value: true });

        let action: PanelAction =
            serde_json::from_value(json!({ "type": "remove_file", "id": "f1" })).unwrap();
        assert_eq!(action, PanelAction::RemoveFile { id: "f1".to_string() });

        let action: PanelAction = serde_json::from_value(json!({
            "type": "set_files",
            "files": [{ "id": "a" }, { "id": "b" }]
        }))
        .unwrap();
        match action {
            PanelAction::SetFiles { files } => {
                assert_eq!(files.len(), 2);
                assert_eq!(files[0].id, "a");
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_fails_to_decode() {
        let result =
            serde_json::from_value::<PanelAction>(json!({ "type": "set_velocity", "value": 9 }));
        assert!(result.is_err());
    }
}

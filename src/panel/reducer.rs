use super::actions::PanelAction;
use super::state::PanelState;

/// Pure transition function for the panel state.
///
/// Every variant except `RemoveFile` replaces exactly one field; `RemoveFile`
/// keeps all records whose id differs, preserving relative order. The input
/// state is never mutated.
pub fn reduce(state: &PanelState, action: &PanelAction) -> PanelState {
    match action {
        PanelAction::SetLoading { value } => PanelState {
            loading: *value,
            ..state.clone()
        },
        PanelAction::SetIndexing { value } => PanelState {
            indexing: *value,
            ..state.clone()
        },
        PanelAction::SetFiles { files } => PanelState {
            files: files.clone(),
            ..state.clone()
        },
        PanelAction::SetFolderId { folder_id } => PanelState {
            folder_id: folder_id.clone(),
            ..state.clone()
        },
        PanelAction::SetError { message } => PanelState {
            error: message.clone(),
            ..state.clone()
        },
        PanelAction::SetSuccess { message } => PanelState {
            success: message.clone(),
            ..state.clone()
        },
        PanelAction::SetStats { stats } => PanelState {
            stats: stats.clone(),
            ..state.clone()
        },
        PanelAction::RemoveFile { id } => PanelState {
            files: state
                .files
                .iter()
                .filter(|file| file.id != *id)
                .cloned()
                .collect(),
            ..state.clone()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::DriveFile;
    use crate::panel::state::IndexStats;

    fn file(id: &str) -> DriveFile {
        DriveFile {
            id: id.to_string(),
            name: String::new(),
            mime_type: String::new(),
            size: None,
            web_view_link: None,
        }
    }

    fn populated_state() -> PanelState {
        PanelState {
            loading: false,
            indexing: true,
            files: vec![file("a"), file("b"), file("c")],
            folder_id: "folder-1".to_string(),
            error: None,
            success: Some("indexed".to_string()),
            stats: IndexStats {
                total_files: 3,
                file_types: [("text".to_string(), 3)].into_iter().collect(),
            },
        }
    }

    #[test]
    fn reduce_is_deterministic() {
        let state = populated_state();
        let action = PanelAction::SetFolderId {
            folder_id: "folder-2".to_string(),
        };

        assert_eq!(reduce(&state, &action), reduce(&state, &action));
    }

    #[test]
    fn each_setter_replaces_exactly_one_field() {
        let state = populated_state();

        let next = reduce(&state, &PanelAction::SetLoading { value: true });
        assert!(next.loading);
        assert_eq!(
            PanelState {
                loading: false,
                ..next
            },
            state
        );

        let next = reduce(
            &state,
            &PanelAction::SetError {
                message: Some("boom".to_string()),
            },
        );
        assert_eq!(next.error.as_deref(), Some("boom"));
        assert_eq!(PanelState { error: None, ..next }, state);
    }

    #[test]
    fn loading_toggle_round_trips() {
        let state = populated_state();

        let toggled = reduce(&state, &PanelAction::SetLoading { value: true });
        let restored = reduce(&toggled, &PanelAction::SetLoading { value: false });

        assert_eq!(restored, state);
    }

    #[test]
    fn remove_file_with_absent_id_is_a_no_op() {
        let state = populated_state();

        let next = reduce(
            &state,
            &PanelAction::RemoveFile {
                id: "missing".to_string(),
            },
        );

        assert_eq!(next, state);
    }

    #[test]
    fn remove_file_removes_only_the_match_and_keeps_order() {
        let state = populated_state();

        let next = reduce(
            &state,
            &PanelAction::RemoveFile {
                id: "b".to_string(),
            },
        );

        let ids: Vec<&str> = next.files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn set_files_then_remove_first() {
        let state = PanelState::default();
        assert!(state.files.is_empty());

        let state = reduce(
            &state,
            &PanelAction::SetFiles {
                files: vec![file("a"), file("b")],
            },
        );
        let state = reduce(
            &state,
            &PanelAction::RemoveFile {
                id: "a".to_string(),
            },
        );

        let ids: Vec<&str> = state.files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }
}

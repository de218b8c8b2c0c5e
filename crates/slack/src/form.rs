use claimdesk_core::{MissingField, Submission, ValidationError};

use crate::blocks::{
    ATTACHMENTS_ACTION, ATTACHMENTS_BLOCK, NOTES_ACTION, NOTES_BLOCK, ROW_NUMBER_ACTION,
    ROW_NUMBER_BLOCK, STATUS_ACTION, STATUS_BLOCK,
};
use crate::payloads::ViewState;

/// Flattens submitted modal state into a [`Submission`].
///
/// Total: any subset of blocks may be missing. Only an empty row number is
/// rejected; status is not checked against the known values and the
/// attachment list is taken as delivered, minus entries without an id.
pub fn extract_submission(user_id: &str, state: &ViewState) -> Result<Submission, ValidationError> {
    let row_number = text_value(state, ROW_NUMBER_BLOCK, ROW_NUMBER_ACTION).trim().to_owned();
    if row_number.is_empty() {
        return Err(ValidationError::new(vec![MissingField::RowNumber]));
    }

    let status = state
        .element(STATUS_BLOCK, STATUS_ACTION)
        .and_then(|element| element.selected_option.as_ref())
        .and_then(|option| option.value.clone())
        .unwrap_or_default();

    let attachment_ids = state
        .element(ATTACHMENTS_BLOCK, ATTACHMENTS_ACTION)
        .and_then(|element| element.files.as_ref())
        .map(|files| {
            files
                .iter()
                .filter_map(|file| file.id.as_deref())
                .filter(|id| !id.trim().is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Ok(Submission {
        user_id: user_id.to_owned(),
        row_number,
        status,
        notes: text_value(state, NOTES_BLOCK, NOTES_ACTION),
        attachment_ids,
    })
}

fn text_value(state: &ViewState, block_id: &str, action_id: &str) -> String {
    state.element(block_id, action_id).and_then(|element| element.value.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use claimdesk_core::MissingField;

    use super::extract_submission;
    use crate::payloads::{ElementValue, FileDescriptor, SelectedOption, ViewState};

    fn text(value: &str) -> ElementValue {
        ElementValue {
            element_type: "plain_text_input".to_owned(),
            value: Some(value.to_owned()),
            ..ElementValue::default()
        }
    }

    fn select(value: &str) -> ElementValue {
        ElementValue {
            element_type: "static_select".to_owned(),
            selected_option: Some(SelectedOption { value: Some(value.to_owned()) }),
            ..ElementValue::default()
        }
    }

    fn files(ids: &[Option<&str>]) -> ElementValue {
        ElementValue {
            element_type: "file_input".to_owned(),
            files: Some(
                ids.iter()
                    .map(|id| FileDescriptor { id: id.map(str::to_owned), ..FileDescriptor::default() })
                    .collect(),
            ),
            ..ElementValue::default()
        }
    }

    fn state(entries: Vec<(&str, &str, ElementValue)>) -> ViewState {
        let mut values: HashMap<String, HashMap<String, ElementValue>> = HashMap::new();
        for (block, action, element) in entries {
            values.entry(block.to_owned()).or_default().insert(action.to_owned(), element);
        }
        ViewState { values }
    }

    #[test]
    fn extracts_all_fields() {
        let state = state(vec![
            ("row_number_block", "row_number", text("  42 ")),
            ("status_block", "status", select("Unsellable")),
            ("notes_block", "notes", text("cracked case")),
            ("attachments_block", "attachments", files(&[Some("F1"), Some("F2")])),
        ]);

        let submission = extract_submission("U1", &state).expect("valid submission");

        assert_eq!(submission.user_id, "U1");
        assert_eq!(submission.row_number, "42");
        assert_eq!(submission.status, "Unsellable");
        assert_eq!(submission.notes, "cracked case");
        assert_eq!(submission.attachment_ids, vec!["F1".to_owned(), "F2".to_owned()]);
    }

    #[test]
    fn whitespace_row_number_is_rejected() {
        let state = state(vec![
            ("row_number_block", "row_number", text("   ")),
            ("status_block", "status", select("Unsellable")),
        ]);

        let error = extract_submission("U1", &state).expect_err("must reject");
        assert_eq!(error.missing, vec![MissingField::RowNumber]);
    }

    #[test]
    fn empty_state_is_rejected_without_panicking() {
        let error = extract_submission("U1", &ViewState::default()).expect_err("must reject");
        assert_eq!(error.missing, vec![MissingField::RowNumber]);
    }

    #[test]
    fn optional_blocks_default_to_empty() {
        let state = state(vec![("row_number_block", "row_number", text("7"))]);

        let submission = extract_submission("U1", &state).expect("valid");

        assert_eq!(submission.status, "");
        assert_eq!(submission.notes, "");
        assert!(submission.attachment_ids.is_empty());
    }

    #[test]
    fn files_without_ids_are_dropped_and_no_cap_is_applied() {
        let state = state(vec![
            ("row_number_block", "row_number", text("9")),
            (
                "attachments_block",
                "attachments",
                files(&[Some("a"), None, Some("b"), Some(""), Some("c"), Some("d"), Some("e"), Some("f")]),
            ),
        ]);

        let submission = extract_submission("U1", &state).expect("valid");

        assert_eq!(submission.attachment_ids, vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn unknown_status_passes_through() {
        let state = state(vec![
            ("row_number_block", "row_number", text("3")),
            ("status_block", "status", select("Lost")),
        ]);

        assert_eq!(extract_submission("U1", &state).expect("valid").status, "Lost");
    }
}

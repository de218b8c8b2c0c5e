use crate::errors::ValidationError;

pub fn validation_rejected(error: &ValidationError) -> String {
    let reasons =
        error.missing.iter().map(|field| field.user_message()).collect::<Vec<_>>().join(" ");
    format!("Your claim was not recorded. {reasons}")
}

pub fn submission_failed(row_number: &str) -> String {
    format!("Something went wrong while recording the claim for row {row_number}. Please try again.")
}

pub fn submission_completed(row_number: &str, status: &str, attachment_count: usize) -> String {
    let status = if status.trim().is_empty() { "(none)" } else { status };
    let noun = if attachment_count == 1 { "attachment" } else { "attachments" };
    format!("Row {row_number} updated. Status: {status}. {attachment_count} {noun} uploaded.")
}

#[cfg(test)]
mod tests {
    use super::{submission_completed, submission_failed, validation_rejected};
    use crate::errors::{MissingField, ValidationError};

    #[test]
    fn validation_message_names_the_missing_field() {
        let text = validation_rejected(&ValidationError::new(vec![MissingField::RowNumber]));
        assert_eq!(text, "Your claim was not recorded. Row number is required.");
    }

    #[test]
    fn failure_message_echoes_row_without_detail() {
        let text = submission_failed("42");
        assert!(text.contains("row 42"));
        assert!(!text.to_ascii_lowercase().contains("error"));
    }

    #[test]
    fn success_message_summarizes_row_status_and_count() {
        assert_eq!(
            submission_completed("42", "Unsellable", 3),
            "Row 42 updated. Status: Unsellable. 3 attachments uploaded."
        );
        assert_eq!(
            submission_completed("7", "", 1),
            "Row 7 updated. Status: (none). 1 attachment uploaded."
        );
    }
}

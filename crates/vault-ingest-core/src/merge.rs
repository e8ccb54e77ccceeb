//! Text merge rules for appending to a shared note file.

/// Build the full new content of a note file from its current text (if the
/// file exists) and the text to append.
///
/// A separating newline is inserted when the existing text does not end with
/// one, and the result always ends with exactly one added trailing newline
/// when `new_text` lacks it.
pub fn merge_append(existing: Option<&str>, new_text: &str) -> String {
    let mut content = match existing {
        Some(current) => {
            let mut current = current.to_string();
            if !current.is_empty() && !current.ends_with('\n') {
                current.push('\n');
            }
            current.push_str(new_text);
            current
        }
        None => new_text.to_string(),
    };
    if !content.ends_with('\n') {
        content.push('\n');
    }
    content
}

/// Append a newline unless the text already ends with one.
pub fn ensure_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_file_gets_new_text_and_terminator() {
        assert_eq!(merge_append(None, "entry"), "entry\n");
    }

    #[test]
    fn missing_terminator_is_inserted_between() {
        assert_eq!(merge_append(Some("line1"), "line2"), "line1\nline2\n");
    }

    #[test]
    fn existing_terminators_are_not_duplicated() {
        assert_eq!(merge_append(Some("line1\n"), "line2\n"), "line1\nline2\n");
    }

    #[test]
    fn empty_existing_file_adds_no_separator() {
        assert_eq!(merge_append(Some(""), "line2"), "line2\n");
    }

    #[test]
    fn trailing_newline_helper() {
        assert_eq!(ensure_trailing_newline("a".to_string()), "a\n");
        assert_eq!(ensure_trailing_newline("a\n".to_string()), "a\n");
        assert_eq!(ensure_trailing_newline(String::new()), "\n");
    }
}

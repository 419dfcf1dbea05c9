/// Utility functions for string processing in SQL text

/// Check if a byte offset in SQL is inside quotes (handles both single and double quotes)
pub fn is_in_quotes(sql: &str, pos: usize) -> bool {
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escaped = false;

    for (idx, ch) in sql.char_indices() {
        if idx > pos {
            break;
        }
        if escaped {
            escaped = false;
            continue;
        }

        match ch {
            '\\' => escaped = true,
            '\'' => {
                if !in_double_quote {
                    in_single_quote = !in_single_quote;
                }
            }
            '"' => {
                if !in_single_quote {
                    in_double_quote = !in_double_quote;
                }
            }
            _ => {}
        }
    }

    in_single_quote || in_double_quote
}

/// Render a string as a quoted literal for console output.
/// Single quotes are used unless the text itself contains one.
pub fn quote_for_display(text: &str) -> String {
    if text.contains('\'') && !text.contains('"') {
        format!("\"{text}\"")
    } else {
        format!("'{}'", text.replace('\'', "\\'"))
    }
}

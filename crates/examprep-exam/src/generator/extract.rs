//! Locate a JSON array of objects inside free-form model output.
//!
//! Models often wrap the requested array in prose or code fences. Extraction
//! only finds the candidate text; parsing it is a separate step so the two
//! kinds of failure can be told apart.

use regex::Regex;
use std::sync::LazyLock;

/// Start of an array whose first element is an object
static ARRAY_OF_OBJECTS_START: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"\[\s*\{") {
    Ok(regex) => regex,
    Err(err) => panic!("Array start regex is invalid: {err}"),
});

/// Return the first balanced `[ ... ]` whose first element is an object.
///
/// Brackets inside JSON strings are ignored when balancing.
pub fn extract_json_array(text: &str) -> Option<&str> {
    ARRAY_OF_OBJECTS_START
        .find_iter(text)
        .find_map(|candidate| {
            let tail = &text[candidate.start()..];
            balanced_array_len(tail).map(|len| &tail[..len])
        })
}

/// Byte length of the array opening at the start of `text`, if it closes.
fn balanced_array_len(text: &str) -> Option<usize> {
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }

    None
}

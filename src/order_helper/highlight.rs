//! Syntax highlight overlay for the filter script input.
//!
//! The overlay sits behind a transparent text area and must line up with it
//! character for character, so the highlighter only classifies text and never
//! drops or adds any, with one exception: a trailing newline gets a space
//! appended so the overlay keeps the same height as the input.

use crate::view::StyledSpan;

/// Span class of `{{...}}` macros.
pub const MACRO: &str = "hljs-template-variable";
/// Span class of `/command` names.
pub const COMMAND: &str = "hljs-keyword";
/// Span class of `|` pipes.
pub const PIPE: &str = "hljs-operator";
/// Span class of quoted strings.
pub const STRING: &str = "hljs-string";
/// Span class of numbers.
pub const NUMBER: &str = "hljs-number";
/// Span class of `//` comments.
pub const COMMENT: &str = "hljs-comment";

/// Splits `script` into styled spans.
///
/// # Example
///
/// ```rust
/// use lorebook_drawer::order_helper::highlight::{highlight, MACRO};
///
/// let spans = highlight("/echo {{var::entry}}");
/// assert_eq!(spans.last().unwrap().class.as_deref(), Some(MACRO));
/// ```
#[must_use]
pub fn highlight(script: &str) -> Vec<StyledSpan> {
    let text = if script.ends_with('\n') {
        format!("{script} ")
    } else {
        script.to_string()
    };

    let mut spans: Vec<StyledSpan> = Vec::new();
    let mut rest = text.as_str();
    let mut command_allowed = true;

    while let Some(c) = rest.chars().next() {
        let (class, len) = if rest.starts_with("{{") {
            let len = rest.find("}}").map_or(rest.len(), |end| end + 2);
            (Some(MACRO), len)
        } else if rest.starts_with("//") && command_allowed {
            (Some(COMMENT), rest.find('\n').unwrap_or(rest.len()))
        } else if c == '/' && command_allowed {
            let len = 1 + rest[1..]
                .find(|ch: char| ch.is_whitespace() || ch == '|')
                .unwrap_or(rest.len() - 1);
            (Some(COMMAND), len)
        } else if c == '|' {
            (Some(PIPE), 1)
        } else if c == '"' {
            let len = rest[1..].find('"').map_or(rest.len(), |end| end + 2);
            (Some(STRING), len)
        } else if c.is_ascii_digit() && spans.last().map_or(true, |s| s.text.ends_with(char::is_whitespace)) {
            let len = rest
                .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
                .unwrap_or(rest.len());
            (Some(NUMBER), len)
        } else {
            (None, c.len_utf8())
        };

        let (token, tail) = rest.split_at(len);
        match (class, spans.last_mut()) {
            (None, Some(last)) if last.class.is_none() => last.text.push_str(token),
            _ => spans.push(StyledSpan::new(class, token)),
        }

        command_allowed = match class {
            Some(PIPE) => true,
            None if token.chars().all(char::is_whitespace) => command_allowed || token.contains('\n'),
            _ => false,
        };
        rest = tail;
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(spans: &[StyledSpan]) -> Vec<(Option<&str>, &str)> {
        spans.iter().map(|s| (s.class.as_deref(), s.text.as_str())).collect()
    }

    #[test]
    fn classifies_pipeline() {
        let spans = highlight("/echo \"hi\" | /setvar key=x 12");
        assert_eq!(
            classes(&spans),
            vec![
                (Some(COMMAND), "/echo"),
                (None, " "),
                (Some(STRING), "\"hi\""),
                (None, " "),
                (Some(PIPE), "|"),
                (None, " "),
                (Some(COMMAND), "/setvar"),
                (None, " key=x "),
                (Some(NUMBER), "12"),
            ]
        );
    }

    #[test]
    fn keeps_text_intact() {
        let script = "{{var::entry}} and {{unclosed";
        let joined: String = highlight(script).into_iter().map(|s| s.text).collect();
        assert_eq!(joined, script);
    }

    #[test]
    fn trailing_newline_gets_a_space() {
        let joined: String = highlight("true\n").into_iter().map(|s| s.text).collect();
        assert_eq!(joined, "true\n ");
    }
}

//! Line framing for the key-value logs
//!
//! A fact line is `key:value`, a conversation line is `role: message`. The
//! delimiter is the first colon on the line, so values may contain colons but
//! keys may not. With [`Framing::Escaped`] the writer escapes the characters
//! that would break that rule:
//!
//! | char | escaped |
//! |------|---------|
//! | `\`  | `\\`    |
//! | LF   | `\n`    |
//! | CR   | `\r`    |
//! | `:` (key only) | `\:` |
//!
//! Lines without backslashes decode the same in both modes, so logs written
//! by the firmware stay readable.

use super::config::Framing;
use crate::error::{MemoryError, MemoryResult};

/// Encode a fact as a full line including the terminator
pub(crate) fn encode_record(key: &str, value: &str, framing: Framing) -> MemoryResult<String> {
    encode(key, value, ":", framing)
}

/// Encode a conversation turn as a full line including the terminator
pub(crate) fn encode_turn(role: &str, message: &str, framing: Framing) -> MemoryResult<String> {
    encode(role, message, ": ", framing)
}

/// Split a fact line into key and value
///
/// Returns `None` for lines with no delimiter.
pub(crate) fn decode_record(line: &str, framing: Framing) -> Option<(String, String)> {
    let line = line.strip_suffix('\r').unwrap_or(line);

    match framing {
        Framing::Raw => line
            .split_once(':')
            .map(|(key, value)| (key.to_string(), value.to_string())),
        Framing::Escaped => decode_escaped(line),
    }
}

/// Split a conversation line into role and message
pub(crate) fn decode_turn(line: &str, framing: Framing) -> Option<(String, String)> {
    decode_record(line, framing).map(|(role, message)| {
        let message = match message.strip_prefix(' ') {
            Some(rest) => rest.to_string(),
            None => message,
        };
        (role, message)
    })
}

fn encode(head: &str, tail: &str, delimiter: &str, framing: Framing) -> MemoryResult<String> {
    let line = match framing {
        Framing::Raw => {
            if head.contains(':') {
                return Err(MemoryError::invalid_record(format!(
                    "key '{}' contains the ':' delimiter",
                    head.escape_debug()
                )));
            }
            if has_line_break(head) || has_line_break(tail) {
                return Err(MemoryError::invalid_record(
                    "raw framing cannot store line breaks",
                ));
            }
            format!("{head}{delimiter}{tail}\n")
        }
        Framing::Escaped => format!("{}{delimiter}{}\n", escape(head, true), escape(tail, false)),
    };

    Ok(line)
}

fn has_line_break(field: &str) -> bool {
    field.contains('\n') || field.contains('\r')
}

fn escape(field: &str, escape_colon: bool) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' if escape_colon => out.push_str("\\:"),
            c => out.push(c),
        }
    }
    out
}

fn decode_escaped(line: &str) -> Option<(String, String)> {
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        let target = if in_value { &mut value } else { &mut key };
        match c {
            '\\' => match chars.next() {
                Some('\\') => target.push('\\'),
                Some('n') => target.push('\n'),
                Some('r') => target.push('\r'),
                Some(':') => target.push(':'),
                // Unknown escape: keep it verbatim
                Some(other) => {
                    target.push('\\');
                    target.push(other);
                }
                None => target.push('\\'),
            },
            ':' if !in_value => in_value = true,
            c => target.push(c),
        }
    }

    in_value.then_some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_matches_firmware_format() {
        let line = encode_record("name", "John", Framing::Raw).unwrap();
        assert_eq!(line, "name:John\n");

        let line = encode_turn("user", "My name is John", Framing::Raw).unwrap();
        assert_eq!(line, "user: My name is John\n");
    }

    #[test]
    fn test_value_may_contain_colons() {
        for framing in [Framing::Raw, Framing::Escaped] {
            let line = encode_record("alarm", "07:30:00", framing).unwrap();
            let (key, value) = decode_record(line.trim_end_matches('\n'), framing).unwrap();
            assert_eq!(key, "alarm");
            assert_eq!(value, "07:30:00");
        }
    }

    #[test]
    fn test_escaped_survives_hostile_input() {
        let key = "a:b\\c";
        let value = "line one\nline two\r\\n literal";

        let line = encode_record(key, value, Framing::Escaped).unwrap();
        assert_eq!(line.matches('\n').count(), 1);

        let (k, v) = decode_record(line.trim_end_matches('\n'), Framing::Escaped).unwrap();
        assert_eq!(k, key);
        assert_eq!(v, value);
    }

    #[test]
    fn test_raw_rejects_unframeable_input() {
        assert!(matches!(
            encode_record("a:b", "x", Framing::Raw),
            Err(MemoryError::InvalidRecord { .. })
        ));
        assert!(matches!(
            encode_record("a", "x\ny", Framing::Raw),
            Err(MemoryError::InvalidRecord { .. })
        ));
        assert!(matches!(
            encode_turn("bot", "x\ry", Framing::Raw),
            Err(MemoryError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_decode_tolerates_crlf_and_missing_delimiter() {
        assert_eq!(
            decode_record("name:John\r", Framing::Escaped),
            Some(("name".to_string(), "John".to_string()))
        );
        assert_eq!(decode_record("garbage", Framing::Escaped), None);
        assert_eq!(decode_record("garbage", Framing::Raw), None);
    }

    #[test]
    fn test_decode_turn_strips_one_space() {
        assert_eq!(
            decode_turn("bot:  indented", Framing::Escaped),
            Some(("bot".to_string(), " indented".to_string()))
        );
        assert_eq!(
            decode_turn("user:tight", Framing::Raw),
            Some(("user".to_string(), "tight".to_string()))
        );
    }

    #[test]
    fn test_unknown_escape_kept_verbatim() {
        assert_eq!(
            decode_record("path:C\\temp", Framing::Escaped),
            Some(("path".to_string(), "C\\temp".to_string()))
        );
    }
}

//! Outbound display text helpers
//!
//! The display's parser is easily upset: only printable ASCII is safe in a
//! quoted text assignment, and an embedded double quote ends the string
//! early. Everything written to a text field goes through
//! [`sanitize_text`] first.

use core::fmt::Write;

use heapless::String;

/// Maximum sanitized text length per field
pub const TEXT_MAX: usize = 48;

/// Maximum display command length (object name + quoted text)
pub const CMD_MAX: usize = 96;

/// Placeholder shown for absent values
pub const PLACEHOLDER: &str = "-";

/// Display command enabling result codes after boot
pub const CMD_BKCMD: &str = "bkcmd=3";

/// Display command requesting the current page id
pub const CMD_QUERY_PAGE: &str = "sendme";

/// Clamp text to what the display accepts: printable ASCII (others become
/// spaces), double quotes become single quotes, trimmed, never empty.
pub fn sanitize_text(raw: &str) -> String<TEXT_MAX> {
    let mut out = String::new();
    for ch in raw.chars() {
        let mapped = match ch {
            '"' => '\'',
            c if (' '..='~').contains(&c) => c,
            _ => ' ',
        };
        if mapped == ' ' && out.is_empty() {
            continue;
        }
        if out.push(mapped).is_err() {
            break;
        }
    }
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    if out.is_empty() {
        // Cannot fail on an empty string
        let _ = out.push_str(PLACEHOLDER);
    }
    out
}

/// Format a millisecond duration as `m:ss`, or `h:mm:ss` past an hour
pub fn format_duration_ms(ms: u32) -> String<12> {
    let total = ms / 1000;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut out = String::new();
    // Cannot fail: the longest rendering fits 12 bytes
    let _ = if hours > 0 {
        write!(out, "{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        write!(out, "{}:{:02}", minutes, seconds)
    };
    out
}

/// Build a text-field assignment: `obj.txt="value"`.
///
/// The value must already be sanitized; this only does the quoting.
pub fn set_text_command(obj: &str, value: &str) -> String<CMD_MAX> {
    let mut cmd = String::new();
    let _ = write!(cmd, "{}.txt=\"{}\"", obj, value);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_passthrough() {
        assert_eq!(sanitize_text("Steely Dan"), "Steely Dan");
    }

    #[test]
    fn test_sanitize_control_chars_become_spaces() {
        assert_eq!(sanitize_text("Hello\nWorld"), "Hello World");
    }

    #[test]
    fn test_sanitize_quotes_replaced() {
        assert_eq!(sanitize_text("Say \"Yes\""), "Say 'Yes'");
    }

    #[test]
    fn test_sanitize_empty_becomes_placeholder() {
        assert_eq!(sanitize_text(""), PLACEHOLDER);
        assert_eq!(sanitize_text("   "), PLACEHOLDER);
        assert_eq!(sanitize_text("\u{1F3B5}"), PLACEHOLDER);
    }

    #[test]
    fn test_sanitize_clamps_length() {
        let mut long = String::<128>::new();
        for _ in 0..100 {
            long.push('A').unwrap();
        }
        assert_eq!(sanitize_text(&long).len(), TEXT_MAX);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_ms(0), "0:00");
        assert_eq!(format_duration_ms(60_000), "1:00");
        assert_eq!(format_duration_ms(125_000), "2:05");
        assert_eq!(format_duration_ms(3_725_000), "1:02:05");
    }

    #[test]
    fn test_set_text_command() {
        assert_eq!(set_text_command("tTitle", "Aja"), "tTitle.txt=\"Aja\"");
    }
}

//! Request Parser (spec.md §4.1, §6.1): classifies one datagram as plain
//! text or an escape-prefixed control request, with CR/LF already
//! stripped by the caller.

pub const ESCAPE: u8 = 0x1B;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    PlainText(&'a [u8]),
    Control { code: u8, operand: &'a [u8] },
}

/// Strip a trailing `\r`, `\n`, or `\r\n` (in that tail order) from a
/// datagram. Does not touch interior bytes.
fn strip_trailing_crlf(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    if end > 0 && bytes[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && bytes[end - 1] == b'\r' {
        end -= 1;
    }
    &bytes[..end]
}

/// Classify one datagram. `bytes` should already be truncated to the
/// 256-byte receive limit by the caller (spec.md §6.1); this function only
/// strips CRLF and splits code/operand.
pub fn parse(bytes: &[u8]) -> Request<'_> {
    let trimmed = strip_trailing_crlf(bytes);

    if trimmed.first() == Some(&ESCAPE) {
        match trimmed.get(1) {
            Some(&code) => Request::Control {
                code,
                operand: &trimmed[2..],
            },
            // Lone ESC with no code byte: treat as an empty unknown
            // control request rather than panicking on the slice.
            None => Request::Control { code: 0, operand: &[] },
        }
    } else {
        Request::PlainText(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(parse(b"paris"), Request::PlainText(b"paris"));
    }

    #[test]
    fn strips_trailing_crlf() {
        assert_eq!(parse(b"paris\r\n"), Request::PlainText(b"paris"));
        assert_eq!(parse(b"paris\n"), Request::PlainText(b"paris"));
        assert_eq!(parse(b"paris\r"), Request::PlainText(b"paris"));
    }

    #[test]
    fn control_splits_code_and_operand() {
        assert_eq!(
            parse(b"\x1b240"),
            Request::Control { code: b'2', operand: b"40" }
        );
    }

    #[test]
    fn control_with_no_operand() {
        assert_eq!(parse(b"\x1b0"), Request::Control { code: b'0', operand: b"" });
    }

    #[test]
    fn lone_escape_is_handled_without_panic() {
        assert_eq!(parse(b"\x1b"), Request::Control { code: 0, operand: b"" });
    }

    #[test]
    fn reply_operand_is_arbitrary_bytes_not_a_decimal() {
        assert_eq!(
            parse(b"\x1bhack"),
            Request::Control { code: b'h', operand: b"ack" }
        );
    }
}

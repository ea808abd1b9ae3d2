//! Request line tokenizer.
//!
//! Requests are space separated tokens using sh-like quoting: double quotes
//! group words, and backslash escapes (`\n`, `\r`, `\t`, `\"`, `\\`, `\NNN`
//! octal, `\xHH` hex) decode to single bytes. Anything the lexer does not
//! understand is copied through literally, so tokenizing never fails.
//!
//! The scan is an explicit state machine over byte positions:
//!
//! ```text
//!   Unquoted ──"──▶ Quoted ──"──▶ Unquoted
//!      │              │
//!      └──\──▶ Escape ◀──\──┘   (returns to the state it came from)
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Unquoted,
    Quoted,
    /// Backslash seen; holds the state to resume after the escape.
    Escape { quoted: bool },
}

/// Read one token from the start of `input`.
///
/// Returns the decoded token and the unconsumed tail. Leading spaces are
/// skipped; the space that terminates the token is consumed and not part of
/// the tail.
pub fn read_token(input: &[u8]) -> (Vec<u8>, &[u8]) {
    let mut token = Vec::new();
    let mut state = ScanState::Unquoted;
    let mut i = skip_spaces(input);

    while i < input.len() {
        let byte = input[i];
        match state {
            ScanState::Unquoted | ScanState::Quoted => {
                let quoted = state == ScanState::Quoted;
                match byte {
                    b'"' => {
                        state = if quoted {
                            ScanState::Unquoted
                        } else {
                            ScanState::Quoted
                        };
                        i += 1;
                    }
                    b' ' if !quoted => return (token, &input[i + 1..]),
                    b'\\' => {
                        state = ScanState::Escape { quoted };
                        i += 1;
                    }
                    _ => {
                        token.push(byte);
                        i += 1;
                    }
                }
            }
            ScanState::Escape { quoted } => {
                i += decode_escape(&input[i..], &mut token);
                state = if quoted {
                    ScanState::Quoted
                } else {
                    ScanState::Unquoted
                };
            }
        }
    }

    // Lone backslash at end of input.
    if let ScanState::Escape { .. } = state {
        token.push(b'\\');
    }

    (token, &input[input.len()..])
}

/// Split a whole request line into decoded tokens.
///
/// Tokens that decode to invalid UTF-8 (via `\x` or octal escapes) are
/// converted lossily.
pub fn tokenize(line: impl AsRef<[u8]>) -> Vec<String> {
    let mut rest = line.as_ref();
    let mut tokens = Vec::new();

    loop {
        rest = &rest[skip_spaces(rest)..];
        if rest.is_empty() {
            break;
        }
        let (token, tail) = read_token(rest);
        tokens.push(String::from_utf8_lossy(&token).into_owned());
        rest = tail;
    }

    tokens
}

/// Quote arguments so that [`tokenize`] on the result yields them back.
pub fn quote_args<S: AsRef<str>>(args: &[S]) -> String {
    let mut out = String::new();
    for (n, arg) in args.iter().enumerate() {
        if n > 0 {
            out.push(' ');
        }
        out.push('"');
        for ch in arg.as_ref().chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_ascii_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
                c => out.push(c),
            }
        }
        out.push('"');
    }
    out
}

fn skip_spaces(input: &[u8]) -> usize {
    input.iter().take_while(|b| **b == b' ').count()
}

/// Decode the escape whose first byte (the one after the backslash) starts
/// `rest`. Returns how many bytes of `rest` were consumed.
fn decode_escape(rest: &[u8], token: &mut Vec<u8>) -> usize {
    let first = rest[0];
    match first {
        b'n' => token.push(b'\n'),
        b'r' => token.push(b'\r'),
        b't' => token.push(b'\t'),
        b'"' => token.push(b'"'),
        b'\\' => token.push(b'\\'),
        b'0'..=b'7' => match parse_octal(rest) {
            Some(value) => {
                token.push(value);
                return 3;
            }
            None => token.extend_from_slice(&[b'\\', first]),
        },
        b'x' => match parse_hex(&rest[1..]) {
            Some(value) => {
                token.push(value);
                return 3;
            }
            None => token.extend_from_slice(&[b'\\', first]),
        },
        other => token.extend_from_slice(&[b'\\', other]),
    }
    1
}

/// Exactly three octal digits, value at most 0o377.
fn parse_octal(digits: &[u8]) -> Option<u8> {
    let digits = digits.get(..3)?;
    let mut value: u16 = 0;
    for d in digits {
        if !(b'0'..=b'7').contains(d) {
            return None;
        }
        value = value * 8 + u16::from(d - b'0');
    }
    u8::try_from(value).ok()
}

/// Exactly two hex digits.
fn parse_hex(digits: &[u8]) -> Option<u8> {
    let digits = digits.get(..2)?;
    let text = std::str::from_utf8(digits).ok()?;
    if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(text, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn check(input: &str, token: &[u8], tail: &str) {
        let (actual_token, actual_tail) = read_token(input.as_bytes());
        assert_eq!(actual_token, token, "token of {:?}", input);
        assert_eq!(actual_tail, tail.as_bytes(), "tail of {:?}", input);
    }

    #[test]
    fn decodes_named_escapes() {
        check(r#"a\nb\rc\td\"e\\ rest"#, b"a\nb\rc\td\"e\\", "rest");
    }

    #[test]
    fn decodes_hex_and_octal() {
        check(r"\x41", b"A", "");
        check(r"\x41\x42", b"AB", "");
        check(r"\101", b"A", "");
        check(r"\101\102", b"AB", "");
        check(r"\x41\102abc", b"ABabc", "");
        check(r"\x41\102abc def", b"ABabc", "def");
        check(r"\377", &[0xff], "");
    }

    #[test]
    fn malformed_escapes_pass_through() {
        check(r"\", b"\\", "");
        check(r"\a", b"\\a", "");
        check(r"\x", b"\\x", "");
        check(r"\x4", b"\\x4", "");
        check(r"\xg1", b"\\xg1", "");
        check(r"\02ABC", b"\\02ABC", "");
        check(r"\400", b"\\400", "");
        check(r"\ x", b"\\ x", "");
    }

    #[test]
    fn quotes_group_words_and_are_dropped() {
        check(r#""hello world" next"#, b"hello world", "next");
        check(r#"ab"c d"e f"#, b"abc de", "f");
        check(r#""" x"#, b"", "x");
    }

    #[test]
    fn escapes_work_inside_quotes() {
        check(r#""a\"b c" d"#, b"a\"b c", "d");
        check(r#""\x20""#, b" ", "");
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        check(r#""abc def"#, b"abc def", "");
    }

    #[test]
    fn tokenizes_quoted_auth_request() {
        assert_eq!(tokenize(r#""auth" "abc123""#), vec!["auth", "abc123"]);
    }

    #[test]
    fn tokenize_collapses_space_runs() {
        assert_eq!(
            tokenize("  ban   req.url  ~ /foo  "),
            vec!["ban", "req.url", "~", "/foo"]
        );
        assert!(tokenize("").is_empty());
        assert!(tokenize("    ").is_empty());
    }

    #[test]
    fn tokenize_keeps_empty_quoted_tokens() {
        assert_eq!(tokenize(r#"vcl.inline boot """#), vec!["vcl.inline", "boot", ""]);
    }

    #[test]
    fn tokenize_accepts_raw_bytes() {
        assert_eq!(tokenize(b"ping \xff".as_slice()), vec!["ping", "\u{fffd}"]);
    }

    #[test]
    fn quote_args_escapes_specials() {
        assert_eq!(
            quote_args(&["req.url", "~", "a \"b\"\\c\n"]),
            r#""req.url" "~" "a \"b\"\\c\n""#
        );
        assert_eq!(quote_args(&["\u{1}\u{7f}"]), r#""\x01\x7f""#);
        assert_eq!(quote_args::<&str>(&[]), "");
    }

    #[test]
    fn quoting_round_trips_known_cases() {
        let cases: Vec<Vec<&str>> = vec![
            vec!["req.http.host", "==", "example.com"],
            vec!["req.url", "~", "^/path with spaces/.*$"],
            vec!["", "  ", "\"", "\\", "\\x41", "\\101"],
            vec!["tab\there", "cr\rlf\n", "bell\u{7}", "del\u{7f}"],
            vec!["caf\u{e9}", "\u{1f600}", "日本語"],
            vec!["&&", "obj.status", "!=", "200"],
        ];
        for args in cases {
            let quoted = quote_args(&args);
            assert_eq!(tokenize(&quoted), args, "round trip of {:?}", quoted);
        }
    }

    prop_compose! {
        fn arb_arg()(
            chars in prop::collection::vec(
                prop_oneof![
                    prop::sample::select(vec![
                        '"', '\\', ' ', 'x', '0', '3', '7', '9', 'f', '\n', '\r', '\t',
                        '\u{0}', '\u{1b}', '\u{7f}', '\u{e9}',
                    ]),
                    any::<char>(),
                ],
                0..24,
            ),
        ) -> String {
            chars.into_iter().collect()
        }
    }

    proptest! {
        #[test]
        fn quoting_then_tokenizing_round_trips(
            args in prop::collection::vec(arb_arg(), 0..8),
        ) {
            let quoted = quote_args(&args);
            prop_assert_eq!(tokenize(&quoted), args);
        }
    }
}

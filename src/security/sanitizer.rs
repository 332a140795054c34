//! Markup stripping for user-submitted text.
//!
//! A small tokenizer walks the input the way an HTML parser would recognise
//! tag openings, so malformed or nested markup cannot slip past a naive
//! pattern. Everything recognised as markup is removed; everything else is
//! copied through untouched.

/// Elements whose body is dropped together with the tags.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Markup sanitizer.
pub struct MarkupSanitizer;

impl MarkupSanitizer {
    /// Strip all markup from `input`.
    ///
    /// Removing a tag can splice two fragments into a new tag (`<<b>i>`), so
    /// passes repeat until the text is stable. Each pass only deletes
    /// characters, which bounds the number of passes by the input length and
    /// makes the result a fixed point: stripping it again changes nothing.
    pub fn strip(input: &str) -> String {
        let mut current = strip_pass(input);
        loop {
            let next = strip_pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    /// Whether `input` would be altered by [`MarkupSanitizer::strip`].
    pub fn contains_markup(input: &str) -> bool {
        strip_pass(input) != input
    }
}

/// One left-to-right tokenizing pass.
fn strip_pass(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('<') {
        output.push_str(&rest[..pos]);
        let markup = &rest[pos..];

        match scan_markup(markup.as_bytes()) {
            Some(Markup { len, raw_text }) => {
                rest = &markup[len..];
                if let Some(element) = raw_text {
                    rest = skip_raw_text(rest, element);
                }
            }
            None => {
                // A lone '<' (as in "a < b" or "<3") is plain text.
                output.push('<');
                rest = &markup[1..];
            }
        }
    }

    output.push_str(rest);
    output
}

/// A recognised markup token at the start of the scanned slice.
struct Markup {
    /// Bytes consumed, including both delimiters.
    len: usize,
    /// Set when the token opens an element whose body must be dropped.
    raw_text: Option<&'static str>,
}

/// Recognise the token starting at `bytes[0] == b'<'`.
fn scan_markup(bytes: &[u8]) -> Option<Markup> {
    match *bytes.get(1)? {
        b'!' if bytes[2..].starts_with(b"--") => {
            // Searching from the opening dashes also closes "<!-->" and "<!--->".
            let len = find(bytes, b"-->", 2).map_or(bytes.len(), |i| i + 3);
            Some(Markup { len, raw_text: None })
        }
        b'!' | b'?' => Some(Markup {
            len: scan_to_close(bytes, 2),
            raw_text: None,
        }),
        b'/' => match bytes.get(2) {
            Some(c) if c.is_ascii_alphabetic() => {
                let name_end = scan_name(bytes, 2);
                Some(Markup {
                    len: scan_attributes(bytes, name_end),
                    raw_text: None,
                })
            }
            // "</ x>" and "</>" are bogus markup; a trailing "</" is text.
            Some(_) => Some(Markup {
                len: scan_to_close(bytes, 2),
                raw_text: None,
            }),
            None => None,
        },
        c if c.is_ascii_alphabetic() => {
            let name_end = scan_name(bytes, 1);
            let name = &bytes[1..name_end];
            let raw_text = RAW_TEXT_ELEMENTS
                .iter()
                .copied()
                .find(|el| name.eq_ignore_ascii_case(el.as_bytes()));
            Some(Markup {
                len: scan_attributes(bytes, name_end),
                raw_text,
            })
        }
        _ => None,
    }
}

/// End of a tag name starting at `start`.
fn scan_name(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b.is_ascii_whitespace() || b == b'/' || b == b'>')
        .map_or(bytes.len(), |i| start + i)
}

/// Skip attributes up to and including the closing '>'.
///
/// Quoted attribute values may contain '>' and do not end the tag. An
/// unterminated tag swallows the rest of the input.
fn scan_attributes(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    let mut expect_value = false;

    while i < bytes.len() {
        match bytes[i] {
            b'>' => return i + 1,
            b'=' => {
                expect_value = true;
                i += 1;
            }
            quote @ (b'"' | b'\'') if expect_value => match find(bytes, &[quote], i + 1) {
                Some(end) => {
                    expect_value = false;
                    i = end + 1;
                }
                None => return bytes.len(),
            },
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                expect_value = false;
                i += 1;
            }
        }
    }

    bytes.len()
}

/// Skip to just past the next '>' (or the end of input).
fn scan_to_close(bytes: &[u8], start: usize) -> usize {
    find(bytes, b">", start).map_or(bytes.len(), |i| i + 1)
}

/// Drop a raw-text element body and its closing tag.
fn skip_raw_text<'a>(rest: &'a str, element: &str) -> &'a str {
    let bytes = rest.as_bytes();
    let name = element.as_bytes();
    let mut from = 0;

    while let Some(open) = find(bytes, b"</", from) {
        let name_start = open + 2;
        let name_end = name_start + name.len();
        let matches_name = bytes
            .get(name_start..name_end)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name));
        let terminated = bytes
            .get(name_end)
            .map_or(true, |&b| b.is_ascii_whitespace() || b == b'/' || b == b'>');

        if matches_name && terminated {
            return &rest[scan_attributes(bytes, name_end)..];
        }
        from = name_start;
    }

    ""
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(MarkupSanitizer::strip("hello world"), "hello world");
    }

    #[test]
    fn test_script_and_body_removed() {
        assert_eq!(
            MarkupSanitizer::strip("<script>alert(1)</script>Hello"),
            "Hello"
        );
    }

    #[test]
    fn test_strip_simple_tags() {
        assert_eq!(
            MarkupSanitizer::strip("<p>Hello <b>World</b></p>"),
            "Hello World"
        );
    }

    #[test]
    fn test_style_body_removed() {
        assert_eq!(
            MarkupSanitizer::strip("<style>body { display: none }</style>visible"),
            "visible"
        );
    }

    #[test]
    fn test_uppercase_script() {
        assert_eq!(
            MarkupSanitizer::strip("a<SCRIPT type=\"text/javascript\">x()</ScRiPt >b"),
            "ab"
        );
    }

    #[test]
    fn test_unclosed_script_drops_rest() {
        assert_eq!(MarkupSanitizer::strip("ok<script>steal()"), "ok");
    }

    #[test]
    fn test_script_body_with_fake_close() {
        // "</scripty>" does not close the element.
        assert_eq!(
            MarkupSanitizer::strip("<script>a</scripty>b</script>c"),
            "c"
        );
    }

    #[test]
    fn test_quoted_gt_in_attribute() {
        assert_eq!(
            MarkupSanitizer::strip(r#"<a title=">" onclick="evil()">link</a>"#),
            "link"
        );
    }

    #[test]
    fn test_unterminated_tag() {
        assert_eq!(
            MarkupSanitizer::strip("before<img src=x onerror=alert(1)"),
            "before"
        );
    }

    #[test]
    fn test_html_comment() {
        assert_eq!(
            MarkupSanitizer::strip("a<!-- <script>x</script> -->b"),
            "ab"
        );
    }

    #[test]
    fn test_abruptly_closed_comments() {
        assert_eq!(MarkupSanitizer::strip("<!-->hello"), "hello");
        assert_eq!(MarkupSanitizer::strip("a<!--->b"), "ab");
        assert_eq!(MarkupSanitizer::strip("a<!---->b"), "ab");
    }

    #[test]
    fn test_unclosed_comment_drops_rest() {
        assert_eq!(MarkupSanitizer::strip("a<!-- never closed"), "a");
    }

    #[test]
    fn test_spliced_tag_evasion() {
        let output = MarkupSanitizer::strip("<<b>script>alert(1)</script>");
        assert!(!output.contains("script"));
        assert!(!output.contains("alert"));
    }

    #[test]
    fn test_nested_name_evasion() {
        let output = MarkupSanitizer::strip("<scr<script>ipt>alert(1)</script>");
        assert!(!output.contains('<'));
    }

    #[test]
    fn test_punctuation_preserved() {
        let input = "1 < 2 && 3 > 2, I <3 \"quotes\" & 'apostrophes'";
        assert_eq!(MarkupSanitizer::strip(input), input);
    }

    #[test]
    fn test_unicode_preserved() {
        assert_eq!(
            MarkupSanitizer::strip("héllo <i>wörld</i> 日本"),
            "héllo wörld 日本"
        );
    }

    #[test]
    fn test_trailing_close_marker_is_text() {
        assert_eq!(MarkupSanitizer::strip("a </"), "a </");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "<script>alert(1)</script>Hello",
            "<<b>script>alert(1)</script>",
            "<<<a>a>a>text",
            "x<<!---->b>y",
            "a < b <c",
            "</ x>bogus",
            "<?xml version=\"1.0\"?>doc",
            "plain",
            "",
        ];

        for input in inputs {
            let once = MarkupSanitizer::strip(input);
            let twice = MarkupSanitizer::strip(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_contains_markup() {
        assert!(MarkupSanitizer::contains_markup("<b>x</b>"));
        assert!(!MarkupSanitizer::contains_markup("a < b"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(MarkupSanitizer::strip(""), "");
    }
}

//! Tolerant line scanning
//!
//! Every reader extracts numbers and tokens from raw text lines through
//! `LineScanner`. Extraction never fails hard: a blank field, a field full
//! of garbage, or a slice past the end of the line yields `None`, and the
//! reader decides whether that particular field was required.
//!
//! The scanner keeps a cursor so free-form readers can walk a line
//! left-to-right with `next_*` calls; fixed-column calls reposition the
//! cursor to the end of their field.

/// Scanner over one text line.
pub struct LineScanner<'a> {
    line: &'a str,
    cursor: usize,
}

impl<'a> LineScanner<'a> {
    pub fn new(line: &'a str) -> Self {
        LineScanner { line, cursor: 0 }
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, position: usize) {
        self.cursor = position.min(self.line.len());
    }

    /// The raw field between two byte columns, clamped to the line.
    /// Returns `None` when the line does not reach `start`.
    pub fn field(&mut self, start: usize, end: usize) -> Option<&'a str> {
        let end = end.min(self.line.len());
        if start >= end {
            self.cursor = self.line.len().min(end.max(start));
            return None;
        }
        self.cursor = end;
        self.line.get(start..end)
    }

    /// A whitespace-trimmed token from a fixed-column field, `None` when
    /// blank or out of range
    pub fn token_at(&mut self, start: usize, end: usize) -> Option<&'a str> {
        let token = self.field(start, end)?.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    /// Integer from a fixed-column field
    pub fn int_at(&mut self, start: usize, end: usize) -> Option<i64> {
        parse_int_prefix(self.token_at(start, end)?)
    }

    /// Float from a fixed-column field
    pub fn float_at(&mut self, start: usize, end: usize) -> Option<f32> {
        parse_float_prefix(self.token_at(start, end)?)
    }

    /// First non-blank character of a fixed-column field
    pub fn char_at(&mut self, start: usize) -> Option<char> {
        let c = self.field(start, start + 1)?.chars().next()?;
        if c == ' ' {
            None
        } else {
            Some(c)
        }
    }

    /// Next whitespace-delimited token from the cursor
    pub fn next_token(&mut self) -> Option<&'a str> {
        let rest = self.line.get(self.cursor..)?;
        let start = rest.find(|c: char| !c.is_whitespace())?;
        let token_start = self.cursor + start;
        let after = &self.line[token_start..];
        let len = after
            .find(char::is_whitespace)
            .unwrap_or(after.len());
        self.cursor = token_start + len;
        Some(&self.line[token_start..token_start + len])
    }

    /// Next token parsed as an integer; the cursor advances even when the
    /// token is not numeric
    pub fn next_int(&mut self) -> Option<i64> {
        parse_int_prefix(self.next_token()?)
    }

    /// Next token parsed as a float
    pub fn next_float(&mut self) -> Option<f32> {
        parse_float_prefix(self.next_token()?)
    }

    /// Remaining text after the cursor, trimmed
    pub fn rest(&mut self) -> &'a str {
        let rest = self.line.get(self.cursor..).unwrap_or("").trim();
        self.cursor = self.line.len();
        rest
    }
}

/// Parse the longest leading integer, tolerating trailing garbage.
/// `None` when no digits lead the text.
pub fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim();
    let bytes = text.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }
    text[..i].parse().ok()
}

/// Parse the longest leading float: sign, digits, decimal point, optional
/// `e`/`E` exponent with sign. Tolerates trailing garbage such as CIF
/// standard-uncertainty suffixes ("1.234(5)").
pub fn parse_float_prefix(text: &str) -> Option<f32> {
    let text = text.trim();
    let bytes = text.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
        i += 1;
    }
    let mut saw_digit = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        saw_digit = true;
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            saw_digit = true;
            i += 1;
        }
    }
    if !saw_digit {
        return None;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'-' || bytes[j] == b'+') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    text[..i].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_columns() {
        let mut scan = LineScanner::new("ATOM     10  CA  ALA A  12      11.104");
        assert_eq!(scan.token_at(0, 6), Some("ATOM"));
        assert_eq!(scan.int_at(6, 11), Some(10));
        assert_eq!(scan.token_at(12, 16), Some("CA"));
        assert_eq!(scan.float_at(30, 38), Some(11.104));
    }

    #[test]
    fn test_blank_field_is_none_not_error() {
        let mut scan = LineScanner::new("ABC       ");
        assert_eq!(scan.int_at(4, 8), None);
        assert_eq!(scan.float_at(4, 8), None);
        // Scanning continues normally afterwards
        assert_eq!(scan.token_at(0, 3), Some("ABC"));
    }

    #[test]
    fn test_out_of_range_field() {
        let mut scan = LineScanner::new("short");
        assert_eq!(scan.int_at(10, 14), None);
        assert_eq!(scan.token_at(3, 40), Some("rt"));
    }

    #[test]
    fn test_token_walk() {
        let mut scan = LineScanner::new("  C   1.5  -2.25e1 rest of line");
        assert_eq!(scan.next_token(), Some("C"));
        assert_eq!(scan.next_float(), Some(1.5));
        assert_eq!(scan.next_float(), Some(-22.5));
        assert_eq!(scan.rest(), "rest of line");
        assert_eq!(scan.next_token(), None);
    }

    #[test]
    fn test_garbage_token_degrades() {
        let mut scan = LineScanner::new("abc 12x 3.5");
        assert_eq!(scan.next_int(), None); // "abc"
        assert_eq!(scan.next_int(), Some(12)); // "12x"
        assert_eq!(scan.next_float(), Some(3.5));
    }

    #[test]
    fn test_prefix_parsers() {
        assert_eq!(parse_float_prefix("1.234(5)"), Some(1.234));
        assert_eq!(parse_float_prefix("-0.5"), Some(-0.5));
        assert_eq!(parse_float_prefix("1e3"), Some(1000.0));
        assert_eq!(parse_float_prefix("1e"), Some(1.0));
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix("-"), None);
        assert_eq!(parse_int_prefix("+42abc"), Some(42));
        assert_eq!(parse_int_prefix("abc"), None);
    }
}

use alloc::string::String;
use alloc::string::ToString;
use core::str;

/// A parsed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string (content between single quotes).
    String(String),
}

impl Value {
    /// Numeric view of the value; integers promote to float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view of the value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Logical view of the value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Logical(b) => Some(*b),
            _ => None,
        }
    }

    /// String view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Split a value field at the comment separator.
///
/// Returns `(value_part, optional_comment)`. The comment does not include the
/// leading separator.
///
/// The FITS standard uses ` / ` (space-slash-space) but real-world files
/// produced by IDL and other tools omit the trailing space (e.g.
/// `BITPIX = -32 /No. of bits per pixel`), so ` /` alone is accepted.
fn split_comment(field: &[u8]) -> (&[u8], Option<&str>) {
    // String values carry the comment after the closing quote; the caller
    // handles strings separately.
    let len = field.len();
    let mut i = 0;
    while i + 1 < len {
        if field[i] == b' ' && field[i + 1] == b'/' {
            let value_part = &field[..i];
            // Skip the slash and one optional space after it.
            let mut comment_start = i + 2;
            if comment_start < len && field[comment_start] == b' ' {
                comment_start += 1;
            }
            let comment = str::from_utf8(&field[comment_start..])
                .ok()
                .map(|s| s.trim_end());
            return (value_part, comment.filter(|s| !s.is_empty()));
        }
        i += 1;
    }
    (field, None)
}

/// Parse a FITS character-string value from the 70-byte value field.
///
/// String values begin with `'` at the first byte and run to the closing `'`;
/// doubled single-quotes inside represent a literal `'`. Everything after the
/// closing quote is whitespace or a ` /` comment separator plus the comment.
fn parse_string(field: &[u8]) -> Option<(Value, Option<&str>)> {
    if field.is_empty() || field[0] != b'\'' {
        return None;
    }

    let mut value = String::new();
    let mut i = 1; // skip opening quote
    let len = field.len();

    loop {
        if i >= len {
            // Unterminated string, be lenient and accept what we have.
            break;
        }
        if field[i] == b'\'' {
            if i + 1 < len && field[i + 1] == b'\'' {
                value.push('\'');
                i += 2;
            } else {
                i += 1;
                break;
            }
        } else {
            value.push(field[i] as char);
            i += 1;
        }
    }

    // Trailing spaces are padding (FITS strings pad to min 8 chars).
    let trimmed = value.trim_end().to_string();

    let (_, comment) = split_comment(&field[i..]);
    Some((Value::String(trimmed), comment))
}

/// Parse a float string, handling FITS `D` exponent notation.
fn parse_float_str(s: &str) -> Option<f64> {
    let normalized = s.replace('D', "E").replace('d', "e");
    normalized.parse::<f64>().ok()
}

/// Parse a FITS header value from the 70-byte value portion of an 80-byte
/// card (bytes 10..80).
///
/// Returns the parsed [`Value`] and an optional comment string. The caller is
/// responsible for checking that bytes 8..10 of the card are `= ` (the value
/// indicator) before calling this function.
pub fn parse_value(value_bytes: &[u8]) -> Option<(Value, Option<&str>)> {
    if value_bytes.is_empty() {
        return None;
    }

    if value_bytes[0] == b'\'' {
        return parse_string(value_bytes);
    }

    let (val_part, comment) = split_comment(value_bytes);

    let val_text = str::from_utf8(val_part).ok()?.trim();
    if val_text.is_empty() {
        return None;
    }

    if val_text == "T" {
        return Some((Value::Logical(true), comment));
    }
    if val_text == "F" {
        return Some((Value::Logical(false), comment));
    }

    // Integer: no decimal point or exponent characters.
    if !val_text.contains('.')
        && !val_text.contains('E')
        && !val_text.contains('e')
        && !val_text.contains('D')
        && !val_text.contains('d')
    {
        if let Ok(n) = val_text.parse::<i64>() {
            return Some((Value::Integer(n), comment));
        }
    }

    if let Some(f) = parse_float_str(val_text) {
        return Some((Value::Float(f), comment));
    }

    None
}

/// Serialize a [`Value`] into a 70-byte field suitable for bytes 10..80 of an
/// 80-byte FITS card.
///
/// Numeric and logical values are right-justified in the first 20 bytes
/// (columns 11-30 of the card). String values start at byte 0 with a single
/// quote.
pub fn format_value(value: &Value) -> [u8; 70] {
    let mut buf = [b' '; 70];

    match value {
        Value::Logical(b) => {
            // Standard puts the logical in column 30 = index 20 of the field.
            buf[19] = if *b { b'T' } else { b'F' };
        }
        Value::Integer(n) => {
            let s = alloc::format!("{}", n);
            right_justify(s.as_bytes(), &mut buf[..20]);
        }
        Value::Float(f) => {
            let s = format_float(*f);
            right_justify(s.as_bytes(), &mut buf[..20]);
        }
        Value::String(s) => {
            write_string(s, &mut buf);
        }
    }

    buf
}

/// Right-justify `src` within `dest`, padding the left with spaces.
fn right_justify(src: &[u8], dest: &mut [u8]) {
    let len = src.len().min(dest.len());
    let start = dest.len() - len;
    for b in dest.iter_mut() {
        *b = b' ';
    }
    dest[start..start + len].copy_from_slice(&src[..len]);
}

fn format_float(f: f64) -> String {
    use alloc::format;
    if f == 0.0 {
        return String::from("0.0");
    }
    // Start at high precision and reduce until the result fits 20 columns.
    let mut precision = 15usize;
    loop {
        let s = format!("{:.prec$E}", f, prec = precision);
        if s.len() <= 20 || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

fn write_string(s: &str, buf: &mut [u8; 70]) {
    let mut pos = 0;
    buf[pos] = b'\'';
    pos += 1;

    for ch in s.bytes() {
        if pos >= 69 {
            break; // leave room for the closing quote
        }
        if ch == b'\'' {
            if pos + 1 >= 69 {
                break;
            }
            buf[pos] = b'\'';
            buf[pos + 1] = b'\'';
            pos += 2;
        } else {
            buf[pos] = ch;
            pos += 1;
        }
    }

    // Pad to minimum 8 characters between quotes (closing quote at >= index 9).
    while pos < 9 {
        buf[pos] = b' ';
        pos += 1;
    }

    if pos < 70 {
        buf[pos] = b'\'';
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: create a 70-byte field from a string, right-padded with spaces.
    fn make_field(s: &str) -> [u8; 70] {
        let mut buf = [b' '; 70];
        let bytes = s.as_bytes();
        let len = bytes.len().min(70);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    // ---- parsing ----

    #[test]
    fn parse_logical() {
        let field = make_field("                   T");
        let (val, comment) = parse_value(&field).unwrap();
        assert_eq!(val, Value::Logical(true));
        assert!(comment.is_none());

        let (val, _) = parse_value(&make_field("                   F")).unwrap();
        assert_eq!(val, Value::Logical(false));
    }

    #[test]
    fn parse_integer_with_comment() {
        let field = make_field("                1024 / block count");
        let (val, comment) = parse_value(&field).unwrap();
        assert_eq!(val, Value::Integer(1024));
        assert_eq!(comment.unwrap(), "block count");
    }

    #[test]
    fn parse_integer_negative() {
        let (val, _) = parse_value(&make_field("                 -99")).unwrap();
        assert_eq!(val, Value::Integer(-99));
    }

    #[test]
    fn parse_float_simple() {
        let (val, _) = parse_value(&make_field("             9.80665")).unwrap();
        match val {
            Value::Float(f) => assert!((f - 9.80665).abs() < 1e-10),
            other => panic!("Expected Float, got {:?}", other),
        }
    }

    #[test]
    fn parse_float_d_exponent() {
        let (val, _) = parse_value(&make_field("           1.234D+05")).unwrap();
        match val {
            Value::Float(f) => assert!((f - 1.234e5).abs() < 1e-5),
            other => panic!("Expected Float, got {:?}", other),
        }
    }

    #[test]
    fn parse_string_simple() {
        let (val, _) = parse_value(&make_field("'SIMPLE  '")).unwrap();
        assert_eq!(val, Value::String(String::from("SIMPLE")));
    }

    #[test]
    fn parse_string_with_comment() {
        let field = make_field("'IMAGE   '           / image type");
        let (val, comment) = parse_value(&field).unwrap();
        assert_eq!(val, Value::String(String::from("IMAGE")));
        assert_eq!(comment.unwrap(), "image type");
    }

    #[test]
    fn parse_string_embedded_quotes() {
        let (val, _) = parse_value(&make_field("'it''s ok'")).unwrap();
        assert_eq!(val, Value::String(String::from("it's ok")));
    }

    #[test]
    fn parse_empty_field_returns_none() {
        assert!(parse_value(b"").is_none());
        assert!(parse_value(&make_field("")).is_none());
    }

    #[test]
    fn parse_comment_no_trailing_space() {
        // Real-world: "BITPIX  =                  -32 /No.Bits per pixel"
        let field = make_field("                 -32 /No.Bits per pixel");
        let (val, comment) = parse_value(&field).unwrap();
        assert_eq!(val, Value::Integer(-32));
        assert_eq!(comment.unwrap(), "No.Bits per pixel");
    }

    // ---- round-trips ----

    #[test]
    fn roundtrip_integer() {
        for &n in &[0i64, 1, -1, 42, -9999, i64::MAX, i64::MIN] {
            let v = Value::Integer(n);
            let buf = format_value(&v);
            let (parsed, _) = parse_value(&buf).unwrap();
            assert_eq!(parsed, v, "round-trip failed for {}", n);
        }
    }

    #[test]
    fn roundtrip_float() {
        for &f in &[0.0f64, 1.0, -1.0, 9.80665, 1.23e10, -4.56e-20] {
            let v = Value::Float(f);
            let buf = format_value(&v);
            let (parsed, _) = parse_value(&buf).unwrap();
            match parsed {
                Value::Float(pf) => {
                    if f == 0.0 {
                        assert_eq!(pf, 0.0);
                    } else {
                        let rel_err = ((pf - f) / f).abs();
                        assert!(rel_err < 1e-10, "round-trip float failed: {} vs {}", f, pf);
                    }
                }
                other => panic!("Expected Float, got {:?}", other),
            }
        }
    }

    #[test]
    fn roundtrip_string() {
        for s in &["HELLO", "", "it's here", "X", "A long string value"] {
            let v = Value::String(String::from(*s));
            let buf = format_value(&v);
            let (parsed, _) = parse_value(&buf).unwrap();
            assert_eq!(parsed, v, "round-trip failed for {:?}", s);
        }
    }

    #[test]
    fn roundtrip_logical() {
        for &b in &[true, false] {
            let v = Value::Logical(b);
            let buf = format_value(&v);
            let (parsed, _) = parse_value(&buf).unwrap();
            assert_eq!(parsed, v);
        }
    }

    // ---- formatting ----

    #[test]
    fn format_logical_position() {
        let buf = format_value(&Value::Logical(true));
        assert_eq!(buf[19], b'T');
        for (i, &b) in buf.iter().enumerate() {
            if i != 19 {
                assert_eq!(b, b' ', "non-space at index {}", i);
            }
        }
    }

    #[test]
    fn format_integer_right_justified() {
        let buf = format_value(&Value::Integer(42));
        assert_eq!(buf[18], b'4');
        assert_eq!(buf[19], b'2');
    }

    #[test]
    fn format_string_quotes_and_padding() {
        let buf = format_value(&Value::String(String::from("AB")));
        assert_eq!(buf[0], b'\'');
        assert_eq!(buf[1], b'A');
        assert_eq!(buf[2], b'B');
        // Padded to 8 chars between quotes.
        assert_eq!(buf[9], b'\'');
    }

    // ---- coercions ----

    #[test]
    fn as_f64_promotes_integers() {
        assert_eq!(Value::Integer(5).as_f64(), Some(5.0));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Logical(true).as_f64(), None);
    }

    #[test]
    fn as_i64_is_strict() {
        assert_eq!(Value::Integer(5).as_i64(), Some(5));
        assert_eq!(Value::Float(5.0).as_i64(), None);
    }

    #[test]
    fn as_str_and_as_bool() {
        assert_eq!(Value::String(String::from("TAN")).as_str(), Some("TAN"));
        assert_eq!(Value::Logical(false).as_bool(), Some(false));
        assert_eq!(Value::Integer(1).as_bool(), None);
    }
}

//! FITS header cards and the ordered keyword store built on them.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::str;

use crate::block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE, HEADER_PAD_BYTE};
use crate::error::{Error, Result};
use crate::value::{format_value, parse_value, Value};

// ── Cards ──

/// A parsed FITS header card (one 80-byte keyword record).
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// The 8-byte keyword name, ASCII, left-justified, space-padded.
    pub keyword: [u8; 8],
    /// The parsed value, if this card has a value indicator (`= ` in bytes 8..10).
    pub value: Option<Value>,
    /// An optional comment string.
    pub comment: Option<String>,
}

impl Card {
    /// Return the keyword as a trimmed UTF-8 string.
    pub fn keyword_str(&self) -> &str {
        let end = self
            .keyword
            .iter()
            .rposition(|&b| b != b' ')
            .map(|i| i + 1)
            .unwrap_or(0);
        str::from_utf8(&self.keyword[..end]).unwrap_or("")
    }

    /// Returns `true` if this card is the END keyword.
    pub fn is_end(&self) -> bool {
        &self.keyword == b"END     "
    }

    /// Returns `true` if this is a blank card (keyword is all spaces).
    pub fn is_blank(&self) -> bool {
        self.keyword.iter().all(|&b| b == b' ')
    }

    /// Returns `true` if this card carries a commentary keyword
    /// (COMMENT, HISTORY, or blank).
    pub fn is_commentary(&self) -> bool {
        let kw = self.keyword_str();
        kw == "COMMENT" || kw == "HISTORY" || self.is_blank()
    }
}

/// Keywords that never carry a value indicator. Their bytes 8..80 are free-form text.
const COMMENTARY_KEYWORDS: [&[u8; 8]; 3] = [b"COMMENT ", b"HISTORY ", b"        "];

fn is_commentary_keyword(keyword: &[u8; 8]) -> bool {
    COMMENTARY_KEYWORDS.contains(&keyword)
}

/// Pad a short keyword name to 8 bytes with trailing ASCII spaces.
pub(crate) const fn kw(name: &[u8]) -> [u8; 8] {
    let mut buf = [b' '; 8];
    let mut i = 0;
    while i < name.len() && i < 8 {
        buf[i] = name[i];
        i += 1;
    }
    buf
}

/// Normalize a keyword string to its 8-byte card form.
///
/// Lowercase ASCII letters are folded to uppercase; anything outside the FITS
/// keyword charset, or longer than 8 bytes, is rejected.
pub fn normalize_keyword(name: &str) -> Result<[u8; 8]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(Error::InvalidKeyword);
    }
    let mut buf = [b' '; 8];
    for (i, &b) in bytes.iter().enumerate() {
        buf[i] = match b {
            b'a'..=b'z' => b - b'a' + b'A',
            b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => b,
            _ => return Err(Error::InvalidKeyword),
        };
    }
    Ok(buf)
}

/// Parse a single 80-byte FITS header card.
pub fn parse_card(card_bytes: &[u8; CARD_SIZE]) -> Result<Card> {
    let mut keyword = [b' '; 8];
    keyword.copy_from_slice(&card_bytes[..8]);

    for &b in &keyword {
        match b {
            b'A'..=b'Z' | b'0'..=b'9' | b' ' | b'-' | b'_' => {}
            _ => return Err(Error::InvalidKeyword),
        }
    }

    if &keyword == b"END     " {
        return Ok(Card {
            keyword,
            value: None,
            comment: None,
        });
    }

    if is_commentary_keyword(&keyword) || card_bytes[8] != b'=' || card_bytes[9] != b' ' {
        let text = str::from_utf8(&card_bytes[8..CARD_SIZE])
            .map_err(|_| Error::InvalidHeader("card text is not UTF-8"))?
            .trim_end();
        let comment = if text.is_empty() {
            None
        } else {
            Some(String::from(text))
        };
        return Ok(Card {
            keyword,
            value: None,
            comment,
        });
    }

    let value_field = &card_bytes[10..CARD_SIZE];
    match parse_value(value_field) {
        Some((val, comment)) => Ok(Card {
            keyword,
            value: Some(val),
            comment: comment.map(String::from),
        }),
        None => {
            let field_str = str::from_utf8(value_field)
                .map_err(|_| Error::InvalidHeader("value field is not UTF-8"))?;
            Ok(Card {
                keyword,
                value: None,
                comment: comment_after_empty_value(field_str),
            })
        }
    }
}

fn comment_after_empty_value(field: &str) -> Option<String> {
    let idx = field.find(" /")?;
    // Skip the slash and one optional space after it.
    let after_slash = idx + 2;
    let comment_start = if field.as_bytes().get(after_slash) == Some(&b' ') {
        after_slash + 1
    } else {
        after_slash
    };
    let comment = field[comment_start..].trim_end();
    if comment.is_empty() {
        None
    } else {
        Some(String::from(comment))
    }
}

/// Parse consecutive 2880-byte header blocks until the END card is found.
///
/// Only complete blocks are scanned; trailing bytes shorter than a full block
/// are ignored, so non-block-aligned inputs still parse.
pub fn parse_header_blocks(data: &[u8]) -> Result<Vec<Card>> {
    if data.len() < BLOCK_SIZE {
        return Err(Error::UnexpectedEof);
    }

    let mut cards = Vec::new();
    let num_blocks = data.len() / BLOCK_SIZE;

    for block_idx in 0..num_blocks {
        let block_start = block_idx * BLOCK_SIZE;
        for card_idx in 0..CARDS_PER_BLOCK {
            let card_start = block_start + card_idx * CARD_SIZE;
            let card_bytes: &[u8; CARD_SIZE] = data[card_start..card_start + CARD_SIZE]
                .try_into()
                .map_err(|_| Error::InvalidHeader("short card"))?;

            let card = parse_card(card_bytes)?;
            let is_end = card.is_end();
            cards.push(card);

            if is_end {
                return Ok(cards);
            }
        }
    }

    Err(Error::UnexpectedEof)
}

/// Return the number of bytes consumed by the header (always a multiple of BLOCK_SIZE).
pub fn header_byte_len(data: &[u8]) -> Result<usize> {
    if data.len() < BLOCK_SIZE {
        return Err(Error::UnexpectedEof);
    }

    let num_blocks = data.len() / BLOCK_SIZE;

    for block_idx in 0..num_blocks {
        let block_start = block_idx * BLOCK_SIZE;
        for card_idx in 0..CARDS_PER_BLOCK {
            let card_start = block_start + card_idx * CARD_SIZE;
            if &data[card_start..card_start + 8] == b"END     " {
                return Ok((block_idx + 1) * BLOCK_SIZE);
            }
        }
    }

    Err(Error::UnexpectedEof)
}

/// Serialize a [`Card`] into an 80-byte FITS card image.
pub fn format_card(card: &Card) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];

    for (i, &b) in card.keyword.iter().enumerate() {
        buf[i] = b;
    }

    if let Some(ref value) = card.value {
        buf[8] = b'=';
        buf[9] = b' ';

        let mut value_field = format_value(value);
        if let Some(ref comment) = card.comment {
            insert_comment(&mut value_field, comment);
        }
        buf[10..80].copy_from_slice(&value_field);
    } else if !card.is_blank() {
        if let Some(ref comment) = card.comment {
            let bytes = comment.as_bytes();
            let len = bytes.len().min(72);
            buf[8..8 + len].copy_from_slice(&bytes[..len]);
        }
    }

    buf
}

/// Insert a ` / comment` string into a 70-byte value field.
fn insert_comment(field: &mut [u8; 70], comment: &str) {
    let content_end = if field[0] == b'\'' {
        let mut i = 1;
        loop {
            if i >= 70 {
                break i;
            }
            if field[i] == b'\'' {
                if i + 1 < 70 && field[i + 1] == b'\'' {
                    i += 2;
                } else {
                    break i + 1;
                }
            } else {
                i += 1;
            }
        }
    } else {
        20
    };

    let sep_start = content_end + 1;
    if sep_start + 3 >= 70 {
        return;
    }

    field[sep_start] = b'/';
    field[sep_start + 1] = b' ';

    let comment_start = sep_start + 2;
    let comment_bytes = comment.as_bytes();
    let max_len = 70 - comment_start;
    let len = comment_bytes.len().min(max_len);
    field[comment_start..comment_start + len].copy_from_slice(&comment_bytes[..len]);
}

/// Create the standard FITS END card.
pub fn format_end_card() -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[0] = b'E';
    buf[1] = b'N';
    buf[2] = b'D';
    buf
}

/// Serialize a sequence of header cards into complete FITS header blocks.
///
/// Appends the END card and pads the final block with blank cards. The
/// returned length is always a multiple of [`BLOCK_SIZE`].
pub fn serialize_header(cards: &[Card]) -> Vec<u8> {
    let total_cards = cards.len() + 1; // +1 for END
    let total_blocks = total_cards.div_ceil(CARDS_PER_BLOCK);
    let total_bytes = total_blocks * BLOCK_SIZE;

    let mut buf = vec![HEADER_PAD_BYTE; total_bytes];

    for (i, card) in cards.iter().enumerate() {
        let offset = i * CARD_SIZE;
        buf[offset..offset + CARD_SIZE].copy_from_slice(&format_card(card));
    }

    let end_offset = cards.len() * CARD_SIZE;
    buf[end_offset..end_offset + CARD_SIZE].copy_from_slice(&format_end_card());

    buf
}

// ── Header store ──

/// An ordered keyword-to-value store with an append-only history trail.
///
/// Keys are case-insensitive and unique; insertion order is preserved so the
/// serialized header lists cards in the order they were first set. `Clone` is
/// a deep copy, so derived headers never alias their source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
    history: Vec<String>,
}

impl Header {
    /// Create an empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a header from parsed cards.
    ///
    /// Value cards keep their order; HISTORY cards feed the history trail;
    /// END, COMMENT, and blank cards are dropped.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        let mut header = Header::new();
        for card in cards {
            if card.is_end() {
                continue;
            }
            if card.keyword_str() == "HISTORY" {
                if let Some(text) = card.comment {
                    header.history.push(text);
                }
                continue;
            }
            if card.is_commentary() || card.value.is_none() {
                continue;
            }
            header.cards.push(card);
        }
        header
    }

    fn position(&self, keyword: &[u8; 8]) -> Option<usize> {
        self.cards.iter().position(|c| &c.keyword == keyword)
    }

    /// Look up a keyword's value.
    pub fn get(&self, key: &str) -> Result<&Value> {
        let keyword = normalize_keyword(key)?;
        self.position(&keyword)
            .and_then(|i| self.cards[i].value.as_ref())
            .ok_or_else(|| Error::KeyNotFound(String::from(key)))
    }

    /// Typed lookup: numeric value as `f64` (integers promote).
    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.get(key)?.as_f64().ok_or(Error::InvalidValue)
    }

    /// Typed lookup: integer value.
    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.get(key)?.as_i64().ok_or(Error::InvalidValue)
    }

    /// Typed lookup: string value.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.get(key)?.as_str().ok_or(Error::InvalidValue)
    }

    /// Numeric lookup that treats an absent key as `None`.
    ///
    /// Non-numeric values for a present key still error.
    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            Ok(v) => v.as_f64().map(Some).ok_or(Error::InvalidValue),
            Err(Error::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns `true` if the keyword is present.
    pub fn contains(&self, key: &str) -> bool {
        normalize_keyword(key)
            .ok()
            .and_then(|kw| self.position(&kw))
            .is_some()
    }

    /// Insert or overwrite a keyword's value, preserving its position (and
    /// existing comment) if already present, appending otherwise.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.set_card(key, value, None)
    }

    /// Like [`set`](Self::set) but also sets the card comment.
    pub fn set_with_comment(&mut self, key: &str, value: Value, comment: &str) -> Result<()> {
        self.set_card(key, value, Some(String::from(comment)))
    }

    fn set_card(&mut self, key: &str, value: Value, comment: Option<String>) -> Result<()> {
        let keyword = normalize_keyword(key)?;
        match self.position(&keyword) {
            Some(i) => {
                self.cards[i].value = Some(value);
                if comment.is_some() {
                    self.cards[i].comment = comment;
                }
            }
            None => self.cards.push(Card {
                keyword,
                value: Some(value),
                comment,
            }),
        }
        Ok(())
    }

    /// Remove a keyword; returns its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let keyword = normalize_keyword(key).ok()?;
        let i = self.position(&keyword)?;
        self.cards.remove(i).value
    }

    /// Number of value cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Returns `true` if the header holds no value cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The value cards in insertion order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Append a line to the history trail. Existing lines are never altered.
    pub fn add_history(&mut self, text: impl Into<String>) {
        self.history.push(text.into());
    }

    /// The history trail, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Cards for serialization: value cards whose keyword is not in `skip`,
    /// followed by one HISTORY card per history line.
    pub fn to_cards(&self, skip: &[&str]) -> Vec<Card> {
        let skipped: Vec<[u8; 8]> = skip
            .iter()
            .filter_map(|k| normalize_keyword(k).ok())
            .collect();

        let mut out: Vec<Card> = self
            .cards
            .iter()
            .filter(|c| !skipped.contains(&c.keyword))
            .cloned()
            .collect();

        for line in &self.history {
            out.push(Card {
                keyword: kw(b"HISTORY"),
                value: None,
                comment: Some(line.clone()),
            });
        }

        out
    }
}

// ── Tests ──

#[cfg(test)]
mod card_tests {
    use super::*;
    use alloc::string::String;

    fn make_card(s: &str) -> [u8; CARD_SIZE] {
        let mut buf = [b' '; CARD_SIZE];
        let bytes = s.as_bytes();
        let len = bytes.len().min(CARD_SIZE);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    fn make_header_block(cards: &[[u8; CARD_SIZE]]) -> Vec<u8> {
        assert!(cards.len() <= CARDS_PER_BLOCK);
        let mut block = vec![b' '; BLOCK_SIZE];
        for (i, card) in cards.iter().enumerate() {
            let start = i * CARD_SIZE;
            block[start..start + CARD_SIZE].copy_from_slice(card);
        }
        block
    }

    #[test]
    fn parse_card_string_value() {
        let card = make_card("TELESCOP= 'Hubble  '           / telescope name");
        let c = parse_card(&card).unwrap();
        assert_eq!(c.keyword_str(), "TELESCOP");
        assert_eq!(c.value, Some(Value::String(String::from("Hubble"))));
        assert_eq!(c.comment, Some(String::from("telescope name")));
    }

    #[test]
    fn parse_card_integer_value() {
        let card = make_card("BITPIX  =                    16 / bits per pixel");
        let c = parse_card(&card).unwrap();
        assert_eq!(c.keyword_str(), "BITPIX");
        assert_eq!(c.value, Some(Value::Integer(16)));
        assert_eq!(c.comment, Some(String::from("bits per pixel")));
    }

    #[test]
    fn parse_card_float_value() {
        let card = make_card("CRVAL1  =            2.7315E+02 / reference value");
        let c = parse_card(&card).unwrap();
        match c.value {
            Some(Value::Float(f)) => assert!((f - 273.15).abs() < 1e-5),
            other => panic!("Expected Float, got {:?}", other),
        }
    }

    #[test]
    fn parse_card_logical() {
        let card = make_card("SIMPLE  =                    T / standard FITS");
        let c = parse_card(&card).unwrap();
        assert_eq!(c.value, Some(Value::Logical(true)));
    }

    #[test]
    fn parse_card_history_keyword() {
        let card = make_card("HISTORY Block averaged image with factor 3");
        let c = parse_card(&card).unwrap();
        assert_eq!(c.keyword_str(), "HISTORY");
        assert!(c.is_commentary());
        assert_eq!(
            c.comment,
            Some(String::from("Block averaged image with factor 3"))
        );
    }

    #[test]
    fn parse_card_end() {
        let c = parse_card(&make_card("END")).unwrap();
        assert!(c.is_end());
    }

    #[test]
    fn parse_card_invalid_keyword_lowercase() {
        let card = make_card("bitpix  =                    16");
        assert!(matches!(parse_card(&card), Err(Error::InvalidKeyword)));
    }

    #[test]
    fn parse_card_hyphen_keyword() {
        let c = parse_card(&make_card("DATE-OBS= '2024-01-15'")).unwrap();
        assert_eq!(c.keyword_str(), "DATE-OBS");
    }

    #[test]
    fn parse_card_empty_value_with_comment() {
        let c = parse_card(&make_card("BLANK   =                      / undefined value")).unwrap();
        assert!(c.value.is_none());
        assert_eq!(c.comment, Some(String::from("undefined value")));
    }

    #[test]
    fn parse_header_simple() {
        let cards = [
            make_card("SIMPLE  =                    T / conforms to FITS standard"),
            make_card("BITPIX  =                   16 / 16-bit integers"),
            make_card("NAXIS   =                    2 / number of axes"),
            make_card("NAXIS1  =                  100 / width"),
            make_card("NAXIS2  =                  200 / height"),
            make_card("END"),
        ];
        let block = make_header_block(&cards);
        let parsed = parse_header_blocks(&block).unwrap();

        assert_eq!(parsed.len(), 6);
        assert_eq!(parsed[0].keyword_str(), "SIMPLE");
        assert!(parsed[5].is_end());
    }

    #[test]
    fn parse_header_no_end_card() {
        let cards = [make_card("SIMPLE  =                    T")];
        let block = make_header_block(&cards);
        assert!(matches!(
            parse_header_blocks(&block),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn parse_header_too_small() {
        assert!(matches!(
            parse_header_blocks(&[b' '; 100]),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn header_byte_len_single_block() {
        let cards = [make_card("SIMPLE  =                    T"), make_card("END")];
        let block = make_header_block(&cards);
        assert_eq!(header_byte_len(&block).unwrap(), BLOCK_SIZE);
    }

    #[test]
    fn serialize_header_block_aligned_with_end() {
        let cards = vec![Card {
            keyword: kw(b"SIMPLE"),
            value: Some(Value::Logical(true)),
            comment: None,
        }];
        let header = serialize_header(&cards);
        assert_eq!(header.len(), BLOCK_SIZE);
        assert_eq!(&header[80..83], b"END");
        for &b in &header[160..] {
            assert_eq!(b, b' ');
        }
    }

    #[test]
    fn serialize_header_spills_to_two_blocks() {
        let cards: Vec<Card> = (0..36)
            .map(|i| Card {
                keyword: kw(alloc::format!("KEY{:05}", i).as_bytes()),
                value: Some(Value::Integer(i as i64)),
                comment: None,
            })
            .collect();
        assert_eq!(serialize_header(&cards).len(), 2 * BLOCK_SIZE);
    }

    #[test]
    fn roundtrip_serialize_then_parse() {
        let cards = vec![
            Card {
                keyword: kw(b"SIMPLE"),
                value: Some(Value::Logical(true)),
                comment: Some(String::from("conforms to FITS")),
            },
            Card {
                keyword: kw(b"BITPIX"),
                value: Some(Value::Integer(16)),
                comment: None,
            },
        ];
        let header = serialize_header(&cards);
        let parsed = parse_header_blocks(&header).unwrap();

        assert_eq!(parsed.len(), 3); // 2 cards + END
        assert_eq!(parsed[0].value, Some(Value::Logical(true)));
        assert_eq!(parsed[1].value, Some(Value::Integer(16)));
        assert!(parsed[2].is_end());
    }
}

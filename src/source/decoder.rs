//! Splits a top-level JSON array into raw element payloads without parsing
//! them. Parsing happens in the scan workers so the reader thread only does
//! bracket matching.

use crate::error::FramingError;
use std::io::BufRead;

/// One undecoded array element and its position in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub index: u64,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    First,
    Next,
    Done,
    Failed,
}

/// Forward-only iterator over the elements of a JSON array.
///
/// Yields `Err` once on a structural problem (missing `[`, bad separator,
/// truncated input, trailing data) and then ends. With a non-zero `limit` it
/// stops after that many elements without looking at the rest of the input.
pub struct RecordDecoder<R> {
    reader: R,
    offset: u64,
    read: u64,
    limit: u64,
    state: State,
}

impl<R: BufRead> RecordDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, 0)
    }

    pub fn with_limit(reader: R, limit: u64) -> Self {
        Self { reader, offset: 0, read: 0, limit, state: State::Open }
    }

    /// Elements handed out so far.
    pub fn records_read(&self) -> u64 {
        self.read
    }

    /// Bytes of (decompressed) input consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn advance(&mut self) -> Result<Option<RawRecord>, FramingError> {
        loop {
            match self.state {
                State::Done | State::Failed => return Ok(None),
                _ if self.limit > 0 && self.read >= self.limit => {
                    self.state = State::Done;
                    return Ok(None);
                }
                State::Open => match self.peek_non_ws()? {
                    Some(b'[') => {
                        self.bump();
                        self.state = State::First;
                    }
                    Some(b) => return Err(FramingError::malformed(self.offset, format!("expected '[' but found {:?}", b as char))),
                    None => return Err(FramingError::malformed(self.offset, "empty input, expected '['")),
                },
                State::First => match self.peek_non_ws()? {
                    Some(b']') => {
                        self.bump();
                        return self.close();
                    }
                    Some(b) if !starts_element(b) => {
                        return Err(FramingError::malformed(self.offset, format!("expected record, found {:?}", b as char)))
                    }
                    Some(_) => return self.element().map(Some),
                    None => return Err(FramingError::malformed(self.offset, "unexpected end of input, missing ']'")),
                },
                State::Next => match self.peek_non_ws()? {
                    Some(b',') => {
                        self.bump();
                        match self.peek_non_ws()? {
                            Some(b) if !starts_element(b) => {
                                return Err(FramingError::malformed(self.offset, format!("expected record after ',', found {:?}", b as char)))
                            }
                            Some(_) => return self.element().map(Some),
                            None => return Err(FramingError::malformed(self.offset, "unexpected end of input after ','")),
                        }
                    }
                    Some(b']') => {
                        self.bump();
                        return self.close();
                    }
                    Some(b) => return Err(FramingError::malformed(self.offset, format!("expected ',' or ']' but found {:?}", b as char))),
                    None => return Err(FramingError::malformed(self.offset, "unexpected end of input, missing ']'")),
                },
            }
        }
    }

    fn close(&mut self) -> Result<Option<RawRecord>, FramingError> {
        if self.peek_non_ws()?.is_some() {
            return Err(FramingError::malformed(self.offset, "trailing data after closing ']'"));
        }
        self.state = State::Done;
        Ok(None)
    }

    fn element(&mut self) -> Result<RawRecord, FramingError> {
        let mut bytes = Vec::with_capacity(2048);
        let mut scan = ElementScan::default();
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                if scan.depth > 0 || scan.in_string {
                    return Err(FramingError::malformed(self.offset, "unexpected end of input inside record"));
                }
                break;
            }
            let (used, done) = scan.feed(buf);
            bytes.extend_from_slice(&buf[..used]);
            self.reader.consume(used);
            self.offset += used as u64;
            if done {
                break;
            }
        }
        let record = RawRecord { index: self.read, bytes };
        self.read += 1;
        self.state = State::Next;
        Ok(record)
    }

    fn peek_non_ws(&mut self) -> Result<Option<u8>, FramingError> {
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }
            match buf.iter().position(|b| !b.is_ascii_whitespace()) {
                Some(pos) => {
                    let b = buf[pos];
                    self.reader.consume(pos);
                    self.offset += pos as u64;
                    return Ok(Some(b));
                }
                None => {
                    let n = buf.len();
                    self.reader.consume(n);
                    self.offset += n as u64;
                }
            }
        }
    }

    fn bump(&mut self) {
        self.reader.consume(1);
        self.offset += 1;
    }
}

impl<R: BufRead> Iterator for RecordDecoder<R> {
    type Item = Result<RawRecord, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(rec) => rec.map(Ok),
            Err(e) => {
                self.state = State::Failed;
                Some(Err(e))
            }
        }
    }
}

/// Separators and closers can never open an element.
fn starts_element(b: u8) -> bool {
    !matches!(b, b',' | b'}' | b']' | b':')
}

/// Bracket/string tracker for one element. Stops at the byte that closes the
/// element, or before the separator that ends a bare scalar.
#[derive(Default)]
struct ElementScan {
    depth: u32,
    in_string: bool,
    escaped: bool,
}

impl ElementScan {
    fn feed(&mut self, buf: &[u8]) -> (usize, bool) {
        for (i, &b) in buf.iter().enumerate() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                    if self.depth == 0 {
                        return (i + 1, true);
                    }
                }
                continue;
            }
            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    if self.depth == 0 {
                        return (i, true);
                    }
                    self.depth -= 1;
                    if self.depth == 0 {
                        return (i + 1, true);
                    }
                }
                b',' if self.depth == 0 => return (i, true),
                b if b.is_ascii_whitespace() && self.depth == 0 => return (i, true),
                _ => {}
            }
        }
        (buf.len(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn payloads(input: &str, limit: u64) -> Result<Vec<String>, FramingError> {
        RecordDecoder::with_limit(Cursor::new(input.as_bytes().to_vec()), limit)
            .map(|r| r.map(|rec| String::from_utf8(rec.bytes).unwrap()))
            .collect()
    }

    #[test]
    fn splits_objects() {
        let got = payloads("[\n{\"a\":1},\n{\"b\":[1,2,{\"c\":\"]}\"}]}\n]\n", 0).unwrap();
        assert_eq!(got, vec![r#"{"a":1}"#, r#"{"b":[1,2,{"c":"]}"}]}"#]);
    }

    #[test]
    fn escaped_quotes_inside_strings() {
        let got = payloads(r#"[{"n":"say \"hi\", }"},{"n":"\\"}]"#, 0).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[1], r#"{"n":"\\"}"#);
    }

    #[test]
    fn empty_array_and_scalars() {
        assert!(payloads("  [ ]  ", 0).unwrap().is_empty());
        assert_eq!(payloads("[1, \"x\" ,null]", 0).unwrap(), vec!["1", "\"x\"", "null"]);
    }

    #[test]
    fn limit_stops_without_reading_closing_bracket() {
        let mut dec = RecordDecoder::with_limit(Cursor::new(b"[{},{},{},{".to_vec()), 2);
        assert!(dec.next().unwrap().is_ok());
        assert!(dec.next().unwrap().is_ok());
        assert!(dec.next().is_none());
        assert_eq!(dec.records_read(), 2);
    }

    #[test]
    fn framing_failures() {
        for bad in ["", "{\"a\":1}", "[{\"a\":1}", "[{\"a\":1} {\"b\":2}]", "[{\"a\":1}]x", "[{\"a\":", "[,{}]", "[{},]"] {
            assert!(payloads(bad, 0).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn stray_closer_is_not_a_record() {
        for bad in ["[}]", "[]]", "[{},}]", "[{}, ]]", "[:]"] {
            let mut dec = RecordDecoder::new(Cursor::new(bad.as_bytes().to_vec()));
            let first_err = dec.by_ref().find_map(|r| r.err());
            assert!(first_err.is_some(), "{bad:?} should fail");
        }
        let mut dec = RecordDecoder::new(Cursor::new(b"[}]".to_vec()));
        assert!(matches!(dec.next(), Some(Err(FramingError::Malformed { offset: 1, .. }))));
        assert_eq!(dec.records_read(), 0);
        assert!(dec.next().is_none());
    }

    #[test]
    fn error_is_yielded_once() {
        let mut dec = RecordDecoder::new(Cursor::new(b"[{},".to_vec()));
        assert!(dec.next().unwrap().is_ok());
        assert!(matches!(dec.next(), Some(Err(FramingError::Malformed { .. }))));
        assert!(dec.next().is_none());
    }

    #[test]
    fn works_across_small_buffers() {
        let input = r#"[{"name":"A 1","parents":[{"Star":0}]},{"name":"A 2"}]"#;
        let reader = BufReader::with_capacity(3, Cursor::new(input.as_bytes().to_vec()));
        let got: Vec<_> = RecordDecoder::new(reader).collect::<Result<_, _>>().unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].index, 1);
        assert_eq!(got[1].bytes, br#"{"name":"A 2"}"#.to_vec());
    }
}

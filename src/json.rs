//! Minimal JSON span scanner
//!
//! The upstream payloads are far larger than anything we want to
//! deserialize in one go (the live payload carries every player in the
//! league). The scanner walks the raw bytes and hands out the byte span of a
//! field or array item, which is then decoded on its own with
//! `serde_json_core`.
//!
//! Only structure is checked here; values are validated by the decoder.

use heapless::String;

/// Scanner failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    /// Input ended inside a value (short read)
    Truncated,
    /// Input is not the expected JSON shape
    Malformed,
}

fn skip_ws(buf: &[u8], mut i: usize) -> usize {
    while i < buf.len() && matches!(buf[i], b' ' | b'\t' | b'\n' | b'\r') {
        i += 1;
    }
    i
}

/// Index just past the string starting at `i` (which must be `"`)
fn string_end(buf: &[u8], i: usize) -> Result<usize, ScanError> {
    let mut j = i + 1;
    while j < buf.len() {
        match buf[j] {
            b'\\' => j += 2,
            b'"' => return Ok(j + 1),
            _ => j += 1,
        }
    }
    Err(ScanError::Truncated)
}

/// Index just past the value starting at `i`
fn value_end(buf: &[u8], i: usize) -> Result<usize, ScanError> {
    let Some(&first) = buf.get(i) else {
        return Err(ScanError::Truncated);
    };
    match first {
        b'"' => string_end(buf, i),
        b'{' | b'[' => {
            let mut depth = 0usize;
            let mut j = i;
            while j < buf.len() {
                match buf[j] {
                    b'"' => {
                        j = string_end(buf, j)?;
                        continue;
                    }
                    b'{' | b'[' => depth += 1,
                    b'}' | b']' => {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(j + 1);
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            Err(ScanError::Truncated)
        }
        b'}' | b']' | b',' | b':' => Err(ScanError::Malformed),
        _ => {
            let mut j = i;
            while j < buf.len() && !matches!(buf[j], b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r')
            {
                j += 1;
            }
            if j == buf.len() {
                // A bare scalar running into the end is only complete at top level
                return if i == 0 { Ok(j) } else { Err(ScanError::Truncated) };
            }
            Ok(j)
        }
    }
}

/// Span of the value stored under `key` in the object `obj`.
///
/// Keys are compared byte for byte, so they must not contain escapes.
pub fn field<'a>(obj: &'a [u8], key: &str) -> Result<Option<&'a [u8]>, ScanError> {
    let mut i = skip_ws(obj, 0);
    match obj.get(i) {
        None => return Err(ScanError::Truncated),
        Some(b'{') => i += 1,
        Some(_) => return Err(ScanError::Malformed),
    }

    loop {
        i = skip_ws(obj, i);
        match obj.get(i) {
            None => return Err(ScanError::Truncated),
            Some(b'}') => return Ok(None),
            Some(b'"') => {}
            Some(_) => return Err(ScanError::Malformed),
        }
        let key_end = string_end(obj, i)?;
        let found = &obj[i + 1..key_end - 1] == key.as_bytes();

        i = skip_ws(obj, key_end);
        match obj.get(i) {
            None => return Err(ScanError::Truncated),
            Some(b':') => i += 1,
            Some(_) => return Err(ScanError::Malformed),
        }
        i = skip_ws(obj, i);
        let end = value_end(obj, i)?;
        if found {
            return Ok(Some(&obj[i..end]));
        }

        i = skip_ws(obj, end);
        match obj.get(i) {
            None => return Err(ScanError::Truncated),
            Some(b',') => i += 1,
            Some(b'}') => return Ok(None),
            Some(_) => return Err(ScanError::Malformed),
        }
    }
}

/// Iterator over the item spans of a JSON array
pub struct Items<'a> {
    buf: &'a [u8],
    pos: usize,
    started: bool,
    done: bool,
}

/// Iterate the items of the array span `array`
pub fn items(array: &[u8]) -> Items<'_> {
    Items {
        buf: array,
        pos: 0,
        started: false,
        done: false,
    }
}

impl<'a> Items<'a> {
    fn fail(&mut self, err: ScanError) -> Option<Result<&'a [u8], ScanError>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<'a> Iterator for Items<'a> {
    type Item = Result<&'a [u8], ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let buf = self.buf;
        let mut i = skip_ws(buf, self.pos);

        if !self.started {
            self.started = true;
            match buf.get(i) {
                None => return self.fail(ScanError::Truncated),
                Some(b'[') => i = skip_ws(buf, i + 1),
                Some(_) => return self.fail(ScanError::Malformed),
            }
            if buf.get(i) == Some(&b']') {
                self.done = true;
                return None;
            }
        } else {
            match buf.get(i) {
                None => return self.fail(ScanError::Truncated),
                Some(b',') => i = skip_ws(buf, i + 1),
                Some(b']') => {
                    self.done = true;
                    return None;
                }
                Some(_) => return self.fail(ScanError::Malformed),
            }
        }

        match value_end(buf, i) {
            Ok(end) => {
                self.pos = end;
                Some(Ok(&buf[i..end]))
            }
            Err(err) => self.fail(err),
        }
    }
}

fn hex4(buf: &[u8]) -> Option<u32> {
    let digits = core::str::from_utf8(buf.get(..4)?).ok()?;
    u32::from_str_radix(digits, 16).ok()
}

/// Decode a JSON string span (quotes included) into `N` bytes, truncating.
///
/// Escapes outside the basic multilingual plane are dropped.
pub fn unescape<const N: usize>(span: &[u8]) -> Result<String<N>, ScanError> {
    if span.len() < 2 || span[0] != b'"' || span[span.len() - 1] != b'"' {
        return Err(ScanError::Malformed);
    }
    let raw = core::str::from_utf8(&span[1..span.len() - 1]).map_err(|_| ScanError::Malformed)?;

    let mut out = String::new();
    let mut chars = raw.char_indices();
    while let Some((idx, c)) = chars.next() {
        let decoded = if c == '\\' {
            match chars.next().map(|(_, e)| e) {
                Some('"') => Some('"'),
                Some('\\') => Some('\\'),
                Some('/') => Some('/'),
                Some('b') => Some('\u{8}'),
                Some('f') => Some('\u{c}'),
                Some('n') => Some('\n'),
                Some('r') => Some('\r'),
                Some('t') => Some('\t'),
                Some('u') => {
                    let code = hex4(&raw.as_bytes()[idx + 2..]).ok_or(ScanError::Malformed)?;
                    for _ in 0..4 {
                        chars.next();
                    }
                    char::from_u32(code)
                }
                _ => return Err(ScanError::Malformed),
            }
        } else {
            Some(c)
        };
        if let Some(c) = decoded {
            if out.push(c).is_err() {
                break;
            }
        }
    }
    Ok(out)
}

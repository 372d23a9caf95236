//! Incremental `text/event-stream` line decoder.
//!
//! Bytes arrive in arbitrary chunks. [`SseDecoder`] keeps the unconsumed tail
//! in a pending buffer, splits on `\n` at the byte level (so a multi-byte UTF-8
//! character split across chunks is never decoded half-way), and yields one
//! [`SseRecord`] per `data:` line together with the `event:` name of the block
//! it belongs to.
//!
//! ```text
//! event: token\r\n
//! data: {"content": "He"}\r\n
//! \r\n                          <- blank line ends the block
//! ```

use crate::core::error::DomainError;

/// A single `data:` line and the name of the block that carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseRecord {
    /// Value of the block's `event:` field, if one preceded this line.
    pub event: Option<String>,
    /// Raw payload after `data:`.
    pub data: String,
}

/// Pull-based event-stream decoder.
///
/// Call [`feed`](Self::feed) with each chunk, then drain
/// [`next_record`](Self::next_record) until it returns `None`. When the body
/// ends, [`finish`](Self::finish) flushes a final line that had no trailing
/// newline.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    /// Offset of the first unconsumed byte in `pending`.
    start: usize,
    event: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of body bytes.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.start > 0 {
            self.pending.drain(..self.start);
            self.start = 0;
        }
        self.pending.extend_from_slice(chunk);
    }

    /// Bytes buffered but not yet terminated by a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.start
    }

    /// Next complete `data:` record, or `None` when only an incomplete line
    /// (or nothing) remains.
    pub fn next_record(&mut self) -> Option<Result<SseRecord, DomainError>> {
        loop {
            let rel = self.pending[self.start..].iter().position(|b| *b == b'\n')?;
            let end = self.start + rel;
            let line = self.pending[self.start..end].to_vec();
            self.start = end + 1;

            match self.process_line(&line) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Treat whatever is left in the buffer as a final, complete line.
    pub fn finish(&mut self) -> Option<Result<SseRecord, DomainError>> {
        if self.pending_len() == 0 {
            return None;
        }
        let line = self.pending[self.start..].to_vec();
        self.pending.clear();
        self.start = 0;
        self.process_line(&line).transpose()
    }

    fn process_line(&mut self, raw: &[u8]) -> Result<Option<SseRecord>, DomainError> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.is_empty() {
            // Blank line: end of block
            self.event = None;
            return Ok(None);
        }

        let line = std::str::from_utf8(raw).map_err(|_| DomainError::InvalidUtf8)?;
        if line.starts_with(':') {
            return Ok(None);
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => {
                let name = value.trim();
                self.event = (!name.is_empty()).then(|| name.to_string());
                Ok(None)
            }
            "data" => Ok(Some(SseRecord {
                event: self.event.clone(),
                data: value.to_string(),
            })),
            // id:, retry: and unknown fields carry nothing the client needs
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(decoder: &mut SseDecoder) -> Vec<SseRecord> {
        let mut out = Vec::new();
        while let Some(record) = decoder.next_record() {
            out.push(record.unwrap());
        }
        out
    }

    fn data(event: Option<&str>, data: &str) -> SseRecord {
        SseRecord {
            event: event.map(str::to_string),
            data: data.to_string(),
        }
    }

    #[test]
    fn decodes_named_blocks() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"event: start\ndata: {\"sources\": []}\n\nevent: token\ndata: {\"content\": \"A\"}\n\n");

        assert_eq!(
            drain(&mut decoder),
            vec![
                data(Some("start"), "{\"sources\": []}"),
                data(Some("token"), "{\"content\": \"A\"}"),
            ]
        );
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn event_name_resets_after_blank_line() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"event: token\ndata: 1\n\ndata: 2\n");

        let records = drain(&mut decoder);
        assert_eq!(records[0].event.as_deref(), Some("token"));
        assert_eq!(records[1].event, None);
    }

    #[test]
    fn crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"event: done\r\ndata: {}\r\n\r\n");
        assert_eq!(drain(&mut decoder), vec![data(Some("done"), "{}")]);
    }

    #[test]
    fn incomplete_line_stays_buffered() {
        let mut decoder = SseDecoder::new();
        let head = b"data: {\"content\": \"He";
        decoder.feed(head);
        assert!(decoder.next_record().is_none());
        assert_eq!(decoder.pending_len(), head.len());

        decoder.feed(b"llo\"}\n");
        assert_eq!(drain(&mut decoder), vec![data(None, "{\"content\": \"Hello\"}")]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let bytes = "data: {\"content\": \"héllo ✓\"}\n".as_bytes();
        let mut decoder = SseDecoder::new();
        let mut records = Vec::new();
        for byte in bytes {
            decoder.feed(std::slice::from_ref(byte));
            records.extend(drain(&mut decoder));
        }
        assert_eq!(records, vec![data(None, "{\"content\": \"héllo ✓\"}")]);
    }

    #[test]
    fn comments_and_unknown_fields_are_skipped() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b": ping - 2024-01-01\nid: 7\nretry: 1500\ndata: x\n");
        assert_eq!(drain(&mut decoder), vec![data(None, "x")]);
    }

    #[test]
    fn data_without_space_after_colon() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"data:{\"a\":1}\n");
        assert_eq!(drain(&mut decoder), vec![data(None, "{\"a\":1}")]);
    }

    #[test]
    fn finish_flushes_unterminated_final_line() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"event: done\ndata: {\"content\": \"x\"}");
        assert!(decoder.next_record().is_none());

        let record = decoder.finish().unwrap().unwrap();
        assert_eq!(record, data(Some("done"), "{\"content\": \"x\"}"));
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn invalid_utf8_line_is_an_error() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"data: \xff\xfe\n");
        assert_eq!(decoder.next_record(), Some(Err(DomainError::InvalidUtf8)));
    }
}

//! Newline-delimited framing for the collector's stdout.
//!
//! Reads from a pipe arrive in arbitrary chunks: half a record, several
//! records, or a record split exactly on its delimiter. [`FrameDecoder`] keeps
//! the unconsumed tail between calls so every record comes out whole, once.

/// One delimiter-bounded record, delimiter stripped and whitespace trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame(Vec<u8>);

impl RawFrame {
    fn from_line(line: &[u8]) -> Option<Self> {
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_vec()))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for RawFrame {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    // bytes of `buf` already known to contain no delimiter
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `input` and iterate over every frame it completes.
    ///
    /// The iterator is lazy; frames it does not get to stay buffered and are
    /// yielded by the next call.
    pub fn feed(&mut self, input: &[u8]) -> Frames<'_> {
        self.buf.extend_from_slice(input);
        Frames { decoder: self }
    }

    /// Flush the unterminated tail at end of stream.
    pub fn finish(&mut self) -> Option<RawFrame> {
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buf);
        RawFrame::from_line(&rest)
    }

    /// Bytes held back waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn next_frame(&mut self) -> Option<RawFrame> {
        loop {
            let Some(rel) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') else {
                self.scanned = self.buf.len();
                return None;
            };
            let end = self.scanned + rel;
            self.scanned = 0;
            let frame = RawFrame::from_line(&self.buf[..end]);
            self.buf.drain(..=end);
            if frame.is_some() {
                return frame;
            }
        }
    }
}

pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Frames<'_> {
    type Item = RawFrame;

    fn next(&mut self) -> Option<RawFrame> {
        self.decoder.next_frame()
    }
}

/// Decode `chunks` in order through one decoder, collecting every frame.
pub fn decode_all<'a, I>(chunks: I) -> Vec<RawFrame>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut decoder = FrameDecoder::new();
    let mut frames = Vec::new();
    for chunk in chunks {
        frames.extend(decoder.feed(chunk));
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &[u8] = concat!(
        "{\"ok\":true,\"cpu_percent\":12.5}\n\n",
        "  {\"ok\":false,\"error\":\"x\"}\r\n{\"ok\":true}\n",
    )
    .as_bytes();

    fn texts(frames: &[RawFrame]) -> Vec<String> {
        frames
            .iter()
            .map(|f| String::from_utf8_lossy(f.as_bytes()).into_owned())
            .collect()
    }

    #[test]
    fn whole_stream_yields_trimmed_nonempty_frames() {
        let frames = decode_all([STREAM]);
        assert_eq!(
            texts(&frames),
            vec![
                "{\"ok\":true,\"cpu_percent\":12.5}",
                "{\"ok\":false,\"error\":\"x\"}",
                "{\"ok\":true}",
            ]
        );
    }

    #[test]
    fn every_single_split_matches_whole() {
        let whole = decode_all([STREAM]);
        for cut in 0..=STREAM.len() {
            let (a, b) = STREAM.split_at(cut);
            assert_eq!(decode_all([a, b]), whole, "split at {cut}");
        }
    }

    #[test]
    fn every_double_split_matches_whole() {
        let whole = decode_all([STREAM]);
        for i in 0..=STREAM.len() {
            for j in i..=STREAM.len() {
                let chunks = [&STREAM[..i], &STREAM[i..j], &STREAM[j..]];
                assert_eq!(decode_all(chunks), whole, "splits at {i},{j}");
            }
        }
    }

    #[test]
    fn byte_at_a_time() {
        let whole = decode_all([STREAM]);
        let chunks: Vec<&[u8]> = STREAM.chunks(1).collect();
        assert_eq!(decode_all(chunks), whole);
    }

    #[test]
    fn delimiter_at_chunk_boundary() {
        let mut d = FrameDecoder::new();
        assert!(d.feed(b"{\"ok\":true}").next().is_none());
        assert_eq!(d.pending(), 11);
        let frames: Vec<_> = d.feed(b"\n").collect();
        assert_eq!(texts(&frames), vec!["{\"ok\":true}"]);
        assert_eq!(d.pending(), 0);
    }

    #[test]
    fn partial_record_stays_buffered() {
        let mut d = FrameDecoder::new();
        let first: Vec<_> = d.feed(b"{\"ok\":true}\n{\"ok\":").collect();
        assert_eq!(first.len(), 1);
        assert_eq!(d.pending(), 6);
        let second: Vec<_> = d.feed(b"false,\"error\":\"x\"}\n").collect();
        assert_eq!(texts(&second), vec!["{\"ok\":false,\"error\":\"x\"}"]);
    }

    #[test]
    fn large_record_across_many_chunks() {
        let big = format!("{{\"pad\":\"{}\"}}\n", "a".repeat(256 * 1024));
        let chunks: Vec<&[u8]> = big.as_bytes().chunks(4096).collect();
        let frames = decode_all(chunks);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes().len(), big.len() - 1);
    }

    #[test]
    fn unconsumed_frames_survive_into_next_feed() {
        let mut d = FrameDecoder::new();
        let mut it = d.feed(b"a\nb\nc\n");
        assert_eq!(it.next(), Some(RawFrame::from("a")));
        drop(it);
        let rest: Vec<_> = d.feed(b"d\n").collect();
        assert_eq!(texts(&rest), vec!["b", "c", "d"]);
    }

    #[test]
    fn blank_lines_dropped() {
        assert!(decode_all([b"\n\n   \n\t\r\n".as_slice()]).is_empty());
    }

    #[test]
    fn finish_flushes_unterminated_tail() {
        let mut d = FrameDecoder::new();
        assert_eq!(d.feed(b"{\"ok\":true}").count(), 0);
        assert_eq!(d.finish(), Some(RawFrame::from("{\"ok\":true}")));
        assert_eq!(d.finish(), None);
        assert_eq!(d.pending(), 0);
    }
}

//! Output reader for child process diagnostics.
//!
//! ffmpeg may rewrite a terminal line with carriage returns (`\r`). When
//! stderr is piped those updates are not newline-delimited, so records are
//! split on either `\n` or `\r`. A record longer than the configured ceiling
//! is reported as an error so a runaway line cannot grow the buffer without
//! bound.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

/// Reads an async stream and yields text records delimited by `\n` or `\r`.
pub struct OutputRecordReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    scratch: [u8; 4096],
    max_record_bytes: usize,
}

impl<R> OutputRecordReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, max_record_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
            scratch: [0u8; 4096],
            max_record_bytes,
        }
    }

    /// Returns the next non-empty record, or `None` at end of stream.
    ///
    /// Consecutive delimiters are skipped. Cancel safe: no buffered data is
    /// lost if the future is dropped.
    pub async fn next_record(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(idx) = find_record_delimiter(&self.pending) {
                if idx > self.max_record_bytes {
                    return Err(self.oversized());
                }
                let record_bytes: Vec<u8> = self.pending.drain(..idx).collect();
                consume_delimiters(&mut self.pending);

                let record = String::from_utf8_lossy(&record_bytes).trim().to_string();
                if record.is_empty() {
                    continue;
                }
                return Ok(Some(record));
            }

            if self.pending.len() > self.max_record_bytes {
                return Err(self.oversized());
            }

            let n = self.reader.read(&mut self.scratch).await?;
            if n == 0 {
                if self.pending.is_empty() {
                    return Ok(None);
                }

                let record = String::from_utf8_lossy(&self.pending).trim().to_string();
                self.pending.clear();

                if record.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(record));
            }

            self.pending.extend_from_slice(&self.scratch[..n]);
        }
    }

    fn oversized(&mut self) -> io::Error {
        self.pending.clear();
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("diagnostic line exceeds {} bytes", self.max_record_bytes),
        )
    }
}

fn find_record_delimiter(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| matches!(b, b'\n' | b'\r'))
}

fn consume_delimiters(buf: &mut Vec<u8>) {
    let n = buf
        .iter()
        .take_while(|&&b| matches!(b, b'\n' | b'\r'))
        .count();
    if n > 0 {
        buf.drain(..n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn collect(input: &'static [u8], max: usize) -> (Vec<String>, Option<io::Error>) {
        let (mut tx, rx) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            let _ = tx.write_all(input).await;
        });

        let mut reader = OutputRecordReader::new(rx, max);
        let mut records = Vec::new();
        loop {
            match reader.next_record().await {
                Ok(Some(line)) => records.push(line),
                Ok(None) => return (records, None),
                Err(e) => return (records, Some(e)),
            }
        }
    }

    #[tokio::test]
    async fn splits_on_cr_and_lf() {
        let (records, err) = collect(b"one\rtwo\nthree\r\nfour", 1024).await;
        assert!(err.is_none());
        assert_eq!(records, vec!["one", "two", "three", "four"]);
    }

    #[tokio::test]
    async fn skips_blank_records() {
        let (records, err) = collect(b"\n\n  \nsilence_start: 1\n\n", 1024).await;
        assert!(err.is_none());
        assert_eq!(records, vec!["silence_start: 1"]);
    }

    #[tokio::test]
    async fn oversized_record_is_an_error() {
        let (records, err) = collect(b"short\n0123456789abcdef\nnext\n", 8).await;
        assert_eq!(records, vec!["short"]);
        let err = err.expect("oversized line must fail");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn oversized_unterminated_record_is_an_error() {
        static LONG: [u8; 10_000] = [b'x'; 10_000];
        let (records, err) = collect(&LONG, 4096).await;
        assert!(records.is_empty());
        assert!(err.is_some());
    }
}

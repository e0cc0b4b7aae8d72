// Newline-delimited message framing.
//
// Each message is one line: the JSON body followed by `\n`. Readers also
// accept `\r\n` (terminal clients) and skip blank lines. Both functions work
// on raw bytes; JSON encoding and decoding live in `codec.rs`.
//
// `MAX_MESSAGE_SIZE` (64 KiB) bounds a single line so a peer that never sends
// a newline cannot make the reader buffer without limit. The largest real
// messages are lineups, which are a few hundred bytes.

use std::io::{self, BufRead, Read, Write};

/// Maximum allowed line length, excluding the terminator.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Write one message followed by a newline, then flush.
pub fn write_message<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    let len = msg.len();
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    if msg.contains(&b'\n') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "message body contains a newline",
        ));
    }
    writer.write_all(msg)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Read the next non-blank line, without its terminator.
///
/// Returns `UnexpectedEof` if the stream ends before any byte of a message.
/// A final line that ends at EOF without a newline is still returned.
/// Returns `InvalidData` if a line exceeds `MAX_MESSAGE_SIZE`.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Vec<u8>> {
    loop {
        let mut line = Vec::new();
        let limit = MAX_MESSAGE_SIZE as u64 + 2;
        let read = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream closed",
            ));
        }

        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        if line.len() > MAX_MESSAGE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("message too large: more than {MAX_MESSAGE_SIZE} bytes"),
            ));
        }

        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        return Ok(line);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn roundtrip_simple_message() {
        let mut buf = Vec::new();
        write_message(&mut buf, br#"{"type":"SCORE"}"#).unwrap();
        assert_eq!(buf, b"{\"type\":\"SCORE\"}\n");

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_message(&mut cursor).unwrap(), br#"{"type":"SCORE"}"#);
    }

    #[test]
    fn strips_carriage_return() {
        let mut cursor = Cursor::new(b"{\"type\":\"RESET\"}\r\n".to_vec());
        assert_eq!(read_message(&mut cursor).unwrap(), br#"{"type":"RESET"}"#);
    }

    #[test]
    fn skips_blank_lines() {
        let mut cursor = Cursor::new(b"\n  \r\n{}\n".to_vec());
        assert_eq!(read_message(&mut cursor).unwrap(), b"{}");
    }

    #[test]
    fn final_line_without_newline() {
        let mut cursor = Cursor::new(b"{}".to_vec());
        assert_eq!(read_message(&mut cursor).unwrap(), b"{}");
        let err = read_message(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn empty_stream_is_eof() {
        let mut cursor = Cursor::new(Vec::new());
        let err = read_message(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn rejects_oversized_write() {
        let big = vec![b'x'; MAX_MESSAGE_SIZE + 1];
        let mut buf = Vec::new();
        let err = write_message(&mut buf, &big).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_embedded_newline() {
        let mut buf = Vec::new();
        let err = write_message(&mut buf, b"a\nb").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn rejects_oversized_read() {
        let mut wire = vec![b'x'; MAX_MESSAGE_SIZE + 10];
        wire.push(b'\n');
        let mut cursor = Cursor::new(wire);
        let err = read_message(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn accepts_line_at_exact_limit() {
        let mut wire = vec![b'x'; MAX_MESSAGE_SIZE];
        wire.extend_from_slice(b"\r\n");
        let mut cursor = Cursor::new(wire);
        assert_eq!(read_message(&mut cursor).unwrap().len(), MAX_MESSAGE_SIZE);
    }

    #[test]
    fn multiple_messages_in_sequence() {
        let messages: [&[u8]; 3] = [b"first", b"second", b"third"];
        let mut buf = Vec::new();
        for msg in messages {
            write_message(&mut buf, msg).unwrap();
        }

        let mut cursor = Cursor::new(buf);
        for expected in messages {
            assert_eq!(read_message(&mut cursor).unwrap(), expected);
        }
    }
}

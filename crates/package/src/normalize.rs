use std::io::{self, Read, Write};

/// Size of each read while copying entry bodies.
pub const BUFFER_SIZE: usize = 4096;

/// Bytes at the head of a body inspected to decide text vs binary.
pub const SAMPLE_LEN: usize = 200;

/// True when every sampled byte is a control character in `8..=13` or a printable byte below
/// `0xF0`. Anything else marks the body as binary.
///
/// `0xF0..=0xFE` counts as binary, so UTF-8 text with a four-byte character (emoji, rare CJK)
/// inside the sample is copied without CRLF normalization.
pub fn is_text_sample(sample: &[u8]) -> bool {
    sample
        .iter()
        .all(|&b| (8..=13).contains(&b) || (32..=0xEF).contains(&b))
}

/// Copy `reader` into `writer`. Text bodies get a CR inserted before every LF that is not
/// already preceded by one; binary bodies pass through unchanged. Returns the bytes written.
pub fn copy_normalized<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> io::Result<u64> {
    let mut buffer = vec![0u8; BUFFER_SIZE];

    // The first read is topped up to the sample size so the classification does not depend on
    // how the source chunks its data.
    let mut filled = 0;
    while filled < SAMPLE_LEN {
        let n = reader.read(&mut buffer[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    let text = is_text_sample(&buffer[..filled.min(SAMPLE_LEN)]);
    if !text {
        writer.write_all(&buffer[..filled])?;
        let rest = io::copy(reader, writer)?;
        return Ok(filled as u64 + rest);
    }

    let mut written = 0u64;
    let mut previous_cr = false;
    let mut out = Vec::with_capacity(BUFFER_SIZE * 2);
    let mut chunk = filled;
    while chunk > 0 {
        out.clear();
        for &byte in &buffer[..chunk] {
            if byte == b'\n' && !previous_cr {
                out.push(b'\r');
            }
            previous_cr = byte == b'\r';
            out.push(byte);
        }
        writer.write_all(&out)?;
        written += out.len() as u64;
        chunk = reader.read(&mut buffer)?;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalize(input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        copy_normalized(&mut &input[..], &mut out).unwrap();
        out
    }

    /// Hands out one byte per read call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((first, rest)) if !buf.is_empty() => {
                    buf[0] = *first;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn bare_line_feeds_gain_carriage_returns() {
        assert_eq!(normalize(b"a\nb\r\nc\n"), b"a\r\nb\r\nc\r\n".to_vec());
    }

    #[test]
    fn binary_bodies_are_untouched() {
        let mut body = vec![0x89, b'P', b'N', b'G', b'\n', 0x00, 0xF3];
        body.extend(std::iter::repeat(b'\n').take(10));
        assert_eq!(normalize(&body), body);
    }

    #[test]
    fn high_bytes_below_f0_still_count_as_text() {
        assert!(is_text_sample("café\n".as_bytes()));
        assert!(!is_text_sample(&[b'a', 0xF0]));
        assert!(!is_text_sample(&[b'a', 0x07]));
        assert!(is_text_sample(b""));
    }

    #[test]
    fn four_byte_utf8_in_sample_skips_normalization() {
        let body = "ok \u{1F600}\nnext\n".as_bytes();
        assert_eq!(normalize(body), body.to_vec());
    }

    #[test]
    fn crlf_split_across_buffers_is_not_doubled() {
        let mut input = vec![b'x'; BUFFER_SIZE - 1];
        input.extend_from_slice(b"\r\nend\n");
        let out = normalize(&input);

        let mut expected = vec![b'x'; BUFFER_SIZE - 1];
        expected.extend_from_slice(b"\r\nend\r\n");
        assert_eq!(out, expected);
    }

    #[test]
    fn classification_ignores_read_chunking() {
        let mut out = Vec::new();
        copy_normalized(&mut Trickle(b"line\r\nnext\n"), &mut out).unwrap();
        assert_eq!(out, b"line\r\nnext\r\n".to_vec());
    }

    #[test]
    fn only_the_sample_decides() {
        let mut body = vec![b'a'; SAMPLE_LEN];
        body.extend_from_slice(&[0x00, b'\n']);
        let out = normalize(&body);
        assert_eq!(&out[SAMPLE_LEN..], &[0x00, b'\r', b'\n']);
    }
}

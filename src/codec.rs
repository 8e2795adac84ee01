use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Decodes raw bytes in the source charset into UTF-8 text chunks.
///
/// A multibyte sequence cut by a read boundary is held inside the
/// `encoding_rs` decoder until the rest arrives, so every chunk is valid text.
pub struct Transcoder {
    decoder: encoding_rs::Decoder,
    finished: bool,
}

impl Transcoder {
    pub fn new(encoding: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
            finished: false,
        }
    }

    fn transcode(&mut self, src: &[u8], last: bool) -> io::Result<(usize, String)> {
        let max = if last {
            self.decoder.max_utf8_buffer_length(src.len())
        } else {
            self.decoder
                .max_utf8_buffer_length_without_replacement(src.len())
        };

        let mut temp_out = vec![0; max.unwrap_or_else(|| src.len() * 3 + 16)];
        let (_result, bytes_read, bytes_written, _has_errors) =
            self.decoder.decode_to_utf8(src, &mut temp_out, last);
        temp_out.truncate(bytes_written);

        let text = String::from_utf8(temp_out)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok((bytes_read, text))
    }
}

impl Decoder for Transcoder {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let (bytes_read, text) = self.transcode(src, false)?;
        if bytes_read == 0 && text.is_empty() {
            return Ok(None);
        }

        src.advance(bytes_read);
        Ok(Some(text))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.finished {
            return Ok(None);
        }
        self.finished = true;

        // Flushes any partial sequence still held by the decoder.
        let (_bytes_read, text) = self.transcode(buf, true)?;
        buf.clear();

        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_split_utf8_sequence_until_complete() {
        let mut codec = Transcoder::new(encoding_rs::UTF_8);
        let bytes = "José".as_bytes();
        let (head, tail) = bytes.split_at(bytes.len() - 1);

        let mut buf = BytesMut::from(head);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("Jos"));
        assert!(buf.is_empty());

        buf.extend_from_slice(tail);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("é"));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn transcodes_latin1() {
        let mut codec = Transcoder::new(encoding_rs::WINDOWS_1252);
        let mut buf = BytesMut::from(&b"Mu\xf1oz"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("Muñoz"));
    }

    #[test]
    fn truncated_sequence_at_eof_becomes_replacement_char() {
        let mut codec = Transcoder::new(encoding_rs::UTF_8);
        let mut buf = BytesMut::from(&b"ab\xc3"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("ab"));
        assert_eq!(
            codec.decode_eof(&mut buf).unwrap().as_deref(),
            Some("\u{FFFD}")
        );
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }
}

//! Gzip precompression.

use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::Compression;

/// Gzip `data` at the default level.
pub fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Gzip `data` and keep the result only if it is strictly smaller.
pub fn shrink(data: &[u8]) -> io::Result<Option<Vec<u8>>> {
    let compressed = gzip(data)?;
    Ok((compressed.len() < data.len()).then_some(compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn repetitive_text_shrinks_and_decodes() {
        let data = "hello static world\n".repeat(200);
        let compressed = shrink(data.as_bytes()).unwrap().expect("should shrink");
        assert!(compressed.len() < data.len());

        let mut decoded = String::new();
        GzDecoder::new(&compressed[..])
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn tiny_payload_is_not_worth_it() {
        assert!(shrink(b"x").unwrap().is_none());
        assert!(shrink(b"").unwrap().is_none());
    }
}

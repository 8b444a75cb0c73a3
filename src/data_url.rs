//! Self-describing base64 image strings (`data:image/png;base64,...`).

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:image/(\w+);base64,").expect("data url header pattern is valid")
    })
}

/// Remove a leading `data:image/<type>;base64,` header.
///
/// Strings without a header are returned unchanged.
pub fn strip_data_url_header(data: &str) -> &str {
    match header_pattern().find(data) {
        Some(header) => &data[header.end()..],
        None => data,
    }
}

/// Build a data URL from raw bytes and a MIME type.
pub fn encode_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Split a data URL into its MIME type and decoded bytes.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>)> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data url"))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| anyhow!("data url is not base64 encoded"))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .context("decode data url payload")?;
    Ok((mime.to_string(), bytes))
}

/// Read an image file into a data URL, sniffing the format from its contents.
pub fn file_to_data_url(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image file {}", path.display()))?;
    bytes_to_data_url(&bytes).with_context(|| format!("{} is not an image", path.display()))
}

/// Build a data URL for in-memory image bytes.
pub fn bytes_to_data_url(bytes: &[u8]) -> Result<String> {
    let format = image::guess_format(bytes).context("unrecognised image format")?;
    Ok(encode_data_url(bytes, format.to_mime_type()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_image_header_only() {
        assert_eq!(strip_data_url_header("data:image/png;base64,iVBOR"), "iVBOR");
        assert_eq!(strip_data_url_header("data:image/jpeg;base64,/9j/"), "/9j/");
        assert_eq!(strip_data_url_header("iVBOR"), "iVBOR");
        assert_eq!(
            strip_data_url_header("data:text/plain;base64,aGk="),
            "data:text/plain;base64,aGk="
        );
    }

    #[test]
    fn decode_returns_mime_and_bytes() -> Result<()> {
        let url = encode_data_url(b"hello", "image/png");
        assert_eq!(url, "data:image/png;base64,aGVsbG8=");
        let (mime, bytes) = decode_data_url(&url)?;
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"hello");
        Ok(())
    }

    #[test]
    fn decode_rejects_plain_strings() {
        assert!(decode_data_url("aGVsbG8=").is_err());
        assert!(decode_data_url("data:image/png,raw").is_err());
    }

    #[test]
    fn non_image_bytes_are_rejected() {
        assert!(bytes_to_data_url(b"just some text").is_err());
    }

    #[test]
    fn png_bytes_get_png_mime() -> Result<()> {
        let mut png = Vec::new();
        image::RgbImage::new(2, 2).write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageFormat::Png,
        )?;
        let url = bytes_to_data_url(&png)?;
        assert!(url.starts_with("data:image/png;base64,"));
        Ok(())
    }
}

//! Profile picture helpers: object keys and image type detection.

use base64::{engine::general_purpose::STANDARD, Engine as _};

const FALLBACK_EXT: &str = "bin";

/// Storage key of a user's picture: `<user>/<profile>/image.<ext>`.
pub fn object_key(user_id: &str, profile: &str, ext: &str) -> String {
    format!("{user_id}/{profile}/image.{ext}")
}

/// Whether `key` is a picture key of this user, `<user>/<profile>/image.<ext>`.
pub fn is_owned_key(user_id: &str, profile: &str, key: &str) -> bool {
    key.strip_prefix(&format!("{user_id}/{profile}/image."))
        .is_some_and(|ext| !ext.is_empty() && !ext.contains('/'))
}

/// File type from the image's leading bytes.
pub fn sniff_image_type(data: &[u8]) -> Option<&'static str> {
    match data {
        [0x89, b'P', b'N', b'G', ..] => Some("png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("jpg"),
        [b'G', b'I', b'F', b'8', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        [b'B', b'M', ..] => Some("bmp"),
        _ => None,
    }
}

/// Extension for a stored picture: the declared type when present,
/// otherwise whatever the bytes look like.
pub fn image_ext(declared: &str, data: &[u8]) -> String {
    let declared = declared.trim().trim_start_matches('.');
    if !declared.is_empty() {
        return declared.to_ascii_lowercase();
    }
    sniff_image_type(data).unwrap_or(FALLBACK_EXT).to_string()
}

pub fn decode_inline(picture: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(picture.trim())
}

pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn key_layout() {
        assert_eq!(object_key("alice", "p1", "png"), "alice/p1/image.png");
    }

    #[test]
    fn sniffing() {
        assert_eq!(sniff_image_type(PNG_HEADER), Some("png"));
        assert_eq!(sniff_image_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("jpg"));
        assert_eq!(sniff_image_type(b"GIF89a"), Some("gif"));
        assert_eq!(sniff_image_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("webp"));
        assert_eq!(sniff_image_type(b"hello"), None);
        assert_eq!(sniff_image_type(&[]), None);
    }

    #[test]
    fn declared_type_wins() {
        assert_eq!(image_ext(".JPEG", PNG_HEADER), "jpeg");
        assert_eq!(image_ext("", PNG_HEADER), "png");
        assert_eq!(image_ext(" ", b"??"), "bin");
    }

    #[test]
    fn inline_round_trip() {
        let enc = encode(PNG_HEADER);
        assert_eq!(decode_inline(&enc).unwrap(), PNG_HEADER);
        assert!(decode_inline("not base64!").is_err());
    }

    #[test]
    fn owned_keys_stay_under_the_user_prefix() {
        assert!(is_owned_key("alice", "p1", "alice/p1/image.png"));
        assert!(!is_owned_key("alice", "p1", "bob/p9/image.png"));
        assert!(!is_owned_key("alice", "p1", "alice/p1/image."));
        assert!(!is_owned_key("alice", "p1", "alice/p1/image.png/../../bob"));
        assert!(!is_owned_key("alice", "p1", "alice/p10/image.png"));
    }
}

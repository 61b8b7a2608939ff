//! Uploaded files.
//!
//! Files arrive base64-encoded in JSON bodies and are written below the media
//! root, in one directory per kind of content. Only relative paths are
//! stored in the database.

use std::path::PathBuf;

use rand::prelude::*;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::web::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    PinImage,
    PinVideo,
    Avatar,
}

impl MediaKind {
    pub fn directory(self) -> &'static str {
        match self {
            MediaKind::PinImage => "pins/images",
            MediaKind::PinVideo => "pins/videos",
            MediaKind::Avatar => "avatars",
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, MediaKind::PinImage | MediaKind::Avatar)
    }
}

/// A file as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct Upload {
    pub filename: String,
    /// Base64 of the file contents.
    pub content: String,
}

/// A file that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedUpload {
    pub kind: MediaKind,
    pub stem: String,
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Decodes and checks the upload, returning the message to show next to
    /// the form field on failure.
    pub fn decode(&self, kind: MediaKind) -> Result<DecodedUpload, String> {
        let bytes = base64::decode(self.content.trim())
            .map_err(|_| String::from("The submitted data was not a file."))?;
        if bytes.is_empty() {
            return Err(String::from("The submitted file is empty."));
        }
        let (stem, extension) = split_filename(&self.filename);
        let extension = if kind.is_image() {
            let detected = sniff_image(&bytes).ok_or_else(|| {
                String::from(
                    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
                )
            })?;
            image_extension(&extension, detected)?
        } else {
            extension
        };
        Ok(DecodedUpload {
            kind,
            stem,
            extension,
            bytes,
        })
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "webp"];

/// Picks the stored extension of an image. A name claiming some other image
/// format is corrected to the detected one; a non-image extension is refused.
fn image_extension(claimed: &str, detected: &'static str) -> Result<String, String> {
    if claimed.is_empty() {
        return Ok(detected.to_owned());
    }
    if !IMAGE_EXTENSIONS.iter().any(|ext| *ext == claimed) {
        return Err(format!(
            "File extension \u{201c}{}\u{201d} is not allowed. Allowed extensions are: {}.",
            claimed,
            IMAGE_EXTENSIONS.join(", ")
        ));
    }
    let same_format = claimed == detected || (claimed == "jpeg" && detected == "jpg");
    Ok(if same_format { claimed } else { detected }.to_owned())
}

/// Recognises the image formats accepted for pins and avatars by signature.
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        Some("jpg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else if bytes.starts_with(b"BM") {
        Some("bmp")
    } else {
        None
    }
}

fn split_filename(filename: &str) -> (String, String) {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or("");
    let (stem, extension) = match base.rfind('.') {
        Some(dot) if dot > 0 => (&base[..dot], &base[dot + 1..]),
        _ => (base, ""),
    };
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(50)
        .collect();
    let stem = if stem.trim_matches('_').is_empty() {
        String::from("upload")
    } else {
        stem
    };
    let extension: String = extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase();
    (stem, extension)
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        let mut url_prefix = url_prefix.to_owned();
        if !url_prefix.ends_with('/') {
            url_prefix.push('/');
        }
        Self {
            root: root.into(),
            url_prefix,
        }
    }

    /// Writes the file and returns its path relative to the media root.
    pub async fn save(&self, upload: &DecodedUpload) -> Result<String, AppError> {
        let suffix = {
            let mut buf = [0; 6];
            rand::thread_rng().fill_bytes(&mut buf);
            base64::encode_config(&buf, base64::URL_SAFE_NO_PAD)
        };
        let name = if upload.extension.is_empty() {
            format!("{}_{}", upload.stem, suffix)
        } else {
            format!("{}_{}.{}", upload.stem, suffix, upload.extension)
        };
        let relative = format!("{}/{}", upload.kind.directory(), name);
        let dir = self.root.join(upload.kind.directory());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), &upload.bytes).await?;
        debug!(path = %relative, bytes = upload.bytes.len(), "stored upload");
        Ok(relative)
    }

    /// Removes a stored file. Failures are logged and otherwise ignored.
    pub async fn discard(&self, relative: &str) {
        if relative.split('/').any(|segment| segment == "..") {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
            warn!(path = %relative, error = %e, "could not remove media file");
        }
    }

    pub async fn discard_all(&self, paths: Vec<String>) {
        for path in paths {
            self.discard(&path).await;
        }
    }

    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", self.url_prefix, relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn upload(filename: &str, bytes: &[u8]) -> Upload {
        Upload {
            filename: filename.to_owned(),
            content: base64::encode(bytes),
        }
    }

    #[test]
    fn test_decode_image() {
        let decoded = upload("../My Cat.PNG", PNG).decode(MediaKind::PinImage).unwrap();
        assert_eq!(decoded.stem, "My_Cat");
        assert_eq!(decoded.extension, "png");
        assert_eq!(decoded.bytes, PNG);

        let decoded = upload("noext", PNG).decode(MediaKind::Avatar).unwrap();
        assert_eq!(decoded.extension, "png");
    }

    #[test]
    fn test_image_extension_follows_content() {
        assert_eq!(
            upload("x.html", PNG).decode(MediaKind::PinImage),
            Err(String::from(
                "File extension \u{201c}html\u{201d} is not allowed. Allowed extensions are: bmp, gif, jpeg, jpg, png, webp."
            ))
        );
        let decoded = upload("x.gif", PNG).decode(MediaKind::Avatar).unwrap();
        assert_eq!(decoded.extension, "png");
        let decoded = upload("photo.JPEG", &[0xff, 0xd8, 0xff, 0xe0]).decode(MediaKind::PinImage).unwrap();
        assert_eq!(decoded.extension, "jpeg");
        let decoded = upload("clip.webm", b"\x1aE\xdf\xa3").decode(MediaKind::PinVideo).unwrap();
        assert_eq!(decoded.extension, "webm");
    }

    #[test]
    fn test_decode_rejects() {
        assert_eq!(
            upload("a.png", b"").decode(MediaKind::PinImage),
            Err(String::from("The submitted file is empty."))
        );
        assert!(upload("a.png", b"plain text")
            .decode(MediaKind::PinImage)
            .unwrap_err()
            .starts_with("Upload a valid image"));
        let bad = Upload {
            filename: String::from("a.png"),
            content: String::from("%%%"),
        };
        assert!(bad.decode(MediaKind::PinImage).is_err());
        assert!(upload("clip.mp4", b"anything").decode(MediaKind::PinVideo).is_ok());
    }

    #[test]
    fn test_sniff_image() {
        assert_eq!(sniff_image(PNG), Some("png"));
        assert_eq!(sniff_image(&[0xff, 0xd8, 0xff, 0xe0]), Some("jpg"));
        assert_eq!(sniff_image(b"GIF89a...."), Some("gif"));
        assert_eq!(sniff_image(b"RIFF\0\0\0\0WEBPVP8 "), Some("webp"));
        assert_eq!(sniff_image(b"\0\0\0 ftypmp42"), None);
    }

    #[tokio::test]
    async fn test_save_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path(), "/media");
        let decoded = upload("cat.png", PNG).decode(MediaKind::PinImage).unwrap();
        let path = store.save(&decoded).await.unwrap();
        assert!(path.starts_with("pins/images/cat_"));
        assert!(path.ends_with(".png"));
        assert_eq!(std::fs::read(dir.path().join(&path)).unwrap(), PNG);
        assert_eq!(store.url(&path), format!("/media/{}", path));

        store.discard(&path).await;
        assert!(!dir.path().join(&path).exists());

        let first = store.save(&decoded).await.unwrap();
        let second = store.save(&decoded).await.unwrap();
        assert_ne!(first, second);
        store.discard_all(vec![first.clone(), second.clone()]).await;
        assert!(!dir.path().join(&first).exists());
        assert!(!dir.path().join(&second).exists());
    }
}

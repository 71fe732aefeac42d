//! Avatar storage: validates the upload, scales it down, writes it under a
//! fresh random name, and retires the file it replaces.

use std::fs;
use std::path::Path;

use image::ImageFormat;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Filename sentinel meaning "no custom avatar uploaded". The sentinel is
/// shared by every user and is never deleted.
pub const DEFAULT_AVATAR: &str = "default.jpg";

/// Neither stored dimension exceeds this. Images already inside the bound
/// are written as-is; there is no upscaling.
pub const MAX_DIMENSION: u32 = 300;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("unsupported image type, expected jpg or png")]
    UnsupportedType,

    #[error("could not decode image: {0}")]
    Malformed(image::ImageError),

    #[error("could not store image: {0}")]
    Io(#[from] std::io::Error),
}

/// Extension allow-list check, usable before the request body is read.
pub fn allowed(filename: &str) -> bool {
    extension(filename).is_some()
}

fn extension(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1;
    ALLOWED_EXTENSIONS
        .iter()
        .find(|allowed| allowed.eq_ignore_ascii_case(ext))
        .copied()
}

/// Store `bytes` as a new avatar in `dir` and return the generated
/// filename. The image is decoded in its declared format and scaled down to
/// fit [`MAX_DIMENSION`], preserving aspect ratio.
pub fn store(dir: &Path, original_filename: &str, bytes: &[u8]) -> Result<String, AvatarError> {
    let ext = extension(original_filename).ok_or(AvatarError::UnsupportedType)?;
    let format = ImageFormat::from_extension(ext).ok_or(AvatarError::UnsupportedType)?;

    let img = image::load_from_memory_with_format(bytes, format).map_err(AvatarError::Malformed)?;
    let img = if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img.thumbnail(MAX_DIMENSION, MAX_DIMENSION)
    } else {
        img
    };

    let filename = format!("{}.{}", Uuid::new_v4().simple(), ext);
    img.save_with_format(dir.join(&filename), format)
        .map_err(|e| match e {
            image::ImageError::IoError(io) => AvatarError::Io(io),
            other => AvatarError::Malformed(other),
        })?;

    Ok(filename)
}

/// Store a replacement avatar, then retire the old file. A failed delete is
/// logged and does not fail the caller's profile update.
pub fn replace(
    dir: &Path,
    old: &str,
    original_filename: &str,
    bytes: &[u8],
) -> Result<String, AvatarError> {
    let filename = store(dir, original_filename, bytes)?;

    if old != DEFAULT_AVATAR {
        if let Err(err) = fs::remove_file(dir.join(old)) {
            warn!("could not remove replaced avatar {old}: {err}");
        }
    }

    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn oversized_image_is_scaled_down_preserving_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let name = store(dir.path(), "photo.png", &png_bytes(600, 400)).unwrap();

        let stored = image::open(dir.path().join(&name)).unwrap();
        assert_eq!((stored.width(), stored.height()), (300, 200));
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let dir = tempfile::tempdir().unwrap();
        let name = store(dir.path(), "photo.png", &png_bytes(120, 80)).unwrap();

        let stored = image::open(dir.path().join(&name)).unwrap();
        assert_eq!((stored.width(), stored.height()), (120, 80));
    }

    #[test]
    fn disallowed_extension_is_rejected_before_storage() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path(), "anim.gif", &png_bytes(10, 10)).unwrap_err();

        assert!(matches!(err, AvatarError::UnsupportedType));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error_not_a_crash() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path(), "photo.png", b"definitely not a png").unwrap_err();
        assert!(matches!(err, AvatarError::Malformed(_)));
    }

    #[test]
    fn generated_names_keep_the_extension_and_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let a = store(dir.path(), "one.PNG", &png_bytes(10, 10)).unwrap();
        let b = store(dir.path(), "two.png", &png_bytes(10, 10)).unwrap();

        assert!(a.ends_with(".png"));
        assert_ne!(a, b);
    }

    #[test]
    fn replace_removes_the_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = store(dir.path(), "one.png", &png_bytes(10, 10)).unwrap();
        let second = replace(dir.path(), &first, "two.png", &png_bytes(20, 20)).unwrap();

        assert!(!dir.path().join(&first).exists());
        assert!(dir.path().join(&second).exists());
    }

    #[test]
    fn replace_never_touches_the_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_AVATAR), b"shared default").unwrap();

        let name = replace(dir.path(), DEFAULT_AVATAR, "new.png", &png_bytes(10, 10)).unwrap();

        assert!(dir.path().join(DEFAULT_AVATAR).exists());
        assert!(dir.path().join(&name).exists());
    }
}

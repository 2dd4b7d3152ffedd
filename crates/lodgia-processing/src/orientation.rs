//! EXIF orientation correction applied before resizing.

use image::DynamicImage;
use std::io::Cursor;

/// Read the EXIF orientation tag from the raw container bytes. Images
/// without EXIF data (or with an unreadable block) report 1 (normal).
fn read_exif_orientation(data: &[u8]) -> u32 {
    let mut cursor = Cursor::new(data);
    match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(parsed) => parsed
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    }
}

/// Get rotation and flip operations needed for a given EXIF orientation.
/// Returns (rotate_angle, flip_horizontal, flip_vertical).
fn orientation_transforms(orientation: u32) -> (Option<u16>, bool, bool) {
    match orientation {
        1 => (None, false, false),      // Normal
        2 => (None, true, false),       // Mirror horizontal
        3 => (Some(180), false, false), // Rotate 180
        4 => (None, false, true),       // Mirror vertical
        5 => (Some(270), true, false),  // Mirror horizontal + Rotate 270 CW
        6 => (Some(90), false, false),  // Rotate 90 CW
        7 => (Some(90), true, false),   // Mirror horizontal + Rotate 90 CW
        8 => (Some(270), false, false), // Rotate 270 CW
        _ => (None, false, false),      // Invalid, treat as normal
    }
}

/// Apply EXIF orientation correction to a decoded image.
pub fn apply_exif_orientation(mut img: DynamicImage, data: &[u8]) -> DynamicImage {
    let orientation = read_exif_orientation(data);
    let (rotate, flip_h, flip_v) = orientation_transforms(orientation);

    if orientation != 1 {
        tracing::debug!(
            orientation = orientation,
            rotate = ?rotate,
            flip_horizontal = flip_h,
            flip_vertical = flip_v,
            "Applying EXIF orientation"
        );
    }

    img = match rotate {
        Some(90) => img.rotate90(),
        Some(180) => img.rotate180(),
        Some(270) => img.rotate270(),
        _ => img,
    };

    if flip_h {
        img = img.fliph();
    }
    if flip_v {
        img = img.flipv();
    }

    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_orientation_transform_table() {
        assert_eq!(orientation_transforms(1), (None, false, false));
        assert_eq!(orientation_transforms(3), (Some(180), false, false));
        assert_eq!(orientation_transforms(6), (Some(90), false, false));
        assert_eq!(orientation_transforms(8), (Some(270), false, false));
        assert_eq!(orientation_transforms(99), (None, false, false));
    }

    #[test]
    fn test_no_exif_leaves_image_untouched() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(4, 2));
        // PNG-encoded buffers carry no EXIF; orientation defaults to normal.
        let out = apply_exif_orientation(img, b"not an exif container");
        assert_eq!(out.width(), 4);
        assert_eq!(out.height(), 2);
    }
}

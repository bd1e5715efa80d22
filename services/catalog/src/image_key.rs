//! Rules for object keys that name gallery images.

use std::path::Path;

/// Extensions (lowercase, without dot) accepted into the catalog
pub const VALID_IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Folder name used for keys that sit directly under the listing prefix
pub const ROOT_FOLDER: &str = "root";

fn extension(key: &str) -> Option<String> {
    Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Whether the key carries one of the accepted image extensions
pub fn is_image_key(key: &str) -> bool {
    extension(key)
        .map(|ext| VALID_IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Whether the key is a JPEG, the only format EXIF is read from
pub fn is_jpeg_key(key: &str) -> bool {
    matches!(extension(key).as_deref(), Some("jpg" | "jpeg"))
}

/// Folder a key is grouped under.
///
/// Keys look like `{prefix}/{folder}/{file}`; anything with fewer than
/// three segments belongs to [`ROOT_FOLDER`].
pub fn folder_for_key(key: &str) -> &str {
    let mut segments = key.split('/');
    let _prefix = segments.next();
    match (segments.next(), segments.next()) {
        (Some(folder), Some(_)) => folder,
        _ => ROOT_FOLDER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_key() {
        assert!(is_image_key("photos/2024/a.jpg"));
        assert!(is_image_key("photos/2024/a.JPEG"));
        assert!(is_image_key("b.Png"));
        assert!(is_image_key("c.gif"));
        assert!(!is_image_key("photos/notes.txt"));
        assert!(!is_image_key("photos/raw.cr2"));
        assert!(!is_image_key("photos/2024/"));
        assert!(!is_image_key("photos/jpg"));
        assert!(!is_image_key(".jpg"));
    }

    #[test]
    fn test_is_jpeg_key() {
        assert!(is_jpeg_key("a/b.jpg"));
        assert!(is_jpeg_key("a/b.JPEG"));
        assert!(!is_jpeg_key("x/y.png"));
        assert!(!is_jpeg_key("x/y.gif"));
    }

    #[test]
    fn test_folder_for_key() {
        assert_eq!(folder_for_key("a/b/c.jpg"), "b");
        assert_eq!(folder_for_key("a/b/c/d.jpg"), "b");
        assert_eq!(folder_for_key("a/c.jpg"), ROOT_FOLDER);
        assert_eq!(folder_for_key("a.jpg"), ROOT_FOLDER);
    }
}

mod exif;

use crate::error::{Result, SafetyAiError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
    /// EXIF capture date, when the file carries one.
    pub captured_at: Option<String>,
}

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "JPG", "JPEG", "PNG", "WEBP", "GIF",
];

pub fn scan_folder(folder: &Path) -> Result<Vec<ImageInfo>> {
    if !folder.exists() {
        return Err(SafetyAiError::FolderNotFound(folder.display().to_string()));
    }

    let mut images = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(1) // direct children only
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if let Some(ext) = path.extension() {
            let ext_str = ext.to_string_lossy();
            if IMAGE_EXTENSIONS.iter().any(|&e| e == ext_str) {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();

                let captured_at = exif::extract_date(path).ok();

                images.push(ImageInfo {
                    path: path.to_path_buf(),
                    file_name,
                    captured_at,
                });
            }
        }
    }

    // Deterministic pipeline order: sort by file name
    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(images)
}

#[cfg(test)]
fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;

    #[test]
    fn test_is_image_extension() {
        assert!(is_image_extension("jpg"));
        assert!(is_image_extension("JPG"));
        assert!(is_image_extension("jpeg"));
        assert!(is_image_extension("png"));
        assert!(is_image_extension("webp"));
        assert!(is_image_extension("gif"));
        assert!(!is_image_extension("txt"));
        assert!(!is_image_extension("pdf"));
    }

    #[test]
    fn test_scan_folder_not_found() {
        let result = scan_folder(Path::new("/nonexistent/folder"));
        assert!(result.is_err());
    }

    #[test]
    fn test_scan_folder_empty() {
        let temp_dir = std::env::temp_dir().join("site-safety-test-empty");
        fs::create_dir_all(&temp_dir).unwrap();

        let result = scan_folder(&temp_dir).unwrap();
        assert!(result.is_empty());

        fs::remove_dir_all(&temp_dir).ok();
    }

    #[test]
    fn test_scan_folder_with_images() {
        let temp_dir = std::env::temp_dir().join("site-safety-test-images");
        fs::create_dir_all(&temp_dir).unwrap();

        File::create(temp_dir.join("site1.jpg")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.join("site2.JPG")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.join("site3.webp")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.join("notes.txt")).unwrap().write_all(b"text").unwrap();

        let result = scan_folder(&temp_dir).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].file_name, "site1.jpg");
        assert_eq!(result[1].file_name, "site2.JPG");
        assert_eq!(result[2].file_name, "site3.webp");

        fs::remove_dir_all(&temp_dir).ok();
    }

    #[test]
    fn test_images_sorted_by_filename() {
        let temp_dir = std::env::temp_dir().join("site-safety-test-sort");
        fs::create_dir_all(&temp_dir).unwrap();

        File::create(temp_dir.join("c.jpg")).unwrap();
        File::create(temp_dir.join("a.jpg")).unwrap();
        File::create(temp_dir.join("b.jpg")).unwrap();

        let result = scan_folder(&temp_dir).unwrap();
        assert_eq!(result[0].file_name, "a.jpg");
        assert_eq!(result[1].file_name, "b.jpg");
        assert_eq!(result[2].file_name, "c.jpg");

        fs::remove_dir_all(&temp_dir).ok();
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::imaging::domain::image_source::ImageSource;
use crate::shared::constants::IMAGE_EXTENSIONS;

/// Images found by a recursive walk of a directory.
///
/// Identifiers are base filenames. When the same name occurs in several
/// subdirectories, the first path in sorted order wins and the rest are
/// logged and ignored.
pub struct DirectoryImageSource {
    root: PathBuf,
    paths: BTreeMap<String, PathBuf>,
}

impl DirectoryImageSource {
    pub fn open(root: &Path) -> io::Result<Self> {
        let mut found = Vec::new();
        walk(root, &mut found)?;
        found.sort();

        let mut paths: BTreeMap<String, PathBuf> = BTreeMap::new();
        for path in found {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(existing) = paths.get(name) {
                log::warn!(
                    "Duplicate image name {name}: keeping {}, ignoring {}",
                    existing.display(),
                    path.display()
                );
                continue;
            }
            paths.insert(name.to_string(), path);
        }

        Ok(Self {
            root: root.to_path_buf(),
            paths,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, image_id: &str) -> Option<&Path> {
        self.paths.get(image_id).map(PathBuf::as_path)
    }
}

impl ImageSource for DirectoryImageSource {
    fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.paths.keys().cloned().collect())
    }

    fn read(&self, image_id: &str) -> io::Result<Vec<u8>> {
        let path = self.path_of(image_id).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{image_id} not found under {}", self.root.display()),
            )
        })?;
        fs::read(path)
    }
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else if is_image(&path) {
            out.push(path);
        }
    }
    Ok(())
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn touch(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[rstest]
    #[case("a.jpg", true)]
    #[case("a.JPEG", true)]
    #[case("a.Png", true)]
    #[case("a.webp", true)]
    #[case("a.txt", false)]
    #[case("noext", false)]
    fn test_is_image(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_image(Path::new(name)), expected);
    }

    #[test]
    fn test_walks_subdirectories_and_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.jpg"), b"b");
        touch(&dir.path().join("album").join("a.PNG"), b"a");
        touch(&dir.path().join("notes.txt"), b"x");

        let source = DirectoryImageSource::open(dir.path()).unwrap();

        assert_eq!(source.list().unwrap(), vec!["a.PNG", "b.jpg"]);
        assert_eq!(source.read("a.PNG").unwrap(), b"a");
    }

    #[test]
    fn test_duplicate_names_keep_first_sorted_path() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("x").join("same.jpg"), b"first");
        touch(&dir.path().join("y").join("same.jpg"), b"second");

        let source = DirectoryImageSource::open(dir.path()).unwrap();

        assert_eq!(source.list().unwrap(), vec!["same.jpg"]);
        assert_eq!(source.read("same.jpg").unwrap(), b"first");
    }

    #[test]
    fn test_read_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryImageSource::open(dir.path()).unwrap();
        let err = source.read("ghost.jpg").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_open_missing_root_fails() {
        assert!(DirectoryImageSource::open(Path::new("/nonexistent/photos")).is_err());
    }
}

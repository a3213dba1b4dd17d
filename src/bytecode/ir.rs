use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const IMAGE_VERSION: u32 = 1;

/// An encoded program: flat bytecode plus where each procedure starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub version: u32,
    pub code: Vec<u8>,
    pub procs: Vec<ProcEntry>,
}

/// Start offset of a procedure inside `Image::code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcEntry {
    pub name: String,
    pub offset: u64,
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image codec error: {0}")]
    Codec(#[from] postcard::Error),

    #[error("image i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported image version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

impl Image {
    pub fn new() -> Self {
        Self {
            version: IMAGE_VERSION,
            code: Vec::new(),
            procs: Vec::new(),
        }
    }

    /// Offset of the named procedure.
    pub fn entry(&self, name: &str) -> Option<u64> {
        self.procs.iter().find(|p| p.name == name).map(|p| p.offset)
    }

    /// Name of the procedure starting exactly at `offset`.
    pub fn proc_at(&self, offset: u64) -> Option<&str> {
        self.procs
            .iter()
            .find(|p| p.offset == offset)
            .map(|p| p.name.as_str())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ImageError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let image: Image = postcard::from_bytes(bytes)?;
        if image.version != IMAGE_VERSION {
            return Err(ImageError::Version {
                found: image.version,
                expected: IMAGE_VERSION,
            });
        }
        Ok(image)
    }

    pub fn save(&self, path: &Path) -> Result<(), ImageError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ImageError> {
        Self::from_bytes(&std::fs::read(path)?)
    }
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Image {
        Image {
            version: IMAGE_VERSION,
            code: vec![1, 0, 5, 44],
            procs: vec![
                ProcEntry {
                    name: "main".to_string(),
                    offset: 0,
                },
                ProcEntry {
                    name: "tail".to_string(),
                    offset: 3,
                },
            ],
        }
    }

    #[test]
    fn test_postcard_round_trip() {
        let image = sample();
        let bytes = image.to_bytes().unwrap();
        assert_eq!(Image::from_bytes(&bytes).unwrap(), image);
    }

    #[test]
    fn test_version_mismatch() {
        let mut image = sample();
        image.version = IMAGE_VERSION + 1;
        let bytes = image.to_bytes().unwrap();
        let err = Image::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ImageError::Version { found, .. } if found == IMAGE_VERSION + 1));
    }

    #[test]
    fn test_truncated_image() {
        let bytes = sample().to_bytes().unwrap();
        let err = Image::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, ImageError::Codec(_)));
    }

    #[test]
    fn test_lookup() {
        let image = sample();
        assert_eq!(image.entry("tail"), Some(3));
        assert_eq!(image.entry("nope"), None);
        assert_eq!(image.proc_at(0), Some("main"));
        assert_eq!(image.proc_at(1), None);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("regvm-image-{}.rvm", std::process::id()));
        let image = sample();
        image.save(&path).unwrap();
        let loaded = Image::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, image);
    }
}

use image::ImageFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::MediaConfig;

const MOVIE_UPLOAD_DIR: &str = "uploads/movies";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    InvalidImage,

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

/// Local directory holding uploaded files, served under `url`.
#[derive(Clone, Debug)]
pub struct MediaStorage {
    root: PathBuf,
    url: String,
}

impl MediaStorage {
    pub fn new(config: &MediaConfig) -> Self {
        let mut url = config.url.clone();
        if !url.ends_with('/') {
            url.push('/');
        }
        MediaStorage {
            root: PathBuf::from(&config.root),
            url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_for(&self, relative: &str) -> String {
        format!("{}{}", self.url, relative)
    }

    /// Decodes `bytes` to make sure they are an image, then writes them under
    /// `uploads/movies/{slug}-{uuid}.{ext}` and returns that relative path.
    pub async fn save_movie_image(&self, title: &str, bytes: Vec<u8>) -> Result<String, MediaError> {
        let (bytes, format) = tokio::task::spawn_blocking(move || {
            let format = image::guess_format(&bytes).map_err(|_| MediaError::InvalidImage)?;
            image::load_from_memory_with_format(&bytes, format).map_err(|_| MediaError::InvalidImage)?;
            Ok::<_, MediaError>((bytes, format))
        })
        .await
        .map_err(|e| MediaError::Io(std::io::Error::other(e)))??;

        let relative = format!(
            "{}/{}-{}.{}",
            MOVIE_UPLOAD_DIR,
            slugify(title),
            Uuid::new_v4(),
            extension(format)
        );

        let path = self.root.join(&relative);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        info!("Stored movie image {}", relative);

        Ok(relative)
    }
}

fn extension(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("img")
}

/// Lowercase ASCII slug; anything that is not alphanumeric becomes a single dash.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("movie");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    fn storage(root: &Path) -> MediaStorage {
        MediaStorage::new(&MediaConfig {
            root: root.to_string_lossy().into_owned(),
            url: "/media".to_string(),
            max_upload_bytes: 1024 * 1024,
        })
    }

    fn png_bytes() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(10, 10);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Spider Man: No Way Home"), "spider-man-no-way-home");
        assert_eq!(slugify("  Interstellar  "), "interstellar");
        assert_eq!(slugify("***"), "movie");
    }

    #[test]
    fn url_prefix_gets_trailing_slash() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        assert_eq!(storage.url_for("uploads/movies/a.png"), "/media/uploads/movies/a.png");
    }

    #[tokio::test]
    async fn valid_image_is_written_under_movie_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let relative = storage.save_movie_image("Sample movie", png_bytes()).await.unwrap();

        assert!(relative.starts_with("uploads/movies/sample-movie-"));
        assert!(relative.ends_with(".png"));
        assert!(dir.path().join(&relative).exists());
    }

    #[tokio::test]
    async fn non_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let result = storage.save_movie_image("Sample movie", b"not image".to_vec()).await;

        assert!(matches!(result, Err(MediaError::InvalidImage)));
        assert!(!dir.path().join(MOVIE_UPLOAD_DIR).exists());
    }
}

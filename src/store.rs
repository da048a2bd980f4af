// ABOUTME: On-disk key-value store for presentations, image assets and slide thumbnails
// ABOUTME: Serves as the asset store behind the resolver when exporting from the command line

use crate::assets::AssetStore;
use crate::errors::{DeckError, Result};
use crate::model::{new_id, now_millis, Presentation};
use crate::utils;
use log::{info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const PRESENTATIONS_DIR: &str = "presentations";
const IMAGES_DIR: &str = "images";
const THUMBNAILS_DIR: &str = "thumbnails";

/// Directory-backed store with one file per record
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn open(root: &Path) -> Result<Self> {
        for dir in [PRESENTATIONS_DIR, IMAGES_DIR, THUMBNAILS_DIR] {
            utils::ensure_directory_exists(&root.join(dir))?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, dir: &str, id: &str, extension: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(DeckError::ValidationError(format!(
                "invalid record identifier: {:?}",
                id
            )));
        }
        Ok(self.root.join(dir).join(format!("{}{}", id, extension)))
    }

    /// Persist a presentation, stamping its update time
    pub fn save_presentation(&self, presentation: &mut Presentation) -> Result<()> {
        presentation.updated_at = now_millis().max(presentation.created_at);
        let path = self.record_path(PRESENTATIONS_DIR, &presentation.id, ".json")?;
        fs::write(&path, serde_json::to_vec_pretty(presentation)?)?;
        info!("Saved presentation {} to {:?}", presentation.id, path);
        Ok(())
    }

    pub fn get_presentation(&self, id: &str) -> Result<Option<Presentation>> {
        let path = self.record_path(PRESENTATIONS_DIR, id, ".json")?;
        match read_optional(&path)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All stored presentations, least recently updated first
    pub fn list_presentations(&self) -> Result<Vec<Presentation>> {
        let pattern = format!(
            "{}/*.json",
            self.root.join(PRESENTATIONS_DIR).to_string_lossy()
        );
        let mut presentations = Vec::new();
        for entry in (glob::glob(&pattern)
            .map_err(|e| DeckError::ConfigError(format!("Invalid glob pattern: {}", e)))?)
        .flatten()
        {
            match fs::read(&entry).map_err(DeckError::from).and_then(|bytes| {
                serde_json::from_slice::<Presentation>(&bytes).map_err(DeckError::from)
            }) {
                Ok(p) => presentations.push(p),
                Err(e) => warn!("Skipping unreadable presentation {:?}: {}", entry, e),
            }
        }
        presentations.sort_by_key(|p| p.updated_at);
        Ok(presentations)
    }

    pub fn delete_presentation(&self, id: &str) -> Result<()> {
        remove_optional(&self.record_path(PRESENTATIONS_DIR, id, ".json")?)
    }

    /// Store image bytes under a freshly minted identifier
    pub fn save_image(&self, bytes: &[u8]) -> Result<String> {
        let id = new_id();
        fs::write(self.record_path(IMAGES_DIR, &id, "")?, bytes)?;
        info!("Stored image {} ({} bytes)", id, bytes.len());
        Ok(id)
    }

    pub fn get_image(&self, id: &str) -> Result<Option<Vec<u8>>> {
        read_optional(&self.record_path(IMAGES_DIR, id, "")?)
    }

    pub fn delete_image(&self, id: &str) -> Result<()> {
        remove_optional(&self.record_path(IMAGES_DIR, id, "")?)
    }

    pub fn save_thumbnail(&self, slide_id: &str, png: &[u8]) -> Result<PathBuf> {
        let path = self.record_path(THUMBNAILS_DIR, slide_id, ".png")?;
        fs::write(&path, png)?;
        Ok(path)
    }

    pub fn get_thumbnail(&self, slide_id: &str) -> Result<Option<Vec<u8>>> {
        read_optional(&self.record_path(THUMBNAILS_DIR, slide_id, ".png")?)
    }
}

impl AssetStore for FileStore {
    fn load_asset(&self, id: &str) -> Result<Option<Vec<u8>>> {
        self.get_image(id)
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn remove_optional(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

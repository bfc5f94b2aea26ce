use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use shared_types::BlockItem;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::codec::{decode_artifact, encode_artifact, CompressionConfig};
use super::layout::BlockPathResolver;
use crate::domain::errors::StorageError;
use crate::ports::outbound::BlockStorage;

/// One file per block under a root directory.
///
/// Writes go to a temp file that is renamed into place, so a crash never
/// leaves a half-written artifact under a block's name. Promotion to
/// verified is a rename from the unverified area into the live area.
pub struct FileBlockStorage {
    layout: BlockPathResolver,
    compression: CompressionConfig,
}

impl FileBlockStorage {
    pub fn new(root: impl Into<PathBuf>, compression: CompressionConfig) -> Self {
        let layout = BlockPathResolver::new(root, compression.kind);
        info!(
            root = %layout.root().display(),
            compression = ?compression.kind,
            "File block storage ready"
        );
        Self {
            layout,
            compression,
        }
    }

    pub fn layout(&self) -> &BlockPathResolver {
        &self.layout
    }

    /// A fresh sibling of `path`, unique per write.
    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        path.with_file_name(name)
    }

    fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        Ok(())
    }

    fn remove_if_present(path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn exists(path: &Path) -> Result<bool, StorageError> {
        path.try_exists().map_err(|e| StorageError::io(path, e))
    }

    fn read_artifact(
        &self,
        block_number: u64,
        path: &Path,
    ) -> Result<Option<Vec<BlockItem>>, StorageError> {
        match fs::read(path) {
            Ok(bytes) => decode_artifact(block_number, &bytes).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }
}

impl BlockStorage for FileBlockStorage {
    fn exists_verified(&self, block_number: u64) -> Result<bool, StorageError> {
        Self::exists(&self.layout.verified_path(block_number))
    }

    fn exists_unverified(&self, block_number: u64) -> Result<bool, StorageError> {
        Self::exists(&self.layout.unverified_path(block_number))
    }

    fn write_unverified(
        &self,
        block_number: u64,
        items: &[BlockItem],
    ) -> Result<PathBuf, StorageError> {
        let bytes = encode_artifact(items, self.compression)?;
        let path = self.layout.unverified_path(block_number);
        Self::ensure_parent(&path)?;

        // Write atomically via temp file
        let temp_path = Self::temp_path(&path);
        let write = || -> io::Result<()> {
            let mut file = fs::File::create_new(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&temp_path, &path)
        };
        if let Err(e) = write() {
            if let Err(cleanup) = Self::remove_if_present(&temp_path) {
                warn!(path = %temp_path.display(), error = %cleanup, "Temp file left behind");
            }
            return Err(StorageError::io(&path, e));
        }

        debug!(block_number, path = %path.display(), bytes = bytes.len(), "Artifact written");
        Ok(path)
    }

    fn remove_unverified(&self, block_number: u64) -> Result<(), StorageError> {
        Self::remove_if_present(&self.layout.unverified_path(block_number))
    }

    fn mark_verified(&self, block_number: u64) -> Result<(), StorageError> {
        let from = self.layout.unverified_path(block_number);
        if !Self::exists(&from)? {
            return Err(StorageError::MissingUnverified(block_number));
        }
        let to = self.layout.verified_path(block_number);
        Self::ensure_parent(&to)?;
        fs::rename(&from, &to).map_err(|e| StorageError::io(&to, e))?;

        debug!(block_number, path = %to.display(), "Artifact marked verified");
        Ok(())
    }

    fn read_block(&self, block_number: u64) -> Result<Option<Vec<BlockItem>>, StorageError> {
        if let Some(items) =
            self.read_artifact(block_number, &self.layout.verified_path(block_number))?
        {
            return Ok(Some(items));
        }
        self.read_artifact(block_number, &self.layout.unverified_path(block_number))
    }
}

//! # Block Path Layout
//!
//! ```text
//! <root>/unverified/0000/0000/0000/0001/0000000000000001234.blk
//! <root>/live/0000/0000/0000/0001/0000000000000001234.blk
//! ```
//!
//! The 19-digit block number is zero padded; its leading 16 digits form
//! four directory levels, so one leaf directory holds at most 1000 blocks.

use std::path::{Path, PathBuf};

use super::codec::CompressionKind;

const DIGITS: usize = 19;
const DIR_DIGITS: usize = 16;
const DIR_GROUP: usize = 4;

#[derive(Clone, Debug)]
pub struct BlockPathResolver {
    root: PathBuf,
    compression: CompressionKind,
}

impl BlockPathResolver {
    pub fn new(root: impl Into<PathBuf>, compression: CompressionKind) -> Self {
        Self {
            root: root.into(),
            compression,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn unverified_path(&self, block_number: u64) -> PathBuf {
        self.resolve("unverified", block_number)
    }

    pub fn verified_path(&self, block_number: u64) -> PathBuf {
        self.resolve("live", block_number)
    }

    fn resolve(&self, area: &str, block_number: u64) -> PathBuf {
        let digits = format!("{:0width$}", block_number, width = DIGITS);
        let mut path = self.root.join(area);
        for start in (0..DIR_DIGITS).step_by(DIR_GROUP) {
            path.push(&digits[start..start + DIR_GROUP]);
        }
        path.push(format!("{digits}.{}", self.compression.extension()));
        path
    }
}

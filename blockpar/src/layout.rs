//! Layout persistence: the JSON layout header and the compressed artifact files.
//!
//! A layout header records everything needed to decompress an array apart from its element type and codec:
//! ```json
//! {
//!     "dimensions": [10, 20],
//!     "block_splits": [[0, 8], [8, 15]],
//!     "compressed_files": ["array.0.bpc", "array.1.bpc"]
//! }
//! ```
//! `compressed_files` is either a list with one file per chunk, or a single file holding every chunk.

use std::path::{Path, PathBuf};

use blockpar_plan::{BlockGrid, ChunkPlan, ElementType, PlanError, Shape, validate_block_splits};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::global_config;

/// The file extension of compressed artifact files.
pub const ARTIFACT_EXTENSION: &str = "bpc";

/// The location(s) of the compressed artifacts of an array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompressedFiles {
    /// A single file holding every chunk, each prefixed by its length (`u64` little-endian).
    Single(String),
    /// One file per chunk, in chunk index order.
    PerChunk(Vec<String>),
}

/// How compressed artifacts are written by [`write_artifacts`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArtifactStorage {
    /// One file per chunk, named `{stem}.{chunk}.bpc`.
    #[default]
    PerChunk,
    /// A single file named `{stem}.bpc`.
    Combined,
}

/// A layout persistence error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LayoutError {
    /// An IO error.
    #[error("{}: {source}", .path.display())]
    IOError {
        /// The path.
        path: PathBuf,
        /// The IO error.
        source: std::io::Error,
    },
    /// A JSON error.
    #[error(transparent)]
    JSONError(#[from] serde_json::Error),
    /// The header does not describe a valid plan.
    #[error(transparent)]
    PlanError(#[from] PlanError),
    /// The number of artifacts does not match the number of chunks.
    #[error("got {got} compressed artifacts, expected {expected} (one per chunk)")]
    ArtifactCountMismatch {
        /// The number of artifacts.
        got: usize,
        /// The number of chunks.
        expected: usize,
    },
    /// A combined artifact file is truncated.
    #[error("the combined artifact file {} is truncated", .0.display())]
    TruncatedArtifactFile(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> LayoutError + '_ {
    move |source| LayoutError::IOError {
        path: path.to_path_buf(),
        source,
    }
}

/// A layout header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutHeader {
    dimensions: Vec<u64>,
    block_splits: Vec<Vec<u64>>,
    compressed_files: CompressedFiles,
}

impl LayoutHeader {
    /// Create a new layout header.
    #[must_use]
    pub fn new(
        dimensions: Vec<u64>,
        block_splits: Vec<Vec<u64>>,
        compressed_files: CompressedFiles,
    ) -> Self {
        Self {
            dimensions,
            block_splits,
            compressed_files,
        }
    }

    /// Create the layout header of a chunk plan.
    #[must_use]
    pub fn from_plan(plan: &ChunkPlan, compressed_files: CompressedFiles) -> Self {
        Self::new(plan.shape().to_vec(), plan.block_splits(), compressed_files)
    }

    /// The array dimensions.
    #[must_use]
    pub fn dimensions(&self) -> &[u64] {
        &self.dimensions
    }

    /// The block splits, see [`ChunkPlan::block_splits`].
    #[must_use]
    pub fn block_splits(&self) -> &[Vec<u64>] {
        &self.block_splits
    }

    /// The compressed artifact locations.
    #[must_use]
    pub fn compressed_files(&self) -> &CompressedFiles {
        &self.compressed_files
    }

    /// The number of chunks.
    #[must_use]
    pub fn num_chunks(&self) -> usize {
        self.block_splits.len()
    }

    /// Validate the header.
    ///
    /// # Errors
    /// Returns a [`LayoutError`] if
    ///  - the dimensions are not a valid shape,
    ///  - the block splits do not partition the block grid of the shape, or
    ///  - the number of per-chunk artifact files does not match the number of chunks.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let grid = BlockGrid::new(Shape::new(self.dimensions.clone())?);
        validate_block_splits(&grid, &self.block_splits)?;
        if let CompressedFiles::PerChunk(files) = &self.compressed_files
            && files.len() != self.block_splits.len()
        {
            return Err(LayoutError::ArtifactCountMismatch {
                got: files.len(),
                expected: self.block_splits.len(),
            });
        }
        Ok(())
    }

    /// Recreate the chunk plan described by the header.
    ///
    /// # Errors
    /// Returns [`LayoutError::PlanError`] if the dimensions or block splits are invalid.
    pub fn chunk_plan(&self, element_type: ElementType) -> Result<ChunkPlan, LayoutError> {
        let grid = BlockGrid::new(Shape::new(self.dimensions.clone())?);
        Ok(ChunkPlan::from_block_splits(
            grid,
            element_type,
            &self.block_splits,
        )?)
    }

    /// Serialise the header to pretty JSON with `indent` spaces of indentation.
    ///
    /// # Errors
    /// Returns [`LayoutError::JSONError`] if serialisation fails.
    pub fn to_json(&self, indent: usize) -> Result<Vec<u8>, LayoutError> {
        let indent = vec![b' '; indent];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut json = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut json, formatter);
        self.serialize(&mut serializer)?;
        Ok(json)
    }

    /// Write the header to `path`, replacing any existing file.
    ///
    /// The indentation is the [global header indent](crate::config::Config#header-indent).
    ///
    /// # Errors
    /// Returns a [`LayoutError`] if serialisation or writing fails.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), LayoutError> {
        let path = path.as_ref();
        let indent = global_config().header_indent();
        let json = self.to_json(indent)?;
        std::fs::write(path, json).map_err(io_error(path))?;
        log::debug!("wrote layout header {}", path.display());
        Ok(())
    }
}

/// Write a layout header with `dimensions`, `block_splits` and `compressed_files` to `path`.
///
/// The header is serialised in full before the file is written, replacing any existing file.
/// No semantic validation is performed, see [`LayoutHeader::validate`].
///
/// # Errors
/// Returns a [`LayoutError`] if serialisation or writing fails.
pub fn write_header(
    path: impl AsRef<Path>,
    dimensions: &[u64],
    block_splits: &[Vec<u64>],
    compressed_files: &CompressedFiles,
) -> Result<(), LayoutError> {
    LayoutHeader::new(
        dimensions.to_vec(),
        block_splits.to_vec(),
        compressed_files.clone(),
    )
    .write(path)
}

/// Read a layout header from `path`.
///
/// Only the structure is parsed, see [`LayoutHeader::validate`].
///
/// # Errors
/// Returns a [`LayoutError`] if the file cannot be read or is not a layout header.
pub fn read_header(path: impl AsRef<Path>) -> Result<LayoutHeader, LayoutError> {
    let path = path.as_ref();
    let json = std::fs::read(path).map_err(io_error(path))?;
    Ok(serde_json::from_slice(&json)?)
}

/// Write compressed `artifacts` to files named after `stem` in `directory`.
///
/// Returns the artifact locations relative to `directory`.
///
/// # Errors
/// Returns [`LayoutError::IOError`] if a file cannot be written.
pub fn write_artifacts<A: AsRef<[u8]>>(
    directory: impl AsRef<Path>,
    stem: &str,
    artifacts: &[A],
    storage: ArtifactStorage,
) -> Result<CompressedFiles, LayoutError> {
    let directory = directory.as_ref();
    match storage {
        ArtifactStorage::PerChunk => {
            let files = artifacts
                .iter()
                .enumerate()
                .map(|(chunk, artifact)| {
                    let file = format!("{stem}.{chunk}.{ARTIFACT_EXTENSION}");
                    let path = directory.join(&file);
                    std::fs::write(&path, artifact).map_err(io_error(&path))?;
                    Ok(file)
                })
                .collect::<Result<Vec<_>, LayoutError>>()?;
            Ok(CompressedFiles::PerChunk(files))
        }
        ArtifactStorage::Combined => {
            let file = format!("{stem}.{ARTIFACT_EXTENSION}");
            let path = directory.join(&file);
            let size = artifacts
                .iter()
                .map(|artifact| size_of::<u64>() + artifact.as_ref().len())
                .sum();
            let mut combined = Vec::with_capacity(size);
            for artifact in artifacts {
                let artifact = artifact.as_ref();
                combined.extend_from_slice(&(artifact.len() as u64).to_le_bytes());
                combined.extend_from_slice(artifact);
            }
            std::fs::write(&path, combined).map_err(io_error(&path))?;
            Ok(CompressedFiles::Single(file))
        }
    }
}

/// Read the compressed artifacts at `compressed_files`, resolving relative locations against `directory`.
///
/// # Errors
/// Returns a [`LayoutError`] if a file cannot be read, a combined file is truncated, or the number of artifacts is not `expected_chunks`.
pub fn read_artifacts(
    directory: impl AsRef<Path>,
    compressed_files: &CompressedFiles,
    expected_chunks: usize,
) -> Result<Vec<Vec<u8>>, LayoutError> {
    let directory = directory.as_ref();
    let artifacts = match compressed_files {
        CompressedFiles::PerChunk(files) => {
            if files.len() != expected_chunks {
                return Err(LayoutError::ArtifactCountMismatch {
                    got: files.len(),
                    expected: expected_chunks,
                });
            }
            files
                .iter()
                .map(|file| {
                    let path = directory.join(file);
                    std::fs::read(&path).map_err(io_error(&path))
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        CompressedFiles::Single(file) => {
            let path = directory.join(file);
            let combined = std::fs::read(&path).map_err(io_error(&path))?;
            split_combined(&combined).ok_or(LayoutError::TruncatedArtifactFile(path))?
        }
    };
    if artifacts.len() == expected_chunks {
        Ok(artifacts)
    } else {
        Err(LayoutError::ArtifactCountMismatch {
            got: artifacts.len(),
            expected: expected_chunks,
        })
    }
}

fn split_combined(mut combined: &[u8]) -> Option<Vec<Vec<u8>>> {
    let mut artifacts = Vec::new();
    while !combined.is_empty() {
        let (len, rest) = combined.split_first_chunk::<8>()?;
        let len = usize::try_from(u64::from_le_bytes(*len)).ok()?;
        let (artifact, rest) = rest.split_at_checked(len)?;
        artifacts.push(artifact.to_vec());
        combined = rest;
    }
    Some(artifacts)
}

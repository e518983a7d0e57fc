//! The block codec API for the [`blockpar`](https://docs.rs/blockpar/latest/blockpar/index.html) crate.
//!
//! A block codec compresses and decompresses a single block of an array at a time.
//! The orchestrators in `blockpar` own all of the index arithmetic and call a codec once per block.
//!
//! ## Licence
//! `blockpar_codec` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.

mod block_representation;
pub use block_representation::BlockRepresentation;

mod codec_mode;
pub use codec_mode::{CodecMode, CodecModeError, CodecParameters};

use blockpar_plan::ElementType;
use thiserror::Error;

/// Traits for a block codec.
///
/// Implementations must be thread-safe: the same codec is shared by every worker of an orchestrator.
pub trait BlockCodecTraits: std::fmt::Debug + Send + Sync {
    /// Encode a block.
    ///
    /// `decoded` holds the native-endian element bytes of the block in row-major order.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if the block cannot be encoded in `mode`.
    fn encode_block(
        &self,
        decoded: &[u8],
        representation: &BlockRepresentation,
        mode: &CodecMode,
    ) -> Result<Vec<u8>, CodecError>;

    /// Decode a block into `decoded`.
    ///
    /// `decoded` must be exactly [`BlockRepresentation::size`] bytes.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if `encoded` is not a valid encoding of a block with `representation`.
    fn decode_block(
        &self,
        encoded: &[u8],
        representation: &BlockRepresentation,
        decoded: &mut [u8],
    ) -> Result<(), CodecError>;
}

/// A block codec error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// An invalid codec mode.
    #[error(transparent)]
    InvalidMode(#[from] CodecModeError),
    /// The codec does not support the element type.
    #[error("the codec does not support the {0} element type")]
    UnsupportedElementType(ElementType),
    /// The size of a decoded block did not match its representation.
    #[error("the size of a decoded block is {got}, expected {expected}")]
    InvalidBlockSize {
        /// The size in bytes.
        got: usize,
        /// The expected size in bytes.
        expected: usize,
    },
    /// The encoded block is invalid.
    #[error("invalid encoded block: {0}")]
    InvalidEncoding(String),
    /// Other
    #[error("{0}")]
    Other(String),
}

impl CodecError {
    /// Check that `size` matches the decoded size of a block with `representation`.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidBlockSize`] on a mismatch.
    pub fn check_block_size(
        size: usize,
        representation: &BlockRepresentation,
    ) -> Result<(), CodecError> {
        let expected = representation.size();
        if size == expected {
            Ok(())
        } else {
            Err(CodecError::InvalidBlockSize {
                got: size,
                expected,
            })
        }
    }
}

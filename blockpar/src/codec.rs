//! Block codecs.
//!
//! A block codec implements [`BlockCodecTraits`] and encodes a single block of up to 4 elements per dimension.
//! `blockpar` includes the [`ZfpCodec`] (feature `zfp`); other codecs can be supplied by implementing [`BlockCodecTraits`].

#[cfg(feature = "zfp")]
mod zfp;

#[cfg(feature = "zfp")]
pub use zfp::ZfpCodec;

pub use blockpar_codec::{
    BlockCodecTraits, BlockRepresentation, CodecError, CodecMode, CodecModeError, CodecParameters,
};

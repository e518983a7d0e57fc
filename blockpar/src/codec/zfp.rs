//! The `zfp` block codec.
//!
//! [zfp](https://zfp.io/) is a compressed number format for 1D to 4D arrays of 32/64-bit floating point or integer data.
//! Each block is compressed as its own `zfp` field, so ragged blocks at the high edge of an array are padded by `zfp` itself.
//!
//! This codec requires the `zfp` feature, which is enabled by default.
//!
//! ### Encoded block format
//! An encoded block is a `zfp` mode header ([`ZFP_HEADER_MODE`]) followed by the compressed block, padded to a whole number of 64-bit words.
//! The shape and element type of a block are not stored, they are given by its [`BlockRepresentation`].

mod zfp_bitstream;
mod zfp_block;
mod zfp_field;
mod zfp_stream;

use blockpar_codec::{BlockCodecTraits, BlockRepresentation, CodecError, CodecMode};
use blockpar_plan::ElementType;
use zfp_sys::{
    ZFP_HEADER_MAX_BITS, ZFP_HEADER_MODE, zfp_compress, zfp_decompress, zfp_read_header,
    zfp_stream_maximum_size, zfp_stream_rewind, zfp_stream_set_bit_stream, zfp_write_header,
};

use self::zfp_bitstream::ZfpBitstream;
use self::zfp_block::ZfpBlock;
use self::zfp_field::ZfpField;
use self::zfp_stream::{ZfpStream, ZfpStreamMode};

const WORD_SIZE: usize = size_of::<u64>();

/// The largest supported fixed rate in bits per value.
const MAX_RATE: f64 = 64.0;

/// A block codec backed by [zfp](https://zfp.io/).
///
/// The [`CodecMode`] maps to a `zfp` compression mode:
/// - [`CodecMode::Tolerance`]: fixed-accuracy mode for floating point data.
///   A tolerance of zero, or any tolerance for integer data, uses the lossless reversible mode.
/// - [`CodecMode::FixedRate`]: fixed-rate mode, up to 64 bits per value.
/// - [`CodecMode::FixedPrecision`]: fixed-precision mode.
///
/// Every encoded block carries its `zfp` mode, so decoding does not need the mode.
///
/// `zfp` reserves the two most significant bits of integers for its decorrelating transform, so `int32` values must lie in `[-2^30, 2^30)` and `int64` values in `[-2^62, 2^62)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZfpCodec;

impl ZfpCodec {
    /// Create a new `zfp` codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn stream_mode(mode: &CodecMode, element_type: ElementType) -> Result<ZfpStreamMode, CodecError> {
    mode.validate()?;
    Ok(match *mode {
        CodecMode::Tolerance(tolerance) if tolerance > 0.0 && element_type.is_float() => {
            ZfpStreamMode::FixedAccuracy(tolerance)
        }
        CodecMode::Tolerance(_) => ZfpStreamMode::Reversible,
        CodecMode::FixedRate(rate) if rate > MAX_RATE => {
            return Err(CodecError::Other(format!(
                "zfp rate {rate} exceeds {MAX_RATE} bits per value"
            )));
        }
        CodecMode::FixedRate(rate) => ZfpStreamMode::FixedRate(rate),
        CodecMode::FixedPrecision(precision) => ZfpStreamMode::FixedPrecision(precision),
    })
}

fn check_integer_range(block: &ZfpBlock) -> Result<(), CodecError> {
    let out_of_range = match block {
        ZfpBlock::Int32(values) => values
            .iter()
            .find(|v| !(-(1 << 30)..1 << 30).contains(*v))
            .map(i64::from),
        ZfpBlock::Int64(values) => values
            .iter()
            .find(|v| !(-(1 << 62)..1 << 62).contains(*v))
            .copied(),
        ZfpBlock::Float32(_) | ZfpBlock::Float64(_) => None,
    };
    match out_of_range {
        Some(value) => Err(CodecError::Other(format!(
            "integer {value} is outside the range supported by zfp"
        ))),
        None => Ok(()),
    }
}

fn dimensionality(representation: &BlockRepresentation) -> Result<u32, CodecError> {
    u32::try_from(representation.shape().len())
        .map_err(|_| CodecError::Other("unsupported zfp block dimensionality".to_string()))
}

fn num_elements(representation: &BlockRepresentation) -> Result<usize, CodecError> {
    usize::try_from(representation.num_elements())
        .map_err(|_| CodecError::Other("zfp block is too large".to_string()))
}

/// Copies `bytes` into a zeroed word buffer of at least `size` bytes.
fn words_from_bytes(bytes: &[u8], size: usize) -> Vec<u64> {
    let mut words = vec![0u64; size.max(bytes.len()).div_ceil(WORD_SIZE)];
    bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..bytes.len()].copy_from_slice(bytes);
    words
}

/// Reads the mode header of `encoded` into `stream` and returns the largest possible encoded size of `field`.
fn read_maximum_size(
    stream: &ZfpStream,
    field: &ZfpField<'_>,
    encoded: &[u8],
) -> Result<usize, CodecError> {
    let header_size = ZFP_HEADER_MAX_BITS.div_ceil(u8::BITS) as usize;
    let mut words = words_from_bytes(encoded, encoded.len() + header_size);
    let bitstream = ZfpBitstream::new(&mut words)
        .ok_or_else(|| CodecError::Other("failed to create zfp bitstream".to_string()))?;
    let maximum_size = unsafe {
        // SAFETY: the bitstream holds a whole header
        zfp_stream_set_bit_stream(stream.as_zfp_stream(), bitstream.as_bitstream());
        zfp_stream_rewind(stream.as_zfp_stream());
        if zfp_read_header(stream.as_zfp_stream(), field.as_zfp_field(), ZFP_HEADER_MODE) == 0 {
            0
        } else {
            zfp_stream_maximum_size(stream.as_zfp_stream(), field.as_zfp_field())
        }
    };
    if maximum_size == 0 {
        Err(CodecError::InvalidEncoding("invalid zfp mode header".to_string()))
    } else {
        Ok(maximum_size)
    }
}

impl BlockCodecTraits for ZfpCodec {
    fn encode_block(
        &self,
        decoded: &[u8],
        representation: &BlockRepresentation,
        mode: &CodecMode,
    ) -> Result<Vec<u8>, CodecError> {
        CodecError::check_block_size(decoded.len(), representation)?;
        let element_type = representation.element_type();
        let mode = stream_mode(mode, element_type)?;
        let mut block = ZfpBlock::from_bytes(decoded, element_type);
        check_integer_range(&block)?;
        let zfp_type = block.zfp_type();
        let field = ZfpField::new(&mut block, representation.shape())
            .ok_or_else(|| CodecError::Other("failed to create zfp field".to_string()))?;
        let stream = ZfpStream::new(mode, zfp_type, dimensionality(representation)?)
            .ok_or_else(|| CodecError::Other("failed to create zfp stream".to_string()))?;

        let bufsize = unsafe {
            // SAFETY: zfp stream and field are valid
            zfp_stream_maximum_size(stream.as_zfp_stream(), field.as_zfp_field())
        };
        let mut encoded = vec![0u64; bufsize.div_ceil(WORD_SIZE)];
        let bitstream = ZfpBitstream::new(&mut encoded)
            .ok_or_else(|| CodecError::Other("failed to create zfp bitstream".to_string()))?;
        let size = unsafe {
            // SAFETY: the bitstream holds the maximum encoded size of the field
            zfp_stream_set_bit_stream(stream.as_zfp_stream(), bitstream.as_bitstream());
            zfp_stream_rewind(stream.as_zfp_stream());
            if zfp_write_header(stream.as_zfp_stream(), field.as_zfp_field(), ZFP_HEADER_MODE) == 0
            {
                0
            } else {
                zfp_compress(stream.as_zfp_stream(), field.as_zfp_field())
            }
        };
        drop(bitstream);

        bytemuck::cast_slice::<u64, u8>(&encoded)
            .get(..size)
            .filter(|_| size > 0)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| CodecError::Other("zfp compression failed".to_string()))
    }

    fn decode_block(
        &self,
        encoded: &[u8],
        representation: &BlockRepresentation,
        decoded: &mut [u8],
    ) -> Result<(), CodecError> {
        CodecError::check_block_size(decoded.len(), representation)?;
        if encoded.is_empty() || !encoded.len().is_multiple_of(WORD_SIZE) {
            return Err(CodecError::InvalidEncoding(format!(
                "a zfp block of {} bytes is not a whole number of words",
                encoded.len()
            )));
        }
        let mut block = ZfpBlock::new_zeroed(
            representation.element_type(),
            num_elements(representation)?,
        );
        let field = ZfpField::new(&mut block, representation.shape())
            .ok_or_else(|| CodecError::Other("failed to create zfp field".to_string()))?;
        let stream = ZfpStream::open()
            .ok_or_else(|| CodecError::Other("failed to create zfp stream".to_string()))?;

        // zfp does not bounds check its input, pad to the largest block the header allows
        let maximum_size = read_maximum_size(&stream, &field, encoded)?;
        let mut words = words_from_bytes(encoded, maximum_size);
        let bitstream = ZfpBitstream::new(&mut words)
            .ok_or_else(|| CodecError::Other("failed to create zfp bitstream".to_string()))?;
        let size = unsafe {
            // SAFETY: the bitstream holds the maximum encoded size of the field
            zfp_stream_set_bit_stream(stream.as_zfp_stream(), bitstream.as_bitstream());
            zfp_stream_rewind(stream.as_zfp_stream());
            if zfp_read_header(stream.as_zfp_stream(), field.as_zfp_field(), ZFP_HEADER_MODE) == 0 {
                0
            } else {
                zfp_decompress(stream.as_zfp_stream(), field.as_zfp_field())
            }
        };
        drop(bitstream);
        drop(field);

        if size == 0 {
            Err(CodecError::Other("zfp decompression failed".to_string()))
        } else if size != encoded.len() {
            Err(CodecError::InvalidEncoding(format!(
                "decoded {size} bytes of a zfp block of {} bytes",
                encoded.len()
            )))
        } else {
            decoded.copy_from_slice(block.as_bytes());
            Ok(())
        }
    }
}

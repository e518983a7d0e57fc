use std::ptr::NonNull;

use zfp_sys::{
    zfp_stream, zfp_stream_close, zfp_stream_open, zfp_stream_set_accuracy,
    zfp_stream_set_precision, zfp_stream_set_rate, zfp_stream_set_reversible, zfp_type,
};

/// A `zfp` compression mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) enum ZfpStreamMode {
    Reversible,
    FixedAccuracy(f64),
    FixedRate(f64),
    FixedPrecision(u32),
}

/// A `zfp` stream.
pub(super) struct ZfpStream(NonNull<zfp_stream>);

impl Drop for ZfpStream {
    fn drop(&mut self) {
        unsafe {
            zfp_stream_close(self.0.as_ptr());
        }
    }
}

impl ZfpStream {
    /// Creates a stream without a bitstream, to be configured by a header.
    pub(super) fn open() -> Option<Self> {
        let stream = unsafe { zfp_stream_open(std::ptr::null_mut()) };
        NonNull::new(stream).map(Self)
    }

    /// Creates a stream for compressing a `dims`-dimensional field of `zfp_type` in `mode`.
    pub(super) fn new(mode: ZfpStreamMode, zfp_type: zfp_type, dims: u32) -> Option<Self> {
        let stream = Self::open()?;
        let zfp = stream.as_zfp_stream();
        unsafe {
            // SAFETY: zfp is a valid stream
            match mode {
                ZfpStreamMode::Reversible => zfp_stream_set_reversible(zfp),
                ZfpStreamMode::FixedAccuracy(tolerance) => {
                    zfp_stream_set_accuracy(zfp, tolerance);
                }
                ZfpStreamMode::FixedRate(rate) => {
                    zfp_stream_set_rate(zfp, rate, zfp_type, dims, 0);
                }
                ZfpStreamMode::FixedPrecision(precision) => {
                    zfp_stream_set_precision(zfp, precision);
                }
            }
        }
        Some(stream)
    }

    pub(super) fn as_zfp_stream(&self) -> *mut zfp_stream {
        self.0.as_ptr()
    }
}

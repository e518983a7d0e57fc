use std::{marker::PhantomData, ptr::NonNull};

use zfp_sys::{bitstream, stream_close, stream_open};

/// A `zfp` bitstream over a word buffer.
pub(super) struct ZfpBitstream<'a> {
    bitstream: NonNull<bitstream>,
    buffer: PhantomData<&'a mut [u64]>,
}

impl Drop for ZfpBitstream<'_> {
    fn drop(&mut self) {
        unsafe {
            stream_close(self.bitstream.as_ptr());
        }
    }
}

impl<'a> ZfpBitstream<'a> {
    pub(super) fn new(buffer: &'a mut [u64]) -> Option<Self> {
        let bitstream = unsafe {
            // SAFETY: the buffer outlives the bitstream
            stream_open(
                buffer.as_mut_ptr().cast::<std::ffi::c_void>(),
                size_of_val(buffer),
            )
        };
        NonNull::new(bitstream).map(|bitstream| Self {
            bitstream,
            buffer: PhantomData,
        })
    }

    pub(super) fn as_bitstream(&self) -> *mut bitstream {
        self.bitstream.as_ptr()
    }
}

use std::{marker::PhantomData, ptr::NonNull};

use zfp_sys::{zfp_field, zfp_field_1d, zfp_field_2d, zfp_field_3d, zfp_field_4d, zfp_field_free};

use super::zfp_block::ZfpBlock;

/// A `zfp` field over the elements of a [`ZfpBlock`].
pub(super) struct ZfpField<'a> {
    field: NonNull<zfp_field>,
    block: PhantomData<&'a mut ZfpBlock>,
}

impl Drop for ZfpField<'_> {
    fn drop(&mut self) {
        unsafe {
            zfp_field_free(self.field.as_ptr());
        }
    }
}

impl<'a> ZfpField<'a> {
    /// Creates a field over `block` with the row-major `shape`.
    ///
    /// Returns [`None`] if the shape does not have 1 to 4 dimensions.
    pub(super) fn new(block: &'a mut ZfpBlock, shape: &[u64]) -> Option<Self> {
        let zfp_type = block.zfp_type();
        let pointer = block.as_mut_ptr();
        // zfp orders dimensions fastest varying first
        let extents = shape
            .iter()
            .rev()
            .map(|&extent| usize::try_from(extent).ok())
            .collect::<Option<Vec<usize>>>()?;
        let field = unsafe {
            // SAFETY: the block outlives the field and holds every element of the extents
            match *extents.as_slice() {
                [nx] => zfp_field_1d(pointer, zfp_type, nx),
                [nx, ny] => zfp_field_2d(pointer, zfp_type, nx, ny),
                [nx, ny, nz] => zfp_field_3d(pointer, zfp_type, nx, ny, nz),
                [nx, ny, nz, nw] => zfp_field_4d(pointer, zfp_type, nx, ny, nz, nw),
                _ => return None,
            }
        };
        NonNull::new(field).map(|field| Self {
            field,
            block: PhantomData,
        })
    }

    pub(super) fn as_zfp_field(&self) -> *mut zfp_field {
        self.field.as_ptr()
    }
}

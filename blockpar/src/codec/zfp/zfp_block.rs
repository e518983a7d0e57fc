use blockpar_plan::ElementType;

/// The elements of a block in one of the native `zfp` scalar types.
#[derive(Debug)]
pub(super) enum ZfpBlock {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl ZfpBlock {
    /// Copies native-endian element bytes into a block.
    pub(super) fn from_bytes(bytes: &[u8], element_type: ElementType) -> Self {
        match element_type {
            ElementType::Int32 => Self::Int32(bytemuck::pod_collect_to_vec(bytes)),
            ElementType::Int64 => Self::Int64(bytemuck::pod_collect_to_vec(bytes)),
            ElementType::Float32 => Self::Float32(bytemuck::pod_collect_to_vec(bytes)),
            ElementType::Float64 => Self::Float64(bytemuck::pod_collect_to_vec(bytes)),
        }
    }

    /// Creates a zeroed block of `num_elements` elements.
    pub(super) fn new_zeroed(element_type: ElementType, num_elements: usize) -> Self {
        match element_type {
            ElementType::Int32 => Self::Int32(vec![0; num_elements]),
            ElementType::Int64 => Self::Int64(vec![0; num_elements]),
            ElementType::Float32 => Self::Float32(vec![0.0; num_elements]),
            ElementType::Float64 => Self::Float64(vec![0.0; num_elements]),
        }
    }

    pub(super) fn zfp_type(&self) -> zfp_sys::zfp_type {
        match self {
            Self::Int32(_) => zfp_sys::zfp_type_zfp_type_int32,
            Self::Int64(_) => zfp_sys::zfp_type_zfp_type_int64,
            Self::Float32(_) => zfp_sys::zfp_type_zfp_type_float,
            Self::Float64(_) => zfp_sys::zfp_type_zfp_type_double,
        }
    }

    pub(super) fn as_mut_ptr(&mut self) -> *mut std::ffi::c_void {
        match self {
            Self::Int32(v) => v.as_mut_ptr().cast::<std::ffi::c_void>(),
            Self::Int64(v) => v.as_mut_ptr().cast::<std::ffi::c_void>(),
            Self::Float32(v) => v.as_mut_ptr().cast::<std::ffi::c_void>(),
            Self::Float64(v) => v.as_mut_ptr().cast::<std::ffi::c_void>(),
        }
    }

    /// Returns the native-endian element bytes.
    pub(super) fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Int32(v) => bytemuck::cast_slice(v),
            Self::Int64(v) => bytemuck::cast_slice(v),
            Self::Float32(v) => bytemuck::cast_slice(v),
            Self::Float64(v) => bytemuck::cast_slice(v),
        }
    }
}

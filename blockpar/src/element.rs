use blockpar_plan::ElementType;

/// A native element type of a [`SharedBuffer`](crate::SharedBuffer).
pub trait Element: bytemuck::Pod + Send + Sync + std::fmt::Debug {
    /// The element type.
    const ELEMENT_TYPE: ElementType;
}

macro_rules! impl_element {
    ($type:ty, $element_type:ident) => {
        impl Element for $type {
            const ELEMENT_TYPE: ElementType = ElementType::$element_type;
        }
    };
}

impl_element!(f32, Float32);
impl_element!(f64, Float64);
impl_element!(i32, Int32);
impl_element!(i64, Int64);

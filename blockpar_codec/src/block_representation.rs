use blockpar_plan::{BlockSubset, ElementType};

/// The representation of a decoded block: its shape and element type.
///
/// Blocks are passed to a codec as native-endian element bytes in row-major order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockRepresentation {
    shape: Vec<u64>,
    element_type: ElementType,
}

impl BlockRepresentation {
    /// Create a new block representation.
    #[must_use]
    pub fn new(shape: Vec<u64>, element_type: ElementType) -> Self {
        Self {
            shape,
            element_type,
        }
    }

    /// Create the representation of the block covering `subset`.
    #[must_use]
    pub fn from_subset(subset: &BlockSubset, element_type: ElementType) -> Self {
        Self::new(subset.shape().to_vec(), element_type)
    }

    /// The shape of the block.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The element type.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// The number of elements in the block.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// The size of the decoded block in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        usize::try_from(self.num_elements())
            .unwrap_or(usize::MAX)
            .saturating_mul(self.element_type.size())
    }
}

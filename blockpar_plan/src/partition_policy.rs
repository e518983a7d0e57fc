use crate::PlanError;

/// The default estimated compression ratio of a [`PartitionPolicy::CacheTarget`].
pub const DEFAULT_ESTIMATED_COMPRESSION_RATIO: f64 = 3.0;

/// A policy for grouping blocks into chunks.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PartitionPolicy {
    /// Size chunks so that their estimated compressed size is close to `bytes_per_chunk`.
    ///
    /// The compressed size of a block is estimated with a fixed, user supplied `estimated_compression_ratio`.
    CacheTarget {
        /// The target compressed size of a chunk in bytes.
        bytes_per_chunk: u64,
        /// The estimated ratio of uncompressed to compressed size.
        estimated_compression_ratio: f64,
    },
    /// Divide the blocks into `parts` chunks with (as near as possible) equal block counts.
    EqualCount {
        /// The number of chunks.
        parts: u64,
    },
}

impl PartitionPolicy {
    /// Create a [`PartitionPolicy::CacheTarget`] with the [`DEFAULT_ESTIMATED_COMPRESSION_RATIO`].
    #[must_use]
    pub const fn cache_target(bytes_per_chunk: u64) -> Self {
        Self::CacheTarget {
            bytes_per_chunk,
            estimated_compression_ratio: DEFAULT_ESTIMATED_COMPRESSION_RATIO,
        }
    }

    /// Create a [`PartitionPolicy::EqualCount`].
    #[must_use]
    pub const fn equal_count(parts: u64) -> Self {
        Self::EqualCount { parts }
    }

    /// Create a partition policy from optional parameters.
    ///
    /// Exactly one of `bytes_per_chunk` and `parts` must be supplied.
    /// `estimated_compression_ratio` is only used by [`PartitionPolicy::CacheTarget`].
    ///
    /// # Errors
    /// Returns [`PlanError::AmbiguousPartitionPolicy`] if neither or both parameters are supplied, or an error if the policy is invalid.
    pub fn from_parameters(
        bytes_per_chunk: Option<u64>,
        parts: Option<u64>,
        estimated_compression_ratio: f64,
    ) -> Result<Self, PlanError> {
        let policy = match (bytes_per_chunk, parts) {
            (Some(bytes_per_chunk), None) => Self::CacheTarget {
                bytes_per_chunk,
                estimated_compression_ratio,
            },
            (None, Some(parts)) => Self::EqualCount { parts },
            (None, None) | (Some(_), Some(_)) => {
                return Err(PlanError::AmbiguousPartitionPolicy);
            }
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Validate the policy parameters.
    ///
    /// # Errors
    /// Returns a [`PlanError`] if
    ///  - `bytes_per_chunk` is zero,
    ///  - `estimated_compression_ratio` is not finite and positive, or
    ///  - `parts` is zero.
    pub fn validate(&self) -> Result<(), PlanError> {
        match *self {
            Self::CacheTarget {
                bytes_per_chunk,
                estimated_compression_ratio,
            } => {
                if bytes_per_chunk == 0 {
                    Err(PlanError::InvalidBytesPerChunk)
                } else if !estimated_compression_ratio.is_finite()
                    || estimated_compression_ratio <= 0.0
                {
                    Err(PlanError::InvalidCompressionRatio(
                        estimated_compression_ratio,
                    ))
                } else {
                    Ok(())
                }
            }
            Self::EqualCount { parts } => {
                if parts == 0 {
                    Err(PlanError::InvalidPartCount)
                } else {
                    Ok(())
                }
            }
        }
    }
}

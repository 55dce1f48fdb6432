use thiserror::Error;

use crate::dma::DmaError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TsoError {
    #[error("ethertype {0:#06x} is not supported")]
    UnsupportedEtherType(u16),
    #[error("ip protocol {0} is not TCP")]
    UnsupportedTransport(u8),
    #[error("header needs {needed} bytes but the linear region has {available}")]
    TruncatedHeader { needed: usize, available: usize },
    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),
    #[error("mss must be non-zero")]
    InvalidMss,
    #[error("segment of {len} bytes does not fit the 16-bit descriptor length fields")]
    SegmentTooLarge { len: usize },
    #[error("dma mapping failed: {0}")]
    MappingFailure(#[from] DmaError),
    #[error("segment {segment} needs more than {capacity} fragments")]
    FragmentOverflow { segment: usize, capacity: usize },
    #[error("descriptor chain exhausted after {filled} segments with {remaining} payload bytes left")]
    PoolExhausted { filled: u32, remaining: usize },
    #[error("segment pool has {available} free descriptors, {requested} requested")]
    PoolAllocFailed { requested: usize, available: usize },
}

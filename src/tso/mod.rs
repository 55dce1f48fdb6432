//! TCP 分段卸载（TSO）描述符构建
//!
//! 流程：`count_segments` 估算段数 -> 调用方准备描述符 -> `inspect` 解析共享头部
//! -> `build_segments` 驱动 `RegionCursor` 填充描述符 -> 交给发送层。

mod builder;
mod count;
mod cursor;
mod error;
mod info;
mod seg;

pub use builder::{build_segments, release_segments, segment_packet};
pub use count::count_segments;
pub use cursor::{PayloadRun, RegionCursor};
pub use error::TsoError;
pub use info::{ChecksumFlags, CommonSegmentInfo, EtherType, HeaderSpan, TcpFlags, inspect};
pub use seg::{FRAG_NUM_MAX, FragList, Fragment, SegmentDescriptor, SeqState, TsoFlags};

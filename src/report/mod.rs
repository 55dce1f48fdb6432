//! 分段结果的结构化输出（JSON）
//!
//! 供命令行工具和离线核对使用：每个分段一条记录，外加整包的汇总信息。

mod types;

pub use types::{FragReport, PacketReport, SegmentReport};

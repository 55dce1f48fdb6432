//! DMA 映射设施
//!
//! 构建器只通过 [`DmaMapper`] 接触总线地址：每个片段映射一次，失败时按原样解除映射。
//! 实现方需自行保证线程安全（方法均为 `&self`）。

mod sim;

pub use sim::{DmaSpec, SimDmaMapper};

use thiserror::Error;

/// DMA 传输方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaDirection {
    /// CPU -> 设备（发送路径只用这个）
    ToDevice,
    /// 设备 -> CPU
    FromDevice,
}

/// 设备可见的总线地址。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BusAddr(pub u64);

impl BusAddr {
    /// 低 32 位
    pub fn lo(self) -> u32 {
        self.0 as u32
    }

    /// 高 32 位
    pub fn hi(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// 由描述符里拆开的两部分重新拼出地址
    pub fn from_parts(lo: u32, hi: u32) -> Self {
        BusAddr(((hi as u64) << 32) | lo as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DmaError {
    #[error("bus address space exhausted")]
    Exhausted,
    #[error("injected mapping failure on map call #{call}")]
    Injected { call: u64 },
    #[error("unmap of unknown mapping {0:#x}")]
    UnknownMapping(u64),
}

/// 总线地址映射抽象
pub trait DmaMapper: Sync {
    /// 映射 `[vaddr, vaddr + len)`，返回对应的总线地址。
    fn map(&self, vaddr: usize, len: usize, dir: DmaDirection) -> Result<BusAddr, DmaError>;
    /// 解除一次 `map` 的映射。
    fn unmap(&self, bus: BusAddr, len: usize, dir: DmaDirection) -> Result<(), DmaError>;
}

//! 载荷游标
//!
//! 载荷物理上分布在线性区（头部之后）和若干载荷块里；游标把它们串成一条字节流，
//! 每次交出一段不跨区域的连续内存，并为这一段做一次 DMA 映射。

use tracing::trace;

use super::TsoError;
use crate::dma::{BusAddr, DmaDirection, DmaMapper};
use crate::pkt::TxPacket;

/// 游标当前所在的区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunSource {
    Linear { offset: usize },
    Chunk { index: usize, offset: usize },
}

/// 一段已映射的连续载荷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadRun {
    pub vaddr: usize,
    pub bus: BusAddr,
    pub len: usize,
}

#[derive(Debug)]
pub struct RegionCursor<'a> {
    pkt: &'a TxPacket,
    pos: RunSource,
    /// 当前区域剩余字节
    run_left: usize,
    /// 整包剩余载荷字节
    total_left: usize,
}

impl<'a> RegionCursor<'a> {
    /// 定位到线性区里 `header_len` 之后
    pub fn new(pkt: &'a TxPacket, header_len: usize) -> Result<Self, TsoError> {
        let linear = pkt.linear().len();
        if header_len > linear {
            return Err(TsoError::TruncatedHeader {
                needed: header_len,
                available: linear,
            });
        }
        Ok(Self {
            pkt,
            pos: RunSource::Linear { offset: header_len },
            run_left: linear - header_len,
            total_left: pkt.len() - header_len,
        })
    }

    /// 剩余未交出的载荷字节
    pub fn remaining(&self) -> usize {
        self.total_left
    }

    pub fn is_exhausted(&self) -> bool {
        self.total_left == 0
    }

    fn next_chunk_index(&self) -> usize {
        match self.pos {
            RunSource::Linear { .. } => 0,
            RunSource::Chunk { index, .. } => index + 1,
        }
    }

    fn vaddr(&self) -> usize {
        match self.pos {
            RunSource::Linear { offset } => self.pkt.linear_vaddr() + offset,
            RunSource::Chunk { index, offset } => self.pkt.chunks()[index].vaddr() + offset,
        }
    }

    /// 交出至多 `max_len` 字节的一段连续载荷；载荷耗尽时返回 `None`。
    ///
    /// 映射失败时游标不前进。
    pub fn next_run<M: DmaMapper + ?Sized>(
        &mut self,
        max_len: usize,
        mapper: &M,
    ) -> Result<Option<PayloadRun>, TsoError> {
        if self.total_left == 0 || max_len == 0 {
            return Ok(None);
        }

        // 跳到下一个非空区域
        while self.run_left == 0 {
            let index = self.next_chunk_index();
            let chunk = &self.pkt.chunks()[index];
            self.pos = RunSource::Chunk { index, offset: 0 };
            self.run_left = chunk.len();
        }

        let len = self.run_left.min(max_len);
        let vaddr = self.vaddr();
        let bus = mapper.map(vaddr, len, DmaDirection::ToDevice)?;

        self.pos = match self.pos {
            RunSource::Linear { offset } => RunSource::Linear { offset: offset + len },
            RunSource::Chunk { index, offset } => RunSource::Chunk {
                index,
                offset: offset + len,
            },
        };
        self.run_left -= len;
        self.total_left -= len;

        trace!(pos = ?self.pos, len, left = self.total_left, "next_run");
        Ok(Some(PayloadRun { vaddr, bus, len }))
    }
}

//! 发送提交路径
//!
//! 对每个待发送包：估算段数 -> 从池里整体申请描述符 -> 构建分段；
//! 发送完成后解除映射并把描述符还给池。

mod ext_desc;
mod pool;
mod stats;

pub use ext_desc::{EXT_DESC_WORDS, FLAG_WORDS, encode_ext_desc, encode_flags};
pub use pool::SegmentPool;
pub use stats::TxStats;

use tracing::{debug, info};

use crate::dma::DmaMapper;
use crate::pkt::TxPacket;
use crate::tso::{RegionCursor, SegmentDescriptor, TsoError, build_segments, count_segments, inspect, release_segments};

/// 一个包准备好的发送信息
#[derive(Debug)]
pub struct TsoInfo {
    pub is_tso: bool,
    pub segments: Vec<SegmentDescriptor>,
}

impl TsoInfo {
    /// 交给硬件的发送单元数；非 TSO 包整体作为一个单元
    pub fn num_segs(&self) -> usize {
        if self.is_tso { self.segments.len() } else { 1 }
    }
}

/// 持有描述符池和 DMA 设施的发送端
#[derive(Debug)]
pub struct TsoTx<M: DmaMapper> {
    pool: SegmentPool,
    mapper: M,
    pub stats: TxStats,
}

impl<M: DmaMapper> TsoTx<M> {
    pub fn new(pool_size: usize, mapper: M) -> Self {
        Self {
            pool: SegmentPool::new(pool_size),
            mapper,
            stats: TxStats::default(),
        }
    }

    pub fn pool(&self) -> &SegmentPool {
        &self.pool
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    fn record_error(&mut self, e: &TsoError) {
        match e {
            TsoError::MappingFailure(_) => self.stats.mapping_failures += 1,
            TsoError::PoolAllocFailed { .. } | TsoError::PoolExhausted { .. } => self.stats.alloc_failures += 1,
            TsoError::FragmentOverflow { .. } => self.stats.fragment_overflows += 1,
            TsoError::UnsupportedEtherType(_)
            | TsoError::UnsupportedTransport(_)
            | TsoError::TruncatedHeader { .. }
            | TsoError::MalformedHeader(_)
            | TsoError::InvalidMss
            | TsoError::SegmentTooLarge { .. } => self.stats.rejected += 1,
        }
    }

    /// 为一个包准备分段
    #[tracing::instrument(skip_all, fields(len = pkt.len(), mss = pkt.gso_size()))]
    pub fn prepare(&mut self, pkt: &TxPacket) -> Result<TsoInfo, TsoError> {
        if !pkt.is_tso() {
            self.stats.non_tso_packets += 1;
            return Ok(TsoInfo {
                is_tso: false,
                segments: Vec::new(),
            });
        }

        let result = self.prepare_tso(pkt);
        if let Err(e) = &result {
            self.record_error(e);
        }
        result
    }

    fn prepare_tso(&mut self, pkt: &TxPacket) -> Result<TsoInfo, TsoError> {
        let info = inspect(pkt)?;
        let cursor = RegionCursor::new(pkt, info.combined_header_len)?;
        let payload = cursor.remaining();
        let num_seg = count_segments(pkt.len(), info.combined_header_len, pkt.gso_size());
        debug!(num_seg, payload, "申请 TSO 描述符");

        let mut chain = self.pool.alloc_chain(num_seg as usize)?;
        match build_segments(&info, cursor, &mut chain, pkt.gso_size(), &self.mapper) {
            Ok(filled) => {
                // 段数与估算一致时不会有剩余
                for spare in chain.split_off(filled as usize) {
                    self.pool.free(spare);
                }
                self.stats.tso_packets += 1;
                self.stats.segments += filled as u64;
                self.stats.payload_bytes += payload as u64;
                Ok(TsoInfo {
                    is_tso: true,
                    segments: chain,
                })
            }
            Err(e) => {
                let _ = release_segments(&mut chain, &self.mapper);
                self.pool.free_chain(chain);
                Err(e)
            }
        }
    }

    /// 发送完成：解除映射并归还描述符
    pub fn complete(&mut self, mut tso: TsoInfo) -> Result<(), TsoError> {
        let released = release_segments(&mut tso.segments, &self.mapper);
        info!(segments = tso.segments.len(), "TSO 发送完成");
        self.pool.free_chain(tso.segments);
        released
    }
}

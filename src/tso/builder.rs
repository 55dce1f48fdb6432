//! 分段构建器
//!
//! 按 MSS 把载荷切成若干段，原地填充调用方预先分配好的描述符链。每段的第 0 个片段
//! 都是重新映射的共享头部，后面跟着从游标取出的载荷片段。
//!
//! 失败语义：
//! - 映射失败 / 片段表溢出：解除本包的全部映射，清零所有碰过的描述符；
//! - 描述符链不够长：已填好的分段保持有效（仍处于映射状态），错误里带回已填数量。

use tracing::{debug, trace, warn};

use super::cursor::RegionCursor;
use super::info::{CommonSegmentInfo, TcpFlags, inspect};
use super::seg::{FRAG_NUM_MAX, Fragment, SegmentDescriptor, SeqState, TsoFlags};
use super::TsoError;
use crate::dma::{DmaDirection, DmaMapper};
use crate::pkt::TxPacket;

/// 初始化一个分段的标志位，返回下一个分段的状态
fn start_segment(seg: &mut SegmentDescriptor, info: &CommonSegmentInfo, state: SeqState) -> SeqState {
    seg.reset();
    seg.flags = TsoFlags {
        tso_enable: true,
        partial_checksum_en: false,
        ipv4_checksum_en: info.checksum.ipv4,
        tcp_ipv4_checksum_en: info.checksum.tcp_ipv4,
        tcp_ipv6_checksum_en: info.checksum.tcp_ipv6,
        l2_len: 0,
        tcp_flags_mask: TsoFlags::TCP_FLAGS_MASK,
        ip_len: 0,
        ip_id: state.ip_id.unwrap_or(0),
        tcp_seq: state.tcp_seq,
        tcp_flags: info.tcp_flags.without_fin(),
    };
    state.next_segment()
}

fn push_mapped<M: DmaMapper + ?Sized>(
    seg: &mut SegmentDescriptor,
    index: usize,
    frag: Fragment,
    mapper: &M,
) -> Result<(), TsoError> {
    seg.frags.push(frag).map_err(|rejected| {
        let _ = mapper.unmap(rejected.bus_addr(), rejected.len, DmaDirection::ToDevice);
        TsoError::FragmentOverflow {
            segment: index,
            capacity: FRAG_NUM_MAX,
        }
    })
}

fn fill_chain<M: DmaMapper + ?Sized>(
    info: &CommonSegmentInfo,
    cursor: &mut RegionCursor<'_>,
    segments: &mut [SegmentDescriptor],
    mss: usize,
    mapper: &M,
    touched: &mut usize,
) -> Result<u32, TsoError> {
    if cursor.is_exhausted() {
        return Ok(0);
    }

    let mut state = SeqState::new(info);
    let mut filled = 0u32;

    for (index, seg) in segments.iter_mut().enumerate() {
        *touched = index + 1;
        state = start_segment(seg, info, state);

        let bus = mapper.map(info.header.vaddr, info.header.len, DmaDirection::ToDevice)?;
        push_mapped(seg, index, Fragment::new(info.header.vaddr, info.header.len, bus), mapper)?;

        let mut placed = 0;
        while placed < mss && !cursor.is_exhausted() {
            if seg.frags.is_full() {
                return Err(TsoError::FragmentOverflow {
                    segment: index,
                    capacity: FRAG_NUM_MAX,
                });
            }
            let Some(run) = cursor.next_run(mss - placed, mapper)? else {
                break;
            };
            push_mapped(seg, index, Fragment::new(run.vaddr, run.len, run.bus), mapper)?;
            placed += run.len;
            state = state.advance_seq(run.len);
        }

        seg.payload_len = placed;
        // build_segments 已保证 ip_tcp_header_len + mss 不超过 u16
        seg.flags.ip_len = (info.ip_tcp_header_len + placed) as u16;
        filled += 1;
        trace!(
            index,
            seq = seg.flags.tcp_seq,
            ip_id = seg.flags.ip_id,
            len = placed,
            frags = seg.frags.len(),
            "分段完成"
        );

        if cursor.is_exhausted() {
            if info.tcp_flags.fin() {
                seg.flags.tcp_flags.0 |= TcpFlags::FIN;
            }
            return Ok(filled);
        }
    }

    Err(TsoError::PoolExhausted {
        filled,
        remaining: cursor.remaining(),
    })
}

/// 解除描述符里所有片段的映射并清零描述符。
///
/// 所有片段都会尝试解除映射，返回遇到的第一个错误。
pub fn release_segments<M: DmaMapper + ?Sized>(
    segments: &mut [SegmentDescriptor],
    mapper: &M,
) -> Result<(), TsoError> {
    let mut first_err = None;
    for seg in segments.iter_mut() {
        for frag in seg.frags.as_slice() {
            if let Err(e) = mapper.unmap(frag.bus_addr(), frag.len, DmaDirection::ToDevice) {
                warn!(error = %e, "解除片段映射失败");
                if first_err.is_none() {
                    first_err = Some(TsoError::from(e));
                }
            }
        }
        seg.reset();
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// 用已解析的共享信息和游标填充描述符链，返回填好的分段数。
pub fn build_segments<M: DmaMapper + ?Sized>(
    info: &CommonSegmentInfo,
    mut cursor: RegionCursor<'_>,
    segments: &mut [SegmentDescriptor],
    mss: u32,
    mapper: &M,
) -> Result<u32, TsoError> {
    if mss == 0 {
        return Err(TsoError::InvalidMss);
    }
    // ip_len 与片段长度在描述符里都只有 16 位
    let widest = (info.ip_tcp_header_len + mss as usize).max(info.combined_header_len);
    if widest > u16::MAX as usize {
        warn!(mss, header_len = info.ip_tcp_header_len, "TSO: 分段超出 16 位长度字段");
        return Err(TsoError::SegmentTooLarge { len: widest });
    }

    let mut touched = 0;
    match fill_chain(info, &mut cursor, segments, mss as usize, mapper, &mut touched) {
        Ok(n) => {
            debug!(segments = n, "TSO 分段完成");
            Ok(n)
        }
        Err(e @ TsoError::PoolExhausted { .. }) => {
            warn!(error = %e, "描述符链不足");
            Err(e)
        }
        Err(e) => {
            warn!(error = %e, touched, "TSO 分段失败，回滚映射");
            let _ = release_segments(&mut segments[..touched], mapper);
            Err(e)
        }
    }
}

/// 解析头部并按包自身的 `gso_size` 分段。
#[tracing::instrument(skip_all, fields(len = pkt.len(), mss = pkt.gso_size(), chain = segments.len()))]
pub fn segment_packet<M: DmaMapper + ?Sized>(
    pkt: &TxPacket,
    segments: &mut [SegmentDescriptor],
    mapper: &M,
) -> Result<u32, TsoError> {
    let info = inspect(pkt)?;
    let cursor = RegionCursor::new(pkt, info.combined_header_len)?;
    build_segments(&info, cursor, segments, pkt.gso_size(), mapper)
}

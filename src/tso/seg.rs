//! 分段描述符及其片段表

use crate::dma::BusAddr;

use super::info::{CommonSegmentInfo, TcpFlags};

/// 每个分段最多携带的片段数（含第 0 个头部片段）
pub const FRAG_NUM_MAX: usize = 6;

/// 一段连续内存
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fragment {
    pub vaddr: usize,
    pub len: usize,
    pub paddr_lo: u32,
    pub paddr_hi: u32,
}

impl Fragment {
    pub fn new(vaddr: usize, len: usize, bus: BusAddr) -> Self {
        Self {
            vaddr,
            len,
            paddr_lo: bus.lo(),
            paddr_hi: bus.hi(),
        }
    }

    pub fn bus_addr(&self) -> BusAddr {
        BusAddr::from_parts(self.paddr_lo, self.paddr_hi)
    }
}

/// 定长片段表，满了以后 `push` 返回被拒绝的片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragList {
    frags: [Fragment; FRAG_NUM_MAX],
    len: usize,
}

impl Default for FragList {
    fn default() -> Self {
        Self {
            frags: [Fragment::default(); FRAG_NUM_MAX],
            len: 0,
        }
    }
}

impl FragList {
    pub fn push(&mut self, frag: Fragment) -> Result<(), Fragment> {
        if self.is_full() {
            return Err(frag);
        }
        self.frags[self.len] = frag;
        self.len += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == FRAG_NUM_MAX
    }

    pub fn capacity(&self) -> usize {
        FRAG_NUM_MAX
    }

    pub fn as_slice(&self) -> &[Fragment] {
        &self.frags[..self.len]
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// 每个分段交给硬件的 TSO 标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TsoFlags {
    pub tso_enable: bool,
    pub partial_checksum_en: bool,
    pub ipv4_checksum_en: bool,
    pub tcp_ipv4_checksum_en: bool,
    pub tcp_ipv6_checksum_en: bool,
    pub l2_len: u8,
    pub tcp_flags_mask: u16,
    /// IP + TCP 头长度加上本段载荷长度
    pub ip_len: u16,
    pub ip_id: u16,
    pub tcp_seq: u32,
    pub tcp_flags: TcpFlags,
}

impl TsoFlags {
    pub const TCP_FLAGS_MASK: u16 = 0x1FF;

    pub fn fin(&self) -> bool {
        self.tcp_flags.fin()
    }
}

/// 逐段推进的 IP ID / TCP 序号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqState {
    pub ip_id: Option<u16>,
    pub tcp_seq: u32,
}

impl SeqState {
    pub fn new(info: &CommonSegmentInfo) -> Self {
        Self {
            ip_id: info.ipv4_id,
            tcp_seq: info.initial_tcp_seq,
        }
    }

    /// 下一个分段使用的 IP ID
    pub fn next_segment(self) -> Self {
        Self {
            ip_id: self.ip_id.map(|id| id.wrapping_add(1)),
            ..self
        }
    }

    pub fn advance_seq(self, bytes: usize) -> Self {
        Self {
            tcp_seq: self.tcp_seq.wrapping_add(bytes as u32),
            ..self
        }
    }
}

/// 一个输出 TCP 分段
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SegmentDescriptor {
    pub flags: TsoFlags,
    pub frags: FragList,
    pub payload_len: usize,
}

impl SegmentDescriptor {
    /// 清空上一个包留下的状态
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn ip_id(&self) -> u16 {
        self.flags.ip_id
    }

    pub fn tcp_seq(&self) -> u32 {
        self.flags.tcp_seq
    }

    pub fn fin(&self) -> bool {
        self.flags.fin()
    }

    pub fn header_frag(&self) -> Option<&Fragment> {
        self.frags.as_slice().first()
    }

    pub fn payload_frags(&self) -> &[Fragment] {
        self.frags.as_slice().get(1..).unwrap_or(&[])
    }

    /// 头部 + 载荷的总字节数
    pub fn total_len(&self) -> usize {
        self.frags.as_slice().iter().map(|f| f.len).sum()
    }
}

use serde::{Deserialize, Serialize};

use crate::tso::{CommonSegmentInfo, EtherType, SegmentDescriptor};
use crate::tx::encode_ext_desc;

/// 片段在报告中的样子（不输出虚拟地址，避免结果依赖进程内存布局）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragReport {
    pub len: usize,
    pub paddr_lo: u32,
    pub paddr_hi: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentReport {
    pub index: usize,
    pub tcp_seq: u32,
    /// IPv6 没有 IP ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_id: Option<u16>,
    pub payload_len: usize,
    pub ip_len: u16,
    pub tcp_flags: u8,
    pub fin: bool,
    pub frags: Vec<FragReport>,
    /// 扩展描述符原始字（十六进制）
    pub ext_desc: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketReport {
    /// "ipv4" / "ipv6"
    pub ether_type: String,
    pub l2_header_len: usize,
    pub header_len: usize,
    pub payload_len: usize,
    pub mss: u32,
    pub segments: Vec<SegmentReport>,
}

impl SegmentReport {
    pub fn new(index: usize, seg: &SegmentDescriptor, ipv4: bool) -> Self {
        Self {
            index,
            tcp_seq: seg.tcp_seq(),
            ip_id: ipv4.then(|| seg.ip_id()),
            payload_len: seg.payload_len,
            ip_len: seg.flags.ip_len,
            tcp_flags: seg.flags.tcp_flags.0,
            fin: seg.fin(),
            frags: seg
                .frags
                .as_slice()
                .iter()
                .map(|f| FragReport {
                    len: f.len,
                    paddr_lo: f.paddr_lo,
                    paddr_hi: f.paddr_hi,
                })
                .collect(),
            ext_desc: encode_ext_desc(seg).iter().map(|w| format!("{w:#010x}")).collect(),
        }
    }
}

impl PacketReport {
    pub fn new(info: &CommonSegmentInfo, mss: u32, segments: &[SegmentDescriptor]) -> Self {
        let ipv4 = info.ether_type == EtherType::Ipv4;
        Self {
            ether_type: if ipv4 { "ipv4" } else { "ipv6" }.to_string(),
            l2_header_len: info.l2_header_len,
            header_len: info.combined_header_len,
            payload_len: segments.iter().map(|s| s.payload_len).sum(),
            mss,
            segments: segments
                .iter()
                .enumerate()
                .map(|(i, s)| SegmentReport::new(i, s, ipv4))
                .collect(),
        }
    }
}

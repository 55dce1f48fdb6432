//! 头部检查：每个包只解析一次共享的以太网/IP/TCP 头，得到 [`CommonSegmentInfo`]。

use tracing::{trace, warn};

use super::TsoError;
use crate::pkt::TxPacket;
use crate::pkt::header::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    Ipv4,
    Ipv6,
}

/// 需要硬件为每个分段计算的校验和
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChecksumFlags {
    pub ipv4: bool,
    pub tcp_ipv4: bool,
    pub tcp_ipv6: bool,
}

/// TCP 控制位，按 TCP 头第 13 字节的位序存放。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags(pub u8);

impl TcpFlags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
    pub const ECE: u8 = 0x40;
    pub const CWR: u8 = 0x80;

    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn fin(self) -> bool {
        self.contains(Self::FIN)
    }

    /// 去掉 FIN 之后的七个控制位（每个分段都带）
    pub fn without_fin(self) -> TcpFlags {
        TcpFlags(self.0 & !Self::FIN)
    }
}

/// 共享头部在线性区里的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSpan {
    pub vaddr: usize,
    pub len: usize,
}

/// 一个巨型包所有分段共享的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonSegmentInfo {
    pub ether_type: EtherType,
    /// 起始 IP ID（仅 IPv4）
    pub ipv4_id: Option<u16>,
    pub checksum: ChecksumFlags,
    /// MAC 头起点到网络层头的距离
    pub l2_header_len: usize,
    /// MAC 头起点到 TCP 载荷的距离
    pub combined_header_len: usize,
    pub ip_tcp_header_len: usize,
    pub header: HeaderSpan,
    pub tcp_flags: TcpFlags,
    pub initial_tcp_seq: u32,
}

fn truncated(needed: usize, available: usize) -> TsoError {
    TsoError::TruncatedHeader { needed, available }
}

/// 跳过 VLAN 标签，返回 (内层 ethertype, 网络层头偏移)
fn l2_protocol(buf: &[u8]) -> Result<(u16, usize), TsoError> {
    let mut off = ETH_HLEN - 2;
    loop {
        let proto = read_u16_be(buf, off).ok_or_else(|| truncated(off + 2, buf.len()))?;
        match proto {
            ETH_P_8021Q | ETH_P_8021AD => off += VLAN_HLEN,
            _ => return Ok((proto, off + 2)),
        }
    }
}

/// 解析 IPv4 头，返回 (ip 头长, ip id)
fn parse_ipv4(buf: &[u8], l2: usize) -> Result<(usize, u16), TsoError> {
    if buf.len() < l2 + IPV4_MIN_HLEN {
        return Err(truncated(l2 + IPV4_MIN_HLEN, buf.len()));
    }
    let ihl = (buf[l2] & 0x0F) as usize * 4;
    if ihl < IPV4_MIN_HLEN {
        return Err(TsoError::MalformedHeader("ipv4 ihl below 5"));
    }
    let proto = buf[l2 + IPV4_PROTO_OFF];
    if proto != IPPROTO_TCP {
        warn!(proto, "TSO: IPv4 协议不是 TCP");
        return Err(TsoError::UnsupportedTransport(proto));
    }
    let id = read_u16_be(buf, l2 + IPV4_ID_OFF).ok_or_else(|| truncated(l2 + 6, buf.len()))?;
    Ok((ihl, id))
}

/// 解析 IPv6 头（含扩展头），返回到 TCP 头为止的长度
fn parse_ipv6(buf: &[u8], l2: usize) -> Result<usize, TsoError> {
    let mut next = read_u8(buf, l2 + IPV6_NEXT_HDR_OFF)
        .ok_or_else(|| truncated(l2 + IPV6_HLEN, buf.len()))?;
    let mut len = IPV6_HLEN;
    while is_ipv6_ext_header(next) {
        let at = l2 + len;
        let (Some(n), Some(ext_len)) = (read_u8(buf, at), read_u8(buf, at + 1)) else {
            return Err(truncated(at + 2, buf.len()));
        };
        next = n;
        len += (ext_len as usize + 1) * 8;
    }
    if next != IPPROTO_TCP {
        warn!(next, "TSO: IPv6 上层协议不是 TCP");
        return Err(TsoError::UnsupportedTransport(next));
    }
    Ok(len)
}

/// 解析共享头部
pub fn inspect(pkt: &TxPacket) -> Result<CommonSegmentInfo, TsoError> {
    let buf = pkt.linear();
    let (proto, l2_header_len) = l2_protocol(buf)?;

    let (ether_type, ip_len, ipv4_id, checksum) = match proto {
        ETH_P_IP => {
            let (ip_len, id) = parse_ipv4(buf, l2_header_len)?;
            let csum = ChecksumFlags {
                ipv4: true,
                tcp_ipv4: true,
                tcp_ipv6: false,
            };
            (EtherType::Ipv4, ip_len, Some(id), csum)
        }
        ETH_P_IPV6 => {
            let ip_len = parse_ipv6(buf, l2_header_len)?;
            let csum = ChecksumFlags {
                tcp_ipv6: true,
                ..ChecksumFlags::default()
            };
            (EtherType::Ipv6, ip_len, None, csum)
        }
        other => {
            warn!("TSO: 不支持的 ethertype {other:#06x}");
            return Err(TsoError::UnsupportedEtherType(other));
        }
    };

    let tcp = l2_header_len + ip_len;
    let doff = read_u8(buf, tcp + TCP_DOFF_OFF).ok_or_else(|| truncated(tcp + TCP_MIN_HLEN, buf.len()))?;
    let tcp_len = (doff >> 4) as usize * 4;
    if tcp_len < TCP_MIN_HLEN {
        return Err(TsoError::MalformedHeader("tcp data offset below 5"));
    }
    let combined_header_len = tcp + tcp_len;
    if combined_header_len > buf.len() {
        return Err(truncated(combined_header_len, buf.len()));
    }
    let initial_tcp_seq = read_u32_be(buf, tcp + TCP_SEQ_OFF).ok_or_else(|| truncated(tcp + 8, buf.len()))?;
    let tcp_flags = TcpFlags(buf[tcp + TCP_FLAGS_OFF]);

    let info = CommonSegmentInfo {
        ether_type,
        ipv4_id,
        checksum,
        l2_header_len,
        combined_header_len,
        ip_tcp_header_len: combined_header_len - l2_header_len,
        header: HeaderSpan {
            vaddr: pkt.linear_vaddr(),
            len: combined_header_len,
        },
        tcp_flags,
        initial_tcp_seq,
    };
    trace!(?info, "解析共享头部");
    Ok(info)
}

//! 从 JSON 描述合成发送包
//!
//! 生成的头部字段都是真实的网络字节序内容；载荷按 `i % 251` 填充，
//! 方便测试逐字节核对分段结果。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::header::*;
use super::{PayloadChunk, TxPacket};

/// 二层承载的协议
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EtherKind {
    #[default]
    Ipv4,
    Ipv6,
    Arp,
}

/// 原始 TCP 头里的控制位
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TcpFlagSpec {
    #[serde(default)]
    pub fin: bool,
    #[serde(default)]
    pub syn: bool,
    #[serde(default)]
    pub rst: bool,
    #[serde(default)]
    pub psh: bool,
    #[serde(default)]
    pub ack: bool,
    #[serde(default)]
    pub urg: bool,
    #[serde(default)]
    pub ece: bool,
    #[serde(default)]
    pub cwr: bool,
}

impl TcpFlagSpec {
    pub fn bits(&self) -> u8 {
        let mut b = 0u8;
        for (on, bit) in [
            (self.fin, 0x01),
            (self.syn, 0x02),
            (self.rst, 0x04),
            (self.psh, 0x08),
            (self.ack, 0x10),
            (self.urg, 0x20),
            (self.ece, 0x40),
            (self.cwr, 0x80),
        ] {
            if on {
                b |= bit;
            }
        }
        b
    }
}

/// IPv4 IHL 与 TCP data offset 都是 4 位字段，选项最多 40 字节
const MAX_OPTIONS_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketSpecError {
    #[error("ipv4_options_len {0} must be a multiple of 4 and at most 40")]
    Ipv4OptionsLen(usize),
    #[error("tcp_options_len {0} must be a multiple of 4 and at most 40")]
    TcpOptionsLen(usize),
}

fn options_len_ok(len: usize) -> bool {
    len % 4 == 0 && len <= MAX_OPTIONS_LEN
}

fn default_mss() -> u32 {
    1460
}

fn default_tcp_options_len() -> usize {
    12
}

/// 一个待分段数据包的描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketSpec {
    #[serde(default)]
    pub ether: EtherKind,
    /// 802.1Q 标签（VLAN ID），按从外到内的顺序
    #[serde(default)]
    pub vlan_tags: Vec<u16>,
    /// 覆盖 IPv4 protocol / IPv6 next header（默认 TCP）
    #[serde(default)]
    pub ip_proto: Option<u8>,
    #[serde(default)]
    pub ip_id: u16,
    /// IPv4 选项长度（字节，必须是 4 的倍数）
    #[serde(default)]
    pub ipv4_options_len: usize,
    /// 在 IPv6 头后插入一个 8 字节的 hop-by-hop 扩展头
    #[serde(default)]
    pub ipv6_hop_by_hop: bool,
    #[serde(default)]
    pub tcp_seq: u32,
    /// TCP 选项长度（字节，必须是 4 的倍数）；默认 12，即时间戳选项的大小
    #[serde(default = "default_tcp_options_len")]
    pub tcp_options_len: usize,
    #[serde(default)]
    pub flags: TcpFlagSpec,
    /// 跟在头部后面、仍位于线性区的载荷字节数
    #[serde(default)]
    pub linear_payload: usize,
    /// 各载荷块的长度
    #[serde(default)]
    pub chunks: Vec<usize>,
    #[serde(default = "default_mss")]
    pub mss: u32,
}

impl Default for PacketSpec {
    fn default() -> Self {
        Self {
            ether: EtherKind::Ipv4,
            vlan_tags: Vec::new(),
            ip_proto: None,
            ip_id: 0,
            ipv4_options_len: 0,
            ipv6_hop_by_hop: false,
            tcp_seq: 0,
            tcp_options_len: default_tcp_options_len(),
            flags: TcpFlagSpec::default(),
            linear_payload: 0,
            chunks: Vec::new(),
            mss: default_mss(),
        }
    }
}

impl PacketSpec {
    /// 检查选项长度能否写进 IHL / data offset
    pub fn validate(&self) -> Result<(), PacketSpecError> {
        if !options_len_ok(self.ipv4_options_len) {
            return Err(PacketSpecError::Ipv4OptionsLen(self.ipv4_options_len));
        }
        if !options_len_ok(self.tcp_options_len) {
            return Err(PacketSpecError::TcpOptionsLen(self.tcp_options_len));
        }
        Ok(())
    }

    /// 载荷总字节数
    pub fn payload_len(&self) -> usize {
        self.linear_payload + self.chunks.iter().sum::<usize>()
    }

    fn l2_len(&self) -> usize {
        ETH_HLEN + VLAN_HLEN * self.vlan_tags.len()
    }

    fn l3_len(&self) -> usize {
        match self.ether {
            EtherKind::Ipv4 => IPV4_MIN_HLEN + self.ipv4_options_len,
            EtherKind::Ipv6 => IPV6_HLEN + if self.ipv6_hop_by_hop { 8 } else { 0 },
            EtherKind::Arp => 28,
        }
    }

    fn l4_len(&self) -> usize {
        match self.ether {
            EtherKind::Arp => 0,
            _ => TCP_MIN_HLEN + self.tcp_options_len,
        }
    }

    /// 以太网 + IP + TCP 头部总长
    pub fn header_len(&self) -> usize {
        self.l2_len() + self.l3_len() + self.l4_len()
    }

    /// 生成头部字节，调用前应先通过 [`PacketSpec::validate`]
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut h = Vec::with_capacity(self.header_len());
        h.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);
        h.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        for vid in &self.vlan_tags {
            h.extend_from_slice(&ETH_P_8021Q.to_be_bytes());
            h.extend_from_slice(&(vid & 0x0FFF).to_be_bytes());
        }
        let ether_type = match self.ether {
            EtherKind::Ipv4 => ETH_P_IP,
            EtherKind::Ipv6 => ETH_P_IPV6,
            EtherKind::Arp => ETH_P_ARP,
        };
        h.extend_from_slice(&ether_type.to_be_bytes());

        let proto = self.ip_proto.unwrap_or(IPPROTO_TCP);
        let l4_total = self.l4_len() + self.payload_len();
        match self.ether {
            EtherKind::Ipv4 => {
                let ihl = (IPV4_MIN_HLEN + self.ipv4_options_len) / 4;
                let total = (ihl * 4 + l4_total).min(u16::MAX as usize) as u16;
                h.push(0x40 | (ihl as u8 & 0x0F));
                h.push(0);
                h.extend_from_slice(&total.to_be_bytes());
                h.extend_from_slice(&self.ip_id.to_be_bytes());
                h.extend_from_slice(&0x4000u16.to_be_bytes()); // DF
                h.push(64);
                h.push(proto);
                h.extend_from_slice(&[0, 0]);
                h.extend_from_slice(&[10, 0, 0, 1]);
                h.extend_from_slice(&[10, 0, 0, 2]);
                h.extend(std::iter::repeat_n(1u8, self.ipv4_options_len));
            }
            EtherKind::Ipv6 => {
                let ext = if self.ipv6_hop_by_hop { 8 } else { 0 };
                let payload = (ext + l4_total).min(u16::MAX as usize) as u16;
                h.extend_from_slice(&[0x60, 0, 0, 0]);
                h.extend_from_slice(&payload.to_be_bytes());
                h.push(if self.ipv6_hop_by_hop { IPPROTO_HOPOPTS } else { proto });
                h.push(64);
                let mut src = [0u8; 16];
                src[0] = 0xfd;
                src[15] = 1;
                let mut dst = src;
                dst[15] = 2;
                h.extend_from_slice(&src);
                h.extend_from_slice(&dst);
                if self.ipv6_hop_by_hop {
                    // next header, hdr ext len = 0 (8 字节), PadN 填充
                    h.extend_from_slice(&[proto, 0, 1, 4, 0, 0, 0, 0]);
                }
            }
            EtherKind::Arp => {
                h.extend_from_slice(&[0, 1, 0x08, 0x00, 6, 4, 0, 1]);
                h.extend(std::iter::repeat_n(0u8, 20));
                return h;
            }
        }

        let doff = (TCP_MIN_HLEN + self.tcp_options_len) / 4;
        h.extend_from_slice(&40000u16.to_be_bytes());
        h.extend_from_slice(&80u16.to_be_bytes());
        h.extend_from_slice(&self.tcp_seq.to_be_bytes());
        h.extend_from_slice(&0u32.to_be_bytes());
        h.push((doff as u8) << 4);
        h.push(self.flags.bits());
        h.extend_from_slice(&0xFFFFu16.to_be_bytes());
        h.extend_from_slice(&[0, 0, 0, 0]);
        h.extend(std::iter::repeat_n(1u8, self.tcp_options_len));
        h
    }

    /// 合成数据包
    pub fn build(&self) -> TxPacket {
        let mut payload = (0..self.payload_len()).map(|i| (i % 251) as u8);

        let mut linear = self.header_bytes();
        linear.extend(payload.by_ref().take(self.linear_payload));

        let chunks = self
            .chunks
            .iter()
            .map(|&n| PayloadChunk::new(payload.by_ref().take(n).collect::<Vec<u8>>()))
            .collect();

        TxPacket::new(linear, chunks, self.mss)
    }
}

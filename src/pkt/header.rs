//! 以太网 / IP / TCP 头部常量与按网络字节序读取的辅助函数。

pub const ETH_HLEN: usize = 14;
pub const VLAN_HLEN: usize = 4;

pub const ETH_P_IP: u16 = 0x0800;
pub const ETH_P_ARP: u16 = 0x0806;
pub const ETH_P_IPV6: u16 = 0x86DD;
pub const ETH_P_8021Q: u16 = 0x8100;
pub const ETH_P_8021AD: u16 = 0x88A8;

pub const IPPROTO_HOPOPTS: u8 = 0;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;
pub const IPPROTO_ROUTING: u8 = 43;
pub const IPPROTO_DSTOPTS: u8 = 60;

pub const IPV4_MIN_HLEN: usize = 20;
pub const IPV6_HLEN: usize = 40;
pub const TCP_MIN_HLEN: usize = 20;

// IPv4 字段偏移
pub const IPV4_ID_OFF: usize = 4;
pub const IPV4_PROTO_OFF: usize = 9;
// IPv6 字段偏移
pub const IPV6_NEXT_HDR_OFF: usize = 6;
// TCP 字段偏移
pub const TCP_SEQ_OFF: usize = 4;
pub const TCP_DOFF_OFF: usize = 12;
pub const TCP_FLAGS_OFF: usize = 13;

pub fn read_u8(buf: &[u8], off: usize) -> Option<u8> {
    buf.get(off).copied()
}

pub fn read_u16_be(buf: &[u8], off: usize) -> Option<u16> {
    let b = buf.get(off..off.checked_add(2)?)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

pub fn read_u32_be(buf: &[u8], off: usize) -> Option<u32> {
    let b = buf.get(off..off.checked_add(4)?)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// 是否为 IPv6 扩展头（只识别 TSO 路径上会出现的三种）
pub fn is_ipv6_ext_header(next: u8) -> bool {
    matches!(next, IPPROTO_HOPOPTS | IPPROTO_ROUTING | IPPROTO_DSTOPTS)
}

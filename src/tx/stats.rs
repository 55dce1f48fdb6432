//! 发送路径统计

/// TSO 发送统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TxStats {
    pub tso_packets: u64,
    pub non_tso_packets: u64,
    pub segments: u64,
    pub payload_bytes: u64,
    /// 头部不被支持（非 IPv4/IPv6、非 TCP、头部截断）或分段超出描述符长度字段
    pub rejected: u64,
    pub mapping_failures: u64,
    /// 描述符池或描述符链不够用
    pub alloc_failures: u64,
    /// 单个分段需要的片段数超过 FRAG_NUM_MAX
    pub fragment_overflows: u64,
}

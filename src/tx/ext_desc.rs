//! MSDU 扩展描述符编码
//!
//! 布局（32 位字）：
//! - 0..6：TSO 标志
//! - 之后每个片段两个字：`[31:0]` 总线地址低 32 位；`[15:0]` 地址高 16 位，`[31:16]` 长度
//! - 片段数不足 `FRAG_NUM_MAX` 时，用一对全零字结束

use crate::tso::{FRAG_NUM_MAX, SegmentDescriptor, TsoFlags};

pub const FLAG_WORDS: usize = 6;
pub const EXT_DESC_WORDS: usize = FLAG_WORDS + 2 * FRAG_NUM_MAX;

// word 0
pub const W0_TSO_ENABLE: u32 = 1 << 0;
pub const W0_PARTIAL_CSUM: u32 = 1 << 1;
pub const W0_IPV4_CSUM: u32 = 1 << 2;
pub const W0_TCP_IPV4_CSUM: u32 = 1 << 3;
pub const W0_TCP_IPV6_CSUM: u32 = 1 << 4;
pub const W0_L2_LEN_SHIFT: u32 = 8;
pub const W0_TCP_FLAGS_SHIFT: u32 = 16;
// word 1
pub const W1_IP_LEN_SHIFT: u32 = 16;

fn bit(on: bool, mask: u32) -> u32 {
    if on { mask } else { 0 }
}

/// 把 TSO 标志编码成前 6 个字
pub fn encode_flags(flags: &TsoFlags) -> [u32; FLAG_WORDS] {
    let w0 = bit(flags.tso_enable, W0_TSO_ENABLE)
        | bit(flags.partial_checksum_en, W0_PARTIAL_CSUM)
        | bit(flags.ipv4_checksum_en, W0_IPV4_CSUM)
        | bit(flags.tcp_ipv4_checksum_en, W0_TCP_IPV4_CSUM)
        | bit(flags.tcp_ipv6_checksum_en, W0_TCP_IPV6_CSUM)
        | (flags.l2_len as u32) << W0_L2_LEN_SHIFT
        | (flags.tcp_flags.0 as u32) << W0_TCP_FLAGS_SHIFT;
    let w1 = (flags.tcp_flags_mask as u32) | (flags.ip_len as u32) << W1_IP_LEN_SHIFT;
    [w0, w1, flags.tcp_seq, flags.ip_id as u32, 0, 0]
}

/// 编码一个分段的完整扩展描述符
pub fn encode_ext_desc(seg: &SegmentDescriptor) -> [u32; EXT_DESC_WORDS] {
    let mut words = [0u32; EXT_DESC_WORDS];
    words[..FLAG_WORDS].copy_from_slice(&encode_flags(&seg.flags));

    let mut at = FLAG_WORDS;
    for frag in seg.frags.as_slice() {
        words[at] = frag.paddr_lo;
        words[at + 1] = ((frag.len as u32) << 16) | (frag.paddr_hi & 0xFFFF);
        at += 2;
    }
    // 片段不满时后面的字保持为零，即终止字
    words
}

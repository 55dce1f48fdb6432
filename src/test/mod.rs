mod dma_sim;
mod ext_desc;
mod tx_path;

use crate::pkt::{PacketSpec, TcpFlagSpec, TxPacket};
use crate::tso::SegmentDescriptor;

/// 1000 字节线性载荷 + 一个 2000 字节载荷块，mss 1460，带 FIN
fn split_3000_spec() -> PacketSpec {
    PacketSpec {
        ip_id: 7,
        tcp_seq: 1000,
        flags: TcpFlagSpec {
            fin: true,
            ack: true,
            psh: true,
            ..TcpFlagSpec::default()
        },
        linear_payload: 1000,
        chunks: vec![2000],
        mss: 1460,
        ..PacketSpec::default()
    }
}

fn chain(n: usize) -> Vec<SegmentDescriptor> {
    vec![SegmentDescriptor::default(); n]
}

/// 把虚拟地址换算成它在整包字节流里的偏移
fn stream_offset(pkt: &TxPacket, vaddr: usize) -> Option<usize> {
    let mut base = 0;
    let regions = std::iter::once((pkt.linear_vaddr(), pkt.linear().len()))
        .chain(pkt.chunks().iter().map(|c| (c.vaddr(), c.len())));
    for (start, len) in regions {
        if vaddr >= start && vaddr < start + len {
            return Some(base + (vaddr - start));
        }
        base += len;
    }
    None
}

/// 所有载荷片段首尾相接地覆盖 `[header_len, pkt.len())`
fn assert_payload_covered(pkt: &TxPacket, header_len: usize, segs: &[SegmentDescriptor]) {
    let mut next = header_len;
    for (i, seg) in segs.iter().enumerate() {
        let header = seg.header_frag().expect("header fragment");
        assert_eq!(header.vaddr, pkt.linear_vaddr(), "seg {i} header vaddr");
        assert_eq!(header.len, header_len, "seg {i} header len");
        for frag in seg.payload_frags() {
            assert_eq!(stream_offset(pkt, frag.vaddr), Some(next), "seg {i} fragment out of order");
            next += frag.len;
        }
    }
    assert_eq!(next, pkt.len(), "payload not fully covered");
}

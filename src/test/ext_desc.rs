use super::{chain, split_3000_spec};
use crate::dma::SimDmaMapper;
use crate::pkt::{EtherKind, PacketSpec};
use crate::tso::{FRAG_NUM_MAX, segment_packet};
use crate::tx::{EXT_DESC_WORDS, FLAG_WORDS, encode_ext_desc};

#[test]
fn ext_desc_packs_flags_and_fragments() {
    let pkt = split_3000_spec().build();
    let dma = SimDmaMapper::default();
    let mut segs = chain(3);
    segment_packet(&pkt, &mut segs, &dma).expect("build");

    let words = encode_ext_desc(&segs[0]);
    assert_eq!(words.len(), 6 + 2 * FRAG_NUM_MAX);

    // tso_enable | ipv4 csum | tcp-over-ipv4 csum，TCP 标志 ACK|PSH 在 [24:16]
    assert_eq!(words[0], 0b1101 | (0x18 << 16));
    assert_eq!(words[1], 0x1FF | ((52 + 1460) << 16));
    assert_eq!(words[2], 1000);
    assert_eq!(words[3], 7);
    assert_eq!(words[4], 0);
    assert_eq!(words[5], 0);

    let frags = segs[0].frags.as_slice();
    assert_eq!(words[6], frags[0].paddr_lo);
    assert_eq!(words[7], (66 << 16) | 1);
    assert_eq!(words[8], frags[1].paddr_lo);
    assert_eq!(words[9], (1000 << 16) | 1);
    assert_eq!(words[10], frags[2].paddr_lo);
    assert_eq!(words[11], (460 << 16) | 1);
    // 终止字
    assert_eq!(words[12], 0);
    assert_eq!(words[13], 0);
}

#[test]
fn ext_desc_of_last_segment_carries_fin() {
    let pkt = split_3000_spec().build();
    let dma = SimDmaMapper::default();
    let mut segs = chain(3);
    segment_packet(&pkt, &mut segs, &dma).expect("build");

    let words = encode_ext_desc(&segs[2]);
    assert_eq!((words[0] >> 16) & 0xFF, 0x19);
    assert_eq!(words[1] >> 16, 52 + 80);
    assert_eq!(words[2], 3920);
    assert_eq!(words[3], 9);
}

#[test]
fn ext_desc_for_ipv6_sets_only_tcp_ipv6_checksum() {
    let spec = PacketSpec {
        ether: EtherKind::Ipv6,
        linear_payload: 100,
        ..PacketSpec::default()
    };
    let pkt = spec.build();
    let dma = SimDmaMapper::default();
    let mut segs = chain(1);
    segment_packet(&pkt, &mut segs, &dma).expect("build");

    let words = encode_ext_desc(&segs[0]);
    assert_eq!(words[0] & 0xFF, 0b1_0001);
    assert_eq!(words[3], 0);
    assert!(words[FLAG_WORDS + 4..EXT_DESC_WORDS].iter().all(|&w| w == 0));
}

use super::split_3000_spec;
use crate::dma::SimDmaMapper;
use crate::pkt::{EtherKind, PacketSpec};
use crate::tso::{SegmentDescriptor, TsoError};
use crate::tx::{SegmentPool, TsoTx, TxStats};

#[test]
fn pool_alloc_chain_is_all_or_nothing() {
    let mut pool = SegmentPool::new(4);
    let chain = pool.alloc_chain(3).expect("alloc");
    assert_eq!(pool.num_free(), 1);

    assert_eq!(
        pool.alloc_chain(2),
        Err(TsoError::PoolAllocFailed {
            requested: 2,
            available: 1
        })
    );
    assert_eq!(pool.num_free(), 1);

    pool.free_chain(chain);
    assert_eq!(pool.num_free(), 4);
    assert_eq!(pool.pool_size(), 4);
}

#[test]
fn pool_zeroes_descriptors_on_free() {
    let mut pool = SegmentPool::new(1);
    let mut seg = pool.alloc().expect("seg");
    seg.payload_len = 99;
    seg.flags.tcp_seq = 1;
    pool.free(seg);
    assert_eq!(pool.alloc(), Some(SegmentDescriptor::default()));
    assert_eq!(pool.alloc(), None);
}

#[test]
fn prepare_then_complete_returns_everything() {
    let pkt = split_3000_spec().build();
    let mut tx = TsoTx::new(8, SimDmaMapper::default());

    let prepared = tx.prepare(&pkt).expect("prepare");
    assert!(prepared.is_tso);
    assert_eq!(prepared.num_segs(), 3);
    assert_eq!(tx.pool().num_free(), 5);
    assert_eq!(tx.mapper().outstanding(), 7);

    tx.complete(prepared).expect("complete");
    assert_eq!(tx.pool().num_free(), 8);
    assert_eq!(tx.mapper().outstanding(), 0);
    assert_eq!(
        tx.stats,
        TxStats {
            tso_packets: 1,
            segments: 3,
            payload_bytes: 3000,
            ..TxStats::default()
        }
    );
}

#[test]
fn non_tso_packet_is_one_unsegmented_unit() {
    let mut pkt = split_3000_spec().build();
    pkt.set_gso_size(0);
    let mut tx = TsoTx::new(8, SimDmaMapper::default());

    let prepared = tx.prepare(&pkt).expect("prepare");
    assert!(!prepared.is_tso);
    assert_eq!(prepared.num_segs(), 1);
    assert_eq!(tx.mapper().map_calls(), 0);
    assert_eq!(tx.stats.non_tso_packets, 1);
}

#[test]
fn undersized_pool_fails_before_any_mapping() {
    let pkt = split_3000_spec().build();
    let mut tx = TsoTx::new(2, SimDmaMapper::default());

    assert!(matches!(tx.prepare(&pkt), Err(TsoError::PoolAllocFailed { .. })));
    assert_eq!(tx.pool().num_free(), 2);
    assert_eq!(tx.mapper().map_calls(), 0);
    assert_eq!(tx.stats.alloc_failures, 1);
}

#[test]
fn mapping_failure_restores_pool_and_mappings() {
    let pkt = split_3000_spec().build();
    let mut tx = TsoTx::new(8, SimDmaMapper::failing_after(6));

    assert!(matches!(tx.prepare(&pkt), Err(TsoError::MappingFailure(_))));
    assert_eq!(tx.pool().num_free(), 8);
    assert_eq!(tx.mapper().outstanding(), 0);
    assert_eq!(tx.stats.mapping_failures, 1);
    assert_eq!(tx.stats.tso_packets, 0);
}

#[test]
fn fragment_overflow_is_counted_and_rolled_back() {
    let spec = PacketSpec {
        chunks: vec![100; 10],
        ..PacketSpec::default()
    };
    let mut tx = TsoTx::new(4, SimDmaMapper::default());

    assert!(matches!(
        tx.prepare(&spec.build()),
        Err(TsoError::FragmentOverflow { segment: 0, .. })
    ));
    assert_eq!(tx.stats.fragment_overflows, 1);
    assert_eq!(tx.stats.rejected, 0);
    assert_eq!(tx.pool().num_free(), 4);
    assert_eq!(tx.mapper().outstanding(), 0);
}

#[test]
fn oversized_segment_counts_as_rejected() {
    let spec = PacketSpec {
        linear_payload: 70_000,
        mss: 70_000,
        ..PacketSpec::default()
    };
    let mut tx = TsoTx::new(4, SimDmaMapper::default());

    assert!(matches!(tx.prepare(&spec.build()), Err(TsoError::SegmentTooLarge { .. })));
    assert_eq!(tx.stats.rejected, 1);
    assert_eq!(tx.pool().num_free(), 4);
    assert_eq!(tx.mapper().map_calls(), 0);
}

#[test]
fn unsupported_packet_counts_as_rejected() {
    let spec = PacketSpec {
        ether: EtherKind::Arp,
        linear_payload: 3000,
        ..PacketSpec::default()
    };
    let mut tx = TsoTx::new(8, SimDmaMapper::default());
    assert_eq!(
        tx.prepare(&spec.build()).map(|p| p.num_segs()),
        Err(TsoError::UnsupportedEtherType(0x0806))
    );
    assert_eq!(tx.stats.rejected, 1);
    assert_eq!(tx.pool().num_free(), 8);
}

#[test]
fn header_only_tso_packet_yields_no_segments() {
    let pkt = PacketSpec::default().build();
    let mut tx = TsoTx::new(4, SimDmaMapper::default());
    let prepared = tx.prepare(&pkt).expect("prepare");
    assert!(prepared.is_tso);
    assert_eq!(prepared.num_segs(), 0);
    assert_eq!(tx.pool().num_free(), 4);
    tx.complete(prepared).expect("complete");
}

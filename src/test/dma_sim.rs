use crate::dma::{BusAddr, DmaDirection, DmaError, DmaMapper, DmaSpec, SimDmaMapper};

#[test]
fn bus_addr_splits_into_low_and_high_words() {
    let addr = BusAddr(0x0000_0012_3456_789A);
    assert_eq!(addr.lo(), 0x3456_789A);
    assert_eq!(addr.hi(), 0x12);
    assert_eq!(BusAddr::from_parts(addr.lo(), addr.hi()), addr);
}

#[test]
fn sim_mapper_hands_out_distinct_aligned_addresses_above_4g() {
    let dma = SimDmaMapper::default();
    let a = dma.map(0x1000, 10, DmaDirection::ToDevice).expect("map");
    let b = dma.map(0x2000, 100, DmaDirection::ToDevice).expect("map");
    let c = dma.map(0x3000, 1, DmaDirection::ToDevice).expect("map");

    assert_eq!(a, BusAddr(0x1_0000_0000));
    assert_eq!(b, BusAddr(0x1_0000_0040));
    assert_eq!(c, BusAddr(0x1_0000_00C0));
    assert_eq!(a.hi(), 1);
    assert_eq!(dma.outstanding(), 3);
    assert_eq!(dma.lookup(b), Some((0x2000, 100)));
}

#[test]
fn unmap_releases_and_rejects_unknown_addresses() {
    let dma = SimDmaMapper::default();
    let a = dma.map(0x1000, 10, DmaDirection::ToDevice).expect("map");
    assert_eq!(dma.unmap(a, 10, DmaDirection::ToDevice), Ok(()));
    assert_eq!(dma.outstanding(), 0);
    assert_eq!(
        dma.unmap(a, 10, DmaDirection::ToDevice),
        Err(DmaError::UnknownMapping(a.0))
    );
    assert_eq!(dma.unmap_calls(), 2);
}

#[test]
fn receive_direction_mappings_share_the_same_ledger() {
    let dma = SimDmaMapper::default();
    let tx = dma.map(0x1000, 64, DmaDirection::ToDevice).expect("map");
    let rx = dma.map(0x2000, 64, DmaDirection::FromDevice).expect("map");
    assert_ne!(tx, rx);
    assert_eq!(dma.lookup(rx), Some((0x2000, 64)));
    assert_eq!(dma.unmap(rx, 64, DmaDirection::FromDevice), Ok(()));
    assert_eq!(dma.outstanding(), 1);
}

#[test]
fn fail_after_lets_first_calls_through() {
    let dma = SimDmaMapper::new(DmaSpec {
        base: 0x8000,
        fail_after: Some(2),
    });
    assert_eq!(dma.map(0, 1, DmaDirection::ToDevice), Ok(BusAddr(0x8000)));
    assert!(dma.map(0, 1, DmaDirection::ToDevice).is_ok());
    assert_eq!(
        dma.map(0, 1, DmaDirection::ToDevice),
        Err(DmaError::Injected { call: 3 })
    );
    assert_eq!(dma.map_calls(), 3);
    assert_eq!(dma.outstanding(), 2);
}

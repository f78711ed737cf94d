use qhash::{QhMap, QhSet};

#[test]
fn seal_keeps_lookups_working() {
    let mut qm: QhMap<u32, u32> = QhMap::new();
    for k in 0..1000u32 {
        qm.add(k, k ^ 0x5a5a);
    }
    qm.seal();
    assert!(qm.is_sealed());
    assert!(!qm.in_resize(), "sealing completes the pending resize");
    for k in 0..1000u32 {
        assert_eq!(qm.get_safe(&k), Some(&(k ^ 0x5a5a)));
    }

    // Idempotent.
    qm.seal();
    assert!(qm.is_sealed());
    assert_eq!(qm.len(), 1000);

    qm.unseal();
    assert!(!qm.is_sealed());
    assert!(qm.add(5000, 1));
    assert_eq!(qm.len(), 1001);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "sealed")]
fn inserting_into_a_sealed_table_is_fatal() {
    let mut qh: QhSet<u32> = QhSet::new();
    for k in 0..100u32 {
        qh.add(k);
    }
    qh.seal();
    qh.add(12345);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "sealed")]
fn deleting_from_a_sealed_table_is_fatal() {
    let mut qh: QhSet<u32> = QhSet::new();
    qh.add(1);
    let pos = qh.find_safe(&1).unwrap();
    qh.seal();
    qh.del_at(pos);
}

#[test]
fn seal_compacts_tombstones_and_shrinks() {
    let mut qh: QhSet<u32> = QhSet::new();
    for k in 0..300u32 {
        qh.add(k);
    }
    for k in 0..280u32 {
        qh.del_key(&k);
    }
    let before = qh.memory_footprint();

    qh.seal();
    assert_eq!(qh.ghosts(), 0);
    assert_eq!(qh.len(), 20);
    assert_eq!(qh.size(), 64);
    assert!(qh.memory_footprint() < before);
    for k in 280..300u32 {
        assert!(qh.contains(&k));
    }
    for k in 0..280u32 {
        assert!(!qh.contains(&k));
    }
}

#[test]
fn seal_on_an_empty_table() {
    let mut qh: QhSet<u64> = QhSet::new();
    qh.seal();
    assert!(qh.is_sealed());
    assert!(!qh.contains(&1));
    qh.unseal();
    assert!(qh.add(1));
}

#[test]
fn footprint_tracks_growth_and_clear() {
    let mut qm: QhMap<u64, u64> = QhMap::new();
    assert_eq!(qm.memory_footprint(), 0);

    qm.add(0, 0);
    let small = qm.memory_footprint();
    assert!(small > 0);

    for k in 1..500u64 {
        qm.add(k, k);
    }
    let full = qm.memory_footprint();
    assert!(full > small);

    qm.clear();
    assert_eq!(qm.memory_footprint(), 0);
    assert_eq!(qm.size(), 0);
    assert_eq!(qm.len(), 0);

    // The table stays usable after a clear.
    qm.add(1, 1);
    assert_eq!(qm.get_safe(&1), Some(&1));
}

#[test]
fn clear_preserves_minsize() {
    let mut qh: QhSet<u32> = QhSet::new();
    qh.set_minsize(500);
    qh.add(1);
    assert_eq!(qh.size(), 512);
    qh.clear();
    assert_eq!(qh.size(), 0);
    qh.add(2);
    assert_eq!(qh.size(), 512);
}

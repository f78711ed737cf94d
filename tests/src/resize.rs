use qhash::{QhSet, COLLISION};
use std::collections::HashSet;

#[test]
fn incremental_growth_keeps_keys_visible() {
    let mut qh: QhSet<u32> = QhSet::new();
    let mut first_resize = None;
    for k in 0..200u32 {
        assert!(qh.add(k));
        if first_resize.is_none() && qh.in_resize() {
            first_resize = Some(k);
        }
        // Every key inserted so far stays visible to the read-only lookup,
        // whatever the resize state.
        for i in 0..=k {
            assert!(qh.contains(&i), "key {} lost after inserting {}", i, k);
        }
    }

    let first = first_resize.expect("a resize must have started");
    assert!(
        (16..=64).contains(&first),
        "first resize began at insert {}",
        first
    );
    assert!(!qh.in_resize(), "the drain should have completed");
    assert_eq!(qh.len(), 200);
    assert!(qh.size().is_power_of_two());
}

#[test]
fn ghost_reuse_avoids_growth() {
    let mut qh: QhSet<u32> = QhSet::new();
    for k in 0..16u32 {
        qh.add(k);
    }
    let size_after_inserts = qh.size();

    for k in 0..16u32 {
        assert!(qh.del_key(&k).is_some());
    }
    assert_eq!(qh.len(), 0);
    assert_eq!(qh.ghosts(), 16);

    for k in 100..116u32 {
        assert!(qh.add(k));
    }
    assert_eq!(qh.len(), 16);
    assert_eq!(qh.size(), size_after_inserts, "tombstone churn must not grow");
    for k in 100..116u32 {
        assert!(qh.contains(&k));
    }
}

#[test]
fn fill_to_cap_resizes_exactly_once() {
    let mut qh: QhSet<u32> = QhSet::new();
    let mut started = 0;
    let mut was_resizing = false;
    for k in 0..32u32 {
        qh.add(k);
        let now = qh.in_resize();
        if now && !was_resizing {
            started += 1;
        }
        was_resizing = now;
    }
    assert_eq!(started, 1);
}

#[test]
fn churn_reclaims_ghosts() {
    let mut qh: QhSet<u32> = QhSet::new();
    qh.set_minsize(256);
    for round in 0..50u32 {
        for i in 0..100 {
            assert!(qh.add(round * 1000 + i));
        }
        for i in 0..100 {
            assert!(qh.del_key(&(round * 1000 + i)).is_some());
        }
    }
    assert_eq!(qh.len(), 0);
    assert!(qh.size() <= 1024, "size {} grew without bound", qh.size());
}

#[test]
fn million_inserts_then_deletes() {
    let n = 1u32 << 20;
    let mut qh: QhSet<u32> = QhSet::new();
    for k in 0..n {
        qh.add(k);
    }
    assert_eq!(qh.len(), n as usize);

    for k in 0..n {
        qh.del_key(&k);
    }
    assert_eq!(qh.len(), 0);
    assert!(qh.ghosts() <= qh.size(), "tombstones must stay bounded");
    for k in (0..n).step_by(4097) {
        assert!(!qh.contains(&k));
    }
}

fn always_seven(_: &u32) -> u32 {
    7
}

fn int_eq(a: &u32, b: &u32) -> bool {
    a == b
}

#[test]
fn constant_hash_chains_terminate() {
    // Every key lands on the same probe chain; scans must still terminate
    // and tombstones in the middle of the chain must stay transparent.
    let mut qh: QhSet<u32> = QhSet::with_fns(always_seven, int_eq);
    for k in 0..40u32 {
        assert!(qh.add(k));
    }
    for k in 0..40u32 {
        assert!(qh.contains(&k));
    }
    for k in (0..40u32).step_by(2) {
        assert!(qh.del_key(&k).is_some());
    }
    for k in 0..40u32 {
        assert_eq!(qh.contains(&k), k % 2 == 1);
    }
    for k in 100..120u32 {
        assert!(qh.add(k));
    }
    for k in 100..120u32 {
        assert!(qh.contains(&k));
    }
    assert_eq!(qh.len(), 40);
}

#[test]
fn cached_table_grows_and_finds() {
    let mut qh: QhSet<u64> = QhSet::cached();
    for k in 0..500u64 {
        assert_eq!(qh.put(k, 0) & COLLISION, 0);
    }
    assert!(!qh.in_resize());
    for k in 0..500u64 {
        assert!(qh.contains(&k));
    }
    assert_eq!(qh.len(), 500);
}

#[test]
fn scan_visits_everything_during_resize() {
    let mut qh: QhSet<u32> = QhSet::new();
    for k in 0..36u32 {
        qh.add(k);
    }
    assert!(qh.in_resize(), "the resize should still be draining");

    let mut seen = HashSet::new();
    let mut from = 0;
    while let Some(pos) = qh.scan(from) {
        let key = qh.key_at(pos);
        assert!(seen.insert(key), "key {} visited twice", key);
        from = pos + 1;
    }
    assert_eq!(seen.len(), 36);
    for k in 0..36u32 {
        assert!(seen.contains(&k));
    }
}

#[test]
fn delete_under_the_cursor_during_scan() {
    let mut qh: QhSet<u32> = QhSet::new();
    for k in 0..100u32 {
        qh.add(k);
    }
    let mut from = 0;
    while let Some(pos) = qh.scan(from) {
        if qh.key_at(pos) % 2 == 0 {
            qh.del_at(pos);
        }
        from = pos + 1;
    }
    assert_eq!(qh.len(), 50);
    for k in 0..100u32 {
        assert_eq!(qh.contains(&k), k % 2 == 1);
    }
}

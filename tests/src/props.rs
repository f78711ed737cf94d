use proptest::prelude::*;
use qhash::{QhMap, QhSet, COLLISION, OVERWRITE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Random put/delete/lookup sequences behave exactly like the standard
    /// map, and the structural invariants hold after every operation.
    #[test]
    fn matches_reference_map(
        ops in prop::collection::vec((0u8..3u8, 0u32..400u32, any::<u32>()), 1..1200)
    ) {
        let mut qm: QhMap<u32, u32> = QhMap::new();
        let mut model: HashMap<u32, u32> = HashMap::new();

        for (sel, key, val) in ops {
            match sel {
                0 => {
                    let pos = qm.put(key, val, OVERWRITE);
                    let existed = model.insert(key, val).is_some();
                    prop_assert_eq!(pos & COLLISION != 0, existed);
                }
                1 => {
                    let removed = model.remove(&key).is_some();
                    prop_assert_eq!(qm.del_key(&key).is_some(), removed);
                }
                _ => {
                    prop_assert_eq!(qm.get_safe(&key), model.get(&key));
                }
            }

            prop_assert_eq!(qm.len(), model.len());
            let size = qm.size();
            if size > 0 {
                prop_assert!(size.is_power_of_two());
                prop_assert!(
                    2 * (qm.len() as u64 + u64::from(qm.ghosts())) < u64::from(size),
                    "load cap violated: len {} ghosts {} size {}",
                    qm.len(), qm.ghosts(), size
                );
            }
        }

        // A full enumeration sees exactly the model, each entry once.
        let mut seen = HashMap::new();
        for (k, v) in qm.iter() {
            prop_assert!(seen.insert(k, *v).is_none());
        }
        prop_assert_eq!(seen, model);
    }

    /// Round-trip law: whatever was inserted once is found, and the key
    /// read back from the returned position compares equal.
    #[test]
    fn inserted_once_always_found(
        keys in prop::collection::hash_set(any::<u64>(), 1..400)
    ) {
        let mut qh: QhSet<u64> = QhSet::new();
        for &k in &keys {
            prop_assert!(qh.add(k));
        }
        for &k in &keys {
            let pos = qh.find_safe(&k);
            prop_assert!(pos.is_some());
            prop_assert_eq!(qh.key_at(pos.unwrap()), k);
        }
    }

    /// Hash caching changes the representation, never the behaviour.
    #[test]
    fn cached_and_plain_agree(keys in prop::collection::vec(any::<u64>(), 1..400)) {
        let mut plain: QhSet<u64> = QhSet::new();
        let mut cached: QhSet<u64> = QhSet::cached();
        for &k in &keys {
            prop_assert_eq!(plain.add(k), cached.add(k));
        }
        prop_assert_eq!(plain.len(), cached.len());
        for &k in &keys {
            prop_assert!(cached.contains(&k));
        }
    }
}

#[test]
fn randomized_mixed_workload() {
    let mut rng = StdRng::seed_from_u64(0x9e37_79b1);
    let mut qm: QhMap<u64, u64> = QhMap::cached();
    let mut model: HashMap<u64, u64> = HashMap::new();

    for _ in 0..50_000 {
        let k = rng.gen_range(0u64, 2000);
        match rng.gen_range(0u32, 3) {
            0 => {
                qm.replace(k, k * 3);
                model.insert(k, k * 3);
            }
            1 => {
                qm.del_key(&k);
                model.remove(&k);
            }
            _ => {
                assert_eq!(qm.get_safe(&k), model.get(&k));
            }
        }
    }

    assert_eq!(qm.len(), model.len());
    for (k, v) in &model {
        assert_eq!(qm.get_safe(k), Some(v));
    }
}

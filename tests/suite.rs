//! End-to-end checks across the five builders: bijectivity, serialization
//! and determinism.

use mphkit::{
    BdzBuilder, BdzMinimalSettings, BdzMinimalState, BdzSettings, BdzState, BmzBuilder,
    BmzMinimalSettings, BmzMinimalState, ChdBuilder, ChdMinimalSettings, ChdMinimalState,
    ChdSettings, ChdState, ChmBuilder, ChmMinimalSettings, ChmMinimalState, FchBuilder,
    FchMinimalSettings, FchMinimalState, HashState,
};

fn keys(n: usize, tag: &str) -> Vec<String> {
    (0..n).map(|i| format!("{tag}-{i:05}")).collect()
}

fn assert_bijection(values: &[u32]) {
    let mut seen = vec![false; values.len()];
    for &v in values {
        assert!((v as usize) < values.len(), "value {v} out of range");
        assert!(!seen[v as usize], "value {v} assigned twice");
        seen[v as usize] = true;
    }
}

fn packed<K, H: HashState<K>>(state: &H) -> Vec<u8> {
    let mut buf = vec![0u8; state.packed_size()];
    state.pack(&mut buf);
    buf
}

#[test]
fn bdz_minimal_survives_serialization() {
    let keys = keys(500, "bdz");
    let mut builder = BdzBuilder::with_seed(101);
    let state = builder
        .try_create_minimal(&keys, &BdzMinimalSettings::default())
        .unwrap();

    let values: Vec<u32> = keys.iter().map(|k| state.search(k)).collect();
    assert_bijection(&values);

    let back: BdzMinimalState<String> = BdzMinimalState::unpack(&packed(&state));
    for (key, &v) in keys.iter().zip(&values) {
        assert_eq!(back.search(key), v);
    }
}

#[test]
fn bdz_perfect_has_no_collisions() {
    let keys = keys(300, "bdz-phf");
    let mut builder = BdzBuilder::with_seed(8);
    let state = builder.try_create(&keys, &BdzSettings::default()).unwrap();

    let mut values: Vec<u32> = keys.iter().map(|k| state.search(k)).collect();
    values.sort_unstable();
    values.dedup();
    assert_eq!(values.len(), keys.len());

    let back: BdzState<String> = BdzState::unpack(&packed(&state));
    assert_eq!(back.search(&keys[17]), state.search(&keys[17]));
}

#[test]
fn bmz_minimal_survives_serialization() {
    let keys = keys(400, "bmz");
    let mut builder = BmzBuilder::with_seed(55);
    let state = builder
        .try_create_minimal(&keys, &BmzMinimalSettings::default())
        .unwrap();

    let values: Vec<u32> = keys.iter().map(|k| state.search(k)).collect();
    assert_bijection(&values);

    let back: BmzMinimalState<String> = BmzMinimalState::unpack(&packed(&state));
    for (key, &v) in keys.iter().zip(&values) {
        assert_eq!(back.search(key), v);
    }
}

#[test]
fn chm_preserves_insertion_order_through_serialization() {
    let keys = keys(250, "chm");
    let mut builder = ChmBuilder::with_seed(3);
    let state = builder
        .try_create_minimal(&keys, &ChmMinimalSettings::default())
        .unwrap();

    let back: ChmMinimalState<String> = ChmMinimalState::unpack(&packed(&state));
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(state.search(key), i as u32);
        assert_eq!(back.search(key), i as u32);
    }
}

#[test]
fn chd_minimal_survives_serialization() {
    let keys = keys(500, "chd");
    let mut builder = ChdBuilder::with_seed(12);
    let state = builder
        .try_create_minimal(&keys, &ChdMinimalSettings::default())
        .unwrap();

    let values: Vec<u32> = keys.iter().map(|k| state.search(k)).collect();
    assert_bijection(&values);

    let back: ChdMinimalState<String> = ChdMinimalState::unpack(&packed(&state));
    for (key, &v) in keys.iter().zip(&values) {
        assert_eq!(back.search(key), v);
    }
}

#[test]
fn chd_perfect_respects_bin_capacity() {
    let keys = keys(300, "chd-2pb");
    let mut settings = ChdSettings::default();
    settings.set_keys_per_bin(2).unwrap();

    let mut builder = ChdBuilder::with_seed(6);
    let state = builder.try_create(&keys, &settings).unwrap();

    let mut counts = std::collections::HashMap::new();
    for key in &keys {
        *counts.entry(state.search(key)).or_insert(0u32) += 1;
    }
    assert!(counts.values().all(|&c| c <= 2));

    let back: ChdState<String> = ChdState::unpack(&packed(&state));
    assert_eq!(back.search(&keys[0]), state.search(&keys[0]));
}

#[test]
fn fch_minimal_survives_serialization() {
    let keys = keys(64, "fch");
    let mut builder = FchBuilder::with_seed(21);
    let state = builder
        .try_create_minimal(&keys, &FchMinimalSettings::default())
        .unwrap();

    let values: Vec<u32> = keys.iter().map(|k| state.search(k)).collect();
    assert_bijection(&values);

    let back: FchMinimalState<String> = FchMinimalState::unpack(&packed(&state));
    for (key, &v) in keys.iter().zip(&values) {
        assert_eq!(back.search(key), v);
    }
}

#[test]
fn seeded_builds_are_byte_identical() {
    let keys = keys(200, "det");

    let mut a = ChdBuilder::with_seed(7);
    let mut b = ChdBuilder::with_seed(7);
    let sa = a
        .try_create_minimal(&keys, &ChdMinimalSettings::default())
        .unwrap();
    let sb = b
        .try_create_minimal(&keys, &ChdMinimalSettings::default())
        .unwrap();
    assert_eq!(packed(&sa), packed(&sb));

    let mut a = BdzBuilder::with_seed(7);
    let mut b = BdzBuilder::with_seed(7);
    let sa = a
        .try_create_minimal(&keys, &BdzMinimalSettings::default())
        .unwrap();
    let sb = b
        .try_create_minimal(&keys, &BdzMinimalSettings::default())
        .unwrap();
    assert_eq!(packed(&sa), packed(&sb));
}

#[test]
fn single_key_maps_to_zero_in_every_minimal_variant() {
    let keys = ["lonely".to_string()];

    let state = BdzBuilder::with_seed(1)
        .try_create_minimal(&keys, &BdzMinimalSettings::default())
        .unwrap();
    assert_eq!(state.search(&keys[0]), 0);

    let state = BmzBuilder::with_seed(1)
        .try_create_minimal(&keys, &BmzMinimalSettings::default())
        .unwrap();
    assert_eq!(state.search(&keys[0]), 0);

    let state = ChmBuilder::with_seed(1)
        .try_create_minimal(&keys, &ChmMinimalSettings::default())
        .unwrap();
    assert_eq!(state.search(&keys[0]), 0);

    let state = ChdBuilder::with_seed(1)
        .try_create_minimal(&keys, &ChdMinimalSettings::default())
        .unwrap();
    assert_eq!(state.search(&keys[0]), 0);

    let state = FchBuilder::with_seed(1)
        .try_create_minimal(&keys, &FchMinimalSettings::default())
        .unwrap();
    assert_eq!(state.search(&keys[0]), 0);
}

#[test]
fn zero_iteration_budget_fails_fast() {
    let keys = keys(10, "budget");

    let mut s = BdzMinimalSettings::default();
    s.set_iterations(0);
    assert!(
        BdzBuilder::with_seed(1)
            .try_create_minimal(&keys, &s)
            .is_none()
    );

    let mut s = BmzMinimalSettings::default();
    s.set_iterations(0);
    assert!(
        BmzBuilder::with_seed(1)
            .try_create_minimal(&keys, &s)
            .is_none()
    );

    let mut s = ChmMinimalSettings::default();
    s.set_iterations(0);
    assert!(
        ChmBuilder::with_seed(1)
            .try_create_minimal(&keys, &s)
            .is_none()
    );

    let mut s = ChdMinimalSettings::default();
    s.set_iterations(0);
    assert!(
        ChdBuilder::with_seed(1)
            .try_create_minimal(&keys, &s)
            .is_none()
    );

    let mut s = FchMinimalSettings::default();
    s.set_iterations(0);
    assert!(
        FchBuilder::with_seed(1)
            .try_create_minimal(&keys, &s)
            .is_none()
    );
}

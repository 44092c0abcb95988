use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use workindex::prelude::*;

use crate::shuffled;

#[test]
fn reference_insertion_sequence() -> eyre::Result<()> {
    let mut tree = HashTree::with_config(HashTreeConfig::new(3));
    tree.try_extend([5u32, 1, 9, 3, 8, 2, 6, 0, 7].into_iter().zip(0..))?;
    tree.verify()?;

    assert_eq!(tree.height(), 2);
    assert_eq!(tree.get(&9)?, Some(&2));
    let keys: Vec<_> = tree.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![0, 8, 2, 6, 1, 5, 9, 3, 7]);
    Ok(())
}

#[test]
fn key_to_bits_is_fixed_width() -> eyre::Result<()> {
    let tree = HashTree::<u32, ()>::with_config(HashTreeConfig::new(4).with_bit_width(16));
    assert_eq!(tree.key_to_bits(&5)?.to_string(), "0000000000000101");
    assert_eq!(
        tree.key_to_bits(&70_000),
        Err(IndexError::InvalidKey { bit_width: 16 })
    );
    Ok(())
}

#[test]
fn sequential_keys_both_directions() -> eyre::Result<()> {
    for direction in [BitDirection::LeastSignificantFirst, BitDirection::MostSignificantFirst] {
        let config = HashTreeConfig::new(4)
            .with_bit_width(12)
            .with_direction(direction);
        let mut tree = HashTree::with_config(config);
        for k in shuffled(0..4096, 3) {
            tree.insert(k, k)?;
        }
        tree.verify()?;
        assert_eq!(tree.len(), 4096);

        for k in 0..4096 {
            assert_eq!(tree.get(&k)?, Some(&k));
        }
        assert_eq!(
            tree.insert(4096, 0),
            Err(IndexError::InvalidKey { bit_width: 12 })
        );
    }
    Ok(())
}

#[test]
fn most_significant_first_visits_in_key_order() -> eyre::Result<()> {
    let config = HashTreeConfig::new(2)
        .with_bit_width(10)
        .with_direction(BitDirection::MostSignificantFirst);
    let mut tree = HashTree::with_config(config);
    for k in shuffled(0..1000, 8) {
        tree.insert(k, ())?;
    }

    let keys: Vec<_> = tree.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, (0..1000).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn duplicates_until_bits_run_out() -> eyre::Result<()> {
    let mut tree = HashTree::with_config(HashTreeConfig::new(3).with_bit_width(8));
    for i in 0..3 {
        tree.insert(42u8, i)?;
    }
    tree.insert(43, 0)?;
    let before: Vec<_> = tree.iter().map(|(k, v)| (*k, *v)).collect();

    assert_eq!(
        tree.insert(42, 3),
        Err(IndexError::IndexExhausted { bit_width: 8 })
    );
    let after: Vec<_> = tree.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(before, after);
    tree.verify()?;

    assert_eq!(tree.remove(&42)?, Some(0));
    tree.insert(42, 3)?;
    tree.verify()?;
    Ok(())
}

#[test]
fn interleaved_operations_match_model() -> eyre::Result<()> {
    let mut rng = StdRng::seed_from_u64(17);
    let mut tree = HashTree::with_config(HashTreeConfig::new(5));
    let mut model: HashMap<u32, u32> = HashMap::new();

    for i in 0..6000 {
        let k = rng.random_range(0..2000);
        if rng.random_bool(0.55) {
            if !model.contains_key(&k) {
                tree.insert(k, i)?;
                model.insert(k, i);
            }
        } else {
            assert_eq!(tree.remove(&k)?, model.remove(&k));
        }
    }
    tree.verify()?;

    assert_eq!(tree.len(), model.len());
    for (k, v) in &model {
        assert_eq!(tree.get(k)?, Some(v));
    }
    Ok(())
}

#[test]
fn signed_keys_through_generic_interface() -> eyre::Result<()> {
    fn fill<I: Index<i64, &'static str>>(index: &mut I) -> Result<(), IndexError> {
        index.insert(10, "ten")?;
        index.insert(-10, "minus ten")?;
        Ok(())
    }

    let mut tree = HashTree::<i64, &'static str>::new();
    fill(&mut tree)?;
    assert_eq!(Index::len(&tree), 2);
    assert_eq!(Index::get(&tree, &-10)?, Some(&"minus ten"));
    assert_eq!(
        Index::insert(&mut tree, 1 << 31, "too wide"),
        Err(IndexError::InvalidKey { bit_width: 32 })
    );
    assert_eq!(Index::remove(&mut tree, &-10)?, Some("minus ten"));
    assert_eq!(Index::get(&tree, &10)?, Some(&"ten"));
    Ok(())
}

#[test]
fn info_reports_buckets() -> eyre::Result<()> {
    let mut tree = HashTree::with_config(HashTreeConfig::new(2));
    tree.try_extend((0u64..64).map(|k| (k, k.to_string())))?;
    let info = tree.info("by_hash");

    assert_eq!(info.kind, IndexKind::Hashed);
    assert_eq!(info.container_capacity, 2);
    assert_eq!(info.node_count, tree.node_count());
    assert!(info.container_count >= 32);
    Ok(())
}

use std::collections::BTreeMap;

use rand::distr::{Alphanumeric, SampleString};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde::de::value::{Error as ValueError, MapDeserializer};
use workindex::prelude::*;

use crate::{is_sorted, shuffled};

#[test]
fn reference_insertion_sequence() -> eyre::Result<()> {
    let mut tree = BPlusTree::new();
    for (i, k) in [0, 55, 24, 88, 11, 90, 70, 6, 17, 33].into_iter().enumerate() {
        tree.insert(k, i);
    }
    tree.verify()?;

    assert_eq!(tree.height(), 2);
    assert_eq!(tree.len(), 10);
    let keys: Vec<_> = tree.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![0, 6, 11, 17, 24, 33, 55, 70, 88, 90]);
    Ok(())
}

#[test]
fn float_keys() -> eyre::Result<()> {
    let mut rng = StdRng::seed_from_u64(5);
    let mut tree = BPlusTree::with_config(BPlusTreeConfig::new(8, 0.5));
    for i in 0..300 {
        let key = OrderedFloat(rng.random_range(-1000.0..1000.0_f64));
        tree.insert(key, i);
    }
    tree.verify()?;

    let keys: Vec<_> = tree.iter().map(|(k, _)| *k).collect();
    assert!(is_sorted(&keys));
    assert_eq!(tree.first().map(|(k, _)| *k), keys.first().copied());
    assert_eq!(tree.last().map(|(k, _)| *k), keys.last().copied());

    for key in &keys[..150] {
        assert!(tree.remove(key).is_some());
    }
    tree.verify()?;
    assert_eq!(tree.len(), 150);
    Ok(())
}

#[test]
fn string_keys_with_duplicates() -> eyre::Result<()> {
    let mut tree = BPlusTree::new();
    for round in 0..5 {
        for name in ["delta", "alpha", "charlie", "bravo", "echo"] {
            tree.insert(name.to_string(), round);
        }
    }
    tree.verify()?;

    assert_eq!(tree.get_all(&"charlie".to_string()).len(), 5);
    assert_eq!(tree.first().map(|(k, _)| k.as_str()), Some("alpha"));
    assert_eq!(tree.last().map(|(k, _)| k.as_str()), Some("echo"));
    assert!(!tree.contains(&"foxtrot".to_string()));
    Ok(())
}

#[test]
fn random_string_keys() -> eyre::Result<()> {
    let mut rng = StdRng::seed_from_u64(21);
    let mut tree = BPlusTree::new();
    let mut inserted = Vec::new();
    for i in 0..400 {
        let s = Alphanumeric.sample_string(&mut rng, 8);
        tree.insert(s.clone(), i);
        inserted.push(s);
    }
    tree.verify()?;

    inserted.sort();
    let keys: Vec<_> = tree.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(keys, inserted);
    for s in inserted.iter().step_by(3) {
        assert!(tree.remove(s).is_some());
    }
    tree.verify()?;
    Ok(())
}

#[test]
fn insert_then_delete_everything() -> eyre::Result<()> {
    let mut tree = BPlusTree::with_config(BPlusTreeConfig::new(5, 0.6));
    for k in shuffled(0..1000, 1) {
        tree.insert(k, k * 2);
    }
    tree.verify()?;
    let grown = tree.height();
    assert!(grown >= 4);

    for k in shuffled(0..1000, 2) {
        assert_eq!(tree.remove(&k), Some(k * 2));
    }
    tree.verify()?;
    assert!(tree.is_empty());
    assert_eq!(tree.height(), 1);
    assert_eq!(tree.node_count(), 1);
    Ok(())
}

#[test]
fn interleaved_operations_match_model() -> eyre::Result<()> {
    let mut rng = StdRng::seed_from_u64(99);
    let mut tree = BPlusTree::new();
    let mut model: BTreeMap<u64, usize> = BTreeMap::new();

    for i in 0..5000 {
        let k = rng.random_range(0..500);
        match rng.random_range(0..3) {
            0 | 1 => {
                if !model.contains_key(&k) {
                    tree.insert(k, i);
                    model.insert(k, i);
                }
            }
            _ => assert_eq!(tree.remove(&k), model.remove(&k)),
        }
    }
    tree.verify()?;

    let got: Vec<_> = tree.iter().map(|(k, v)| (*k, *v)).collect();
    let expected: Vec<_> = model.into_iter().collect();
    assert_eq!(got, expected);
    Ok(())
}

#[test]
fn generic_index_interface() -> eyre::Result<()> {
    fn fill<I: Index<u64, u64>>(index: &mut I) -> eyre::Result<()> {
        for k in 0..64 {
            index.insert(k, k + 1)?;
        }
        Ok(())
    }

    let mut tree = BPlusTree::new();
    fill(&mut tree)?;
    assert_eq!(Index::get(&tree, &10)?, Some(&11));
    assert!(Index::contains(&tree, &63)?);
    assert_eq!(Index::remove(&mut tree, &63)?, Some(64));
    assert_eq!(Index::len(&tree), 63);
    assert_eq!(Index::iter(&tree).count(), 63);
    Ok(())
}

#[test]
fn config_deserializes_with_defaults() -> eyre::Result<()> {
    let fields = vec![("max_entries_per_node", 16usize)];
    let config = BPlusTreeConfig::deserialize(MapDeserializer::<_, ValueError>::new(
        fields.into_iter(),
    ))?;
    assert_eq!(config.fill_factor, 0.75);

    let tree = BPlusTree::<u64, ()>::with_config(config);
    assert_eq!(tree.leaf_capacity(), 12);
    Ok(())
}

#[test]
fn info_reports_shape() {
    let tree: BPlusTree<u64, String> = (0..100).map(|k| (k, k.to_string())).collect();
    let info = tree.info("names");

    assert_eq!(info.kind, IndexKind::Ordered);
    assert_eq!(info.len, 100);
    assert_eq!(info.container_count, tree.leaf_count());
    assert!(info.used_size > 0);
    assert!(info.to_string().contains("names"));
}

use std::fmt;

use prettytable::{Table, row};

use crate::index::{BPlusTree, HashKey, HashTree};
use crate::mem_stat::MemStat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Ordered,
    Hashed,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Ordered => write!(f, "ordered"),
            IndexKind::Hashed => write!(f, "hashed"),
        }
    }
}

/// Snapshot of an index's shape and memory usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub kind: IndexKind,
    pub len: usize,
    pub height: usize,
    pub node_count: usize,
    /// Leaves of an ordered index, buckets of a hashed one.
    pub container_count: usize,
    /// Entries a leaf or a bucket holds before it splits.
    pub container_capacity: usize,
    pub heap_size: usize,
    pub used_size: usize,
    pub generation: u64,
}

impl IndexInfo {
    pub fn table(infos: &[IndexInfo]) -> Table {
        let mut table = Table::new();
        table.set_titles(row![
            "name",
            "kind",
            "entries",
            "height",
            "nodes",
            "leaves/buckets",
            "capacity",
            "heap",
            "used",
            "generation"
        ]);
        for info in infos {
            table.add_row(row![
                info.name,
                info.kind,
                info.len,
                info.height,
                info.node_count,
                info.container_count,
                info.container_capacity,
                format_bytes(info.heap_size),
                format_bytes(info.used_size),
                info.generation
            ]);
        }
        table
    }
}

impl fmt::Display for IndexInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::table(std::slice::from_ref(self)))
    }
}

fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let value = bytes as f64;
    if value < KB {
        format!("{bytes} B")
    } else if value < KB * KB {
        format!("{:.2} KB", value / KB)
    } else {
        format!("{:.2} MB", value / (KB * KB))
    }
}

impl<K, V> BPlusTree<K, V>
where
    K: Ord + Clone + MemStat,
    V: MemStat,
{
    pub fn info(&self, name: impl Into<String>) -> IndexInfo {
        IndexInfo {
            name: name.into(),
            kind: IndexKind::Ordered,
            len: self.len(),
            height: self.height(),
            node_count: self.node_count(),
            container_count: self.leaf_count(),
            container_capacity: self.leaf_capacity(),
            heap_size: self.heap_size(),
            used_size: self.used_size(),
            generation: self.generation().value(),
        }
    }
}

impl<K, V> HashTree<K, V>
where
    K: HashKey + Ord + MemStat,
    V: MemStat,
{
    pub fn info(&self, name: impl Into<String>) -> IndexInfo {
        IndexInfo {
            name: name.into(),
            kind: IndexKind::Hashed,
            len: self.len(),
            height: self.height(),
            node_count: self.node_count(),
            container_count: self.bucket_count(),
            container_capacity: self.config().max_bucket_size,
            heap_size: self.heap_size(),
            used_size: self.used_size(),
            generation: self.generation().value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_info() {
        let tree: BPlusTree<u32, u32> = (0..20).map(|k| (k, k)).collect();
        let info = tree.info("by_id");

        assert_eq!(info.kind, IndexKind::Ordered);
        assert_eq!(info.len, 20);
        assert_eq!(info.height, tree.height());
        assert_eq!(info.container_capacity, 3);
        assert!(info.container_count > 1);
    }

    #[test]
    fn hashed_info() {
        let mut tree = HashTree::<u32, u32>::new();
        tree.try_extend((0..20).map(|k| (k, k))).unwrap();
        let info = tree.info("by_hash");

        assert_eq!(info.kind, IndexKind::Hashed);
        assert_eq!(info.len, 20);
        assert_eq!(info.container_capacity, 8);
        assert_eq!(info.container_count, tree.bucket_count());
    }

    #[test]
    fn table_lists_every_index() {
        let ordered: BPlusTree<u32, u32> = (0..5).map(|k| (k, k)).collect();
        let hashed = HashTree::<u32, u32>::new();

        let rendered = IndexInfo::table(&[ordered.info("first"), hashed.info("second")]).to_string();
        assert!(rendered.contains("first"));
        assert!(rendered.contains("second"));
        assert!(rendered.contains("ordered"));
        assert!(rendered.contains("hashed"));
        assert!(ordered.info("first").to_string().contains("leaves/buckets"));
    }

    #[test]
    fn bytes_are_human_readable() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }
}

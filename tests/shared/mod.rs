use futures::future::join_all;
use workindex::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_on_ordered_index() -> eyre::Result<()> {
    let shared = SharedIndex::new(BPlusTree::<u64, u64>::new());

    let tasks = (0..8).map(|t| {
        let shared = shared.clone();
        tokio::spawn(async move {
            for k in 0..250 {
                shared.insert(t * 1000 + k, t)?;
            }
            Ok::<_, IndexError>(())
        })
    });
    for result in join_all(tasks).await {
        result??;
    }

    let tree = shared.read();
    assert_eq!(tree.len(), 2000);
    tree.verify()?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_see_consistent_snapshots() -> eyre::Result<()> {
    let shared = SharedIndex::new(HashTree::<u32, u32>::with_config(HashTreeConfig::new(4)));
    for k in 0..100 {
        shared.insert(k * 2, k)?;
    }

    let writer = {
        let shared = shared.clone();
        tokio::spawn(async move {
            for k in 0..100 {
                shared.insert(k * 2 + 1, k)?;
                tokio::task::yield_now().await;
            }
            Ok::<_, IndexError>(())
        })
    };
    let readers = (0..4).map(|_| {
        let shared = shared.clone();
        tokio::spawn(async move {
            let mut sizes = Vec::new();
            for _ in 0..20 {
                let snapshot = shared.snapshot();
                let evens = snapshot.iter().filter(|(k, _)| k % 2 == 0).count();
                assert_eq!(evens, 100);
                sizes.push(snapshot.len());
                tokio::task::yield_now().await;
            }
            sizes
        })
    });

    let sizes = join_all(readers).await;
    writer.await??;
    for sizes in sizes {
        let sizes = sizes?;
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
        assert!(sizes.iter().all(|s| (100..=200).contains(s)));
    }
    assert_eq!(shared.read().len(), 200);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cursor_detects_writer_between_steps() -> eyre::Result<()> {
    let shared = SharedIndex::new(BPlusTree::<u32, ()>::new());
    for k in 0..10 {
        shared.insert(k, ())?;
    }

    let mut cursor = shared.read().cursor();
    assert!(cursor.next_entry(&*shared.read())?.is_some());

    let writer = shared.clone();
    tokio::spawn(async move { writer.insert(100, ()) }).await??;

    let tree = shared.read();
    assert!(matches!(
        cursor.next_entry(&*tree),
        Err(IndexError::ConcurrentModification { .. })
    ));
    Ok(())
}

mod common;

use std::io::Read;
use std::sync::Arc;
use std::thread;

use common::*;
use sunzip::{Deflate, DecompressorRegistry, InflaterPool, Store, ZipStreamReader};

#[test]
fn sessions_on_many_threads_share_one_registry() {
    let pool = Arc::new(InflaterPool::default());
    let registry = Arc::new(DecompressorRegistry::empty());
    registry.register(0, Arc::new(Store)).unwrap();
    registry.register(8, Arc::new(Deflate::new(pool.clone()))).unwrap();

    let entries: Vec<TestEntry> = (0..6)
        .map(|i| TestEntry::deflated(&format!("{}.bin", i), &noise(3000 + i * 100, i as u32)))
        .collect();
    let data = Arc::new(archive(&entries));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            let data = data.clone();
            let expected: Vec<u32> = entries.iter().map(TestEntry::crc).collect();
            thread::spawn(move || {
                let mut reader = ZipStreamReader::with_registry(&data[..], registry);
                let mut crcs = Vec::new();
                while reader.next_entry().unwrap().is_some() {
                    let mut content = Vec::new();
                    reader.read_to_end(&mut content).unwrap();
                    crcs.push(crc32fast::hash(&content));
                }
                assert_eq!(crcs, expected);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every inflater went back on the free list
    assert!(pool.idle() >= 1);
    assert!(pool.idle() <= 8);
}

#[test]
fn concurrent_registration_admits_one_winner() {
    let registry = Arc::new(DecompressorRegistry::empty());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || registry.register(42, Arc::new(Store)).is_ok())
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
    assert!(registry.contains(42));
}

use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use super::*;

use crate::Error;

fn expect_decode_fail<T>(res: Result<T>, what: &str) {
    match res {
        Err(Error::DecodeFail(_, msg)) => assert!(msg.contains(what), "{} {}", what, msg),
        Err(err) => panic!("unexpected {}", err),
        Ok(_) => panic!("expected decode failure for {}", what),
    }
}

#[test]
fn test_graph_encode() {
    let index: Index<u32, String> = Index::new("test_graph_encode");
    assert_eq!(encode(&index).unwrap(), r#"{"n_deleted":0,"nodes":[]}"#);

    for (key, value) in [(2, "b"), (1, "a"), (3, "c")].iter() {
        index.set(*key, value.to_string());
    }
    assert!(index.delete(&[1]));

    let text = encode(&index).unwrap();
    let refs = concat!(
        r#"{"root":0,"n_deleted":1,"nodes":["#,
        r#"{"id":0,"key":2,"value":"b","deleted":false,"previous":1,"next":2},"#,
        r#"{"id":1,"key":1,"value":"a","deleted":true,"parent":0},"#,
        r#"{"id":2,"key":3,"value":"c","deleted":false,"parent":0}"#,
        r#"]}"#
    );
    assert_eq!(text, refs);
}

#[test]
fn test_graph_roundtrip() {
    let seed: u64 = random();
    println!("test_graph_roundtrip seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let index: Index<u64, u64> = Index::new("test_graph_roundtrip");
    let mut keys = vec![];
    for _ in 0..1000 {
        let key = rng.gen::<u64>() % 10_000;
        index.set(key, rng.gen());
        keys.push(key);
    }
    let dels: Vec<u64> = keys.iter().step_by(7).copied().collect();
    assert!(index.delete(dels.iter()));

    let text = encode(&index).unwrap();
    let copy: Index<u64, u64> = decode(Config::new("copy"), &text).unwrap();

    assert_eq!(copy.to_name(), "copy");
    assert_eq!(copy.len(), index.len());
    assert_eq!(copy.deleted_count(), index.deleted_count());
    assert_eq!(copy.depth(), index.depth());
    assert_eq!(copy.to_entries(), index.to_entries());
    for depth in 1..=index.depth() {
        assert_eq!(copy.traverse(depth), index.traverse(depth));
    }
    copy.validate().unwrap();

    // tombstones survive the round trip and can be purged.
    assert!(copy.compact());
    assert_eq!(copy.to_entries(), index.to_entries());

    let empty: Index<u64, u64> = Index::new("empty");
    restore(&empty, &text).unwrap();
    assert_eq!(empty.to_entries(), index.to_entries());
    assert_eq!(empty.deleted_count(), index.deleted_count());
}

#[test]
fn test_graph_decode_lenient() {
    // ids are opaque, parent links are optional.
    let text = r#"{
        "root": 70,
        "nodes": [
            {"id": 10, "key": 1, "value": 100},
            {"id": 70, "key": 2, "value": 200, "previous": 10, "next": 30},
            {"id": 30, "key": 3, "value": 300, "parent": 70}
        ]
    }"#;
    let index: Index<u32, u32> = decode(Config::new("lenient"), text).unwrap();
    assert_eq!(index.to_entries(), vec![(1, 100), (2, 200), (3, 300)]);
    assert_eq!(index.traverse(1), vec![(2, 200)]);
}

#[test]
fn test_graph_decode_fail() {
    let config = Config::new("test_graph_decode_fail");
    let decode_u32 = |text: &str| decode::<u32, u32>(config.clone(), text);

    expect_decode_fail(decode_u32("not json"), "node-graph");

    let text = r#"{"root": 1, "nodes": [{"id": 0, "key": 1, "value": 1}]}"#;
    expect_decode_fail(decode_u32(text), "dangling id");

    let text = r#"{"root": 0, "nodes": [
        {"id": 0, "key": 2, "value": 1, "previous": 1},
        {"id": 1, "key": 1, "value": 1, "next": 0}
    ]}"#;
    expect_decode_fail(decode_u32(text), "more than once");

    let text = r#"{"root": 0, "nodes": [
        {"id": 0, "key": 2, "value": 1},
        {"id": 0, "key": 1, "value": 1}
    ]}"#;
    expect_decode_fail(decode_u32(text), "duplicate id");

    let text = r#"{"root": 0, "n_deleted": 0, "nodes": [
        {"id": 0, "key": 2, "value": 1, "previous": 1},
        {"id": 1, "key": 1, "value": 1, "deleted": true, "parent": 0}
    ]}"#;
    expect_decode_fail(decode_u32(text), "n_deleted");

    let text = r#"{"root": 0, "nodes": [
        {"id": 0, "key": 2, "value": 1, "previous": 1, "next": 2},
        {"id": 1, "key": 1, "value": 1, "parent": 2},
        {"id": 2, "key": 3, "value": 1, "parent": 0}
    ]}"#;
    expect_decode_fail(decode_u32(text), "parent");

    let text = r#"{"root": 0, "nodes": [
        {"id": 0, "key": 2, "value": 1, "parent": 1, "previous": 1},
        {"id": 1, "key": 1, "value": 1}
    ]}"#;
    expect_decode_fail(decode_u32(text), "parent");

    let text = r#"{"root": 0, "nodes": [
        {"id": 0, "key": 2, "value": 1, "previous": 1},
        {"id": 1, "key": 5, "value": 1}
    ]}"#;
    expect_decode_fail(decode_u32(text), "sort order");

    // nothing is populated on failure.
    let index: Index<u32, u32> = Index::new("untouched");
    index.set(10, 10);
    expect_decode_fail(restore(&index, text), "sort order");
    assert_eq!(index.to_entries(), vec![(10, 10)]);
}

#[test]
fn test_graph_decode_deep_chain() {
    let n = 200_000_u64;
    let nodes: Vec<String> = (0..n)
        .map(|i| match i + 1 {
            next if next < n => {
                format!(r#"{{"id":{},"key":{},"value":{},"next":{}}}"#, i, i, i, next)
            }
            _ => format!(r#"{{"id":{},"key":{},"value":{}}}"#, i, i, i),
        })
        .collect();
    let text = format!(r#"{{"root":0,"nodes":[{}]}}"#, nodes.join(","));

    let config = Config::new("test_graph_decode_deep_chain");
    expect_decode_fail(decode::<u64, u64>(config.clone(), &text), "max_depth");

    let mut config = Config::new("test_graph_decode_deep_chain");
    config.set_max_depth(crate::config::MAX_DEPTH_LIMIT);
    expect_decode_fail(decode::<u64, u64>(config.clone(), &text), "max_depth");

    config.set_max_depth(usize::MAX);
    match decode::<u64, u64>(config, &text) {
        Err(Error::InvalidConfig(_, msg)) => assert!(msg.contains("max_depth"), "{}", msg),
        Err(err) => panic!("unexpected {}", err),
        Ok(_) => panic!("expected invalid config"),
    }

    let index: Index<u64, u64> = Index::new("untouched");
    index.set(10, 10);
    expect_decode_fail(restore(&index, &text), "max_depth");
    assert_eq!(index.to_entries(), vec![(10, 10)]);
}

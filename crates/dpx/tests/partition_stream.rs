// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::cast_sign_loss)] // Test data conversions

//! Stream partitioning integration tests
//!
//! Drives the partitioner end to end: encoded input, hash routing, periodic
//! resets and sealed outputs decoded back.

use dpx::partition::{
    encode_values, partition, partition_reader, JavaStringHash, KeyHasher, SealedPartition,
    StreamDecoder, StreamEncoder, StreamEnd, StreamPartitioner, RESET_INTERVAL,
};
use dpx::{DecodeError, Error};

/// Keys carry their own hash as decimal text.
fn hash_from_key(key: &[u8]) -> i32 {
    std::str::from_utf8(key).unwrap().parse().unwrap()
}

fn ok_items(values: Vec<Vec<u8>>) -> Vec<Result<Vec<u8>, DecodeError>> {
    values.into_iter().map(Ok).collect()
}

fn decode_all(partition: &SealedPartition) -> Vec<Vec<u8>> {
    partition
        .decode()
        .collect::<Result<Vec<_>, _>>()
        .expect("sealed partition decodes")
}

fn pairs(values: Vec<Vec<u8>>) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut it = values.into_iter();
    let mut out = Vec::new();
    while let (Some(k), Some(v)) = (it.next(), it.next()) {
        out.push((k, v));
    }
    out
}

#[test]
fn test_known_hashes_route_to_normalized_modulo() {
    let hashes = [0, 1, 2, 3, -1, -2, -5, 7, 100, -100];
    let mut input = Vec::new();
    for (i, h) in hashes.iter().enumerate() {
        input.push(h.to_string().into_bytes());
        input.push(format!("value-{}", i).into_bytes());
    }

    let partitioner = StreamPartitioner::with_hasher(4, hash_from_key).unwrap();
    let out = partitioner.partition(ok_items(input.clone())).unwrap();
    assert_eq!(out.end, StreamEnd::Exhausted);
    assert_eq!(out.buffers.len(), 4);

    let expected_pid = |h: i32| h.rem_euclid(4) as usize;
    let mut all = Vec::new();
    for (pid, buffer) in out.buffers.iter().enumerate() {
        let routed = pairs(decode_all(buffer));
        assert_eq!(routed.len(), buffer.records);

        // Every key landed in its own bucket, in input order.
        let expected: Vec<_> = pairs(input.clone())
            .into_iter()
            .filter(|(k, _)| expected_pid(hash_from_key(k)) == pid)
            .collect();
        assert_eq!(routed, expected, "partition {}", pid);
        all.extend(routed);
    }

    // Concatenation is a permutation of the input.
    let mut all_sorted = all;
    let mut input_sorted = pairs(input);
    all_sorted.sort();
    input_sorted.sort();
    assert_eq!(all_sorted, input_sorted);
}

#[test]
fn test_single_partition_resets_and_decodes() {
    let mut input = Vec::new();
    for i in 0..250 {
        input.push(format!("key-{}", i % 7).into_bytes());
        input.push(format!("payload-{}", i).into_bytes());
    }

    let partitioner = StreamPartitioner::with_hasher(3, |_: &[u8]| -4).unwrap();
    let out = partitioner.partition(ok_items(input.clone())).unwrap();

    // hash -4 mod 3 normalizes to 2.
    let target = &out.buffers[2];
    assert_eq!(target.records, 250);
    assert!(target.resets >= 2, "only {} resets", target.resets);
    assert_eq!(target.resets, 500 / RESET_INTERVAL);
    assert_eq!(decode_all(target), input);

    for idle in &out.buffers[..2] {
        assert_eq!(idle.records, 0);
        assert!(decode_all(idle).is_empty());
    }
}

#[test]
fn test_empty_input_yields_sealed_empty_buffers() {
    let out = partition(ok_items(Vec::new()), 4).unwrap();
    assert_eq!(out.end, StreamEnd::Exhausted);
    assert_eq!(out.buffers.len(), 4);
    let header = StreamEncoder::new().finish();
    for buffer in &out.buffers {
        assert_eq!(buffer.bytes, header);
        assert_eq!(buffer.records, 0);
        assert_eq!(buffer.resets, 0);
        assert_eq!(StreamDecoder::new(buffer.bytes.as_slice()).count(), 0);
    }
}

#[test]
fn test_truncated_reader_keeps_routed_records() {
    let values: [&[u8]; 6] = [b"alpha", b"1", b"beta", b"2", b"gamma", b"3"];
    let mut bytes = encode_values(values.iter().copied()).unwrap();
    bytes.truncate(bytes.len() - 3);

    let out = partition_reader(bytes.as_slice(), 2).unwrap();
    assert!(out.is_truncated());
    assert!(matches!(out.end, StreamEnd::Truncated(DecodeError::Truncated { .. })));
    assert_eq!(out.records(), 2);
    for buffer in &out.buffers {
        assert_eq!(pairs(decode_all(buffer)).len(), buffer.records);
    }
    assert!(matches!(
        out.into_result(),
        Err(Error::PartitionDecode(DecodeError::Truncated { .. }))
    ));
}

#[test]
fn test_default_hasher_routes_by_string_hash() {
    let input = vec![b"hello".to_vec(), b"world".to_vec()];
    let out = partition(ok_items(input), 4).unwrap();
    let pid = JavaStringHash.hash_key(b"hello").rem_euclid(4) as usize;
    assert_eq!(pid, 2);
    assert_eq!(out.buffers[pid].records, 1);
    assert_eq!(out.records(), 1);
}

#[test]
fn test_bad_header_is_truncation_from_the_first_item() {
    let out = partition_reader(&b"XXXX\x01\x00"[..], 2).unwrap();
    assert_eq!(
        out.end,
        StreamEnd::Truncated(DecodeError::BadMagic { found: *b"XXXX" })
    );
    assert_eq!(out.buffers.len(), 2);
}

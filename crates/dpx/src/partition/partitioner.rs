// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hash-routing of a key/value stream into N sealed partitions.

use super::codec::{StreamDecoder, StreamEncoder};
use super::hash::{route, JavaStringHash, KeyHasher};
use crate::error::{DecodeError, Error, Result};
use std::io::Read;
use std::thread;

/// Appended values after which a partition's back-reference table is reset.
pub const RESET_INTERVAL: usize = 100;

/// Thread name of the partition worker.
pub const WORKER_NAME: &str = "dpx-partition";

/// One finished partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPartition {
    /// Encoded stream, header included even when empty.
    pub bytes: Vec<u8>,
    /// Key/value records routed here.
    pub records: usize,
    /// Reset markers written.
    pub resets: usize,
}

impl SealedPartition {
    /// Decode this partition's values back.
    pub fn decode(&self) -> StreamDecoder<&[u8]> {
        StreamDecoder::new(self.bytes.as_slice())
    }
}

/// How the input stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// Every item was consumed.
    Exhausted,
    /// Decoding failed part way; records before the failure were routed.
    Truncated(DecodeError),
}

/// Result of a partition run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partitioned {
    /// Exactly `n` sealed buffers, indexed by partition id.
    pub buffers: Vec<SealedPartition>,
    pub end: StreamEnd,
}

impl Partitioned {
    pub fn is_truncated(&self) -> bool {
        matches!(self.end, StreamEnd::Truncated(_))
    }

    /// Total records routed across all partitions.
    pub fn records(&self) -> usize {
        self.buffers.iter().map(|b| b.records).sum()
    }

    /// Buffers when the input was fully consumed, otherwise the decode error.
    pub fn into_result(self) -> Result<Vec<SealedPartition>> {
        match self.end {
            StreamEnd::Exhausted => Ok(self.buffers),
            StreamEnd::Truncated(e) => Err(Error::PartitionDecode(e)),
        }
    }
}

/// Routes records by `hash(key) mod n` into `n` encoders.
#[derive(Debug, Clone)]
pub struct StreamPartitioner<H = JavaStringHash> {
    count: usize,
    hasher: H,
    reset_interval: usize,
}

impl StreamPartitioner<JavaStringHash> {
    pub fn new(count: usize) -> Result<Self> {
        Self::with_hasher(count, JavaStringHash)
    }
}

impl<H: KeyHasher + Sync> StreamPartitioner<H> {
    pub fn with_hasher(count: usize, hasher: H) -> Result<Self> {
        if count == 0 {
            return Err(Error::Configuration(
                "partition count must be positive".into(),
            ));
        }
        if count > i32::MAX as usize {
            return Err(Error::Configuration(format!(
                "partition count {} exceeds {}",
                count,
                i32::MAX
            )));
        }
        Ok(Self {
            count,
            hasher,
            reset_interval: RESET_INTERVAL,
        })
    }

    /// Override how many appended values trigger a reset (minimum 2).
    pub fn reset_interval(mut self, values: usize) -> Self {
        self.reset_interval = values.max(2);
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Partition `source` on a dedicated worker thread and wait for it.
    ///
    /// Items are paired into (key, value) in order. Every encoder is sealed
    /// exactly once, whether the input was exhausted or truncated.
    pub fn partition<I>(&self, source: I) -> Result<Partitioned>
    where
        I: IntoIterator<Item = std::result::Result<Vec<u8>, DecodeError>>,
        I::IntoIter: Send,
    {
        let items = source.into_iter();
        thread::scope(|scope| {
            let worker = thread::Builder::new()
                .name(WORKER_NAME.into())
                .spawn_scoped(scope, move || self.run(items))?;
            match worker.join() {
                Ok(partitioned) => partitioned,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })
    }

    fn run<I>(&self, mut items: I) -> Result<Partitioned>
    where
        I: Iterator<Item = std::result::Result<Vec<u8>, DecodeError>>,
    {
        let mut encoders: Vec<StreamEncoder> =
            (0..self.count).map(|_| StreamEncoder::new()).collect();
        let mut counters = vec![0usize; self.count];
        let mut records = vec![0usize; self.count];
        let mut routed: u64 = 0;

        let end = loop {
            let key = match items.next() {
                None => break StreamEnd::Exhausted,
                Some(Err(e)) => break StreamEnd::Truncated(e),
                Some(Ok(key)) => key,
            };
            let value = match items.next() {
                None => break StreamEnd::Truncated(DecodeError::UnpairedKey { record: routed }),
                Some(Err(e)) => break StreamEnd::Truncated(e),
                Some(Ok(value)) => value,
            };

            let pid = route(self.hasher.hash_key(&key), self.count);
            let encoder = &mut encoders[pid];
            encoder.push(&key)?;
            encoder.push(&value)?;
            records[pid] += 1;
            routed += 1;

            counters[pid] += 2;
            if counters[pid] >= self.reset_interval {
                encoder.reset();
                counters[pid] = 0;
            }
        };

        if let StreamEnd::Truncated(e) = &end {
            log::warn!("[partition] input truncated after {} records: {}", routed, e);
        }

        let buffers: Vec<SealedPartition> = encoders
            .into_iter()
            .zip(records)
            .map(|(encoder, records)| {
                let resets = encoder.resets();
                SealedPartition {
                    bytes: encoder.finish(),
                    records,
                    resets,
                }
            })
            .collect();

        log::debug!(
            "[partition] sealed {} partitions, {} records",
            buffers.len(),
            routed
        );
        Ok(Partitioned { buffers, end })
    }
}

/// Partition `source` into `count` buffers with [`JavaStringHash`].
pub fn partition<I>(source: I, count: usize) -> Result<Partitioned>
where
    I: IntoIterator<Item = std::result::Result<Vec<u8>, DecodeError>>,
    I::IntoIter: Send,
{
    StreamPartitioner::new(count)?.partition(source)
}

/// Decode a stream from `reader` and partition it.
pub fn partition_reader<R: Read + Send>(reader: R, count: usize) -> Result<Partitioned> {
    partition(StreamDecoder::new(reader), count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::codec::encode_values;

    fn items(values: &[&[u8]]) -> Vec<std::result::Result<Vec<u8>, DecodeError>> {
        values.iter().map(|v| Ok(v.to_vec())).collect()
    }

    #[test]
    fn test_zero_partitions_rejected() {
        assert!(matches!(
            StreamPartitioner::new(0),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_single_partition_keeps_order() {
        let out = partition(items(&[b"k1", b"v1", b"k2", b"v2"]), 1).unwrap();
        assert_eq!(out.end, StreamEnd::Exhausted);
        let decoded: Vec<_> = out.buffers[0].decode().map(|r| r.unwrap()).collect();
        assert_eq!(
            decoded,
            [b"k1".to_vec(), b"v1".to_vec(), b"k2".to_vec(), b"v2".to_vec()]
        );
        assert_eq!(out.records(), 2);
    }

    #[test]
    fn test_unpaired_key_is_truncation() {
        let out = partition(items(&[b"k1", b"v1", b"k2"]), 2).unwrap();
        assert_eq!(
            out.end,
            StreamEnd::Truncated(DecodeError::UnpairedKey { record: 1 })
        );
        assert_eq!(out.buffers.len(), 2);
        assert_eq!(out.records(), 1);
        assert!(matches!(
            out.into_result(),
            Err(Error::PartitionDecode(DecodeError::UnpairedKey { .. }))
        ));
    }

    #[test]
    fn test_reset_interval_counts_values() {
        let partitioner = StreamPartitioner::with_hasher(1, |_: &[u8]| 0)
            .unwrap()
            .reset_interval(4);
        let out = partitioner
            .partition(items(&[b"a", b"1", b"b", b"2", b"c", b"3"]))
            .unwrap();
        assert_eq!(out.buffers[0].resets, 1);
    }

    #[test]
    fn test_worker_is_named() {
        let partitioner = StreamPartitioner::with_hasher(1, |_: &[u8]| {
            assert_eq!(thread::current().name(), Some(WORKER_NAME));
            0
        })
        .unwrap();
        partitioner.partition(items(&[b"k", b"v"])).unwrap();
    }

    #[test]
    fn test_partition_reader_decodes_input() {
        let input = encode_values([b"k".as_slice(), b"v".as_slice()]).unwrap();
        let out = partition_reader(input.as_slice(), 3).unwrap();
        assert_eq!(out.records(), 1);
        assert_eq!(out.end, StreamEnd::Exhausted);
    }
}

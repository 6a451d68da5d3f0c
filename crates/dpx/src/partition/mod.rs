// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stream partitioning for spill workloads.
//!
//! A decoded stream of alternating keys and values is routed into N
//! independently sealed buffers by `hash(key) mod N`. Each buffer resets its
//! back-reference table every [`RESET_INTERVAL`] appended values so encoder
//! memory stays bounded on long streams.

mod codec;
mod hash;
mod partitioner;

pub use codec::{encode_values, StreamDecoder, StreamEncoder, HEADER_LEN, MAGIC, STREAM_VERSION};
pub use hash::{route, JavaStringHash, KeyHasher};
pub use partitioner::{
    partition, partition_reader, Partitioned, SealedPartition, StreamEnd, StreamPartitioner,
    RESET_INTERVAL, WORKER_NAME,
};

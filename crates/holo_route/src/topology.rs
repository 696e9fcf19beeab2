//! Partition topology: descriptors, the collaborator trait the router reads
//! through, and an in-memory snapshot implementation.
//!
//! A snapshot can be built from HoloStore cluster-state JSON, where shards
//! carry `[start_key, end_key)` bounds and a leaseholder member id.

use std::collections::BTreeMap;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RouteError};
use crate::key::KeyRange;

/// Physical node serving partitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreDescriptor {
    pub id: u64,
    /// Host name or IP, without the port.
    pub host: String,
    pub port: u16,
}

impl StoreDescriptor {
    pub fn new(id: u64, host: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            host: host.into(),
            port,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One slice `[start_key, end_key)` of the key space at a point in time. An
/// empty `end_key` is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub id: u64,
    /// Inclusive first key.
    #[serde(default)]
    pub start_key: Vec<u8>,
    /// Exclusive end key; empty when unbounded.
    #[serde(default)]
    pub end_key: Vec<u8>,
    /// Store holding the partition's lease.
    pub store_id: u64,
}

impl PartitionDescriptor {
    pub fn new(
        id: u64,
        start_key: impl Into<Vec<u8>>,
        end_key: impl Into<Vec<u8>>,
        store_id: u64,
    ) -> Self {
        Self {
            id,
            start_key: start_key.into(),
            end_key: end_key.into(),
            store_id,
        }
    }

    pub fn key_range(&self) -> Result<KeyRange> {
        KeyRange::new(self.start_key.clone(), self.end_key.clone())
    }
}

/// Topology collaborator. Implementations answer from their best current
/// knowledge and never return overlapping partitions.
pub trait TopologySource: Send + Sync {
    /// Partitions intersecting `range`, ordered by start key.
    fn partitions_for_key_range(&self, range: &KeyRange) -> Result<Vec<PartitionDescriptor>>;

    fn store_for_partition(&self, partition_id: u64) -> Result<StoreDescriptor>;
}

/// Immutable topology view with partitions sorted by start key.
#[derive(Debug, Clone, Default)]
pub struct TopologySnapshot {
    partitions: Vec<PartitionDescriptor>,
    by_id: BTreeMap<u64, usize>,
    stores: BTreeMap<u64, StoreDescriptor>,
}

impl TopologySnapshot {
    /// Sorts and validates `partitions`: bounds must be ordered, ids unique,
    /// and no two partitions may overlap. Gaps are allowed; routing reports
    /// them.
    pub fn new(
        mut partitions: Vec<PartitionDescriptor>,
        stores: impl IntoIterator<Item = StoreDescriptor>,
    ) -> Result<Self> {
        partitions.sort_by(|a, b| a.start_key.cmp(&b.start_key));

        let mut by_id = BTreeMap::new();
        for (idx, partition) in partitions.iter().enumerate() {
            if !partition.end_key.is_empty() && partition.start_key >= partition.end_key {
                return Err(RouteError::Topology(format!(
                    "partition {} has inverted bounds [{}, {})",
                    partition.id,
                    hex::encode(&partition.start_key),
                    hex::encode(&partition.end_key)
                )));
            }
            if by_id.insert(partition.id, idx).is_some() {
                return Err(RouteError::Topology(format!(
                    "partition id {} appears twice",
                    partition.id
                )));
            }
        }
        for pair in partitions.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            if left.end_key.is_empty() || left.end_key > right.start_key {
                return Err(RouteError::Topology(format!(
                    "partitions {} and {} overlap",
                    left.id, right.id
                )));
            }
        }

        let stores = stores
            .into_iter()
            .map(|store| (store.id, store))
            .collect();
        Ok(Self {
            partitions,
            by_id,
            stores,
        })
    }

    /// Parses HoloStore cluster-state JSON. Members without an address or in
    /// the `removed` state are not usable stores.
    pub fn from_cluster_state_json(payload: &str) -> anyhow::Result<Self> {
        let parsed: ClusterStateView =
            serde_json::from_str(payload).context("parse cluster state json")?;

        let mut stores = Vec::new();
        for (_, member) in parsed.members {
            if member.grpc_addr.is_empty() || member.state.eq_ignore_ascii_case("removed") {
                debug!(node_id = member.node_id, state = %member.state, "skipping unusable member");
                continue;
            }
            let (host, port) = member
                .grpc_addr
                .rsplit_once(':')
                .ok_or_else(|| anyhow!("missing port"))
                .and_then(|(host, port)| Ok((host, port.parse::<u16>()?)))
                .with_context(|| {
                    format!("invalid grpc addr in cluster state: {}", member.grpc_addr)
                })?;
            stores.push(StoreDescriptor::new(member.node_id, host, port));
        }

        let partitions = parsed
            .shards
            .into_iter()
            .map(|shard| {
                PartitionDescriptor::new(
                    shard.shard_id,
                    shard.start_key,
                    shard.end_key,
                    shard.leaseholder,
                )
            })
            .collect();

        Self::new(partitions, stores).context("validate cluster topology")
    }

    pub fn partitions(&self) -> &[PartitionDescriptor] {
        &self.partitions
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

impl TopologySource for TopologySnapshot {
    fn partitions_for_key_range(&self, range: &KeyRange) -> Result<Vec<PartitionDescriptor>> {
        // Partitions are disjoint, so end keys are sorted too (unbounded last).
        let first = self.partitions.partition_point(|partition| {
            !partition.end_key.is_empty() && partition.end_key.as_slice() <= range.start()
        });
        Ok(self.partitions[first..]
            .iter()
            .take_while(|partition| {
                range.is_unbounded() || partition.start_key.as_slice() < range.end()
            })
            .cloned()
            .collect())
    }

    fn store_for_partition(&self, partition_id: u64) -> Result<StoreDescriptor> {
        let partition = self
            .by_id
            .get(&partition_id)
            .map(|idx| &self.partitions[*idx])
            .ok_or_else(|| RouteError::Topology(format!("unknown partition {partition_id}")))?;
        self.stores
            .get(&partition.store_id)
            .cloned()
            .ok_or(RouteError::StoreNotFound {
                store_id: partition.store_id,
                partition_id,
            })
    }
}

/// Wire model for cluster state JSON payload.
#[derive(Debug, Deserialize)]
struct ClusterStateView {
    #[serde(default)]
    members: BTreeMap<String, MemberView>,
    #[serde(default)]
    shards: Vec<ShardView>,
}

#[derive(Debug, Deserialize)]
struct MemberView {
    node_id: u64,
    #[serde(default)]
    grpc_addr: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct ShardView {
    shard_id: u64,
    leaseholder: u64,
    #[serde(default)]
    start_key: Vec<u8>,
    #[serde(default)]
    end_key: Vec<u8>,
}

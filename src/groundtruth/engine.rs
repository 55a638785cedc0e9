//! Exact filtered k-nearest-neighbor scan over sharded data.
//!
//! A job runs in four steps:
//!
//! 1. **Validate**: read every shard's vector header and metadata schema,
//!    check dimensions and bind every query predicate to every schema. No
//!    record is scanned before all of this succeeds.
//! 2. **Scan**: load shards and offer each predicate-passing record to its
//!    query's [`TopKCollector`], either sequentially, by shard group or by
//!    query (see [`PartitionAxis`]).
//! 3. **Merge**: shard-group partials are re-offered in scan order.
//! 4. **Drain**: every collector becomes a [`NeighborResult`], nearest first.
//!
//! Every mode produces exactly the sequential answer, tie-breaks included.

use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{GroundtruthError, Result};
use crate::format::{QueryRecord, QuerySet, ShardHeader};
use crate::groundtruth::config::{GroundtruthConfig, PartitionAxis};
use crate::groundtruth::merger::merge_partials;
use crate::groundtruth::source::{Shard, ShardSource};
use crate::groundtruth::stats::{ScanStats, ShardStats};
use crate::query::BoundPredicate;
use crate::schema::Schema;
use crate::search::{Neighbor, NeighborResult, ScanPosition, TopKCollector};
use crate::vector::squared_euclidean;

/// The answer to a groundtruth job.
#[derive(Debug, Clone)]
pub struct GroundtruthOutput {
    /// One result per query, in query order.
    pub results: Vec<NeighborResult>,

    /// Scan counters.
    pub stats: ScanStats,
}

impl GroundtruthOutput {
    /// Get the neighbor ids of every query.
    pub fn id_lists(&self) -> Vec<Vec<i32>> {
        self.results.iter().map(|r| r.ids.clone()).collect()
    }
}

/// What validation learned about one shard.
#[derive(Debug, Clone)]
struct ShardPlan {
    name: String,
    header: ShardHeader,
    schema: Schema,
    /// One bound predicate per query.
    predicates: Vec<BoundPredicate>,
}

/// Engine computing exact filtered nearest neighbors.
pub struct GroundtruthEngine {
    /// Configuration for the engine.
    config: GroundtruthConfig,

    /// Thread pool for parallel execution.
    thread_pool: ThreadPool,
}

impl GroundtruthEngine {
    /// Create a new engine.
    pub fn new(config: GroundtruthConfig) -> Result<Self> {
        config.validate()?;

        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(config.threads())
            .thread_name(|i| format!("groundtruth-{i}"))
            .build()
            .map_err(|e| GroundtruthError::internal(format!("Failed to create thread pool: {e}")))?;

        Ok(Self {
            config,
            thread_pool,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &GroundtruthConfig {
        &self.config
    }

    /// Compute the K nearest predicate-passing neighbors of every query.
    pub fn run<S: ShardSource>(&self, queries: &QuerySet, shards: &[S]) -> Result<GroundtruthOutput> {
        let sources: Vec<&dyn ShardSource> = shards.iter().map(|s| s as &dyn ShardSource).collect();
        self.run_sources(queries, &sources)
    }

    /// Like [`run`](Self::run), for shards of mixed source types.
    pub fn run_sources(
        &self,
        queries: &QuerySet,
        shards: &[&dyn ShardSource],
    ) -> Result<GroundtruthOutput> {
        let started = Instant::now();
        let partition = self.config.effective_partition();
        let threads = self.config.threads();

        info!(
            "Validating {} shards against {} queries (k={}, {} threads, partition={})",
            shards.len(),
            queries.len(),
            self.config.k,
            threads,
            partition
        );
        let plans = validate(queries, shards)?;

        if shards.is_empty() {
            warn!("No shards given; every query gets an empty result");
        }

        let (results, shard_stats) = match partition {
            PartitionAxis::Sequential => self.scan_sequential(queries, shards, &plans)?,
            PartitionAxis::Shards => self.scan_by_shards(queries, shards, &plans)?,
            PartitionAxis::Queries => self.scan_by_queries(queries, shards, &plans)?,
        };

        let short_results = results.iter().filter(|r| r.len() < self.config.k).count();
        if short_results > 0 {
            warn!(
                "{short_results} of {} queries have fewer than {} matching vectors",
                results.len(),
                self.config.k
            );
        }

        let stats = ScanStats {
            queries: queries.len(),
            k: self.config.k,
            threads,
            partition: partition.to_string(),
            shards: shard_stats,
            short_results,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            "Scanned {} vectors, {} candidates in {:.3}s",
            stats.vectors_scanned(),
            stats.candidates(),
            stats.elapsed_secs
        );

        Ok(GroundtruthOutput { results, stats })
    }

    fn collectors(&self, queries: &QuerySet) -> Vec<TopKCollector> {
        (0..queries.len())
            .map(|_| TopKCollector::new(self.config.k))
            .collect()
    }

    fn scan_sequential(
        &self,
        queries: &QuerySet,
        shards: &[&dyn ShardSource],
        plans: &[ShardPlan],
    ) -> Result<(Vec<NeighborResult>, Vec<ShardStats>)> {
        let mut collectors = self.collectors(queries);
        let mut stats = Vec::with_capacity(shards.len());

        for (index, (source, plan)) in shards.iter().zip(plans).enumerate() {
            let shard = load(*source, plan)?;
            stats.push(scan_shard(index, &shard, plan, queries.queries(), &mut collectors));
        }

        let results = collectors.into_iter().map(TopKCollector::drain).collect();
        Ok((results, stats))
    }

    fn scan_by_shards(
        &self,
        queries: &QuerySet,
        shards: &[&dyn ShardSource],
        plans: &[ShardPlan],
    ) -> Result<(Vec<NeighborResult>, Vec<ShardStats>)> {
        let groups = shard_groups(shards.len(), self.config.threads());
        debug!("Scanning {} shards in {} groups", shards.len(), groups.len());

        let partials = self.thread_pool.install(|| {
            groups
                .par_iter()
                .map(|range| {
                    let mut collectors = self.collectors(queries);
                    let mut stats = Vec::with_capacity(range.len());
                    for index in range.clone() {
                        let shard = load(shards[index], &plans[index])?;
                        stats.push(scan_shard(
                            index,
                            &shard,
                            &plans[index],
                            queries.queries(),
                            &mut collectors,
                        ));
                    }
                    let neighbors: Vec<Vec<Neighbor>> = collectors
                        .into_iter()
                        .map(TopKCollector::into_neighbors)
                        .collect();
                    Ok((neighbors, stats))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut shard_stats = Vec::with_capacity(shards.len());
        let mut neighbors = Vec::with_capacity(partials.len());
        for (group_neighbors, group_stats) in partials {
            neighbors.push(group_neighbors);
            shard_stats.extend(group_stats);
        }

        let mut results = merge_partials(self.config.k, neighbors);
        // A job without shards still answers every query.
        results.resize_with(queries.len(), NeighborResult::default);
        Ok((results, shard_stats))
    }

    fn scan_by_queries(
        &self,
        queries: &QuerySet,
        shards: &[&dyn ShardSource],
        plans: &[ShardPlan],
    ) -> Result<(Vec<NeighborResult>, Vec<ShardStats>)> {
        let mut collectors = self.collectors(queries);
        let mut stats = Vec::with_capacity(shards.len());

        for (index, (source, plan)) in shards.iter().zip(plans).enumerate() {
            let shard = load(*source, plan)?;
            info!("Scanning shard {index} ({}): {} vectors", plan.name, shard.len());

            let candidates: u64 = self.thread_pool.install(|| {
                collectors
                    .par_iter_mut()
                    .zip(queries.queries().par_iter())
                    .zip(plan.predicates.par_iter())
                    .map(|((collector, query), predicate)| {
                        scan_query(index, &shard, query, predicate, collector)
                    })
                    .sum()
            });

            stats.push(shard_stats(index, plan, &shard, candidates));
        }

        let results = collectors.into_iter().map(TopKCollector::drain).collect();
        Ok((results, stats))
    }
}

/// Check every shard against the query set before anything is scanned.
fn validate(queries: &QuerySet, shards: &[&dyn ShardSource]) -> Result<Vec<ShardPlan>> {
    let mut plans = Vec::with_capacity(shards.len());

    for (index, source) in shards.iter().enumerate() {
        let name = source.describe();
        let header = source.header()?;
        let (metadata_count, schema) = source.metadata_header()?;

        if header.count != metadata_count {
            return Err(GroundtruthError::format(format!(
                "Shard {index} ({name}): {} vectors but {metadata_count} metadata records",
                header.count
            )));
        }
        if header.dimension != queries.dimension() {
            return Err(GroundtruthError::validation(format!(
                "Shard {index} ({name}) has dimension {}, queries have dimension {}",
                header.dimension,
                queries.dimension()
            )));
        }

        let predicates = queries
            .queries()
            .iter()
            .enumerate()
            .map(|(q, query)| {
                query.predicate.bind(&schema).map_err(|e| match e {
                    GroundtruthError::Schema(msg) => GroundtruthError::schema(format!(
                        "Query {q} against shard {index} ({name}): {msg}"
                    )),
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Shard {index} ({name}): {} vectors, dim {}, schema [{schema}]",
            header.count, header.dimension
        );
        plans.push(ShardPlan {
            name,
            header,
            schema,
            predicates,
        });
    }

    Ok(plans)
}

/// Load a shard and check it still matches what validation saw.
fn load<'a>(source: &'a dyn ShardSource, plan: &ShardPlan) -> Result<std::borrow::Cow<'a, Shard>> {
    let shard = source.load()?;

    if shard.vectors().header() != plan.header {
        return Err(GroundtruthError::format(format!(
            "{}: loaded {} vectors of dimension {}, header declared {} of dimension {}",
            plan.name,
            shard.len(),
            shard.vectors().dimension(),
            plan.header.count,
            plan.header.dimension
        )));
    }
    if shard.schema() != &plan.schema {
        return Err(GroundtruthError::schema(format!(
            "{}: schema changed between validation and load",
            plan.name
        )));
    }

    Ok(shard)
}

/// Offer one shard's passing records to every query's collector.
fn scan_shard(
    index: usize,
    shard: &Shard,
    plan: &ShardPlan,
    queries: &[QueryRecord],
    collectors: &mut [TopKCollector],
) -> ShardStats {
    info!("Scanning shard {index} ({}): {} vectors", plan.name, shard.len());

    let candidates = collectors
        .iter_mut()
        .zip(queries)
        .zip(&plan.predicates)
        .map(|((collector, query), predicate)| scan_query(index, shard, query, predicate, collector))
        .sum();

    shard_stats(index, plan, shard, candidates)
}

/// Offer one shard's passing records to one query's collector.
///
/// Returns the number of records that passed the predicate.
fn scan_query(
    index: usize,
    shard: &Shard,
    query: &QueryRecord,
    predicate: &BoundPredicate,
    collector: &mut TopKCollector,
) -> u64 {
    let mut passed = 0;
    let records = shard.vectors().records();
    let metadata = shard.metadata().records();

    for (position, (record, attributes)) in records.iter().zip(metadata).enumerate() {
        if !predicate.matches(attributes) {
            continue;
        }
        passed += 1;
        let distance = squared_euclidean(&query.embedding, &record.embedding);
        collector.offer_neighbor(Neighbor::new(
            record.id,
            distance,
            ScanPosition::new(index, position),
        ));
    }

    passed
}

fn shard_stats(index: usize, plan: &ShardPlan, shard: &Shard, candidates: u64) -> ShardStats {
    debug!("Shard {index} ({}): {candidates} candidates passed predicates", plan.name);
    if candidates == 0 && !shard.is_empty() {
        warn!("Shard {index} ({}): no record matched any query predicate", plan.name);
    }
    ShardStats {
        shard: plan.name.clone(),
        vectors: shard.len(),
        candidates,
    }
}

/// Split `n` shards into at most `workers` contiguous, near-equal ranges.
fn shard_groups(n: usize, workers: usize) -> Vec<std::ops::Range<usize>> {
    let groups = workers.clamp(1, n.max(1));
    let base = n / groups;
    let extra = n % groups;

    let mut ranges = Vec::with_capacity(groups);
    let mut start = 0;
    for g in 0..groups {
        let len = base + usize::from(g < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use silo_gt::dataset::{
    MetadataGenConfig, SplitConfig, WorkloadConfig, generate_metadata, generate_workload,
    recall_at_k, split_files,
};
use silo_gt::error::{GroundtruthError, Result};
use silo_gt::format::{
    MetadataTable, QueryRecord, QuerySet, ShardHeader, VectorRecord, VectorShard,
    read_groundtruth, read_query_set, write_groundtruth, write_metadata, write_query_set,
    write_shard,
};
use silo_gt::groundtruth::{
    FileShard, GroundtruthConfig, GroundtruthEngine, PartitionAxis, Shard, ShardSource,
};
use silo_gt::query::{PredicateClause, compile_tokens};
use silo_gt::schema::{FieldType, FieldValue, MetadataRecord, Schema};

fn color_schema() -> Schema {
    Schema::builder()
        .field("color", FieldType::String)
        .field("value", FieldType::Int)
        .build()
        .unwrap()
}

fn shard(rows: &[(i32, [f32; 2])]) -> Shard {
    let vectors = VectorShard::from_records(
        2,
        rows.iter()
            .map(|(id, v)| VectorRecord::new(*id, v.to_vec()))
            .collect(),
    )
    .unwrap();
    let metadata = MetadataTable::from_records(
        color_schema(),
        rows.iter()
            .map(|(id, _)| {
                let color = if id % 2 == 0 { "red" } else { "blue" };
                MetadataRecord::new(vec![
                    FieldValue::Str(color.to_string()),
                    FieldValue::Int(i64::from(*id) * 10),
                ])
            })
            .collect(),
    )
    .unwrap();
    Shard::new(vectors, metadata).unwrap()
}

fn scenario_shards() -> Vec<Shard> {
    vec![
        shard(&[(0, [0.0, 0.0]), (1, [1.0, 0.0]), (2, [5.0, 5.0])]),
        shard(&[(3, [0.0, 1.0]), (4, [9.0, 9.0]), (5, [2.0, 2.0])]),
    ]
}

fn single_query(embedding: Vec<f32>, predicate: PredicateClause) -> QuerySet {
    QuerySet::from_queries(2, vec![QueryRecord::new(embedding, predicate)]).unwrap()
}

fn engine(k: usize, threads: usize, partition: PartitionAxis) -> GroundtruthEngine {
    GroundtruthEngine::new(
        GroundtruthConfig::new(k)
            .with_num_threads(threads)
            .with_partition(partition),
    )
    .unwrap()
}

/// Write a shard as silo files and return its file source.
fn write_silo(dir: &TempDir, index: usize, shard: &Shard) -> FileShard {
    let source = FileShard::silo(dir.path(), "deep", index);
    write_shard(source.vectors_path(), shard.vectors()).unwrap();
    write_metadata(source.metadata_path(), shard.metadata()).unwrap();
    source
}

/// A shard that counts how often it is loaded.
struct CountingSource {
    shard: Shard,
    loads: AtomicUsize,
}

impl ShardSource for CountingSource {
    fn describe(&self) -> String {
        "counting".to_string()
    }

    fn header(&self) -> Result<ShardHeader> {
        self.shard.header()
    }

    fn metadata_header(&self) -> Result<(usize, Schema)> {
        self.shard.metadata_header()
    }

    fn load(&self) -> Result<Cow<'_, Shard>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Cow::Borrowed(&self.shard))
    }
}

#[test]
fn two_shards_always_true_returns_global_nearest() -> Result<()> {
    let queries = single_query(vec![0.0, 0.0], PredicateClause::always());
    let output = engine(2, 1, PartitionAxis::Sequential).run(&queries, &scenario_shards())?;

    assert_eq!(output.results[0].ids, vec![0, 3]);
    assert_eq!(output.results[0].distances, vec![0.0, 1.0]);
    assert_eq!(output.stats.vectors_scanned(), 6);
    assert_eq!(output.stats.short_results, 0);
    Ok(())
}

#[test]
fn nearer_candidate_wins_beyond_f32_precision() -> Result<()> {
    // Squared distances 1e8 + 1 and 1e8 are equal once rounded to f32.
    let shards = vec![shard(&[(0, [10000.0, 1.0]), (1, [10000.0, 0.0])])];
    let queries = single_query(vec![0.0, 0.0], PredicateClause::always());

    for partition in [
        PartitionAxis::Sequential,
        PartitionAxis::Shards,
        PartitionAxis::Queries,
    ] {
        let output = engine(1, 2, partition).run(&queries, &shards)?;
        assert_eq!(output.results[0].ids, vec![1], "{partition}");
        assert_eq!(output.results[0].distances, vec![1e8]);
    }
    Ok(())
}

#[test]
fn absent_field_fails_before_any_load() {
    let sources: Vec<CountingSource> = scenario_shards()
        .into_iter()
        .map(|shard| CountingSource {
            shard,
            loads: AtomicUsize::new(0),
        })
        .collect();
    let queries = single_query(vec![0.0, 0.0], PredicateClause::equality("shape", "round"));

    for partition in [
        PartitionAxis::Sequential,
        PartitionAxis::Shards,
        PartitionAxis::Queries,
    ] {
        let result = engine(2, 2, partition).run(&queries, &sources);
        match result {
            Err(GroundtruthError::Schema(msg)) => assert!(msg.contains("shape")),
            other => panic!("Expected schema error, got {other:?}"),
        }
    }
    assert!(sources.iter().all(|s| s.loads.load(Ordering::SeqCst) == 0));
}

#[test]
fn short_results_when_few_records_match() -> Result<()> {
    let queries = single_query(vec![0.0, 0.0], compile_tokens(["color=\"blue\""])?);
    let output = engine(5, 1, PartitionAxis::Sequential).run(&queries, &scenario_shards())?;

    // Odd ids are blue: 1 at distance 1, 3 at distance 1, 5 at distance 8.
    assert_eq!(output.results[0].ids, vec![1, 3, 5]);
    assert_eq!(output.stats.short_results, 1);
    Ok(())
}

#[test]
fn file_pipeline_is_byte_identical_across_runs() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let sources: Vec<FileShard> = scenario_shards()
        .iter()
        .enumerate()
        .map(|(i, shard)| write_silo(&dir, i, shard))
        .collect();

    let query_path = dir.path().join("query.txt");
    let mut set = QuerySet::new(2);
    set.push(QueryRecord::new(vec![0.5, 0.5], compile_tokens(["0<=value<=40"])?))?;
    set.push(QueryRecord::new(vec![6.0, 6.0], PredicateClause::always()))?;
    write_query_set(&query_path, &set)?;

    let mut outputs = Vec::new();
    for (run, partition) in [PartitionAxis::Sequential, PartitionAxis::Shards]
        .into_iter()
        .enumerate()
    {
        let queries = read_query_set(&query_path)?;
        let output = engine(3, 2, partition).run(&queries, &sources)?;
        let path = dir.path().join(format!("gt_{run}.ivecs"));
        write_groundtruth(&path, &output.results)?;
        outputs.push(std::fs::read(&path).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);

    let lists = read_groundtruth(dir.path().join("gt_0.ivecs"))?;
    assert_eq!(lists, vec![vec![0, 1, 3], vec![2, 4, 5]]);
    Ok(())
}

#[test]
fn parallel_modes_match_sequential_with_ties() -> Result<()> {
    // Many equal distances make the tie-break visible.
    let shards: Vec<Shard> = (0..7)
        .map(|s| {
            let rows: Vec<(i32, [f32; 2])> = (0..20)
                .map(|i| {
                    let id = s * 20 + i;
                    (id, [(i % 3) as f32, (i % 2) as f32])
                })
                .collect();
            shard(&rows)
        })
        .collect();
    let mut queries = QuerySet::new(2);
    for q in 0..9 {
        let predicate = if q % 3 == 0 {
            compile_tokens(["color=\"red\""])?
        } else {
            PredicateClause::always()
        };
        queries.push(QueryRecord::new(vec![(q % 3) as f32, 0.0], predicate))?;
    }

    let expected = engine(10, 1, PartitionAxis::Sequential).run(&queries, &shards)?;
    for threads in [2, 3, 8] {
        for partition in [PartitionAxis::Shards, PartitionAxis::Queries] {
            let actual = engine(10, threads, partition).run(&queries, &shards)?;
            assert_eq!(
                actual.results, expected.results,
                "{partition} with {threads} threads"
            );
        }
    }
    Ok(())
}

#[test]
fn matches_brute_force_on_random_data() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let dim = 4;
    let mut shards = Vec::new();
    let mut all = Vec::new();
    let mut next_id = 0;

    for _ in 0..3 {
        let mut vectors = VectorShard::new(dim);
        let mut metadata = MetadataTable::new(color_schema());
        for _ in 0..50 {
            let embedding: Vec<f32> = (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect();
            let value: i64 = rng.random_range(0..100);
            all.push((next_id, embedding.clone(), value));
            vectors.push(VectorRecord::new(next_id, embedding))?;
            metadata.push(MetadataRecord::new(vec![
                FieldValue::Str("red".to_string()),
                FieldValue::Int(value),
            ]))?;
            next_id += 1;
        }
        shards.push(Shard::new(vectors, metadata)?);
    }

    let mut queries = QuerySet::new(dim);
    for _ in 0..5 {
        let embedding: Vec<f32> = (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect();
        queries.push(QueryRecord::new(
            embedding,
            PredicateClause::range("value", 20.0, 60.0),
        ))?;
    }

    let output = engine(8, 4, PartitionAxis::Shards).run(&queries, &shards)?;

    for (query, result) in queries.queries().iter().zip(&output.results) {
        let mut candidates: Vec<(f64, i32)> = all
            .iter()
            .filter(|(_, _, value)| (20..=60).contains(value))
            .map(|(id, v, _)| {
                let d = v
                    .iter()
                    .zip(&query.embedding)
                    .map(|(a, b)| (f64::from(*a) - f64::from(*b)).powi(2))
                    .sum::<f64>();
                (d, *id)
            })
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let expected: Vec<i32> = candidates.iter().take(8).map(|(_, id)| *id).collect();
        assert_eq!(result.ids, expected);
    }
    Ok(())
}

#[test]
fn generated_dataset_recalls_itself() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let records: Vec<VectorRecord> = (0..60)
        .map(|id| VectorRecord::new(id, (0..3).map(|_| rng.random_range(0.0..1.0)).collect()))
        .collect();
    let vectors_path = dir.path().join("base.fivecs");
    let metadata_path = dir.path().join("meta.txt");
    write_shard(&vectors_path, &VectorShard::from_records(3, records)?)?;
    write_metadata(&metadata_path, &generate_metadata(60, &MetadataGenConfig::default())?)?;

    let silos = split_files(
        &vectors_path,
        &metadata_path,
        dir.path().join("silos"),
        &SplitConfig::new(3),
    )?;
    assert_eq!(silos.len(), 3);

    let shards = silos
        .iter()
        .map(|s| s.load().map(|shard| shard.into_owned().into_parts().0))
        .collect::<Result<Vec<_>>>()?;
    let queries = generate_workload(&shards, &WorkloadConfig::new(4).with_seed(11))?;
    assert_eq!(queries.len(), 12);

    let output = engine(5, 2, PartitionAxis::Queries).run(&queries, &silos)?;
    let lists = output.id_lists();
    let report = recall_at_k(&lists, &lists, 5)?;
    assert_eq!(report.mean_recall, 1.0);
    Ok(())
}

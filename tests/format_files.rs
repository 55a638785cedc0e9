use std::fs;

use tempfile::TempDir;

use silo_gt::dataset::convert_fbin;
use silo_gt::error::GroundtruthError;
use silo_gt::format::{
    MetadataTable, QueryRecord, QuerySet, VectorRecord, VectorShard, read_fbin, read_fbin_chunk,
    read_fbin_header, read_groundtruth, read_metadata, read_metadata_header, read_query_set,
    read_shard, read_shard_header, write_fbin, write_id_lists, write_metadata, write_query_set,
    write_shard,
};
use silo_gt::query::PredicateClause;
use silo_gt::schema::{FieldType, FieldValue, MetadataRecord, Schema};

#[test]
fn shard_file_keeps_float_bits() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("deep_0.fivecs");

    let odd = [-0.0f32, f32::MIN_POSITIVE / 2.0, f32::from_bits(0x7fc0_1234)];
    let shard = VectorShard::from_records(
        3,
        vec![
            VectorRecord::new(7, odd.to_vec()),
            VectorRecord::new(-1, vec![1.0, 2.5, 1e-30]),
        ],
    )
    .unwrap();
    write_shard(&path, &shard).unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 8 + 2 * (4 + 3 * 4));
    let header = read_shard_header(&path).unwrap();
    assert_eq!((header.count, header.dimension), (2, 3));

    let decoded = read_shard(&path).unwrap();
    assert_eq!(decoded.records()[0].id, 7);
    assert_eq!(decoded.records()[1].id, -1);
    for (a, b) in odd.iter().zip(&decoded.records()[0].embedding) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn truncated_shard_is_format_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("short.fivecs");
    let shard =
        VectorShard::from_records(2, vec![VectorRecord::new(0, vec![1.0, 2.0])]).unwrap();
    write_shard(&path, &shard).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes.truncate(bytes.len() - 2);
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(read_shard(&path), Err(GroundtruthError::Format(_))));
    assert!(matches!(
        read_shard_header(&path),
        Err(GroundtruthError::Format(_))
    ));
}

#[test]
fn missing_file_names_the_path() {
    let temp_dir = TempDir::new().unwrap();
    let err = read_shard(temp_dir.path().join("absent.fivecs")).unwrap_err();
    assert!(err.is_io());
    assert!(err.to_string().contains("absent.fivecs"));
}

#[test]
fn metadata_file_layout() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("meta_0.txt");

    let schema = Schema::builder()
        .field("color", FieldType::String)
        .field("value", FieldType::Int)
        .field("score", FieldType::Float)
        .build()
        .unwrap();
    let table = MetadataTable::from_records(
        schema,
        vec![
            MetadataRecord::new(vec![
                FieldValue::Str("red".to_string()),
                FieldValue::Int(12),
                FieldValue::Float(0.5),
            ]),
            MetadataRecord::new(vec![
                FieldValue::Str("blue".to_string()),
                FieldValue::Int(-3),
                FieldValue::Float(2.0),
            ]),
        ],
    )
    .unwrap();
    write_metadata(&path, &table).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("2 3"));
    assert_eq!(lines.next(), Some("color string value int score float"));

    assert_eq!(read_metadata(&path).unwrap(), table);
    let (count, header_schema) = read_metadata_header(&path).unwrap();
    assert_eq!(count, 2);
    assert_eq!(&header_schema, table.schema());
}

#[test]
fn metadata_header_reads_without_body() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("meta_1.txt");
    fs::write(&path, "2 1\ncolor string\nred\n").unwrap();

    // The header is fine even though a record is missing.
    assert_eq!(read_metadata_header(&path).unwrap().0, 2);
    assert!(matches!(
        read_metadata(&path),
        Err(GroundtruthError::Format(_))
    ));
}

#[test]
fn metadata_extra_lines_and_blank_tail() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("meta_2.txt");

    fs::write(&path, "1 1\nvalue int\n4\n\n\n").unwrap();
    assert_eq!(read_metadata(&path).unwrap().len(), 1);

    fs::write(&path, "1 1\nvalue int\n4\n5\n").unwrap();
    assert!(matches!(
        read_metadata(&path),
        Err(GroundtruthError::Format(_))
    ));
}

#[test]
fn metadata_writer_rejects_unwritable_strings() {
    let temp_dir = TempDir::new().unwrap();
    let schema = Schema::builder()
        .field("color", FieldType::String)
        .build()
        .unwrap();
    let table = MetadataTable::from_records(
        schema,
        vec![MetadataRecord::new(vec![FieldValue::Str(
            "dark red".to_string(),
        )])],
    )
    .unwrap();

    assert!(matches!(
        write_metadata(temp_dir.path().join("meta.txt"), &table),
        Err(GroundtruthError::Schema(_))
    ));
}

#[test]
fn query_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("query.txt");

    let mut set = QuerySet::new(2);
    set.push(QueryRecord::new(
        vec![0.1, -3.25],
        PredicateClause::all(vec![
            PredicateClause::equality("color", "red"),
            PredicateClause::range("value", 10.0, 250.0),
        ]),
    ))
    .unwrap();
    set.push(QueryRecord::new(vec![1e-7, 42.0], PredicateClause::always()))
        .unwrap();
    write_query_set(&path, &set).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("2 2\n"));
    assert!(text.contains("color=\"red\" 10<=value<=250"));

    let decoded = read_query_set(&path).unwrap();
    assert_eq!(decoded, set);
    assert_eq!(decoded.queries()[0].embedding[0].to_bits(), 0.1f32.to_bits());
}

#[test]
fn query_file_errors() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("query.txt");

    fs::write(&path, "1 3\n1 2\n").unwrap();
    assert!(matches!(
        read_query_set(&path),
        Err(GroundtruthError::Format(_))
    ));

    fs::write(&path, "1 2\n1 2 value>5\n").unwrap();
    assert!(matches!(
        read_query_set(&path),
        Err(GroundtruthError::Schema(_))
    ));

    fs::write(&path, "1 2\n1 2 9<=value<=3\n").unwrap();
    assert!(matches!(
        read_query_set(&path),
        Err(GroundtruthError::Schema(_))
    ));
}

#[test]
fn groundtruth_file_layout() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gt.ivecs");

    let lists = vec![vec![4, 1], vec![], vec![9]];
    write_id_lists(&path, &lists).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 4 * (1 + 2 + 1 + 1 + 1));
    assert_eq!(&bytes[..4], &2i32.to_le_bytes());
    assert_eq!(read_groundtruth(&path).unwrap(), lists);

    fs::write(&path, &bytes[..bytes.len() - 1]).unwrap();
    assert!(matches!(
        read_groundtruth(&path),
        Err(GroundtruthError::Format(_))
    ));
}

#[test]
fn fbin_chunks_and_conversion() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("base.fbin");
    let rows: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32, -(i as f32)]).collect();
    write_fbin(&input, 2, &rows).unwrap();

    let header = read_fbin_header(&input).unwrap();
    assert_eq!((header.count, header.dimension), (10, 2));
    assert_eq!(read_fbin(&input).unwrap(), (2, rows.clone()));

    let (_, chunk) = read_fbin_chunk(&input, 4, Some(3)).unwrap();
    assert_eq!(chunk, rows[4..7].to_vec());
    assert!(matches!(
        read_fbin_chunk(&input, 8, Some(3)),
        Err(GroundtruthError::Validation(_))
    ));

    let output = temp_dir.path().join("deep_1.fivecs");
    let converted = convert_fbin(&input, &output, 4, Some(3), 4).unwrap();
    assert_eq!(converted.count, 3);

    let shard = read_shard(&output).unwrap();
    let ids: Vec<i32> = shard.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![4, 5, 6]);
    assert_eq!(shard.records()[2].embedding, rows[6]);
}

#[test]
fn fbin_length_mismatch_is_format_error() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("bad.fbin");
    write_fbin(&input, 2, &[vec![1.0, 2.0]]).unwrap();

    let mut bytes = fs::read(&input).unwrap();
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    fs::write(&input, &bytes).unwrap();

    assert!(matches!(
        read_fbin_header(&input),
        Err(GroundtruthError::Format(_))
    ));
}

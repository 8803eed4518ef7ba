mod common;

use bytes::Bytes;
use common::{MemoryStore, TestResult, id_name_batch, numbered_batch, parquet_bytes};
use parquet_peek_core::{
    ColumnType, ErrorKind, InspectOptions, Locator, PeekError, RetryPolicy, inspect,
    inspect::describe_bytes,
};

const LOCATOR: &str = "s3://my-bucket/data/file.parquet";

#[tokio::test]
async fn inspects_small_table_end_to_end() -> TestResult {
    let bytes = parquet_bytes(&id_name_batch()?)?;
    let size = bytes.len() as u64;
    let store = MemoryStore::default().with_object(LOCATOR, bytes)?;
    let locator = Locator::parse(LOCATOR)?;

    let inspection = inspect(&store, &locator, &InspectOptions::default()).await?;

    assert_eq!(inspection.locator, locator);
    assert_eq!(inspection.object_size, size);

    let summary = &inspection.summary;
    assert_eq!((summary.row_count, summary.column_count), (3, 2));
    let id = summary.column("id").ok_or("missing id")?;
    assert_eq!(id.dtype, ColumnType::Int);
    assert_eq!((id.non_null_count, id.null_count), (3, 0));
    let name = summary.column("name").ok_or("missing name")?;
    assert_eq!(name.dtype, ColumnType::String);
    assert_eq!((name.non_null_count, name.null_count), (2, 1));
    // id: 24 data + 1 bitmap; name: 2 payload + 24 offsets + 1 bitmap.
    assert_eq!(summary.memory_estimate_bytes, 52);

    let preview = &inspection.preview;
    assert_eq!(preview.columns, vec!["id", "name"]);
    let cells: Vec<Vec<&str>> = preview
        .rows
        .iter()
        .map(|r| r.cells.iter().map(String::as_str).collect())
        .collect();
    assert_eq!(cells, vec![vec!["1", "a"], vec!["2", "b"], vec!["3", "null"]]);
    assert_eq!(preview.truncation_note(), None);
    Ok(())
}

#[tokio::test]
async fn preview_is_bounded_and_reports_omitted_rows() -> TestResult {
    let bytes = parquet_bytes(&numbered_batch(2_500)?)?;
    let store = MemoryStore::default().with_object(LOCATOR, bytes)?;
    let locator = Locator::parse(LOCATOR)?;
    let options = InspectOptions {
        show_rows: 5,
        ..InspectOptions::default()
    };

    let inspection = inspect(&store, &locator, &options).await?;

    assert_eq!(inspection.summary.row_count, 2_500);
    let x = inspection.summary.column("x").ok_or("missing x")?;
    assert_eq!(x.null_count, 625);
    assert_eq!(x.non_null_count + x.null_count, 2_500);

    let indices: Vec<usize> = inspection.preview.rows.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    assert_eq!(inspection.preview.rows[1].cells, vec!["1", "0.5"]);
    assert_eq!(inspection.preview.rows[3].cells, vec!["3", "null"]);
    assert_eq!(
        inspection.preview.truncation_note().as_deref(),
        Some("... and 2,495 more rows")
    );
    Ok(())
}

#[tokio::test]
async fn zero_preview_rows_still_summarizes() -> TestResult {
    let bytes = parquet_bytes(&numbered_batch(12)?)?;
    let store = MemoryStore::default().with_object(LOCATOR, bytes)?;
    let options = InspectOptions {
        show_rows: 0,
        ..InspectOptions::default()
    };

    let inspection = inspect(&store, &Locator::parse(LOCATOR)?, &options).await?;

    assert!(inspection.preview.rows.is_empty());
    assert_eq!(inspection.summary.row_count, 12);
    assert_eq!(inspection.preview.omitted_rows(), 12);
    Ok(())
}

#[tokio::test]
async fn repeated_runs_are_identical() -> TestResult {
    let bytes = parquet_bytes(&numbered_batch(40)?)?;
    let store = MemoryStore::default().with_object(LOCATOR, bytes)?;
    let locator = Locator::parse(LOCATOR)?;
    let options = InspectOptions::default();

    let first = inspect(&store, &locator, &options).await?;
    let second = inspect(&store, &locator, &options).await?;

    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn missing_key_maps_to_object_not_found() -> TestResult {
    let bytes = parquet_bytes(&id_name_batch()?)?;
    let store = MemoryStore::default().with_object(LOCATOR, bytes)?;
    let locator = Locator::parse("s3://my-bucket/data/other.parquet")?;

    let err = inspect(&store, &locator, &InspectOptions::default())
        .await
        .expect_err("key is absent");

    assert_eq!(err.kind(), ErrorKind::ObjectNotFound);
    assert_eq!(
        err.to_string(),
        "Parquet file not found: s3://my-bucket/data/other.parquet"
    );
    Ok(())
}

#[tokio::test]
async fn missing_bucket_maps_to_container_not_found() -> TestResult {
    let store = MemoryStore::default();
    let locator = Locator::parse("s3://nowhere/file.parquet")?;

    let err = inspect(&store, &locator, &InspectOptions::default())
        .await
        .expect_err("bucket is absent");

    assert_eq!(err.kind(), ErrorKind::ContainerNotFound);
    Ok(())
}

#[tokio::test]
async fn non_parquet_payload_is_a_decode_error() -> TestResult {
    let store = MemoryStore::default()
        .with_object(LOCATOR, Bytes::from_static(b"this is plainly not parquet"))?;
    let locator = Locator::parse(LOCATOR)?;
    let options = InspectOptions {
        retry: RetryPolicy::with_max_retries(2),
        ..InspectOptions::default()
    };

    let err = inspect(&store, &locator, &options)
        .await
        .expect_err("payload is not parquet");

    assert_eq!(err.kind(), ErrorKind::DecodeError);
    assert!(matches!(err, PeekError::Decode { .. }));
    assert!(err.to_string().contains(LOCATOR));
    Ok(())
}

#[test]
fn bytes_decode_without_a_store() -> TestResult {
    let bytes = parquet_bytes(&id_name_batch()?)?;

    let (summary, preview) = describe_bytes(bytes, &InspectOptions::default())?;

    assert_eq!(summary.row_count, 3);
    assert_eq!(preview.rows.len(), 3);
    Ok(())
}

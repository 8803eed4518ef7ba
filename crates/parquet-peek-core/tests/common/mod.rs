#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet_peek_core::{Locator, ObjectSource, StoreFailure};

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Encode one record batch as an in-memory parquet file.
pub fn parquet_bytes(batch: &RecordBatch) -> TestResult<Bytes> {
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(Bytes::from(buf))
}

/// `id: int64, name: utf8` with rows (1,"a"), (2,"b"), (3,null).
pub fn id_name_batch() -> TestResult<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
    ]);
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef,
            Arc::new(StringArray::from(vec![Some("a"), Some("b"), None])),
        ],
    )?;
    Ok(batch)
}

/// `n: int64, x: float64` with `rows` rows.
pub fn numbered_batch(rows: usize) -> TestResult<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("n", DataType::Int64, false),
        Field::new("x", DataType::Float64, true),
    ]);
    let ns: Vec<i64> = (0..rows as i64).collect();
    let xs: Vec<Option<f64>> = (0..rows)
        .map(|i| if i % 4 == 3 { None } else { Some(i as f64 * 0.5) })
        .collect();
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Int64Array::from(ns)) as ArrayRef,
            Arc::new(Float64Array::from(xs)),
        ],
    )?;
    Ok(batch)
}

/// An object store held in memory, keyed by `s3://bucket/key`.
#[derive(Default)]
pub struct MemoryStore {
    objects: HashMap<String, Bytes>,
    buckets: Vec<String>,
}

impl MemoryStore {
    pub fn with_object(mut self, locator: &str, bytes: Bytes) -> TestResult<Self> {
        let parsed = Locator::parse(locator)?;
        if !self.buckets.iter().any(|b| b == parsed.container()) {
            self.buckets.push(parsed.container().to_string());
        }
        self.objects.insert(parsed.to_string(), bytes);
        Ok(self)
    }
}

#[async_trait]
impl ObjectSource for MemoryStore {
    fn describe(&self) -> String {
        "in-memory store".to_string()
    }

    async fn probe(&self) -> Result<(), StoreFailure> {
        Ok(())
    }

    async fn get_object(&self, locator: &Locator) -> Result<Bytes, StoreFailure> {
        if !self.buckets.iter().any(|b| b == locator.container()) {
            return Err(StoreFailure::service(
                404,
                Some("NoSuchBucket"),
                "The specified bucket does not exist",
            ));
        }
        self.objects
            .get(&locator.to_string())
            .cloned()
            .ok_or_else(|| {
                StoreFailure::service(404, Some("NoSuchKey"), "The specified key does not exist.")
            })
    }
}

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use quipu_core::{Row, TableSpec};

use crate::errors::EngineError;

/// One unit of output: corrupted rows for a contiguous global index range
/// of one table. Created per iteration, discarded after the sink accepts it.
pub struct Batch<'a> {
    pub domain: &'a str,
    pub table: &'a TableSpec,
    pub range: Range<u64>,
    pub rows: Vec<Row>,
}

/// Acknowledgement implies durable persistence of the batch.
#[derive(Debug, Clone, Copy)]
pub struct SinkAck {
    pub rows_written: u64,
    pub bytes_written: u64,
}

/// Output destination. Failures are fatal for the run; the core never
/// retries writes itself.
pub trait Sink {
    fn accept(&mut self, batch: &Batch<'_>) -> Result<SinkAck, EngineError>;
    fn finish(&mut self) -> Result<(), EngineError>;
}

/// CSV sink appending every batch of a table to one file, header first.
/// Monolithic and batched runs therefore produce byte-identical files.
pub struct CsvSink {
    out_dir: PathBuf,
    writers: BTreeMap<String, TableWriter>,
}

struct TableWriter {
    writer: csv::Writer<CountingWriter<BufWriter<File>>>,
    bytes: Arc<AtomicU64>,
}

impl CsvSink {
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            writers: BTreeMap::new(),
        }
    }

    fn writer_for(&mut self, table: &TableSpec) -> Result<&mut TableWriter, EngineError> {
        match self.writers.entry(table.name.clone()) {
            std::collections::btree_map::Entry::Occupied(entry) => Ok(entry.into_mut()),
            std::collections::btree_map::Entry::Vacant(entry) => {
                std::fs::create_dir_all(&self.out_dir)?;
                let path = self.out_dir.join(format!("{}.csv", table.name));
                let file = BufWriter::new(File::create(path)?);
                let bytes = Arc::new(AtomicU64::new(0));
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(CountingWriter::new(file, Arc::clone(&bytes)));
                writer.write_record(table.header())?;
                Ok(entry.insert(TableWriter { writer, bytes }))
            }
        }
    }
}

impl Sink for CsvSink {
    fn accept(&mut self, batch: &Batch<'_>) -> Result<SinkAck, EngineError> {
        let table_writer = self.writer_for(batch.table)?;
        let before = table_writer.bytes.load(Ordering::Relaxed);

        for row in &batch.rows {
            let record: Vec<String> = batch
                .table
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| value.to_csv(column.kind))
                .collect();
            table_writer.writer.write_record(&record)?;
        }
        table_writer.writer.flush()?;

        let after = table_writer.bytes.load(Ordering::Relaxed);
        Ok(SinkAck {
            rows_written: batch.rows.len() as u64,
            bytes_written: after - before,
        })
    }

    fn finish(&mut self) -> Result<(), EngineError> {
        for table_writer in self.writers.values_mut() {
            table_writer.writer.flush()?;
        }
        Ok(())
    }
}

/// Collecting sink for tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    tables: BTreeMap<String, Vec<Row>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &[Row])> {
        self.tables
            .iter()
            .map(|(name, rows)| (name.as_str(), rows.as_slice()))
    }
}

impl Sink for MemorySink {
    fn accept(&mut self, batch: &Batch<'_>) -> Result<SinkAck, EngineError> {
        let rows = self.tables.entry(batch.table.name.clone()).or_default();
        rows.extend(batch.rows.iter().cloned());
        Ok(SinkAck {
            rows_written: batch.rows.len() as u64,
            bytes_written: 0,
        })
    }

    fn finish(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: Arc<AtomicU64>,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W, bytes: Arc<AtomicU64>) -> Self {
        Self { inner, bytes }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes.fetch_add(size as u64, Ordering::Relaxed);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

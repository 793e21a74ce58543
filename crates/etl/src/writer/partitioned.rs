//! Partitioned writer: formats a classified record as one TSV line and
//! appends it under `root/<kind>/<partition segments…>/<prefix>_r<shard>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::registry::{HandleRegistry, SweepMode};
use super::schema::{ColumnSchema, KindLayout};
use crate::error::EtlError;
use crate::record::{Kind, Record};

const MISSING_SEGMENT: &str = "NONE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// The kind has no layout in the schema.
    UnknownKind,
    /// Every configured column was empty.
    Blank,
}

pub struct PartitionedWriter {
    schema: Arc<ColumnSchema>,
    registry: HandleRegistry,
    root: PathBuf,
    prefix: String,
}

impl PartitionedWriter {
    pub fn new(
        schema: Arc<ColumnSchema>,
        registry: HandleRegistry,
        root: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Self {
        let prefix = prefix.into();
        let prefix = if prefix.is_empty() { "etl".to_string() } else { prefix };
        Self { schema, registry, root: root.into(), prefix }
    }

    /// Persist `record` as one line in the `shard` file of its partition.
    pub fn save(&self, record: &Record, kind: Kind, shard: usize) -> Result<SaveOutcome, EtlError> {
        let Some(layout) = self.schema.layout(kind) else {
            return Ok(SaveOutcome::UnknownKind);
        };
        let Some(line) = format_line(record, kind, &layout.columns) else {
            return Ok(SaveOutcome::Blank);
        };
        let path = self.output_path(record, kind, layout, shard);
        self.registry.append(&path, line.as_bytes())?;
        Ok(SaveOutcome::Written)
    }

    pub fn output_path(&self, record: &Record, kind: Kind, layout: &KindLayout, shard: usize) -> PathBuf {
        let mut path = self.root.join(kind.as_str());
        for key in &layout.partitions {
            path.push(partition_segment(record.get_or_empty(key)));
        }
        path.push(format!("{}_r{}", self.prefix, shard));
        path
    }

    /// Soft sweep: close handles with stale or missing date segments.
    pub fn close_expired(&self) -> usize {
        self.registry.sweep(SweepMode::Expired, Utc::now())
    }

    /// Close every handle. Used at final shutdown.
    pub fn close_all(&self) -> usize {
        self.registry.sweep(SweepMode::All, Utc::now())
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Join column values with tabs, newline-terminated. Empty column names
/// emit blank; missing fields emit blank with a warning. Returns `None`
/// when every value is empty.
pub fn format_line(record: &Record, kind: Kind, columns: &[String]) -> Option<String> {
    let mut values = Vec::with_capacity(columns.len());
    for column in columns {
        let value = if column.is_empty() {
            ""
        } else {
            match record.get(column) {
                Some(v) => v,
                None => {
                    warn!(%kind, column = column.as_str(), "record missing configured column");
                    ""
                }
            }
        };
        values.push(value.replace(['\n', '\r'], ""));
    }

    if values.iter().all(String::is_empty) {
        return None;
    }
    let mut line = values.join("\t");
    line.push('\n');
    Some(line)
}

/// Empty values become `NONE`; separators cannot escape the partition.
fn partition_segment(value: &str) -> String {
    match value {
        "" | "." | ".." => MISSING_SEGMENT.to_string(),
        v => v.replace(['/', '\\'], "_"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::keys;
    use crate::writer::fake::FakeFs;

    fn layout(columns: &[&str], partitions: &[&str]) -> KindLayout {
        KindLayout {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            partitions: partitions.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn writer(fs: &FakeFs) -> PartitionedWriter {
        let schema = ColumnSchema::new()
            .with_layout(Kind::Click, layout(&[keys::IP, keys::URL_PATH], &[keys::DAY, keys::HOUR]))
            .with_layout(Kind::Open, layout(&[keys::PARAM_APPID], &[keys::DAY]));
        let registry = HandleRegistry::new(Box::new(fs.clone()), 5).unwrap();
        PartitionedWriter::new(Arc::new(schema), registry, "/data/out", "etl")
    }

    fn record() -> Record {
        let mut r = Record::new();
        r.insert(keys::IP, "1.2.3.4");
        r.insert(keys::URL_PATH, "/img/gut.gif");
        r.insert(keys::DAY, "20261018");
        r.insert(keys::HOUR, "10");
        r
    }

    // ── Save ─────────────────────────────────────────────────────

    #[test]
    fn test_save_writes_tsv_under_partition_path() {
        let fs = FakeFs::new();
        let w = writer(&fs);

        assert_eq!(w.save(&record(), Kind::Click, 3).unwrap(), SaveOutcome::Written);
        assert_eq!(
            fs.contents("/data/out/click/20261018/10/etl_r3").as_deref(),
            Some("1.2.3.4\t/img/gut.gif\n")
        );
    }

    #[test]
    fn test_unknown_kind_is_noop() {
        let fs = FakeFs::new();
        let w = writer(&fs);

        assert_eq!(w.save(&record(), Kind::Access, 0).unwrap(), SaveOutcome::UnknownKind);
        assert_eq!(fs.file_count(), 0);
        assert_eq!(fs.dir_count(), 0);
        assert!(w.registry().is_empty());
    }

    #[test]
    fn test_blank_line_writes_nothing() {
        let fs = FakeFs::new();
        let w = writer(&fs);
        let mut r = record();
        r.insert(keys::PARAM_APPID, "");

        assert_eq!(w.save(&r, Kind::Open, 0).unwrap(), SaveOutcome::Blank);
        assert_eq!(fs.file_count(), 0);
        assert!(w.registry().is_empty());
    }

    #[test]
    fn test_missing_partition_value_becomes_none() {
        let fs = FakeFs::new();
        let w = writer(&fs);
        let mut r = record();
        r.insert(keys::HOUR, "");
        let mut no_day = r.clone();
        no_day.insert(keys::DAY, "");

        w.save(&r, Kind::Click, 0).unwrap();
        assert!(fs.contents("/data/out/click/20261018/NONE/etl_r0").is_some());

        let schema_path = w.output_path(&no_day, Kind::Click, &layout(&[], &[keys::DAY, "absent"]), 1);
        assert_eq!(schema_path, PathBuf::from("/data/out/click/NONE/NONE/etl_r1"));
    }

    #[test]
    fn test_shards_are_separate_files() {
        let fs = FakeFs::new();
        let w = writer(&fs);
        w.save(&record(), Kind::Click, 0).unwrap();
        w.save(&record(), Kind::Click, 1).unwrap();
        assert_eq!(fs.file_count(), 2);
        assert_eq!(w.registry().len(), 2);
    }

    #[test]
    fn test_empty_prefix_defaults() {
        let fs = FakeFs::new();
        let registry = HandleRegistry::new(Box::new(fs.clone()), 5).unwrap();
        let w = PartitionedWriter::new(Arc::new(ColumnSchema::new()), registry, "/o", "");
        let path = w.output_path(&Record::new(), Kind::Others, &KindLayout::default(), 2);
        assert_eq!(path, PathBuf::from("/o/others/etl_r2"));
    }

    #[test]
    fn test_close_all_empties_registry() {
        let fs = FakeFs::new();
        let w = writer(&fs);
        w.save(&record(), Kind::Click, 0).unwrap();
        assert_eq!(w.close_all(), 1);
        assert!(w.registry().is_empty());
    }

    // ── Formatting ───────────────────────────────────────────────

    #[test]
    fn test_format_strips_newlines_and_blanks_missing() {
        let mut r = Record::new();
        r.insert("a", "line1\nline2");
        r.insert("b", "x");
        let cols = vec!["a".to_string(), String::new(), "missing".to_string(), "b".to_string()];
        assert_eq!(format_line(&r, Kind::Others, &cols).as_deref(), Some("line1line2\t\t\tx\n"));
    }

    #[test]
    fn test_format_all_empty_is_none() {
        let r = Record::new();
        let cols = vec!["a".to_string(), "b".to_string()];
        assert_eq!(format_line(&r, Kind::Others, &cols), None);
        assert_eq!(format_line(&r, Kind::Others, &[]), None);
    }

    #[test]
    fn test_partition_segment_sanitized() {
        assert_eq!(partition_segment(""), "NONE");
        assert_eq!(partition_segment(".."), "NONE");
        assert_eq!(partition_segment("a/b"), "a_b");
        assert_eq!(partition_segment("20261018"), "20261018");
    }
}

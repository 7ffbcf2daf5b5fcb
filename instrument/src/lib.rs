//! Column-oriented capture of simulation telemetry.
//!
//! The engine emits structured rows with `tracing::info!` on a handful of
//! fixed targets (`metrics`, `event`, `hire`, `bankruptcy`, `insight`). The
//! [`DataFrameSubscriber`] turns every row into one row of a per-target table
//! whose columns appear as fields are first seen, so the schema follows
//! whatever the engine records.
//!
//! ```ignore
//! instrument::install_subscriber();
//! // ... step an engine ...
//! let recorder = instrument::drain();
//! let unemployment = recorder.column_f64("metrics", "unemployment");
//! ```
//!
//! Recording is thread-local: parallel tests each see only their own rows.

use std::cell::RefCell;
use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

// === COLUMNS ===

#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl TypedColumn {
    pub fn len(&self) -> usize {
        match self {
            TypedColumn::U64(v) => v.len(),
            TypedColumn::I64(v) => v.len(),
            TypedColumn::F64(v) => v.len(),
            TypedColumn::Bool(v) => v.len(),
            TypedColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric view of the column. Integers widen; text and flags do not convert.
    pub fn as_f64(&self) -> Option<Vec<f64>> {
        match self {
            TypedColumn::U64(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TypedColumn::I64(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TypedColumn::F64(v) => Some(v.clone()),
            TypedColumn::Bool(_) | TypedColumn::Str(_) => None,
        }
    }

    fn pad_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        if missing == 0 {
            return;
        }
        match self {
            TypedColumn::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TypedColumn::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TypedColumn::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            TypedColumn::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            TypedColumn::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }
}

/// One target's rows. Columns missing from a row are filled with zero values.
#[derive(Debug, Clone, Default)]
pub struct DynamicTable {
    pub columns: BTreeMap<String, TypedColumn>,
    pub row_count: usize,
}

impl DynamicTable {
    fn align(&mut self) {
        let rows = self.row_count;
        for col in self.columns.values_mut() {
            col.pad_to(rows);
        }
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| match col {
                TypedColumn::U64(v) => Column::new(name.into(), v),
                TypedColumn::I64(v) => Column::new(name.into(), v),
                TypedColumn::F64(v) => Column::new(name.into(), v),
                TypedColumn::Bool(v) => Column::new(name.into(), v),
                TypedColumn::Str(v) => Column::new(name.into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

/// Every table recorded on this thread, keyed by target.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub tables: BTreeMap<String, DynamicTable>,
}

impl Recorder {
    pub fn rows(&self, target: &str) -> usize {
        self.tables.get(target).map_or(0, |t| t.row_count)
    }

    /// Numeric column `field` of `target`, empty when either is missing.
    pub fn column_f64(&self, target: &str, field: &str) -> Vec<f64> {
        self.tables
            .get(target)
            .and_then(|t| t.columns.get(field))
            .and_then(TypedColumn::as_f64)
            .unwrap_or_default()
    }

    pub fn column_str(&self, target: &str, field: &str) -> Vec<String> {
        match self.tables.get(target).and_then(|t| t.columns.get(field)) {
            Some(TypedColumn::Str(v)) => v.clone(),
            _ => Vec::new(),
        }
    }

    /// Tables that fail to convert are skipped.
    pub fn to_dataframes(&self) -> BTreeMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
}

// === SUBSCRIBER ===

struct RowVisitor<'a> {
    table: &'a mut DynamicTable,
}

impl RowVisitor<'_> {
    /// Append to `field`, creating the column zero-filled for earlier rows.
    /// A value whose type differs from the column's first type is dropped
    /// and the slot padded.
    fn push<T>(
        &mut self,
        field: &Field,
        value: T,
        make: impl FnOnce(usize) -> TypedColumn,
        slot: impl FnOnce(&mut TypedColumn) -> Option<&mut Vec<T>>,
    ) {
        let rows = self.table.row_count;
        let col = self
            .table
            .columns
            .entry(field.name().to_string())
            .or_insert_with(|| make(rows));
        if let Some(v) = slot(col) {
            v.push(value);
        }
    }
}

impl Visit for RowVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(
            field,
            value,
            |n| TypedColumn::U64(vec![0; n]),
            |c| match c {
                TypedColumn::U64(v) => Some(v),
                _ => None,
            },
        );
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(
            field,
            value,
            |n| TypedColumn::I64(vec![0; n]),
            |c| match c {
                TypedColumn::I64(v) => Some(v),
                _ => None,
            },
        );
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(
            field,
            value,
            |n| TypedColumn::F64(vec![0.0; n]),
            |c| match c {
                TypedColumn::F64(v) => Some(v),
                _ => None,
            },
        );
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(
            field,
            value,
            |n| TypedColumn::Bool(vec![false; n]),
            |c| match c {
                TypedColumn::Bool(v) => Some(v),
                _ => None,
            },
        );
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(
            field,
            value.to_string(),
            |n| TypedColumn::Str(vec![String::new(); n]),
            |c| match c {
                TypedColumn::Str(v) => Some(v),
                _ => None,
            },
        );
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }
}

/// Records info-level events into the thread-local [`Recorder`]. Spans and
/// debug output are ignored.
pub struct DataFrameSubscriber;

impl Subscriber for DataFrameSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target().to_string();
        RECORDER.with(|r| {
            let mut recorder = r.borrow_mut();
            let table = recorder.tables.entry(target).or_default();
            table.align();
            event.record(&mut RowVisitor { table: &mut *table });
            table.row_count += 1;
            table.align();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install [`DataFrameSubscriber`] as the global default. Later calls are no-ops.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(DataFrameSubscriber);
}

/// Take everything recorded on this thread so far.
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::subscriber::with_default;

    #[test]
    fn rows_become_columns() {
        clear();
        with_default(DataFrameSubscriber, || {
            tracing::info!(target: "metrics", tick = 5u64, gini = 0.31, population = 200u64);
            tracing::info!(target: "metrics", tick = 10u64, gini = 0.33, population = 198u64);
            tracing::debug!(target: "metrics", tick = 11u64, gini = 0.9);
        });

        let recorder = drain();
        assert_eq!(recorder.rows("metrics"), 2);
        assert_eq!(recorder.column_f64("metrics", "tick"), vec![5.0, 10.0]);
        assert_eq!(recorder.column_f64("metrics", "gini"), vec![0.31, 0.33]);
        assert!(recorder.column_f64("metrics", "missing").is_empty());
        assert!(recorder.column_f64("hire", "wage").is_empty());
    }

    #[test]
    fn sparse_fields_are_padded() {
        clear();
        with_default(DataFrameSubscriber, || {
            tracing::info!(target: "event", tick = 1u64, kind = "pandemic", phase = "triggered");
            tracing::info!(target: "event", tick = 3u64, kind = "pandemic", phase = "resolved", choice = "lockdown");
            tracing::info!(target: "event", tick = 9u64, kind = "pandemic", phase = "expired");
        });

        let recorder = drain();
        let table = &recorder.tables["event"];
        assert_eq!(table.row_count, 3);
        assert!(table.columns.values().all(|c| c.len() == 3));
        assert_eq!(recorder.column_str("event", "choice"), vec!["", "lockdown", ""]);
        assert_eq!(
            recorder.column_str("event", "phase"),
            vec!["triggered", "resolved", "expired"]
        );
    }

    #[test]
    fn tables_convert_to_dataframes() {
        clear();
        with_default(DataFrameSubscriber, || {
            tracing::info!(target: "hire", tick = 5u64, wage = 15.5, agent_id = 1u64);
            tracing::info!(target: "hire", tick = 5u64, wage = 16.0, agent_id = 2u64);
        });

        let dfs = drain().to_dataframes();
        let hires = &dfs["hire"];
        assert_eq!(hires.height(), 2);
        assert_eq!(hires.width(), 3);
        let total: f64 = hires
            .column("wage")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .sum();
        assert_eq!(total, 31.5);
    }

    #[test]
    fn drain_empties_the_recorder() {
        clear();
        with_default(DataFrameSubscriber, || {
            tracing::info!(target: "insight", tick = 40u64, id = "recession");
        });
        assert_eq!(drain().rows("insight"), 1);
        assert_eq!(drain().rows("insight"), 0);
    }
}

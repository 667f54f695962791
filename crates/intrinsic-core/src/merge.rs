//! Last-writer-wins merging of statement tables.
//!
//! Merging is order-dependent: overlay tables from the least authoritative
//! source first and the most authoritative source last. Periods match by exact
//! date; no fuzzy alignment happens here.

use tracing::debug;

use crate::table::StatementTable;

/// Writes every cell of `incoming` into `base` and returns the result.
///
/// Cells of `incoming` overwrite cells of `base` with the same metric and
/// period, NaN cells included. Cells only present in `base` are kept.
#[must_use]
pub fn merge(mut base: StatementTable, incoming: &StatementTable) -> StatementTable {
    merge_into(&mut base, incoming);
    base
}

/// In-place form of [`merge`]. Returns the number of overwritten cells.
pub fn merge_into(base: &mut StatementTable, incoming: &StatementTable) -> usize {
    let mut overwritten = 0;
    for (metric, series) in incoming.iter() {
        for (period, value) in series.iter() {
            if base.insert(metric.clone(), *period, *value).is_some() {
                overwritten += 1;
            }
        }
    }
    debug!(
        cells = incoming.cell_count(),
        overwritten, "Merged statement table"
    );
    overwritten
}

/// Merges tables in order, the last one winning every conflict.
#[must_use]
pub fn merge_all<'a>(tables: impl IntoIterator<Item = &'a StatementTable>) -> StatementTable {
    tables
        .into_iter()
        .fold(StatementTable::new(), |acc, table| merge(acc, table))
}

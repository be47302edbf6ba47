use crate::model::Kind;
use crate::model::Layer;
use indexmap::IndexMap;

/// Counts micro-level occurrences of every kind across all files.
///
/// The result is seeded with every kind declared in the layer's legend at 0,
/// so declared-but-unused kinds are reported rather than omitted. Kinds that
/// occur in micro data without a declaration are counted as well.
pub fn layer_stats(layer: &Layer) -> IndexMap<Kind, usize> {
    let mut counts: IndexMap<Kind, usize> =
        layer.kinds.keys().map(|kind| (kind.clone(), 0)).collect();
    for (_, info) in &layer.files {
        for (_, kind) in &info.micro_level {
            *counts.entry(kind.clone()).or_insert(0) += 1;
        }
    }
    counts
}

use crate::model::Color;
use crate::model::Kind;
use crate::model::Layer;
use indexmap::IndexMap;
use indexmap::IndexSet;
use std::path::Path;
use tracing::warn;

/// Read-only merge of the active layers, keyed by absolute filename.
///
/// Built once per active-layer selection; flipping an active flag means a
/// full rebuild. The structure is immutable after [`LayerSet::build`] and
/// safe to share across any number of readers.
pub struct LayerSet {
    root: String,
    layers: Vec<(Layer, bool)>,
    micro_index: IndexMap<String, IndexMap<u32, Vec<Color>>>,
    macro_index: IndexMap<String, Vec<(f64, Color)>>,
    unresolved: IndexSet<Kind>,
}

impl LayerSet {
    /// Merges every (layer, active) pair under `root`.
    ///
    /// Inactive layers contribute nothing. Colors resolve against each
    /// layer's own legend; entries whose kind has no color are dropped with
    /// one warning per distinct kind string per build. Merge order follows
    /// input order, so the first color of a line is the highest-priority
    /// one. Building is deterministic given the same input.
    pub fn build(root: &Path, layers: Vec<(Layer, bool)>) -> Self {
        let root = root.to_string_lossy().trim_end_matches('/').to_string();
        let mut micro_index: IndexMap<String, IndexMap<u32, Vec<Color>>> = IndexMap::new();
        let mut macro_index: IndexMap<String, Vec<(f64, Color)>> = IndexMap::new();
        // Warn-once state lives here, scoped to this one build, so repeated
        // or concurrent builds never suppress each other's diagnostics.
        let mut unresolved: IndexSet<Kind> = IndexSet::new();

        for (layer, active) in &layers {
            if !*active {
                continue;
            }
            for (file, info) in &layer.files {
                let abs_file = absolute_file(&root, file);
                for (kind, fraction) in &info.macro_level {
                    match layer.kinds.get(kind) {
                        Some(color) => macro_index
                            .entry(abs_file.clone())
                            .or_default()
                            .push((*fraction, color.clone())),
                        None => warn_unresolved(&mut unresolved, kind),
                    }
                }
                for (line, kind) in &info.micro_level {
                    match layer.kinds.get(kind) {
                        Some(color) => micro_index
                            .entry(abs_file.clone())
                            .or_default()
                            .entry(*line)
                            .or_default()
                            .push(color.clone()),
                        None => warn_unresolved(&mut unresolved, kind),
                    }
                }
            }
        }

        Self {
            root,
            layers,
            micro_index,
            macro_index,
            unresolved,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// The source (layer, active) pairs, in merge order.
    pub fn layers(&self) -> &[(Layer, bool)] {
        &self.layers
    }

    /// Per-line colors of one file, or `None` if no active layer marks it.
    pub fn micro_colors(&self, file: &str) -> Option<&IndexMap<u32, Vec<Color>>> {
        self.micro_index.get(file)
    }

    /// Every color marking `line` of `file`, in insertion order. All colors
    /// are retained when several layers (or several kinds within one layer)
    /// mark the same line; a renderer that must pick one should take the
    /// first.
    pub fn line_colors(&self, file: &str, line: u32) -> &[Color] {
        self.micro_index
            .get(file)
            .and_then(|lines| lines.get(&line))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Aggregate composition of one file as (fraction, color) entries.
    /// Entries from several layers accumulate, so the fractions need not
    /// sum to 1; renormalization is the consumer's responsibility.
    pub fn macro_composition(&self, file: &str) -> &[(f64, Color)] {
        self.macro_index
            .get(file)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every absolute filename that received at least one annotation.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        let mut names: IndexSet<&str> = self.micro_index.keys().map(String::as_str).collect();
        names.extend(self.macro_index.keys().map(String::as_str));
        names.into_iter()
    }

    /// Kind strings that were dropped because their layer declared no color
    /// for them. One entry per distinct string, mirroring the warnings.
    pub fn unresolved_kinds(&self) -> &IndexSet<Kind> {
        &self.unresolved
    }
}

fn warn_unresolved(seen: &mut IndexSet<Kind>, kind: &str) {
    if seen.insert(kind.to_string()) {
        warn!("kind `{kind}` has no color in its layer's legend; dropping its entries");
    }
}

/// Root-relative names carry a leading `/` by convention, so the absolute
/// name is plain concatenation. Names without one still get a separator.
fn absolute_file(root: &str, file: &str) -> String {
    if file.starts_with('/') {
        format!("{root}{file}")
    } else {
        format!("{root}/{file}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileInfo;
    use indexmap::indexmap;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn layer(kinds: IndexMap<Kind, Color>, files: Vec<(&str, FileInfo)>) -> Layer {
        Layer {
            files: files
                .into_iter()
                .map(|(file, info)| (file.to_string(), info))
                .collect(),
            kinds,
        }
    }

    fn micro(entries: &[(u32, &str)]) -> FileInfo {
        FileInfo {
            micro_level: entries
                .iter()
                .map(|(line, kind)| (*line, kind.to_string()))
                .collect(),
            macro_level: Vec::new(),
        }
    }

    #[test]
    fn same_line_from_two_layers_keeps_both_colors_in_layer_order() {
        let first = layer(
            indexmap! { "dead".to_string() => "red".to_string() },
            vec![("/src/a.js", micro(&[(3, "dead")]))],
        );
        let second = layer(
            indexmap! { "covered".to_string() => "green".to_string() },
            vec![("/src/a.js", micro(&[(3, "covered")]))],
        );

        let set = LayerSet::build(Path::new("/project"), vec![(first, true), (second, true)]);
        assert_eq!(
            set.line_colors("/project/src/a.js", 3),
            ["red".to_string(), "green".to_string()]
        );
    }

    #[test]
    fn inactive_layers_reach_neither_index() {
        let active = layer(
            indexmap! { "dead".to_string() => "grey".to_string() },
            vec![("/src/a.js", micro(&[(1, "dead")]))],
        );
        let inactive = layer(
            indexmap! { "covered".to_string() => "green".to_string() },
            vec![(
                "/lib/b.js",
                FileInfo {
                    micro_level: vec![(1, "covered".to_string())],
                    macro_level: vec![("covered".to_string(), 1.0)],
                },
            )],
        );

        let set = LayerSet::build(Path::new("/project"), vec![(active, true), (inactive, false)]);
        assert!(set.micro_colors("/project/lib/b.js").is_none());
        assert!(set.macro_composition("/project/lib/b.js").is_empty());
        assert_eq!(set.line_colors("/project/src/a.js", 1), ["grey".to_string()]);
    }

    #[test]
    fn macro_entries_accumulate_across_layers() {
        let first = layer(
            indexmap! { "dead".to_string() => "grey".to_string() },
            vec![(
                "/src/a.js",
                FileInfo {
                    micro_level: Vec::new(),
                    macro_level: vec![("dead".to_string(), 0.4)],
                },
            )],
        );
        let second = layer(
            indexmap! { "covered".to_string() => "green".to_string() },
            vec![(
                "/src/a.js",
                FileInfo {
                    micro_level: Vec::new(),
                    macro_level: vec![("covered".to_string(), 0.9)],
                },
            )],
        );

        let set = LayerSet::build(Path::new("/project"), vec![(first, true), (second, true)]);
        assert_eq!(
            set.macro_composition("/project/src/a.js"),
            [(0.4, "grey".to_string()), (0.9, "green".to_string())]
        );
    }

    #[traced_test]
    #[test]
    fn unresolved_kind_warns_once_per_build() {
        let entries: Vec<(u32, String)> = (1..=1000).map(|line| (line, "foo".to_string())).collect();
        let stale = layer(
            indexmap! { "dead".to_string() => "grey".to_string() },
            vec![(
                "/src/a.js",
                FileInfo {
                    micro_level: entries,
                    macro_level: Vec::new(),
                },
            )],
        );

        let set = LayerSet::build(Path::new("/project"), vec![(stale, true)]);
        assert!(set.micro_colors("/project/src/a.js").is_none());
        assert_eq!(
            set.unresolved_kinds().iter().collect::<Vec<_>>(),
            ["foo"]
        );
        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|line| line.contains("`foo`")).count() {
                1 => Ok(()),
                n => Err(format!("expected exactly one warning for `foo`, saw {n}")),
            }
        });
    }

    #[test]
    fn later_duplicate_kind_definition_wins() {
        // IndexMap::insert keeps later-wins semantics for a legend that
        // declared the same kind twice (possible via the structured file).
        let mut kinds = IndexMap::new();
        kinds.insert("dead".to_string(), "grey".to_string());
        kinds.insert("dead".to_string(), "black".to_string());
        let one = layer(kinds, vec![("/src/a.js", micro(&[(1, "dead")]))]);

        let set = LayerSet::build(Path::new("/project"), vec![(one, true)]);
        assert_eq!(set.line_colors("/project/src/a.js", 1), ["black".to_string()]);
    }

    #[test]
    fn rebuild_of_same_input_is_identical() {
        let one = layer(
            indexmap! { "dead".to_string() => "grey".to_string() },
            vec![("/src/a.js", micro(&[(1, "dead"), (2, "dead")]))],
        );

        let a = LayerSet::build(Path::new("/project"), vec![(one.clone(), true)]);
        let b = LayerSet::build(Path::new("/project"), vec![(one, true)]);
        assert_eq!(a.line_colors("/project/src/a.js", 2), b.line_colors("/project/src/a.js", 2));
        assert_eq!(a.files().collect::<Vec<_>>(), b.files().collect::<Vec<_>>());
    }
}

use crate::model::Color;
use crate::model::FileInfo;
use crate::model::Kind;
use crate::model::Layer;
use indexmap::IndexMap;
use indexmap::IndexSet;
use std::path::Path;
use std::path::PathBuf;

/// Absolute position of one fact in a source tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcePosition {
    /// Absolute path of the annotated file.
    pub file: PathBuf,
    /// 1-based line number.
    pub line: u32,
}

impl SourcePosition {
    pub fn new(file: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// Accumulates unordered (position, kind) facts into a [`Layer`].
///
/// Files keep first-seen order, lines keep first-seen order within a file,
/// and kinds deduplicate per line with set semantics. `macro_level` is
/// synthesized as one entry per distinct kind observed anywhere in the
/// file, each at weight 1.0: presence of every occurring kind is
/// guaranteed, its true share of the file is not — proportional weighting
/// is left to callers that know line counts.
pub struct LayerBuilder {
    root: String,
    facts: IndexMap<String, IndexMap<u32, IndexSet<Kind>>>,
}

impl LayerBuilder {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_string_lossy().trim_end_matches('/').to_string(),
            facts: IndexMap::new(),
        }
    }

    pub fn add_fact(&mut self, position: &SourcePosition, kind: impl Into<Kind>) {
        let file = relative_file(&self.root, &position.file);
        self.facts
            .entry(file)
            .or_default()
            .entry(position.line)
            .or_default()
            .insert(kind.into());
    }

    pub fn add_facts<K, I>(&mut self, facts: I)
    where
        K: Into<Kind>,
        I: IntoIterator<Item = (SourcePosition, K)>,
    {
        for (position, kind) in facts {
            self.add_fact(&position, kind);
        }
    }

    /// Finishes the layer, attaching the caller-supplied legend verbatim.
    pub fn finish(self, kinds: IndexMap<Kind, Color>) -> Layer {
        let files = self
            .facts
            .into_iter()
            .map(|(file, lines)| {
                let mut micro_level = Vec::new();
                let mut observed: IndexSet<Kind> = IndexSet::new();
                for (line, kinds_on_line) in lines {
                    for kind in kinds_on_line {
                        observed.insert(kind.clone());
                        micro_level.push((line, kind));
                    }
                }
                let macro_level = observed.into_iter().map(|kind| (kind, 1.0)).collect();
                (
                    file,
                    FileInfo {
                        micro_level,
                        macro_level,
                    },
                )
            })
            .collect();
        Layer { files, kinds }
    }
}

/// Strips the root prefix, keeping the remainder's leading separator so the
/// result follows the `/src/a.js` root-relative convention. A path outside
/// the root is kept verbatim; the layer stays indexable, just not portable.
fn relative_file(root: &str, file: &Path) -> String {
    let absolute = file.to_string_lossy();
    match absolute.strip_prefix(root) {
        // Requiring the separator keeps `/project2/x.js` out of `/project`.
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => absolute.into_owned(),
    }
}

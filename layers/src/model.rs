use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

/// Category label scoped to one layer (e.g. "dead", "covered").
pub type Kind = String;

/// Name of a color in the external palette. Never validated here.
pub type Color = String;

/// Annotation data for one file inside a layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Per-line annotations as (1-based line, kind) pairs. The same
    /// (line, kind) pair never repeats, but one line may carry several
    /// distinct kinds.
    pub micro_level: Vec<(u32, Kind)>,
    /// Aggregate composition as (kind, fraction) pairs. Fractions are
    /// advisory weights and are not required to sum to 1.
    pub macro_level: Vec<(Kind, f64)>,
}

/// One named overlay over a source tree: per-file annotation data plus the
/// color legend for this layer's kinds.
///
/// Filenames are root-relative (leading-slash convention, e.g. `/src/a.js`)
/// so a persisted layer is portable across machines. A layer is immutable
/// once produced; transformations return new values.
///
/// Stale kind references (micro/macro entries whose kind is missing from
/// `kinds`, e.g. after hand-editing a layer file) are legal here and are
/// dropped during indexing instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Per-file data in insertion order.
    pub files: Vec<(String, FileInfo)>,
    /// Kind → color legend. Keys are unique; insertion order is kept.
    pub kinds: IndexMap<Kind, Color>,
}

impl Layer {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Linear lookup; layers carry few files relative to annotation volume.
    pub fn file_info(&self, name: &str) -> Option<&FileInfo> {
        self.files
            .iter()
            .find(|(file, _)| file == name)
            .map(|(_, info)| info)
    }
}

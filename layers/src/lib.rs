//! # Codemap Layers
//!
//! Colored annotation layers for a zoomable code map.
//!
//! Analysis passes hand this crate raw (position, kind) facts — dead-code
//! markers, coverage, lint findings, age-of-file. The crate turns them into
//! portable [`Layer`] values and merges any number of active layers into a
//! read-only [`LayerSet`] the rendering surface can query per file and line.
//!
//! ## Pipeline
//!
//! ```text
//! Analysis pass
//!     │  (absolute position, kind) facts
//!     ├──> LayerBuilder ──> Layer  <──> save_layer / load_layer
//!     │                      │
//!     │                      ├──> layer_stats / filter_layer
//!     │                      │
//!     └── active selection ──┴──> LayerSet::build
//!                                   └─> microIndex: file → line → colors
//!                                       macroIndex: file → (fraction, color)
//! ```
//!
//! ## Example
//!
//! ```
//! use codemap_layers::{LayerBuilder, LayerSet, SourcePosition};
//! use indexmap::indexmap;
//! use std::path::Path;
//!
//! let mut builder = LayerBuilder::new(Path::new("/project"));
//! builder.add_fact(&SourcePosition::new("/project/src/a.js", 3), "dead");
//! let layer = builder.finish(indexmap! { "dead".into() => "grey".into() });
//!
//! let set = LayerSet::build(Path::new("/project"), vec![(layer, true)]);
//! assert_eq!(set.line_colors("/project/src/a.js", 3), ["grey".to_string()]);
//! ```

mod builder;
mod error;
mod filter;
mod index;
mod model;
mod stats;
mod storage;

pub use builder::LayerBuilder;
pub use builder::SourcePosition;
pub use error::DecodeError;
pub use error::LayerError;
pub use error::Result;
pub use filter::filter_layer;
pub use index::LayerSet;
pub use model::Color;
pub use model::FileInfo;
pub use model::Kind;
pub use model::Layer;
pub use stats::layer_stats;
pub use storage::load_layer;
pub use storage::load_layer_strict;
pub use storage::save_layer;

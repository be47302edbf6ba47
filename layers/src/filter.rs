use crate::model::Layer;

/// Restricts a layer to the files whose name satisfies `keep`.
///
/// Returns a new layer: the legend is unchanged and surviving files keep
/// their original relative order. The input layer is never mutated.
pub fn filter_layer(layer: &Layer, mut keep: impl FnMut(&str) -> bool) -> Layer {
    Layer {
        files: layer
            .files
            .iter()
            .filter(|(file, _)| keep(file))
            .cloned()
            .collect(),
        kinds: layer.kinds.clone(),
    }
}

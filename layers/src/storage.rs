use crate::error::DecodeError;
use crate::error::LayerError;
use crate::error::Result;
use crate::model::Color;
use crate::model::FileInfo;
use crate::model::Kind;
use crate::model::Layer;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::MapAccess;
use serde::de::SeqAccess;
use serde::de::Visitor;
use serde_json::Value;
use serde_json::json;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Suffix selecting the structured text encoding; everything else gets the
/// compact encoding.
const STRUCTURED_SUFFIX: &str = "json";

/// Loads a layer, selecting the encoding by filename suffix. Extra fields
/// in the structured encoding are ignored.
pub fn load_layer(path: &Path) -> Result<Layer> {
    load_with_mode(path, false)
}

/// Like [`load_layer`], but an unrecognized field in the structured
/// encoding is a [`DecodeError::UnknownField`] instead of being ignored.
pub fn load_layer_strict(path: &Path) -> Result<Layer> {
    load_with_mode(path, true)
}

fn load_with_mode(path: &Path, strict: bool) -> Result<Layer> {
    if is_structured(path) {
        let text = fs::read_to_string(path)?;
        decode_structured(&text, strict).map_err(LayerError::Decode)
    } else {
        let bytes = fs::read(path)?;
        bincode::deserialize(&bytes).map_err(|err| LayerError::Decode(DecodeError::Compact(err)))
    }
}

/// Saves a layer under the encoding selected by the path's suffix. Total
/// for any well-formed layer; only storage faults make it fail. The write
/// is atomic: a temp sibling is written, synced, then renamed into place.
pub fn save_layer(layer: &Layer, path: &Path) -> Result<()> {
    let data = if is_structured(path) {
        encode_structured(layer)?.into_bytes()
    } else {
        bincode::serialize(layer)?
    };
    write_atomic(path, &data)
}

fn is_structured(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(STRUCTURED_SUFFIX)
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn encode_structured(layer: &Layer) -> Result<String> {
    let files: Vec<Value> = layer
        .files
        .iter()
        .map(|(file, info)| {
            let micro: Vec<Value> = info
                .micro_level
                .iter()
                .map(|(line, kind)| json!([line, kind]))
                .collect();
            let composition: Vec<Value> = info
                .macro_level
                .iter()
                .map(|(kind, fraction)| json!([kind, fraction]))
                .collect();
            json!([file, { "micro_level": micro, "macro_level": composition }])
        })
        .collect();
    let kinds: Vec<Value> = layer
        .kinds
        .iter()
        .map(|(kind, color)| json!([kind, color]))
        .collect();
    Ok(serde_json::to_string_pretty(
        &json!({ "files": files, "kinds": kinds }),
    )?)
}

/// JSON tree that, unlike `serde_json::Value`, keeps duplicate object keys.
/// Decoding works on this tree so a repeated field stays observable and can
/// be reported as its own error kind.
#[derive(Debug)]
enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<RawValue>),
    Object(Vec<(String, RawValue)>),
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct RawVisitor;

        impl<'de> Visitor<'de> for RawVisitor {
            type Value = RawValue;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("any JSON value")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<RawValue, E> {
                Ok(RawValue::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<RawValue, E> {
                Ok(RawValue::Number(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<RawValue, E> {
                Ok(RawValue::Number(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<RawValue, E> {
                Ok(RawValue::Number(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<RawValue, E> {
                Ok(RawValue::String(value.to_owned()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<RawValue, E> {
                Ok(RawValue::String(value))
            }

            fn visit_unit<E>(self) -> std::result::Result<RawValue, E> {
                Ok(RawValue::Null)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<RawValue, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(RawValue::Array(items))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<RawValue, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry::<String, RawValue>()? {
                    entries.push(entry);
                }
                Ok(RawValue::Object(entries))
            }
        }

        deserializer.deserialize_any(RawVisitor)
    }
}

fn decode_structured(text: &str, strict: bool) -> std::result::Result<Layer, DecodeError> {
    let raw: RawValue = serde_json::from_str(text)?;
    let entries = as_object(raw, "top-level value")?;

    let mut files_value = None;
    let mut kinds_value = None;
    for (key, value) in entries {
        match key.as_str() {
            "files" => set_once(&mut files_value, "files", value)?,
            "kinds" => set_once(&mut kinds_value, "kinds", value)?,
            _ if strict => return Err(DecodeError::UnknownField(key)),
            _ => {}
        }
    }
    let files_value = files_value.ok_or(DecodeError::MissingField("files"))?;
    let kinds_value = kinds_value.ok_or(DecodeError::MissingField("kinds"))?;

    Ok(Layer {
        files: decode_files(files_value, strict)?,
        kinds: decode_kinds(kinds_value)?,
    })
}

fn decode_files(
    value: RawValue,
    strict: bool,
) -> std::result::Result<Vec<(String, FileInfo)>, DecodeError> {
    let items = as_array(value, "`files`")?;
    let mut files = Vec::with_capacity(items.len());
    for item in items {
        let (name, info) = as_pair(item, "`files` entry")?;
        let name = as_string(name, "filename in `files`")?;
        files.push((name, decode_file_info(info, strict)?));
    }
    Ok(files)
}

fn decode_file_info(value: RawValue, strict: bool) -> std::result::Result<FileInfo, DecodeError> {
    let entries = as_object(value, "file info")?;

    let mut micro_value = None;
    let mut macro_value = None;
    for (key, entry) in entries {
        match key.as_str() {
            "micro_level" => set_once(&mut micro_value, "micro_level", entry)?,
            "macro_level" => set_once(&mut macro_value, "macro_level", entry)?,
            _ if strict => return Err(DecodeError::UnknownField(key)),
            _ => {}
        }
    }
    let micro_value = micro_value.ok_or(DecodeError::MissingField("micro_level"))?;
    let macro_value = macro_value.ok_or(DecodeError::MissingField("macro_level"))?;

    let mut micro_level = Vec::new();
    for item in as_array(micro_value, "`micro_level`")? {
        let (line, kind) = as_pair(item, "`micro_level` entry")?;
        micro_level.push((
            as_line(line, "line in `micro_level`")?,
            as_string(kind, "kind in `micro_level`")?,
        ));
    }

    let mut macro_level = Vec::new();
    for item in as_array(macro_value, "`macro_level`")? {
        let (kind, fraction) = as_pair(item, "`macro_level` entry")?;
        macro_level.push((
            as_string(kind, "kind in `macro_level`")?,
            as_number(fraction, "fraction in `macro_level`")?,
        ));
    }

    Ok(FileInfo {
        micro_level,
        macro_level,
    })
}

fn decode_kinds(value: RawValue) -> std::result::Result<IndexMap<Kind, Color>, DecodeError> {
    let items = as_array(value, "`kinds`")?;
    let mut kinds = IndexMap::with_capacity(items.len());
    for item in items {
        let (kind, color) = as_pair(item, "`kinds` entry")?;
        // A legend that declares the same kind twice keeps the later color.
        kinds.insert(
            as_string(kind, "kind in `kinds`")?,
            as_string(color, "color in `kinds`")?,
        );
    }
    Ok(kinds)
}

fn set_once(
    slot: &mut Option<RawValue>,
    name: &str,
    value: RawValue,
) -> std::result::Result<(), DecodeError> {
    if slot.is_some() {
        return Err(DecodeError::DuplicateField(name.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

fn as_object(
    value: RawValue,
    context: &'static str,
) -> std::result::Result<Vec<(String, RawValue)>, DecodeError> {
    match value {
        RawValue::Object(entries) => Ok(entries),
        _ => Err(mismatch(context, "an object")),
    }
}

fn as_array(
    value: RawValue,
    context: &'static str,
) -> std::result::Result<Vec<RawValue>, DecodeError> {
    match value {
        RawValue::Array(items) => Ok(items),
        _ => Err(mismatch(context, "an array")),
    }
}

fn as_pair(
    value: RawValue,
    context: &'static str,
) -> std::result::Result<(RawValue, RawValue), DecodeError> {
    let items = as_array(value, context)?;
    match <[RawValue; 2]>::try_from(items) {
        Ok([first, second]) => Ok((first, second)),
        Err(_) => Err(mismatch(context, "a two-element array")),
    }
}

fn as_string(value: RawValue, context: &'static str) -> std::result::Result<String, DecodeError> {
    match value {
        RawValue::String(text) => Ok(text),
        _ => Err(mismatch(context, "a string")),
    }
}

fn as_number(value: RawValue, context: &'static str) -> std::result::Result<f64, DecodeError> {
    match value {
        RawValue::Number(number) => Ok(number),
        _ => Err(mismatch(context, "a number")),
    }
}

fn as_line(value: RawValue, context: &'static str) -> std::result::Result<u32, DecodeError> {
    let number = as_number(value, context)?;
    if number.fract() != 0.0 || !(0.0..=u32::MAX as f64).contains(&number) {
        return Err(mismatch(context, "a non-negative integer"));
    }
    Ok(number as u32)
}

fn mismatch(context: &'static str, expected: &'static str) -> DecodeError {
    DecodeError::TypeMismatch { context, expected }
}

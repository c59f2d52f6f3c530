//! Parameter trees and their flattening into bracketed key paths.
//!
//! # Design
//! A `ParamTree` is an ordered map of keys to `ParamValue`s, which are
//! scalars, nulls, file references, positional lists or nested trees. Form
//! and multipart bodies cannot carry nesting, so `flatten` encodes it into
//! the key: `{a: {b: 1}}` becomes `a[b] = 1`, and list elements use their
//! index (`tags[0]`). Nulls and files never reach the flattened set; files
//! travel as attachments instead (see `scan_files`).

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::http::FileAttachment;

/// A leaf value that can be rendered into a form field.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Form-field rendering. Booleans become `1`/`0`.
    pub fn to_form_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(true) => f.write_str("1"),
            Scalar::Bool(false) => f.write_str("0"),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(n) => write!(f, "{n}"),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Int(n) => serializer.serialize_i64(*n),
            Scalar::Float(n) => serializer.serialize_f64(*n),
            Scalar::Str(s) => serializer.serialize_str(s),
        }
    }
}

/// Reference to a file on disk passed as a request parameter.
///
/// The dispatcher only reads the file; it never moves, truncates or deletes
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileParam {
    path: PathBuf,
    original_name: String,
}

impl FileParam {
    /// The original name defaults to the path's file name.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, original_name }
    }

    /// Overrides the file name reported to the upstream service.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = name.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// True when the file exists, is a regular file and opens for reading.
    pub fn is_valid(&self) -> bool {
        File::open(&self.path)
            .and_then(|f| f.metadata())
            .map(|m| m.is_file())
            .unwrap_or(false)
    }
}

/// A value in a parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Scalar(Scalar),
    File(FileParam),
    List(Vec<ParamValue>),
    Tree(ParamTree),
}

/// Ordered string-keyed parameters. Inserting an existing key replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamTree {
    entries: Vec<(String, ParamValue)>,
}

impl ParamTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty keys cannot form a key path and are dropped.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        let key = key.into();
        if key.is_empty() {
            tracing::warn!("dropping parameter with an empty key");
            return None;
        }
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Builder form of [`ParamTree::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON form of the tree as given. File values serialize as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamTree {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = ParamTree::new();
        for (k, v) in iter {
            tree.insert(k, v);
        }
        tree
    }
}

impl Serialize for ParamTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Null | ParamValue::File(_) => serializer.serialize_none(),
            ParamValue::Scalar(s) => s.serialize(serializer),
            ParamValue::Tree(t) => t.serialize(serializer),
            ParamValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<Scalar> for ParamValue {
    fn from(s: Scalar) -> Self {
        ParamValue::Scalar(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Scalar(Scalar::Str(s.to_string()))
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Scalar(Scalar::Str(s))
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Scalar(Scalar::Int(n))
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        ParamValue::Scalar(Scalar::Int(n.into()))
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        ParamValue::Scalar(Scalar::Int(n.into()))
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Scalar(Scalar::Float(n))
    }
}

impl From<FileParam> for ParamValue {
    fn from(f: FileParam) -> Self {
        ParamValue::File(f)
    }
}

impl From<ParamTree> for ParamValue {
    fn from(t: ParamTree) -> Self {
        ParamValue::Tree(t)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => b.into(),
            Value::Number(n) => match n.as_i64() {
                Some(i) => i.into(),
                None => n.as_f64().map_or(ParamValue::Null, ParamValue::from),
            },
            Value::String(s) => s.into(),
            Value::Array(items) => ParamValue::List(items.into_iter().map(ParamValue::from).collect()),
            Value::Object(map) => ParamValue::Tree(map.into_iter().collect()),
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for ParamTree {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// Flattened parameters: ordered `(key path, scalar)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatParams(Vec<(String, Scalar)>);

impl FlatParams {
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pairs ready for form, query or multipart text fields.
    pub fn to_form_pairs(&self) -> Vec<(String, String)> {
        self.0.iter().map(|(k, v)| (k.clone(), v.to_form_value())).collect()
    }
}

fn key_path(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        None => key.to_string(),
        Some(prefix) => format!("{prefix}[{key}]"),
    }
}

/// Flattens `tree` below `prefix` without dropping anything: null and file
/// leaves map to `None` under their key path.
pub fn flatten_entries(tree: &ParamTree, prefix: Option<&str>) -> Vec<(String, Option<Scalar>)> {
    let mut out = Vec::new();
    for (key, value) in tree.iter() {
        flatten_value(value, key_path(prefix, key), &mut out);
    }
    out
}

fn flatten_value(value: &ParamValue, path: String, out: &mut Vec<(String, Option<Scalar>)>) {
    match value {
        ParamValue::Tree(tree) => out.extend(flatten_entries(tree, Some(&path))),
        ParamValue::List(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(item, format!("{path}[{index}]"), out);
            }
        }
        ParamValue::Scalar(s) => out.push((path, Some(s.clone()))),
        ParamValue::Null | ParamValue::File(_) => out.push((path, None)),
    }
}

/// Flattens `tree` into bracketed key paths, dropping null and file leaves.
pub fn flatten(tree: &ParamTree) -> FlatParams {
    FlatParams(
        flatten_entries(tree, None)
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect(),
    )
}

/// Valid file parameters at the top level of `tree`, in insertion order.
/// Files nested in subtrees or lists are not attached.
pub fn scan_files(tree: &ParamTree) -> Vec<FileAttachment> {
    tree.iter()
        .filter_map(|(key, value)| match value {
            ParamValue::File(file) if file.is_valid() => Some(FileAttachment {
                key: key.to_string(),
                filename: file.original_name().to_string(),
                path: file.path().to_path_buf(),
            }),
            _ => None,
        })
        .collect()
}

/// Key paths of file parameters below the top level.
pub fn nested_file_paths(tree: &ParamTree) -> Vec<String> {
    let mut out = Vec::new();
    for (key, value) in tree.iter() {
        match value {
            ParamValue::Tree(_) | ParamValue::List(_) => collect_files(value, key.to_string(), &mut out),
            _ => {}
        }
    }
    out
}

fn collect_files(value: &ParamValue, path: String, out: &mut Vec<String>) {
    match value {
        ParamValue::File(_) => out.push(path),
        ParamValue::Tree(tree) => {
            for (key, child) in tree.iter() {
                collect_files(child, key_path(Some(&path), key), out);
            }
        }
        ParamValue::List(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_files(item, format!("{path}[{index}]"), out);
            }
        }
        ParamValue::Null | ParamValue::Scalar(_) => {}
    }
}

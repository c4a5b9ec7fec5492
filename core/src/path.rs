//! Reading and writing values inside nested structures by path expression.
//!
//! A path is a dot-separated list of components, each a field name with an
//! optional signed index: `Reservations[-1].Instances[0].InstanceId`. Field
//! names must match `[A-Z][A-Za-z0-9_]*`; a lowercase initial always fails.
//!
//! The collapsed operations ([`value_at_path`], [`values_at_path`],
//! [`set_value_at_path`]) never report errors: every failure becomes "absent"
//! or a skipped assignment, and the reason is emitted as a `tracing` debug
//! event. The `try_` variants return the [`PathError`] instead.

use crate::reflect::{Kind, Reflect};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Why a path could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// A component is empty (leading, trailing or doubled dot)
    #[error("path `{path}` has an empty component")]
    EmptyComponent {
        /// The full path expression
        path: String,
    },

    /// The component starts with a character other than an uppercase letter
    #[error("component `{component}` is not exported")]
    Unexported {
        /// The offending component
        component: String,
    },

    /// The component contains characters outside `[A-Za-z0-9_]`
    #[error("component `{component}` is not a valid field name")]
    InvalidFieldName {
        /// The offending component
        component: String,
    },

    /// Tried to look up a field on something that is not a struct
    #[error("cannot look up `{field}` on non-struct value of type {type_name}")]
    NotAStruct {
        /// The field being looked up
        field: String,
        /// Concrete type of the value
        type_name: &'static str,
    },

    /// The struct has no field with this name
    #[error("no field named `{field}`")]
    UnknownField {
        /// The missing field
        field: String,
    },

    /// The field exists but is not addressable by path
    #[error("field `{field}` is not accessible by path")]
    Inaccessible {
        /// The hidden field
        field: String,
    },

    /// Tried to index into something that is not a sequence
    #[error("cannot index `{field}`: not a sequence")]
    NotASequence {
        /// The field being indexed
        field: String,
    },

    /// The index is outside the sequence
    #[error("index {index} out of bounds for `{field}` of length {len}")]
    IndexOutOfBounds {
        /// The field being indexed
        field: String,
        /// The requested index, as written
        index: i64,
        /// Length of the sequence
        len: usize,
    },

    /// A nullable reference along the path is unset
    #[error("`{field}` is unset")]
    NilValue {
        /// The unset field, or `<root>`
        field: String,
    },

    /// The value to assign does not match the target type
    #[error("cannot assign to `{path}`: expected {expected}")]
    TypeMismatch {
        /// The full path expression
        path: String,
        /// Concrete type of the target
        expected: &'static str,
    },
}

/// One parsed path component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Field name
    pub name: String,
    /// Optional signed index into the field's sequence
    pub index: Option<i64>,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{index}]", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    raw: String,
    components: Vec<Component>,
}

impl PathExpr {
    /// Parse a path expression.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::EmptyComponent`], [`PathError::Unexported`] or
    /// [`PathError::InvalidFieldName`] for syntactically unusable paths.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let components = path
            .split('.')
            .map(|raw| parse_component(path, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: path.to_string(),
            components,
        })
    }

    /// Parsed components, in order
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// The expression as written
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for PathExpr {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_component(path: &str, raw: &str) -> Result<Component, PathError> {
    let Some(first) = raw.chars().next() else {
        return Err(PathError::EmptyComponent {
            path: path.to_string(),
        });
    };
    if !first.is_ascii_uppercase() {
        return Err(PathError::Unexported {
            component: raw.to_string(),
        });
    }

    let (name, index) = split_index(raw);
    let index = match index {
        Some(digits) => Some(digits.parse::<i64>().map_err(|_| PathError::InvalidFieldName {
            component: raw.to_string(),
        })?),
        None => None,
    };

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(PathError::InvalidFieldName {
            component: raw.to_string(),
        });
    }

    Ok(Component {
        name: name.to_string(),
        index,
    })
}

/// Split `Name[-12]` into `("Name", Some("-12"))`. Anything that is not a
/// well-formed trailing index is left in the name.
fn split_index(raw: &str) -> (&str, Option<&str>) {
    let Some(body) = raw.strip_suffix(']') else {
        return (raw, None);
    };
    let Some(open) = body.rfind('[') else {
        return (raw, None);
    };
    let (name, digits) = (&body[..open], &body[open + 1..]);
    let unsigned = digits.strip_prefix('-').unwrap_or(digits);
    if name.is_empty() || unsigned.is_empty() || !unsigned.chars().all(|c| c.is_ascii_digit()) {
        return (raw, None);
    }
    (name, Some(digits))
}

/// Resolve a possibly negative index against a sequence length.
fn resolve_index(component: &Component, index: i64, len: usize) -> Result<usize, PathError> {
    let out_of_bounds = || PathError::IndexOutOfBounds {
        field: component.name.clone(),
        index,
        len,
    };
    let len_signed = i64::try_from(len).map_err(|_| out_of_bounds())?;
    let resolved = if index < 0 { len_signed + index } else { index };
    if resolved < 0 || resolved >= len_signed {
        return Err(out_of_bounds());
    }
    usize::try_from(resolved).map_err(|_| out_of_bounds())
}

/// Follow nullable references down to a concrete value.
fn deref_optional<'a>(mut value: &'a dyn Reflect, field: &str) -> Result<&'a dyn Reflect, PathError> {
    while let Some(optional) = value.as_optional() {
        value = optional.get().ok_or_else(|| PathError::NilValue {
            field: field.to_string(),
        })?;
    }
    Ok(value)
}

/// Follow nullable references, allocating zero values for unset ones.
fn deref_optional_mut<'a>(
    mut value: &'a mut dyn Reflect,
    field: &str,
) -> Result<&'a mut dyn Reflect, PathError> {
    while value.kind() == Kind::Optional {
        value = match value.as_optional_mut() {
            Some(optional) => optional.get_or_insert_default(),
            None => {
                return Err(PathError::NilValue {
                    field: field.to_string(),
                });
            }
        };
    }
    Ok(value)
}

fn resolve<'a>(root: &'a dyn Reflect, path: &PathExpr) -> Result<&'a dyn Reflect, PathError> {
    let mut current = deref_optional(root, "<root>")?;

    for component in path.components() {
        let record = current.as_struct().ok_or_else(|| PathError::NotAStruct {
            field: component.name.clone(),
            type_name: current.type_name(),
        })?;

        let info = record
            .field_info(&component.name)
            .ok_or_else(|| PathError::UnknownField {
                field: component.name.clone(),
            })?;
        if !info.is_public() {
            return Err(PathError::Inaccessible {
                field: component.name.clone(),
            });
        }
        let field = record
            .field(&component.name)
            .ok_or_else(|| PathError::UnknownField {
                field: component.name.clone(),
            })?;
        current = deref_optional(field, &component.name)?;

        if let Some(index) = component.index {
            let sequence = current.as_sequence().ok_or_else(|| PathError::NotASequence {
                field: component.name.clone(),
            })?;
            let position = resolve_index(component, index, sequence.len())?;
            let element = sequence
                .element(position)
                .ok_or_else(|| PathError::IndexOutOfBounds {
                    field: component.name.clone(),
                    index,
                    len: sequence.len(),
                })?;
            current = deref_optional(element, &component.name)?;
        }
    }

    Ok(current)
}

// Each fallible step checks kind() before borrowing mutably, so an error
// return never needs `current` again after a failed downcast.
fn resolve_mut<'a>(root: &'a mut dyn Reflect, path: &PathExpr) -> Result<&'a mut dyn Reflect, PathError> {
    let mut current = deref_optional_mut(root, "<root>")?;

    for component in path.components() {
        if current.kind() != Kind::Struct {
            return Err(PathError::NotAStruct {
                field: component.name.clone(),
                type_name: current.type_name(),
            });
        }
        let record = current.as_struct_mut().ok_or_else(|| PathError::NotAStruct {
            field: component.name.clone(),
            type_name: "<unknown>",
        })?;

        match record.field_info(&component.name) {
            None => {
                return Err(PathError::UnknownField {
                    field: component.name.clone(),
                });
            }
            Some(info) if !info.is_public() => {
                return Err(PathError::Inaccessible {
                    field: component.name.clone(),
                });
            }
            Some(_) => {}
        }
        let field = record
            .field_mut(&component.name)
            .ok_or_else(|| PathError::UnknownField {
                field: component.name.clone(),
            })?;
        current = deref_optional_mut(field, &component.name)?;

        if let Some(index) = component.index {
            if current.kind() != Kind::Sequence {
                return Err(PathError::NotASequence {
                    field: component.name.clone(),
                });
            }
            let sequence = current.as_sequence_mut().ok_or_else(|| PathError::NotASequence {
                field: component.name.clone(),
            })?;
            // Sequences are never grown: out-of-bounds fails like a read.
            let len = sequence.len();
            let position = resolve_index(component, index, len)?;
            let element = sequence
                .element_mut(position)
                .ok_or_else(|| PathError::IndexOutOfBounds {
                    field: component.name.clone(),
                    index,
                    len,
                })?;
            current = deref_optional_mut(element, &component.name)?;
        }
    }

    Ok(current)
}

/// Resolve `path` inside `root`, reporting why resolution failed.
///
/// # Errors
///
/// Returns the first [`PathError`] encountered while parsing or walking.
pub fn try_value_at_path<'a>(root: &'a dyn Reflect, path: &str) -> Result<&'a dyn Reflect, PathError> {
    let expr = PathExpr::parse(path)?;
    resolve(root, &expr)
}

/// Value at `path` inside `root`, or `None` if the path does not resolve.
#[must_use]
pub fn value_at_path<'a>(root: &'a dyn Reflect, path: &str) -> Option<&'a dyn Reflect> {
    match try_value_at_path(root, path) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::debug!(path, %error, "path resolved to absent");
            None
        }
    }
}

/// Typed read: the value at `path` if it resolves and is a `T`.
#[must_use]
pub fn value_at_path_as<'a, T: Reflect>(root: &'a dyn Reflect, path: &str) -> Option<&'a T> {
    value_at_path(root, path).and_then(|value| value.as_any().downcast_ref::<T>())
}

/// Values at `path` inside `root` as a sequence.
///
/// A terminal sequence yields its set elements in order; any other terminal
/// value yields a one-element sequence. Returns `None` when the path does
/// not resolve.
#[must_use]
pub fn values_at_path<'a>(root: &'a dyn Reflect, path: &str) -> Option<Vec<&'a dyn Reflect>> {
    let value = value_at_path(root, path)?;
    let Some(sequence) = value.as_sequence() else {
        return Some(vec![value]);
    };

    let values = (0..sequence.len())
        .filter_map(|index| sequence.element(index))
        .filter_map(|element| deref_optional(element, path).ok())
        .collect();
    Some(values)
}

/// Assign `value` at `path`, allocating unset nullable references on the way.
///
/// # Errors
///
/// Returns the first [`PathError`] encountered. `root` is left as it was
/// then, including any nullable references that were allocated on the way.
pub fn try_set_value_at_path(
    root: &mut dyn Reflect,
    path: &str,
    value: Box<dyn Reflect>,
) -> Result<(), PathError> {
    let expr = PathExpr::parse(path)?;

    // Every reference on the path is already set, so nothing gets allocated.
    if resolve(root, &expr).is_ok() {
        return assign_at(root, &expr, path, value);
    }

    let snapshot = root.clone_value();
    let result = assign_at(root, &expr, path, value);
    if result.is_err() && root.set(snapshot).is_err() {
        tracing::warn!(path, "could not restore value after failed assignment");
    }
    result
}

fn assign_at(
    root: &mut dyn Reflect,
    expr: &PathExpr,
    path: &str,
    value: Box<dyn Reflect>,
) -> Result<(), PathError> {
    let target = resolve_mut(root, expr)?;
    target.set(value).map_err(|_| PathError::TypeMismatch {
        path: path.to_string(),
        expected: target.type_name(),
    })
}

/// Assign `value` at `path`; silently does nothing if the path does not resolve.
pub fn set_value_at_path(root: &mut dyn Reflect, path: &str, value: Box<dyn Reflect>) {
    if let Err(error) = try_set_value_at_path(root, path, value) {
        tracing::debug!(path, %error, "assignment skipped");
    }
}

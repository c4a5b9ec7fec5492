//! Structural reflection used by the path accessor.
//!
//! Rust has no run-time field lookup, so every type that should be reachable
//! by a path expression describes itself through [`Reflect`]. Structs expose a
//! static accessor table ([`Struct::fields`]) plus name-based slot lookup,
//! `Vec<T>` is a [`Sequence`], `Option<T>` is an [`Optional`] reference and
//! everything else is an opaque scalar leaf.
//!
//! Structs normally get their implementation from `#[derive(Reflect)]` in the
//! `reqchain-macros` crate. A hand-written implementation looks like this:
//!
//! ```
//! use reqchain_core::reflect::{assign, Access, FieldInfo, Kind, Reflect, Struct};
//! use std::any::Any;
//!
//! #[derive(Clone, Debug, Default)]
//! struct Page {
//!     next_token: Option<String>,
//! }
//!
//! impl Reflect for Page {
//!     fn kind(&self) -> Kind { Kind::Struct }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//!     fn into_any(self: Box<Self>) -> Box<dyn Any> { self }
//!     fn clone_value(&self) -> Box<dyn Reflect> { Box::new(self.clone()) }
//!     fn set(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
//!         assign(self, value)
//!     }
//!     fn as_struct(&self) -> Option<&dyn Struct> { Some(self) }
//!     fn as_struct_mut(&mut self) -> Option<&mut dyn Struct> { Some(self) }
//! }
//!
//! impl Struct for Page {
//!     fn fields(&self) -> &'static [FieldInfo] {
//!         const FIELDS: &[FieldInfo] = &[FieldInfo::new("NextToken", Access::Public, false)];
//!         FIELDS
//!     }
//!     fn field(&self, name: &str) -> Option<&dyn Reflect> {
//!         match name {
//!             "NextToken" => Some(&self.next_token),
//!             _ => None,
//!         }
//!     }
//!     fn field_mut(&mut self, name: &str) -> Option<&mut dyn Reflect> {
//!         match name {
//!             "NextToken" => Some(&mut self.next_token),
//!             _ => None,
//!         }
//!     }
//! }
//! ```

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;

/// Structural category of a reflected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Record with named fields
    Struct,
    /// Contiguous ordered sequence
    Sequence,
    /// Nullable reference to another value
    Optional,
    /// Opaque leaf value
    Scalar,
}

/// Whether a field may be reached through a path expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Addressable by path
    Public,
    /// Listed for completeness but never addressable
    Hidden,
}

/// One entry of a struct's accessor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Name used in path expressions
    pub name: &'static str,
    /// Access control for path traversal
    pub access: Access,
    /// Whether parameter validation requires a value
    pub required: bool,
}

impl FieldInfo {
    /// Create a new accessor table entry.
    #[must_use]
    pub const fn new(name: &'static str, access: Access, required: bool) -> Self {
        Self {
            name,
            access,
            required,
        }
    }

    /// Returns true if the field may be reached by path.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        matches!(self.access, Access::Public)
    }
}

/// Object-safe view of a value's structure.
pub trait Reflect: Any + Debug + Send {
    /// Structural category of this value
    fn kind(&self) -> Kind;

    /// Upcast for downcasting to a concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to a concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Owned upcast for downcasting to a concrete type
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Deep copy behind a fresh box
    fn clone_value(&self) -> Box<dyn Reflect>;

    /// Replace this value with `value`.
    ///
    /// # Errors
    ///
    /// Hands `value` back unchanged when its concrete type does not match.
    fn set(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>;

    /// Name of the concrete type, for diagnostics
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Struct view, if this is a struct
    fn as_struct(&self) -> Option<&dyn Struct> {
        None
    }

    /// Mutable struct view, if this is a struct
    fn as_struct_mut(&mut self) -> Option<&mut dyn Struct> {
        None
    }

    /// Sequence view, if this is a sequence
    fn as_sequence(&self) -> Option<&dyn Sequence> {
        None
    }

    /// Mutable sequence view, if this is a sequence
    fn as_sequence_mut(&mut self) -> Option<&mut dyn Sequence> {
        None
    }

    /// Optional view, if this is a nullable reference
    fn as_optional(&self) -> Option<&dyn Optional> {
        None
    }

    /// Mutable optional view, if this is a nullable reference
    fn as_optional_mut(&mut self) -> Option<&mut dyn Optional> {
        None
    }
}

/// Record with named, individually addressable fields.
pub trait Struct {
    /// Accessor table, in declaration order
    fn fields(&self) -> &'static [FieldInfo];

    /// Field slot by path name. Hidden fields are never returned.
    fn field(&self, name: &str) -> Option<&dyn Reflect>;

    /// Mutable field slot by path name. Hidden fields are never returned.
    fn field_mut(&mut self, name: &str) -> Option<&mut dyn Reflect>;

    /// Accessor table entry by path name
    fn field_info(&self, name: &str) -> Option<&'static FieldInfo> {
        self.fields().iter().find(|info| info.name == name)
    }
}

/// Contiguous ordered sequence.
pub trait Sequence {
    /// Number of elements
    fn len(&self) -> usize;

    /// Element slot at `index`
    fn element(&self, index: usize) -> Option<&dyn Reflect>;

    /// Mutable element slot at `index`
    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;

    /// Returns true if the sequence has no elements
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Nullable reference to another value.
pub trait Optional {
    /// The referenced value, if set
    fn get(&self) -> Option<&dyn Reflect>;

    /// The referenced value, if set
    fn get_mut(&mut self) -> Option<&mut dyn Reflect>;

    /// The referenced value, allocating a zero value first when unset
    fn get_or_insert_default(&mut self) -> &mut dyn Reflect;
}

/// Type-checked assignment shared by all implementations of [`Reflect::set`].
///
/// # Errors
///
/// Returns `value` unchanged if it is not a `T`.
pub fn assign<T: Reflect>(target: &mut T, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
    if !value.as_any().is::<T>() {
        return Err(value);
    }
    if let Ok(value) = value.into_any().downcast::<T>() {
        *target = *value;
    }
    Ok(())
}

macro_rules! impl_reflect_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn kind(&self) -> Kind {
                    Kind::Scalar
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn Any {
                    self
                }

                fn into_any(self: Box<Self>) -> Box<dyn Any> {
                    self
                }

                fn clone_value(&self) -> Box<dyn Reflect> {
                    Box::new(self.clone())
                }

                fn set(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
                    assign(self, value)
                }
            }
        )*
    };
}

impl_reflect_scalar!(
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    (),
    chrono::DateTime<chrono::Utc>,
    serde_json::Value,
);

// Maps are opaque leaves: paths cannot index into them, but they can be read
// and written whole (e.g. a composite pagination key).
impl<V> Reflect for HashMap<String, V>
where
    V: Clone + Debug + Send + 'static,
{
    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_value(&self) -> Box<dyn Reflect> {
        Box::new(self.clone())
    }

    fn set(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        assign(self, value)
    }
}

impl<V> Reflect for BTreeMap<String, V>
where
    V: Clone + Debug + Send + 'static,
{
    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_value(&self) -> Box<dyn Reflect> {
        Box::new(self.clone())
    }

    fn set(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        assign(self, value)
    }
}

impl<T> Reflect for Option<T>
where
    T: Reflect + Clone + Default,
{
    fn kind(&self) -> Kind {
        Kind::Optional
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_value(&self) -> Box<dyn Reflect> {
        Box::new(self.clone())
    }

    /// Accepts either another `Option<T>` or a bare `T`.
    fn set(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        if value.as_any().is::<T>() {
            if let Ok(value) = value.into_any().downcast::<T>() {
                *self = Some(*value);
            }
            return Ok(());
        }
        assign(self, value)
    }

    fn as_optional(&self) -> Option<&dyn Optional> {
        Some(self)
    }

    fn as_optional_mut(&mut self) -> Option<&mut dyn Optional> {
        Some(self)
    }
}

impl<T> Optional for Option<T>
where
    T: Reflect + Clone + Default,
{
    fn get(&self) -> Option<&dyn Reflect> {
        self.as_ref().map(|value| value as &dyn Reflect)
    }

    fn get_mut(&mut self) -> Option<&mut dyn Reflect> {
        self.as_mut().map(|value| value as &mut dyn Reflect)
    }

    fn get_or_insert_default(&mut self) -> &mut dyn Reflect {
        self.get_or_insert_with(T::default)
    }
}

impl<T> Reflect for Vec<T>
where
    T: Reflect + Clone,
{
    fn kind(&self) -> Kind {
        Kind::Sequence
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_value(&self) -> Box<dyn Reflect> {
        Box::new(self.clone())
    }

    fn set(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        assign(self, value)
    }

    fn as_sequence(&self) -> Option<&dyn Sequence> {
        Some(self)
    }

    fn as_sequence_mut(&mut self) -> Option<&mut dyn Sequence> {
        Some(self)
    }
}

impl<T> Sequence for Vec<T>
where
    T: Reflect + Clone,
{
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn element(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|value| value as &dyn Reflect)
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Reflect> {
        self.get_mut(index).map(|value| value as &mut dyn Reflect)
    }
}

// Boxes exist for recursive shapes only; they are invisible to reflection.
impl<T> Reflect for Box<T>
where
    T: Reflect + Clone,
{
    fn kind(&self) -> Kind {
        (**self).kind()
    }

    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        (**self).as_any_mut()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        <T as Reflect>::into_any(*self)
    }

    fn clone_value(&self) -> Box<dyn Reflect> {
        (**self).clone_value()
    }

    fn set(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        (**self).set(value)
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }

    fn as_struct(&self) -> Option<&dyn Struct> {
        (**self).as_struct()
    }

    fn as_struct_mut(&mut self) -> Option<&mut dyn Struct> {
        (**self).as_struct_mut()
    }

    fn as_sequence(&self) -> Option<&dyn Sequence> {
        (**self).as_sequence()
    }

    fn as_sequence_mut(&mut self) -> Option<&mut dyn Sequence> {
        (**self).as_sequence_mut()
    }

    fn as_optional(&self) -> Option<&dyn Optional> {
        (**self).as_optional()
    }

    fn as_optional_mut(&mut self) -> Option<&mut dyn Optional> {
        (**self).as_optional_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_assign_matches_type() {
        let mut value = String::from("old");
        assert!(value.set(Box::new(String::from("new"))).is_ok());
        assert_eq!(value, "new");
    }

    #[test]
    fn test_scalar_assign_rejects_other_type() {
        let mut value = 7_i64;
        let rejected = value.set(Box::new(String::from("seven")));
        assert!(rejected.is_err());
        assert_eq!(value, 7);
    }

    #[test]
    fn test_option_accepts_bare_value() {
        let mut value: Option<String> = None;
        assert!(value.set(Box::new(String::from("token"))).is_ok());
        assert_eq!(value.as_deref(), Some("token"));

        assert!(value.set(Box::new(None::<String>)).is_ok());
        assert_eq!(value, None);
    }

    #[test]
    fn test_option_get_or_insert_default() {
        let mut value: Option<u32> = None;
        let slot = Optional::get_or_insert_default(&mut value);
        assert_eq!(slot.kind(), Kind::Scalar);
        assert_eq!(value, Some(0));
    }

    #[test]
    fn test_vec_is_sequence() {
        let value = vec![1_u8, 2, 3];
        let len = value.as_sequence().map(|sequence| sequence.len());
        assert_eq!(len, Some(3));
        assert!(value.element(3).is_none());
    }

    #[test]
    fn test_box_is_transparent() {
        let mut value = Box::new(5_i32);
        assert_eq!(value.kind(), Kind::Scalar);
        assert!(value.as_any().is::<i32>());
        assert!(value.set(Box::new(9_i32)).is_ok());
        assert_eq!(*value, 9);
    }

    #[test]
    fn test_map_is_opaque_leaf() {
        let mut key = HashMap::new();
        key.insert("Id".to_string(), "42".to_string());
        assert_eq!(key.kind(), Kind::Scalar);
        let copy = key.clone_value();
        assert_eq!(copy.as_any().downcast_ref::<HashMap<String, String>>(), Some(&key));
    }
}

//! Type-erased input parameters and output data carried by a request.

use crate::reflect::Reflect;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A reflectable, serializable structure usable as request Params or Data.
///
/// Implemented automatically for every type that is
/// `Reflect + Clone + Default + Serialize + DeserializeOwned`.
pub trait Payload: Reflect {
    /// View as a reflectable value
    fn as_reflect(&self) -> &dyn Reflect;

    /// Mutable view as a reflectable value
    fn as_reflect_mut(&mut self) -> &mut dyn Reflect;

    /// A zero value of the same concrete type
    fn fresh(&self) -> Box<dyn Payload>;

    /// Deep copy behind a fresh box
    fn clone_payload(&self) -> Box<dyn Payload>;

    /// Serialize to a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error.
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;

    /// Replace this value with one decoded from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the deserializer's error; the value is unchanged then.
    fn load_json(&mut self, value: serde_json::Value) -> serde_json::Result<()>;
}

impl<T> Payload for T
where
    T: Reflect + Clone + Default + Serialize + DeserializeOwned,
{
    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        self
    }

    fn fresh(&self) -> Box<dyn Payload> {
        Box::new(T::default())
    }

    fn clone_payload(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn load_json(&mut self, value: serde_json::Value) -> serde_json::Result<()> {
        *self = serde_json::from_value(value)?;
        Ok(())
    }
}

impl Clone for Box<dyn Payload> {
    fn clone(&self) -> Self {
        self.clone_payload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_fresh_is_zero_value_of_same_type() {
        let mut value: BTreeMap<String, u32> = BTreeMap::new();
        value.insert("a".to_string(), 1);
        let fresh = value.fresh();
        let fresh = fresh.as_any().downcast_ref::<BTreeMap<String, u32>>();
        assert_eq!(fresh, Some(&BTreeMap::new()));
    }

    #[test]
    fn test_json_round_trip_through_erased_payload() {
        let mut payload: Box<dyn Payload> = Box::new(Vec::<String>::new());
        payload
            .load_json(serde_json::json!(["x", "y"]))
            .unwrap();
        assert_eq!(payload.to_json().unwrap(), serde_json::json!(["x", "y"]));
        let cloned = payload.clone();
        assert_eq!(
            cloned.as_any().downcast_ref::<Vec<String>>(),
            Some(&vec!["x".to_string(), "y".to_string()])
        );
    }
}

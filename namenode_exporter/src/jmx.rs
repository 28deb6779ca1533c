//! Decoding of the JMX servlet status document.
//!
//! The servlet answers with `{"beans": [ {...}, ... ]}` where every bean is
//! an object of attributes, one of which is `name`. Beans are kept untyped
//! here; picking fields out of them is the business of the translator.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Errors produced when decoding a status document.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The body was not JSON, or lacked a `beans` array of objects.
    #[error("Failed to decode JMX envelope: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A single bean: attribute name to untyped value.
pub type Bean = Map<String, Value>;

/// The decoded form of one fetch.
#[derive(Debug, Deserialize, PartialEq)]
pub struct Envelope {
    /// Beans in the order the servlet listed them.
    pub beans: Vec<Bean>,
}

impl Envelope {
    /// Decode an envelope from raw response bytes.
    ///
    /// # Errors
    ///
    /// Function will return an error if the bytes are not a JSON object with
    /// a `beans` array whose members are all objects.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The dispatch key of a bean, if it has a string `name`.
#[must_use]
pub fn bean_name(bean: &Bean) -> Option<&str> {
    bean.get("name").and_then(Value::as_str)
}

/// Short description of a JSON value's type, for diagnostics.
#[must_use]
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_beans_in_order() {
        let body = br#"{"beans":[{"name":"a","X":1},{"name":"b","Y":"z"}]}"#;
        let envelope = Envelope::from_slice(body).expect("envelope should decode");

        let names: Vec<_> = envelope.beans.iter().filter_map(bean_name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(envelope.beans[0].get("X"), Some(&Value::from(1)));
    }

    #[test]
    fn empty_bean_list_decodes() {
        let envelope = Envelope::from_slice(br#"{"beans":[]}"#).expect("envelope should decode");
        assert!(envelope.beans.is_empty());
    }

    #[test]
    fn missing_beans_is_an_error() {
        assert!(Envelope::from_slice(br#"{"other":[]}"#).is_err());
    }

    #[test]
    fn null_beans_is_an_error() {
        assert!(Envelope::from_slice(br#"{"beans":null}"#).is_err());
    }

    #[test]
    fn non_object_bean_is_an_error() {
        assert!(Envelope::from_slice(br#"{"beans":[1, 2]}"#).is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(Envelope::from_slice(b"{\"beans\": [").is_err());
        assert!(Envelope::from_slice(b"<html>nope</html>").is_err());
    }

    #[test]
    fn bean_without_string_name_has_no_dispatch_key() {
        let envelope = Envelope::from_slice(br#"{"beans":[{"Uptime":1},{"name":7}]}"#)
            .expect("envelope should decode");
        assert!(envelope.beans.iter().all(|bean| bean_name(bean).is_none()));
    }
}

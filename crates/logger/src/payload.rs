//! Rendering payload objects into log text
//!
//! Payloads go through `serde_json` (pretty printed). A payload that cannot
//! be serialized never stops the message from being logged: the failure is
//! rendered inline behind [`SERIALIZATION_ERROR_MARKER`].

use serde::Serialize;
use std::fmt::{Display, Write};
use tracing::debug;

/// Prefix of the text substituted for a payload that failed to serialize
pub const SERIALIZATION_ERROR_MARKER: &str =
    "Unexpected Problems appeared while trying to serialize object: ";

/// Separator between a map key and its rendered value
pub const MAP_KEY_SEPARATOR: &str = " : ";

/// Anything that can be attached to a log line as text.
///
/// Every `serde::Serialize` type gets this through [`serialize`]. Types
/// without serde support implement it directly.
pub trait Serializable {
    /// Render `self` for the `Object:` section of a line
    fn render_text(&self) -> String;
}

impl<T: Serialize + ?Sized> Serializable for T {
    fn render_text(&self) -> String {
        serialize(self)
    }
}

/// Render one value
pub fn serialize<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(text) => text,
        Err(e) => {
            debug!("payload serialization failed: {e}");
            format!("{SERIALIZATION_ERROR_MARKER}{e}")
        }
    }
}

/// Render each value on its own line
pub fn serialize_many<I>(values: I) -> String
where
    I: IntoIterator,
    I::Item: Serializable,
{
    let mut out = String::new();
    for value in values {
        out.push_str(&value.render_text());
        out.push('\n');
    }
    out
}

/// Render `key : value` pairs, one per line
pub fn serialize_map<I, K, V>(entries: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Serializable,
{
    let mut out = String::new();
    for (key, value) in entries {
        let _ = writeln!(out, "{key}{MAP_KEY_SEPARATOR}{}", value.render_text());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::{Error as _, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Sample {
        id: u32,
        name: &'static str,
    }

    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot render Broken"))
        }
    }

    #[test]
    fn test_serialize_struct() {
        let text = serialize(&Sample { id: 42, name: "answer" });
        assert!(text.contains("\"id\": 42"));
        assert!(text.contains("\"name\": \"answer\""));
    }

    #[test]
    fn test_failure_becomes_marker() {
        let text = serialize(&Broken);
        assert!(text.starts_with(SERIALIZATION_ERROR_MARKER));
        assert!(text.contains("cannot render Broken"));
    }

    #[test]
    fn test_serialize_many() {
        let text = serialize_many([1, 2, 3]);
        assert_eq!(text, "1\n2\n3\n");
    }

    #[test]
    fn test_serialize_map() {
        let mut map = BTreeMap::new();
        map.insert("Key1", 10);
        map.insert("Key2", 20);
        assert_eq!(serialize_map(map), "Key1 : 10\nKey2 : 20\n");
    }

    struct Hex(u32);

    impl Serializable for Hex {
        fn render_text(&self) -> String {
            format!("{:#x}", self.0)
        }
    }

    #[test]
    fn test_custom_serializable_in_collections() {
        assert_eq!(serialize_many([Hex(255), Hex(16)]), "0xff\n0x10\n");
        assert_eq!(serialize_map([("mask", Hex(15))]), "mask : 0xf\n");
    }

    #[test]
    fn test_trait_is_available_on_serialize_types() {
        assert_eq!(vec!["a", "b"].render_text(), serialize(&vec!["a", "b"]));
        assert_eq!("plain".render_text(), "\"plain\"");
    }
}

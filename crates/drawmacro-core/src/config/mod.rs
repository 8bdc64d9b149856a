use serde_json::{Map, Value, json};

/// JSON-backed configuration addressed with dotted paths (`macro.width`, `envelope.host`, ...).
///
/// Reads never fail: a missing or mistyped key yields `None`, and option builders fall back to
/// their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecConfig(Value);

impl Default for CodecConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl CodecConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// The built-in defaults for every recognized key.
    pub fn defaults() -> Self {
        Self(json!({
            "envelope": {
                "host": "Confluence",
                "agent": concat!("drawmacro/", env!("CARGO_PKG_VERSION")),
            },
            "encode": {
                "danglingReferences": "reject",
            },
            "decode": {
                "suppressErrors": true,
            },
            "macro": {
                "kind": "drawio",
                "contentType": "application/vnd.jgraph.mxfile",
                "width": "100%",
                "height": "auto",
                "simpleViewer": false,
                "zoom": 1,
                "border": 1,
            },
        }))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Parses a JSON document and merges it over [`CodecConfig::defaults`].
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        let overrides: Value = serde_json::from_str(text)?;
        let mut config = Self::defaults();
        config.deep_merge(&overrides);
        Ok(config)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn lookup(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.lookup(dotted_path)?.as_str()
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.lookup(dotted_path)?.as_bool()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        self.lookup(dotted_path)?.as_f64()
    }

    pub fn get_i64(&self, dotted_path: &str) -> Option<i64> {
        self.lookup(dotted_path)?.as_i64()
    }

    /// Sets one key, creating intermediate tables along `dotted_path` and replacing any
    /// non-object value in the way. An object `value` is merged into an existing table.
    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        let nested = dotted_path.rsplit('.').fold(value, |inner, segment| {
            let mut table = Map::new();
            table.insert(segment.to_string(), inner);
            Value::Object(table)
        });
        self.deep_merge(&nested);
    }

    /// Merges `other` over this config: tables merge key by key, anything else replaces.
    pub fn deep_merge(&mut self, other: &Value) {
        merge_into(&mut self.0, other);
    }
}

fn merge_into(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(table), Value::Object(incoming)) => {
            for (key, value) in incoming {
                merge_into(table.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

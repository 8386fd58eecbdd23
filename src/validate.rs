// src/validate.rs

//! Value validators.
//!
//! A validator looks at a single value and returns an error message when
//! the value is not acceptable. The same validator runs for inputs before
//! execution and for outputs after they were produced.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::types::{Value, XmlSchema};

type CheckFn = dyn Fn(&Value) -> Option<String> + Send + Sync;

#[derive(Clone)]
pub enum Validator {
    /// Literal must equal one of the listed values.
    AllowedValues(Vec<Value>),
    /// XML document must declare the family's namespace.
    Schema(XmlSchema),
    Custom(Arc<CheckFn>),
}

impl Validator {
    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Validator::Custom(Arc::new(check))
    }

    /// Returns `Some(message)` if the value is rejected.
    pub fn validate(&self, value: &Value) -> Option<String> {
        match self {
            Validator::AllowedValues(allowed) => {
                if allowed.contains(value) {
                    None
                } else {
                    Some("Input is none of the allowed values".to_string())
                }
            }
            Validator::Schema(schema) => check_schema(*schema, value),
            Validator::Custom(check) => check(value),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::AllowedValues(values) => {
                f.debug_tuple("AllowedValues").field(values).finish()
            }
            Validator::Schema(schema) => f.debug_tuple("Schema").field(schema).finish(),
            Validator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

static XMLNS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"xmlns(?::[\w.\-]+)?\s*=\s*["']([^"']*)["']"#).expect("valid regex")
});

fn check_schema(schema: XmlSchema, value: &Value) -> Option<String> {
    let Value::Xml(doc) = value else {
        return Some(format!("expected an XML document, got {}", value.kind()));
    };

    let text = doc.text.trim_start_matches('\u{feff}').trim_start();
    if !text.starts_with('<') {
        return Some("content is not an XML document".to_string());
    }

    let Some(prefix) = schema.namespace_prefix() else {
        return None;
    };

    let declared = XMLNS_ATTR
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .any(|ns| ns.as_str().starts_with(prefix));

    if declared {
        None
    } else {
        Some(format!("document does not declare the {prefix} namespace"))
    }
}

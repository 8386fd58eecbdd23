// src/convert/cmdline.rs

//! Command-line token conversion.

use crate::convert::ConversionError;
use crate::types::{Value, ValueKind};

/// How an input value is rendered into command-line tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLineArgument {
    /// `[flag] value` for integers, doubles and strings.
    Literal { flag: Option<String> },
    /// Bare `flag`, present only when the value is `true`.
    BooleanFlag { flag: String },
    /// `lonmin lonmax latmin latmax`.
    BoundingBox,
}

impl CommandLineArgument {
    pub fn tokens(&self, value: &Value) -> Result<Vec<String>, ConversionError> {
        match (self, value) {
            (CommandLineArgument::Literal { flag }, literal) if literal.kind().is_literal() => {
                let Some(text) = literal.literal_text() else {
                    return Err(ConversionError::Invalid(format!(
                        "{} value has no literal text",
                        literal.kind()
                    )));
                };
                let mut tokens: Vec<String> = flag.iter().cloned().collect();
                tokens.push(text);
                Ok(tokens)
            }
            (CommandLineArgument::BooleanFlag { flag }, Value::Boolean(set)) => {
                if *set {
                    Ok(vec![flag.clone()])
                } else {
                    Ok(Vec::new())
                }
            }
            (CommandLineArgument::BoundingBox, Value::BoundingBox(bbox)) => {
                if bbox.lower.len() < 2 || bbox.upper.len() < 2 {
                    return Err(ConversionError::Invalid(
                        "bounding box corners need at least two coordinates".to_string(),
                    ));
                }
                // corners are [lat, lon]
                let coordinate = |v: f64| format!("{v:?}");
                Ok(vec![
                    coordinate(bbox.lower[1]),
                    coordinate(bbox.upper[1]),
                    coordinate(bbox.lower[0]),
                    coordinate(bbox.upper[0]),
                ])
            }
            (argument, other) => Err(ConversionError::WrongKind {
                expected: argument.expected_kind_hint(),
                actual: other.kind(),
            }),
        }
    }

    fn expected_kind_hint(&self) -> ValueKind {
        match self {
            CommandLineArgument::Literal { .. } => ValueKind::String,
            CommandLineArgument::BooleanFlag { .. } => ValueKind::Boolean,
            CommandLineArgument::BoundingBox => ValueKind::BoundingBox,
        }
    }
}

/// Tokens for a file handed to the command by path.
pub fn path_tokens(flag: Option<&str>, path: &str) -> Vec<String> {
    flag.into_iter()
        .map(str::to_string)
        .chain(std::iter::once(path.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    #[test]
    fn literal_with_and_without_flag() {
        let flagged = CommandLineArgument::Literal {
            flag: Some("--threshold".into()),
        };
        assert_eq!(
            flagged.tokens(&Value::Double(0.5)).unwrap(),
            vec!["--threshold", "0.5"]
        );

        let positional = CommandLineArgument::Literal { flag: None };
        assert_eq!(
            positional.tokens(&Value::String("deaggregation".into())).unwrap(),
            vec!["deaggregation"]
        );
    }

    #[test]
    fn boolean_flag_only_when_true() {
        let arg = CommandLineArgument::BooleanFlag {
            flag: "--verbose".into(),
        };
        assert_eq!(arg.tokens(&Value::Boolean(true)).unwrap(), vec!["--verbose"]);
        assert!(arg.tokens(&Value::Boolean(false)).unwrap().is_empty());
    }

    #[test]
    fn bounding_box_is_lon_lon_lat_lat() {
        let bbox = Value::BoundingBox(BoundingBox {
            lower: vec![-33.5, -72.0],
            upper: vec![-32.0, -70.5],
            crs: "EPSG:4326".into(),
        });
        assert_eq!(
            CommandLineArgument::BoundingBox.tokens(&bbox).unwrap(),
            vec!["-72.0", "-70.5", "-33.5", "-32.0"]
        );
    }

    #[test]
    fn short_bounding_box_is_rejected() {
        let bbox = Value::BoundingBox(BoundingBox {
            lower: vec![1.0],
            upper: vec![2.0, 3.0],
            crs: "EPSG:4326".into(),
        });
        assert!(CommandLineArgument::BoundingBox.tokens(&bbox).is_err());
    }

    #[test]
    fn path_tokens_prepend_flag() {
        assert_eq!(path_tokens(Some("--in"), "a.xml"), vec!["--in", "a.xml"]);
        assert_eq!(path_tokens(None, "a.xml"), vec!["a.xml"]);
    }
}

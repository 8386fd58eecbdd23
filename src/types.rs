// src/types.rs

//! Value model shared by descriptors, conversions and the cache.
//!
//! Every value that crosses a job boundary is a [`Value`]; its tag is a
//! [`ValueKind`]. Descriptors declare kinds, invocations carry values.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Raw inputs of one invocation: name to supplied values (first one wins).
pub type InputMap = HashMap<String, Vec<Value>>;

/// Outputs of one invocation, keyed by output name.
pub type OutputMap = BTreeMap<String, Value>;

/// Well-known XML document families.
///
/// `Generic` is any XML document; the others are identified by the
/// namespace their root element declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XmlSchema {
    Generic,
    QuakeMl,
    ShakeMap,
    Nrml,
}

impl XmlSchema {
    /// Namespace prefix a document of this family must declare.
    pub fn namespace_prefix(self) -> Option<&'static str> {
        match self {
            XmlSchema::Generic => None,
            XmlSchema::QuakeMl => Some("http://quakeml.org/xmlns/"),
            XmlSchema::ShakeMap => Some("http://earthquake.usgs.gov/eqcenter/shakemap"),
            XmlSchema::Nrml => Some("http://openquake.org/xmlns/nrml/"),
        }
    }

    /// Schema location used to refer to this family in job files.
    pub fn schema_location(self) -> Option<&'static str> {
        match self {
            XmlSchema::Generic => None,
            XmlSchema::QuakeMl => Some("http://quakeml.org/xmlns/quakeml/1.2/QuakeML-1.2.xsd"),
            XmlSchema::ShakeMap => {
                Some("http://earthquake.usgs.gov/eqcenter/shakemap/xml/schemas/shakemap.xsd")
            }
            XmlSchema::Nrml => Some("http://openquake.org/xmlns/nrml/0.5"),
        }
    }

    /// Resolve a schema location from a job file.
    pub fn from_location(location: &str) -> Option<Self> {
        [XmlSchema::QuakeMl, XmlSchema::ShakeMap, XmlSchema::Nrml]
            .into_iter()
            .find(|schema| schema.schema_location() == Some(location.trim()))
    }
}

/// The closed set of value kinds a parameter can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Double,
    Boolean,
    String,
    BoundingBox,
    GenericFile,
    Geotiff,
    GeoJson,
    Xml(XmlSchema),
    Json,
}

impl ValueKind {
    /// Literal kinds are the ones that may carry an allowed-value set.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            ValueKind::Integer | ValueKind::Double | ValueKind::Boolean | ValueKind::String
        )
    }

    /// Kinds that have a byte representation (file, stdin, stdout...).
    pub fn has_byte_form(self) -> bool {
        !matches!(self, ValueKind::BoundingBox)
    }

    /// Whether a supplied value is acceptable for a slot of this kind.
    ///
    /// Generic XML slots accept any XML document; everything else is an
    /// exact tag match.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value.kind()) {
            (ValueKind::Xml(XmlSchema::Generic), ValueKind::Xml(_)) => true,
            (expected, actual) => expected == actual,
        }
    }

    /// File extension used for files of this kind handed to a command.
    pub fn file_extension(self) -> &'static str {
        match self {
            ValueKind::Xml(_) => "xml",
            ValueKind::Geotiff => "tiff",
            ValueKind::GeoJson | ValueKind::Json => "json",
            _ => "dat",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Integer => "int",
            ValueKind::Double => "double",
            ValueKind::Boolean => "boolean",
            ValueKind::String => "string",
            ValueKind::BoundingBox => "bbox",
            ValueKind::GenericFile => "file",
            ValueKind::Geotiff => "geotiff",
            ValueKind::GeoJson => "geojson",
            ValueKind::Xml(XmlSchema::Generic) => "xml",
            ValueKind::Xml(XmlSchema::QuakeMl) => "quakeml",
            ValueKind::Xml(XmlSchema::ShakeMap) => "shakemap",
            ValueKind::Xml(XmlSchema::Nrml) => "nrml",
            ValueKind::Json => "json",
        };
        f.write_str(name)
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "int" => Ok(ValueKind::Integer),
            "double" => Ok(ValueKind::Double),
            "boolean" => Ok(ValueKind::Boolean),
            "string" => Ok(ValueKind::String),
            "bbox" => Ok(ValueKind::BoundingBox),
            "file" => Ok(ValueKind::GenericFile),
            "geotiff" => Ok(ValueKind::Geotiff),
            "geojson" => Ok(ValueKind::GeoJson),
            "xml" => Ok(ValueKind::Xml(XmlSchema::Generic)),
            "quakeml" => Ok(ValueKind::Xml(XmlSchema::QuakeMl)),
            "shakemap" => Ok(ValueKind::Xml(XmlSchema::ShakeMap)),
            "nrml" => Ok(ValueKind::Xml(XmlSchema::Nrml)),
            "json" => Ok(ValueKind::Json),
            "shapefile" => Err(
                "type \"shapefile\" is not supported (no shapefile conversion available)"
                    .to_string(),
            ),
            other => Err(format!("unknown value type \"{other}\"")),
        }
    }
}

/// Axis-aligned bounding box. Corners are `[lat, lon]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub crs: String,
}

/// XML document text together with the family it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub schema: XmlSchema,
    pub text: String,
}

/// A concrete, typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    BoundingBox(BoundingBox),
    GenericFile(Vec<u8>),
    Geotiff(Vec<u8>),
    GeoJson(serde_json::Value),
    Xml(XmlDocument),
    Json(serde_json::Value),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Double(_) => ValueKind::Double,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::String(_) => ValueKind::String,
            Value::BoundingBox(_) => ValueKind::BoundingBox,
            Value::GenericFile(_) => ValueKind::GenericFile,
            Value::Geotiff(_) => ValueKind::Geotiff,
            Value::GeoJson(_) => ValueKind::GeoJson,
            Value::Xml(doc) => ValueKind::Xml(doc.schema),
            Value::Json(_) => ValueKind::Json,
        }
    }

    /// Shorthand for an XML value of the given family.
    pub fn xml(schema: XmlSchema, text: impl Into<String>) -> Self {
        Value::Xml(XmlDocument {
            schema,
            text: text.into(),
        })
    }

    /// Parse the textual form of a literal value (defaults, allowed values,
    /// CLI inputs).
    pub fn parse_literal(kind: ValueKind, text: &str) -> Result<Self, String> {
        let trimmed = text.trim();
        match kind {
            ValueKind::Integer => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| format!("\"{trimmed}\" is not an integer: {e}")),
            ValueKind::Double => trimmed
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|e| format!("\"{trimmed}\" is not a double: {e}")),
            ValueKind::Boolean => match trimmed.to_lowercase().as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(format!("\"{trimmed}\" is not a boolean")),
            },
            ValueKind::String => Ok(Value::String(text.to_string())),
            other => Err(format!("{other} values have no literal form")),
        }
    }

    /// Text used when a literal is placed on a command line.
    ///
    /// Doubles keep a trailing `.0` when integral so `5.0` stays `5.0`.
    pub fn literal_text(&self) -> Option<String> {
        match self {
            Value::Integer(v) => Some(v.to_string()),
            Value::Double(v) => Some(format!("{v:?}")),
            Value::Boolean(v) => Some(v.to_string()),
            Value::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}

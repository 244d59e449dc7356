use std::fmt::{Display, Formatter};
use std::str::FromStr;

use log::warn;
use serde::Serialize;
use thiserror::Error;

/// Header directives that are understood by the schema builder.
/// Lines starting with any other keyword are ignored.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Directive {
    Version,
    Fields,
    Size,
    Type,
    Count,
    Width,
    Height,
    Viewpoint,
    Points,
    Data,
}

impl Directive {
    pub const ALL: [Directive; 10] = [
        Directive::Version,
        Directive::Fields,
        Directive::Size,
        Directive::Type,
        Directive::Count,
        Directive::Width,
        Directive::Height,
        Directive::Viewpoint,
        Directive::Points,
        Directive::Data,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Directive::Version => "VERSION",
            Directive::Fields => "FIELDS",
            Directive::Size => "SIZE",
            Directive::Type => "TYPE",
            Directive::Count => "COUNT",
            Directive::Width => "WIDTH",
            Directive::Height => "HEIGHT",
            Directive::Viewpoint => "VIEWPOINT",
            Directive::Points => "POINTS",
            Directive::Data => "DATA",
        }
    }

    /// Case-sensitive lookup of a directive by its keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.keyword() == keyword)
    }
}

impl Display for Directive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize)]
pub enum FieldType {
    #[serde(rename = "I")]
    Integer,
    #[serde(rename = "U")]
    Unsigned,
    #[serde(rename = "F")]
    Float,
}

impl FieldType {
    pub fn tag(self) -> &'static str {
        match self {
            FieldType::Integer => "I",
            FieldType::Unsigned => "U",
            FieldType::Float => "F",
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Ascii,
    Binary,
    BinaryCompressed,
}

impl Encoding {
    pub fn keyword(self) -> &'static str {
        match self {
            Encoding::Ascii => "ascii",
            Encoding::Binary => "binary",
            Encoding::BinaryCompressed => "binary_compressed",
        }
    }
}

impl Display for Encoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A directive, whose values could not be parsed.
/// The directive is left unset in the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidDirective {
    pub directive: Directive,
    pub line: String,
    pub reason: String,
}

/// Best-effort interpretation of the pcd header lines.
///
/// Each attribute is `None`, if the corresponding directive was absent or could not be parsed.
/// If a directive occurs multiple times, the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PcdHeader {
    pub version: Option<String>,
    pub fields: Option<Vec<String>>,
    pub sizes: Option<Vec<u32>>,
    pub types: Option<Vec<FieldType>>,
    pub counts: Option<Vec<u32>>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub viewpoint: Option<Vec<f64>>,
    pub points: Option<u64>,
    pub data: Option<Encoding>,
}

/// One attribute of a point record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    /// Size of one element in bytes.
    pub size: u32,
    /// Number of elements.
    pub count: u32,
}

impl FieldSpec {
    /// Number of bytes this field occupies in each point record.
    pub fn byte_len(&self) -> u64 {
        self.size as u64 * self.count as u64
    }
}

/// Reasons why the field list can not be assembled from the header.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaError {
    #[error("missing {directive}")]
    MissingDirective { directive: Directive },

    #[error("FIELDS, SIZE and COUNT disagree in length ({fields}, {sizes}, {counts})")]
    LengthMismatch {
        fields: usize,
        sizes: usize,
        counts: usize,
    },

    #[error("the header declares no fields")]
    NoFields,

    #[error("field '{field}' has a size or count of zero")]
    EmptyField { field: String },

    #[error("the point record size exceeds {} bytes", u64::MAX)]
    StrideOverflow,
}

impl PcdHeader {
    /// Interprets the given header lines.
    ///
    /// Never fails: Values that can not be parsed are returned as [InvalidDirective]s
    /// and the corresponding attribute is left unset.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> (Self, Vec<InvalidDirective>) {
        let mut header = PcdHeader::default();
        let mut invalid = Vec::new();
        for line in lines {
            let line = line.as_ref();

            // remove trailing comments
            let statement = match line.split_once('#') {
                Some((stmnt, _comment)) => stmnt,
                None => line,
            };

            let mut tokens = statement.split_whitespace();
            let Some(directive) = tokens.next().and_then(Directive::from_keyword) else {
                continue;
            };
            let values = tokens.collect::<Vec<_>>();
            if let Err(reason) = header.apply(directive, &values) {
                warn!("Ignoring header line '{line}': {reason}");
                invalid.push(InvalidDirective {
                    directive,
                    line: line.to_string(),
                    reason,
                });
            }
        }
        (header, invalid)
    }

    /// Sets the attribute belonging to the directive.
    /// On error, the attribute is reset, so that an invalid repetition of a
    /// directive also replaces the earlier occurrence.
    fn apply(&mut self, directive: Directive, values: &[&str]) -> Result<(), String> {
        match directive {
            Directive::Version => {
                self.version = None;
                self.version = Some(Self::parse_single(values, Self::parse_string)?);
            }
            Directive::Fields => {
                self.fields = None;
                self.fields = Some(Self::parse_list(values, Self::parse_string)?);
            }
            Directive::Size => {
                self.sizes = None;
                self.sizes = Some(Self::parse_list(values, Self::parse_u32)?);
            }
            Directive::Type => {
                self.types = None;
                self.types = Some(Self::parse_list(values, Self::parse_type)?);
            }
            Directive::Count => {
                self.counts = None;
                self.counts = Some(Self::parse_list(values, Self::parse_u32)?);
            }
            Directive::Width => {
                self.width = None;
                self.width = Some(Self::parse_single(values, Self::parse_u32)?);
            }
            Directive::Height => {
                self.height = None;
                self.height = Some(Self::parse_single(values, Self::parse_u32)?);
            }
            Directive::Viewpoint => {
                self.viewpoint = None;
                self.viewpoint = Some(Self::parse_list(values, Self::parse_f64)?);
            }
            Directive::Points => {
                self.points = None;
                self.points = Some(Self::parse_single(values, Self::parse_u64)?);
            }
            Directive::Data => {
                self.data = None;
                self.data = Some(Self::parse_single(values, Self::parse_encoding)?);
            }
        }
        Ok(())
    }

    fn parse_list<T>(
        values: &[&str],
        inner: impl Fn(&str) -> Result<T, String>,
    ) -> Result<Vec<T>, String> {
        values.iter().copied().map(inner).collect()
    }

    fn parse_single<T>(
        values: &[&str],
        inner: impl Fn(&str) -> Result<T, String>,
    ) -> Result<T, String> {
        match values.first() {
            Some(val) => inner(val),
            None => Err("missing value".to_string()),
        }
    }

    fn parse_string(val: &str) -> Result<String, String> {
        Ok(val.to_string())
    }

    fn parse_u32(val: &str) -> Result<u32, String> {
        u32::from_str(val).map_err(|e| format!("'{val}' is not a valid integer ({e})"))
    }

    fn parse_u64(val: &str) -> Result<u64, String> {
        u64::from_str(val).map_err(|e| format!("'{val}' is not a valid integer ({e})"))
    }

    fn parse_f64(val: &str) -> Result<f64, String> {
        f64::from_str(val).map_err(|e| format!("'{val}' is not a valid number ({e})"))
    }

    fn parse_type(val: &str) -> Result<FieldType, String> {
        let typ = match val {
            "I" => FieldType::Integer,
            "U" => FieldType::Unsigned,
            "F" => FieldType::Float,
            _ => return Err(format!("expected one of 'I', 'U' or 'F' as type, got '{val}'")),
        };
        Ok(typ)
    }

    fn parse_encoding(val: &str) -> Result<Encoding, String> {
        let encoding = match val {
            "ascii" => Encoding::Ascii,
            "binary" => Encoding::Binary,
            "binary_compressed" => Encoding::BinaryCompressed,
            _ => {
                return Err(format!(
                    "expected one of 'ascii', 'binary' or 'binary_compressed' as encoding, got '{val}'"
                ))
            }
        };
        Ok(encoding)
    }

    /// Zips FIELDS, SIZE and COUNT into the ordered field list.
    pub fn field_specs(&self) -> Result<Vec<FieldSpec>, SchemaError> {
        let missing = |directive| SchemaError::MissingDirective { directive };
        let fields = self.fields.as_ref().ok_or(missing(Directive::Fields))?;
        let sizes = self.sizes.as_ref().ok_or(missing(Directive::Size))?;
        let counts = self.counts.as_ref().ok_or(missing(Directive::Count))?;
        if fields.len() != sizes.len() || fields.len() != counts.len() {
            return Err(SchemaError::LengthMismatch {
                fields: fields.len(),
                sizes: sizes.len(),
                counts: counts.len(),
            });
        }
        if fields.is_empty() {
            return Err(SchemaError::NoFields);
        }

        let specs = fields
            .iter()
            .zip(sizes)
            .zip(counts)
            .map(|((name, &size), &count)| FieldSpec {
                name: name.clone(),
                size,
                count,
            })
            .collect::<Vec<_>>();
        if let Some(empty) = specs.iter().find(|f| f.byte_len() == 0) {
            return Err(SchemaError::EmptyField {
                field: empty.name.clone(),
            });
        }
        specs
            .iter()
            .try_fold(0_u64, |stride, f| stride.checked_add(f.byte_len()))
            .ok_or(SchemaError::StrideOverflow)?;
        Ok(specs)
    }

    /// Checks the declared number of points against width and height.
    /// Returns `None`, if any of them is missing.
    pub fn point_count_matches(&self) -> Option<bool> {
        let points = self.points?;
        let width = self.width? as u64;
        let height = self.height? as u64;
        Some(points == width * height)
    }
}

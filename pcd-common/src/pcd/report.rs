use std::fmt::{Display, Formatter};
use std::io::{Read, Seek};

use log::warn;
use serde::Serialize;

use super::decode::{check_encoding, DataSegment, DecodeStop, DecodedRecord, RecordDecoder, SkipReason};
use super::header::{FieldSpec, InvalidDirective, PcdHeader, SchemaError};
use super::layout::RowLayout;
use super::lexer::HeaderLines;

/// Everything that was found out about a pcd file.
///
/// Parts that could not be derived are `None` (or empty), and the reason is
/// listed in [PcdReport::notes].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcdReport {
    pub file_size: u64,
    pub header: HeaderLines,
    pub schema: PcdHeader,
    pub fields: Option<Vec<FieldSpec>>,
    pub layout: Option<RowLayout>,
    pub data: DataSegment,
    /// Number of records that was attempted to decode.
    pub sample_limit: u64,
    pub records: Vec<DecodedRecord>,
    pub notes: Vec<Note>,
}

/// A condition that limited the analysis of a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Note {
    ShortHeader,
    InvalidDirective(InvalidDirective),
    PointCountMismatch { points: u64, width: u32, height: u32 },
    GeometryUnavailable { reason: SchemaError },
    DecodingSkipped { reason: SkipReason },
    UndecodableField { field: String, bytes: u64 },
    DecodingStopped { reason: DecodeStop },
}

impl Display for Note {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Note::ShortHeader => write!(f, "short header: no DATA line before the end of the file"),
            Note::InvalidDirective(InvalidDirective {
                directive, reason, ..
            }) => write!(f, "ignored invalid {directive} directive: {reason}"),
            Note::PointCountMismatch {
                points,
                width,
                height,
            } => write!(
                f,
                "POINTS ({points}) does not match WIDTH * HEIGHT ({width} * {height})"
            ),
            Note::GeometryUnavailable { reason } => {
                write!(f, "geometry unavailable: incomplete schema, {reason}")
            }
            Note::DecodingSkipped { reason } => match reason {
                SkipReason::AsciiPayload => {
                    write!(f, "decoding skipped: ascii payload is not parsed")
                }
                SkipReason::CompressedPayload => write!(
                    f,
                    "decoding skipped: compressed payload, decompression required"
                ),
                SkipReason::UnknownEncoding => {
                    write!(f, "decoding skipped: unknown payload encoding")
                }
                SkipReason::IncompleteSchema => {
                    write!(f, "decoding skipped: incomplete schema")
                }
                SkipReason::MissingPointCount => {
                    write!(f, "decoding skipped: missing POINTS, number of records unknown")
                }
            },
            Note::UndecodableField { field, bytes } => write!(
                f,
                "field '{field}' is not decoded: {bytes} bytes are neither a u8 nor an f32"
            ),
            Note::DecodingStopped { reason } => match reason {
                DecodeStop::Truncated { decoded, requested } => write!(
                    f,
                    "truncated data: decoded {decoded} of {requested} records"
                ),
                DecodeStop::ReadFailed { decoded, message } => write!(
                    f,
                    "reading point data failed after {decoded} records: {message}"
                ),
            },
        }
    }
}

impl PcdReport {
    /// Assembles the report from the lexed header.
    ///
    /// `rd` is the same source the header was read from. It is only touched if
    /// records are to be decoded.
    pub fn build(
        rd: impl Read + Seek,
        file_size: u64,
        header: HeaderLines,
        sample_limit: u64,
    ) -> Self {
        let mut notes = Vec::new();
        if !header.terminated {
            notes.push(Note::ShortHeader);
        }

        let (schema, invalid) = PcdHeader::parse(&header.lines);
        notes.extend(invalid.into_iter().map(Note::InvalidDirective));
        if schema.point_count_matches() == Some(false) {
            if let (Some(points), Some(width), Some(height)) =
                (schema.points, schema.width, schema.height)
            {
                notes.push(Note::PointCountMismatch {
                    points,
                    width,
                    height,
                });
            }
        }

        let fields = match schema.field_specs() {
            Ok(fields) => Some(fields),
            Err(reason) => {
                warn!("Row geometry unavailable: {reason}");
                notes.push(Note::GeometryUnavailable { reason });
                None
            }
        };
        let layout = fields.as_deref().map(RowLayout::new);
        let data = DataSegment::new(header.data_start, file_size);
        let sample_limit = sample_limit.min(schema.points.unwrap_or(0));

        let mut records = Vec::new();
        let gate = check_encoding(schema.data)
            .and_then(|()| match (&fields, &layout) {
                (Some(fields), Some(layout)) => Ok((fields, layout)),
                _ => Err(SkipReason::IncompleteSchema),
            })
            .and_then(|decodable| match schema.points {
                Some(_) => Ok(decodable),
                None => Err(SkipReason::MissingPointCount),
            });
        match gate {
            Err(reason) => notes.push(Note::DecodingSkipped { reason }),
            Ok((fields, layout)) => {
                let decoder = RecordDecoder::new(fields, layout);
                notes.extend(decoder.undecodable_fields().map(|f| Note::UndecodableField {
                    field: f.name.clone(),
                    bytes: f.byte_len(),
                }));
                let read = decoder.read_samples(rd, data, sample_limit);
                records = read.records;
                if let Some(reason) = read.stop {
                    notes.push(Note::DecodingStopped { reason });
                }
            }
        }

        PcdReport {
            file_size,
            header,
            schema,
            fields,
            layout,
            data,
            sample_limit,
            records,
            notes,
        }
    }

    /// The reason for not decoding any records, if decoding was not attempted.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.notes.iter().find_map(|n| match n {
            Note::DecodingSkipped { reason } => Some(*reason),
            _ => None,
        })
    }

    pub fn is_truncated(&self) -> bool {
        self.notes.iter().any(|n| {
            matches!(
                n,
                Note::DecodingStopped {
                    reason: DecodeStop::Truncated { .. }
                }
            )
        })
    }
}

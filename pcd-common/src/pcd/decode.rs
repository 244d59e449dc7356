use std::io::{ErrorKind, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};
use serde::Serialize;

use super::header::{Encoding, FieldSpec};
use super::layout::RowLayout;

/// Byte range of the point data, following the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataSegment {
    pub start: u64,
    pub len: u64,
}

impl DataSegment {
    pub fn new(data_start: u64, file_size: u64) -> Self {
        DataSegment {
            start: data_start,
            len: file_size.saturating_sub(data_start),
        }
    }

    pub fn end(&self) -> u64 {
        self.start + self.len
    }
}

/// Why the point records are not decoded at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Rows are text lines of varying length.
    AsciiPayload,
    /// The payload needs to be decompressed first.
    CompressedPayload,
    /// The DATA directive is missing or invalid.
    UnknownEncoding,
    /// No row layout could be computed.
    IncompleteSchema,
    /// The POINTS directive is missing or invalid, so there is no record count to go by.
    MissingPointCount,
}

/// Only uncompressed binary payloads are decoded.
pub fn check_encoding(encoding: Option<Encoding>) -> Result<(), SkipReason> {
    match encoding {
        Some(Encoding::Binary) => Ok(()),
        Some(Encoding::BinaryCompressed) => Err(SkipReason::CompressedPayload),
        Some(Encoding::Ascii) => Err(SkipReason::AsciiPayload),
        None => Err(SkipReason::UnknownEncoding),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f32),
    Byte(u8),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Byte(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedValue {
    pub field: String,
    pub value: FieldValue,
}

/// The decoded fields of one point, in field order.
/// Fields that can not be decoded are left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    pub values: Vec<DecodedValue>,
}

impl DecodedRecord {
    pub fn get(&self, field: &str) -> Option<FieldValue> {
        self.values
            .iter()
            .find(|v| v.field == field)
            .map(|v| v.value)
    }
}

/// Reason for stopping before the requested number of records was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeStop {
    Truncated { decoded: u64, requested: u64 },
    ReadFailed { decoded: u64, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleRead {
    pub records: Vec<DecodedRecord>,
    pub stop: Option<DecodeStop>,
}

/// Decodes fixed size point records.
///
/// Decoding goes by the number of bytes of each field only: 4 byte fields are
/// read as little endian f32, 1 byte fields as u8. The TYPE of the field is not
/// considered. All other fields are skipped.
pub struct RecordDecoder<'a> {
    fields: &'a [FieldSpec],
    layout: &'a RowLayout,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(fields: &'a [FieldSpec], layout: &'a RowLayout) -> Self {
        debug_assert_eq!(fields.len(), layout.offsets.len());
        RecordDecoder { fields, layout }
    }

    pub fn is_decodable(field: &FieldSpec) -> bool {
        matches!(field.byte_len(), 1 | 4)
    }

    pub fn undecodable_fields(&self) -> impl Iterator<Item = &'a FieldSpec> {
        let fields: &'a [FieldSpec] = self.fields;
        fields.iter().filter(|f| !Self::is_decodable(f))
    }

    /// Decodes a single row.
    /// Returns `None`, if the row is shorter than one stride.
    pub fn decode_record(&self, row: &[u8]) -> Option<DecodedRecord> {
        if (row.len() as u64) < self.layout.stride {
            return None;
        }
        let mut values = Vec::with_capacity(self.fields.len());
        for (field, &offset) in self.fields.iter().zip(&self.layout.offsets) {
            let start = offset as usize;
            let end = start + field.byte_len() as usize;
            let bytes = &row[start..end];
            let value = match bytes.len() {
                4 => FieldValue::Float(LittleEndian::read_f32(bytes)),
                1 => FieldValue::Byte(bytes[0]),
                _ => continue,
            };
            values.push(DecodedValue {
                field: field.name.clone(),
                value,
            });
        }
        Some(DecodedRecord { values })
    }

    /// Reads up to `limit` records from the start of the data segment.
    ///
    /// Stops early (without failing) if the data segment does not contain enough
    /// complete rows, or if reading fails. Records read up to that point are kept.
    pub fn read_samples(&self, mut rd: impl Read + Seek, data: DataSegment, limit: u64) -> SampleRead {
        let stride = self.layout.stride;
        let available = data.len.checked_div(stride).unwrap_or(limit);
        let to_read = limit.min(available);
        let mut records = Vec::with_capacity(to_read as usize);

        let read_failed = |records: Vec<DecodedRecord>, e: std::io::Error| {
            warn!("Reading point data failed: {e}");
            SampleRead {
                stop: Some(DecodeStop::ReadFailed {
                    decoded: records.len() as u64,
                    message: e.to_string(),
                }),
                records,
            }
        };

        if to_read > 0 {
            if let Err(e) = rd.seek(SeekFrom::Start(data.start)) {
                return read_failed(records, e);
            }
            let mut row = vec![0; stride as usize];
            for _ in 0..to_read {
                match rd.read_exact(&mut row) {
                    Ok(()) => records.extend(self.decode_record(&row)),
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                    Err(e) => return read_failed(records, e),
                }
            }
        }

        let decoded = records.len() as u64;
        let stop = if decoded < limit {
            warn!(
                "Data segment ends after {} complete point records, expected at least {}.",
                decoded, limit
            );
            Some(DecodeStop::Truncated {
                decoded,
                requested: limit,
            })
        } else {
            None
        };
        debug!("Decoded {decoded} sample records with a stride of {stride} bytes");
        SampleRead { records, stop }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{
        check_encoding, DataSegment, DecodeStop, FieldValue, RecordDecoder, SkipReason,
    };
    use crate::pcd::header::{Encoding, FieldSpec};
    use crate::pcd::layout::RowLayout;

    fn field(name: &str, size: u32, count: u32) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            size,
            count,
        }
    }

    fn xyz() -> Vec<FieldSpec> {
        vec![field("x", 4, 1), field("y", 4, 1), field("z", 4, 1)]
    }

    fn rows(points: &[[f32; 3]]) -> Vec<u8> {
        points
            .iter()
            .flat_map(|p| p.iter().flat_map(|c| c.to_le_bytes()))
            .collect()
    }

    #[test]
    fn test_encoding_gate() {
        assert_eq!(check_encoding(Some(Encoding::Binary)), Ok(()));
        assert_eq!(
            check_encoding(Some(Encoding::BinaryCompressed)),
            Err(SkipReason::CompressedPayload)
        );
        assert_eq!(
            check_encoding(Some(Encoding::Ascii)),
            Err(SkipReason::AsciiPayload)
        );
        assert_eq!(check_encoding(None), Err(SkipReason::UnknownEncoding));
    }

    #[test]
    fn test_float_is_bit_exact() {
        let fields = [field("a", 1, 1), field("b", 2, 1), field("value", 4, 1)];
        let layout = RowLayout::new(&fields);
        let decoder = RecordDecoder::new(&fields, &layout);
        for expected in [
            0.0_f32,
            -0.0,
            1.5,
            -123.456,
            f32::MIN_POSITIVE,
            f32::MAX,
            f32::INFINITY,
        ] {
            let mut row = vec![0xAA; layout.stride as usize];
            let o = layout.offset(2).unwrap() as usize;
            row[o..o + 4].copy_from_slice(&expected.to_le_bytes());
            let record = decoder.decode_record(&row).unwrap();
            match record.get("value") {
                Some(FieldValue::Float(actual)) => assert_eq!(actual.to_bits(), expected.to_bits()),
                other => panic!("unexpected value: {other:?}"),
            }
        }
    }

    #[test]
    fn test_nan_is_bit_exact() {
        let fields = [field("v", 4, 1)];
        let layout = RowLayout::new(&fields);
        let decoder = RecordDecoder::new(&fields, &layout);
        let bits = 0x7fc0_1234_u32;
        let record = decoder.decode_record(&bits.to_le_bytes()).unwrap();
        match record.get("v") {
            Some(FieldValue::Float(v)) => assert_eq!(v.to_bits(), bits),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn test_decode_policy_by_byte_len() {
        let fields = [
            field("intensity", 1, 1),
            field("ring", 2, 1),
            field("rgba", 1, 4),
            field("normal", 4, 3),
            field("label", 4, 1),
            field("time", 8, 1),
        ];
        let layout = RowLayout::new(&fields);
        let decoder = RecordDecoder::new(&fields, &layout);

        let mut row = vec![0; layout.stride as usize];
        row[0] = 200;
        row[3..7].copy_from_slice(&2.0_f32.to_le_bytes());
        row[19..23].copy_from_slice(&7.0_f32.to_le_bytes());

        let record = decoder.decode_record(&row).unwrap();
        let names = record
            .values
            .iter()
            .map(|v| v.field.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["intensity", "rgba", "label"]);
        assert_eq!(record.get("intensity"), Some(FieldValue::Byte(200)));
        assert_eq!(record.get("rgba"), Some(FieldValue::Float(2.0)));
        assert_eq!(record.get("label"), Some(FieldValue::Float(7.0)));

        let skipped = decoder
            .undecodable_fields()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(skipped, vec!["ring", "normal", "time"]);
    }

    #[test]
    fn test_short_row_is_not_decoded() {
        let fields = xyz();
        let layout = RowLayout::new(&fields);
        let decoder = RecordDecoder::new(&fields, &layout);
        assert_eq!(decoder.decode_record(&[0; 11]), None);
        assert_eq!(decoder.decode_record(&[]), None);
        assert_eq!(decoder.decode_record(&[0; 12]).unwrap().values.len(), 3);
    }

    #[test]
    fn test_read_samples() {
        let fields = xyz();
        let layout = RowLayout::new(&fields);
        let decoder = RecordDecoder::new(&fields, &layout);
        let mut file = b"HEADER\n".to_vec();
        file.extend(rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]));
        let data = DataSegment::new(7, file.len() as u64);

        let read = decoder.read_samples(Cursor::new(&file), data, 2);
        assert_eq!(read.stop, None);
        assert_eq!(read.records.len(), 2);
        assert_eq!(read.records[1].get("x"), Some(FieldValue::Float(4.0)));
        assert_eq!(read.records[1].get("z"), Some(FieldValue::Float(6.0)));
    }

    #[test]
    fn test_read_samples_one_byte_short() {
        let fields = xyz();
        let layout = RowLayout::new(&fields);
        let decoder = RecordDecoder::new(&fields, &layout);
        let mut file = rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        file.pop();
        let data = DataSegment::new(0, file.len() as u64);

        let read = decoder.read_samples(Cursor::new(&file), data, 3);
        assert_eq!(read.records.len(), 1);
        assert_eq!(
            read.stop,
            Some(DecodeStop::Truncated {
                decoded: 1,
                requested: 3
            })
        );
    }

    #[test]
    fn test_read_samples_file_shorter_than_declared() {
        // the data segment claims more bytes than the reader actually delivers
        let fields = xyz();
        let layout = RowLayout::new(&fields);
        let decoder = RecordDecoder::new(&fields, &layout);
        let file = rows(&[[1.0, 2.0, 3.0]]);
        let data = DataSegment::new(0, 36);

        let read = decoder.read_samples(Cursor::new(&file), data, 3);
        assert_eq!(read.records.len(), 1);
        assert_eq!(
            read.stop,
            Some(DecodeStop::Truncated {
                decoded: 1,
                requested: 3
            })
        );
    }

    #[test]
    fn test_read_samples_zero_limit() {
        let fields = xyz();
        let layout = RowLayout::new(&fields);
        let decoder = RecordDecoder::new(&fields, &layout);
        let read = decoder.read_samples(Cursor::new(Vec::new()), DataSegment::new(0, 0), 0);
        assert!(read.records.is_empty());
        assert_eq!(read.stop, None);
    }

    #[test]
    fn test_huge_stride_does_not_allocate() {
        let fields = [field("blob", u32::MAX, u32::MAX)];
        let layout = RowLayout::new(&fields);
        let decoder = RecordDecoder::new(&fields, &layout);
        let read = decoder.read_samples(Cursor::new(vec![0; 16]), DataSegment::new(0, 16), 3);
        assert!(read.records.is_empty());
        assert!(matches!(read.stop, Some(DecodeStop::Truncated { decoded: 0, .. })));
    }

    #[test]
    fn test_data_segment() {
        let data = DataSegment::new(100, 160);
        assert_eq!(data.len, 60);
        assert_eq!(data.end(), 160);
        assert_eq!(DataSegment::new(100, 50).len, 0);
    }
}

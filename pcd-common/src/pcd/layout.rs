use serde::Serialize;

use super::header::FieldSpec;

/// Position of each field within a point record.
///
/// Fields are packed, without any padding between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowLayout {
    /// Size of one point record in bytes.
    pub stride: u64,

    /// Byte offset of each field within the point record,
    /// in the same order as the field list it was computed from.
    pub offsets: Vec<u64>,
}

impl RowLayout {
    pub fn new(fields: &[FieldSpec]) -> Self {
        let mut offsets = Vec::with_capacity(fields.len());
        let mut stride = 0;
        for field in fields {
            offsets.push(stride);
            stride += field.byte_len();
        }
        RowLayout { stride, offsets }
    }

    pub fn offset(&self, field_index: usize) -> Option<u64> {
        self.offsets.get(field_index).copied()
    }
}

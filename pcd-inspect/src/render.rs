use std::io::Write;
use std::path::Path;

use anyhow::Result;
use pcd_common::pcd::header::PcdHeader;
use pcd_common::PcdReport;
use serde::Serialize;

#[derive(Serialize)]
struct FileReport<'a> {
    path: &'a Path,
    #[serde(flatten)]
    report: &'a PcdReport,
}

pub fn write_json(mut wr: impl Write, path: &Path, report: &PcdReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut wr, &FileReport { path, report })?;
    writeln!(wr)?;
    Ok(())
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_schema(wr: &mut impl Write, schema: &PcdHeader) -> Result<()> {
    let entries = [
        ("VERSION", schema.version.clone()),
        ("FIELDS", schema.fields.as_deref().map(join)),
        ("SIZE", schema.sizes.as_deref().map(join)),
        ("TYPE", schema.types.as_deref().map(join)),
        ("COUNT", schema.counts.as_deref().map(join)),
        ("WIDTH", schema.width.map(|v| v.to_string())),
        ("HEIGHT", schema.height.map(|v| v.to_string())),
        ("VIEWPOINT", schema.viewpoint.as_deref().map(join)),
        ("POINTS", schema.points.map(|v| v.to_string())),
        ("DATA", schema.data.map(|v| v.to_string())),
    ];
    writeln!(wr, "Parsed header:")?;
    for (key, value) in entries {
        if let Some(value) = value {
            writeln!(wr, "  {key}: {value}")?;
        }
    }
    Ok(())
}

pub fn write_text(mut wr: impl Write, path: &Path, report: &PcdReport) -> Result<()> {
    let wr = &mut wr;
    writeln!(wr, "File: {}", path.display())?;
    writeln!(
        wr,
        "File size: {} bytes ({:.2} MiB)",
        report.file_size,
        report.file_size as f64 / 1024.0 / 1024.0
    )?;

    writeln!(wr)?;
    writeln!(wr, "Header lines: {}", report.header.lines.len())?;
    for (i, line) in report.header.lines.iter().enumerate() {
        writeln!(wr, "  {:2}: {}", i + 1, line)?;
    }

    writeln!(wr)?;
    write_schema(wr, &report.schema)?;

    if let (Some(fields), Some(layout)) = (&report.fields, &report.layout) {
        writeln!(wr)?;
        writeln!(wr, "Row size: {} bytes", layout.stride)?;
        writeln!(wr, "Field offsets:")?;
        for (field, offset) in fields.iter().zip(&layout.offsets) {
            writeln!(
                wr,
                "  {}: offset={}, size={}",
                field.name,
                offset,
                field.byte_len()
            )?;
        }
    }

    writeln!(wr)?;
    writeln!(wr, "Data segment:")?;
    writeln!(wr, "  start: {}", report.data.start)?;
    writeln!(wr, "  size: {} bytes", report.data.len)?;
    match report.schema.data {
        Some(encoding) => writeln!(wr, "  format: {encoding}")?,
        None => writeln!(wr, "  format: unknown")?,
    }

    if !report.records.is_empty() {
        writeln!(wr)?;
        writeln!(wr, "Sample points:")?;
        for (i, record) in report.records.iter().enumerate() {
            writeln!(wr, "  point {}:", i + 1)?;
            for value in &record.values {
                writeln!(wr, "    {}: {}", value.field, value.value)?;
            }
        }
    }

    if !report.notes.is_empty() {
        writeln!(wr)?;
        writeln!(wr, "Notes:")?;
        for note in &report.notes {
            writeln!(wr, "  - {note}")?;
        }
    }
    Ok(())
}

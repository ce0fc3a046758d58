use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::entities::record::{ArchiveStatus, EditableRecord, FieldValue, RecordField};

fn cell_text<R: EditableRecord>(record: &R, field: R::Field) -> String {
    match record.get(field) {
        FieldValue::Boolean(flag) if field.is_archive_flag() => {
            ArchiveStatus::from_archived(flag).label().to_string()
        }
        value => value.to_display(),
    }
}

/// Writes a header row of field labels followed by one line per record.
pub fn write_records<R: EditableRecord, W: Write>(writer: W, records: &[R]) -> Result<usize> {
    let fields = R::Field::all();
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);

    csv_writer
        .write_record(fields.iter().map(|field| field.label()))
        .context("failed to write csv header")?;
    for record in records {
        csv_writer
            .write_record(fields.iter().map(|field| cell_text(record, *field)))
            .with_context(|| format!("failed to write csv row {}", record.row_id()))?;
    }
    csv_writer.flush().context("failed to flush csv output")?;
    Ok(records.len())
}

pub fn export_records_to_csv<R: EditableRecord>(path: &Path, records: &[R]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create csv: {}", path.display()))?;
    write_records(file, records)
}

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::ExportError;
use crate::types::{Availability, ExportFormat, FailedFile, LastAction, ShortcutRecord};

fn availability_to_string(availability: Availability) -> &'static str {
    match availability {
        Availability::Unknown => "Unknown",
        Availability::Available => "Available",
        Availability::AvailableCaseMismatch => "AvailableCaseMismatch",
        Availability::Unavailable => "Unavailable",
    }
}

fn last_action_to_string(action: LastAction) -> &'static str {
    match action {
        LastAction::None => "",
        LastAction::Saved => "Saved",
        LastAction::Modified => "Modified",
        LastAction::FailedModified => "FailedModified",
        LastAction::FailedSaved => "FailedSaved",
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, ExportError> {
    let file = File::create(path).map_err(ExportError::Create)?;
    Ok(BufWriter::new(file))
}

fn write_json<T: Serialize>(rows: &[T], path: &Path) -> Result<(), ExportError> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.flush().map_err(ExportError::Flush)
}

pub fn export_records(
    records: &[ShortcutRecord],
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(create(path)?);

            writer.write_record([
                "shortcut_path",
                "file_name",
                "target_path",
                "availability",
                "target_size",
                "is_target_folder",
                "target_file_count",
                "last_action",
            ])?;

            for record in records {
                writer.write_record([
                    record.shortcut_path().to_string_lossy().to_string(),
                    record.file_name.clone(),
                    record.target_path.to_string_lossy().to_string(),
                    availability_to_string(record.availability).to_string(),
                    record.target_size.to_string(),
                    record.is_target_folder.to_string(),
                    record.target_file_count.to_string(),
                    last_action_to_string(record.last_action).to_string(),
                ])?;
            }

            writer.flush().map_err(ExportError::Flush)?;
        }
        ExportFormat::Json => write_json(records, path)?,
    }

    info!(rows = records.len(), path = %path.display(), ?format, "exported records");
    Ok(())
}

pub fn export_failures(
    failures: &[FailedFile],
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(create(path)?);

            writer.write_record(["path", "message"])?;
            for failure in failures {
                writer.write_record([
                    failure.path.to_string_lossy().to_string(),
                    failure.message.clone(),
                ])?;
            }

            writer.flush().map_err(ExportError::Flush)?;
        }
        ExportFormat::Json => write_json(failures, path)?,
    }

    info!(rows = failures.len(), path = %path.display(), ?format, "exported failures");
    Ok(())
}

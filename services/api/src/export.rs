use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use campus_housing::error::AppError;
use campus_housing::workflows::housing::{AllocationRecord, HousingSnapshot};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub(crate) struct ExportAllocationsArgs {
    /// JSON snapshot written by the service
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Destination CSV file (defaults to stdout)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

/// Flat ledger row for spreadsheet consumers.
#[derive(Debug, Serialize)]
struct AllocationRow<'a> {
    allocation_id: &'a str,
    request_id: &'a str,
    room_id: &'a str,
    building: &'a str,
    area: f64,
    allocation_type: &'static str,
    source: String,
    destination: String,
    effective_at: String,
    operator: &'a str,
    note: &'a str,
}

impl<'a> From<&'a AllocationRecord> for AllocationRow<'a> {
    fn from(record: &'a AllocationRecord) -> Self {
        Self {
            allocation_id: record.id.as_str(),
            request_id: record
                .request_id
                .as_ref()
                .map(|id| id.as_str())
                .unwrap_or_default(),
            room_id: record.room.room_id.as_str(),
            building: &record.room.building,
            area: record.room.area,
            allocation_type: record.allocation_type.label(),
            source: record
                .source
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            destination: record
                .destination
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            effective_at: record.effective_at.to_rfc3339(),
            operator: &record.operator,
            note: &record.note,
        }
    }
}

pub(crate) fn export_allocations(args: ExportAllocationsArgs) -> Result<(), AppError> {
    let snapshot = HousingSnapshot::from_path(&args.snapshot)?;

    match args.output {
        Some(path) => write_allocations(&snapshot.allocations, File::create(path)?),
        None => write_allocations(&snapshot.allocations, io::stdout().lock()),
    }
}

pub(crate) fn write_allocations<W: Write>(
    records: &[AllocationRecord],
    writer: W,
) -> Result<(), AppError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(AllocationRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

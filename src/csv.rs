use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::engine::BalanceEntry;
use crate::model::{Command, LeaveCandidate, LeaveType};
use crate::{Days, EmployeeId, LeaveTypeId, RequestId};

/// Errors that can occur when reading or writing csv files
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("{path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized command '{command}'")]
    UnrecognizedCommand { line: usize, command: String },

    #[error("line {line}: {command} missing {field}")]
    MissingField {
        line: usize,
        command: String,
        field: &'static str,
    },

    #[error("line {line}: {field} {value} is not a valid number of days")]
    InvalidDays {
        line: usize,
        field: &'static str,
        value: f64,
    },

    #[error("failed to write csv: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to write csv: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct LeaveTypeRow {
    id: LeaveTypeId,
    name: String,
    max_per_year: f64,
    accrual_rate: f64,
}

#[derive(Debug, Deserialize)]
struct EmployeeRow {
    employee: EmployeeId,
    active: bool,
}

#[derive(Debug, Deserialize)]
struct CommandRow {
    r#type: String,
    date: NaiveDate,
    request: Option<RequestId>,
    employee: Option<EmployeeId>,
    leave_type: Option<LeaveTypeId>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct BalanceRow {
    employee: EmployeeId,
    leave_type: LeaveTypeId,
    year: i32,
    allocated: String,
    used: String,
    available: String,
}

/// A command together with the business date it happens on.
#[derive(Debug, Clone)]
pub struct DatedCommand {
    pub date: NaiveDate,
    pub command: Command,
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, CsvError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })
}

/// Read rows of `T`, numbering errors by file line.
fn read_rows<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<impl Iterator<Item = (usize, Result<T, CsvError>)> + use<T>, CsvError> {
    Ok(open(path)?
        .into_deserialize::<T>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            (line, result.map_err(|source| CsvError::Parse { line, source }))
        }))
}

/// Read leave types from a csv file
pub fn read_leave_types(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<LeaveType, CsvError>>, CsvError> {
    let rows = read_rows::<LeaveTypeRow>(path.as_ref())?;
    Ok(rows.map(|(line, result)| -> Result<LeaveType, CsvError> {
        let row = result?;
        let days = |field, value| {
            Days::try_from_float(value).ok_or(CsvError::InvalidDays { line, field, value })
        };
        Ok(LeaveType {
            id: row.id,
            name: row.name,
            max_per_year: days("max_per_year", row.max_per_year)?,
            accrual_rate: days("accrual_rate", row.accrual_rate)?,
        })
    }))
}

/// Read employees and their active flag from a csv file
pub fn read_employees(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<(EmployeeId, bool), CsvError>>, CsvError> {
    Ok(read_rows::<EmployeeRow>(path.as_ref())?
        .map(|(_, result)| result.map(|row| (row.employee, row.active))))
}

/// Read engine commands from a csv file
pub fn read_commands(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<DatedCommand, CsvError>>, CsvError> {
    Ok(read_rows::<CommandRow>(path.as_ref())?
        .map(|(line, result)| parse_command(line, result?)))
}

fn parse_command(line: usize, row: CommandRow) -> Result<DatedCommand, CsvError> {
    let missing = |field| CsvError::MissingField {
        line,
        command: row.r#type.clone(),
        field,
    };

    let command = match row.r#type.as_str() {
        "submit" => Command::Submit(LeaveCandidate {
            id: row.request.ok_or_else(|| missing("request"))?,
            employee: row.employee.ok_or_else(|| missing("employee"))?,
            leave_type: row.leave_type,
            start: row.start,
            end: row.end,
            reason: row.reason.clone().unwrap_or_default(),
        }),
        "approve" => Command::Approve {
            request: row.request.ok_or_else(|| missing("request"))?,
        },
        "reject" => Command::Reject {
            request: row.request.ok_or_else(|| missing("request"))?,
        },
        "cancel" => Command::Cancel {
            request: row.request.ok_or_else(|| missing("request"))?,
        },
        "accrue" => Command::Accrue { as_of: row.date },
        other => {
            return Err(CsvError::UnrecognizedCommand {
                line,
                command: other.to_string(),
            });
        }
    };

    Ok(DatedCommand {
        date: row.date,
        command,
    })
}

/// Write balances in csv format
pub fn write_balances<W: io::Write>(
    writer: W,
    balances: impl IntoIterator<Item = BalanceEntry>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for entry in balances {
        let key = entry.key();
        writer.serialize(BalanceRow {
            employee: key.employee,
            leave_type: key.leave_type,
            year: key.year,
            allocated: entry.total_allocated().to_string(),
            used: entry.used().to_string(),
            available: entry.available().to_string(),
        })?;
    }

    writer.flush()?;
    Ok(())
}

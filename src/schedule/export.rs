//! CSV export of installment lines

use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::Writer;
use serde::Serialize;

use super::installment::InstallmentLine;

/// Output row, one per installment, amounts rounded to cents
#[derive(Debug, Serialize)]
struct ScheduleRow {
    #[serde(rename = "Installment")]
    index: u32,
    #[serde(rename = "OpeningBalance")]
    opening_balance: f64,
    #[serde(rename = "Correction")]
    correction: f64,
    #[serde(rename = "Interest")]
    interest: f64,
    #[serde(rename = "Amortization")]
    amortization: f64,
    #[serde(rename = "MIP")]
    insurance_mip: f64,
    #[serde(rename = "DFI")]
    insurance_dfi: f64,
    #[serde(rename = "TotalPayment")]
    total_payment: f64,
    #[serde(rename = "ClosingBalance")]
    outstanding_balance_after: f64,
}

impl From<&InstallmentLine> for ScheduleRow {
    fn from(line: &InstallmentLine) -> Self {
        use crate::rates::round_cents;
        Self {
            index: line.index,
            opening_balance: round_cents(line.opening_balance),
            correction: round_cents(line.correction),
            interest: round_cents(line.interest),
            amortization: round_cents(line.amortization),
            insurance_mip: round_cents(line.insurance_mip),
            insurance_dfi: round_cents(line.insurance_dfi),
            total_payment: round_cents(line.total_payment),
            outstanding_balance_after: round_cents(line.outstanding_balance_after),
        }
    }
}

/// Write installment lines as CSV to any writer
pub fn write_schedule_csv<W: Write>(lines: &[InstallmentLine], writer: W) -> Result<(), Box<dyn Error>> {
    let mut csv_writer = Writer::from_writer(writer);
    for line in lines {
        csv_writer.serialize(ScheduleRow::from(line))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write installment lines to a CSV file
pub fn export_schedule_csv<P: AsRef<Path>>(lines: &[InstallmentLine], path: P) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    write_schedule_csv(lines, file)
}

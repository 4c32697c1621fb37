//! Lender configuration loaders
//!
//! Lender profiles come from JSON; subsidized-program brackets come from a CSV table keyed
//! by lender id, so the policy thresholds can be versioned apart from the engine.

use std::collections::BTreeMap;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use csv::Reader;

use super::profile::{IncomeBracketRule, LenderProfile, ProgramTiers};

/// Raw CSV row matching program_tiers.csv columns
#[derive(Debug, serde::Deserialize)]
struct TierRow {
    #[serde(rename = "LenderId")]
    lender_id: String,
    #[serde(rename = "Label")]
    label: String,
    #[serde(rename = "MinIncome")]
    min_income: f64,
    #[serde(rename = "MaxIncome")]
    max_income: f64,
    #[serde(rename = "MinPropertyValue")]
    min_property_value: Option<f64>,
    #[serde(rename = "MaxPropertyValue")]
    max_property_value: Option<f64>,
    #[serde(rename = "AnnualRate")]
    annual_rate_pct: f64,
    #[serde(rename = "FinancingCap")]
    financing_cap: f64,
}

impl TierRow {
    fn into_rule(self) -> Result<(String, IncomeBracketRule), Box<dyn Error>> {
        if self.min_income > self.max_income {
            return Err(format!(
                "{} / {}: income bounds {} > {}",
                self.lender_id, self.label, self.min_income, self.max_income
            )
            .into());
        }
        if !(0.0..=1.0).contains(&self.financing_cap) {
            return Err(format!("{} / {}: financing cap {} outside [0, 1]", self.lender_id, self.label, self.financing_cap).into());
        }

        Ok((
            self.lender_id,
            IncomeBracketRule {
                label: self.label,
                min_income: self.min_income,
                max_income: self.max_income,
                min_property_value: self.min_property_value,
                max_property_value: self.max_property_value,
                special_annual_rate_pct: self.annual_rate_pct,
                financing_ratio_cap: self.financing_cap,
            },
        ))
    }
}

/// Load lender profiles from a JSON array
pub fn load_lenders<P: AsRef<Path>>(path: P) -> Result<Vec<LenderProfile>, Box<dyn Error>> {
    let file = File::open(path)?;
    load_lenders_from_reader(BufReader::new(file))
}

/// Load lender profiles from any reader
pub fn load_lenders_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<LenderProfile>, Box<dyn Error>> {
    let lenders: Vec<LenderProfile> = serde_json::from_reader(reader)?;

    for lender in &lenders {
        if !(0.0..=1.0).contains(&lender.max_financing_ratio) {
            return Err(format!("{}: max_financing_ratio {} outside [0, 1]", lender.id, lender.max_financing_ratio).into());
        }
    }

    Ok(lenders)
}

/// Load program brackets grouped by lender id, in file order
pub fn load_program_tiers<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, ProgramTiers>, Box<dyn Error>> {
    let mut reader = Reader::from_path(path)?;
    collect_tiers(&mut reader)
}

/// Load program brackets from any reader
pub fn load_program_tiers_from_reader<R: std::io::Read>(
    reader: R,
) -> Result<BTreeMap<String, ProgramTiers>, Box<dyn Error>> {
    let mut csv_reader = Reader::from_reader(reader);
    collect_tiers(&mut csv_reader)
}

fn collect_tiers<R: std::io::Read>(reader: &mut Reader<R>) -> Result<BTreeMap<String, ProgramTiers>, Box<dyn Error>> {
    let mut tiers: BTreeMap<String, ProgramTiers> = BTreeMap::new();

    for result in reader.deserialize() {
        let row: TierRow = result?;
        let (lender_id, rule) = row.into_rule()?;
        tiers.entry(lender_id).or_default().brackets.push(rule);
    }

    Ok(tiers)
}

/// Replace each lender's program tiers with the loaded table, where one exists
pub fn attach_program_tiers(lenders: &mut [LenderProfile], mut tiers: BTreeMap<String, ProgramTiers>) {
    for lender in lenders.iter_mut() {
        if let Some(t) = tiers.remove(&lender.id) {
            lender.program_tiers = Some(t);
        }
    }
}

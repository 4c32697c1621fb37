//! Built-in lender catalog
//!
//! Mirrors `data/lenders.json` and `data/program_tiers.csv` so a simulation can run
//! without touching the filesystem.

use std::collections::BTreeMap;
use std::path::Path;

use super::insurance::{AgeBand, AgeRate, InsuranceTable, MipTable};
use super::loader;
use super::profile::{
    AmortizationSystem, CorrectionIndex, IncomeBracketRule, LenderProfile, ProgramTiers, PropertyType, RateTable,
};

/// Default path to the lender data directory
pub const DEFAULT_LENDER_DATA_PATH: &str = "data";

/// Set of configured lenders, keyed by id
#[derive(Debug, Clone, Default)]
pub struct LenderCatalog {
    lenders: BTreeMap<String, LenderProfile>,
}

impl LenderCatalog {
    pub fn new(lenders: Vec<LenderProfile>) -> Self {
        Self {
            lenders: lenders.into_iter().map(|l| (l.id.clone(), l)).collect(),
        }
    }

    /// Load lenders and program tiers from the default data directory
    pub fn from_data_dir() -> Result<Self, Box<dyn std::error::Error>> {
        Self::from_path(Path::new(DEFAULT_LENDER_DATA_PATH))
    }

    /// Load `lenders.json` and, when present, `program_tiers.csv` from a directory
    pub fn from_path(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let mut lenders = loader::load_lenders(path.join("lenders.json"))?;

        let tiers_path = path.join("program_tiers.csv");
        if tiers_path.exists() {
            let tiers = loader::load_program_tiers(&tiers_path)?;
            loader::attach_program_tiers(&mut lenders, tiers);
        }

        Ok(Self::new(lenders))
    }

    /// Catalog with the five built-in lenders
    pub fn default_catalog() -> Self {
        Self::new(vec![caixa(), itau(), bradesco(), santander(), banco_do_brasil()])
    }

    pub fn get(&self, id: &str) -> Option<&LenderProfile> {
        self.lenders.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.lenders.keys().map(String::as_str)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &LenderProfile> {
        self.lenders.values()
    }

    pub fn len(&self) -> usize {
        self.lenders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lenders.is_empty()
    }

    /// Add or replace a lender
    pub fn insert(&mut self, profile: LenderProfile) {
        self.lenders.insert(profile.id.clone(), profile);
    }
}

/// Subsidized program brackets offered by the public bank
pub fn default_program_tiers() -> ProgramTiers {
    let tier = |label: &str, min: f64, max: f64, max_value: f64, rate: f64, cap: f64| IncomeBracketRule {
        label: label.to_string(),
        min_income: min,
        max_income: max,
        min_property_value: None,
        max_property_value: Some(max_value),
        special_annual_rate_pct: rate,
        financing_ratio_cap: cap,
    };

    ProgramTiers::new(vec![
        tier("Faixa 1", 0.0, 2_850.0, 264_000.0, 4.25, 0.95),
        tier("Faixa 2", 2_850.0, 4_700.0, 264_000.0, 6.50, 0.90),
        tier("Faixa 3", 4_700.0, 8_600.0, 350_000.0, 8.16, 0.80),
        tier("Faixa 4", 8_600.0, 12_000.0, 500_000.0, 10.00, 0.80),
    ])
}

fn standard_dfi() -> BTreeMap<PropertyType, f64> {
    BTreeMap::from([(PropertyType::Residential, 0.00120), (PropertyType::Commercial, 0.00240)])
}

fn caixa() -> LenderProfile {
    LenderProfile {
        id: "caixa".to_string(),
        display_name: "Caixa Econômica Federal".to_string(),
        max_financing_ratio: 0.80,
        min_down_payment_ratio: 0.20,
        special_max_term_months: None,
        unsupported_indices: Vec::new(),
        rate_table: RateTable::new()
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Tr, 10.99)
            .with_rate(AmortizationSystem::Price, CorrectionIndex::Tr, 11.29)
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Poupanca, 9.75)
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Ipca, 4.95),
        insurance: InsuranceTable {
            mip: MipTable::FloorMap {
                rates: vec![
                    AgeRate { age: 18, rate: 0.00110 },
                    AgeRate { age: 31, rate: 0.00160 },
                    AgeRate { age: 41, rate: 0.00290 },
                    AgeRate { age: 51, rate: 0.00620 },
                    AgeRate { age: 61, rate: 0.01250 },
                    AgeRate { age: 71, rate: 0.02300 },
                ],
            },
            dfi: standard_dfi(),
        },
        system_overrides: BTreeMap::from([(AmortizationSystem::Price, 0.70)]),
        program_tiers: Some(default_program_tiers()),
    }
}

fn itau() -> LenderProfile {
    LenderProfile {
        id: "itau".to_string(),
        display_name: "Itaú Unibanco".to_string(),
        max_financing_ratio: 0.90,
        min_down_payment_ratio: 0.10,
        special_max_term_months: None,
        unsupported_indices: vec![CorrectionIndex::Poupanca],
        rate_table: RateTable::new()
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Tr, 11.60)
            .with_rate(AmortizationSystem::Price, CorrectionIndex::Tr, 11.90)
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Fixed, 12.50),
        insurance: InsuranceTable {
            mip: MipTable::Bands {
                bands: vec![
                    AgeBand { min_age: 18, max_age: Some(30), rate: 0.00100 },
                    AgeBand { min_age: 31, max_age: Some(40), rate: 0.00150 },
                    AgeBand { min_age: 41, max_age: Some(50), rate: 0.00280 },
                    AgeBand { min_age: 51, max_age: Some(60), rate: 0.00600 },
                    AgeBand { min_age: 61, max_age: Some(80), rate: 0.01400 },
                ],
            },
            dfi: standard_dfi(),
        },
        system_overrides: BTreeMap::new(),
        program_tiers: None,
    }
}

fn bradesco() -> LenderProfile {
    LenderProfile {
        id: "bradesco".to_string(),
        display_name: "Bradesco".to_string(),
        max_financing_ratio: 0.80,
        min_down_payment_ratio: 0.20,
        special_max_term_months: None,
        unsupported_indices: Vec::new(),
        rate_table: RateTable::new()
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Tr, 11.70)
            .with_rate(AmortizationSystem::Price, CorrectionIndex::Tr, 12.00)
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Ipca, 6.50),
        insurance: InsuranceTable {
            mip: MipTable::Bands {
                bands: vec![
                    AgeBand { min_age: 18, max_age: Some(35), rate: 0.00130 },
                    AgeBand { min_age: 36, max_age: Some(50), rate: 0.00260 },
                    AgeBand { min_age: 51, max_age: None, rate: 0.01100 },
                ],
            },
            dfi: BTreeMap::from([(PropertyType::Residential, 0.00110)]),
        },
        system_overrides: BTreeMap::new(),
        program_tiers: None,
    }
}

fn santander() -> LenderProfile {
    LenderProfile {
        id: "santander".to_string(),
        display_name: "Santander".to_string(),
        max_financing_ratio: 0.80,
        min_down_payment_ratio: 0.20,
        special_max_term_months: Some(300),
        unsupported_indices: Vec::new(),
        rate_table: RateTable::new()
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Tr, 11.79)
            .with_rate(AmortizationSystem::Price, CorrectionIndex::Tr, 12.09),
        insurance: InsuranceTable {
            mip: MipTable::FloorMap {
                rates: vec![
                    AgeRate { age: 18, rate: 0.00120 },
                    AgeRate { age: 36, rate: 0.00210 },
                    AgeRate { age: 46, rate: 0.00400 },
                    AgeRate { age: 56, rate: 0.00900 },
                    AgeRate { age: 66, rate: 0.01800 },
                ],
            },
            dfi: standard_dfi(),
        },
        system_overrides: BTreeMap::from([(AmortizationSystem::Price, 0.75)]),
        program_tiers: None,
    }
}

fn banco_do_brasil() -> LenderProfile {
    LenderProfile {
        id: "banco_do_brasil".to_string(),
        display_name: "Banco do Brasil".to_string(),
        max_financing_ratio: 0.80,
        min_down_payment_ratio: 0.20,
        special_max_term_months: None,
        unsupported_indices: Vec::new(),
        rate_table: RateTable::new()
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Tr, 11.50)
            .with_rate(AmortizationSystem::Sac, CorrectionIndex::Poupanca, 9.90),
        insurance: InsuranceTable {
            mip: MipTable::Bands {
                bands: vec![
                    AgeBand { min_age: 18, max_age: Some(40), rate: 0.00140 },
                    AgeBand { min_age: 41, max_age: Some(60), rate: 0.00450 },
                    AgeBand { min_age: 61, max_age: Some(80), rate: 0.01600 },
                ],
            },
            dfi: standard_dfi(),
        },
        system_overrides: BTreeMap::new(),
        program_tiers: Some(default_program_tiers()),
    }
}

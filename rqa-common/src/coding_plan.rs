//! Coding plans: how every raw field of the dataset is coded, folded and exported
//!
//! A [`CodingPlan`] describes one variable (a radio show question or a survey
//! question): the raw field holding the respondent's text, the
//! [`CodingConfiguration`]s whose labels code it, how the raw field folds
//! across messages, and an optional imputation step.
//!
//! Plans are declared in TOML and reference code schemes by registry key:
//!
//! ```toml
//! [[rqa_coding_plans]]
//! raw_field = "rqa_s04e01_raw"
//! time_field = "sent_on"
//! coda_filename = "s04e01.json"
//! raw_field_folding_mode = "CONCATENATE"
//!
//! [[rqa_coding_plans.coding_configurations]]
//! coding_mode = "MULTIPLE"
//! code_scheme = "s04e01_reasons"
//! coded_field = "rqa_s04e01_coded"
//! analysis_file_key = "rqa_s04e01_"
//! folding_mode = "MATRIX"
//! ```
//!
//! Pairing rules checked at load: MULTIPLE coding always folds as MATRIX,
//! SINGLE coding folds as ASSERT_EQUAL or YES_NO_AMB.

use crate::code_scheme::CodeScheme;
use crate::registry::CodeSchemeRegistry;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Number of levels in the location hierarchy (sub-district → zone)
pub const LOCATION_LEVELS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodingMode {
    Single,
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FoldingMode {
    AssertEqual,
    YesNoAmb,
    Concatenate,
    Matrix,
}

/// Derived-code step attached to a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodeImputation {
    /// Configurations are the location hierarchy in order: Mogadishu
    /// sub-district, district, region, state, zone. When the plan's raw field
    /// is absent, zone is derived from the operator coded field.
    SomaliaLocation {
        #[serde(default)]
        operator_coded_field: Option<String>,
    },
    /// Configurations are `[age, age_category]`
    AgeCategory,
}

/// Upstream text cleaner, applied before labelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cleaner {
    /// First integer in the text, kept only when 10 <= age < 100
    AgeWithRangeFilter,
}

impl Cleaner {
    /// Clean raw text into a matchable string; `None` means "not coded"
    pub fn clean(self, text: &str) -> Option<String> {
        match self {
            Cleaner::AgeWithRangeFilter => {
                let digits: String = text
                    .chars()
                    .skip_while(|c| !c.is_ascii_digit())
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                let age: u32 = digits.parse().ok()?;
                (10..100).contains(&age).then(|| age.to_string())
            }
        }
    }
}

/// Binds one coded field to one code scheme
#[derive(Debug, Clone)]
pub struct CodingConfiguration {
    pub coding_mode: CodingMode,
    pub code_scheme: Arc<CodeScheme>,
    pub coded_field: String,
    pub analysis_file_key: Option<String>,
    pub folding_mode: FoldingMode,
    pub cleaner: Option<Cleaner>,
}

impl CodingConfiguration {
    /// Output columns produced by this configuration (empty if not exported)
    ///
    /// SINGLE produces the analysis key itself, MULTIPLE one matrix column per code.
    pub fn analysis_columns(&self) -> Vec<String> {
        let Some(key) = &self.analysis_file_key else {
            return Vec::new();
        };
        match self.coding_mode {
            CodingMode::Single => vec![key.clone()],
            CodingMode::Multiple => self
                .code_scheme
                .codes()
                .iter()
                .map(|code| format!("{}{}", key, code.string_value))
                .collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        let ok = match self.coding_mode {
            CodingMode::Multiple => self.folding_mode == FoldingMode::Matrix,
            CodingMode::Single => {
                matches!(self.folding_mode, FoldingMode::AssertEqual | FoldingMode::YesNoAmb)
            }
        };
        if !ok {
            return Err(Error::Config(format!(
                "coded field '{}': coding mode {:?} cannot fold as {:?}",
                self.coded_field, self.coding_mode, self.folding_mode
            )));
        }
        Ok(())
    }
}

/// One variable of the dataset
#[derive(Debug, Clone)]
pub struct CodingPlan {
    pub raw_field: String,
    pub time_field: Option<String>,
    pub coda_filename: String,
    pub id_field: String,
    pub coding_configurations: Vec<CodingConfiguration>,
    pub raw_field_folding_mode: FoldingMode,
    pub code_imputation: Option<CodeImputation>,
}

impl CodingPlan {
    fn validate(&self) -> Result<()> {
        for cc in &self.coding_configurations {
            cc.validate()?;
        }

        if !matches!(
            self.raw_field_folding_mode,
            FoldingMode::AssertEqual | FoldingMode::Concatenate
        ) {
            return Err(Error::Config(format!(
                "plan '{}': raw text cannot fold as {:?}",
                self.raw_field, self.raw_field_folding_mode
            )));
        }

        match &self.code_imputation {
            Some(CodeImputation::SomaliaLocation { .. }) => {
                if self.coding_configurations.len() != LOCATION_LEVELS {
                    return Err(Error::Config(format!(
                        "plan '{}': location imputation needs {} configurations, found {}",
                        self.raw_field,
                        LOCATION_LEVELS,
                        self.coding_configurations.len()
                    )));
                }
            }
            Some(CodeImputation::AgeCategory) => {
                if self.coding_configurations.len() != 2 {
                    return Err(Error::Config(format!(
                        "plan '{}': age category imputation needs [age, age_category] configurations",
                        self.raw_field
                    )));
                }
            }
            None => {}
        }

        if self.code_imputation.is_some()
            && self
                .coding_configurations
                .iter()
                .any(|cc| cc.coding_mode != CodingMode::Single)
        {
            return Err(Error::Config(format!(
                "plan '{}': imputed configurations must be SINGLE coded",
                self.raw_field
            )));
        }
        Ok(())
    }
}

// ============================================================================
// TOML definitions
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigurationDef {
    coding_mode: CodingMode,
    code_scheme: String,
    coded_field: String,
    #[serde(default)]
    analysis_file_key: Option<String>,
    folding_mode: FoldingMode,
    #[serde(default)]
    cleaner: Option<Cleaner>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanDef {
    raw_field: String,
    #[serde(default)]
    time_field: Option<String>,
    coda_filename: String,
    #[serde(default)]
    id_field: Option<String>,
    raw_field_folding_mode: FoldingMode,
    #[serde(default)]
    code_imputation: Option<CodeImputation>,
    #[serde(default)]
    coding_configurations: Vec<ConfigurationDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlansFile {
    #[serde(default)]
    rqa_coding_plans: Vec<PlanDef>,
    #[serde(default)]
    survey_coding_plans: Vec<PlanDef>,
}

impl PlanDef {
    fn resolve(self, registry: &CodeSchemeRegistry) -> Result<CodingPlan> {
        let coding_configurations = self
            .coding_configurations
            .into_iter()
            .map(|def| -> Result<CodingConfiguration> {
                Ok(CodingConfiguration {
                    coding_mode: def.coding_mode,
                    code_scheme: registry.get(&def.code_scheme)?,
                    coded_field: def.coded_field,
                    analysis_file_key: def.analysis_file_key,
                    folding_mode: def.folding_mode,
                    cleaner: def.cleaner,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let id_field = self
            .id_field
            .unwrap_or_else(|| format!("{}_id", self.raw_field));

        Ok(CodingPlan {
            raw_field: self.raw_field,
            time_field: self.time_field,
            coda_filename: self.coda_filename,
            id_field,
            coding_configurations,
            raw_field_folding_mode: self.raw_field_folding_mode,
            code_imputation: self.code_imputation,
        })
    }
}

// ============================================================================
// Plan collection
// ============================================================================

/// Every coding plan of the project: radio show questions first, then surveys
#[derive(Debug, Clone, Default)]
pub struct CodingPlans {
    pub rqa: Vec<CodingPlan>,
    pub survey: Vec<CodingPlan>,
}

impl CodingPlans {
    pub fn new(rqa: Vec<CodingPlan>, survey: Vec<CodingPlan>) -> Result<Self> {
        let plans = Self { rqa, survey };
        plans.validate()?;
        Ok(plans)
    }

    /// Parse TOML plan definitions, resolving scheme names against `registry`
    pub fn from_toml_str(toml_str: &str, registry: &CodeSchemeRegistry) -> Result<Self> {
        let file: PlansFile = toml::from_str(toml_str)?;
        let rqa = file
            .rqa_coding_plans
            .into_iter()
            .map(|def| def.resolve(registry))
            .collect::<Result<Vec<_>>>()?;
        let survey = file
            .survey_coding_plans
            .into_iter()
            .map(|def| def.resolve(registry))
            .collect::<Result<Vec<_>>>()?;
        Self::new(rqa, survey)
    }

    pub fn load(path: &Path, registry: &CodeSchemeRegistry) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read coding plans {}: {}", path.display(), e))
        })?;
        let plans = Self::from_toml_str(&content, registry)?;
        info!(
            "Loaded {} RQA and {} survey coding plans from {}",
            plans.rqa.len(),
            plans.survey.len(),
            path.display()
        );
        Ok(plans)
    }

    /// All plans, RQA plans first
    pub fn all(&self) -> impl Iterator<Item = &CodingPlan> {
        self.rqa.iter().chain(self.survey.iter())
    }

    /// All coding configurations of all plans, in plan order
    pub fn configurations(&self) -> impl Iterator<Item = &CodingConfiguration> {
        self.all().flat_map(|plan| plan.coding_configurations.iter())
    }

    /// Find the configuration that writes `coded_field`
    pub fn configuration_for(&self, coded_field: &str) -> Option<&CodingConfiguration> {
        self.configurations().find(|cc| cc.coded_field == coded_field)
    }

    fn validate(&self) -> Result<()> {
        let mut raw_fields = HashSet::new();
        let mut coded_fields = HashSet::new();
        let mut analysis_keys = HashSet::new();

        for plan in self.all() {
            plan.validate()?;
            if !raw_fields.insert(plan.raw_field.as_str()) {
                return Err(Error::Config(format!("raw field '{}' declared twice", plan.raw_field)));
            }
            for cc in &plan.coding_configurations {
                if !coded_fields.insert(cc.coded_field.as_str()) {
                    return Err(Error::Config(format!(
                        "coded field '{}' declared twice",
                        cc.coded_field
                    )));
                }
                if let Some(key) = &cc.analysis_file_key {
                    if !analysis_keys.insert(key.as_str()) {
                        return Err(Error::Config(format!("analysis file key '{}' declared twice", key)));
                    }
                }
            }

            if let Some(CodeImputation::SomaliaLocation {
                operator_coded_field: Some(operator),
            }) = &plan.code_imputation
            {
                if self.configuration_for(operator).is_none() {
                    return Err(Error::Config(format!(
                        "plan '{}': operator coded field '{}' is not configured",
                        plan.raw_field, operator
                    )));
                }
            }
        }
        Ok(())
    }
}

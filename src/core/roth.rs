use serde::{Deserialize, Serialize};

use super::engine::{evaluate_composition, project_composition};
use super::error::EstateError;
use super::types::{EstateInputs, ProjectionResult};

/// One year of balances produced by the retirement-income engine.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RothConversionYear {
    pub age: u32,
    pub tax_deferred_balance: f64,
    pub roth_balance: f64,
    #[serde(default)]
    pub taxable_balance: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct RothConversionProjection {
    years: Vec<RothConversionYear>,
}

impl RothConversionProjection {
    pub fn new(mut years: Vec<RothConversionYear>) -> Self {
        years.sort_by_key(|year| year.age);
        Self { years }
    }

    pub fn years(&self) -> &[RothConversionYear] {
        &self.years
    }

    /// Exact row for `age`, otherwise the row with the nearest age.
    /// Ties go to the earlier age.
    pub fn balances_at_age(&self, age: u32) -> Option<&RothConversionYear> {
        self.years.iter().min_by_key(|year| year.age.abs_diff(age))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RothOverlayResult {
    pub death_age: u32,
    pub matched_age: u32,
    pub baseline: ProjectionResult,
    pub with_conversions: ProjectionResult,
    /// Positive when conversions raise the combined estate tax.
    pub estate_tax_delta: f64,
    pub heir_income_tax_savings: f64,
    pub net_after_income_tax_gain: f64,
}

pub fn apply_roth_overlay(
    inputs: &EstateInputs,
    projection: &RothConversionProjection,
) -> Result<RothOverlayResult, EstateError> {
    let death_age = inputs.assumptions.death_age;
    let row = projection
        .balances_at_age(death_age)
        .ok_or(EstateError::EmptyRothProjection)?;

    let baseline_composition = project_composition(inputs);
    let baseline = evaluate_composition(&baseline_composition, inputs);

    let mut converted = baseline_composition;
    converted.tax_deferred_accounts = row.tax_deferred_balance.max(0.0);
    converted.roth_accounts = row.roth_balance.max(0.0);
    if let Some(taxable) = row.taxable_balance {
        converted.taxable_investments = taxable.max(0.0);
    }
    let with_conversions = evaluate_composition(&converted, inputs);

    tracing::debug!(
        death_age,
        matched_age = row.age,
        baseline_total_tax = baseline.total_tax,
        converted_total_tax = with_conversions.total_tax,
        "applied roth conversion overlay"
    );

    Ok(RothOverlayResult {
        death_age,
        matched_age: row.age,
        estate_tax_delta: with_conversions.total_tax - baseline.total_tax,
        heir_income_tax_savings: baseline.heir_income_tax - with_conversions.heir_income_tax,
        net_after_income_tax_gain: with_conversions.net_after_income_tax
            - baseline.net_after_income_tax,
        baseline,
        with_conversions,
    })
}

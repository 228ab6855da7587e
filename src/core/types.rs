use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaritalStatus {
    Single,
    Married,
    Widowed,
}

#[derive(Debug, Clone)]
pub struct EstateProfile {
    pub cash: f64,
    pub taxable_investments: f64,
    pub tax_deferred_accounts: f64,
    pub roth_accounts: f64,
    pub real_estate: f64,
    pub business_interests: f64,
    pub personal_property: f64,
    /// Policies owned by the decedent; these sit inside the taxable estate.
    pub life_insurance: f64,
    pub liabilities: f64,
    pub marital_status: MaritalStatus,
    pub state: String,
    /// Informational only. Age arithmetic reads `AssumptionInputs::current_age`.
    pub birth_year: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct StrategyInputs {
    pub bypass_trust: bool,
    pub ilit_death_benefit: f64,
    pub lifetime_gifts: f64,
    /// Gifted every year between now and the assumed death year.
    pub annual_gifts: f64,
    pub trust_funding: f64,
    pub charitable_bequest: f64,
}

#[derive(Debug, Clone)]
pub struct AssumptionInputs {
    pub current_age: u32,
    pub death_age: u32,
    pub current_year: i32,
    pub liquidity_target: f64,
    pub state_override: Option<String>,
    pub heir_income_tax_rate: f64,
    pub portability_elected: bool,
    pub dsue_amount: f64,
    pub asset_growth_rate: f64,
    pub settlement_cost_rate: f64,
}

#[derive(Debug, Clone)]
pub struct EstateInputs {
    pub profile: EstateProfile,
    pub strategy: StrategyInputs,
    pub assumptions: AssumptionInputs,
}

impl EstateInputs {
    pub fn years_until_death(&self) -> u32 {
        self.assumptions
            .death_age
            .saturating_sub(self.assumptions.current_age)
    }

    pub fn death_year(&self) -> i32 {
        let years = i32::try_from(self.years_until_death()).unwrap_or(i32::MAX);
        self.assumptions.current_year.saturating_add(years)
    }

    /// State whose estate tax applies: the override when present, else residence.
    pub fn resolved_state(&self) -> &str {
        self.assumptions
            .state_override
            .as_deref()
            .unwrap_or(&self.profile.state)
    }
}

/// Balances at the assumed death year, in nominal dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstateComposition {
    pub cash: f64,
    pub taxable_investments: f64,
    pub tax_deferred_accounts: f64,
    pub roth_accounts: f64,
    pub real_estate: f64,
    pub business_interests: f64,
    pub personal_property: f64,
    pub life_insurance: f64,
    pub liabilities: f64,
}

impl EstateComposition {
    pub fn total_assets(&self) -> f64 {
        self.cash
            + self.taxable_investments
            + self.tax_deferred_accounts
            + self.roth_accounts
            + self.real_estate
            + self.business_interests
            + self.personal_property
            + self.life_insurance
    }

    pub fn gross_value(&self) -> f64 {
        (self.total_assets() - self.liabilities).max(0.0)
    }

    pub fn liquid_assets(&self) -> f64 {
        self.cash + self.taxable_investments + self.roth_accounts + self.life_insurance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionBreakdown {
    pub lifetime_gifts: f64,
    pub annual_gifts: f64,
    pub trust_funding: f64,
    pub charitable_bequest: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityAnalysis {
    pub settlement_costs: f64,
    pub required: f64,
    pub available: f64,
    pub gap: f64,
    pub surplus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharitableImpact {
    pub bequest: f64,
    pub tax_savings: f64,
    pub net_cost_to_heirs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub death_year: i32,
    pub years_until_death: u32,
    pub composition: EstateComposition,
    pub projected_estate_value: f64,
    pub deductions: DeductionBreakdown,
    pub taxable_estate: f64,
    pub federal_basic_exclusion: f64,
    pub dsue_applied: f64,
    pub federal_exemption: f64,
    pub federal_tax: f64,
    pub state_code: String,
    pub state_exemption: f64,
    pub state_tax: f64,
    pub total_tax: f64,
    pub effective_tax_rate: f64,
    pub net_to_heirs: f64,
    pub liquidity: LiquidityAnalysis,
    pub heir_income_tax: f64,
    pub net_after_income_tax: f64,
    pub charitable_impact: CharitableImpact,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub without_planning: ProjectionResult,
    pub with_planning: ProjectionResult,
    pub tax_savings: f64,
    pub additional_to_heirs: f64,
}

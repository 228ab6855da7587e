use super::tax::{applicable_exclusion, federal_estate_tax, state_estate_tax, state_schedule};
use super::types::{
    CharitableImpact, DeductionBreakdown, EstateComposition, EstateInputs, LiquidityAnalysis,
    ProjectionResult, StrategyComparison, StrategyInputs,
};

#[derive(Debug, Clone, Copy)]
struct TaxOutcome {
    taxable_estate: f64,
    federal_tax: f64,
    state_tax: f64,
}

impl TaxOutcome {
    fn total(self) -> f64 {
        self.federal_tax + self.state_tax
    }
}

pub fn calculate_estate_projection(inputs: &EstateInputs) -> ProjectionResult {
    let composition = project_composition(inputs);
    evaluate_composition(&composition, inputs)
}

/// Grows every asset class to the assumed death year. Liabilities stay flat.
pub fn project_composition(inputs: &EstateInputs) -> EstateComposition {
    let profile = &inputs.profile;
    let factor = growth_factor(
        inputs.assumptions.asset_growth_rate,
        inputs.years_until_death(),
    );
    let grow = |value: f64| value.max(0.0) * factor;

    EstateComposition {
        cash: grow(profile.cash),
        taxable_investments: grow(profile.taxable_investments),
        tax_deferred_accounts: grow(profile.tax_deferred_accounts),
        roth_accounts: grow(profile.roth_accounts),
        real_estate: grow(profile.real_estate),
        business_interests: grow(profile.business_interests),
        personal_property: grow(profile.personal_property),
        life_insurance: grow(profile.life_insurance),
        liabilities: profile.liabilities.max(0.0),
    }
}

pub fn evaluate_composition(
    composition: &EstateComposition,
    inputs: &EstateInputs,
) -> ProjectionResult {
    let strategy = &inputs.strategy;
    let assumptions = &inputs.assumptions;
    let years_until_death = inputs.years_until_death();
    let death_year = inputs.death_year();
    let state_code = inputs.resolved_state().to_ascii_uppercase();

    let gross = composition.gross_value();
    let deductions = deduction_breakdown(strategy, years_until_death);

    let exclusion = applicable_exclusion(
        death_year,
        inputs.profile.marital_status,
        strategy.bypass_trust,
        assumptions.portability_elected,
        assumptions.dsue_amount,
    );
    let federal_exemption = exclusion.total();

    let taxes = tax_outcome(gross, deductions.total, federal_exemption, &state_code);
    let total_tax = taxes.total();

    let charitable_bequest = deductions.charitable_bequest;
    let without_bequest = tax_outcome(
        gross,
        deductions.total - charitable_bequest,
        federal_exemption,
        &state_code,
    );
    let tax_savings = (without_bequest.total() - total_tax).max(0.0);

    let settlement_costs = gross * assumptions.settlement_cost_rate.max(0.0);
    let liquidity = liquidity_analysis(
        composition,
        strategy,
        total_tax,
        settlement_costs,
        assumptions.liquidity_target,
    );

    let heir_income_tax = composition.tax_deferred_accounts.max(0.0)
        * assumptions.heir_income_tax_rate.clamp(0.0, 1.0);
    let net_to_heirs = (taxes.taxable_estate - total_tax).max(0.0);
    let net_after_income_tax = (net_to_heirs - heir_income_tax).max(0.0);
    let effective_tax_rate = if gross > 0.0 { total_tax / gross } else { 0.0 };

    ProjectionResult {
        death_year,
        years_until_death,
        composition: *composition,
        projected_estate_value: gross,
        deductions,
        taxable_estate: taxes.taxable_estate,
        federal_basic_exclusion: exclusion.basic,
        dsue_applied: exclusion.dsue_applied,
        federal_exemption,
        federal_tax: taxes.federal_tax,
        state_exemption: state_schedule(&state_code).map_or(0.0, |s| s.exemption),
        state_code,
        state_tax: taxes.state_tax,
        total_tax,
        effective_tax_rate,
        net_to_heirs,
        liquidity,
        heir_income_tax,
        net_after_income_tax,
        charitable_impact: CharitableImpact {
            bequest: charitable_bequest,
            tax_savings,
            net_cost_to_heirs: (charitable_bequest - tax_savings).max(0.0),
        },
    }
}

/// Runs the same household twice: once with no planning levers, once as requested.
pub fn compare_strategies(inputs: &EstateInputs) -> StrategyComparison {
    let mut baseline_inputs = inputs.clone();
    baseline_inputs.strategy = StrategyInputs::default();

    let without_planning = calculate_estate_projection(&baseline_inputs);
    let with_planning = calculate_estate_projection(inputs);
    let tax_savings = without_planning.total_tax - with_planning.total_tax;
    let additional_to_heirs =
        with_planning.net_after_income_tax - without_planning.net_after_income_tax;

    StrategyComparison {
        without_planning,
        with_planning,
        tax_savings,
        additional_to_heirs,
    }
}

fn growth_factor(rate: f64, years: u32) -> f64 {
    let rate = if rate.is_finite() { rate.max(-1.0) } else { 0.0 };
    (1.0 + rate).powi(years as i32)
}

fn deduction_breakdown(strategy: &StrategyInputs, years_until_death: u32) -> DeductionBreakdown {
    let lifetime_gifts = strategy.lifetime_gifts.max(0.0);
    let annual_gifts = strategy.annual_gifts.max(0.0) * years_until_death as f64;
    let trust_funding = strategy.trust_funding.max(0.0);
    let charitable_bequest = strategy.charitable_bequest.max(0.0);
    DeductionBreakdown {
        lifetime_gifts,
        annual_gifts,
        trust_funding,
        charitable_bequest,
        total: lifetime_gifts + annual_gifts + trust_funding + charitable_bequest,
    }
}

fn tax_outcome(gross: f64, deductions: f64, federal_exemption: f64, state_code: &str) -> TaxOutcome {
    let taxable_estate = (gross - deductions.max(0.0)).max(0.0);
    TaxOutcome {
        taxable_estate,
        federal_tax: federal_estate_tax(taxable_estate, federal_exemption),
        state_tax: state_estate_tax(state_code, taxable_estate),
    }
}

fn liquidity_analysis(
    composition: &EstateComposition,
    strategy: &StrategyInputs,
    total_tax: f64,
    settlement_costs: f64,
    liquidity_target: f64,
) -> LiquidityAnalysis {
    let required = (total_tax + settlement_costs) * liquidity_target.max(0.0);
    let charitable_reserve = strategy.charitable_bequest.max(0.0);
    let available = (composition.liquid_assets() + strategy.ilit_death_benefit.max(0.0)
        - charitable_reserve)
        .max(0.0);

    LiquidityAnalysis {
        settlement_costs,
        required,
        available,
        gap: (required - available).max(0.0),
        surplus: (available - required).max(0.0),
    }
}

use chrono::Datelike;
use clap::{Args, ValueEnum};
use serde::Deserialize;

use crate::core::{
    AssumptionInputs, EstateError, EstateInputs, EstateProfile, MaritalStatus, StrategyInputs,
    is_known_state,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliMaritalStatus {
    Single,
    Married,
    Widowed,
}

impl From<CliMaritalStatus> for MaritalStatus {
    fn from(value: CliMaritalStatus) -> Self {
        match value {
            CliMaritalStatus::Single => MaritalStatus::Single,
            CliMaritalStatus::Married => MaritalStatus::Married,
            CliMaritalStatus::Widowed => MaritalStatus::Widowed,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ApiMaritalStatus {
    #[serde(alias = "Single", alias = "divorced")]
    Single,
    #[serde(alias = "Married", alias = "married-filing-jointly")]
    Married,
    #[serde(alias = "Widowed", alias = "widow", alias = "widower")]
    Widowed,
}

impl From<ApiMaritalStatus> for CliMaritalStatus {
    fn from(value: ApiMaritalStatus) -> Self {
        match value {
            ApiMaritalStatus::Single => CliMaritalStatus::Single,
            ApiMaritalStatus::Married => CliMaritalStatus::Married,
            ApiMaritalStatus::Widowed => CliMaritalStatus::Widowed,
        }
    }
}

/// Request keys accepted by every estate endpoint. Missing keys keep the defaults.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct EstatePayload {
    current_age: Option<u32>,
    birth_year: Option<i32>,
    death_age: Option<u32>,
    current_year: Option<i32>,
    marital_status: Option<ApiMaritalStatus>,
    state: Option<String>,
    state_override: Option<String>,

    cash: Option<f64>,
    taxable_investments: Option<f64>,
    tax_deferred: Option<f64>,
    roth: Option<f64>,
    real_estate: Option<f64>,
    business_interests: Option<f64>,
    personal_property: Option<f64>,
    life_insurance: Option<f64>,
    liabilities: Option<f64>,

    bypass_trust: Option<bool>,
    ilit_death_benefit: Option<f64>,
    lifetime_gifts: Option<f64>,
    annual_gifts: Option<f64>,
    trust_funding: Option<f64>,
    charitable_bequest: Option<f64>,

    liquidity_target: Option<f64>,
    heir_income_tax_rate: Option<f64>,
    portability: Option<bool>,
    dsue_amount: Option<f64>,
    growth_rate: Option<f64>,
    settlement_cost_rate: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct EstateArgs {
    #[arg(long, help = "Current age; derived from --birth-year when omitted")]
    pub current_age: Option<u32>,
    #[arg(long)]
    pub birth_year: Option<i32>,
    #[arg(long, default_value_t = 90, help = "Assumed age at death")]
    pub death_age: u32,
    #[arg(long, help = "Base year of the projection; defaults to the current calendar year")]
    pub current_year: Option<i32>,
    #[arg(long, value_enum, default_value_t = CliMaritalStatus::Single)]
    pub marital_status: CliMaritalStatus,
    #[arg(long, default_value = "FL", help = "Two-letter state of residence")]
    pub state: String,
    #[arg(long, help = "Compute state estate tax for this state instead of residence")]
    pub state_override: Option<String>,

    #[arg(long, default_value_t = 0.0)]
    pub cash: f64,
    #[arg(long, default_value_t = 0.0)]
    pub taxable_investments: f64,
    #[arg(long, default_value_t = 0.0, help = "Traditional IRA / 401(k) balances")]
    pub tax_deferred: f64,
    #[arg(long, default_value_t = 0.0)]
    pub roth: f64,
    #[arg(long, default_value_t = 0.0)]
    pub real_estate: f64,
    #[arg(long, default_value_t = 0.0)]
    pub business_interests: f64,
    #[arg(long, default_value_t = 0.0)]
    pub personal_property: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Death benefit of policies owned outright (inside the estate)"
    )]
    pub life_insurance: f64,
    #[arg(long, default_value_t = 0.0)]
    pub liabilities: f64,

    #[arg(long)]
    pub bypass_trust: bool,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Death benefit held in an irrevocable life insurance trust"
    )]
    pub ilit_death_benefit: f64,
    #[arg(long, default_value_t = 0.0)]
    pub lifetime_gifts: f64,
    #[arg(long, default_value_t = 0.0, help = "Gifts made every year until death")]
    pub annual_gifts: f64,
    #[arg(long, default_value_t = 0.0)]
    pub trust_funding: f64,
    #[arg(long, default_value_t = 0.0)]
    pub charitable_bequest: f64,

    #[arg(
        long,
        default_value_t = 100.0,
        help = "Liquidity target in percent of taxes plus settlement costs"
    )]
    pub liquidity_target: f64,
    #[arg(long, default_value_t = 24.0, help = "Heirs' marginal income tax rate in percent")]
    pub heir_income_tax_rate: f64,
    #[arg(long, help = "Elect portability of the deceased spouse's unused exclusion")]
    pub portability: bool,
    #[arg(long, default_value_t = 0.0)]
    pub dsue_amount: f64,
    #[arg(long, default_value_t = 4.0, help = "Annual asset growth in percent")]
    pub growth_rate: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Probate and administration costs in percent of the estate"
    )]
    pub settlement_cost_rate: f64,
}

pub(crate) fn default_args_for_api() -> EstateArgs {
    EstateArgs {
        current_age: Some(65),
        birth_year: None,
        death_age: 90,
        current_year: None,
        marital_status: CliMaritalStatus::Single,
        state: "FL".to_string(),
        state_override: None,
        cash: 0.0,
        taxable_investments: 0.0,
        tax_deferred: 0.0,
        roth: 0.0,
        real_estate: 0.0,
        business_interests: 0.0,
        personal_property: 0.0,
        life_insurance: 0.0,
        liabilities: 0.0,
        bypass_trust: false,
        ilit_death_benefit: 0.0,
        lifetime_gifts: 0.0,
        annual_gifts: 0.0,
        trust_funding: 0.0,
        charitable_bequest: 0.0,
        liquidity_target: 100.0,
        heir_income_tax_rate: 24.0,
        portability: false,
        dsue_amount: 0.0,
        growth_rate: 4.0,
        settlement_cost_rate: 3.0,
    }
}

/// Calendar years accepted for `--current-year` and `--birth-year`.
const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1900..=2200;

fn current_calendar_year() -> i32 {
    chrono::Local::now().year()
}

fn normalize_state(flag: &str, code: &str) -> Result<String, EstateError> {
    let code = code.trim().to_ascii_uppercase();
    if !is_known_state(&code) {
        return Err(EstateError::invalid(format!(
            "{flag} must be a two-letter US state code, got {code:?}"
        )));
    }
    Ok(code)
}

pub fn build_inputs(args: EstateArgs) -> Result<EstateInputs, EstateError> {
    let current_year = args.current_year.unwrap_or_else(current_calendar_year);
    if !SUPPORTED_YEARS.contains(&current_year) {
        return Err(EstateError::invalid(format!(
            "--current-year must be between {} and {}",
            SUPPORTED_YEARS.start(),
            SUPPORTED_YEARS.end()
        )));
    }

    if let Some(birth_year) = args.birth_year {
        if !SUPPORTED_YEARS.contains(&birth_year) {
            return Err(EstateError::invalid(format!(
                "--birth-year must be between {} and {}",
                SUPPORTED_YEARS.start(),
                SUPPORTED_YEARS.end()
            )));
        }
        if birth_year > current_year {
            return Err(EstateError::invalid(
                "--birth-year must be <= --current-year",
            ));
        }
    }

    let current_age = match (args.current_age, args.birth_year) {
        (Some(age), _) => age,
        (None, Some(birth_year)) => current_year.abs_diff(birth_year),
        (None, None) => {
            return Err(EstateError::invalid(
                "--current-age or --birth-year is required",
            ));
        }
    };

    if args.death_age < current_age {
        return Err(EstateError::invalid("--death-age must be >= --current-age"));
    }

    if args.death_age > 120 {
        return Err(EstateError::invalid("--death-age must be <= 120"));
    }

    for (name, value) in [
        ("--cash", args.cash),
        ("--taxable-investments", args.taxable_investments),
        ("--tax-deferred", args.tax_deferred),
        ("--roth", args.roth),
        ("--real-estate", args.real_estate),
        ("--business-interests", args.business_interests),
        ("--personal-property", args.personal_property),
        ("--life-insurance", args.life_insurance),
        ("--liabilities", args.liabilities),
        ("--ilit-death-benefit", args.ilit_death_benefit),
        ("--lifetime-gifts", args.lifetime_gifts),
        ("--annual-gifts", args.annual_gifts),
        ("--trust-funding", args.trust_funding),
        ("--charitable-bequest", args.charitable_bequest),
        ("--dsue-amount", args.dsue_amount),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(EstateError::invalid(format!("{name} must be >= 0")));
        }
    }

    if !(0.0..=500.0).contains(&args.liquidity_target) {
        return Err(EstateError::invalid(
            "--liquidity-target must be between 0 and 500",
        ));
    }

    for (name, rate) in [
        ("--heir-income-tax-rate", args.heir_income_tax_rate),
        ("--settlement-cost-rate", args.settlement_cost_rate),
    ] {
        if !(0.0..=100.0).contains(&rate) {
            return Err(EstateError::invalid(format!(
                "{name} must be between 0 and 100"
            )));
        }
    }

    if !args.growth_rate.is_finite() || args.growth_rate <= -100.0 || args.growth_rate > 100.0 {
        return Err(EstateError::invalid("--growth-rate must be > -100 and <= 100"));
    }

    let state = normalize_state("--state", &args.state)?;
    let state_override = args
        .state_override
        .as_deref()
        .map(|code| normalize_state("--state-override", code))
        .transpose()?;

    Ok(EstateInputs {
        profile: EstateProfile {
            cash: args.cash,
            taxable_investments: args.taxable_investments,
            tax_deferred_accounts: args.tax_deferred,
            roth_accounts: args.roth,
            real_estate: args.real_estate,
            business_interests: args.business_interests,
            personal_property: args.personal_property,
            life_insurance: args.life_insurance,
            liabilities: args.liabilities,
            marital_status: args.marital_status.into(),
            state,
            birth_year: args.birth_year,
        },
        strategy: StrategyInputs {
            bypass_trust: args.bypass_trust,
            ilit_death_benefit: args.ilit_death_benefit,
            lifetime_gifts: args.lifetime_gifts,
            annual_gifts: args.annual_gifts,
            trust_funding: args.trust_funding,
            charitable_bequest: args.charitable_bequest,
        },
        assumptions: AssumptionInputs {
            current_age,
            death_age: args.death_age,
            current_year,
            liquidity_target: args.liquidity_target / 100.0,
            state_override,
            heir_income_tax_rate: args.heir_income_tax_rate / 100.0,
            portability_elected: args.portability,
            dsue_amount: args.dsue_amount,
            asset_growth_rate: args.growth_rate / 100.0,
            settlement_cost_rate: args.settlement_cost_rate / 100.0,
        },
    })
}

pub(crate) fn inputs_from_payload(payload: EstatePayload) -> Result<EstateInputs, EstateError> {
    let mut args = default_args_for_api();

    if let Some(v) = payload.birth_year {
        args.birth_year = Some(v);
        // An explicit birth year wins over the default age.
        if payload.current_age.is_none() {
            args.current_age = None;
        }
    }
    if let Some(v) = payload.current_age {
        args.current_age = Some(v);
    }
    if let Some(v) = payload.death_age {
        args.death_age = v;
    }
    if let Some(v) = payload.current_year {
        args.current_year = Some(v);
    }
    if let Some(v) = payload.marital_status {
        args.marital_status = v.into();
    }
    if let Some(v) = payload.state {
        args.state = v;
    }
    if let Some(v) = payload.state_override {
        args.state_override = Some(v).filter(|code| !code.trim().is_empty());
    }

    if let Some(v) = payload.cash {
        args.cash = v;
    }
    if let Some(v) = payload.taxable_investments {
        args.taxable_investments = v;
    }
    if let Some(v) = payload.tax_deferred {
        args.tax_deferred = v;
    }
    if let Some(v) = payload.roth {
        args.roth = v;
    }
    if let Some(v) = payload.real_estate {
        args.real_estate = v;
    }
    if let Some(v) = payload.business_interests {
        args.business_interests = v;
    }
    if let Some(v) = payload.personal_property {
        args.personal_property = v;
    }
    if let Some(v) = payload.life_insurance {
        args.life_insurance = v;
    }
    if let Some(v) = payload.liabilities {
        args.liabilities = v;
    }

    if let Some(v) = payload.bypass_trust {
        args.bypass_trust = v;
    }
    if let Some(v) = payload.ilit_death_benefit {
        args.ilit_death_benefit = v;
    }
    if let Some(v) = payload.lifetime_gifts {
        args.lifetime_gifts = v;
    }
    if let Some(v) = payload.annual_gifts {
        args.annual_gifts = v;
    }
    if let Some(v) = payload.trust_funding {
        args.trust_funding = v;
    }
    if let Some(v) = payload.charitable_bequest {
        args.charitable_bequest = v;
    }

    if let Some(v) = payload.liquidity_target {
        args.liquidity_target = v;
    }
    if let Some(v) = payload.heir_income_tax_rate {
        args.heir_income_tax_rate = v;
    }
    if let Some(v) = payload.portability {
        args.portability = v;
    }
    if let Some(v) = payload.dsue_amount {
        args.dsue_amount = v;
    }
    if let Some(v) = payload.growth_rate {
        args.growth_rate = v;
    }
    if let Some(v) = payload.settlement_cost_rate {
        args.settlement_cost_rate = v;
    }

    build_inputs(args)
}

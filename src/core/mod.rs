mod engine;
mod error;
mod roth;
mod solver;
mod tax;
mod types;

pub use engine::{
    calculate_estate_projection, compare_strategies, evaluate_composition, project_composition,
};
pub use error::EstateError;
pub use roth::{
    RothConversionProjection, RothConversionYear, RothOverlayResult, apply_roth_overlay,
};
pub use solver::{
    BequestSolveConfig, BequestSolveIteration, BequestSolveResult, MAX_SOLVER_ITERATIONS,
    solve_charitable_bequest,
};
pub use tax::{
    Bracket, FEDERAL_ESTATE_TAX_RATE, FederalExclusion, StateSchedule, applicable_exclusion,
    federal_estate_tax, federal_exemption_for_year, graduated_tax, is_known_state,
    state_estate_tax, state_schedule,
};
pub use types::{
    AssumptionInputs, CharitableImpact, DeductionBreakdown, EstateComposition, EstateInputs,
    EstateProfile, LiquidityAnalysis, MaritalStatus, ProjectionResult, StrategyComparison,
    StrategyInputs,
};

use serde::Serialize;

use super::engine::calculate_estate_projection;
use super::error::EstateError;
use super::types::{EstateInputs, ProjectionResult};

/// Upper bound accepted for `BequestSolveConfig::max_iterations`.
pub const MAX_SOLVER_ITERATIONS: u32 = 1_000;

#[derive(Debug, Clone, Copy)]
pub struct BequestSolveConfig {
    pub target_total_tax: f64,
    /// Upper search bound; `None` searches up to the projected estate value.
    pub search_max: Option<f64>,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for BequestSolveConfig {
    fn default() -> Self {
        Self {
            target_total_tax: 0.0,
            search_max: None,
            tolerance: 100.0,
            max_iterations: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BequestSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_bequest: f64,
    pub total_tax: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BequestSolveResult {
    pub target_total_tax: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_bequest: Option<f64>,
    pub projection: Option<ProjectionResult>,
    pub iterations: Vec<BequestSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Smallest charitable bequest whose projection keeps total estate tax at
/// or below `target_total_tax`. Total tax is non-increasing in the bequest,
/// so a bisection over `[0, search_max]` is sufficient.
pub fn solve_charitable_bequest(
    inputs: &EstateInputs,
    config: BequestSolveConfig,
) -> Result<BequestSolveResult, EstateError> {
    validate_config(config)?;

    let search_max = match config.search_max {
        Some(max) => max,
        None => calculate_estate_projection(inputs).projected_estate_value,
    };

    let meets_target = |total_tax: f64| total_tax <= config.target_total_tax + 1e-9;
    let mut iterations = Vec::new();
    let mut solved_bequest = None;
    let mut converged = false;
    let feasible;
    let message;

    let low_tax = total_tax_with_bequest(inputs, 0.0);
    let high_tax = total_tax_with_bequest(inputs, search_max);

    if meets_target(low_tax) {
        solved_bequest = Some(0.0);
        converged = true;
        feasible = true;
        message = "Estate already meets the tax target without a bequest.".to_string();
    } else if !meets_target(high_tax) {
        feasible = false;
        message = "No bequest within the search bounds meets the tax target.".to_string();
    } else {
        let mut lo = 0.0;
        let mut hi = search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let total_tax = total_tax_with_bequest(inputs, mid);
            iterations.push(BequestSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_bequest: mid,
                total_tax,
            });

            if meets_target(total_tax) {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_bequest = Some(hi);
        feasible = true;
        message = if converged {
            "Solved minimum charitable bequest.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    let projection = solved_bequest.map(|bequest| {
        let mut solved = inputs.clone();
        solved.strategy.charitable_bequest = bequest;
        calculate_estate_projection(&solved)
    });

    tracing::debug!(
        feasible,
        converged,
        iterations = iterations.len(),
        solved_bequest = solved_bequest.unwrap_or(f64::NAN),
        "charitable bequest solve finished"
    );

    Ok(BequestSolveResult {
        target_total_tax: config.target_total_tax,
        search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_bequest,
        projection,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn total_tax_with_bequest(base_inputs: &EstateInputs, bequest: f64) -> f64 {
    let mut inputs = base_inputs.clone();
    inputs.strategy.charitable_bequest = bequest.max(0.0);
    calculate_estate_projection(&inputs).total_tax
}

fn validate_config(config: BequestSolveConfig) -> Result<(), EstateError> {
    if !config.target_total_tax.is_finite() || config.target_total_tax < 0.0 {
        return Err(EstateError::SolverConfig(
            "target_total_tax must be >= 0".to_string(),
        ));
    }
    if let Some(max) = config.search_max {
        if !max.is_finite() || max < 0.0 {
            return Err(EstateError::SolverConfig(
                "search_max must be finite and >= 0".to_string(),
            ));
        }
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(EstateError::SolverConfig(
            "tolerance must be > 0".to_string(),
        ));
    }
    if config.max_iterations == 0 || config.max_iterations > MAX_SOLVER_ITERATIONS {
        return Err(EstateError::SolverConfig(format!(
            "max_iterations must be between 1 and {MAX_SOLVER_ITERATIONS}"
        )));
    }
    Ok(())
}

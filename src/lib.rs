pub mod algorithms;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;

pub use error::{ContractViolation, RoutingError};

/// Index of a node in `[0, N)`.
pub type NodeId = usize;

/// Link or path cost. Every value at or above [`INFINITY`] means unreachable.
pub type Cost = u32;

/// Sentinel cost for "no path". Computed sums are capped here, never above.
pub const INFINITY: Cost = 999;

/// Adds two costs, saturating at [`INFINITY`].
pub fn saturating_cost_add(a: Cost, b: Cost) -> Cost {
    if a >= INFINITY || b >= INFINITY {
        return INFINITY;
    }
    a.saturating_add(b).min(INFINITY)
}

/// Validates a raw cost coming from configuration or a link-change script.
///
/// Negative values are rejected; anything at or above [`INFINITY`] collapses
/// to the sentinel.
pub fn cost_from_raw(raw: i64) -> Result<Cost, ContractViolation> {
    if raw < 0 {
        return Err(ContractViolation::NegativeCost { cost: raw });
    }
    Ok(raw.min(INFINITY as i64) as Cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturating_add_caps_at_infinity() {
        assert_eq!(saturating_cost_add(1, 2), 3);
        assert_eq!(saturating_cost_add(500, 499), INFINITY);
        assert_eq!(saturating_cost_add(600, 600), INFINITY);
        assert_eq!(saturating_cost_add(INFINITY, 0), INFINITY);
        assert_eq!(saturating_cost_add(INFINITY, INFINITY), INFINITY);
        assert_eq!(saturating_cost_add(Cost::MAX, Cost::MAX), INFINITY);
    }

    #[test]
    fn raw_costs_are_validated() {
        assert_eq!(cost_from_raw(0), Ok(0));
        assert_eq!(cost_from_raw(7), Ok(7));
        assert_eq!(cost_from_raw(999), Ok(INFINITY));
        assert_eq!(cost_from_raw(100_000), Ok(INFINITY));
        assert_eq!(
            cost_from_raw(-1),
            Err(ContractViolation::NegativeCost { cost: -1 })
        );
    }
}

//! Resolver configuration
//!
//! Plain serde struct with defaults for every field, so an empty JSON object
//! is a valid configuration. Unknown fields are rejected to catch typos.

use crate::combat::AssignmentOrder;
use crate::game::VerbosityLevel;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Which permanents the lethality loop examines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LethalitySweep {
    /// Permanents dealt damage this step, plus anything attached to a
    /// permanent that left
    #[default]
    Touched,
    /// Every permanent on the battlefield
    Battlefield,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Hard cap on lethality passes per step
    pub max_lethality_iterations: u32,
    /// Blocker order used when the attacking player recorded none
    pub default_assignment_order: AssignmentOrder,
    pub lethality_sweep: LethalitySweep,
    /// Accept a text-heuristic keyword oracle (reduced fidelity)
    pub allow_heuristic_oracle: bool,
    pub verbosity: VerbosityLevel,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            max_lethality_iterations: 10,
            default_assignment_order: AssignmentOrder::AscendingToughness,
            lethality_sweep: LethalitySweep::Touched,
            allow_heuristic_oracle: false,
            verbosity: VerbosityLevel::Normal,
        }
    }
}

impl ResolverConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CombatError;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(ResolverConfig::from_json_str("{}").unwrap(), ResolverConfig::default());
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = ResolverConfig::from_json_str(
            r#"{"max_lethality_iterations": 3, "lethality_sweep": "Battlefield", "verbosity": "Verbose"}"#,
        )
        .unwrap();
        assert_eq!(config.max_lethality_iterations, 3);
        assert_eq!(config.lethality_sweep, LethalitySweep::Battlefield);
        assert_eq!(config.verbosity, VerbosityLevel::Verbose);
        assert!(!config.allow_heuristic_oracle);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ResolverConfig::from_json_str(r#"{"max_iterations": 3}"#).unwrap_err();
        assert!(matches!(err, CombatError::Config(_)));
    }
}

// Restaurant plan definitions and limits

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::restaurant::Plan;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),
}

/// A plan with its pricing and limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanDefinition {
    /// Plan key (basic, premium)
    pub name: String,

    /// Display name shown in the UI
    pub display_name: String,

    /// Monthly fee in cents (EUR)
    pub monthly_fee_cents: i32,

    /// Maximum simultaneously open contact tables
    pub max_open_tables: u32,

    /// Maximum uploaded images
    pub max_images: u32,

    /// Whether the restaurant appears in the featured carousel
    pub featured_placement: bool,
}

impl PlanDefinition {
    pub fn basic() -> Self {
        Self {
            name: "basic".to_string(),
            display_name: "Basic".to_string(),
            monthly_fee_cents: 0,
            max_open_tables: 3,
            max_images: 5,
            featured_placement: false,
        }
    }

    pub fn premium() -> Self {
        Self {
            name: "premium".to_string(),
            display_name: "Premium".to_string(),
            monthly_fee_cents: 2900,
            max_open_tables: 20,
            max_images: 20,
            featured_placement: true,
        }
    }

    pub fn for_plan(plan: &Plan) -> Self {
        match plan {
            Plan::Basic => Self::basic(),
            Plan::Premium => Self::premium(),
        }
    }

    pub fn by_name(name: &str) -> Result<Self, PlanError> {
        match name {
            "basic" => Ok(Self::basic()),
            "premium" => Ok(Self::premium()),
            _ => Err(PlanError::UnknownPlan(name.to_string())),
        }
    }

    pub fn requires_payment(&self) -> bool {
        self.monthly_fee_cents > 0
    }

    /// All plans offered during onboarding
    pub fn all() -> Vec<Self> {
        vec![Self::basic(), Self::premium()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_lookup() {
        assert_eq!(PlanDefinition::by_name("basic").unwrap().monthly_fee_cents, 0);
        assert_eq!(
            PlanDefinition::by_name("premium").unwrap().monthly_fee_cents,
            2900
        );
        assert!(PlanDefinition::by_name("enterprise").is_err());
    }

    #[test]
    fn test_payment_requirement() {
        assert!(!PlanDefinition::basic().requires_payment());
        assert!(PlanDefinition::premium().requires_payment());
    }

    #[test]
    fn test_premium_dominates_basic() {
        let basic = PlanDefinition::basic();
        let premium = PlanDefinition::premium();

        assert!(premium.max_open_tables > basic.max_open_tables);
        assert!(premium.max_images > basic.max_images);
        assert!(premium.featured_placement);
    }

    #[test]
    fn test_for_plan_matches_by_name() {
        assert_eq!(
            PlanDefinition::for_plan(&Plan::Basic),
            PlanDefinition::by_name("basic").unwrap()
        );
        assert_eq!(
            PlanDefinition::for_plan(&Plan::Premium),
            PlanDefinition::by_name("premium").unwrap()
        );
    }
}

//! Plan modifiers used by Apstra resources

pub use tfplug::plan_modifier::{
    RequiresReplace, RequiresReplaceIf, RequiresReplaceIfChanged, UseStateForUnknown,
};

use tfplug::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use tfplug::types::DynamicValue;

/// Like [`UseStateForUnknown`], but a null state value is copied too
pub struct UseNullStateForUnknown;

impl PlanModifier for UseNullStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change, even if it's null."
            .to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        if !request.plan_value.is_unknown() || request.config_value.is_unknown() {
            return PlanModifierResponse::unchanged(request);
        }
        PlanModifierResponse {
            plan_value: request.state_value,
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }
}

/// Plans an unknown value when the attribute is dropped from configuration,
/// so the API-chosen value can be read back after apply
pub struct UnknownWhenRemoved;

impl PlanModifier for UnknownWhenRemoved {
    fn description(&self) -> String {
        "value reverts to <unknown> when removed from config".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        if !request.state_value.is_null() && request.config_value.is_null() {
            return PlanModifierResponse {
                plan_value: DynamicValue::unknown(),
                requires_replace: false,
                diagnostics: Vec::new(),
            };
        }
        PlanModifierResponse::unchanged(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::types::{AttributePath, Dynamic};

    fn request(config: Dynamic, state: Dynamic, plan: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::new(config),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new("attr"),
        }
    }

    #[test]
    fn null_state_replaces_unknown_plan() {
        let resp = UseNullStateForUnknown.modify(request(
            Dynamic::Null,
            Dynamic::Null,
            Dynamic::Unknown,
        ));
        assert!(resp.plan_value.is_null());

        let resp = UseNullStateForUnknown.modify(request(
            Dynamic::Null,
            Dynamic::string("old"),
            Dynamic::Unknown,
        ));
        assert_eq!(resp.plan_value.value, Dynamic::string("old"));
        assert!(!resp.requires_replace);
    }

    #[test]
    fn null_state_leaves_known_plan_and_unknown_config() {
        let resp = UseNullStateForUnknown.modify(request(
            Dynamic::string("new"),
            Dynamic::Null,
            Dynamic::string("new"),
        ));
        assert_eq!(resp.plan_value.value, Dynamic::string("new"));

        let resp = UseNullStateForUnknown.modify(request(
            Dynamic::Unknown,
            Dynamic::string("old"),
            Dynamic::Unknown,
        ));
        assert!(resp.plan_value.is_unknown());
    }

    #[test]
    fn removed_value_becomes_unknown() {
        let resp = UnknownWhenRemoved.modify(request(
            Dynamic::Null,
            Dynamic::string("old"),
            Dynamic::string("old"),
        ));
        assert!(resp.plan_value.is_unknown());

        let resp = UnknownWhenRemoved.modify(request(
            Dynamic::string("x"),
            Dynamic::string("old"),
            Dynamic::string("x"),
        ));
        assert_eq!(resp.plan_value.value, Dynamic::string("x"));

        let resp = UnknownWhenRemoved.modify(request(Dynamic::Null, Dynamic::Null, Dynamic::Null));
        assert!(resp.plan_value.is_null());
    }
}

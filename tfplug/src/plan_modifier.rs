//! Plan modifiers and the planning driver
//!
//! Plan modifiers run after Terraform has proposed a new state and can:
//! - Modify the planned value
//! - Mark an attribute as requiring replacement
//! - Add warnings or errors to the plan

use crate::schema::{
    Attribute, DefaultRequest, ObjectNestingMode, PlanModifier, PlanModifierRequest,
    PlanModifierResponse, Schema,
};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Marks an attribute as requiring replacement whenever its planned value
/// differs from state on an existing resource
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "If the value of this attribute changes, Terraform will destroy and recreate the resource."
            .to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = !request.state_value.is_null()
            && !values_equal(&request.state_value.value, &request.plan_value.value);
        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Like [`RequiresReplace`] but ignores unknown planned values and
/// null-to-null transitions
pub struct RequiresReplaceIfChanged;

impl PlanModifier for RequiresReplaceIfChanged {
    fn description(&self) -> String {
        "Requires replacement when a known value changes".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = !matches!(
            (&request.state_value.value, &request.plan_value.value),
            (Dynamic::Null, Dynamic::Null) | (Dynamic::Unknown, _) | (_, Dynamic::Unknown)
        ) && !values_equal(&request.state_value.value, &request.plan_value.value);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Uses the prior state value when the planned value is unknown.
/// Useful for computed attributes that never change after creation.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change.".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        if request.plan_value.is_unknown() && !request.state_value.is_null() {
            return PlanModifierResponse {
                plan_value: request.state_value,
                requires_replace: false,
                diagnostics: Vec::new(),
            };
        }
        PlanModifierResponse::unchanged(request)
    }
}

pub struct RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    pub fn new(predicate: F, description: impl Into<String>) -> Self {
        Self {
            predicate,
            description: description.into(),
        }
    }
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        // a resource that does not exist yet is never replaced
        let requires_replace = !request.state_value.is_null() && (self.predicate)(&request);
        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Compares two values, treating numbers equal within f64 epsilon
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) | (Dynamic::Unknown, Dynamic::Unknown) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

/// Result of planning a resource change
#[derive(Debug)]
pub struct PlanOutcome {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Plans a resource change from Terraform's proposed new state.
///
/// Computed attributes left null in configuration become unknown when the
/// resource is being created or changed. Schema defaults fill optional
/// attributes missing from configuration, then each attribute's plan
/// modifiers run in declaration order.
pub fn plan_attributes(
    schema: &Schema,
    config: &DynamicValue,
    prior_state: &DynamicValue,
    proposed: &DynamicValue,
) -> PlanOutcome {
    let mut outcome = PlanOutcome {
        planned_state: proposed.clone(),
        requires_replace: Vec::new(),
        diagnostics: Vec::new(),
    };

    // destroy plans carry no attribute values
    if proposed.is_null() {
        return outcome;
    }

    let changing = prior_state.is_null()
        || !values_equal(&prior_state.value, &config_overlay(proposed, prior_state));
    let mut planner = Planner {
        config,
        prior_state,
        changing,
        outcome: &mut outcome,
    };
    planner.plan_level(&schema.block.attributes, &AttributePath::root());

    tracing::debug!(
        requires_replace = outcome.requires_replace.len(),
        diagnostics = outcome.diagnostics.len(),
        "planned resource change"
    );
    outcome
}

/// The proposed state with unknown values replaced by state, so that
/// computed-but-unknown attributes alone do not count as a change
fn config_overlay(proposed: &DynamicValue, prior_state: &DynamicValue) -> Dynamic {
    fn overlay(proposed: &Dynamic, prior: &Dynamic) -> Dynamic {
        match (proposed, prior) {
            (Dynamic::Unknown, prior) => prior.clone(),
            (Dynamic::Map(p), Dynamic::Map(s)) => Dynamic::Map(
                p.iter()
                    .map(|(k, v)| match s.get(k) {
                        Some(prior) => (k.clone(), overlay(v, prior)),
                        None => (k.clone(), v.clone()),
                    })
                    .collect(),
            ),
            (Dynamic::List(p), Dynamic::List(s)) if p.len() == s.len() => Dynamic::List(
                p.iter().zip(s).map(|(a, b)| overlay(a, b)).collect(),
            ),
            (proposed, _) => proposed.clone(),
        }
    }
    overlay(&proposed.value, &prior_state.value)
}

struct Planner<'a> {
    config: &'a DynamicValue,
    prior_state: &'a DynamicValue,
    changing: bool,
    outcome: &'a mut PlanOutcome,
}

impl Planner<'_> {
    fn plan_level(&mut self, attributes: &[Attribute], parent: &AttributePath) {
        for attribute in attributes {
            let path = parent.clone().attribute(&attribute.name);
            self.plan_attribute(attribute, &path);
        }
    }

    fn plan_attribute(&mut self, attribute: &Attribute, path: &AttributePath) {
        let config_value = self.config.get(path);
        let mut plan_value = self.outcome.planned_state.get(path);

        if config_value.is_null() {
            if let Some(default) = attribute.default.as_ref().filter(|_| attribute.optional) {
                plan_value = default
                    .default_value(DefaultRequest { path: path.clone() })
                    .value
                    .value;
            } else if attribute.computed && self.changing {
                plan_value = Dynamic::Unknown;
            }
        }

        for modifier in &attribute.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: DynamicValue::new(config_value.clone()),
                state_value: DynamicValue::new(self.prior_state.get(path)),
                plan_value: DynamicValue::new(plan_value),
                path: path.clone(),
            });
            plan_value = response.plan_value.value;
            if response.requires_replace && !self.outcome.requires_replace.contains(path) {
                self.outcome.requires_replace.push(path.clone());
            }
            self.outcome.diagnostics.extend(response.diagnostics);
        }

        let nested_value = plan_value.clone();
        if let Err(e) = self.outcome.planned_state.set_value(path, plan_value) {
            self.outcome.diagnostics.push(Diagnostic::attribute_error(
                path,
                "Planning failed",
                format!("Could not set planned value: {}", e),
            ));
            return;
        }

        let Some(nested) = &attribute.nested_type else {
            return;
        };
        match (nested.nesting, &nested_value) {
            (ObjectNestingMode::Single, Dynamic::Map(_)) => {
                self.plan_level(&nested.attributes, path);
            }
            (ObjectNestingMode::List | ObjectNestingMode::Set, Dynamic::List(items)) => {
                for idx in 0..items.len() {
                    self.plan_level(&nested.attributes, &path.clone().index(idx as i64));
                }
            }
            (ObjectNestingMode::Map, Dynamic::Map(entries)) => {
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                for key in keys {
                    self.plan_level(&nested.attributes, &path.clone().key(key));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
    use std::collections::HashMap;

    fn request(state: Dynamic, plan: Dynamic, config: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::new(config),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new("field"),
        }
    }

    #[test]
    fn requires_replace_if_changed_does_not_trigger_on_same_value() {
        let response = RequiresReplaceIfChanged.modify(request(
            Dynamic::string("hello"),
            Dynamic::string("hello"),
            Dynamic::string("hello"),
        ));
        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn requires_replace_if_changed_triggers_on_different_value() {
        let response = RequiresReplaceIfChanged.modify(request(
            Dynamic::string("hello"),
            Dynamic::string("world"),
            Dynamic::string("world"),
        ));
        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_if_changed_ignores_unknown_values() {
        let response = RequiresReplaceIfChanged.modify(request(
            Dynamic::string("value"),
            Dynamic::Unknown,
            Dynamic::string("value"),
        ));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_skips_create() {
        let response = RequiresReplace.modify(request(
            Dynamic::Null,
            Dynamic::string("10.0.0.1"),
            Dynamic::string("10.0.0.1"),
        ));
        assert!(!response.requires_replace);

        let response = RequiresReplace.modify(request(
            Dynamic::string("10.0.0.1"),
            Dynamic::string("10.0.0.2"),
            Dynamic::string("10.0.0.2"),
        ));
        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_if_uses_predicate() {
        let modifier = RequiresReplaceIf::new(
            |req: &PlanModifierRequest| req.plan_value.value.as_bool() == Some(true),
            "replace when switched on",
        );
        let response = modifier.modify(request(
            Dynamic::Bool(false),
            Dynamic::Bool(true),
            Dynamic::Bool(true),
        ));
        assert!(response.requires_replace);
        assert_eq!(modifier.description(), "replace when switched on");
    }

    #[test]
    fn use_state_for_unknown_keeps_prior_value() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::string("abc"),
            Dynamic::Unknown,
            Dynamic::Null,
        ));
        assert_eq!(response.plan_value.value, Dynamic::string("abc"));

        let response =
            UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown, Dynamic::Null));
        assert!(response.plan_value.is_unknown());
    }

    #[test]
    fn values_equal_handles_all_types() {
        assert!(values_equal(&Dynamic::Number(42.0), &Dynamic::Number(42.0)));
        assert!(!values_equal(&Dynamic::Number(42.0), &Dynamic::Number(43.0)));
        assert!(!values_equal(&Dynamic::Bool(true), &Dynamic::Bool(false)));

        let list1 = Dynamic::List(vec![Dynamic::string("a"), Dynamic::Number(1.0)]);
        let list2 = Dynamic::List(vec![Dynamic::string("b"), Dynamic::Number(1.0)]);
        assert!(values_equal(&list1, &list1.clone()));
        assert!(!values_equal(&list1, &list2));

        let map1 = Dynamic::Map(HashMap::from([("key".to_string(), Dynamic::string("value"))]));
        let map2 = Dynamic::Map(HashMap::from([("key".to_string(), Dynamic::string("other"))]));
        assert!(!values_equal(&map1, &map2));
    }

    fn pool_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("mode", AttributeType::String)
                    .optional()
                    .computed()
                    .default(StaticDefault::string("full"))
                    .build(),
            )
            .build()
    }

    #[test]
    fn plan_on_create_marks_computed_unknown_and_applies_defaults() {
        let config = DynamicValue::new(Dynamic::object([
            ("id", Dynamic::Null),
            ("name", Dynamic::string("pool")),
            ("status", Dynamic::Null),
            ("mode", Dynamic::Null),
        ]));

        let outcome = plan_attributes(&pool_schema(), &config, &DynamicValue::null(), &config);

        let planned = &outcome.planned_state;
        assert!(planned.get(&AttributePath::new("id")).is_unknown());
        assert!(planned.get(&AttributePath::new("status")).is_unknown());
        assert_eq!(planned.get(&AttributePath::new("mode")), Dynamic::string("full"));
        assert!(outcome.requires_replace.is_empty());
    }

    #[test]
    fn plan_on_update_keeps_id_and_flags_replacement() {
        let state = DynamicValue::new(Dynamic::object([
            ("id", Dynamic::string("pool-1")),
            ("name", Dynamic::string("old")),
            ("status", Dynamic::string("not_in_use")),
            ("mode", Dynamic::string("full")),
        ]));
        let config = DynamicValue::new(Dynamic::object([
            ("id", Dynamic::Null),
            ("name", Dynamic::string("new")),
            ("status", Dynamic::Null),
            ("mode", Dynamic::Null),
        ]));
        let proposed = DynamicValue::new(Dynamic::object([
            ("id", Dynamic::string("pool-1")),
            ("name", Dynamic::string("new")),
            ("status", Dynamic::string("not_in_use")),
            ("mode", Dynamic::string("full")),
        ]));

        let outcome = plan_attributes(&pool_schema(), &config, &state, &proposed);

        assert_eq!(
            outcome.planned_state.get(&AttributePath::new("id")),
            Dynamic::string("pool-1")
        );
        assert_eq!(outcome.requires_replace, vec![AttributePath::new("name")]);
    }

    #[test]
    fn plan_for_destroy_is_untouched() {
        let outcome = plan_attributes(
            &pool_schema(),
            &DynamicValue::null(),
            &DynamicValue::empty_object(),
            &DynamicValue::null(),
        );
        assert!(outcome.planned_state.is_null());
    }
}

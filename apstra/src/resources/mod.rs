//! Resource implementations

pub mod agent_profile;
pub mod datacenter_connectivity_template;
pub mod ip_pool;
pub mod managed_device;
pub mod range_pool;

pub use agent_profile::AgentProfileResource;
pub use datacenter_connectivity_template::DatacenterConnectivityTemplateResource;
pub use ip_pool::IpPoolResource;
pub use managed_device::ManagedDeviceResource;
pub use range_pool::RangePoolResource;

use tfplug::plan_modifier::plan_attributes;
use tfplug::resource::{ModifyPlanRequest, ModifyPlanResponse};
use tfplug::schema::Schema;
use tfplug::types::{AttributePath, DynamicValue};

pub(crate) fn id_path() -> AttributePath {
    AttributePath::new("id")
}

/// Planned state carrying the ID of an object which was created but could
/// not be read back, so Terraform still tracks it
pub(crate) fn state_with_id(mut state: DynamicValue, id: &str) -> DynamicValue {
    if let Err(e) = state.set_string(&id_path(), id.to_string()) {
        tracing::warn!(id, error = %e, "created object is missing from state");
    }
    state
}

/// Schema-driven planning shared by every resource
pub(crate) fn modify_plan(schema: &Schema, request: ModifyPlanRequest) -> ModifyPlanResponse {
    let outcome = plan_attributes(
        schema,
        &request.config,
        &request.prior_state,
        &request.proposed_new_state,
    );
    ModifyPlanResponse {
        planned_state: outcome.planned_state,
        requires_replace: outcome.requires_replace,
        planned_private: request.prior_private,
        diagnostics: outcome.diagnostics,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use tfplug::types::Dynamic;

    #[test]
    fn created_id_lands_in_planned_state() {
        let planned = DynamicValue::new(Dynamic::object([
            ("id", Dynamic::Unknown),
            ("name", Dynamic::string("spines")),
        ]));
        let state = state_with_id(planned, "pool-1");
        assert_eq!(state.get_string(&id_path()).unwrap(), "pool-1");
        assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "spines");
    }

    #[test]
    fn unusable_state_is_returned_as_is() {
        let planned = DynamicValue::new(Dynamic::string("not an object"));
        let state = state_with_id(planned.clone(), "pool-1");
        assert_eq!(state, planned);
    }
}

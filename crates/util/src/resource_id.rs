//! Resource id scope helpers.
//!
//! Resource ids have the shape
//! `/subscriptions/<sub>/resourceGroups/<group>/providers/<namespace>/<type>/<name>`.
//! Permission checks are evaluated against the id truncated to the resource
//! group or the subscription.

const PROVIDERS_SEGMENT: &str = "/providers";
const RESOURCE_GROUPS_SEGMENT: &str = "/resourceGroups";

/// The id truncated at `/providers`.
pub fn resource_group_scope(resource_id: &str) -> &str {
    truncate_at(resource_id, PROVIDERS_SEGMENT)
}

/// The resource group scope truncated at `/resourceGroups`.
pub fn subscription_scope(resource_id: &str) -> &str {
    truncate_at(resource_group_scope(resource_id), RESOURCE_GROUPS_SEGMENT)
}

/// Last path segment of a resource id.
pub fn resource_name(resource_id: &str) -> &str {
    resource_id.trim_end_matches('/').rsplit('/').next().unwrap_or(resource_id)
}

fn truncate_at<'a>(value: &'a str, segment: &str) -> &'a str {
    value.find(segment).map_or(value, |index| &value[..index])
}

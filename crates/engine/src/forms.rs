//! Constructors wiring a pipeline, a profile and the configuration into a session.

use std::sync::Arc;

use fieldscout_types::{FunctionTemplate, StorageAccount};

use crate::collaborators::{BindingLookup, CapabilityFetch, CredentialLookup, FunctionInventoryLookup, PermissionCheck};
use crate::config::FieldscoutConfig;
use crate::pipeline::{BindingDiscovery, StorageDiscovery};
use crate::profiles::{FunctionCreateProfile, StorageMountProfile};
use crate::scenario::{ScenarioFlags, SiteDescriptor};
use crate::session::DiscoverySession;

/// Session for the storage mount form of `site`.
pub fn storage_mount_session<C>(
    config: &FieldscoutConfig,
    site: &SiteDescriptor,
    accounts: Vec<StorageAccount>,
    collaborators: Arc<C>,
) -> DiscoverySession<StorageMountProfile>
where
    C: CredentialLookup + CapabilityFetch + 'static,
{
    let flags = ScenarioFlags::resolve(&config.scenarios, site);
    let pipeline = StorageDiscovery::new(accounts.clone(), flags, collaborators.clone(), collaborators);
    let profile = StorageMountProfile::new(accounts, flags, config.messages.clone(), config.classifier);
    DiscoverySession::new(Arc::new(pipeline), profile, config.session)
}

/// Session for creating a function from `templates` on the app `resource_id`.
pub fn function_create_session<C>(
    config: &FieldscoutConfig,
    resource_id: &str,
    templates: Vec<FunctionTemplate>,
    collaborators: Arc<C>,
) -> DiscoverySession<FunctionCreateProfile>
where
    C: BindingLookup + FunctionInventoryLookup + PermissionCheck + 'static,
{
    let pipeline = BindingDiscovery::new(
        resource_id,
        templates.clone(),
        collaborators.clone(),
        collaborators.clone(),
        collaborators,
    );
    let profile = FunctionCreateProfile::new(templates, config.messages.clone(), config.classifier);
    DiscoverySession::new(Arc::new(pipeline), profile, config.session)
}

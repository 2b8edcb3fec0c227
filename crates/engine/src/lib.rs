//! # Fieldscout Engine
//!
//! Selection-triggered discovery and form-state reconciliation. When the user
//! picks a resource (a storage account, a function template) the engine runs a
//! bounded pipeline of dependent lookups for it, classifies partial failures
//! into one error banner, derives defaults from lopsided results and projects
//! everything into a validated field set. Changing the selection mid-run
//! supersedes the earlier run; its result is never applied.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use fieldscout_engine::{FieldscoutConfig, FixtureCollaborators, SiteDescriptor, storage_mount_session};
//! use fieldscout_types::{StorageAccount, StorageKind};
//!
//! let runtime = tokio::runtime::Runtime::new()?;
//! runtime.block_on(async {
//!     let fixture = Arc::new(FixtureCollaborators::from_json(
//!         r#"{
//!             "keys": {"media": {"data": {"keys": [{"value": "k1"}]}}},
//!             "containers": {"media": {"data": [{"name": "images"}]}}
//!         }"#,
//!     )?);
//!     let accounts = vec![StorageAccount {
//!         id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/media".into(),
//!         name: "media".into(),
//!         kind: StorageKind::BlobStorage,
//!         location: None,
//!     }];
//!     let site = SiteDescriptor {
//!         is_linux: true,
//!         ..SiteDescriptor::default()
//!     };
//!     let mut session = storage_mount_session(&FieldscoutConfig::default(), &site, accounts, fixture);
//!     session.select("media");
//!     session.settle().await;
//!     assert_eq!(session.snapshot().field_values["storage_type"], "AzureBlob");
//!     Ok::<(), Box<dyn std::error::Error>>(())
//! })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`pipeline`**: storage and binding discovery over the `collaborators` traits
//! - **`staleness`**: generation tags and the accept-only-current rule
//! - **`classify`** / **`fallback`**: banner classification and default derivation
//! - **`projector`** / **`profiles`**: field state and the concrete form layouts
//! - **`session`**: ties a pipeline and a projector to the selection lifecycle

pub mod catalog;
pub mod classify;
pub mod collaborators;
pub mod config;
pub mod fallback;
pub mod form_builder;
pub mod forms;
pub mod messages;
pub mod pipeline;
pub mod profiles;
pub mod projector;
pub mod scenario;
pub mod session;
pub mod staleness;

pub use catalog::{CatalogError, load_accounts, load_site, load_templates};
pub use classify::{ClassifierConfig, ClassifierContext, ErrorClassifier, MixedCausePrecedence};
pub use collaborators::{
    ArmCollaborators, BindingLookup, CapabilityFetch, CollaboratorError, CredentialLookup, FixtureCollaborators, FixtureDocument,
    FunctionInventoryLookup, PermissionCheck,
};
pub use config::{ConfigError, FieldscoutConfig, SessionConfig, default_config_path, load_config_from_path};
pub use fallback::{filter_binding_settings, resolve_default};
pub use form_builder::{FieldDescriptor, FieldKind, FunctionFormBuilder};
pub use forms::{function_create_session, storage_mount_session};
pub use messages::MessageCatalog;
pub use pipeline::{BindingDiscovery, DiscoveryPipeline, StorageDiscovery, required_binding_ids};
pub use profiles::{FunctionCreateProfile, StorageMountProfile};
pub use projector::{FieldProjection, FormProfile, FormStateProjector, Projection, ProjectionInput, ProjectorError, Reconciliation};
pub use scenario::{ScenarioConfig, ScenarioFlags, ScenarioStatus, SiteDescriptor};
pub use session::{DiscoverySession, ResourceKeyStore};
pub use staleness::{BeginOutcome, StalenessGuard};

//! Shared type definitions for the fieldscout workspace.
//!
//! The engine, API client and CLI all exchange the values defined here:
//! selection keys and generation tags, the stage-by-stage outcome of a
//! discovery run, the capability sets derived from it, and the form snapshot
//! handed to the rendering layer.

pub mod api;
pub mod discovery;
pub mod form;
pub mod storage;
pub mod template;

pub use api::{ApiResponse, BindingEnvelope, FunctionList, ResponseMetadata};
pub use discovery::{
    BindingCapabilities, CapabilitySet, DiscoveryResult, GenerationTag, LookupStage, PermissionScope, PipelineKind, SelectionKey,
    StageData, StageKind, StageStatus, StorageCapabilities, StorageMode,
};
pub use form::{BannerKind, ErrorBanner, FieldOption, FieldState, FormSnapshot, Notice, NoticeLevel};
pub use storage::{AccountKey, AccountKeys, StorageAccount, StorageCredential, StorageItem, StorageKind};
pub use template::{
    BindingDefinition, BindingDirection, BindingSetting, EnumOption, FunctionProperties, FunctionRecord, FunctionTemplate,
    SettingValue, TemplateBinding,
};

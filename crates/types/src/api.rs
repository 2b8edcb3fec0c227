//! Response envelopes returned by the resource-management collaborators.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::template::{BindingDefinition, FunctionRecord};

/// Outcome metadata attached to every collaborator response.
///
/// Collaborators never fail with a transport error at this layer; a failed
/// call is reported as `success == false` with the raw error payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub success: bool,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Data plus metadata, mirroring the shape of the management API helpers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub metadata: ResponseMetadata,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            metadata: ResponseMetadata {
                success: true,
                status: Some(200),
                error: None,
            },
        }
    }

    pub fn failure(status: Option<u16>, error: Option<Value>) -> Self {
        Self {
            data: None,
            metadata: ResponseMetadata {
                success: false,
                status,
                error,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.metadata.success
    }
}

/// `{ properties: [...] }` wrapper returned by the binding lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingEnvelope {
    #[serde(default)]
    pub properties: Vec<BindingDefinition>,
}

/// `{ value: [...] }` wrapper returned by the function inventory lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionList {
    #[serde(default)]
    pub value: Vec<FunctionRecord>,
}

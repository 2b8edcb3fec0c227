//! Storage account descriptors and the items discovered inside them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Account kind as reported by the resource-management API.
///
/// The kind decides which container types an account can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    StorageV2,
    Storage,
    BlobStorage,
    BlockBlobStorage,
    FileStorage,
    #[serde(other)]
    Unknown,
}

impl StorageKind {
    /// Whether blob containers can exist on this account.
    pub fn supports_blob(self) -> bool {
        !matches!(self, StorageKind::FileStorage)
    }

    /// Whether file shares can exist on this account.
    pub fn supports_files(self) -> bool {
        !self.is_blob_only()
    }

    pub fn is_blob_only(self) -> bool {
        matches!(self, StorageKind::BlobStorage | StorageKind::BlockBlobStorage)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StorageKind::StorageV2 => "StorageV2",
            StorageKind::Storage => "Storage",
            StorageKind::BlobStorage => "BlobStorage",
            StorageKind::BlockBlobStorage => "BlockBlobStorage",
            StorageKind::FileStorage => "FileStorage",
            StorageKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A storage account the user may pick as a mount source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAccount {
    /// Full resource id (`/subscriptions/.../storageAccounts/<name>`).
    pub id: String,
    pub name: String,
    pub kind: StorageKind,
    #[serde(default)]
    pub location: Option<String>,
}

/// A blob container or a file share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

impl StorageItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Value::Null,
        }
    }
}

/// Payload of the list-keys call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKeys {
    #[serde(default)]
    pub keys: Vec<AccountKey>,
}

impl AccountKeys {
    /// The key used to talk to the data plane: always the first one listed.
    pub fn primary_value(&self) -> Option<&str> {
        self.keys.first().map(|key| key.value.as_str()).filter(|value| !value.is_empty())
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountKey {
    #[serde(default)]
    pub key_name: Option<String>,
    pub value: String,
    #[serde(default)]
    pub permissions: Option<String>,
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKey")
            .field("key_name", &self.key_name)
            .field("value", &"<redacted>")
            .field("permissions", &self.permissions)
            .finish()
    }
}

/// Credential payload passed to the capability fetches.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageCredential {
    pub account_name: String,
    pub access_key: String,
}

impl fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredential")
            .field("account_name", &self.account_name)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_deserializes_to_unknown() {
        let account: StorageAccount = serde_json::from_str(r#"{"id":"/x","name":"acct","kind":"SomethingNew"}"#).expect("parse");
        assert_eq!(account.kind, StorageKind::Unknown);
        assert!(account.kind.supports_blob());
        assert!(account.kind.supports_files());
    }

    #[test]
    fn kind_capabilities() {
        assert!(StorageKind::BlobStorage.is_blob_only());
        assert!(!StorageKind::BlobStorage.supports_files());
        assert!(!StorageKind::FileStorage.supports_blob());
        assert!(StorageKind::StorageV2.supports_blob() && StorageKind::StorageV2.supports_files());
    }

    #[test]
    fn primary_key_ignores_empty_values() {
        let keys: AccountKeys = serde_json::from_str(r#"{"keys":[{"keyName":"key1","value":""}]}"#).expect("parse");
        assert_eq!(keys.primary_value(), None);
        assert_eq!(AccountKeys::default().primary_value(), None);
    }

    #[test]
    fn credential_debug_hides_key() {
        let credential = StorageCredential {
            account_name: "acct".into(),
            access_key: "super-secret".into(),
        };
        assert!(!format!("{credential:?}").contains("super-secret"));
    }
}

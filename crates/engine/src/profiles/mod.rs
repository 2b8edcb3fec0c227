//! Form profiles: field layout and reconciliation rules of the concrete forms.

pub mod function_create;
pub mod storage_mount;

pub use function_create::{FunctionCreateProfile, unique_function_name};
pub use storage_mount::StorageMountProfile;

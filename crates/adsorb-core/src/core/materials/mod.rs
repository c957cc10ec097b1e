//! Candidate materials and the session-scoped registry that validates and stores
//! them.

pub mod definition;
pub mod registry;

pub use definition::MaterialDefinition;
pub use registry::{MaterialRegistry, RegistrationReceipt, RegistryError};

//! Infrastructure layer: the identity/tenant directory and the external
//! profile service.

pub mod directory;
pub mod profiles;

pub use directory::{
    AssignmentOutcome, DirectoryStore, InMemoryDirectory, Membership, NewTenant, NewUser, SharedDirectory,
    StoreError, StoreResult, TenantMember, TenantRecord, TenantSummary, UserRecord,
};
pub use profiles::{
    DisabledProfileDirectory, ExternalGrant, ExternalProfile, HttpProfileDirectory, ProfileDirectory, ProfileLookup,
    SharedProfiles, StaticProfileDirectory,
};

#[cfg(feature = "postgres")]
pub use directory::PostgresDirectory;

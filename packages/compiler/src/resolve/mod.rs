//! Name resolution: scopes, includes, feature flags, the script
//! resolver.

pub mod feature_flags;
pub mod include_resolver;
pub mod scope;
pub mod script_resolver;

//! Config schema: packaged definitions, plugin registry, validator.

pub mod definitions;
pub mod plugins;
pub mod validator;

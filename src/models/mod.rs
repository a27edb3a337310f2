// Models module for data structures
pub mod invocation;
pub mod package_spec;
pub mod registry;
pub mod version;

// Services module for business logic
pub mod dispatcher;
pub mod installer;
pub mod launcher;
pub mod lifecycle;
pub mod package_cache;
pub mod registry_client;
pub mod update_notifier;
pub mod version_resolver;

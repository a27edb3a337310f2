#![cfg(unix)]

use std::path::Path;

use mockito::Server;
use tempfile::TempDir;

use scaffold::models::invocation::InvocationContext;
use scaffold::services::dispatcher::{DispatchState, Dispatcher};
use scaffold::services::launcher::Launcher;
use scaffold::services::registry_client::RegistryClient;
use scaffold::services::version_resolver::VersionResolver;
use scaffold::utils::config::{Config, ConfigFile, ConfigOverrides};
use scaffold::utils::error::CliError;

use super::support::{mock_package, write_package, FakeInstaller};

const PACKAGE: &str = "scaffold-init";

/// Exits with `code` when the entry file exists, 99 otherwise
struct EntryCheckLauncher(i32);

impl Launcher for EntryCheckLauncher {
    fn command(&self, entry: &Path, _payload: &str) -> tokio::process::Command {
        let mut command = tokio::process::Command::new("sh");
        command
            .arg("-c")
            .arg(format!("test -f \"$0\" && exit {} || exit 99", self.0))
            .arg(entry);
        command
    }
}

fn config_for(cli_home: &Path, registry_url: &str) -> Config {
    let file = ConfigFile::parse(&format!(
        r#"
registry = "mock"

[registries]
mock = "{registry_url}"

[commands]
init = "{PACKAGE}"
"#
    ))
    .unwrap();
    Config::from_file(cli_home.to_path_buf(), file, &ConfigOverrides::default()).unwrap()
}

fn ctx() -> InvocationContext {
    InvocationContext::from_cli_args(&["my-app".to_string(), "--force".to_string()])
}

#[tokio::test]
async fn test_empty_cache_fetches_then_runs() {
    let mut server = Server::new_async().await;
    let _mock = mock_package(&mut server, PACKAGE, &["1.0.0", "1.2.0"], 1).await;
    let temp = TempDir::new().unwrap();
    let config = config_for(temp.path(), &server.url());
    let resolver = VersionResolver::new(RegistryClient::from_config(&config));
    let dispatcher = Dispatcher::new(&config, resolver, FakeInstaller::default(), EntryCheckLauncher(7));

    let report = dispatcher.dispatch("init", &ctx()).await;

    assert_eq!(report.exit_code(), 7);
    assert_eq!(
        report.trace,
        vec![
            DispatchState::Resolving,
            DispatchState::Fetching,
            DispatchState::Ready,
            DispatchState::Running,
            DispatchState::Done
        ]
    );
    assert!(config
        .store_dir()
        .join("scaffold-init@1.2.0/node_modules/scaffold-init/index.js")
        .is_file());
}

#[tokio::test]
async fn test_cached_package_is_updated_then_run() {
    let mut server = Server::new_async().await;
    let _mock = mock_package(&mut server, PACKAGE, &["1.0.0", "1.2.0"], 2).await;
    let temp = TempDir::new().unwrap();
    let config = config_for(temp.path(), &server.url());
    write_package(
        &config.store_dir().join("scaffold-init@1.2.0/node_modules/scaffold-init"),
        PACKAGE,
        "1.2.0",
    );
    let resolver = VersionResolver::new(RegistryClient::from_config(&config));
    let installer = FakeInstaller::default();
    let dispatcher = Dispatcher::new(&config, resolver, installer, EntryCheckLauncher(0));

    let report = dispatcher.dispatch("init", &ctx()).await;

    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        report.trace,
        vec![
            DispatchState::Resolving,
            DispatchState::Cached,
            DispatchState::Ready,
            DispatchState::Running,
            DispatchState::Done
        ]
    );
}

#[tokio::test]
async fn test_install_failure_stops_before_running() {
    let mut server = Server::new_async().await;
    let _mock = mock_package(&mut server, PACKAGE, &["1.0.0"], 1).await;
    let temp = TempDir::new().unwrap();
    let config = config_for(temp.path(), &server.url());
    let resolver = VersionResolver::new(RegistryClient::from_config(&config));
    let dispatcher = Dispatcher::new(&config, resolver, FakeInstaller::failing(), EntryCheckLauncher(0));

    let report = dispatcher.dispatch("init", &ctx()).await;

    assert!(matches!(report.result, Err(CliError::InstallFailed { .. })));
    assert_eq!(report.exit_code(), 1);
    assert_eq!(
        report.trace,
        vec![DispatchState::Resolving, DispatchState::Fetching, DispatchState::Failed]
    );
}

#[tokio::test]
async fn test_unreachable_registry_fails_while_resolving() {
    let temp = TempDir::new().unwrap();
    let config = config_for(temp.path(), "http://127.0.0.1:9");
    let resolver = VersionResolver::new(RegistryClient::from_config(&config));
    let dispatcher = Dispatcher::new(&config, resolver, FakeInstaller::default(), EntryCheckLauncher(0));

    let report = dispatcher.dispatch("init", &ctx()).await;

    assert!(matches!(report.result, Err(CliError::RegistryUnreachable { .. })));
    assert_eq!(report.trace, vec![DispatchState::Resolving, DispatchState::Failed]);
}

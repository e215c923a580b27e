// tests/package_launch.rs

use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use uuid::Uuid;

use testagent::errors::AgentError;
use testagent::launcher::{LaunchContext, LauncherRegistry};
use testagent::package::load_package;

fn context() -> LaunchContext {
    LaunchContext {
        install_dir: PathBuf::from("/opt/testagent"),
        caller_pid: 99,
        working_dir: PathBuf::from("/work"),
    }
}

#[test]
fn package_file_drives_the_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = NamedTempFile::new_in(dir.path()).unwrap();
    write!(
        file,
        r#"
path = "bin/unit tests.dll"

[settings]
TargetRuntimeFramework = "netcore-8.0"
InternalTraceLevel = "Verbose"
DebugAgent = true
WorkDirectory = "/tmp/agent work"
LoadUserProfile = true
"#
    )
    .unwrap();

    let package = load_package(file.path()).unwrap();
    assert_eq!(package.full_name(), dir.path().join("bin/unit tests.dll"));

    let registry = LauncherRegistry::default_for(&context());
    let id = Uuid::new_v4();
    let invocation = registry
        .build_invocation(id, Some("tcp://127.0.0.1:7000"), &package)
        .unwrap();

    assert_eq!(invocation.program, PathBuf::from("dotnet"));
    assert_eq!(
        invocation.args,
        vec![
            "/opt/testagent/agent/net80-agent.dll".to_string(),
            format!("--agentId={id}"),
            "--agencyUrl=tcp://127.0.0.1:7000".to_string(),
            "--pid=99".to_string(),
            "--trace=Verbose".to_string(),
            "--debug-agent".to_string(),
            "--work=/tmp/agent work".to_string(),
        ]
    );
    assert!(invocation.load_user_profile);
    assert!(invocation.create_no_window);
    assert!(invocation.argument_string().ends_with("'--work=/tmp/agent work'"));
}

#[test]
fn direct_invocation_names_the_package() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = NamedTempFile::new_in(dir.path()).unwrap();
    write!(
        file,
        r#"
path = "/abs/suite.dll"

[settings]
TargetRuntimeFramework = "netcore-6.0"
"#
    )
    .unwrap();

    let package = load_package(file.path()).unwrap();
    let invocation = LauncherRegistry::default_for(&context())
        .build_invocation(Uuid::nil(), None, &package)
        .unwrap();

    assert_eq!(
        invocation.args,
        vec![
            "/opt/testagent/agent/net60-agent.dll".to_string(),
            "/abs/suite.dll".to_string(),
        ]
    );
    assert!(!invocation.create_no_window);
    assert_eq!(invocation.working_dir, PathBuf::from("/work"));
}

#[test]
fn empty_path_returns_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "path = \"  \"\n").unwrap();

    match load_package(file.path()) {
        Err(AgentError::ConfigError(msg)) => assert!(msg.contains("non-empty")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn malformed_toml_returns_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "path = [unterminated\n").unwrap();

    assert!(matches!(load_package(file.path()), Err(AgentError::TomlError(_))));
}

// tests/controller_agency.rs

use std::time::Duration;

use uuid::Uuid;

use testagent::agent::{AgentContext, Collaborators, LifecycleController, LifecycleState};
use testagent::cli::AgentOptions;
use testagent::exit_code::AgentExitCode;
use testagent_test_utils::builders::ResultNodeBuilder;
use testagent_test_utils::fakes::{
    AgentScript, FakeAgentFactory, FakeDebugger, FakeProcessLocator, FakeTestEngine, SharedBuffer,
};
use testagent_test_utils::{init_tracing, with_timeout};

const AGENCY_PID: u32 = 4242;
const AGENCY_URL: &str = "tcp://127.0.0.1:9000";

fn agency_options(agent_id: Uuid, pid: Option<u32>) -> AgentOptions {
    AgentOptions {
        agent_id,
        agency_url: Some(AGENCY_URL.to_string()),
        agency_pid: pid,
        work: None,
        trace: None,
        debug_agent: false,
        debug_tests: false,
        files: Vec::new(),
    }
}

fn context() -> AgentContext {
    AgentContext {
        pid: 777,
        version: "0.1.0-test".to_string(),
    }
}

fn controller(
    options: AgentOptions,
    agents: FakeAgentFactory,
    locator: FakeProcessLocator,
    debugger: FakeDebugger,
) -> LifecycleController {
    let collaborators = Collaborators {
        agents: Box::new(agents),
        locator: Box::new(locator),
        debugger: Box::new(debugger),
        engine: Box::new(FakeTestEngine::returning(ResultNodeBuilder::new("Passed").build())),
        out: Box::new(SharedBuffer::new()),
    };
    LifecycleController::new(context(), options, collaborators)
        .with_poll_interval(Duration::from_millis(1))
}

#[tokio::test]
async fn stop_signal_ends_session_cleanly() {
    init_tracing();
    let id = Uuid::new_v4();
    let (agents, record) = FakeAgentFactory::new(AgentScript::stops_on(3));
    let locator = FakeProcessLocator::alive(AGENCY_PID);
    let checks = locator.checks();

    let mut ctl = controller(
        agency_options(id, Some(AGENCY_PID)),
        agents,
        locator,
        FakeDebugger::launches_ok(),
    );
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::Ok);
    assert_eq!(ctl.state(), LifecycleState::Stopped);

    let record = record.lock().unwrap();
    assert_eq!(record.created, vec![(id, AGENCY_URL.to_string())]);
    assert_eq!(record.starts, 1);
    assert_eq!(record.waits, 3);
    assert!(record.timeouts.iter().all(|t| *t == Duration::from_millis(1)));
    // Liveness is checked after every wait that did not see the stop signal.
    assert_eq!(*checks.lock().unwrap(), 2);
}

#[tokio::test]
async fn agency_death_wins_over_later_stop() {
    init_tracing();
    let (agents, record) = FakeAgentFactory::new(AgentScript::stops_on(5));
    let locator = FakeProcessLocator::dies_on_check(AGENCY_PID, 2);

    let mut ctl = controller(
        agency_options(Uuid::new_v4(), Some(AGENCY_PID)),
        agents,
        locator,
        FakeDebugger::launches_ok(),
    );
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::ParentProcessTerminated);
    assert_eq!(code.code(), -1);
    assert_eq!(ctl.state(), LifecycleState::Faulted);
    assert_eq!(record.lock().unwrap().waits, 2);
}

#[tokio::test]
async fn stop_in_same_tick_as_agency_death_is_clean() {
    init_tracing();
    // The agency would be found dead on the second check, but the second
    // wait already sees the stop signal.
    let (agents, _record) = FakeAgentFactory::new(AgentScript::stops_on(2));
    let locator = FakeProcessLocator::dies_on_check(AGENCY_PID, 2);
    let checks = locator.checks();

    let mut ctl = controller(
        agency_options(Uuid::new_v4(), Some(AGENCY_PID)),
        agents,
        locator,
        FakeDebugger::launches_ok(),
    );
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::Ok);
    assert_eq!(*checks.lock().unwrap(), 1);
}

#[tokio::test]
async fn unresolvable_agency_fails_before_any_agent_exists() {
    init_tracing();
    let (agents, record) = FakeAgentFactory::new(AgentScript::stops_on(1));
    let locator = FakeProcessLocator::nothing();
    let lookups = locator.lookups();

    let mut ctl = controller(
        agency_options(Uuid::new_v4(), Some(AGENCY_PID)),
        agents,
        locator,
        FakeDebugger::launches_ok(),
    );
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::UnableToLocateAgency);
    assert_eq!(code.code(), -5);
    assert_eq!(*lookups.lock().unwrap(), vec![AGENCY_PID]);
    assert!(record.lock().unwrap().created.is_empty());
}

#[tokio::test]
async fn refused_start_is_failed_to_start() {
    init_tracing();
    let (agents, record) = FakeAgentFactory::new(AgentScript::refuses_to_start());

    let mut ctl = controller(
        agency_options(Uuid::new_v4(), Some(AGENCY_PID)),
        agents,
        FakeProcessLocator::alive(AGENCY_PID),
        FakeDebugger::launches_ok(),
    );
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::FailedToStartRemoteAgent);
    assert_eq!(code.code(), -2);
    assert_eq!(record.lock().unwrap().waits, 0);
}

#[tokio::test]
async fn start_error_is_unexpected_exception() {
    init_tracing();
    let (agents, _record) = FakeAgentFactory::new(AgentScript::fails_to_start());

    let mut ctl = controller(
        agency_options(Uuid::new_v4(), Some(AGENCY_PID)),
        agents,
        FakeProcessLocator::alive(AGENCY_PID),
        FakeDebugger::launches_ok(),
    );
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::UnexpectedException);
    assert_eq!(code.code(), -100);
    assert_eq!(ctl.state(), LifecycleState::Faulted);
}

#[tokio::test]
async fn wait_error_is_unexpected_exception() {
    init_tracing();
    let (agents, _record) = FakeAgentFactory::new(AgentScript::fails_on_wait(3));

    let mut ctl = controller(
        agency_options(Uuid::new_v4(), Some(AGENCY_PID)),
        agents,
        FakeProcessLocator::alive(AGENCY_PID),
        FakeDebugger::launches_ok(),
    );
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::UnexpectedException);
}

#[tokio::test]
async fn missing_pid_skips_liveness_checks() {
    init_tracing();
    let (agents, _record) = FakeAgentFactory::new(AgentScript::stops_on(4));
    let locator = FakeProcessLocator::dies_on_check(AGENCY_PID, 1);
    let lookups = locator.lookups();
    let checks = locator.checks();

    let mut ctl = controller(
        agency_options(Uuid::new_v4(), None),
        agents,
        locator,
        FakeDebugger::launches_ok(),
    );
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::Ok);
    assert!(lookups.lock().unwrap().is_empty());
    assert_eq!(*checks.lock().unwrap(), 0);
}

#[tokio::test]
async fn empty_agency_url_means_direct_mode() {
    init_tracing();
    let (agents, record) = FakeAgentFactory::new(AgentScript::stops_on(1));
    let mut options = agency_options(Uuid::new_v4(), Some(AGENCY_PID));
    options.agency_url = Some(String::new());

    let mut ctl = controller(options, agents, FakeProcessLocator::alive(AGENCY_PID), FakeDebugger::launches_ok());
    let err = ctl.run().await.unwrap_err();

    assert!(matches!(err, testagent::errors::AgentError::NoFileSpecified));
    assert!(record.lock().unwrap().created.is_empty());
}

#[tokio::test]
async fn debugger_denied_exits_with_security_violation() {
    init_tracing();
    let (agents, record) = FakeAgentFactory::new(AgentScript::stops_on(1));
    let debugger = FakeDebugger::denied();
    let mut options = agency_options(Uuid::new_v4(), Some(AGENCY_PID));
    options.debug_agent = true;

    let mut ctl = controller(options, agents, FakeProcessLocator::alive(AGENCY_PID), debugger);
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::DebuggerSecurityViolation);
    assert_eq!(code.code(), -3);
    assert!(record.lock().unwrap().created.is_empty());
}

#[tokio::test]
async fn debugger_unsupported_exits_with_not_implemented() {
    init_tracing();
    let (agents, _record) = FakeAgentFactory::new(AgentScript::stops_on(1));
    let mut options = agency_options(Uuid::new_v4(), Some(AGENCY_PID));
    options.debug_tests = true;

    let mut ctl = controller(
        options,
        agents,
        FakeProcessLocator::alive(AGENCY_PID),
        FakeDebugger::unsupported(),
    );
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::DebuggerNotImplemented);
    assert_eq!(code.code(), -4);
}

#[tokio::test]
async fn attached_debugger_is_not_relaunched() {
    init_tracing();
    let (agents, _record) = FakeAgentFactory::new(AgentScript::stops_on(1));
    let debugger = FakeDebugger::already_attached();
    let launches = debugger.launches();
    let mut options = agency_options(Uuid::new_v4(), Some(AGENCY_PID));
    options.debug_agent = true;

    let mut ctl = controller(options, agents, FakeProcessLocator::alive(AGENCY_PID), debugger);
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::Ok);
    assert_eq!(*launches.lock().unwrap(), 0);
}

#[tokio::test]
async fn successful_debugger_launch_continues() {
    init_tracing();
    let (agents, _record) = FakeAgentFactory::new(AgentScript::stops_on(1));
    let debugger = FakeDebugger::launches_ok();
    let launches = debugger.launches();
    let mut options = agency_options(Uuid::new_v4(), Some(AGENCY_PID));
    options.debug_agent = true;

    let mut ctl = controller(options, agents, FakeProcessLocator::alive(AGENCY_PID), debugger);
    let code = with_timeout(ctl.run()).await.unwrap();

    assert_eq!(code, AgentExitCode::Ok);
    assert_eq!(*launches.lock().unwrap(), 1);
}

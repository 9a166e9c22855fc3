//! FSM unit tests

use deployer::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentState};

fn dispatching() -> DeploymentFsm {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Begin).unwrap();
    fsm.process(DeploymentEvent::Authorized).unwrap();
    fsm.process(DeploymentEvent::Validated).unwrap();
    fsm
}

#[test]
fn test_fsm_initial_state() {
    let fsm = DeploymentFsm::new();
    assert_eq!(fsm.state(), &DeploymentState::Received);
    assert!(fsm.error().is_none());
    assert!(!fsm.state().is_terminal());
}

#[test]
fn test_fsm_watched_flow() {
    let mut fsm = dispatching();
    assert_eq!(fsm.state(), &DeploymentState::Dispatching);

    // Dispatching -> Watching
    fsm.process(DeploymentEvent::Watch).unwrap();
    assert_eq!(fsm.state(), &DeploymentState::Watching);

    // Watching -> Succeeded
    fsm.process(DeploymentEvent::Complete).unwrap();
    assert_eq!(fsm.state(), &DeploymentState::Succeeded);
}

#[test]
fn test_fsm_skips_watching() {
    let mut fsm = dispatching();

    fsm.process(DeploymentEvent::Complete).unwrap();
    assert_eq!(fsm.state(), &DeploymentState::Succeeded);
}

#[test]
fn test_fsm_failure_from_every_active_state() {
    let failing = |prefix: &[DeploymentEvent]| {
        let mut fsm = DeploymentFsm::new();
        for event in prefix {
            fsm.process(event.clone()).unwrap();
        }
        fsm.process(DeploymentEvent::Fail("boom".to_string())).unwrap();
        assert_eq!(fsm.state(), &DeploymentState::Failed);
        assert_eq!(fsm.error(), Some("boom"));
    };

    failing(&[DeploymentEvent::Begin]);
    failing(&[DeploymentEvent::Begin, DeploymentEvent::Authorized]);
    failing(&[
        DeploymentEvent::Begin,
        DeploymentEvent::Authorized,
        DeploymentEvent::Validated,
    ]);
    failing(&[
        DeploymentEvent::Begin,
        DeploymentEvent::Authorized,
        DeploymentEvent::Validated,
        DeploymentEvent::Watch,
    ]);
}

#[test]
fn test_fsm_invalid_transition() {
    let mut fsm = DeploymentFsm::new();

    // Cannot validate before authenticating
    assert!(fsm.process(DeploymentEvent::Validated).is_err());
    assert_eq!(fsm.state(), &DeploymentState::Received);

    // Cannot fail before starting
    assert!(fsm.process(DeploymentEvent::Fail("early".to_string())).is_err());
}

#[test]
fn test_fsm_resolves_once() {
    let mut fsm = dispatching();
    fsm.process(DeploymentEvent::Watch).unwrap();
    fsm.process(DeploymentEvent::Complete).unwrap();

    assert!(fsm.process(DeploymentEvent::Complete).is_err());
    assert!(fsm.process(DeploymentEvent::Fail("late".to_string())).is_err());
    assert_eq!(fsm.state(), &DeploymentState::Succeeded);
}

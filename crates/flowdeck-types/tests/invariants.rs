use flowdeck_types::{
    FlowCode, Intent, PlatformOrigin, Position, Process, Schedule, Session, TerminationReason,
    Tldr, Quality,
};

#[test]
fn fresh_session_has_no_tldr_and_satisfies_invariant_six() {
    let session = Session::new("add a function", PlatformOrigin::Cli, Intent::Coding);
    assert!(session.tldr_invariant_holds());
    assert!(session.tldr.is_none());
}

#[test]
fn goal_met_without_tldr_violates_invariant_six() {
    let mut session = Session::new("add a function", PlatformOrigin::Cli, Intent::Coding);
    session.orchestration.termination_reason = Some(TerminationReason::GoalMet);
    assert!(!session.tldr_invariant_holds());

    session.tldr = Some(Tldr {
        prompt_goal: "add a function".into(),
        implementation: "done".into(),
        expert_consensus: "agreed".into(),
        discoveries: vec![],
        issues: "none".into(),
        quality: Quality::Acceptable,
        justification: "solid".into(),
        recommendations: vec!["ship it".into()],
    });
    assert!(session.tldr_invariant_holds());
}

#[test]
fn aborted_run_with_tldr_violates_invariant_six() {
    let mut session = Session::new("x", PlatformOrigin::Cli, Intent::Coding);
    session.orchestration.termination_reason = Some(TerminationReason::Aborted);
    session.tldr = Some(Tldr {
        prompt_goal: "x".into(),
        implementation: "y".into(),
        expert_consensus: "z".into(),
        discoveries: vec![],
        issues: "".into(),
        quality: Quality::NeedsImprovement,
        justification: "".into(),
        recommendations: vec![],
    });
    assert!(!session.tldr_invariant_holds());
}

#[test]
fn flow_code_matches_happy_path_regex_shape() {
    let mut code = FlowCode::empty();
    let mut prev = Position::START;
    for schedule in Schedule::ALL {
        for process in Process::ALL {
            let next = Position::new(schedule, process);
            code.push(prev, next);
            prev = next;
        }
    }
    assert_eq!(code.as_str(), "S1P123S2P123S3P123S4P123S5P123");
    assert_eq!(code.positions().unwrap().len(), 15);
}

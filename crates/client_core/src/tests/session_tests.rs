use super::*;

fn catalog(names: &[&str]) -> Arc<PatternCatalog> {
    Arc::new(PatternCatalog::from_names(names.iter().copied()))
}

fn names(selection: &BTreeSet<PatternName>) -> Vec<&str> {
    selection.iter().map(PatternName::as_str).collect()
}

#[test]
fn configure_steps_creates_empty_steps_for_every_allowed_count() {
    let mut session = RefinementSession::new(catalog(&["Logger"]));
    for count in 1..=MAX_REFINEMENT_STEPS {
        session.configure_steps(count).expect("valid count");
        assert_eq!(session.steps().len(), count);
        assert!(session.steps().iter().all(|step| !step.is_valid()));
        let indices: Vec<usize> = session.steps().iter().map(RefinementStep::index).collect();
        assert_eq!(indices, (1..=count).collect::<Vec<_>>());
    }
}

#[test]
fn configure_steps_rejects_zero_and_more_than_twenty() {
    let mut session = RefinementSession::new(catalog(&["Logger"]));
    session.configure_steps(2).expect("valid");
    session.toggle(1, "Logger").expect("toggle");

    assert_eq!(
        session.configure_steps(0),
        Err(ComposerError::InvalidStepCount(0))
    );
    assert_eq!(
        session.configure_steps(21),
        Err(ComposerError::InvalidStepCount(21))
    );
    // Rejected counts leave the existing steps alone.
    assert_eq!(session.steps().len(), 2);
    assert!(session.steps()[0].is_selected("Logger"));
}

#[test]
fn configure_steps_discards_prior_selections() {
    let mut session = RefinementSession::new(catalog(&["Logger", "Mutex"]));
    session.configure_steps(1).expect("valid");
    session.toggle(1, "Mutex").expect("toggle");
    session.configure_steps(1).expect("valid");
    assert!(session.steps()[0].selection().is_empty());
}

#[test]
fn readiness_requires_catalog_steps_and_a_selection_per_step() {
    let mut session = RefinementSession::new(catalog(&["Logger", "Mutex"]));
    assert!(!session.is_ready());

    session.configure_steps(2).expect("valid");
    assert!(!session.is_ready());

    session.toggle(1, "Logger").expect("toggle");
    assert!(!session.is_ready());

    session.toggle(2, "Mutex").expect("toggle");
    assert!(session.is_ready());

    assert_eq!(session.toggle(2, "Mutex"), Ok(false));
    assert!(!session.is_ready());
}

#[test]
fn empty_catalog_is_never_ready() {
    let mut session = RefinementSession::new(catalog(&["Logger"]));
    session.configure_steps(1).expect("valid");
    session.toggle(1, "Logger").expect("toggle");
    assert!(session.is_ready());

    session.replace_catalog(catalog(&[]));
    assert!(!session.is_ready());
    session.configure_steps(3).expect("valid");
    assert!(!session.is_ready());
}

#[test]
fn toggle_out_of_range_is_rejected_without_mutation() {
    let mut session = RefinementSession::new(catalog(&["Logger"]));
    session.configure_steps(1).expect("valid");

    assert_eq!(
        session.toggle(0, "Logger"),
        Err(ComposerError::StepOutOfRange { index: 0, len: 1 })
    );
    assert_eq!(
        session.toggle(2, "Logger"),
        Err(ComposerError::StepOutOfRange { index: 2, len: 1 })
    );
    assert!(session.steps()[0].selection().is_empty());
}

#[test]
fn toggle_rejects_patterns_outside_the_catalog() {
    let mut session = RefinementSession::new(catalog(&["Logger"]));
    session.configure_steps(1).expect("valid");
    assert_eq!(
        session.toggle(1, "Ghost"),
        Err(ComposerError::UnknownPattern("Ghost".to_string()))
    );
}

#[test]
fn clear_empties_the_sequence() {
    let mut session = RefinementSession::new(catalog(&["Logger"]));
    session.configure_steps(3).expect("valid");
    session.clear();
    assert!(session.steps().is_empty());
    assert!(!session.is_ready());
}

#[test]
fn reloading_the_catalog_prunes_removed_patterns() {
    let mut session = RefinementSession::new(catalog(&["Logger", "Mutex"]));
    session.configure_steps(2).expect("valid");
    session.toggle(1, "Logger").expect("toggle");
    session.toggle(1, "Mutex").expect("toggle");
    session.toggle(2, "Mutex").expect("toggle");
    assert!(session.is_ready());

    let pruned = session.replace_catalog(catalog(&["Logger", "Queue"]));

    assert_eq!(pruned, 2);
    assert_eq!(names(session.steps()[0].selection()), vec!["Logger"]);
    assert!(session.steps()[1].selection().is_empty());
    assert!(!session.is_ready());
}

#[test]
fn multi_step_payload_follows_step_order() {
    let mut session = RefinementSession::new(catalog(&["Logger", "Mutex"]));
    session.configure_steps(2).expect("valid");
    session.toggle(1, "Mutex").expect("toggle");
    session.toggle(2, "Logger").expect("toggle");
    session.toggle(2, "Mutex").expect("toggle");

    assert_eq!(
        session.payload(),
        RefinementPayload::MultiStep {
            refinements: vec![
                vec!["Mutex".into()],
                vec!["Logger".into(), "Mutex".into()],
            ],
        }
    );
}

#[test]
fn parse_step_count_accepts_trimmed_numbers_in_range() {
    assert_eq!(parse_step_count(" 3 "), Ok(3));
    assert_eq!(parse_step_count("20"), Ok(20));
    assert_eq!(parse_step_count("0"), Err(ComposerError::InvalidStepCount(0)));
    assert_eq!(parse_step_count("-4"), Err(ComposerError::InvalidStepCount(0)));
    assert_eq!(parse_step_count("abc"), Err(ComposerError::InvalidStepCount(0)));
    assert_eq!(parse_step_count("21"), Err(ComposerError::InvalidStepCount(21)));
    assert_eq!(
        parse_step_count("99999999999999999999"),
        Err(ComposerError::InvalidStepCount(usize::MAX))
    );
    assert_eq!(
        parse_step_count("-99999999999999999999"),
        Err(ComposerError::InvalidStepCount(0))
    );
    assert_eq!(
        ComposerError::InvalidStepCount(0).to_string(),
        "Enter a refinement count of at least 1."
    );
    assert_eq!(
        parse_step_count("99999999999999999999")
            .expect_err("overflow")
            .to_string(),
        "Please choose 20 refinements or fewer to keep things manageable."
    );
}

#[tokio::test]
async fn single_step_readiness_and_payload_use_the_persisted_counter() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CounterStore::new(dir.path().join("state.json"));
    store.save(4).await;

    let mut session = SingleStepSession::load(catalog(&["Logger", "Mutex"]), store).await;
    assert_eq!(session.refinement(), 4);
    assert!(!session.is_ready());

    session.toggle("Logger").expect("toggle");
    assert!(session.is_ready());
    assert_eq!(
        session.payload(),
        RefinementPayload::SingleStep {
            refinement: 4,
            patterns: vec!["Logger".into()],
        }
    );
}

#[tokio::test]
async fn single_step_success_advances_and_persists_the_counter() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let mut session =
        SingleStepSession::load(catalog(&["Logger"]), CounterStore::new(path.clone())).await;
    assert_eq!(session.refinement(), 1);

    session.record_success().await;
    session.record_success().await;
    assert_eq!(session.refinement(), 3);
    assert_eq!(CounterStore::new(path.clone()).load().await, 3);

    assert_eq!(session.reset_counter().await, 1);
    assert_eq!(CounterStore::new(path).load().await, 1);
}

#[tokio::test]
async fn single_step_with_empty_catalog_is_not_ready() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = SingleStepSession::load(
        catalog(&["Logger"]),
        CounterStore::new(dir.path().join("state.json")),
    )
    .await;
    session.toggle("Logger").expect("toggle");
    assert_eq!(session.replace_catalog(catalog(&[])), 1);
    assert!(session.selection().is_empty());
    assert!(!session.is_ready());
}

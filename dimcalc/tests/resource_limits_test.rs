use dimcalc::{
    parse_keys, CalcError, CalcResult, Engine, KeyCode, KeyEvent, Macro, MacroOp, MacroOpSeq,
    Outcome, ResourceLimits, SymbolTag, TypeRegistry,
};

fn run(engine: &mut Engine, script: &str) -> CalcResult<Outcome> {
    let keys = parse_keys(script, engine.registry())?;
    engine.handle_events(keys)
}

fn limit_name(err: &CalcError) -> &str {
    match err.root_cause() {
        CalcError::LimitExceeded { limit_name, .. } => limit_name,
        other => panic!("Expected LimitExceeded error, got {other:?}"),
    }
}

#[test]
fn test_register_count() {
    let engine = Engine::with_limits(ResourceLimits::default().with_registers(12));
    assert_eq!(engine.state().register_count(), 12);
    assert_eq!(engine.limits().register_count, 12);

    let engine = Engine::with_limits(ResourceLimits::default().with_registers(1));
    assert_eq!(engine.state().register_count(), 4);
}

#[test]
fn test_undo_depth_limit() {
    let limits = ResourceLimits {
        max_undo_depth: 3,
        ..ResourceLimits::default()
    };
    let mut engine = Engine::with_limits(limits);
    run(&mut engine, "1 enter 2 enter 3 enter 4 enter").unwrap();
    assert_eq!(engine.undo_depth(), 3);
}

#[test]
fn test_recursive_macro_hits_playback_depth() {
    let limits = ResourceLimits {
        max_playback_depth: 4,
        ..ResourceLimits::default()
    };
    let mut engine = Engine::with_limits(limits);
    let ops: MacroOpSeq = [MacroOp::Key(KeyEvent::with_symbol(KeyCode::Play, "loop"))]
        .into_iter()
        .collect();
    engine
        .library_mut()
        .insert(Macro::new(SymbolTag::new("loop"), ops));

    let before = engine.state().clone();
    let err = run(&mut engine, "play(loop)").unwrap_err();
    assert_eq!(limit_name(&err), "max_playback_depth");
    assert_eq!(engine.state(), &before);
    assert_eq!(engine.context_depth(), 1);
    assert_eq!(engine.undo_depth(), 0);
}

#[test]
fn test_array_size_limit() {
    let limits = ResourceLimits {
        max_array_elements: 3,
        ..ResourceLimits::default()
    };
    let mut engine = Engine::with_limits(limits);
    run(&mut engine, "1 enter 2 concat 3 concat").unwrap();

    let err = run(&mut engine, "4 concat").unwrap_err();
    assert_eq!(limit_name(&err), "max_array_elements");
    // 4 was pushed before the failed concat
    assert_eq!(engine.state().x().as_real(), Some(4.0));
    assert_eq!(engine.state().y().map(|y| y.len()), Some(3));
}

#[test]
fn test_sequence_length_limit() {
    let limits = ResourceLimits {
        max_array_elements: 10,
        ..ResourceLimits::default()
    };
    let mut engine = Engine::with_limits(limits);
    let err = run(&mut engine, "2 enter 11 seq").unwrap_err();
    assert_eq!(limit_name(&err), "max_array_elements");
    assert_eq!(engine.context_depth(), 1);
}

#[test]
fn test_event_drain_limit() {
    let limits = ResourceLimits {
        max_event_drain: 1,
        ..ResourceLimits::default()
    };
    let mut engine = Engine::with_limits(limits);
    run(&mut engine, "1 enter 2 concat map").unwrap();

    // The modal operation hands enter back to the queue: a second event
    let err = engine.handle_event(KeyEvent::new(KeyCode::Enter)).unwrap_err();
    assert_eq!(limit_name(&err), "max_event_drain");
    assert_eq!(engine.context_depth(), 1);
}

#[test]
fn test_interned_type_limit() {
    let builtin = TypeRegistry::new().type_count();
    let limits = ResourceLimits {
        max_interned_types: builtin,
        ..ResourceLimits::default()
    };
    let mut engine = Engine::with_limits(limits);
    let err = run(&mut engine, "1 [kg] enter 1 [mol] * ").unwrap_err();
    assert!(matches!(err, CalcError::IncompatibleUnits(_)), "got {err:?}");
}

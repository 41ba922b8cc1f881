use super::{run, x};
use crate::{CalcError, Engine, FormatStyle, KeyCode, KeyEvent, Outcome, TypeTag};

#[test]
fn test_add_two_numbers() {
    let mut engine = Engine::new();
    run(&mut engine, "5 enter 3 +").unwrap();
    assert_eq!(x(&engine), 8.0);
    assert!(engine.state().x().tag().is_untyped());
}

#[test]
fn test_typed_number_is_converted() {
    let mut engine = Engine::new();
    run(&mut engine, "5 [km] [mi]").unwrap();
    assert!((x(&engine) - 3.106856).abs() < 1e-5);
    assert_eq!(engine.state().x().tag(), engine.registry().lookup("mi").unwrap());
}

#[test]
fn test_unit_folds_into_entry() {
    let mut engine = Engine::new();
    assert_eq!(run(&mut engine, "5 [km]").unwrap(), Outcome::AwaitingInput);
    let km = engine.registry().lookup("km").unwrap();
    assert_eq!(engine.entry().unwrap().tag(), km);

    run(&mut engine, "enter").unwrap();
    assert_eq!(x(&engine), 5.0);
    assert_eq!(engine.state().x().tag(), km);
}

#[test]
fn test_incompatible_add_leaves_stack_untouched() {
    let mut engine = Engine::new();
    run(&mut engine, "3 [s] enter 2 [m] swap").unwrap();
    let before = engine.state().clone();
    let depth = engine.undo_depth();

    let err = run(&mut engine, "+").unwrap_err();
    assert!(matches!(err, CalcError::IncompatibleUnits(_)), "got {err:?}");
    assert_eq!(engine.state(), &before);
    assert_eq!(engine.undo_depth(), depth);
}

#[test]
fn test_undo_restores_previous_state() {
    let mut engine = Engine::new();
    run(&mut engine, "1 enter 2 +").unwrap();
    assert_eq!(x(&engine), 3.0);

    let outcome = engine.handle_event(KeyEvent::new(KeyCode::Undo)).unwrap();
    assert_eq!(outcome, Outcome::UndoPerformed);
    assert_eq!(x(&engine), 2.0);
    assert_eq!(engine.state().y().and_then(|y| y.as_real()), Some(1.0));
}

#[test]
fn test_undo_with_empty_history_is_noop() {
    let mut engine = Engine::new();
    let outcome = engine.handle_event(KeyEvent::new(KeyCode::Undo)).unwrap();
    assert_eq!(outcome, Outcome::NoOp);
}

#[test]
fn test_undo_discards_number_being_typed() {
    let mut engine = Engine::new();
    run(&mut engine, "1 enter 2 undo").unwrap();
    assert!(engine.entry().is_none());
    assert_eq!(x(&engine), 1.0);
}

#[test]
fn test_backspace_edits_entry() {
    let mut engine = Engine::new();
    run(&mut engine, "12 back").unwrap();
    assert_eq!(engine.entry().unwrap().to_string(), "1");
    run(&mut engine, "enter").unwrap();
    assert_eq!(x(&engine), 1.0);
}

#[test]
fn test_backspace_without_entry_clears_x() {
    let mut engine = Engine::new();
    run(&mut engine, "4 enter 5 enter back").unwrap();
    assert_eq!(x(&engine), 0.0);
    assert_eq!(engine.state().y().and_then(|y| y.as_real()), Some(5.0));
}

#[test]
fn test_change_sign_negates_x_without_entry() {
    let mut engine = Engine::new();
    run(&mut engine, "4 enter chs").unwrap();
    assert_eq!(x(&engine), -4.0);
}

#[test]
fn test_negative_literal() {
    let mut engine = Engine::new();
    run(&mut engine, "-2.5 enter").unwrap();
    assert_eq!(x(&engine), -2.5);
}

#[test]
fn test_large_results_switch_to_scientific() {
    let mut engine = Engine::new();
    run(&mut engine, "1e14 enter").unwrap();
    assert_eq!(engine.state().x().format().style, FormatStyle::Scientific);

    run(&mut engine, "1e14 /").unwrap();
    assert_eq!(x(&engine), 1.0);
    assert_eq!(engine.state().x().format().style, FormatStyle::Decimal);
}

#[test]
fn test_unbound_user_key() {
    let mut engine = Engine::new();
    let err = engine.handle_event(KeyEvent::new(KeyCode::User(9))).unwrap_err();
    assert!(matches!(err, CalcError::UnknownSymbol(_)));
}

#[test]
fn test_symbol_key_without_symbol() {
    let mut engine = Engine::new();
    let err = engine.handle_event(KeyEvent::new(KeyCode::Store)).unwrap_err();
    assert!(matches!(err, CalcError::Unsupported(_)));
}

#[test]
fn test_squared_velocity_matches_area_over_time_squared() {
    let mut engine = Engine::new();
    run(&mut engine, "1 [m] enter 1 [s] / 2 ^").unwrap();
    let squared = engine.state().x().tag();

    run(&mut engine, "1 [m] enter 1 [m] * 1 [s] enter 1 [s] * /").unwrap();
    let direct = engine.state().x().tag();

    assert_eq!(squared, direct);
    assert_ne!(squared, TypeTag::UNTYPED);
    assert_eq!(x(&engine), 1.0);
}

#[test]
fn test_exponent_overflow_is_refused() {
    let mut engine = Engine::new();
    let err = run(&mut engine, "3 [m] enter 2 ^ 2000000000 ^").unwrap_err();
    assert!(matches!(err, CalcError::IncompatibleUnits(_)), "got {err:?}");
    assert_eq!(x(&engine), 2e9);
    assert_eq!(engine.state().y().and_then(|y| y.as_real()), Some(9.0));
}

#[test]
fn test_overflowing_result_is_not_committed() {
    let mut engine = Engine::new();
    run(&mut engine, "10 enter 400 swap swap").unwrap();
    let before = engine.state().clone();
    let depth = engine.undo_depth();

    let err = run(&mut engine, "^").unwrap_err();
    assert!(matches!(err, CalcError::Domain(_)), "got {err:?}");
    assert_eq!(engine.state(), &before);
    assert_eq!(engine.undo_depth(), depth);

    let err = run(&mut engine, "clear 1e200 [m] enter 1e200 [m] *").unwrap_err();
    assert!(matches!(err, CalcError::Domain(_)), "got {err:?}");
    assert_eq!(x(&engine), 1e200);
}

#[test]
fn test_named_velocity_cancels_composite_velocity() {
    let mut engine = Engine::new();
    run(&mut engine, "10 [m] enter 2 [s] / 18 [kph] /").unwrap();
    assert!((x(&engine) - 1.0).abs() < 1e-12);
    assert!(engine.state().x().tag().is_untyped());
}

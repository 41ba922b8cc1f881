use super::{run, x};
use crate::serializers::{from_json, to_json};
use crate::{CalcError, Engine, ResourceLimits, SymbolTag};

#[test]
fn test_snapshot_survives_json() {
    let mut engine = Engine::new();
    run(
        &mut engine,
        "3 [km] sto(d) rec(double) 2 * stop 1 [m] enter 1 [s] / sto(v)",
    )
    .unwrap();
    engine.library_mut().bind(2, SymbolTag::new("double"));

    let json = to_json(&engine.snapshot()).unwrap();
    let snapshot = from_json(&json).unwrap();
    assert_eq!(snapshot, engine.snapshot());

    let mut restored = Engine::new();
    restored.restore(snapshot).unwrap();
    assert_eq!(restored.state(), engine.state());
    assert_eq!(restored.library(), engine.library());

    run(&mut restored, "clear rcl(d) user(2)").unwrap();
    assert_eq!(x(&restored), 6.0);
}

#[test]
fn test_restored_registry_keeps_composite_units() {
    let mut engine = Engine::new();
    run(&mut engine, "1 [m] enter 1 [s] / enter *").unwrap();
    let tag = engine.state().x().tag();
    let symbol = engine.registry().symbol(tag).map(str::to_string);

    let mut restored = Engine::new();
    restored.restore(engine.snapshot()).unwrap();
    assert_eq!(restored.state().x().tag(), tag);
    assert_eq!(restored.registry().symbol(tag).map(str::to_string), symbol);
}

#[test]
fn test_restore_resets_history() {
    let mut engine = Engine::new();
    run(&mut engine, "1 enter 2 +").unwrap();
    let snapshot = engine.snapshot();
    run(&mut engine, "rec(f)").unwrap();

    engine.restore(snapshot).unwrap();
    assert_eq!(engine.undo_depth(), 0);
    assert!(!engine.is_recording());
    assert_eq!(x(&engine), 3.0);
}

#[test]
fn test_snapshot_with_other_register_count_is_refused() {
    let engine = Engine::new();
    let mut small = Engine::with_limits(ResourceLimits::default().with_registers(4));
    let err = small.restore(engine.snapshot()).unwrap_err();
    assert!(matches!(err, CalcError::Serialization(_)));
}

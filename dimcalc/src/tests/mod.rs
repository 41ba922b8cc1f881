// Engine tests
mod engine;



// Persistence tests
mod snapshot;

use crate::{parse_keys, CalcResult, Engine, Outcome};

/// Type a key script into the engine
fn run(engine: &mut Engine, script: &str) -> CalcResult<Outcome> {
    let keys = parse_keys(script, engine.registry())?;
    engine.handle_events(keys)
}

fn x(engine: &Engine) -> f64 {
    engine
        .state()
        .x()
        .as_real()
        .expect("X should hold a real scalar")
}

//! Stack manipulation keys

use super::pattern::{PatternOp, RegisterPattern};
use super::DispatchTables;
use crate::algebra::TypeRegistry;
use crate::keys::OpCode;
use crate::value::CalcState;
use crate::CalcResult;

pub(super) fn register(tables: &mut DispatchTables) {
    let any = RegisterPattern::any;
    tables.register_pattern(
        OpCode::Swap,
        PatternOp::new("swap", any(), |_, s| Ok(moved(s, CalcState::swap_xy))),
    );
    tables.register_pattern(
        OpCode::Drop,
        PatternOp::new("drop", any(), |_, s| Ok(moved(s, CalcState::stack_drop))),
    );
    tables.register_pattern(
        OpCode::Roll,
        PatternOp::new("roll down", any(), |_, s| Ok(moved(s, CalcState::stack_roll))),
    );
    tables.register_pattern(
        OpCode::RollUp,
        PatternOp::new("roll up", any(), |_, s| Ok(moved(s, CalcState::stack_roll_up))),
    );
    tables.register_pattern(OpCode::Dup, PatternOp::new("dup", any(), dup));
    tables.register_pattern(OpCode::LastX, PatternOp::new("last x", any(), last_x));
}

fn moved(state: &CalcState, f: fn(&mut CalcState)) -> CalcState {
    let mut next = state.clone();
    f(&mut next);
    next.no_lift = false;
    next
}

/// Duplicate X; a pending no-lift does not suppress it
fn dup(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let mut next = state.clone();
    next.no_lift = false;
    next.stack_lift();
    Ok(next)
}

fn last_x(_: &mut TypeRegistry, state: &CalcState) -> CalcResult<CalcState> {
    let mut next = state.clone();
    next.push(state.last_x.clone());
    next.no_lift = false;
    Ok(next)
}

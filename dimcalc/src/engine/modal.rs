//! Modal operations: map, reduce and sequence collect one operator key and
//! apply it to a whole array

use super::{continuation_for, Engine, Outcome};
use crate::algebra::TypeTag;
use crate::context::{ContextKind, ModalCapture, ModalOp};
use crate::keys::{KeyCode, KeyEvent, OpCode};
use crate::macros::{MacroOp, RollbackPoint};
use crate::value::{CalcState, Shape, TaggedValue, ValueKind};
use crate::{CalcError, CalcResult};
use tracing::debug;

impl Engine {
    /// Capture the operands and wait for the operator key. The stack is not
    /// touched until the operation completes.
    pub(super) fn start_modal(&mut self, key: KeyCode) -> CalcResult<Outcome> {
        let op = match key {
            KeyCode::Map => ModalOp::Map,
            KeyCode::Reduce => ModalOp::Reduce,
            _ => ModalOp::Sequence,
        };
        let x = self.state.x();
        let operands = match op {
            ModalOp::Map | ModalOp::Reduce => {
                if x.kind() != ValueKind::Real || !matches!(x.shape(), Shape::Row | Shape::Column) {
                    return Err(CalcError::type_mismatch(format!(
                        "{:?} needs a row or column of reals",
                        op
                    )));
                }
                vec![x.clone()]
            }
            ModalOp::Sequence => {
                let count = x
                    .as_integer()
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| CalcError::domain("sequence length must be a positive integer"))?;
                let seed = self
                    .state
                    .y()
                    .ok_or_else(|| CalcError::shape("sequence needs a seed in Y"))?;
                if seed.as_real().is_none() {
                    return Err(CalcError::type_mismatch("sequence seed must be a real number"));
                }
                let max = self.limits.max_array_elements;
                if count as usize > max {
                    return Err(CalcError::limit("max_array_elements", max));
                }
                vec![seed.clone(), x.clone()]
            }
        };

        let kind = ContextKind::Modal(ModalCapture {
            op,
            operands,
            pre_state: self.state.clone(),
        });
        let continuation = continuation_for(&kind);
        debug!(?op, "modal operation waiting for a key");
        self.contexts.push(kind, continuation);
        Ok(Outcome::AwaitingInput)
    }

    /// Deliver a key to the active modal context
    pub(super) fn modal_route(&mut self, event: KeyEvent, point: RollbackPoint) -> CalcResult<Outcome> {
        let ContextKind::Modal(capture) = self.contexts.active().clone() else {
            return Err(CalcError::unsupported("no modal operation is active"));
        };

        let op = match event.key {
            KeyCode::Clear | KeyCode::Backspace | KeyCode::Undo => {
                self.cancel_modal(&capture);
                return Ok(Outcome::StateChanged);
            }
            KeyCode::Op(op) if accepts(capture.op, op) => op,
            _ => {
                // Not ours: step aside and let the next context have it
                debug!(key = ?event.key, "modal operation abandoned");
                self.pop_context(true)?;
                self.queue.push_front(event);
                return Ok(Outcome::NoOp);
            }
        };

        let result = self.transaction(|engine| {
            let value = engine.run_modal(&capture, op)?;
            engine.state = complete(&capture, value);
            Ok(())
        });
        match result {
            Ok(outcome) => {
                self.pop_context(false)?;
                self.recorder.record(MacroOp::Key(event), point);
                Ok(outcome)
            }
            Err(err) => {
                self.cancel_modal(&capture);
                Err(err)
            }
        }
    }

    /// Leave the modal context with the stack as it was when it started.
    /// While recording, the key that opened it is taken back as well.
    fn cancel_modal(&mut self, capture: &ModalCapture) {
        self.state = capture.pre_state.clone();
        if let Err(err) = self.pop_context(true) {
            debug!(error = %err, "cancelling modal operation");
        }
        if self.recorder.is_active() {
            let opened_here = matches!(
                self.recorder.ops().and_then(|ops| ops.last()),
                Some(MacroOp::Key(KeyEvent { key, .. })) if key.opens_modal()
            );
            if opened_here {
                self.recorder.rollback_last();
            }
        }
    }

    fn run_modal(&mut self, capture: &ModalCapture, op: OpCode) -> CalcResult<TaggedValue> {
        match capture.op {
            ModalOp::Map => {
                let array = &capture.operands[0];
                let mut tag = None;
                let mut data = Vec::with_capacity(array.len());
                for v in array.data() {
                    let result = self.apply_scalar(op, &[TaggedValue::typed(*v, array.tag())])?;
                    data.push(element(&result, &mut tag)?);
                }
                TaggedValue::array(
                    ValueKind::Real,
                    array.rows(),
                    array.cols(),
                    data,
                    tag.unwrap_or(TypeTag::UNTYPED),
                )
            }
            ModalOp::Reduce => {
                let array = &capture.operands[0];
                let mut values = array.data().iter().map(|v| TaggedValue::typed(*v, array.tag()));
                let first = values
                    .next()
                    .ok_or_else(|| CalcError::shape("cannot reduce an empty array"))?;
                values.try_fold(first, |acc, v| self.apply_scalar(op, &[acc, v]))
            }
            ModalOp::Sequence => {
                let seed = capture.operands[0].clone();
                let count = capture.operands[1].as_integer().unwrap_or(1).max(1) as usize;
                let mut tag = None;
                let mut data = Vec::with_capacity(count);
                let mut current = seed;
                for _ in 0..count {
                    current = self.apply_scalar(op, &[current])?;
                    data.push(element(&current, &mut tag)?);
                }
                TaggedValue::row(data, tag.unwrap_or(TypeTag::UNTYPED))
            }
        }
    }

    /// Apply `op` to operands placed on a scratch stack, Y before X
    fn apply_scalar(&mut self, op: OpCode, operands: &[TaggedValue]) -> CalcResult<TaggedValue> {
        let mut scratch = CalcState::new(self.state.register_count());
        for (i, value) in operands.iter().rev().enumerate() {
            scratch.set_register(i, value.clone());
        }
        let next = self.tables.apply(&mut self.registry, &scratch, op)?;
        Ok(next.x().clone())
    }
}

fn accepts(modal: ModalOp, op: OpCode) -> bool {
    match modal {
        ModalOp::Map | ModalOp::Sequence => op.arity() == 1,
        ModalOp::Reduce => op.arity() == 2,
    }
}

/// A real scalar whose type agrees with the earlier elements
fn element(value: &TaggedValue, tag: &mut Option<TypeTag>) -> CalcResult<f64> {
    let real = value
        .as_real()
        .ok_or_else(|| CalcError::type_mismatch(format!("element became {}", value.kind().name())))?;
    match *tag {
        Some(t) if t != value.tag() => Err(CalcError::incompatible_units(
            "elements ended up with different units",
        )),
        Some(_) => Ok(real),
        None => {
            *tag = Some(value.tag());
            Ok(real)
        }
    }
}

/// State after the modal operation: its operands replaced by `value`
fn complete(capture: &ModalCapture, value: TaggedValue) -> CalcState {
    let mut next = capture.pre_state.clone();
    next.last_x = capture.pre_state.x().clone();
    if capture.op == ModalOp::Sequence {
        next.stack_drop();
    }
    next.set_x(value);
    next.no_lift = false;
    next
}

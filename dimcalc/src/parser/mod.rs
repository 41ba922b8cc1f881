//! Key scripts
//!
//! A script spells out keystrokes: `5 enter 3 +`, `2.5 [km] [mi]`,
//! `rec(f) 2 * stop`. Numbers are typed digit by digit, exactly as on the
//! keypad, so two numbers in a row need an `enter` between them.

use crate::algebra::TypeRegistry;
use crate::keys::{KeyCode, KeyEvent, OpCode};
use crate::value::SymbolTag;
use crate::{CalcError, CalcResult};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[grammar = "src/parser/keys.pest"]
pub struct KeyScriptParser;

/// Location in a key script
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn from_pest_span(span: pest::Span) -> Self {
        let (line, col) = span.start_pos().line_col();
        Self {
            start: span.start(),
            end: span.end(),
            line,
            col,
        }
    }
}

/// Parse a key script into the events it stands for. Unit names in
/// brackets are resolved against `registry`.
pub fn parse_keys(script: &str, registry: &TypeRegistry) -> CalcResult<Vec<KeyEvent>> {
    let mut pairs = KeyScriptParser::parse(Rule::script, script).map_err(|e| {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        let start = match e.location {
            pest::error::InputLocation::Pos(pos) => pos,
            pest::error::InputLocation::Span((start, _)) => start,
        };
        CalcError::Parse {
            message: e.variant.message().to_string(),
            span: Span {
                start,
                end: start,
                line,
                col,
            },
        }
    })?;

    let mut keys = Vec::new();
    let Some(script_pair) = pairs.next() else {
        return Ok(keys);
    };
    for pair in script_pair.into_inner() {
        match pair.as_rule() {
            Rule::number => number_keys(pair.as_str(), &mut keys),
            Rule::unit => keys.push(unit_key(pair, registry)?),
            Rule::call => keys.push(call_key(pair)?),
            Rule::word => keys.push(word_key(pair)?),
            _ => {}
        }
    }
    Ok(keys)
}

/// Digits and point, then the sign, then the exponent. The sign key must
/// come after the first digit or it would negate X instead of the entry.
fn number_keys(text: &str, keys: &mut Vec<KeyEvent>) {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (mantissa, exponent) = match unsigned.find(|c| c == 'e' || c == 'E') {
        Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
        None => (unsigned, None),
    };

    typed_digits(mantissa, keys);
    if negative {
        keys.push(KeyEvent::new(KeyCode::ChangeSign));
    }
    if let Some(exponent) = exponent {
        keys.push(KeyEvent::new(KeyCode::Exponent));
        let digits = match exponent.strip_prefix('-') {
            Some(rest) => {
                keys.push(KeyEvent::new(KeyCode::ChangeSign));
                rest
            }
            None => exponent.trim_start_matches('+'),
        };
        typed_digits(digits, keys);
    }
}

fn typed_digits(text: &str, keys: &mut Vec<KeyEvent>) {
    for c in text.chars() {
        match c.to_digit(10) {
            Some(d) => keys.push(KeyEvent::digit(d as u8)),
            None => keys.push(KeyEvent::new(KeyCode::Point)),
        }
    }
}

fn unit_key(pair: Pair<Rule>, registry: &TypeRegistry) -> CalcResult<KeyEvent> {
    let span = Span::from_pest_span(pair.as_span());
    let symbol = pair
        .into_inner()
        .next()
        .map(|p| p.as_str())
        .unwrap_or_default();
    registry
        .lookup(symbol)
        .map(KeyEvent::unit)
        .ok_or_else(|| CalcError::Parse {
            message: format!("unknown unit '{}'", symbol),
            span,
        })
}

fn call_key(pair: Pair<Rule>) -> CalcResult<KeyEvent> {
    let span = Span::from_pest_span(pair.as_span());
    let mut inner = pair.into_inner();
    let name = inner.next().map(|p| p.as_str()).unwrap_or_default();
    let symbol = inner.next().map(|p| p.as_str()).unwrap_or_default();

    let key = match name {
        "sto" => KeyCode::Store,
        "rcl" => KeyCode::Recall,
        "local" => KeyCode::Local,
        "play" => KeyCode::Play,
        "rec" => KeyCode::RecordStart,
        "compute" => KeyCode::Compute,
        "user" => {
            let n: u8 = symbol.parse().map_err(|_| CalcError::Parse {
                message: format!("user key must be a number from 0 to 255, got '{}'", symbol),
                span,
            })?;
            return Ok(KeyEvent::new(KeyCode::User(n)));
        }
        other => {
            return Err(CalcError::Parse {
                message: format!("unknown call '{}'", other),
                span,
            })
        }
    };
    Ok(KeyEvent::with_symbol(key, SymbolTag::parse(symbol)))
}

fn word_key(pair: Pair<Rule>) -> CalcResult<KeyEvent> {
    let key = match pair.as_str() {
        "enter" => KeyCode::Enter,
        "clear" => KeyCode::Clear,
        "undo" => KeyCode::Undo,
        "back" => KeyCode::Backspace,
        "stop" => KeyCode::RecordStop,
        "map" => KeyCode::Map,
        "reduce" => KeyCode::Reduce,
        "seq" => KeyCode::Sequence,
        "ee" => KeyCode::Exponent,
        "chs" => KeyCode::ChangeSign,
        word => match OpCode::from_name(word) {
            Some(op) => KeyCode::Op(op),
            None => {
                return Err(CalcError::Parse {
                    message: format!("unknown key '{}'", word),
                    span: Span::from_pest_span(pair.as_span()),
                })
            }
        },
    };
    Ok(KeyEvent::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(script: &str) -> Vec<KeyCode> {
        parse_keys(script, &TypeRegistry::new())
            .unwrap()
            .into_iter()
            .map(|event| event.key)
            .collect()
    }

    #[test]
    fn numbers_are_typed_digit_by_digit() {
        assert_eq!(
            keys("5 enter 3 +"),
            vec![
                KeyCode::Digit(5),
                KeyCode::Enter,
                KeyCode::Digit(3),
                KeyCode::Op(OpCode::Add),
            ]
        );
    }

    #[test]
    fn sign_follows_the_mantissa() {
        assert_eq!(
            keys("-2.5e-3"),
            vec![
                KeyCode::Digit(2),
                KeyCode::Point,
                KeyCode::Digit(5),
                KeyCode::ChangeSign,
                KeyCode::Exponent,
                KeyCode::ChangeSign,
                KeyCode::Digit(3),
            ]
        );
    }

    #[test]
    fn units_resolve_through_the_registry() {
        let registry = TypeRegistry::new();
        let events = parse_keys("5 [km] [mi]", &registry).unwrap();
        assert_eq!(events[1], KeyEvent::unit(registry.lookup("km").unwrap()));
        assert_eq!(events[2], KeyEvent::unit(registry.lookup("mi").unwrap()));
    }

    #[test]
    fn calls_carry_their_symbol() {
        let events = parse_keys("sto(a_1), stop # trailing comment", &TypeRegistry::new()).unwrap();
        assert_eq!(events[0], KeyEvent::with_symbol(KeyCode::Store, "a_1"));
        assert_eq!(events[1].key, KeyCode::RecordStop);
        assert_eq!(keys("user(3)"), vec![KeyCode::User(3)]);
    }

    #[test]
    fn operator_names_and_symbols() {
        assert_eq!(
            keys("to-rad sq - e"),
            vec![
                KeyCode::Op(OpCode::ToRadians),
                KeyCode::Op(OpCode::Square),
                KeyCode::Op(OpCode::Subtract),
                KeyCode::Op(OpCode::E),
            ]
        );
    }

    #[test]
    fn unknown_word_reports_its_location() {
        let err = parse_keys("1 enter\n  bogus", &TypeRegistry::new()).unwrap_err();
        match err {
            CalcError::Parse { message, span } => {
                assert!(message.contains("bogus"));
                assert_eq!((span.line, span.col), (2, 3));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_unit_is_a_parse_error() {
        assert!(matches!(
            parse_keys("1 [furlongs]", &TypeRegistry::new()),
            Err(CalcError::Parse { .. })
        ));
    }
}

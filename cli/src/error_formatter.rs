use ariadne::{Color, Label, Report, ReportKind, Source};
use dimcalc::CalcError;

/// Format a CalcError for the terminal, pointing into the script for parse
/// errors
pub fn format_error(error: &CalcError, source_id: &str, source: &str) -> String {
    match error {
        CalcError::Parse { message, span } if !source.is_empty() => {
            let mut output = Vec::new();
            let end = span.end.max(span.start + 1).min(source.len().max(span.start));

            let report = Report::build(ReportKind::Error, source_id, span.start)
                .with_message(format!("Parse error: {}", message))
                .with_label(
                    Label::new((source_id, span.start..end))
                        .with_message(message.as_str())
                        .with_color(Color::Red),
                )
                .with_help("keys are numbers, [unit], words such as enter or sqrt, and calls such as sto(x)");

            match report
                .finish()
                .write((source_id, Source::from(source)), &mut output)
            {
                Ok(_) => String::from_utf8_lossy(&output).to_string(),
                Err(_) => format!("{}", error),
            }
        }
        CalcError::MacroPlaybackFailure { .. } => {
            let mut result = format!("Error: {}", error);
            let mut current = error;
            while let CalcError::MacroPlaybackFailure { tag, index, source } = current {
                result.push_str(&format!("\n  in macro '{}' at step {}", tag, index));
                current = source;
            }
            result
        }
        CalcError::LimitExceeded {
            limit_name,
            limit_value,
        } => format!(
            "Resource limit exceeded: {}\n  Limit: {}",
            limit_name, limit_value
        ),
        other => format!("Error: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dimcalc::{parse_keys, TypeRegistry};

    #[test]
    fn parse_error_points_into_the_script() {
        let source = "1 enter bogus";
        let err = parse_keys(source, &TypeRegistry::new()).unwrap_err();
        let text = format_error(&err, "<keys>", source);
        assert!(text.contains("bogus"));
        assert!(text.contains("<keys>"));
    }

    #[test]
    fn playback_chain_is_listed() {
        let err = CalcError::playback("outer", 2, CalcError::playback("inner", 0, CalcError::domain("x")));
        let text = format_error(&err, "<keys>", "");
        assert!(text.contains("in macro 'outer' at step 2"));
        assert!(text.contains("in macro 'inner' at step 0"));
    }
}

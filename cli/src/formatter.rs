use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Row, Table};
use dimcalc::{Engine, FormatStyle, TaggedValue, TypeRegistry, ValueKind};

const REGISTER_NAMES: [&str; 4] = ["X", "Y", "Z", "T"];

pub struct Formatter {}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self {}
    }

    /// Registers from the top of the stack down, then memories if any exist
    pub fn format_state(&self, engine: &Engine) -> String {
        let registry = engine.registry();
        let state = engine.state();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new("Register").set_alignment(CellAlignment::Left),
            Cell::new("Value").set_alignment(CellAlignment::Right),
            Cell::new("Unit").set_alignment(CellAlignment::Left),
        ]));

        for (index, value) in state.registers().iter().enumerate().rev() {
            let name = REGISTER_NAMES
                .get(index)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("R{}", index));
            table.add_row(vec![
                Cell::new(name),
                Cell::new(self.format_value(value)).set_alignment(CellAlignment::Right),
                Cell::new(registry.symbol(value.tag()).unwrap_or("")),
            ]);
        }

        let mut output = format!("{}\n", table);

        if !state.memories().is_empty() {
            let mut memories = Table::new();
            memories.load_preset(UTF8_FULL);
            memories.set_header(Row::from(vec![
                Cell::new("Memory").set_alignment(CellAlignment::Left),
                Cell::new("Value").set_alignment(CellAlignment::Right),
                Cell::new("Unit").set_alignment(CellAlignment::Left),
                Cell::new("Computed by").set_alignment(CellAlignment::Left),
            ]));
            for memory in state.memories() {
                memories.add_row(vec![
                    Cell::new(memory.symbol.to_string()),
                    Cell::new(self.format_value(&memory.value)).set_alignment(CellAlignment::Right),
                    Cell::new(registry.symbol(memory.value.tag()).unwrap_or("")),
                    Cell::new(
                        memory
                            .computed_by
                            .as_ref()
                            .map(|tag| tag.to_string())
                            .unwrap_or_default(),
                    ),
                ]);
            }
            output.push_str(&format!("{}\n", memories));
        }

        output
    }

    pub fn format_units(&self, registry: &TypeRegistry, filter: Option<&str>) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new("Unit").set_alignment(CellAlignment::Left),
            Cell::new("Type").set_alignment(CellAlignment::Left),
            Cell::new("Ratio").set_alignment(CellAlignment::Right),
            Cell::new("Offset").set_alignment(CellAlignment::Right),
        ]));

        for unit in registry.units() {
            let unit_symbol = unit.symbol.as_deref().unwrap_or("");
            for def in unit.types() {
                let Some(symbol) = def.symbol.as_deref() else {
                    continue;
                };
                if filter.is_some_and(|f| !symbol.contains(f)) {
                    continue;
                }
                table.add_row(vec![
                    Cell::new(unit_symbol),
                    Cell::new(symbol),
                    Cell::new(format_number(def.ratio, FormatStyle::Decimal))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(format_number(def.offset, FormatStyle::Decimal))
                        .set_alignment(CellAlignment::Right),
                ]);
            }
        }

        format!("{}\n", table)
    }

    fn format_value(&self, value: &TaggedValue) -> String {
        let style = value.format().style;
        if value.is_scalar() {
            return format_element(value.kind(), value.data(), style);
        }
        let rows: Vec<String> = (1..=value.rows())
            .map(|row| {
                let elements: Vec<String> = (1..=value.cols())
                    .filter_map(|col| value.element(row, col))
                    .map(|element| format_element(value.kind(), element, style))
                    .collect();
                elements.join(" ")
            })
            .collect();
        format!("[{}]", rows.join("; "))
    }
}

fn format_element(kind: ValueKind, data: &[f64], style: FormatStyle) -> String {
    let n = |v: f64| format_number(v, style);
    match (kind, data) {
        (ValueKind::Real, [v]) => n(*v),
        (ValueKind::Rational, [num, den]) => format!("{}/{}", n(*num), n(*den)),
        (ValueKind::Complex, [re, im]) if *im < 0.0 => format!("{}-{}i", n(*re), n(-im)),
        (ValueKind::Complex, [re, im]) => format!("{}+{}i", n(*re), n(*im)),
        (ValueKind::Polar, [r, theta]) => format!("{}∠{}", n(*r), n(*theta)),
        (ValueKind::Spherical, [r, theta, phi]) => {
            format!("{}∠{}∠{}", n(*r), n(*theta), n(*phi))
        }
        (_, components) => {
            let parts: Vec<String> = components.iter().map(|v| n(*v)).collect();
            format!("({})", parts.join(", "))
        }
    }
}

fn format_number(value: f64, style: FormatStyle) -> String {
    match style {
        FormatStyle::Scientific => format!("{:e}", value),
        FormatStyle::Decimal => {
            let text = format!("{:.10}", value);
            let trimmed = text.trim_end_matches('0').trim_end_matches('.');
            if trimmed == "-0" {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dimcalc::parse_keys;

    fn render(script: &str) -> String {
        let mut engine = Engine::new();
        let keys = parse_keys(script, engine.registry()).unwrap();
        engine.handle_events(keys).unwrap();
        Formatter::new().format_state(&engine)
    }

    #[test]
    fn numbers_drop_trailing_zeros() {
        assert_eq!(format_number(8.0, FormatStyle::Decimal), "8");
        assert_eq!(format_number(1.25, FormatStyle::Decimal), "1.25");
        assert_eq!(format_number(-0.0, FormatStyle::Decimal), "0");
        assert_eq!(format_number(15000.0, FormatStyle::Scientific), "1.5e4");
    }

    #[test]
    fn state_shows_registers_and_units() {
        let output = render("5 [km]");
        assert!(output.contains("Register"));
        assert!(output.contains("km"));
        assert!(output.contains('5'));
    }

    #[test]
    fn memories_table_only_when_memories_exist() {
        assert!(!render("1").contains("Memory"));
        assert!(render("3 sto(a)").contains("Memory"));
    }

    #[test]
    fn units_filter() {
        let output = Formatter::new().format_units(&TypeRegistry::new(), Some("mi"));
        assert!(output.contains("mi"));
        assert!(!output.contains("kg"));
    }
}

use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    print!("{}", render_table(headers, &rows));
}

/// Two-space separated columns. Numeric cells (positions, limits, step
/// counts) are right-aligned so values line up by magnitude.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    // Widths in chars: sequence rows carry multi-byte arrows.
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{h:<w$}"))
        .collect();
    push_line(&mut out, &header);

    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    push_line(&mut out, &rule);

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                if is_numeric(cell) {
                    format!("{cell:>w$}")
                } else {
                    format!("{cell:<w$}")
                }
            })
            .collect();
        push_line(&mut out, &cells);
    }
    out
}

fn is_numeric(cell: &str) -> bool {
    !cell.is_empty() && cell.parse::<i64>().is_ok()
}

fn push_line(out: &mut String, cells: &[String]) {
    out.push_str(cells.join("  ").trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn numbers_align_right() {
        let table = render_table(
            &["ACTUATOR", "POSITION"],
            &[row(&["servo_1", "900"]), row(&["servo_12", "5"])],
        );
        assert_eq!(
            table,
            "ACTUATOR  POSITION\n\
             --------  --------\n\
             servo_1        900\n\
             servo_12         5\n"
        );
    }

    #[test]
    fn arrows_count_as_one_column() {
        let table = render_table(
            &["SEQUENCE", "GESTURES"],
            &[row(&["wave", "fist → open"]), row(&["x", "a"])],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[1], "--------  -----------");
        assert_eq!(lines[2], "wave      fist → open");
        assert_eq!(lines[3], "x         a");
    }
}

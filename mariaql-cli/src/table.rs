//! MariaDB-style ASCII table rendering for result rows.

use bson::{Bson, Document};

/// Render rows the way the reference client prints them:
///
/// ```text
/// +------+-------+
/// | a    | b     |
/// +------+-------+
/// | 1    | two   |
/// +------+-------+
/// ```
pub fn render(rows: &[Document]) -> String {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    if columns.is_empty() {
        return String::new();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).map(display_value).unwrap_or_else(|| "NULL".into()))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, value) in row.iter().enumerate() {
            widths[i] = widths[i].max(value.chars().count());
        }
    }

    let border = {
        let mut b = String::from("+");
        for w in &widths {
            b.push_str(&"-".repeat(w + 2));
            b.push('+');
        }
        b
    };

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (value, width) in values.iter().zip(&widths) {
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(width - value.chars().count()));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    out.push_str(&render_row(&columns.iter().cloned().collect::<Vec<_>>()));
    out.push('\n');
    out.push_str(&border);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&border);
    out
}

fn display_value(value: &Bson) -> String {
    match value {
        Bson::Null => "NULL".into(),
        Bson::String(s) => s.clone(),
        Bson::Int32(v) => v.to_string(),
        Bson::Int64(v) => v.to_string(),
        Bson::Double(v) => {
            if v.fract() == 0.0 && v.is_finite() {
                format!("{v:.1}")
            } else {
                v.to_string()
            }
        }
        Bson::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| dt.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::render;
    use bson::doc;

    #[test]
    fn renders_borders_and_padding() {
        let rows = vec![
            doc! {"name": "Alice", "n": 1},
            doc! {"name": "Bo", "n": 20},
        ];
        assert_eq!(
            render(&rows),
            "+-------+----+\n\
             | name  | n  |\n\
             +-------+----+\n\
             | Alice | 1  |\n\
             | Bo    | 20 |\n\
             +-------+----+"
        );
    }

    #[test]
    fn missing_fields_render_as_null() {
        let rows = vec![doc! {"a": 1}, doc! {"b": 2}];
        let table = render(&rows);
        assert!(table.contains("NULL"));
    }
}

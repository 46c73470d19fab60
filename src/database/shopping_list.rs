use std::{collections::BTreeMap, fmt::Write};

use crate::{constants::SHOPPING_LIST_TITLE, schema::CartRow};

/// Cart totals keyed by (ingredient name, measurement unit).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ShoppingList {
    items: BTreeMap<(String, String), i64>,
}

impl ShoppingList {
    pub fn from_rows(rows: impl IntoIterator<Item = CartRow>) -> Self {
        let mut items: BTreeMap<(String, String), i64> = BTreeMap::new();
        for row in rows {
            let total = items.entry((row.name, row.measurement_unit)).or_default();
            *total = total.saturating_add(row.total);
        }
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn total(&self, name: &str, measurement_unit: &str) -> Option<i64> {
        self.items
            .get(&(name.to_owned(), measurement_unit.to_owned()))
            .copied()
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.items
            .iter()
            .map(|((name, unit), total)| format!("{name} ({unit}) - {total}"))
    }

    pub fn render_rtf(&self) -> String {
        let mut rich_text = rich_text_header();
        rich_text += &format!("\\f0\\b\\fs28 {}\\b0\\fs24 \\\n", escape_rtf(SHOPPING_LIST_TITLE));

        if self.is_empty() {
            rich_text += "\\\nYour shopping cart is empty.";
        }
        for line in self.lines() {
            rich_text += &format!("\\\n{}", escape_rtf(&line));
        }

        rich_text += "}";
        rich_text
    }
}

fn rich_text_header() -> String {
    let mut rich_text = String::new();
    rich_text += "{\\rtf1\\ansi\\deff0\n";
    rich_text += "{\\fonttbl\\f0\\fswiss\\fcharset0 Helvetica;}\n";
    rich_text += "\\pard\\pardirnatural\\partightenfactor0\n";
    rich_text
}

/// Non-ASCII text goes out as `\uN?` escapes over UTF-16 code units.
fn escape_rtf(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '{' => escaped.push_str("\\{"),
            '}' => escaped.push_str("\\}"),
            '\n' => escaped.push_str("\\line "),
            c if c.is_ascii() => escaped.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(escaped, "\\u{}?", *unit as i16);
                }
            }
        }
    }
    escaped
}

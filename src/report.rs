//! Text rendering of the table forest.

use std::fmt::Write;

use crate::table::{Table, TableGraph, TableId};

enum Entry {
    Line(String),
    Child(TableId),
}

impl TableGraph {
    /// Render the forest as an indented tree of tables with their axes,
    /// columns and joins.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for root in self.roots() {
            let _ = writeln!(out, "{}", heading(self.table(root)));
            self.format_children(root, "", &mut out);
        }
        out
    }

    fn format_children(&self, id: TableId, prefix: &str, out: &mut String) {
        let table = self.table(id);
        let mut entries = Vec::new();
        if !table.axes().is_empty() {
            let axes: Vec<String> = table
                .axes()
                .iter()
                .map(|a| format!("{}={}", a.variable.name, a.axis))
                .collect();
            entries.push(Entry::Line(format!("axes: {}", axes.join(", "))));
        }
        let columns: Vec<&str> = table.data_columns().map(|c| c.name.as_str()).collect();
        if !columns.is_empty() {
            entries.push(Entry::Line(format!("columns: {}", columns.join(", "))));
        }
        if !table.markers().is_empty() {
            entries.push(Entry::Line(format!("markers: {}", table.markers().join(", "))));
        }
        entries.extend(table.children().iter().map(|&j| Entry::Child(self.join(j).child())));

        for (i, entry) in entries.iter().enumerate() {
            let is_last = i == entries.len() - 1;
            let connector = if is_last { "└── " } else { "├── " };
            match entry {
                Entry::Line(line) => {
                    let _ = writeln!(out, "{}{}{}", prefix, connector, line);
                },
                Entry::Child(child) => {
                    let kinds: Vec<&str> = self
                        .table(*child)
                        .join()
                        .map(|j| self.join(j).kinds().iter().map(|k| k.name()).collect())
                        .unwrap_or_default();
                    let _ = writeln!(
                        out,
                        "{}{}{} via {}",
                        prefix,
                        connector,
                        heading(self.table(*child)),
                        kinds.join(" > ")
                    );
                    let new_prefix = format!("{}{}   ", prefix, if is_last { " " } else { "│" });
                    self.format_children(*child, &new_prefix, out);
                },
            }
        }
    }
}

fn heading(table: &Table) -> String {
    if table.is_embedded() {
        format!("{} (embedded)", table.name())
    } else if table.is_variable_length() {
        format!("{} ({} rows, unlimited)", table.name(), table.len())
    } else {
        format!("{} ({} rows)", table.name(), table.len())
    }
}

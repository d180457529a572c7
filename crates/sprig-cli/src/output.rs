//! Output formatting utilities

use serde::Serialize;
use sprig_core::NodeView;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Table,
        }
    }
}

/// Pretty JSON for any serializable value
pub fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "null".to_string())
}

/// Render matched nodes as an aligned table or a JSON array
pub fn format_nodes(nodes: &[NodeView], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&nodes) + "\n",
        OutputFormat::Table => {
            let rows: Vec<[String; 3]> = nodes
                .iter()
                .map(|n| [n.id.to_string(), n.path.clone(), format_attributes(n)])
                .collect();
            render_table(["ID", "PATH", "ATTRIBUTES"], &rows)
        }
    }
}

fn format_attributes(node: &NodeView) -> String {
    node.attributes
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_table<const N: usize>(header: [&str; N], rows: &[[String; N]]) -> String {
    let mut widths = header.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: Vec<&str>| {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    };

    push_row(header.to_vec());
    for row in rows {
        push_row(row.iter().map(String::as_str).collect());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_core::Document;

    fn views() -> Vec<NodeView> {
        let doc = Document::from_json_str(
            r#"{ "name": "root", "children": [{ "name": "item", "attributes": { "id": 1, "k": "v" } }] }"#,
        )
        .unwrap();
        doc.graph
            .ids()
            .map(|id| NodeView::of(&doc.graph, id).unwrap())
            .collect()
    }

    #[test]
    fn test_table() {
        let table = format_nodes(&views(), OutputFormat::Table);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("/root/item[0]"));
        assert!(lines[2].ends_with("id=1 k=v"));
    }

    #[test]
    fn test_json() {
        let json: serde_json::Value =
            serde_json::from_str(&format_nodes(&views(), OutputFormat::Json)).unwrap();
        assert_eq!(json[1]["name"], "item");
        assert_eq!(json[1]["attributes"]["id"], "1");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("other"), OutputFormat::Table);
    }
}

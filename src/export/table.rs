use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::export::flatten::{flatten_record, value_at_path};

/// The output sink rejects sheets past this many rows, so larger tables
/// are split into numbered chunks before writing.
pub const MAX_ROWS_PER_SHEET: usize = 80_000;

/// A flat table headed for one or more worksheet(s).
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: &str, columns: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from flattened rows, taking the union of all keys as
    /// the column set, ordered by first appearance across the rows.
    /// Missing cells become nulls.
    pub fn from_flat_rows(name: &str, flat_rows: Vec<Map<String, Value>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for row in &flat_rows {
            for key in row.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = flat_rows
            .into_iter()
            .map(|mut flat| {
                columns
                    .iter()
                    .map(|column| flat.remove(column).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self {
            name: name.to_string(),
            columns,
            rows,
        }
    }

    /// Flattens raw records and tabulates them.
    pub fn from_records(name: &str, records: &[Value]) -> Self {
        Self::from_flat_rows(name, records.iter().map(flatten_record).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renames columns per a static mapping; unknown names are left alone.
    pub fn rename_columns(&mut self, renames: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = renames.iter().find(|(from, _)| from == column) {
                *column = to.to_string();
            }
        }
    }

    /// Keeps the first row per distinct value in `column`. Rows where the
    /// column is null are always kept.
    pub fn dedupe_by(&mut self, column: &str) {
        let Some(index) = self.columns.iter().position(|c| c == column) else {
            return;
        };

        let mut seen: HashSet<String> = HashSet::new();
        let before = self.rows.len();
        self.rows.retain(|row| match &row[index] {
            Value::Null => true,
            value => seen.insert(value.to_string()),
        });

        let removed = before - self.rows.len();
        if removed > 0 {
            tracing::info!("Removed {} duplicate rows by {}", removed, column);
        }
    }

    /// Splits into numbered chunks of at most `max_rows` rows each.
    pub fn split(self, max_rows: usize) -> Vec<Table> {
        if self.rows.len() <= max_rows {
            return vec![Table {
                name: format!("{}_1", self.name),
                ..self
            }];
        }

        let name = self.name;
        let columns = self.columns;
        let mut chunks = Vec::new();
        let mut rows = self.rows.into_iter().peekable();
        let mut index = 1;

        while rows.peek().is_some() {
            let chunk_rows: Vec<Vec<Value>> = rows.by_ref().take(max_rows).collect();
            chunks.push(Table {
                name: format!("{}_{}", name, index),
                columns: columns.clone(),
                rows: chunk_rows,
            });
            index += 1;
        }

        chunks
    }
}

/// Derives an auxiliary table from a nested list field.
///
/// Each list item becomes one row carrying the parent identifier in a
/// leading column, so the sheet can be joined back to the primary table.
pub fn list_table(
    records: &[Value],
    path: &str,
    parent_column: &str,
    parent_sources: &[&str],
    name: &str,
) -> Table {
    let mut flat_rows = Vec::new();

    for record in records {
        let Some(value) = value_at_path(record, path) else {
            continue;
        };
        let items = match value {
            Value::Array(items) => items.as_slice(),
            Value::Null => continue,
            other => std::slice::from_ref(other),
        };

        let parent_id = parent_sources
            .iter()
            .filter_map(|source| value_at_path(record, source))
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null);

        for item in items {
            let mut flat = match item {
                Value::Object(_) => flatten_record(item),
                scalar => {
                    let mut single = Map::new();
                    single.insert("value".to_string(), scalar.clone());
                    single
                }
            };
            flat.insert(parent_column.to_string(), parent_id.clone());
            flat_rows.push(flat);
        }
    }

    let mut table = Table::from_flat_rows(name, flat_rows);

    // Parent identifier leads for readability.
    if let Some(position) = table.columns.iter().position(|c| c == parent_column) {
        if position != 0 {
            table.columns.swap(0, position);
            for row in &mut table.rows {
                row.swap(0, position);
            }
        }
    }

    table
}

/// Columns whose value is a list in at least one flattened record, in
/// first-seen order.
pub fn list_columns(records: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for record in records {
        for (key, value) in flatten_record(record) {
            if value.is_array() && seen.insert(key.clone()) {
                columns.push(key);
            }
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_union_of_columns_with_null_fill() {
        let records = vec![
            json!({ "a": 1, "b": "x" }),
            json!({ "a": 2, "c": true }),
        ];

        let table = Table::from_records("T", &records);

        assert_eq!(table.columns, vec!["a", "b", "c"]);
        assert_eq!(table.rows[0], vec![json!(1), json!("x"), Value::Null]);
        assert_eq!(table.rows[1], vec![json!(2), Value::Null, json!(true)]);
    }

    #[test]
    fn test_columns_keep_first_seen_order() {
        let records = vec![
            json!({ "zone": "north", "amount": 12 }),
            json!({ "amount": 9, "billed": true }),
        ];

        let table = Table::from_records("T", &records);

        // API field order, not alphabetical.
        assert_eq!(table.columns, vec!["zone", "amount", "billed"]);
        assert_eq!(table.rows[0], vec![json!("north"), json!(12), Value::Null]);
    }

    #[test]
    fn test_list_table_yields_one_row_per_item_with_parent_id() {
        let records = vec![
            json!({
                "dutyId": "D-1",
                "invoices": [
                    { "number": "I-1", "amount": 100 },
                    { "number": "I-2", "amount": 250 },
                    { "number": "I-3", "amount": 75 },
                ],
            }),
            json!({ "dutyId": "D-2", "invoices": [] }),
            json!({ "dutyId": "D-3" }),
        ];

        let table = list_table(&records, "invoices", "dutyId", &["dutyId"], "Invoices");

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.columns[0], "dutyId");
        for row in &table.rows {
            assert_eq!(row[0], json!("D-1"));
        }
    }

    #[test]
    fn test_list_table_parent_fallback_sources() {
        let records = vec![json!({ "id": "V-9", "permits": [{ "state": "KA" }] })];

        let table = list_table(
            &records,
            "permits",
            "vehicleId",
            &["vehicleId", "id"],
            "Permits",
        );

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], json!("V-9"));
    }

    #[test]
    fn test_split_150k_rows_at_80k() {
        let rows: Vec<Vec<Value>> = (0..150_000).map(|i| vec![json!(i)]).collect();
        let table = Table {
            name: "Duties".to_string(),
            columns: vec!["id".to_string()],
            rows,
        };

        let chunks = table.split(MAX_ROWS_PER_SHEET);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name, "Duties_1");
        assert_eq!(chunks[0].rows.len(), 80_000);
        assert_eq!(chunks[1].name, "Duties_2");
        assert_eq!(chunks[1].rows.len(), 70_000);
        assert_eq!(chunks[1].rows[0], vec![json!(80_000)]);
    }

    #[test]
    fn test_split_small_table_keeps_single_numbered_sheet() {
        let table = Table {
            name: "Receipts".to_string(),
            columns: vec!["id".to_string()],
            rows: vec![vec![json!(1)]],
        };

        let chunks = table.split(MAX_ROWS_PER_SHEET);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name, "Receipts_1");
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let records = vec![
            json!({ "dutyId": "D-1", "n": 1 }),
            json!({ "dutyId": "D-2", "n": 2 }),
            json!({ "dutyId": "D-1", "n": 3 }),
        ];
        let mut table = Table::from_records("T", &records);

        table.dedupe_by("dutyId");

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], json!(1));
    }

    #[test]
    fn test_list_columns_detection() {
        let records = vec![
            json!({ "id": 1, "permits": [1, 2], "meta": { "tags": ["a"] } }),
            json!({ "id": 2 }),
        ];

        assert_eq!(list_columns(&records), vec!["permits", "meta.tags"]);
    }
}

use std::path::Path;

use rust_xlsxwriter::Workbook;
use serde_json::Value;

use crate::error::Result;
use crate::export::table::Table;

/// Writes each table to its own named sheet.
pub fn write_workbook(path: &Path, tables: &[Table]) -> Result<()> {
    let mut workbook = Workbook::new();

    for table in tables {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sanitize_sheet_name(&table.name))?;

        for (col_idx, header) in table.columns.iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            let row_num = (row_idx + 1) as u32;
            for (col_idx, cell) in row.iter().enumerate() {
                let col_num = col_idx as u16;
                match cell {
                    Value::Null => {}
                    Value::String(text) => {
                        worksheet.write_string(row_num, col_num, text)?;
                    }
                    Value::Number(number) => {
                        if let Some(value) = number.as_f64() {
                            worksheet.write_number(row_num, col_num, value)?;
                        }
                    }
                    Value::Bool(flag) => {
                        worksheet.write_boolean(row_num, col_num, *flag)?;
                    }
                    // Lists kept inline and stray objects land as JSON text.
                    other => {
                        worksheet.write_string(row_num, col_num, other.to_string())?;
                    }
                }
            }
        }

        tracing::info!("Wrote {} rows to sheet '{}'", table.rows.len(), table.name);
    }

    workbook.save(path)?;
    Ok(())
}

/// Excel sheet names are capped at 31 chars and reject a few characters.
fn sanitize_sheet_name(raw: &str) -> String {
    let invalid = [':', '\\', '/', '?', '*', '[', ']', '\'', '"'];
    let mut sanitized: String = raw
        .chars()
        .map(|ch| {
            if invalid.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();

    sanitized = sanitized.trim().to_string();
    if sanitized.is_empty() {
        sanitized = "Sheet".to_string();
    }
    // Truncate on a char boundary; expanded sheet names come from
    // arbitrary API keys, which may be multibyte.
    if let Some((boundary, _)) = sanitized.char_indices().nth(31) {
        sanitized.truncate(boundary);
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("Duties_1"), "Duties_1");
        assert_eq!(sanitize_sheet_name("a/b:c"), "a_b_c");
        assert_eq!(sanitize_sheet_name(""), "Sheet");
        assert_eq!(
            sanitize_sheet_name("exp_documents.permitDetails.rows"),
            "exp_documents.permitDetails.row"
        );
    }

    #[test]
    fn test_sanitize_truncates_multibyte_names_on_char_boundaries() {
        let name = format!("{}épermis", "a".repeat(30));

        let sanitized = sanitize_sheet_name(&name);

        assert_eq!(sanitized.chars().count(), 31);
        assert_eq!(sanitized, format!("{}é", "a".repeat(30)));
    }
}

use serde_json::{Map, Value};

/// Collapses nested objects into dotted-path keys.
///
/// Key order follows the order fields appear in the record, so exported
/// columns line up with the API's own field order. Lists are left in
/// place; per-endpoint policy decides whether they are split into
/// auxiliary tables, joined, or serialized inline.
pub fn flatten_record(record: &Value) -> Map<String, Value> {
    let mut flat = Map::new();
    if let Value::Object(map) = record {
        flatten_into(&mut flat, "", map);
    }
    flat
}

fn flatten_into(flat: &mut Map<String, Value>, prefix: &str, map: &Map<String, Value>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(inner) => flatten_into(flat, &path, inner),
            _ => {
                flat.insert(path, value.clone());
            }
        }
    }
}

/// Walks a dotted path through nested objects.
pub fn value_at_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_objects_to_dotted_paths() {
        let record = json!({
            "dutyId": "D-1",
            "customer": { "name": "Acme", "id": 7 },
            "vehicle": { "type": { "category": "sedan" } },
        });

        let flat = flatten_record(&record);

        assert_eq!(flat["dutyId"], json!("D-1"));
        assert_eq!(flat["customer.name"], json!("Acme"));
        assert_eq!(flat["customer.id"], json!(7));
        assert_eq!(flat["vehicle.type.category"], json!("sedan"));
        assert!(!flat.contains_key("customer"));
    }

    #[test]
    fn test_flatten_keeps_lists_in_place() {
        let record = json!({
            "dutyId": "D-1",
            "invoices": [{ "number": "I-1" }],
        });

        let flat = flatten_record(&record);

        assert_eq!(flat["invoices"], json!([{ "number": "I-1" }]));
    }

    #[test]
    fn test_flatten_preserves_field_order() {
        let record = json!({ "z": 1, "meta": { "b": 2, "a": 3 }, "a": 4 });

        let flat = flatten_record(&record);
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();

        assert_eq!(keys, vec!["z", "meta.b", "meta.a", "a"]);
    }

    #[test]
    fn test_value_at_path() {
        let record = json!({ "license": { "number": "KA-01", "expiryDate": null } });

        assert_eq!(
            value_at_path(&record, "license.number"),
            Some(&json!("KA-01"))
        );
        assert_eq!(
            value_at_path(&record, "license.expiryDate"),
            Some(&Value::Null)
        );
        assert_eq!(value_at_path(&record, "license.state"), None);
        assert_eq!(value_at_path(&record, "license.number.digit"), None);
    }
}

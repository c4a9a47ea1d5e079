use serde_json::{Map, Value};

use super::keys::ManagedKey;
use super::records::{
    has_usable_id, ItemRecord, LegacyUiPreferences, LegacyUserSettings, UiPreferences, UserSettings,
};
use crate::errors::MigrationError;

const FOLDER_RENAMES: [(&str, &str); 3] = [
    ("parent_id", "parentId"),
    ("created_at", "createdAt"),
    ("sort_order", "sortOrder"),
];

const STEP_RENAMES: [(&str, &str); 1] = [("template_id", "templateId")];

/// True when a raw legacy payload carries data worth migrating.
pub fn is_meaningful(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Null) => false,
        Ok(Value::Array(a)) => !a.is_empty(),
        Ok(Value::Object(o)) => !o.is_empty(),
        Ok(Value::String(s)) => !s.is_empty(),
        Ok(_) => true,
        // plain strings written without JSON encoding
        Err(_) => true,
    }
}

/// Maps a raw legacy payload of `key` to its current shape.
///
/// Payloads that are not JSON are returned verbatim as a string.
pub fn transform(key: ManagedKey, raw: &str) -> Result<Value, MigrationError> {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(_) => {
            log::debug!("legacy '{key}' is not JSON, passing it through");
            return Ok(Value::String(raw.to_string()));
        }
    };

    match key {
        ManagedKey::Templates | ManagedKey::Snippets => items(key, value, false),
        ManagedKey::Workflows => items(key, value, true),
        ManagedKey::Folders => folders(key, value),
        ManagedKey::UiPreferences => {
            let old: LegacyUiPreferences = from_object(key, value)?;
            to_value(key, UiPreferences::from(old))
        }
        ManagedKey::UserSettings => {
            let old: LegacyUserSettings = from_object(key, value)?;
            to_value(key, UserSettings::from(old))
        }
    }
}

fn items(key: ManagedKey, value: Value, with_steps: bool) -> Result<Value, MigrationError> {
    let records = into_array(key, value)?;
    let total = records.len();

    let mut out = Vec::with_capacity(total);
    for record in records {
        let Some(mut item) = ItemRecord::classify(record).and_then(ItemRecord::into_current) else {
            continue;
        };
        if with_steps {
            if let Some(Value::Array(steps)) = item.extra.get_mut("steps") {
                for step in steps.iter_mut().filter_map(Value::as_object_mut) {
                    rename_fields(step, &STEP_RENAMES);
                }
            }
        }
        out.push(to_value(key, item)?);
    }

    if out.len() < total {
        log::warn!("dropped {} of {total} '{key}' records without a usable id", total - out.len());
    }
    Ok(Value::Array(out))
}

fn folders(key: ManagedKey, value: Value) -> Result<Value, MigrationError> {
    let records = into_array(key, value)?;
    let total = records.len();

    let out: Vec<Value> = records
        .into_iter()
        .filter_map(|record| match record {
            Value::Object(mut folder) if folder.get("id").is_some_and(has_usable_id) => {
                rename_fields(&mut folder, &FOLDER_RENAMES);
                Some(Value::Object(folder))
            }
            _ => None,
        })
        .collect();

    if out.len() < total {
        log::warn!("dropped {} of {total} '{key}' records without a usable id", total - out.len());
    }
    Ok(Value::Array(out))
}

/// Moves each `from` field to `to` unless `to` is already set.
fn rename_fields(object: &mut Map<String, Value>, renames: &[(&str, &str)]) {
    for (from, to) in renames {
        if let Some(v) = object.remove(*from) {
            object.entry(*to).or_insert(v);
        }
    }
}

fn into_array(key: ManagedKey, value: Value) -> Result<Vec<Value>, MigrationError> {
    match value {
        Value::Array(records) => Ok(records),
        other => Err(MigrationError::transform(
            key.canonical(),
            format!("expected an array of records, found {}", kind(&other)),
        )),
    }
}

fn from_object<T: serde::de::DeserializeOwned>(
    key: ManagedKey,
    value: Value,
) -> Result<T, MigrationError> {
    if !value.is_object() {
        return Err(MigrationError::transform(
            key.canonical(),
            format!("expected an object, found {}", kind(&value)),
        ));
    }
    serde_json::from_value(value).map_err(|e| MigrationError::transform(key.canonical(), e.to_string()))
}

fn to_value<T: serde::Serialize>(key: ManagedKey, record: T) -> Result<Value, MigrationError> {
    serde_json::to_value(record).map_err(|e| MigrationError::transform(key.canonical(), e.to_string()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emptiness_probe() {
        for raw in ["", "  ", "null", "[]", "{}", "\"\""] {
            assert!(!is_meaningful(raw), "{raw:?} should be empty");
        }
        for raw in ["[1]", "{\"a\":1}", "plain text", "0", "false"] {
            assert!(is_meaningful(raw), "{raw:?} should be meaningful");
        }
    }

    #[test]
    fn templates_drop_records_without_id() {
        let raw = r#"[{"name":"no id"},{"id":"123","name":"has id"}]"#;
        let out = transform(ManagedKey::Templates, raw).unwrap();
        assert_eq!(out, json!([{"id": "123", "name": "has id", "folderIds": []}]));
    }

    #[test]
    fn templates_keep_current_records_with_loose_field_types() {
        let raw = r#"[{"id":"1","name":"x","folderId":42},{"id":"2","favorite":1},{"id":"3","folderIds":null}]"#;
        let out = transform(ManagedKey::Templates, raw).unwrap();
        assert_eq!(
            out,
            json!([
                {"id": "1", "name": "x", "folderId": "42", "folderIds": ["42"]},
                {"id": "2", "folderIds": [], "favorite": true},
                {"id": "3", "folderIds": []}
            ])
        );
    }

    #[test]
    fn workflow_steps_are_renamed() {
        let raw = r#"[{"id":"w1","folder_id":"f","steps":[{"template_id":"t1","order":1},"junk"]}]"#;
        let out = transform(ManagedKey::Workflows, raw).unwrap();
        assert_eq!(out[0]["steps"], json!([{"templateId": "t1", "order": 1}, "junk"]));
        assert_eq!(out[0]["folderIds"], json!(["f"]));
    }

    #[test]
    fn folders_are_renamed() {
        let raw = r#"[{"id":"f1","parent_id":"root","sort_order":2,"created_at":"x"},{"parent_id":"p"}]"#;
        let out = transform(ManagedKey::Folders, raw).unwrap();
        assert_eq!(
            out,
            json!([{"id": "f1", "parentId": "root", "sortOrder": 2, "createdAt": "x"}])
        );
    }

    #[test]
    fn non_json_passes_through() {
        let out = transform(ManagedKey::UiPreferences, "compact").unwrap();
        assert_eq!(out, json!("compact"));
    }

    #[test]
    fn wrong_shape_is_a_transform_error() {
        let err = transform(ManagedKey::Snippets, r#"{"id":"1"}"#).unwrap_err();
        assert!(matches!(err, MigrationError::Transform { ref key, .. } if key == "snippets"));
        assert!(err.to_string().contains("expected an array"));

        let err = transform(ManagedKey::UserSettings, "[1,2]").unwrap_err();
        assert!(err.to_string().contains("expected an object"));
    }

    #[test]
    fn settings_transforms_apply_defaults() {
        let prefs = transform(ManagedKey::UiPreferences, r#"{"view_mode":"grid"}"#).unwrap();
        assert_eq!(prefs, json!({"viewMode": "grid", "theme": "system"}));

        let settings = transform(ManagedKey::UserSettings, r#"{"display_name":"Ada"}"#).unwrap();
        assert_eq!(
            settings,
            json!({"displayName": "Ada", "preferences": {"confirmDelete": true}})
        );
    }
}

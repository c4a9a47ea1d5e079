//! Record shapes before and after migration.
//!
//! A stored record is classified once, by looking for field names only older
//! releases wrote, and then mapped by the function of its variant.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names that mark a template/workflow/snippet as pre-migration.
const LEGACY_ITEM_FIELDS: [&str; 4] = ["folder_id", "is_favorite", "created_at", "updated_at"];

/// Template, workflow or snippet as written by older releases.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyItemV1 {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub folder_id: Value,
    #[serde(default, deserialize_with = "present")]
    pub is_favorite: Option<Value>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Template, workflow or snippet in the current shape.
///
/// Reading is lenient: a folder reference or flag of an unexpected JSON type
/// is normalized the way legacy fields are, so deserializing an object never
/// fails and only the identifier decides whether a record survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentItem {
    #[serde(default)]
    pub id: Value,
    #[serde(
        default,
        deserialize_with = "lenient_folder_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub folder_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_folder_ids")]
    pub folder_ids: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub enum ItemRecord {
    LegacyV1(LegacyItemV1),
    Current(CurrentItem),
}

impl ItemRecord {
    /// Classifies a stored record. Anything that is not an object cannot be
    /// mapped and yields `None`.
    pub fn classify(value: Value) -> Option<Self> {
        let object = value.as_object()?;
        let legacy = LEGACY_ITEM_FIELDS.iter().any(|f| object.contains_key(*f));
        if legacy {
            serde_json::from_value(value).ok().map(ItemRecord::LegacyV1)
        } else {
            serde_json::from_value(value).ok().map(ItemRecord::Current)
        }
    }

    /// Maps the record to the current shape. Records without a usable
    /// identifier map to `None`; they are never given a generated one.
    pub fn into_current(self) -> Option<CurrentItem> {
        let item = match self {
            ItemRecord::LegacyV1(old) => {
                let folder_id = folder_id_of(&old.folder_id);
                CurrentItem {
                    id: old.id,
                    folder_ids: folder_id.iter().cloned().collect(),
                    folder_id,
                    favorite: old.is_favorite.as_ref().map(coerce_bool),
                    created_at: old.created_at,
                    updated_at: old.updated_at,
                    extra: old.rest,
                }
            }
            ItemRecord::Current(mut item) => {
                if item.folder_ids.is_empty() {
                    item.folder_ids = item.folder_id.iter().cloned().collect();
                }
                item
            }
        };
        has_usable_id(&item.id).then_some(item)
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only an absent field is `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn lenient_folder_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|v| folder_id_of(&v))
}

/// Keeps the usable entries of an array; anything else reads as no folders.
fn lenient_folder_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(ids) => ids.iter().filter_map(folder_id_of).collect(),
        single => folder_id_of(&single).into_iter().collect(),
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|v| (!v.is_null()).then(|| coerce_bool(&v)))
}

/// Non-empty strings and numbers identify a record.
pub fn has_usable_id(id: &Value) -> bool {
    match id {
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(_) => true,
        _ => false,
    }
}

fn folder_id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Older releases stored flags as booleans, 0/1 or strings.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

/// UI preferences as written by older releases.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyUiPreferences {
    #[serde(default)]
    pub view_mode: Option<Value>,
    #[serde(default)]
    pub sidebar_collapsed: Option<Value>,
    #[serde(default)]
    pub items_per_page: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

pub const DEFAULT_THEME: &str = "system";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_mode: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidebar_collapsed: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<Value>,
    pub theme: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<LegacyUiPreferences> for UiPreferences {
    fn from(old: LegacyUiPreferences) -> Self {
        let mut extra = old.rest;
        // a camelCase field already present is newer than its snake_case twin
        let view_mode = extra.remove("viewMode").or(old.view_mode);
        let sidebar_collapsed = extra.remove("sidebarCollapsed").or(old.sidebar_collapsed);
        let items_per_page = extra.remove("itemsPerPage").or(old.items_per_page);
        let theme = extra
            .remove("theme")
            .filter(|t| !t.is_null())
            .unwrap_or_else(|| Value::String(DEFAULT_THEME.to_string()));

        UiPreferences {
            view_mode,
            sidebar_collapsed,
            items_per_page,
            theme,
            extra,
        }
    }
}

/// User settings as written by older releases.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyUserSettings {
    #[serde(default)]
    pub display_name: Option<Value>,
    #[serde(default)]
    pub notifications_enabled: Option<Value>,
    #[serde(default)]
    pub auto_save: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<Value>,
    pub preferences: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<LegacyUserSettings> for UserSettings {
    fn from(old: LegacyUserSettings) -> Self {
        let mut extra = old.rest;
        let display_name = extra.remove("displayName").or(old.display_name);

        let mut preferences = match extra.remove("preferences") {
            Some(Value::Object(p)) => p,
            _ => Map::new(),
        };
        if let Some(v) = old.notifications_enabled {
            preferences.entry("notifications").or_insert(v);
        }
        if let Some(v) = old.auto_save {
            preferences.entry("autoSave").or_insert(v);
        }
        preferences.entry("confirmDelete").or_insert(Value::Bool(true));

        UserSettings {
            display_name,
            preferences,
            extra,
        }
    }
}

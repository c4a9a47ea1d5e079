use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// A logical dataset whose older on-disk shapes are migrated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ManagedKey {
    Templates,
    Workflows,
    Snippets,
    Folders,
    UiPreferences,
    UserSettings,
}

impl ManagedKey {
    pub const ALL: [ManagedKey; 6] = [
        ManagedKey::Templates,
        ManagedKey::Workflows,
        ManagedKey::Snippets,
        ManagedKey::Folders,
        ManagedKey::UiPreferences,
        ManagedKey::UserSettings,
    ];

    /// Current key name, as stored through the facade.
    pub fn canonical(self) -> &'static str {
        match self {
            ManagedKey::Templates => "templates",
            ManagedKey::Workflows => "workflows",
            ManagedKey::Snippets => "snippets",
            ManagedKey::Folders => "folders",
            ManagedKey::UiPreferences => "uiPreferences",
            ManagedKey::UserSettings => "userSettings",
        }
    }

    pub fn from_canonical(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.canonical() == key)
    }

    /// Raw storage keys older releases wrote this dataset under, most
    /// authoritative first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            ManagedKey::Templates => &[
                "templates",
                "airprompts_templates",
                "ap_templates",
                "templates-backup",
                "templates_backup",
                "templates_temp",
                "templates-temp",
            ],
            ManagedKey::Workflows => &[
                "workflows",
                "airprompts_workflows",
                "ap_workflows",
                "workflows-backup",
                "workflows_backup",
                "workflows_temp",
                "workflows-temp",
            ],
            ManagedKey::Snippets => &[
                "snippets",
                "airprompts_snippets",
                "ap_snippets",
                "snippets-backup",
                "snippets_backup",
                "snippets_temp",
                "snippets-temp",
            ],
            ManagedKey::Folders => &[
                "folders",
                "airprompts_folders",
                "ap_folders",
                "folders-backup",
                "folders_backup",
                "folders_temp",
                "folders-temp",
            ],
            ManagedKey::UiPreferences => &[
                "ui-prefs",
                "airprompts_ui-prefs",
                "ap_ui-prefs",
                "ui_prefs",
                "ui-prefs-backup",
                "ui-prefs_backup",
                "ui-prefs_temp",
            ],
            ManagedKey::UserSettings => &[
                "user_settings",
                "airprompts_user_settings",
                "ap_user_settings",
                "user-settings",
                "user_settings-backup",
                "user_settings_backup",
                "user_settings_temp",
            ],
        }
    }

    /// Collections hold arrays of records; the others hold a single object.
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            ManagedKey::Templates | ManagedKey::Workflows | ManagedKey::Snippets | ManagedKey::Folders
        )
    }

    /// Value returned when neither migrated nor legacy data exists.
    pub fn empty_value(self) -> Value {
        if self.is_collection() {
            Value::Array(Vec::new())
        } else {
            Value::Null
        }
    }
}

impl fmt::Display for ManagedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn canonical_names_round_trip() {
        for key in ManagedKey::ALL {
            assert_eq!(ManagedKey::from_canonical(key.canonical()), Some(key));
        }
        assert_eq!(ManagedKey::from_canonical("ui-prefs"), None);
    }

    #[test]
    fn aliases_are_unique_across_keys() {
        let mut seen = HashSet::new();
        for key in ManagedKey::ALL {
            for alias in key.aliases() {
                assert!(seen.insert(*alias), "alias {alias} is listed twice");
            }
        }
    }

    #[test]
    fn empty_values_match_shape() {
        assert_eq!(ManagedKey::Snippets.empty_value(), serde_json::json!([]));
        assert_eq!(ManagedKey::UserSettings.empty_value(), Value::Null);
    }
}

use planmark::controller::InteractionConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppSettings {
    pub store_path: String,
    pub project_id: String,
    pub image_path: Option<String>,
    pub svg_path: String,
    /// Base URL of the dashboard that owns task pages.
    pub dashboard_url: String,
    pub log_level: String,
    pub interaction: InteractionConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            store_path: "planmark.json".to_string(),
            project_id: "default".to_string(),
            image_path: None,
            svg_path: "blueprint.svg".to_string(),
            dashboard_url: "http://localhost:3000".to_string(),
            log_level: "info".to_string(),
            interaction: InteractionConfig::default(),
        }
    }
}

pub(crate) fn config_path() -> String {
    if let Some(home) = std::env::var_os("HOME") {
        let path = std::path::PathBuf::from(home).join(".config").join("planmark.toml");
        if path.exists() {
            return path.display().to_string();
        }
    }
    "settings.toml".to_string()
}

pub(crate) fn load_settings(path: &str) -> Option<AppSettings> {
    let s = std::fs::read_to_string(path).ok()?;
    if path.ends_with(".toml") {
        toml::from_str::<AppSettings>(&s)
            .ok()
            .or_else(|| serde_json::from_str::<AppSettings>(&s).ok())
    } else {
        serde_json::from_str::<AppSettings>(&s)
            .ok()
            .or_else(|| toml::from_str::<AppSettings>(&s).ok())
    }
}

pub(crate) fn save_settings(path: &str, settings: &AppSettings) -> Result<(), String> {
    if path.ends_with(".toml") {
        let toml = toml::to_string_pretty(settings).map_err(|e| e.to_string())?;
        std::fs::write(path, toml).map_err(|e| e.to_string())
    } else {
        let json = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planmark::validation::PolygonPolicy;

    #[test]
    fn partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "project_id = \"tower-b\"\n[interaction]\npolygon_policy = \"require_simple\"\n",
        )
        .unwrap();
        let s = load_settings(path.to_str().unwrap()).unwrap();
        assert_eq!(s.project_id, "tower-b");
        assert_eq!(s.store_path, "planmark.json");
        assert_eq!(s.interaction.polygon_policy, PolygonPolicy::RequireSimple);
        assert_eq!(s.interaction.pin_radius, 10.0);
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let path = path.to_str().unwrap();
        let settings = AppSettings {
            image_path: Some("plan.png".into()),
            ..Default::default()
        };
        save_settings(path, &settings).unwrap();
        assert_eq!(load_settings(path), Some(settings));
    }
}

// ─── Version File ───
// Serde model of the recognized subset of a version JSON. Every field is
// optional so a child file can be merged over its parent; unknown fields
// and unrecognized argument shapes are ignored.

use std::collections::HashMap;

use serde::Deserialize;

use super::rules::Rule;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub version_type: Option<String>,
    pub main_class: Option<String>,
    pub inherits_from: Option<String>,
    pub minimum_launcher_version: Option<u32>,
    pub compliance_level: Option<u32>,
    pub asset_index: Option<AssetIndexInfo>,
    pub java_version: Option<JavaVersionInfo>,
    pub arguments: Option<Arguments>,
    /// Legacy single-string game arguments (pre-1.13).
    pub minecraft_arguments: Option<String>,
    pub libraries: Option<Vec<LibraryEntry>>,
    pub downloads: Option<VersionDownloads>,
    /// Present with no `client` means "clear the inherited logging config".
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloadInfo {
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    pub game: Option<Vec<ArgumentValue>>,
    pub jvm: Option<Vec<ArgumentValue>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: ArgumentText,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgumentText {
    One(String),
    Many(Vec<String>),
}

impl ArgumentText {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ArgumentText::One(s) => vec![s],
            ArgumentText::Many(v) => v,
        }
    }
}

// ─── Library Entry ───

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryEntry {
    pub name: Option<String>,
    pub rules: Option<Vec<Rule>>,
    pub downloads: Option<LibraryDownloads>,
    /// Maven repository base for entries without `downloads`.
    pub url: Option<String>,
    /// OS name -> classifier, may contain `${arch}`.
    pub natives: Option<HashMap<String, String>>,
    pub extract: Option<ExtractRules>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryDownloads {
    pub artifact: Option<ArtifactInfo>,
    pub classifiers: Option<HashMap<String, ArtifactInfo>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtifactInfo {
    pub path: Option<String>,
    pub sha1: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

// ─── Logging ───

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    pub client: Option<LoggingClient>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingClient {
    pub argument: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl VersionJson {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modern_arguments_accept_all_shapes() {
        let raw = r#"{
            "arguments": {
                "game": [
                    "--username", "${auth_player_name}",
                    {"rules": [{"action": "allow", "features": {"is_demo_user": true}}], "value": "--demo"},
                    {"rules": [{"action": "allow", "os": {"name": "osx"}}], "value": ["-a", "-b"]},
                    42
                ]
            }
        }"#;
        let json = VersionJson::parse(raw).unwrap();
        let game = json.arguments.unwrap().game.unwrap();
        assert_eq!(game.len(), 5);
        assert!(matches!(game[0], ArgumentValue::Plain(_)));
        assert!(matches!(game[2], ArgumentValue::Conditional { .. }));
        assert!(matches!(game[4], ArgumentValue::Other(_)));
    }

    #[test]
    fn empty_logging_section_is_distinguished_from_absent() {
        let cleared = VersionJson::parse(r#"{"logging": {}}"#).unwrap();
        assert!(cleared.logging.is_some());
        assert!(cleared.logging.unwrap().client.is_none());

        let absent = VersionJson::parse(r#"{"id": "x"}"#).unwrap();
        assert!(absent.logging.is_none());
    }
}

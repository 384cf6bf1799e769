// ─── Version Resolver ───
// Follows an `inheritsFrom` chain and merges it, parent first, into one
// immutable `GameSpecification`.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info};

use super::manifest::VersionManifest;
use super::rules::rules_allow;
use super::version_file::{
    ArgumentValue, ArtifactInfo, DownloadInfo, LibraryEntry, VersionJson,
};
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::{path_str, quote_if_spaced, GamePaths};
use crate::core::platform::{OsKind, Platform};

/// Highest `minimumLauncherVersion` understood.
pub const SUPPORTED_LAUNCHER_VERSION: u32 = 21;
/// Highest `complianceLevel` understood.
pub const SUPPORTED_COMPLIANCE_LEVEL: u32 = 1;
pub const BASE_LIBRARY_URL: &str = "https://libraries.minecraft.net/";

// ─── Merged model ───

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// Path relative to the libraries directory.
    pub path: String,
    /// Absent for historical entries; disables verification.
    pub sha1: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRequirement {
    pub group: String,
    pub artifact: String,
    /// Version, possibly followed by `:classifier`.
    pub version: String,
    pub primary: Option<ArtifactDescriptor>,
    pub native: Option<ArtifactDescriptor>,
    pub exclude: Vec<String>,
}

impl LibraryRequirement {
    pub fn name(&self) -> String {
        format!("{}:{}:{}", self.group, self.artifact, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub kind: String,
    pub argument: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentForm {
    Modern,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchArguments {
    Modern { jvm: Vec<String>, game: Vec<String> },
    Legacy { minecraft_arguments: String },
}

impl LaunchArguments {
    pub fn form(&self) -> ArgumentForm {
        match self {
            LaunchArguments::Modern { .. } => ArgumentForm::Modern,
            LaunchArguments::Legacy { .. } => ArgumentForm::Legacy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSpecification {
    pub id: String,
    pub game_type: String,
    pub main_class: String,
    pub java_major: Option<u32>,
    pub asset_index: AssetIndexRef,
    pub libraries: Vec<LibraryRequirement>,
    pub client_download: Option<DownloadInfo>,
    pub arguments: LaunchArguments,
    pub logging: Option<LoggingConfig>,
}

/// Unexpanded templates handed to the argument builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTemplates {
    pub jvm: String,
    pub main_class: String,
    pub game: String,
}

impl GameSpecification {
    pub fn client_jar(&self, paths: &GamePaths) -> PathBuf {
        paths.client_jar(&self.id)
    }

    /// Primary artifacts in merge order, then the client jar.
    pub fn classpath_entries(&self, paths: &GamePaths) -> Vec<PathBuf> {
        self.libraries
            .iter()
            .filter_map(|lib| lib.primary.as_ref())
            .map(|artifact| paths.library_path(&artifact.path))
            .chain(std::iter::once(self.client_jar(paths)))
            .collect()
    }

    pub fn launch_templates(
        &self,
        paths: &GamePaths,
        platform: &Platform,
    ) -> LauncherResult<LaunchTemplates> {
        let (mut jvm, game) = match &self.arguments {
            LaunchArguments::Legacy {
                minecraft_arguments,
            } => (
                legacy_jvm_arguments(&self.client_jar(paths), platform),
                minecraft_arguments.clone(),
            ),
            LaunchArguments::Modern { jvm, game } => (quote_and_join(jvm), quote_and_join(game)),
        };

        if let Some(logging) = &self.logging {
            if !logging.kind.contains("log4j2") {
                return Err(LauncherError::Internal(format!(
                    "Unsupported logging configuration type \"{}\".",
                    logging.kind
                )));
            }
            let config = quote_if_spaced(&path_str(&paths.log_config()));
            jvm.push(' ');
            jvm.push_str(&logging.argument.replace("${path}", &config));
        }

        Ok(LaunchTemplates {
            jvm,
            main_class: self.main_class.clone(),
            game,
        })
    }
}

fn quote_and_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| quote_if_spaced(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// JVM template synthesized for `minecraftArguments` versions.
fn legacy_jvm_arguments(client_jar: &std::path::Path, platform: &Platform) -> String {
    let mut args: Vec<String> = Vec::new();
    match platform.os {
        OsKind::Windows => args.push(
            "-XX:HeapDumpPath=MojangTricksIntelDriversForPerformance_javaw.exe_minecraft.exe.heapdump"
                .into(),
        ),
        OsKind::Osx => args.push("-XstartOnFirstThread".into()),
        OsKind::Linux => {}
    }
    if !platform.is_64bit() {
        args.push("-Xss1M".into());
    }
    args.push("-Djava.library.path=${natives_directory}".into());
    args.push("-Dminecraft.launcher.brand=${launcher_name}".into());
    args.push("-Dminecraft.launcher.version=${launcher_version}".into());
    args.push(format!(
        "-Dminecraft.client.jar={}",
        quote_if_spaced(&path_str(client_jar))
    ));
    args.push("-cp".into());
    args.push("${classpath}".into());
    args.join(" ")
}

// ─── Merge ───

#[derive(Default)]
struct SpecificationBuilder {
    id: Option<String>,
    game_type: Option<String>,
    main_class: Option<String>,
    java_major: Option<u32>,
    asset_index: Option<AssetIndexRef>,
    libraries: Vec<LibraryRequirement>,
    client_download: Option<DownloadInfo>,
    jvm_args: Option<Vec<String>>,
    game_args: Option<Vec<String>>,
    minecraft_arguments: Option<String>,
    logging: Option<LoggingConfig>,
}

impl SpecificationBuilder {
    fn merge(&mut self, json: &VersionJson, platform: &Platform) -> LauncherResult<()> {
        if let Some(index) = &json.asset_index {
            self.asset_index = Some(AssetIndexRef {
                id: index.id.clone(),
                url: index.url.clone(),
                sha1: index.sha1.clone(),
            });
        }
        if let Some(id) = &json.id {
            self.id = Some(id.clone());
        }
        if let Some(kind) = &json.version_type {
            self.game_type = Some(kind.clone());
        }
        if let Some(main_class) = &json.main_class {
            self.main_class = Some(main_class.clone());
        }
        if let Some(java) = &json.java_version {
            self.java_major = Some(java.major_version);
        }

        if let Some(arguments) = &json.arguments {
            if let Some(jvm) = &arguments.jvm {
                let evaluated = evaluate_arguments(jvm, platform)?;
                self.jvm_args.get_or_insert_with(Vec::new).extend(evaluated);
            }
            if let Some(game) = &arguments.game {
                let evaluated = evaluate_arguments(game, platform)?;
                self.game_args.get_or_insert_with(Vec::new).extend(evaluated);
            }
        } else if let Some(legacy) = &json.minecraft_arguments {
            self.minecraft_arguments = Some(legacy.clone());
        }

        if let Some(entries) = &json.libraries {
            let mut derived = Vec::new();
            for entry in entries {
                if let Some(library) = library_from_entry(entry, platform)? {
                    derived.push(library);
                }
            }
            // An inherited entry is dropped, natives included, once the
            // derived file names the same artifact.
            let artifacts: HashSet<&str> = derived.iter().map(|l| l.artifact.as_str()).collect();
            self.libraries.retain(|l| !artifacts.contains(l.artifact.as_str()));
            derived.append(&mut self.libraries);
            self.libraries = derived;
        }

        if let Some(client) = json.downloads.as_ref().and_then(|d| d.client.as_ref()) {
            self.client_download = Some(client.clone());
        }

        if let Some(section) = &json.logging {
            self.logging = section.client.as_ref().map(|client| LoggingConfig {
                kind: client.kind.clone(),
                argument: client.argument.clone(),
            });
        }

        Ok(())
    }

    fn finish(self) -> LauncherResult<GameSpecification> {
        let missing = |what: &str| {
            LauncherError::VersionFile(format!("The version file didn't provide {what}."))
        };

        let asset_index = self.asset_index.ok_or_else(|| missing("asset info"))?;
        let id = self.id.ok_or_else(|| missing("the game ID"))?;
        let game_type = self.game_type.ok_or_else(|| missing("the game type"))?;
        let main_class = self.main_class.ok_or_else(|| missing("the main class"))?;

        let arguments = match (self.minecraft_arguments, self.game_args) {
            (Some(minecraft_arguments), _) => LaunchArguments::Legacy {
                minecraft_arguments,
            },
            (None, Some(game)) => LaunchArguments::Modern {
                jvm: self.jvm_args.unwrap_or_default(),
                game,
            },
            (None, None) => return Err(missing("the game arguments")),
        };

        if self.libraries.is_empty() {
            return Err(missing("the libraries"));
        }

        Ok(GameSpecification {
            id,
            game_type,
            main_class,
            java_major: self.java_major,
            asset_index,
            libraries: self.libraries,
            client_download: self.client_download,
            arguments,
            logging: self.logging,
        })
    }
}

fn evaluate_arguments(values: &[ArgumentValue], platform: &Platform) -> LauncherResult<Vec<String>> {
    let mut out = Vec::new();
    for value in values {
        match value {
            ArgumentValue::Plain(arg) => out.push(arg.clone()),
            ArgumentValue::Conditional { rules, value } => {
                if rules_allow(rules, platform)? {
                    out.extend(value.clone().into_vec());
                }
            }
            ArgumentValue::Other(other) => debug!("Ignoring unrecognized argument entry {other}"),
        }
    }
    Ok(out)
}

fn maven_path(group: &str, artifact: &str, version: &str, classifier: Option<&str>) -> String {
    let (version, embedded) = match version.split_once(':') {
        Some((v, c)) => (v, Some(c)),
        None => (version, None),
    };
    let classifier = classifier.or(embedded);
    let file = match classifier {
        Some(c) => format!("{artifact}-{version}-{c}.jar"),
        None => format!("{artifact}-{version}.jar"),
    };
    format!("{}/{artifact}/{version}/{file}", group.replace('.', "/"))
}

fn descriptor(info: &ArtifactInfo, fallback_path: impl FnOnce() -> String) -> ArtifactDescriptor {
    ArtifactDescriptor {
        path: info.path.clone().unwrap_or_else(fallback_path),
        sha1: info.sha1.clone().filter(|s| !s.is_empty()),
        url: info.url.clone().unwrap_or_default(),
    }
}

fn library_from_entry(
    entry: &LibraryEntry,
    platform: &Platform,
) -> LauncherResult<Option<LibraryRequirement>> {
    if let Some(rules) = &entry.rules {
        if !rules_allow(rules, platform)? {
            return Ok(None);
        }
    }

    let Some(name) = &entry.name else {
        return Ok(None);
    };
    let mut parts = name.splitn(3, ':');
    let (Some(group), Some(artifact), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(LauncherError::VersionFile(format!(
            "Invalid library name \"{name}\"."
        )));
    };
    if group.is_empty() || artifact.is_empty() || version.is_empty() {
        return Err(LauncherError::VersionFile(format!(
            "Invalid library name \"{name}\"."
        )));
    }

    let arch_bits = if platform.is_64bit() { "64" } else { "32" };
    let classifier = entry
        .natives
        .as_ref()
        .and_then(|natives| natives.get(platform.os.rule_name()))
        .map(|c| c.replace("${arch}", arch_bits));
    let has_natives = entry.natives.is_some();

    let (primary, native) = match &entry.downloads {
        Some(downloads) if has_natives => {
            let native = classifier.as_deref().and_then(|c| {
                downloads
                    .classifiers
                    .as_ref()
                    .and_then(|all| all.get(c))
                    .map(|info| descriptor(info, || maven_path(group, artifact, version, Some(c))))
            });
            (None, native)
        }
        Some(downloads) => {
            let primary = downloads
                .artifact
                .as_ref()
                .map(|info| descriptor(info, || maven_path(group, artifact, version, None)));
            (primary, None)
        }
        None => {
            let mut base = entry
                .url
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| BASE_LIBRARY_URL.to_string());
            if !base.ends_with('/') {
                base.push('/');
            }
            let make = |classifier: Option<&str>| {
                let path = maven_path(group, artifact, version, classifier);
                ArtifactDescriptor {
                    url: format!("{base}{path}"),
                    path,
                    sha1: None,
                }
            };
            match (has_natives, classifier.as_deref()) {
                (true, Some(c)) => (None, Some(make(Some(c)))),
                (true, None) => (None, None),
                (false, _) => (Some(make(None)), None),
            }
        }
    };

    Ok(Some(LibraryRequirement {
        group: group.to_string(),
        artifact: artifact.to_string(),
        version: version.to_string(),
        primary,
        native,
        exclude: entry
            .extract
            .as_ref()
            .map(|e| e.exclude.clone())
            .unwrap_or_default(),
    }))
}

// ─── Resolver ───

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParentRef {
    inherits_from: Option<String>,
}

pub struct VersionResolver<'a> {
    paths: &'a GamePaths,
    platform: &'a Platform,
}

impl<'a> VersionResolver<'a> {
    pub fn new(paths: &'a GamePaths, platform: &'a Platform) -> Self {
        Self { paths, platform }
    }

    /// Make sure every version file in the chain of `version_id` is on disk,
    /// downloading missing ones from the manifest with hash verification.
    pub async fn ensure_cached(
        &self,
        manifest: &VersionManifest,
        downloader: &Downloader,
        version_id: &str,
    ) -> LauncherResult<()> {
        let mut visited = HashSet::new();
        let mut next = Some(version_id.to_string());

        while let Some(id) = next.take() {
            if !visited.insert(id.clone()) {
                return Err(LauncherError::Manifest(format!(
                    "Circular inheritance: the version files of \"{version_id}\" and \"{id}\" reference each other in a loop."
                )));
            }

            let path = self.paths.version_file(&id);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                let entry = manifest.find_version(&id).ok_or_else(|| {
                    LauncherError::Manifest(format!(
                        "Version \"{id}\" was not found in the versions manifest."
                    ))
                })?;
                info!("Downloading version file for {id}");
                downloader
                    .download_file(&entry.url, &path, entry.sha1.as_deref())
                    .await
                    .map_err(|e| {
                        LauncherError::Manifest(format!(
                            "Failed to download the version file \"{id}.json\": {e}"
                        ))
                    })?;
            }

            let raw = read_version_file(&path, &id).await?;
            let parent: ParentRef = serde_json::from_str(&raw).map_err(|e| {
                LauncherError::VersionFile(format!("Error reading file \"{id}.json\": {e}"))
            })?;
            next = parent.inherits_from;
        }
        Ok(())
    }

    /// Load and merge the whole chain of `version_id`.
    pub async fn resolve(&self, version_id: &str) -> LauncherResult<GameSpecification> {
        let chain = self.load_chain(version_id).await?;

        let mut builder = SpecificationBuilder::default();
        for json in chain.iter().rev() {
            builder.merge(json, self.platform)?;
        }
        let spec = builder.finish()?;

        info!(
            "Resolved {} ({} libraries, {:?} arguments)",
            spec.id,
            spec.libraries.len(),
            spec.arguments.form()
        );
        Ok(spec)
    }

    /// Child first, most distant ancestor last.
    async fn load_chain(&self, version_id: &str) -> LauncherResult<Vec<VersionJson>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(version_id.to_string());

        while let Some(id) = next.take() {
            if !visited.insert(id.clone()) {
                return Err(LauncherError::VersionFile(format!(
                    "Circular inheritance: \"{id}\" appears twice in the version chain of \"{version_id}\"."
                )));
            }

            let raw = read_version_file(&self.paths.version_file(&id), &id).await?;
            let json = VersionJson::parse(&raw).map_err(|e| {
                LauncherError::VersionFile(format!("Error reading file \"{id}.json\": {e}"))
            })?;

            if let Some(level) = json.minimum_launcher_version {
                if level > SUPPORTED_LAUNCHER_VERSION {
                    return Err(LauncherError::VersionFile(format!(
                        "Required launcher version too high ({level})."
                    )));
                }
            }
            if let Some(level) = json.compliance_level {
                if level > SUPPORTED_COMPLIANCE_LEVEL {
                    return Err(LauncherError::VersionFile(format!(
                        "Required compliance level too high ({level})."
                    )));
                }
            }

            next = json.inherits_from.clone();
            chain.push(json);
        }
        Ok(chain)
    }
}

async fn read_version_file(path: &std::path::Path, id: &str) -> LauncherResult<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(LauncherError::VersionFile(
            format!("Missing file \"{id}.json\"."),
        )),
        Err(e) => Err(LauncherError::VersionFile(format!(
            "Error reading file \"{id}.json\": {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::hash::sha1_hex;
    use crate::core::http::{Http, Method};
    use crate::core::platform::ArchKind;
    use crate::core::testing::{temp_dir, write_file, MockTransport};

    fn linux() -> Platform {
        Platform::new(OsKind::Linux, ArchKind::X64, "6.1.0")
    }

    const VANILLA: &str = r#"{
        "id": "1.20.1",
        "type": "release",
        "mainClass": "net.minecraft.client.main.Main",
        "assetIndex": {"id": "5", "url": "https://piston-meta.mojang.com/5.json", "sha1": "aa"},
        "javaVersion": {"majorVersion": 17},
        "downloads": {"client": {"url": "https://piston-data.mojang.com/client.jar", "sha1": "cc"}},
        "logging": {"client": {"argument": "-Dlog4j.configurationFile=${path}", "type": "log4j2-xml"}},
        "arguments": {
            "game": ["--username", "${auth_player_name}",
                     {"rules": [{"action": "allow", "features": {"is_demo_user": true}}], "value": "--demo"}],
            "jvm": [{"rules": [{"action": "allow", "os": {"name": "osx"}}], "value": ["-XstartOnFirstThread"]},
                    "-Djava.library.path=${natives_directory}", "-cp", "${classpath}"]
        },
        "libraries": [
            {"name": "org.ow2.asm:asm:9.3",
             "downloads": {"artifact": {"path": "org/ow2/asm/asm/9.3/asm-9.3.jar", "sha1": "a1", "url": "https://libraries.minecraft.net/org/ow2/asm/asm/9.3/asm-9.3.jar"}}},
            {"name": "com.mojang:brigadier:1.1.8",
             "downloads": {"artifact": {"path": "com/mojang/brigadier/1.1.8/brigadier-1.1.8.jar", "sha1": "b1", "url": "https://libraries.minecraft.net/com/mojang/brigadier/1.1.8/brigadier-1.1.8.jar"}}},
            {"name": "ca.weblite:java-objc-bridge:1.1",
             "rules": [{"action": "allow", "os": {"name": "osx"}}],
             "downloads": {"artifact": {"path": "ca/weblite/java-objc-bridge/1.1/java-objc-bridge-1.1.jar", "sha1": "c1", "url": "https://libraries.minecraft.net/x.jar"}}}
        ]
    }"#;

    const LOADER: &str = r#"{
        "id": "fabric-loader-0.15.0-1.20.1",
        "inheritsFrom": "1.20.1",
        "type": "release",
        "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
        "arguments": {"game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "]},
        "logging": {},
        "libraries": [
            {"name": "org.ow2.asm:asm:9.6", "url": "https://maven.fabricmc.net/"},
            {"name": "net.fabricmc:fabric-loader:0.15.0", "url": "https://maven.fabricmc.net/"}
        ]
    }"#;

    fn setup(label: &str) -> GamePaths {
        let paths = GamePaths::new(temp_dir(label));
        write_file(&paths.version_file("1.20.1"), VANILLA);
        write_file(&paths.version_file("fabric-loader-0.15.0-1.20.1"), LOADER);
        paths
    }

    #[tokio::test]
    async fn child_overrides_parent_and_libraries_are_deduplicated() {
        let paths = setup("resolve-chain");
        let platform = linux();
        let spec = VersionResolver::new(&paths, &platform)
            .resolve("fabric-loader-0.15.0-1.20.1")
            .await
            .unwrap();

        assert_eq!(spec.id, "fabric-loader-0.15.0-1.20.1");
        assert_eq!(spec.main_class, "net.fabricmc.loader.impl.launch.knot.KnotClient");
        assert_eq!(spec.asset_index.id, "5");
        assert_eq!(spec.java_major, Some(17));
        assert!(spec.logging.is_none());

        let names: Vec<String> = spec.libraries.iter().map(|l| l.name()).collect();
        assert_eq!(
            names,
            vec![
                "org.ow2.asm:asm:9.6",
                "net.fabricmc:fabric-loader:0.15.0",
                "com.mojang:brigadier:1.1.8"
            ]
        );
        let artifacts: HashSet<&str> = spec.libraries.iter().map(|l| l.artifact.as_str()).collect();
        assert_eq!(artifacts.len(), spec.libraries.len());

        let asm = &spec.libraries[0];
        let primary = asm.primary.as_ref().unwrap();
        assert_eq!(primary.path, "org/ow2/asm/asm/9.6/asm-9.6.jar");
        assert_eq!(
            primary.url,
            "https://maven.fabricmc.net/org/ow2/asm/asm/9.6/asm-9.6.jar"
        );
        assert!(primary.sha1.is_none());

        match &spec.arguments {
            LaunchArguments::Modern { jvm, game } => {
                assert_eq!(
                    jvm,
                    &vec![
                        "-Djava.library.path=${natives_directory}".to_string(),
                        "-cp".to_string(),
                        "${classpath}".to_string(),
                        "-DFabricMcEmu= net.minecraft.client.main.Main ".to_string(),
                    ]
                );
                assert_eq!(game, &vec!["--username".to_string(), "${auth_player_name}".to_string()]);
            }
            other => panic!("unexpected form {other:?}"),
        }
    }

    #[tokio::test]
    async fn overriding_an_artifact_drops_every_inherited_variant() {
        let paths = GamePaths::new(temp_dir("resolve-lwjgl"));
        write_file(
            &paths.version_file("lwjgl-parent"),
            r#"{
                "id": "lwjgl-parent",
                "type": "release",
                "mainClass": "net.minecraft.client.main.Main",
                "assetIndex": {"id": "5", "url": "https://piston-meta.mojang.com/5.json", "sha1": "aa"},
                "arguments": {"game": [], "jvm": ["-cp", "${classpath}"]},
                "libraries": [
                    {"name": "org.lwjgl:lwjgl:3.3.1",
                     "downloads": {"artifact": {"path": "org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar", "sha1": "l1", "url": "https://libraries.minecraft.net/org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar"}}},
                    {"name": "org.lwjgl:lwjgl:3.3.1:natives-linux",
                     "downloads": {"artifact": {"path": "org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1-natives-linux.jar", "sha1": "l2", "url": "https://libraries.minecraft.net/org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1-natives-linux.jar"}}}
                ]
            }"#,
        );
        write_file(
            &paths.version_file("lwjgl-child"),
            r#"{
                "id": "lwjgl-child",
                "inheritsFrom": "lwjgl-parent",
                "libraries": [{"name": "org.lwjgl:lwjgl:3.3.3", "url": "https://maven.example.net/"}]
            }"#,
        );
        let platform = linux();
        let spec = VersionResolver::new(&paths, &platform)
            .resolve("lwjgl-child")
            .await
            .unwrap();

        let names: Vec<String> = spec.libraries.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["org.lwjgl:lwjgl:3.3.3"]);
    }

    #[tokio::test]
    async fn modern_arguments_win_over_legacy_in_the_same_file() {
        let paths = GamePaths::new(temp_dir("resolve-both-forms"));
        write_file(
            &paths.version_file("both"),
            r#"{
                "id": "both",
                "type": "release",
                "mainClass": "net.minecraft.client.main.Main",
                "assetIndex": {"id": "5", "url": "https://piston-meta.mojang.com/5.json", "sha1": "aa"},
                "minecraftArguments": "--username ${auth_player_name}",
                "arguments": {"game": ["--demo"], "jvm": ["-cp", "${classpath}"]},
                "libraries": [{"name": "com.mojang:brigadier:1.1.8"}]
            }"#,
        );
        let platform = linux();
        let spec = VersionResolver::new(&paths, &platform)
            .resolve("both")
            .await
            .unwrap();

        match &spec.arguments {
            LaunchArguments::Modern { game, .. } => assert_eq!(game, &vec!["--demo".to_string()]),
            other => panic!("unexpected form {other:?}"),
        }
    }

    #[tokio::test]
    async fn circular_chain_fails() {
        let paths = GamePaths::new(temp_dir("resolve-cycle"));
        write_file(&paths.version_file("a"), r#"{"id": "a", "inheritsFrom": "b"}"#);
        write_file(&paths.version_file("b"), r#"{"id": "b", "inheritsFrom": "a"}"#);
        let platform = linux();
        let resolver = VersionResolver::new(&paths, &platform);

        let err = resolver.resolve("a").await.unwrap_err();
        assert!(err.to_string().contains("Circular inheritance"));

        let downloader = Downloader::new(Http::new(Arc::new(MockTransport::new())));
        let err = resolver
            .ensure_cached(&VersionManifest::default(), &downloader, "a")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Circular inheritance"));
    }

    #[tokio::test]
    async fn ensure_cached_downloads_the_missing_parent() {
        let paths = GamePaths::new(temp_dir("resolve-ensure"));
        write_file(&paths.version_file("child"), r#"{"id": "child", "inheritsFrom": "1.20.1"}"#);
        let url = "https://piston-meta.mojang.com/v1/packages/x/1.20.1.json";
        let manifest: VersionManifest = serde_json::from_str(&format!(
            r#"{{"versions": [{{"id": "1.20.1", "type": "release", "url": "{url}", "sha1": "{}"}}]}}"#,
            sha1_hex(VANILLA.as_bytes())
        ))
        .unwrap();
        let transport = Arc::new(MockTransport::new().reply(Method::Get, url, 200, VANILLA));
        let downloader = Downloader::new(Http::new(transport.clone()));
        let platform = linux();
        let resolver = VersionResolver::new(&paths, &platform);

        resolver.ensure_cached(&manifest, &downloader, "child").await.unwrap();
        resolver.ensure_cached(&manifest, &downloader, "child").await.unwrap();

        assert!(paths.version_file("1.20.1").exists());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn missing_required_fields_are_rejected() {
        let paths = GamePaths::new(temp_dir("resolve-missing"));
        write_file(
            &paths.version_file("bare"),
            r#"{"id": "bare", "type": "release", "assetIndex": {"id": "1", "url": "u"}, "minecraftArguments": "x", "libraries": []}"#,
        );
        let platform = linux();
        let err = VersionResolver::new(&paths, &platform)
            .resolve("bare")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "The version file didn't provide the main class.");

        let err = VersionResolver::new(&paths, &platform)
            .resolve("nothing")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing file \"nothing.json\".");
    }

    #[tokio::test]
    async fn newer_launcher_version_is_rejected() {
        let paths = GamePaths::new(temp_dir("resolve-level"));
        write_file(&paths.version_file("future"), r#"{"minimumLauncherVersion": 99}"#);
        let platform = linux();
        let err = VersionResolver::new(&paths, &platform)
            .resolve("future")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Required launcher version too high (99).");
    }

    #[tokio::test]
    async fn legacy_natives_and_templates() {
        let paths = GamePaths::new(temp_dir("resolve-legacy"));
        write_file(
            &paths.version_file("1.7.10"),
            r#"{
                "id": "1.7.10", "type": "release",
                "mainClass": "net.minecraft.client.main.Main",
                "assetIndex": {"id": "1.7.10", "url": "https://x/1.7.10.json"},
                "minecraftArguments": "--username ${auth_player_name} --session ${auth_session}",
                "libraries": [
                    {"name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.1",
                     "natives": {"linux": "natives-linux", "windows": "natives-windows-${arch}"},
                     "extract": {"exclude": ["META-INF/"]},
                     "downloads": {"classifiers": {
                        "natives-linux": {"path": "org/lwjgl/lwjgl/lwjgl-platform/2.9.1/lwjgl-platform-2.9.1-natives-linux.jar", "sha1": "n1", "url": "https://libraries.minecraft.net/n.jar"},
                        "natives-windows-32": {"path": "w32.jar", "url": "https://x/w32.jar"}
                     }}},
                    {"name": "net.sf.jopt-simple:jopt-simple:4.5"}
                ]
            }"#,
        );

        let linux = linux();
        let spec = VersionResolver::new(&paths, &linux).resolve("1.7.10").await.unwrap();
        assert_eq!(spec.arguments.form(), ArgumentForm::Legacy);
        let natives = &spec.libraries[0];
        assert!(natives.primary.is_none());
        assert_eq!(natives.native.as_ref().unwrap().sha1.as_deref(), Some("n1"));
        assert_eq!(natives.exclude, vec!["META-INF/".to_string()]);
        assert_eq!(
            spec.libraries[1].primary.as_ref().unwrap().url,
            "https://libraries.minecraft.net/net/sf/jopt-simple/jopt-simple/4.5/jopt-simple-4.5.jar"
        );

        let templates = spec.launch_templates(&paths, &linux).unwrap();
        assert!(templates.jvm.starts_with("-Djava.library.path=${natives_directory}"));
        assert!(templates.jvm.ends_with("-cp ${classpath}"));
        assert_eq!(
            templates.game,
            "--username ${auth_player_name} --session ${auth_session}"
        );

        let win32 = Platform::new(OsKind::Windows, ArchKind::X86, "10.0");
        let spec = VersionResolver::new(&paths, &win32).resolve("1.7.10").await.unwrap();
        assert_eq!(spec.libraries[0].native.as_ref().unwrap().path, "w32.jar");
        let templates = spec.launch_templates(&paths, &win32).unwrap();
        assert!(templates.jvm.starts_with("-XX:HeapDumpPath="));
        assert!(templates.jvm.contains(" -Xss1M "));
    }

    #[tokio::test]
    async fn modern_templates_quote_spaced_elements_and_append_logging() {
        let paths = setup("resolve-templates");
        let platform = linux();
        let spec = VersionResolver::new(&paths, &platform).resolve("1.20.1").await.unwrap();
        let templates = spec.launch_templates(&paths, &platform).unwrap();
        assert_eq!(
            templates.jvm,
            format!(
                "-Djava.library.path=${{natives_directory}} -cp ${{classpath}} -Dlog4j.configurationFile={}",
                quote_if_spaced(&path_str(&paths.log_config()))
            )
        );

        let fabric = VersionResolver::new(&paths, &platform)
            .resolve("fabric-loader-0.15.0-1.20.1")
            .await
            .unwrap();
        let templates = fabric.launch_templates(&paths, &platform).unwrap();
        assert!(templates
            .jvm
            .ends_with("\"-DFabricMcEmu= net.minecraft.client.main.Main \""));
    }
}

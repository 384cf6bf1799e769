// ─── Launch Argument Builder ───
// Expands `${name}` placeholders in JVM and game argument templates.
// Text around placeholders is copied untouched.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;

use crate::core::assets::AssetLayout;
use crate::core::auth::LoginIdentity;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::{path_str, quote_if_spaced, GamePaths};
use crate::core::platform::Platform;
use crate::core::version::GameSpecification;

/// Name this launcher reports to the game.
pub const LAUNCHER_NAME: &str = "ironlaunch";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(.*?)\}").expect("Invalid regex"));

/// Everything a placeholder may read. `spec` is absent in free-form
/// `launch_args` mode and `assets` when no asset index is configured.
pub struct ArgumentContext<'a> {
    pub paths: &'a GamePaths,
    pub platform: &'a Platform,
    pub identity: &'a LoginIdentity,
    pub client_id: &'a str,
    pub spec: Option<&'a GameSpecification>,
    pub assets: Option<&'a AssetLayout>,
    /// Only set when at least one library ships natives.
    pub natives_dir: Option<&'a Path>,
}

enum Value {
    /// Quoted as a whole when it contains whitespace.
    Plain(String),
    /// Already quoted piecewise.
    Quoted(String),
}

pub struct LaunchArgumentBuilder<'a> {
    ctx: ArgumentContext<'a>,
}

impl<'a> LaunchArgumentBuilder<'a> {
    pub fn new(ctx: ArgumentContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn expand(&self, template: &str) -> LauncherResult<String> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;

        for caps in PLACEHOLDER_REGEX.captures_iter(template) {
            let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&template[last..whole.start()]);
            last = whole.end();

            match self.value(key.as_str())? {
                Value::Quoted(value) => out.push_str(&value),
                Value::Plain(value) if value.is_empty() => out.push_str("\"\""),
                Value::Plain(value) if value.chars().any(char::is_whitespace) => {
                    out.push('"');
                    out.push_str(&value);
                    out.push('"');
                }
                Value::Plain(value) => out.push_str(&value),
            }
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    fn spec(&self, key: &str) -> LauncherResult<&'a GameSpecification> {
        self.ctx.spec.ok_or_else(|| {
            LauncherError::Launch(format!("${{{key}}} can only be used with launch_version."))
        })
    }

    fn assets(&self, key: &str) -> LauncherResult<&'a AssetLayout> {
        self.ctx.assets.ok_or_else(|| {
            LauncherError::Launch(format!(
                "Referencing ${{{key}}} but neither assets nor launch_version have been set."
            ))
        })
    }

    fn classpath(&self, spec: &GameSpecification) -> String {
        let separator = self.ctx.platform.path_separator().to_string();
        spec.classpath_entries(self.ctx.paths)
            .iter()
            .map(|entry| quote_if_spaced(&path_str(entry)))
            .collect::<Vec<_>>()
            .join(&separator)
    }

    fn value(&self, key: &str) -> LauncherResult<Value> {
        let identity = self.ctx.identity;
        let plain = |s: &str| Ok(Value::Plain(s.to_string()));
        let path = |p: &Path| Ok(Value::Plain(path_str(p)));

        match key {
            "launcher_name" => plain(LAUNCHER_NAME),
            "launcher_version" => plain(LAUNCHER_VERSION),

            "auth_player_name" => plain(&identity.player_name),
            "auth_uuid" => plain(&identity.uuid),
            "auth_access_token" => plain(&identity.access_token),
            "user_type" => plain(&identity.user_type),
            "user_properties" => plain("{}"),
            "auth_session" => Ok(Value::Plain(format!("token:{}", identity.access_token))),
            "auth_xuid" => plain(&identity.xuid),
            "clientid" => Ok(Value::Plain(BASE64.encode(self.ctx.client_id))),

            "classpath_separator" => Ok(Value::Plain(self.ctx.platform.path_separator().to_string())),
            "classpath" => Ok(Value::Quoted(self.classpath(self.spec(key)?))),

            "assets_root" => {
                let assets = self.assets(key)?;
                match (&assets.assets_root, assets.legacy) {
                    (Some(root), false) => path(root),
                    _ => Err(LauncherError::Launch(
                        "Referencing ${assets_root} but assets are legacy.".into(),
                    )),
                }
            }
            "assets_index_name" => plain(&self.assets(key)?.index_id),
            "game_assets" => {
                let assets = self.assets(key)?;
                if !assets.legacy {
                    return Err(LauncherError::Launch(
                        "Referencing ${game_assets} but assets aren't legacy.".into(),
                    ));
                }
                if assets.map_to_resources {
                    // Old clients only read `resources/` when this directory is missing.
                    return path(&self.ctx.paths.data_dir.join("this_does_not_exist"));
                }
                path(&assets.legacy_dir)
            }

            "version_name" => plain(&self.spec(key)?.id),
            "version_type" => plain(&self.spec(key)?.game_type),

            "game_directory" => path(&self.ctx.paths.game_dir),
            "natives_directory" => {
                self.spec(key)?;
                match self.ctx.natives_dir {
                    Some(dir) => path(dir),
                    None => plain("."),
                }
            }
            "library_directory" => {
                self.spec(key)?;
                path(&self.ctx.paths.libraries_dir)
            }
            "data_dir" => path(&self.ctx.paths.data_dir),

            // Only present when a custom resolution is enabled, which this
            // launcher never does.
            "resolution_width" | "resolution_height" => Err(LauncherError::Internal(format!(
                "Unexpected placeholder ${{{key}}}."
            ))),

            other => Err(LauncherError::UnknownPlaceholder(other.to_string())),
        }
    }
}

/// Collapse a multi-line `launch_args` template to one line.
pub fn clean_user_args(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `launch_args` VM arguments use `;` as a portable path separator.
pub fn clean_user_vm_args(raw: &str, platform: &Platform) -> String {
    clean_user_args(raw).replace(';', &platform.path_separator().to_string())
}

pub fn natives_dir_if_any(spec: &GameSpecification, paths: &GamePaths) -> Option<PathBuf> {
    spec.libraries
        .iter()
        .any(|lib| lib.native.is_some())
        .then(|| paths.natives_dir(&spec.id))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::core::platform::{ArchKind, OsKind};
    use crate::core::version::{
        ArtifactDescriptor, AssetIndexRef, LaunchArguments, LibraryRequirement,
    };

    fn identity() -> LoginIdentity {
        LoginIdentity {
            player_name: "Steve".into(),
            uuid: "069a79f444e94726a5befca90e38aaf5".into(),
            access_token: "mc-token".into(),
            user_type: "msa".into(),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            xuid: String::new(),
            gamer_tag: "Steve".into(),
        }
    }

    fn library(artifact: &str) -> LibraryRequirement {
        LibraryRequirement {
            group: "org.example".into(),
            artifact: artifact.into(),
            version: "1.0".into(),
            primary: Some(ArtifactDescriptor {
                path: format!("org/example/{artifact}/1.0/{artifact}-1.0.jar"),
                sha1: None,
                url: String::new(),
            }),
            native: None,
            exclude: Vec::new(),
        }
    }

    fn spec() -> GameSpecification {
        GameSpecification {
            id: "1.20.1".into(),
            game_type: "release".into(),
            main_class: "net.minecraft.client.main.Main".into(),
            java_major: Some(17),
            asset_index: AssetIndexRef {
                id: "5".into(),
                url: String::new(),
                sha1: None,
            },
            libraries: vec![library("alpha"), library("beta")],
            client_download: None,
            arguments: LaunchArguments::Modern {
                jvm: Vec::new(),
                game: Vec::new(),
            },
            logging: None,
        }
    }

    fn layout(legacy: bool, map_to_resources: bool) -> AssetLayout {
        AssetLayout {
            index_id: "pre-1.6".into(),
            assets_root: (!legacy).then(|| PathBuf::from("/g/data/assets")),
            legacy_dir: PathBuf::from("/g/data/assets/virtual/pre-1.6"),
            legacy,
            map_to_resources,
        }
    }

    fn expand(
        paths: &GamePaths,
        spec: Option<&GameSpecification>,
        assets: Option<&AssetLayout>,
        template: &str,
    ) -> LauncherResult<String> {
        let platform = Platform::new(OsKind::Linux, ArchKind::X64, "6.1.0");
        let identity = identity();
        LaunchArgumentBuilder::new(ArgumentContext {
            paths,
            platform: &platform,
            identity: &identity,
            client_id: "abc",
            spec,
            assets,
            natives_dir: None,
        })
        .expand(template)
    }

    #[test]
    fn spaced_classpath_entries_are_quoted_and_joined() {
        let paths = GamePaths::new("/home/me/My Games");
        let spec = spec();
        let out = expand(&paths, Some(&spec), None, "-cp ${classpath} Main").unwrap();
        assert_eq!(
            out,
            "-cp \"/home/me/My Games/data/libraries/org/example/alpha/1.0/alpha-1.0.jar\":\
             \"/home/me/My Games/data/libraries/org/example/beta/1.0/beta-1.0.jar\":\
             \"/home/me/My Games/data/versions/1.20.1/1.20.1.jar\" Main"
        );
    }

    #[test]
    fn unknown_placeholder_is_named() {
        let paths = GamePaths::new("/g");
        let err = expand(&paths, None, None, "--x ${bogus}").unwrap_err();
        assert!(matches!(&err, LauncherError::UnknownPlaceholder(key) if key == "bogus"));
    }

    #[test]
    fn literal_text_and_empty_values_are_kept() {
        let paths = GamePaths::new("/g");
        let out = expand(
            &paths,
            None,
            None,
            "--username ${auth_player_name} --xuid ${auth_xuid}  --session ${auth_session}$",
        )
        .unwrap();
        assert_eq!(out, "--username Steve --xuid \"\"  --session token:mc-token$");

        let out = expand(&paths, None, None, "${clientid}|${user_properties}").unwrap();
        assert_eq!(out, "YWJj|{}");
    }

    #[test]
    fn version_placeholders_need_a_version() {
        let paths = GamePaths::new("/g");
        let err = expand(&paths, None, None, "-Djava.library.path=${natives_directory}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "${natives_directory} can only be used with launch_version."
        );

        let spec = spec();
        let out = expand(&paths, Some(&spec), None, "${natives_directory} ${version_type}").unwrap();
        assert_eq!(out, ". release");
    }

    #[test]
    fn asset_placeholders_follow_the_layout() {
        let paths = GamePaths::new("/g");
        let err = expand(&paths, None, None, "${assets_root}").unwrap_err();
        assert!(err.to_string().contains("neither assets nor launch_version"));

        let modern = layout(false, false);
        assert_eq!(
            expand(&paths, None, Some(&modern), "${assets_root} ${assets_index_name}").unwrap(),
            "/g/data/assets pre-1.6"
        );
        assert!(expand(&paths, None, Some(&modern), "${game_assets}").is_err());

        let legacy = layout(true, false);
        assert_eq!(
            expand(&paths, None, Some(&legacy), "${game_assets}").unwrap(),
            "/g/data/assets/virtual/pre-1.6"
        );
        assert!(expand(&paths, None, Some(&legacy), "${assets_root}").is_err());

        let resources = layout(true, true);
        assert_eq!(
            expand(&paths, None, Some(&resources), "${game_assets}").unwrap(),
            "/g/data/this_does_not_exist"
        );
    }

    #[test]
    fn resolution_placeholders_are_internal_errors() {
        let paths = GamePaths::new("/g");
        let err = expand(&paths, None, None, "${resolution_width}").unwrap_err();
        assert_eq!(err.stage_title(), "Internal error");
    }

    #[test]
    fn user_args_are_flattened() {
        let platform = Platform::new(OsKind::Windows, ArchKind::X64, "10.0");
        assert_eq!(
            clean_user_vm_args("  -Xmx1G\n\n  -cp a.jar;b.jar \r\n", &platform),
            "-Xmx1G -cp a.jar;b.jar"
        );
        let linux = Platform::new(OsKind::Linux, ArchKind::X64, "6.1.0");
        assert_eq!(clean_user_vm_args("-cp a.jar;b.jar", &linux), "-cp a.jar:b.jar");
    }
}

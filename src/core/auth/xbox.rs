// ─── Xbox / Minecraft Exchange ───
// Account token → Xbox Live → XSTS (Xbox) → XSTS (game services) →
// game access token → profile. Strictly sequential; every hop maps its
// HTTP failures to its own message.

use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::LoginIdentity;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::Http;

pub const XBL_AUTHENTICATE_URL: &str = "https://user.auth.xboxlive.com/user/authenticate";
pub const XSTS_AUTHORIZE_URL: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
pub const MINECRAFT_LOGIN_URL: &str =
    "https://api.minecraftservices.com/authentication/login_with_xbox";
pub const MINECRAFT_PROFILE_URL: &str = "https://api.minecraftservices.com/minecraft/profile";

const XBOX_RELYING_PARTY: &str = "http://xboxlive.com";
const GAME_RELYING_PARTY: &str = "rp://api.minecraftservices.com/";
const CONTRACT_HEADER: (&str, &str) = ("x-xbl-contract-version", "1");

#[derive(Debug, Deserialize)]
struct XboxResponse {
    #[serde(rename = "Token")]
    token: String,
    #[serde(rename = "DisplayClaims")]
    display_claims: XboxDisplayClaims,
}

#[derive(Debug, Deserialize)]
struct XboxDisplayClaims {
    xui: Vec<XboxUserClaim>,
}

/// `xid` and `gtg` are only sent for the Xbox relying party.
#[derive(Debug, Default, Clone, Deserialize)]
struct XboxUserClaim {
    #[serde(default)]
    uhs: String,
    #[serde(default)]
    xid: Option<String>,
    #[serde(default)]
    gtg: Option<String>,
}

impl XboxResponse {
    fn claim(&self) -> XboxUserClaim {
        self.display_claims.xui.first().cloned().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct MinecraftAuthResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct MinecraftProfile {
    id: String,
    name: String,
}

/// HTTP status of a failed hop, or the error itself when it isn't one.
fn hop_status(error: LauncherError) -> Result<u16, LauncherError> {
    match error {
        LauncherError::HttpStatus { status, .. } => Ok(status),
        LauncherError::Json(e) => Err(LauncherError::Login(format!(
            "Unexpected response from the login servers: {e}"
        ))),
        other => Err(other),
    }
}

async fn authorize_xsts(
    http: &Http,
    xbl_token: &str,
    relying_party: &str,
    headers: &[(&str, &str)],
) -> LauncherResult<XboxResponse> {
    let body = json!({
        "Properties": {
            "SandboxId": "RETAIL",
            "UserTokens": [xbl_token],
        },
        "RelyingParty": relying_party,
        "TokenType": "JWT",
    });
    match http.post_json(XSTS_AUTHORIZE_URL, &body, headers).await {
        Ok(response) => Ok(response),
        Err(e) => match hop_status(e)? {
            // The account never signed up for Xbox Live.
            401 => Err(LauncherError::Login("Login to Xbox Live failed.".into())),
            status => Err(LauncherError::Login(format!("Xbox STS error ({status})"))),
        },
    }
}

/// Run the whole exchange for an account access token.
pub async fn sign_in(http: &Http, account_token: &str) -> LauncherResult<LoginIdentity> {
    let xbl_body = json!({
        "Properties": {
            "AuthMethod": "RPS",
            "SiteName": "user.auth.xboxlive.com",
            "RpsTicket": format!("d={account_token}"),
        },
        "RelyingParty": "http://auth.xboxlive.com",
        "TokenType": "JWT",
    });
    let xbl: XboxResponse = match http
        .post_json(XBL_AUTHENTICATE_URL, &xbl_body, &[CONTRACT_HEADER])
        .await
    {
        Ok(response) => response,
        Err(e) => {
            let status = hop_status(e)?;
            return Err(LauncherError::Login(format!("Xbox Live login error ({status})")));
        }
    };
    debug!("Xbox Live token acquired");

    let xsts_xbox = authorize_xsts(http, &xbl.token, XBOX_RELYING_PARTY, &[CONTRACT_HEADER]).await?;
    let xsts_game = authorize_xsts(http, &xbl.token, GAME_RELYING_PARTY, &[]).await?;

    let login_body = json!({
        "identityToken": format!("XBL3.0 x={};{}", xsts_game.claim().uhs, xsts_game.token),
    });
    let game: MinecraftAuthResponse = match http.post_json(MINECRAFT_LOGIN_URL, &login_body, &[]).await {
        Ok(response) => response,
        Err(e) => {
            let status = hop_status(e)?;
            return Err(LauncherError::Login(format!(
                "MinecraftServices login error ({status})"
            )));
        }
    };

    let bearer = format!("Bearer {}", game.access_token);
    let profile: MinecraftProfile = match http
        .get_json(MINECRAFT_PROFILE_URL, &[("Authorization", bearer.as_str())])
        .await
    {
        Ok(profile) => profile,
        Err(e) => match hop_status(e)? {
            404 => return Err(LauncherError::Login("You don't own the game.".into())),
            status => {
                return Err(LauncherError::Login(format!(
                    "MinecraftServices login error ({status})"
                )))
            }
        },
    };

    let claim = xsts_xbox.claim();
    info!("Signed in as {}", profile.name);
    Ok(LoginIdentity {
        player_name: profile.name,
        uuid: profile.id,
        access_token: game.access_token,
        user_type: "msa".into(),
        expires_at: Utc::now() + Duration::seconds(game.expires_in),
        xuid: claim.xid.unwrap_or_default(),
        gamer_tag: claim.gtg.unwrap_or_default(),
    })
}

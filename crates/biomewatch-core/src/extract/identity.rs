//! Player name resolution from the head of a client log.

use super::patterns::{RE_DISPLAY_NAME, RE_PLAYER_JOINED, RE_PLAYERS_REF, RE_USERNAME_FALLBACK};

/// Engine object names that look like player names in log text.
const DENYLIST: &[&str] = &[
    "PlayerScripts",
    "PlayerGui",
    "PlayerModule",
    "Players",
    "LocalPlayer",
    "HumanoidRootPart",
    "Humanoid",
    "Character",
    "LocalScript",
    "Workspace",
    "Camera",
    "Sound",
    "Animation",
    "Animator",
    "Backpack",
    "StarterGui",
    "ReplicatedStorage",
    "ReplicatedFirst",
    "ServerStorage",
    "ServerScriptService",
    "Head",
    "Torso",
    "RightArm",
    "LeftArm",
    "RightLeg",
    "LeftLeg",
    "http",
    "https",
    "www",
    "com",
    "org",
    "net",
    "roblox",
    "html",
    "json",
    "CaptureStorage",
    "Capture",
    "Storage",
    "RobloxStorage",
    "LocalStorage",
    "SoundService",
    "TeleportService",
    "RunService",
    "UserInputService",
    "ContentProvider",
    "CoreGui",
    "CorePackages",
    "Packages",
    "JoinScript",
    "DataStoreService",
    "MarketplaceService",
    "PolicyService",
    "MemStorageService",
    "HttpService",
    "Stats",
    "Plugin",
    "Selection",
    "DataModel",
    "RenderStepped",
    "ScriptContext",
    "LogService",
    "NetworkClient",
    "NetworkServer",
    "Visit",
];

const SERVICE_SUFFIXES: &[&str] = &[
    "Service", "Storage", "Script", "Module", "Client", "Server", "Provider", "Gui",
];

/// Fallback patterns only reject the first four suffixes.
const FALLBACK_SUFFIXES: &[&str] = &["Service", "Storage", "Script", "Module"];

fn is_denied(name: &str) -> bool {
    DENYLIST.iter().any(|d| d.eq_ignore_ascii_case(name))
}

fn is_numeric(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_digit())
}

fn has_suffix(name: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| name.ends_with(s))
}

/// Find the player name in log content.
///
/// Sources in priority order:
/// 1. a structured `"displayName"` field
/// 2. a "Player X joined/added/entered" line
/// 3. a `Players.X` reference that is not an engine object
/// 4. looser fallback patterns, accepting a numeric id only if nothing else matched
pub fn resolve_username(content: &str) -> Option<String> {
    let acceptable = |name: &str| !is_denied(name) && !is_numeric(name);

    if let Some(caps) = RE_DISPLAY_NAME.captures(content)
        && acceptable(&caps[1])
    {
        return Some(caps[1].to_string());
    }

    if let Some(caps) = RE_PLAYER_JOINED.captures(content)
        && acceptable(&caps[1])
    {
        return Some(caps[1].to_string());
    }

    let namespaced = RE_PLAYERS_REF
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|name| acceptable(name) && !has_suffix(name, SERVICE_SUFFIXES));
    if let Some(name) = namespaced {
        return Some(name.to_string());
    }

    let mut numeric: Option<&str> = None;
    for pattern in RE_USERNAME_FALLBACK.iter() {
        for caps in pattern.captures_iter(content) {
            let Some(m) = caps.get(1) else { continue };
            let name = m.as_str();
            if is_denied(name) || has_suffix(name, FALLBACK_SUFFIXES) {
                continue;
            }
            if !is_numeric(name) {
                return Some(name.to_string());
            }
            numeric.get_or_insert(name);
        }
    }

    numeric.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_field_wins() {
        let content = r#"Player Other joined
{"userId":1,"displayName": "StarGazer_7"}"#;
        assert_eq!(resolve_username(content).as_deref(), Some("StarGazer_7"));
    }

    #[test]
    fn test_joined_phrase() {
        let content = "info: player Wanderer99 entered the game";
        assert_eq!(resolve_username(content).as_deref(), Some("Wanderer99"));
    }

    #[test]
    fn test_namespaced_skips_engine_objects() {
        let content = "Players.PlayerGui.Frame Players.TeleportService. Players.ChatClient \
                       Players.12345 Players.RealPerson.Character";
        assert_eq!(resolve_username(content).as_deref(), Some("RealPerson"));
    }

    #[test]
    fn test_denied_display_name_falls_through() {
        let content = r#"{"displayName":"Workspace"} user: Explorer"#;
        assert_eq!(resolve_username(content).as_deref(), Some("Explorer"));
    }

    #[test]
    fn test_numeric_only_as_last_resort() {
        assert_eq!(resolve_username("user: 123456").as_deref(), Some("123456"));
        assert_eq!(
            resolve_username(r#"user: 123456 "name":"Nomad""#).as_deref(),
            Some("Nomad")
        );
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(resolve_username("no identity here"), None);
    }
}

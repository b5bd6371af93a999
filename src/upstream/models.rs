use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Week type the league hub reports while the league sits between seasons.
pub const OFFSEASON_WEEK_TYPE: u8 = 8;

/// Week type the league hub reports during the preseason.
pub const PRESEASON_WEEK_TYPE: u8 = 0;

/// Console a league lives on. Each maps to its own upstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Xone,
    Ps4,
    Pc,
    Ps5,
    Xbsx,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Xone => "xone",
            Platform::Ps4 => "ps4",
            Platform::Pc => "pc",
            Platform::Ps5 => "ps5",
            Platform::Xbsx => "xbsx",
        }
    }

    /// Value of the `X-BLAZE-ID` header for this console
    pub fn blaze_service(&self) -> &'static str {
        match self {
            Platform::Xone => "madden-2025-xone",
            Platform::Ps4 => "madden-2025-ps4",
            Platform::Pc => "madden-2025-pc",
            Platform::Ps5 => "madden-2025-ps5-gen5",
            Platform::Xbsx => "madden-2025-xbsx-gen5",
        }
    }

    /// Product name sent with the login call
    pub fn product_name(&self) -> &'static str {
        match self {
            Platform::Xone => "madden-2025-xone-mca",
            Platform::Ps4 => "madden-2025-ps4-mca",
            Platform::Pc => "madden-2025-pc-mca",
            Platform::Ps5 => "madden-2025-ps5-mca",
            Platform::Xbsx => "madden-2025-xbsx-mca",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xone" => Ok(Platform::Xone),
            "ps4" => Ok(Platform::Ps4),
            "pc" => Ok(Platform::Pc),
            "ps5" => Ok(Platform::Ps5),
            "xbsx" => Ok(Platform::Xbsx),
            other => Err(AppError::config_error(format!(
                "Unknown platform '{other}' (expected xone, ps4, pc, ps5 or xbsx)"
            ))),
        }
    }
}

/// OAuth token pair for one connected league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
    pub platform: Platform,
    pub account_id: String,
}

/// Opaque upstream session. The request counter is owned by the caller and
/// carries over a re-login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account_numeric_id: i64,
    pub session_key: String,
    pub request_counter: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_login_info: UserLoginInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginInfo {
    pub session_key: String,
    pub persona_details: PersonaDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaDetails {
    pub persona_id: i64,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Response of the "my leagues" command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeagueList {
    #[serde(default)]
    pub leagues: Vec<LeagueSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueSummary {
    pub league_id: u64,
    #[serde(default)]
    pub league_name: String,
    #[serde(default)]
    pub user_team_name: Option<String>,
    #[serde(default)]
    pub num_members: Option<u32>,
}

/// Response of the league hub command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueHub {
    pub career_hub_info: CareerHubInfo,
    #[serde(default)]
    pub team_id_info_list: Vec<TeamIdInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerHubInfo {
    pub season_info: SeasonInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonInfo {
    pub season_week: u8,
    pub season_week_type: u8,
    #[serde(default)]
    pub calendar_year: Option<u16>,
}

impl SeasonInfo {
    pub fn is_preseason(&self) -> bool {
        self.season_week_type == PRESEASON_WEEK_TYPE
    }

    pub fn is_between_seasons(&self) -> bool {
        self.season_week_type == OFFSEASON_WEEK_TYPE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamIdInfo {
    pub team_id: u64,
    #[serde(default)]
    pub team_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_round_trip_names() {
        for platform in [
            Platform::Xone,
            Platform::Ps4,
            Platform::Pc,
            Platform::Ps5,
            Platform::Xbsx,
        ] {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
        assert!("switch".parse::<Platform>().is_err());
        assert_eq!("PS5".parse::<Platform>().unwrap(), Platform::Ps5);
    }

    #[test]
    fn test_league_hub_parses_season_info() {
        let hub: LeagueHub = serde_json::from_value(json!({
            "careerHubInfo": {
                "seasonInfo": { "seasonWeek": 5, "seasonWeekType": 1, "calendarYear": 2025 }
            },
            "teamIdInfoList": [
                { "teamId": 774242304, "teamName": "Bears" },
                { "teamId": 774242305 }
            ],
            "somethingElse": true
        }))
        .unwrap();
        assert_eq!(hub.career_hub_info.season_info.season_week, 5);
        assert!(!hub.career_hub_info.season_info.is_preseason());
        assert!(!hub.career_hub_info.season_info.is_between_seasons());
        assert_eq!(hub.team_id_info_list.len(), 2);
        assert_eq!(hub.team_id_info_list[1].team_name, None);
    }

    #[test]
    fn test_login_response_parses() {
        let login: LoginResponse = serde_json::from_value(json!({
            "userLoginInfo": {
                "sessionKey": "key-1",
                "personaDetails": { "personaId": 1003456789, "displayName": "coach" }
            }
        }))
        .unwrap();
        assert_eq!(login.user_login_info.session_key, "key-1");
        assert_eq!(login.user_login_info.persona_details.persona_id, 1003456789);
    }
}

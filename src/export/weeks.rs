//! Week addressing: the fixed season layout, the current week derived from the
//! league hub and the window around it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::export::{PRESEASON_MAX_INDEX, RESERVED_SEASON_INDEX, SEASON_MAX_INDEX};
use crate::error::AppError;
use crate::upstream::models::SeasonInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Preseason,
    Season,
}

impl Stage {
    /// Stage index expected by the bulk export endpoints
    pub fn stage_index(&self) -> u8 {
        match self {
            Stage::Preseason => 0,
            Stage::Season => 1,
        }
    }

    pub fn max_index(&self) -> u8 {
        match self {
            Stage::Preseason => PRESEASON_MAX_INDEX,
            Stage::Season => SEASON_MAX_INDEX,
        }
    }

    /// Path segment used by export destinations
    pub fn path_segment(&self) -> &'static str {
        match self {
            Stage::Preseason => "pre",
            Stage::Season => "reg",
        }
    }

    fn is_addressable(&self, week_index: u8) -> bool {
        week_index <= self.max_index()
            && !(*self == Stage::Season && week_index == RESERVED_SEASON_INDEX)
    }
}

/// One addressable week. `week_index` is zero based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekSelector {
    pub stage: Stage,
    pub week_index: u8,
}

impl WeekSelector {
    pub fn new(stage: Stage, week_index: u8) -> Result<Self, AppError> {
        if !stage.is_addressable(week_index) {
            return Err(AppError::InvalidWeek(format!(
                "{}:{} is outside the season layout",
                stage.path_segment(),
                u16::from(week_index) + 1
            )));
        }
        Ok(Self { stage, week_index })
    }

    pub fn preseason(week_index: u8) -> Result<Self, AppError> {
        Self::new(Stage::Preseason, week_index)
    }

    pub fn season(week_index: u8) -> Result<Self, AppError> {
        Self::new(Stage::Season, week_index)
    }

    /// One-based week number as shown to people and used in export paths
    pub fn week_number(&self) -> u16 {
        u16::from(self.week_index) + 1
    }
}

impl fmt::Display for WeekSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.stage.path_segment(), self.week_number())
    }
}

/// Parses `pre:N` or `reg:N` with a one-based week number.
impl FromStr for WeekSelector {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stage, number) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| AppError::InvalidWeek(format!("'{s}' is not stage:week")))?;
        let stage = match stage.to_ascii_lowercase().as_str() {
            "pre" | "preseason" => Stage::Preseason,
            "reg" | "season" => Stage::Season,
            other => return Err(AppError::InvalidWeek(format!("unknown stage '{other}'"))),
        };
        let number: u8 = number
            .parse()
            .map_err(|_| AppError::InvalidWeek(format!("'{number}' is not a week number")))?;
        if number == 0 {
            return Err(AppError::InvalidWeek("week numbers start at 1".to_string()));
        }
        WeekSelector::new(stage, number - 1)
    }
}

/// Every addressable week: 4 preseason weeks then 22 season weeks.
pub fn all_weeks() -> Vec<WeekSelector> {
    let preseason = (0..=PRESEASON_MAX_INDEX).map(|week_index| WeekSelector {
        stage: Stage::Preseason,
        week_index,
    });
    let season = (0..=SEASON_MAX_INDEX)
        .filter(|index| *index != RESERVED_SEASON_INDEX)
        .map(|week_index| WeekSelector {
            stage: Stage::Season,
            week_index,
        });
    preseason.chain(season).collect()
}

/// The week the league hub reports. A league between seasons is treated as
/// sitting on the final playoff week, and the reserved season slot reads as
/// the week after it.
pub fn current_week(info: &SeasonInfo) -> WeekSelector {
    if info.is_between_seasons() {
        return WeekSelector {
            stage: Stage::Season,
            week_index: SEASON_MAX_INDEX,
        };
    }
    let stage = if info.is_preseason() {
        Stage::Preseason
    } else {
        Stage::Season
    };
    let mut week_index = info.season_week.min(stage.max_index());
    if stage == Stage::Season && week_index == RESERVED_SEASON_INDEX {
        week_index = RESERVED_SEASON_INDEX + 1;
    }
    WeekSelector { stage, week_index }
}

/// Previous, current and next week inside the current stage, stepping over
/// the reserved season slot and clipped to the stage bounds.
pub fn surrounding_weeks(info: &SeasonInfo) -> Vec<WeekSelector> {
    let current = current_week(info);
    let stage = current.stage;
    let index = i32::from(current.week_index);
    let reserved = i32::from(RESERVED_SEASON_INDEX);

    let mut previous = index - 1;
    let mut next = index + 1;
    if stage == Stage::Season {
        if previous == reserved {
            previous = reserved - 1;
        }
        if next == reserved {
            next = reserved + 1;
        }
    }

    let mut weeks: Vec<WeekSelector> = Vec::with_capacity(3);
    for candidate in [previous, index, next] {
        let Ok(week_index) = u8::try_from(candidate) else {
            continue;
        };
        if !stage.is_addressable(week_index) {
            continue;
        }
        let week = WeekSelector { stage, week_index };
        if !weeks.contains(&week) {
            weeks.push(week);
        }
    }
    weeks
}

use chrono::{Datelike, NaiveDate};

use crate::models::{Borough, Season, TravelSeason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidBoroughs(pub Vec<String>);

/// Turns a comma separated borough list into dataset labels.
///
/// `all` (or an empty answer) means no filter. Unknown names are returned as
/// an error so callers can re-prompt instead of silently widening the search.
pub fn parse_borough_list(raw: &str) -> Result<Vec<Borough>, InvalidBoroughs> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(Vec::new());
    }

    let parts = trimmed
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>();

    let invalid = parts
        .iter()
        .filter(|part| Borough::parse(part).is_none())
        .map(|part| part.to_string())
        .collect::<Vec<_>>();
    if !invalid.is_empty() {
        return Err(InvalidBoroughs(invalid));
    }

    Ok(normalize_boroughs(parts))
}

/// Maps raw names to boroughs, dropping unknown names and repeats while
/// keeping first-seen order.
pub fn normalize_boroughs<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<Borough> {
    let mut ordered = Vec::new();
    for borough in raw.into_iter().filter_map(Borough::parse) {
        if !ordered.contains(&borough) {
            ordered.push(borough);
        }
    }
    ordered
}

pub fn parse_season(raw: &str) -> Option<TravelSeason> {
    let key = raw.trim().to_lowercase().replace(['.', ' '], "");
    if key.is_empty() {
        return None;
    }

    let season = match key.as_str() {
        "winter" => Some(Season::Winter),
        "spring" => Some(Season::Spring),
        "summer" => Some(Season::Summer),
        "fall" | "autumn" => Some(Season::Fall),
        _ => None,
    };
    if let Some(season) = season {
        return Some(TravelSeason {
            month: None,
            season,
        });
    }

    let month = month_number(&key)?;
    Some(season_for_month(month))
}

pub fn season_for_month(month: u32) -> TravelSeason {
    let season = match month {
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        9..=11 => Season::Fall,
        _ => Season::Winter,
    };

    TravelSeason {
        month: MONTHS
            .get(month.saturating_sub(1) as usize)
            .map(|name| name.to_string()),
        season,
    }
}

/// Season of the given date, used when the traveler leaves it blank.
pub fn current_season(today: NaiveDate) -> TravelSeason {
    season_for_month(today.month())
}

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn month_number(key: &str) -> Option<u32> {
    if key == "sept" {
        return Some(9);
    }

    MONTHS
        .iter()
        .position(|name| {
            let lower = name.to_lowercase();
            lower == key || (key.len() == 3 && lower.starts_with(key))
        })
        .map(|idx| idx as u32 + 1)
}

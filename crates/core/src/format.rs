use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Slot, TripPlan};
use crate::prompt::{describe_attraction, describe_hotel, describe_restaurant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItinerarySlot {
    pub slot: Slot,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryDay {
    pub day: u8,
    pub slots: Vec<ItinerarySlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    pub home_base: String,
    pub days: Vec<ItineraryDay>,
    pub packing_list: Vec<String>,
    /// False when the model answer was unusable and the draft is shown as is.
    pub narrated: bool,
}

/// Non-fatal signal that the model answer was replaced by the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatWarning {
    pub reason: String,
}

impl fmt::Display for FormatWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormatWarning: {}", self.reason)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedItinerary {
    pub itinerary: Itinerary,
    pub warning: Option<FormatWarning>,
}

pub fn format_itinerary(response: &str, plan: &TripPlan) -> FormattedItinerary {
    match parse_response(response, plan) {
        Ok(itinerary) => FormattedItinerary {
            itinerary,
            warning: None,
        },
        Err(warning) => FormattedItinerary {
            itinerary: draft_itinerary(plan),
            warning: Some(warning),
        },
    }
}

/// Plain rendering of the draft selections, used when narration fails.
pub fn draft_itinerary(plan: &TripPlan) -> Itinerary {
    let days = plan
        .days
        .iter()
        .map(|day| ItineraryDay {
            day: day.day,
            slots: day
                .slots
                .iter()
                .map(|slot| {
                    let attraction = slot
                        .attraction
                        .as_ref()
                        .map_or_else(|| "Free time".to_string(), describe_attraction);
                    let text = match &slot.restaurant {
                        Some(restaurant) => {
                            format!("{attraction}; eat at {}", describe_restaurant(restaurant))
                        }
                        None => attraction,
                    };
                    ItinerarySlot {
                        slot: slot.slot,
                        text,
                    }
                })
                .collect(),
        })
        .collect();

    Itinerary {
        home_base: describe_hotel(&plan.hotel),
        days,
        packing_list: Vec::new(),
        narrated: false,
    }
}

fn parse_response(response: &str, plan: &TripPlan) -> Result<Itinerary, FormatWarning> {
    let expected_days = plan.days.len();
    if response.trim().is_empty() {
        return Err(warning("model returned an empty response"));
    }

    let mut home_base: Option<String> = None;
    let mut days: BTreeMap<usize, BTreeMap<Slot, String>> = BTreeMap::new();
    let mut current_day: Option<usize> = None;
    let mut packing_list = Vec::new();
    let mut in_packing = false;
    // slot whose label line carried no text; the next plain line fills it
    let mut pending_slot: Option<(usize, Slot)> = None;

    for line in response.lines() {
        let line = strip_decoration(line);
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = HOME_BASE.captures(line) {
            home_base = Some(clean_text(&caps[1]));
            in_packing = false;
            pending_slot = None;
            continue;
        }

        if let Some(caps) = PACKING.captures(line) {
            in_packing = true;
            current_day = None;
            pending_slot = None;
            push_packing_items(&mut packing_list, &caps[1]);
            continue;
        }

        if let Some(caps) = DAY_HEADING.captures(line) {
            let day = caps[1]
                .parse::<usize>()
                .map_err(|_| warning(format!("unreadable day number in '{line}'")))?;
            if day == 0 || day > expected_days {
                return Err(warning(format!(
                    "response describes day {day} but the trip has {expected_days} day(s)"
                )));
            }
            days.entry(day).or_default();
            current_day = Some(day);
            in_packing = false;
            pending_slot = None;
            continue;
        }

        if in_packing {
            push_packing_items(&mut packing_list, line);
            continue;
        }

        if let (Some(day), Some(caps)) = (current_day, SLOT_LINE.captures(line)) {
            let Some(slot) = slot_from_label(&caps[1]) else {
                continue;
            };
            let text = clean_text(&caps[2]);
            if text.is_empty() {
                pending_slot = Some((day, slot));
            } else {
                pending_slot = None;
                days.entry(day)
                    .or_default()
                    .entry(slot)
                    .or_insert(text);
            }
            continue;
        }

        if let Some((day, slot)) = pending_slot.take() {
            let text = clean_text(line);
            if !text.is_empty() {
                days.entry(day)
                    .or_default()
                    .entry(slot)
                    .or_insert(text);
            }
        }
    }

    let mut parsed_days = Vec::with_capacity(expected_days);
    for day in 1..=expected_days {
        let slots = days
            .remove(&day)
            .ok_or_else(|| warning(format!("day {day} is missing from the response")))?;
        let mut ordered = Vec::with_capacity(Slot::ALL.len());
        for slot in Slot::ALL {
            let text = slots.get(&slot).cloned().ok_or_else(|| {
                warning(format!(
                    "day {day} has no {} entry",
                    slot.label().to_lowercase()
                ))
            })?;
            ordered.push(ItinerarySlot { slot, text });
        }
        parsed_days.push(ItineraryDay {
            day: u8::try_from(day).unwrap_or(u8::MAX),
            slots: ordered,
        });
    }

    Ok(Itinerary {
        home_base: home_base.unwrap_or_else(|| describe_hotel(&plan.hotel)),
        days: parsed_days,
        packing_list,
        narrated: true,
    })
}

static HOME_BASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^home\s*base\**\s*[:\-–]\s*(.+)$").expect("valid home base regex"));
static DAY_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^day\s+(\d+)\b").expect("valid day regex"));
static SLOT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(morning|noon|midday|lunch|afternoon|evening|night|dinner)\b\**\s*(?:\([^)]*\))?\s*[:\-–]\s*(.*)$",
    )
    .expect("valid slot regex")
});
static PACKING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^packing\s+list\**\s*:?\s*(.*)$").expect("valid packing regex"));

fn slot_from_label(label: &str) -> Option<Slot> {
    match label.to_lowercase().as_str() {
        "morning" => Some(Slot::Morning),
        "noon" | "midday" | "lunch" | "afternoon" => Some(Slot::Noon),
        "evening" | "night" | "dinner" => Some(Slot::Evening),
        _ => None,
    }
}

/// Drops markdown bullets, headings and emphasis around a line.
fn strip_decoration(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['-', '*', '•', '#', '>'])
        .trim()
        .trim_start_matches("**")
        .trim()
}

fn clean_text(raw: &str) -> String {
    raw.trim().trim_matches('*').trim().to_string()
}

fn push_packing_items(items: &mut Vec<String>, raw: &str) {
    for item in raw.split([',', ';']) {
        let item = item.trim().trim_matches('*').trim();
        if !item.is_empty() {
            items.push(item.to_string());
        }
    }
}

fn warning(reason: impl Into<String>) -> FormatWarning {
    FormatWarning {
        reason: reason.into(),
    }
}

impl fmt::Display for Itinerary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Home Base: {}", self.home_base)?;
        for day in &self.days {
            writeln!(f)?;
            writeln!(f, "Day {}:", day.day)?;
            for slot in &day.slots {
                writeln!(f, "- {}: {}", slot.slot.label(), slot.text)?;
            }
        }
        if !self.packing_list.is_empty() {
            writeln!(f)?;
            writeln!(f, "Packing list:")?;
            for item in &self.packing_list {
                writeln!(f, "- {item}")?;
            }
        }
        Ok(())
    }
}

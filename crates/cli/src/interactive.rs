use std::io::{self, BufRead, Write};

use chrono::Local;
use gotham_core::{
    current_season, parse_borough_list, parse_season, BudgetTier, Pace, TripRequest,
    MAX_TRIP_DAYS, MIN_TRIP_DAYS,
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("input closed before the trip preferences were complete")]
pub struct InputClosed;

pub fn ask_trip_request() -> anyhow::Result<TripRequest> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stderr();
    Ok(collect_trip_request(&mut input, &mut output)?)
}

/// Asks for each preference in turn, re-prompting until the answer parses.
fn collect_trip_request<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<TripRequest, InputClosed> {
    let days = ask(
        input,
        output,
        &format!("How many days is the trip ({MIN_TRIP_DAYS}-{MAX_TRIP_DAYS})? "),
        |raw| {
            raw.parse::<u8>()
                .ok()
                .filter(|days| (MIN_TRIP_DAYS..=MAX_TRIP_DAYS).contains(days))
                .ok_or_else(|| {
                    format!("enter a whole number from {MIN_TRIP_DAYS} to {MAX_TRIP_DAYS}")
                })
        },
    )?;

    let boroughs = ask(
        input,
        output,
        "Which boroughs (comma separated, or 'all')? ",
        |raw| {
            parse_borough_list(raw).map_err(|invalid| {
                format!(
                    "unknown borough(s): {}. Use Manhattan, Brooklyn, Queens, Bronx, Staten Island or all",
                    invalid.0.join(", ")
                )
            })
        },
    )?;

    let budget = ask(input, output, "Budget (low/medium/high) [medium]? ", |raw| {
        if raw.is_empty() {
            return Ok(BudgetTier::Medium);
        }
        BudgetTier::parse(raw).ok_or_else(|| "choose low, medium or high".to_string())
    })?;

    let season = ask(
        input,
        output,
        "Travel month or season (e.g. March, sept, fall) [current]? ",
        |raw| {
            if raw.is_empty() {
                return Ok(current_season(Local::now().date_naive()));
            }
            parse_season(raw).ok_or_else(|| "enter a month name or a season".to_string())
        },
    )?;

    let pace = ask(
        input,
        output,
        "Pace (walk-heavy/balanced/ride-flexible) [balanced]? ",
        |raw| {
            if raw.is_empty() {
                return Ok(Pace::Balanced);
            }
            Pace::parse(raw)
                .ok_or_else(|| "choose walk-heavy, balanced or ride-flexible".to_string())
        },
    )?;

    Ok(TripRequest {
        days,
        boroughs,
        budget: Some(budget),
        season: Some(season),
        pace: Some(pace),
    })
}

fn ask<T, R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<T, InputClosed> {
    loop {
        let _ = write!(output, "{question}");
        let _ = output.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return Err(InputClosed),
            Ok(_) => {}
        }

        match parse(line.trim()) {
            Ok(value) => return Ok(value),
            Err(hint) => {
                let _ = writeln!(output, "  {hint}");
            }
        }
    }
}

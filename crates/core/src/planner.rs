use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::models::{
    AttractionRecord, Borough, CleanedDatasets, DayPlan, DraftPlan, RestaurantRecord, Slot,
    SlotPlan, TripPlan, TripRequest, Venue,
};
use crate::policy::{compare_venues, HotelPolicy};
use crate::prompt::build_prompt;

pub const MIN_TRIP_DAYS: u8 = 1;
pub const MAX_TRIP_DAYS: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerOptions {
    pub hotel_policy: HotelPolicy,
    /// Keep each day inside the borough of its morning attraction when
    /// enough unused candidates exist there.
    pub cluster_by_borough: bool,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            hotel_policy: HotelPolicy::Rating,
            cluster_by_borough: true,
        }
    }
}

pub fn build_trip_plan(
    request: &TripRequest,
    data: &CleanedDatasets,
    options: &PlannerOptions,
) -> Result<DraftPlan, PlanError> {
    if !(MIN_TRIP_DAYS..=MAX_TRIP_DAYS).contains(&request.days) {
        return Err(PlanError::InvalidTripLength(request.days));
    }
    ensure_not_empty("hotels", &data.hotels)?;
    ensure_not_empty("attractions", &data.attractions)?;
    ensure_not_empty("restaurants", &data.restaurants)?;

    let hotels = filter_boroughs(&data.hotels, &request.boroughs);
    let attractions = ranked(filter_boroughs(&data.attractions, &request.boroughs));
    let restaurants = ranked(filter_boroughs(&data.restaurants, &request.boroughs));

    let hotel = options
        .hotel_policy
        .select(&hotels, &attractions, request.budget)
        .cloned()
        .ok_or(PlanError::InsufficientData { dataset: "hotels" })?;

    let mut attraction_picker = Picker::new(attractions);
    let mut restaurant_picker = Picker::new(restaurants);

    let days = (1..=request.days)
        .map(|day| {
            plan_day(
                day,
                options.cluster_by_borough,
                &mut attraction_picker,
                &mut restaurant_picker,
            )
        })
        .collect::<Vec<_>>();

    let plan = TripPlan { hotel, days };
    let prompt = build_prompt(request, &plan);

    Ok(DraftPlan { plan, prompt })
}

fn plan_day(
    day: u8,
    cluster: bool,
    attractions: &mut Picker<'_, AttractionRecord>,
    restaurants: &mut Picker<'_, RestaurantRecord>,
) -> DayPlan {
    let mut anchor: Option<Borough> = None;

    let slots = Slot::ALL.map(|slot| {
        let attraction = attractions.pick(anchor).cloned();

        if cluster && anchor.is_none() {
            anchor = attraction
                .as_ref()
                .map(|a| a.borough)
                .filter(|borough| borough.is_known());
        }

        let dining_anchor = if cluster {
            attraction
                .as_ref()
                .map(|a| a.borough)
                .filter(|borough| borough.is_known())
                .or(anchor)
        } else {
            None
        };
        let restaurant = restaurants.pick(dining_anchor).cloned();

        SlotPlan {
            slot,
            attraction,
            restaurant,
        }
    });

    DayPlan {
        day,
        borough: anchor,
        slots,
    }
}

/// Hands out candidates least-used first, then inside the anchor borough,
/// then by rank. Repeats only start once every candidate was used.
struct Picker<'a, V> {
    ranked: Vec<&'a V>,
    uses: Vec<u32>,
}

impl<'a, V: Venue> Picker<'a, V> {
    fn new(ranked: Vec<&'a V>) -> Self {
        let uses = vec![0; ranked.len()];
        Self { ranked, uses }
    }

    fn pick(&mut self, anchor: Option<Borough>) -> Option<&'a V> {
        let idx = (0..self.ranked.len()).min_by_key(|&idx| {
            let outside = anchor.is_some_and(|borough| self.ranked[idx].borough() != borough);
            (self.uses[idx], outside, idx)
        })?;

        self.uses[idx] += 1;
        Some(self.ranked[idx])
    }
}

fn ensure_not_empty<T>(dataset: &'static str, records: &[T]) -> Result<(), PlanError> {
    if records.is_empty() {
        Err(PlanError::InsufficientData { dataset })
    } else {
        Ok(())
    }
}

/// Borough filter that falls back to the whole dataset instead of leaving
/// the planner with nothing.
fn filter_boroughs<'a, V: Venue>(records: &'a [V], boroughs: &[Borough]) -> Vec<&'a V> {
    if boroughs.is_empty() {
        return records.iter().collect();
    }

    let filtered = records
        .iter()
        .filter(|record| boroughs.contains(&record.borough()))
        .collect::<Vec<_>>();

    if filtered.is_empty() {
        records.iter().collect()
    } else {
        filtered
    }
}

fn ranked<V: Venue>(mut records: Vec<&V>) -> Vec<&V> {
    records.sort_by(|a, b| compare_venues(*a, *b));
    records
}

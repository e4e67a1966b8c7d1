use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{AttractionRecord, Borough, BudgetTier, HotelRecord, Venue};

/// How the single home-base hotel is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotelPolicy {
    /// Best star rating, then cheapest high rate, then name.
    #[default]
    Rating,
    /// Hotel in the borough that hosts the most candidate attractions.
    Coverage,
}

impl HotelPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "rating" | "top-rated" | "top_rated" => Some(Self::Rating),
            "coverage" | "borough" | "borough-coverage" => Some(Self::Coverage),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::Coverage => "coverage",
        }
    }

    pub fn select<'a>(
        self,
        hotels: &[&'a HotelRecord],
        attractions: &[&AttractionRecord],
        budget: Option<BudgetTier>,
    ) -> Option<&'a HotelRecord> {
        let mut pool = budget
            .map(|tier| within_budget(hotels, tier))
            .filter(|fits| !fits.is_empty())
            .unwrap_or_else(|| hotels.to_vec());
        pool.sort_by(|a, b| compare_hotels(a, b));

        match self {
            Self::Rating => pool.first().copied(),
            Self::Coverage => {
                let mut counts: HashMap<Borough, usize> = HashMap::new();
                for attraction in attractions.iter().filter(|a| a.borough.is_known()) {
                    *counts.entry(attraction.borough).or_default() += 1;
                }

                pool.iter()
                    .copied()
                    .enumerate()
                    .max_by(|(ia, a), (ib, b)| {
                        let ca = counts.get(&a.borough).copied().unwrap_or(0);
                        let cb = counts.get(&b.borough).copied().unwrap_or(0);
                        // earlier position in the sorted pool wins ties
                        ca.cmp(&cb).then(ib.cmp(ia))
                    })
                    .map(|(_, hotel)| hotel)
            }
        }
    }
}

fn within_budget<'a>(hotels: &[&'a HotelRecord], tier: BudgetTier) -> Vec<&'a HotelRecord> {
    let (low, high) = tier.star_range();
    hotels
        .iter()
        .copied()
        .filter(|hotel| {
            hotel
                .star_rating
                .is_some_and(|stars| stars >= low && stars <= high)
        })
        .collect()
}

fn compare_hotels(a: &HotelRecord, b: &HotelRecord) -> Ordering {
    compare_optional_desc(a.star_rating, b.star_rating)
        .then_with(|| compare_optional_asc(a.high_rate, b.high_rate))
        .then_with(|| compare_optional_asc(a.low_rate, b.low_rate))
        .then_with(|| compare_venues(a, b))
}

/// Rating descending with missing ratings last, then name, then identity.
pub fn compare_venues<V: Venue>(a: &V, b: &V) -> Ordering {
    compare_optional_desc(a.rating(), b.rating())
        .then_with(|| a.name().cmp(b.name()))
        .then_with(|| a.identity_key().cmp(&b.identity_key()))
}

fn compare_optional_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_optional_asc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

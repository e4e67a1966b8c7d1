use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Borough {
    Manhattan,
    Brooklyn,
    Queens,
    Bronx,
    #[serde(rename = "Staten Island")]
    StatenIsland,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Borough {
    pub const KNOWN: [Borough; 5] = [
        Self::Manhattan,
        Self::Brooklyn,
        Self::Queens,
        Self::Bronx,
        Self::StatenIsland,
    ];

    /// Accepts dataset labels as well as the loose spellings people type.
    pub fn parse(value: &str) -> Option<Self> {
        let key = value
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match key.as_str() {
            "manhattan" => Some(Self::Manhattan),
            "brooklyn" => Some(Self::Brooklyn),
            "queens" => Some(Self::Queens),
            "bronx" | "the bronx" => Some(Self::Bronx),
            "staten island" | "staten_island" | "statenisland" => Some(Self::StatenIsland),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manhattan => "Manhattan",
            Self::Brooklyn => "Brooklyn",
            Self::Queens => "Queens",
            Self::Bronx => "Bronx",
            Self::StatenIsland => "Staten Island",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

impl fmt::Display for Borough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Low,
    Medium,
    High,
}

impl BudgetTier {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" | "budget" | "cheap" => Some(Self::Low),
            "medium" | "mid" | "moderate" => Some(Self::Medium),
            "high" | "luxury" => Some(Self::High),
            _ => None,
        }
    }

    /// Tier of a hotel from its highest nightly rate.
    pub fn from_rate(rate: f64) -> Self {
        if rate < 100.0 {
            Self::Low
        } else if rate < 300.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Inclusive star-rating window a hotel must sit in for this budget.
    pub fn star_range(self) -> (f64, f64) {
        match self {
            Self::Low => (1.0, 2.0),
            Self::Medium => (2.0, 3.0),
            Self::High => (3.0, 4.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pace {
    WalkHeavy,
    Balanced,
    RideFlexible,
}

impl Pace {
    pub fn parse(value: &str) -> Option<Self> {
        let key = value
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");

        match key.as_str() {
            "walk-heavy" | "walk" => Some(Self::WalkHeavy),
            "balanced" => Some(Self::Balanced),
            "ride-flexible" | "ride" => Some(Self::RideFlexible),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WalkHeavy => "walk-heavy",
            Self::Balanced => "balanced",
            Self::RideFlexible => "ride-flexible",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Morning,
    Noon,
    Evening,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Self::Morning, Self::Noon, Self::Evening];

    pub fn label(self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Noon => "Noon",
            Self::Evening => "Evening",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelRecord {
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub borough: Borough,
    pub star_rating: Option<f64>,
    pub low_rate: Option<f64>,
    pub high_rate: Option<f64>,
    pub budget_tier: Option<BudgetTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttractionRecord {
    pub name: String,
    pub address: Option<String>,
    pub zipcode: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub borough: Borough,
    pub category: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRecord {
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub borough: Borough,
    pub cuisine: Option<String>,
    pub rating: Option<f64>,
    pub price_tier: Option<String>,
}

/// Common view over the three cleaned record types.
pub trait Venue {
    fn name(&self) -> &str;
    fn borough(&self) -> Borough;
    fn rating(&self) -> Option<f64>;
    fn coordinates(&self) -> Option<(f64, f64)>;
    fn address(&self) -> Option<&str>;

    /// Stable identity used for deduplication and tie-breaks.
    fn identity_key(&self) -> String {
        let name = self.name().trim().to_lowercase();
        match self.coordinates() {
            Some((lat, lon)) => format!("{name}|{lat:.6}|{lon:.6}"),
            None => format!(
                "{name}|{}",
                self.address().unwrap_or_default().trim().to_lowercase()
            ),
        }
    }
}

impl Venue for HotelRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn borough(&self) -> Borough {
        self.borough
    }

    fn rating(&self) -> Option<f64> {
        self.star_rating
    }

    fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude, self.longitude))
    }

    fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

impl Venue for AttractionRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn borough(&self) -> Borough {
        self.borough
    }

    fn rating(&self) -> Option<f64> {
        self.rating
    }

    fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

impl Venue for RestaurantRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn borough(&self) -> Borough {
        self.borough
    }

    fn rating(&self) -> Option<f64> {
        self.rating
    }

    fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude, self.longitude))
    }

    fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

/// The three cleaned tables a planning run reads.
#[derive(Debug, Clone, Default)]
pub struct CleanedDatasets {
    pub hotels: Vec<HotelRecord>,
    pub attractions: Vec<AttractionRecord>,
    pub restaurants: Vec<RestaurantRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelSeason {
    /// Full English month name when the traveler gave a month.
    pub month: Option<String>,
    pub season: Season,
}

impl fmt::Display for TravelSeason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.month {
            Some(month) => write!(f, "{month} ({})", self.season.as_str()),
            None => {
                let name = self.season.as_str();
                let mut chars = name.chars();
                match chars.next() {
                    Some(first) => write!(f, "{}{}", first.to_uppercase(), chars.as_str()),
                    None => Ok(()),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRequest {
    pub days: u8,
    /// Empty means every borough is allowed.
    pub boroughs: Vec<Borough>,
    pub budget: Option<BudgetTier>,
    pub season: Option<TravelSeason>,
    pub pace: Option<Pace>,
}

impl TripRequest {
    pub fn new(days: u8) -> Self {
        Self {
            days,
            boroughs: Vec::new(),
            budget: None,
            season: None,
            pace: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotPlan {
    pub slot: Slot,
    pub attraction: Option<AttractionRecord>,
    pub restaurant: Option<RestaurantRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: u8,
    pub borough: Option<Borough>,
    pub slots: [SlotPlan; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    pub hotel: HotelRecord,
    pub days: Vec<DayPlan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftPlan {
    pub plan: TripPlan,
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_borough_aliases() {
        assert_eq!(Borough::parse("  Staten   Island "), Some(Borough::StatenIsland));
        assert_eq!(Borough::parse("statenisland"), Some(Borough::StatenIsland));
        assert_eq!(Borough::parse("The Bronx"), Some(Borough::Bronx));
        assert_eq!(Borough::parse("Jersey City"), None);
    }

    #[test]
    fn budget_tier_follows_rate_thresholds() {
        assert_eq!(BudgetTier::from_rate(99.0), BudgetTier::Low);
        assert_eq!(BudgetTier::from_rate(100.0), BudgetTier::Medium);
        assert_eq!(BudgetTier::from_rate(299.99), BudgetTier::Medium);
        assert_eq!(BudgetTier::from_rate(300.0), BudgetTier::High);
    }

    #[test]
    fn attraction_identity_falls_back_to_address() {
        let attraction = AttractionRecord {
            name: "High Line".to_string(),
            address: Some("New York, NY 10011".to_string()),
            zipcode: None,
            region: None,
            latitude: None,
            longitude: None,
            borough: Borough::Manhattan,
            category: None,
            rating: None,
        };
        assert_eq!(attraction.identity_key(), "high line|new york, ny 10011");
    }

    #[test]
    fn season_renders_month_or_title_case() {
        let month = TravelSeason {
            month: Some("March".to_string()),
            season: Season::Spring,
        };
        assert_eq!(month.to_string(), "March (spring)");

        let season = TravelSeason {
            month: None,
            season: Season::Fall,
        };
        assert_eq!(season.to_string(), "Fall");
    }
}

pub mod error;
pub mod format;
pub mod models;
pub mod planner;
pub mod policy;
pub mod preferences;
pub mod prompt;

pub use error::PlanError;
pub use format::{
    draft_itinerary, format_itinerary, FormatWarning, FormattedItinerary, Itinerary,
    ItineraryDay, ItinerarySlot,
};
pub use models::*;
pub use planner::{build_trip_plan, PlannerOptions, MAX_TRIP_DAYS, MIN_TRIP_DAYS};
pub use policy::HotelPolicy;
pub use preferences::{current_season, normalize_boroughs, parse_borough_list, parse_season};
pub use prompt::build_prompt;

use std::fmt::Write as _;

use crate::models::{
    AttractionRecord, HotelRecord, RestaurantRecord, TripPlan, TripRequest,
};

pub fn build_prompt(request: &TripRequest, plan: &TripPlan) -> String {
    let days = plan.days.len();
    let boroughs = if request.boroughs.is_empty() {
        "All boroughs".to_string()
    } else {
        request
            .boroughs
            .iter()
            .map(|borough| borough.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let budget = request.budget.map_or("medium", |tier| tier.as_str());
    let pace = request.pace.map_or("balanced", |pace| pace.as_str());
    let season = request
        .season
        .as_ref()
        .map_or_else(|| "unspecified".to_string(), ToString::to_string);

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are an expert New York City travel planner. Write a {days}-day itinerary with separate Morning, Noon and Evening plans for every day."
    );
    prompt.push_str("Rules:\n");
    let _ = writeln!(
        prompt,
        "- Allowed boroughs: {boroughs}. Keep each day inside a single borough; never mix boroughs within one day."
    );
    let _ = writeln!(prompt, "- Budget level: {budget}. Keep every suggestion inside that budget.");
    let _ = writeln!(
        prompt,
        "- Travel pace: {pace}. Adjust how dense each day is and how much walking it asks for."
    );
    let _ = writeln!(
        prompt,
        "- Season or month: {season}. Prefer weather-appropriate indoor or outdoor picks and finish with a season-aware packing list."
    );
    prompt.push_str("- The home-base hotel below is fixed for the whole trip; mention it once at the top.\n");
    prompt.push_str("- Use the selected attraction and restaurant for each slot; do not swap in other venues.\n");
    prompt.push_str("- Do not repeat an attraction or restaurant on different days unless it is listed twice below.\n");
    prompt.push_str("- Do not give transit directions or step-by-step routing; describe the places only.\n\n");

    prompt.push_str("Selections:\n");
    let _ = writeln!(prompt, "Home base: {}", describe_hotel(&plan.hotel));
    for day in &plan.days {
        match day.borough {
            Some(borough) => {
                let _ = writeln!(prompt, "Day {} ({borough}):", day.day);
            }
            None => {
                let _ = writeln!(prompt, "Day {}:", day.day);
            }
        }
        for slot in &day.slots {
            let attraction = slot
                .attraction
                .as_ref()
                .map_or_else(|| "free time".to_string(), describe_attraction);
            let restaurant = slot
                .restaurant
                .as_ref()
                .map_or_else(|| "no restaurant".to_string(), describe_restaurant);
            let _ = writeln!(
                prompt,
                "- {}: {attraction}; eat at {restaurant}",
                slot.slot.label()
            );
        }
    }

    prompt.push_str("\nOutput format:\n");
    prompt.push_str("Home Base: <hotel name, borough, price note>\n");
    prompt.push_str("Day 1:\n");
    prompt.push_str("- Morning: <plan with time window and the restaurant>\n");
    prompt.push_str("- Noon: <plan with time window and the restaurant>\n");
    prompt.push_str("- Evening: <plan with time window and the restaurant>\n");
    let _ = writeln!(
        prompt,
        "Repeat this block for every day up to Day {days}. After the last day add:"
    );
    prompt.push_str("Packing list: <items>\n");

    prompt
}

pub fn describe_hotel(hotel: &HotelRecord) -> String {
    let mut text = format!("{} ({})", hotel.name, hotel.borough);
    if let Some(stars) = hotel.star_rating {
        let _ = write!(text, " | {stars} stars");
    }
    if let (Some(low), Some(high)) = (hotel.low_rate, hotel.high_rate) {
        let _ = write!(text, " | ${low:.0}-{high:.0}");
    }
    if let Some(address) = hotel.address.as_deref().filter(|a| !a.is_empty()) {
        let _ = write!(text, " | {address}");
    }
    text
}

pub fn describe_attraction(attraction: &AttractionRecord) -> String {
    let mut text = format!("{} ({}", attraction.name, attraction.borough);
    if let Some(region) = attraction.region.as_deref().filter(|r| !r.is_empty()) {
        let _ = write!(text, ", {region}");
    }
    text.push(')');
    if let Some(address) = attraction.address.as_deref().filter(|a| !a.is_empty()) {
        let _ = write!(text, " at {address}");
    }
    text
}

pub fn describe_restaurant(restaurant: &RestaurantRecord) -> String {
    let mut text = format!("{} ({})", restaurant.name, restaurant.borough);
    if let Some(rating) = restaurant.rating {
        let _ = write!(text, " | rating {rating}");
    }
    if let Some(price) = restaurant.price_tier.as_deref().filter(|p| !p.is_empty()) {
        let _ = write!(text, " | {price}");
    }
    if let Some(cuisine) = restaurant.cuisine.as_deref().filter(|c| !c.is_empty()) {
        let _ = write!(text, " | {cuisine}");
    }
    text
}

use thiserror::Error;
use toolbelt::toolbox;

/// Failure suggesting an outfit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WardrobeError {
    /// No weather description was given.
    #[error("weather description cannot be empty")]
    EmptyDescription,
}

/// Outfit suggestions keyed on weather keywords. Needs no state.
pub struct WardrobeTool;

const SUGGESTIONS: &[(&[&str], &str)] = &[
    (&["sunny", "clear"], "A light t-shirt and shorts."),
    (&["rain", "drizzle"], "A waterproof jacket and waterproof boots."),
    (&["snow"], "A warm coat, scarf, gloves, and insulated boots."),
    (&["cloudy"], "A long-sleeve shirt and jeans."),
    (&["windy"], "A windbreaker and layered clothing."),
    (&["fog"], "A light jacket and reflective gear."),
    (
        &["thunderstorm"],
        "A waterproof jacket, waterproof boots, and an umbrella.",
    ),
    (
        &["hot", "warm"],
        "Lightweight clothing such as a tank top and shorts.",
    ),
    (&["cold", "chilly"], "A warm sweater, coat, and scarf."),
];

const FALLBACK: &str = "Check the weather forecast for more details.";

#[toolbox(crate = "toolbelt::discovery")]
impl WardrobeTool {
    #[tool(
        name = "GetOutfitSuggestion",
        description = "Get outfit suggestion based on the weather description",
        input_params = "string weatherDescription",
        output_params = "string outfitSuggestion",
        on_failure = "Return an error message if the input is invalid or if any error occurs."
    )]
    pub fn get_outfit_suggestion(weather_description: &str) -> Result<&'static str, WardrobeError> {
        if weather_description.trim().is_empty() {
            return Err(WardrobeError::EmptyDescription);
        }
        let description = weather_description.to_lowercase();
        let suggestion = SUGGESTIONS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| description.contains(k)))
            .map_or(FALLBACK, |&(_, suggestion)| suggestion);
        Ok(suggestion)
    }
}

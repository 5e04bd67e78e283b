use std::time::Duration;

use thiserror::Error;
use toolbelt::discovery::CancellationToken;
use toolbelt::toolbox;
use tracing::debug;

/// Setting (or environment variable) holding the weather service key.
pub const API_KEY_SETTING: &str = "WEATHERSERVICE_API_KEY";

const LOOKUP_LATENCY: Duration = Duration::from_millis(25);

const CONDITIONS: &[(&str, &str)] = &[
    ("amsterdam", "Light rain"),
    ("cairo", "Sunny"),
    ("london", "Partly cloudy"),
    ("oslo", "Patchy snow"),
    ("wellington", "Windy"),
];

/// Weather lookup failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WeatherError {
    /// The key is blank.
    #[error("WEATHERSERVICE_API_KEY is not set")]
    MissingApiKey,
    /// No city was given.
    #[error("city cannot be empty")]
    EmptyCity,
    /// The service has no report for the city.
    #[error("no weather report for `{city}`")]
    UnknownCity {
        /// Requested city.
        city: String,
    },
    /// The caller cancelled the lookup.
    #[error("weather lookup cancelled")]
    Cancelled,
}

/// Current conditions by city. Stands in for a remote weather service and
/// needs an API key to be constructed.
#[derive(Debug)]
pub struct WeatherTool {
    api_key: String,
}

impl WeatherTool {
    /// Creates the tool.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::MissingApiKey`] for a blank key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, WeatherError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(WeatherError::MissingApiKey);
        }
        Ok(Self { api_key })
    }

    fn report(&self, city: &str) -> Option<&'static str> {
        debug!(city, key_len = self.api_key.len(), "querying weather service");
        let city = city.trim().to_lowercase();
        CONDITIONS
            .iter()
            .find(|(name, _)| *name == city)
            .map(|&(_, condition)| condition)
    }
}

#[toolbox(crate = "toolbelt::discovery")]
impl WeatherTool {
    #[tool(
        name = "GetWeatherInCity",
        description = "Get the current weather descriptions in a specified city",
        input_params = "string city, CancellationToken (optional)",
        output_params = "string[]",
        on_failure = "Return an error message if the city is invalid or the API call fails."
    )]
    pub async fn get_weather_in_city(
        &self,
        city: String,
        cancel: CancellationToken,
    ) -> Result<Vec<String>, WeatherError> {
        if city.trim().is_empty() {
            return Err(WeatherError::EmptyCity);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(WeatherError::Cancelled),
            () = tokio::time::sleep(LOOKUP_LATENCY) => {}
        }

        self.report(&city)
            .map(|condition| vec![condition.to_owned()])
            .ok_or(WeatherError::UnknownCity { city })
    }
}

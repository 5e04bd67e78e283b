use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use toolbelt::discovery::{Resolve, ResolveError, ResolveResult, Services};
use toolbelt::toolbox;

/// A message recorded by the [`Outbox`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentEmail {
    /// Recipient.
    pub person: String,
    /// Message body.
    pub body: String,
}

/// Delivery sink shared by every email sender. Records instead of sending.
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<SentEmail>>,
}

impl Outbox {
    fn push(&self, email: SentEmail) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email);
    }

    /// Messages delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Email validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmailError {
    /// No recipient.
    #[error("person cannot be empty")]
    EmptyPerson,
    /// No weather description.
    #[error("weather description cannot be empty")]
    EmptyDescription,
}

/// Sends weather updates through the registered [`Outbox`].
#[derive(Debug)]
pub struct EmailTool {
    outbox: Arc<Outbox>,
}

impl Resolve for EmailTool {
    fn resolve(services: &Services) -> ResolveResult<Self> {
        let outbox = services
            .lookup::<Outbox>()
            .ok_or_else(|| ResolveError::Unresolvable {
                type_name: "Outbox".to_owned(),
            })?;
        Ok(Self { outbox })
    }
}

#[toolbox(crate = "toolbelt::discovery", resolve)]
impl EmailTool {
    #[tool(
        name = "SendEmail",
        description = "Send an email with the weather update to a specified person.",
        input_params = "string person, string weatherDescription,string clothsToWear optional",
        output_params = "string confirmationMessage",
        on_failure = "Return an error message if the input is invalid or if any error occurs."
    )]
    pub fn send_email(
        &self,
        person: &str,
        weather_description: &str,
        cloths_to_wear: Option<String>,
    ) -> Result<String, EmailError> {
        if person.trim().is_empty() {
            return Err(EmailError::EmptyPerson);
        }
        if weather_description.trim().is_empty() {
            return Err(EmailError::EmptyDescription);
        }

        let body = match cloths_to_wear {
            Some(cloths) => format!("Weather update: {weather_description}. Wear: {cloths}"),
            None => format!("Weather update: {weather_description}"),
        };
        self.outbox.push(SentEmail {
            person: person.to_owned(),
            body: body.clone(),
        });
        Ok(format!("Email sent to {person}. {body}"))
    }
}

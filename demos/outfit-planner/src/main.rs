//! Outfit planner: discovers weather, wardrobe, and email tools, prints the
//! catalog an orchestrator would hand to a model, and optionally invokes one.

mod tools;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use toolbelt::config::{self, DiscoveryConfig};
use toolbelt::discovery::{
    Callable, CancellationToken, CapabilityRegistry, ModuleEnumerator, ResolveError, Services,
    Toolset,
};
use toolbelt::telemetry::{TelemetryConfig, init_tracing};
use tracing::{info, warn};

use crate::tools::{API_KEY_SETTING, Outbox, WeatherTool};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "outfit-planner", about = "List and invoke discovered capabilities")]
struct Cli {
    /// JSON discovery config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Catalog output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Name of a capability to invoke instead of listing the catalog.
    #[arg(long)]
    invoke: Option<String>,

    /// JSON object of arguments for `--invoke`.
    #[arg(long, default_value = "{}")]
    args: String,

    /// Cancel the invocation after this many milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;
    init_tracing(&TelemetryConfig::with_filter(config.log_filter.clone()))?;

    let outbox = Arc::new(Outbox::default());
    let toolset = discover(&config, Arc::clone(&outbox))?;
    info!(tools = toolset.len(), "catalog ready");

    match cli.invoke {
        Some(name) => {
            let arguments: Value =
                serde_json::from_str(&cli.args).context("parsing --args as JSON")?;
            let output = invoke(&toolset, &name, arguments, cli.timeout_ms).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            for email in outbox.sent() {
                info!(to = %email.person, body = %email.body, "email recorded");
            }
        }
        None => print_catalog(&toolset, cli.format)?,
    }
    Ok(())
}

/// Composition root: everything the toolboxes need to be constructed.
fn compose(config: &DiscoveryConfig, outbox: Arc<Outbox>) -> Services {
    let api_key = config
        .setting(API_KEY_SETTING)
        .map(str::to_owned)
        .or_else(|| std::env::var(API_KEY_SETTING).ok())
        .unwrap_or_default();

    let services = Services::new();
    services.register_shared(outbox);
    services.register_factory::<WeatherTool, _>(move |_| {
        WeatherTool::new(api_key.clone())
            .map_err(|err| ResolveError::construction("WeatherTool", err.to_string()))
    });
    services
}

fn discover(config: &DiscoveryConfig, outbox: Arc<Outbox>) -> Result<Toolset> {
    let registry = CapabilityRegistry::new(Arc::new(compose(config, outbox)))
        .with_enumerator(ModuleEnumerator::named(&config.modules))
        .with_policy(config.on_resolution_failure);

    let discovery = registry.enumerate_with_report()?;
    for diagnostic in &discovery.diagnostics {
        warn!(
            module = %diagnostic.module,
            owner = %diagnostic.type_name,
            error = %diagnostic.error,
            "instance capabilities unavailable"
        );
    }
    Ok(Toolset::from_descriptors(discovery.descriptors)?)
}

async fn invoke(
    toolset: &Toolset,
    name: &str,
    arguments: Value,
    timeout_ms: Option<u64>,
) -> Result<Value> {
    let tool = toolset
        .get(name)
        .ok_or_else(|| anyhow!("no capability named `{name}`"))?;

    let cancel = CancellationToken::new();
    if let Some(timeout) = timeout_ms {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(timeout)).await;
            cancel.cancel();
        });
    }

    tool.call_value(arguments, Some(cancel))
        .await
        .with_context(|| format!("invoking `{name}`"))
}

fn print_catalog(toolset: &Toolset, format: Format) -> Result<()> {
    match format {
        Format::Text => {
            for tool in toolset.iter() {
                println!("{}\n    {}\n", tool.name(), tool.description());
            }
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(&toolset.specs())?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use toolbelt::primitives::ResolutionFailurePolicy;

    fn config_with_key() -> DiscoveryConfig {
        let mut config = DiscoveryConfig::default();
        config.settings.insert(API_KEY_SETTING.into(), "test-key".into());
        config
    }

    fn names(toolset: &Toolset) -> Vec<&str> {
        let mut names: Vec<_> = toolset.iter().map(|d| d.name()).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn catalog_lists_every_toolbox() {
        let toolset = discover(&config_with_key(), Arc::default()).unwrap();
        assert_eq!(
            names(&toolset),
            ["GetOutfitSuggestion", "GetWeatherInCity", "SendEmail"]
        );

        let weather = toolset.get("GetWeatherInCity").unwrap();
        assert_eq!(
            weather.description(),
            "Get the current weather descriptions in a specified city \
             Parameters: string city, CancellationToken (optional). Returns: string[]."
        );

        let email = toolset.get("SendEmail").unwrap();
        let schema = email.parameters_schema();
        assert_eq!(schema["required"], json!(["person", "weather_description"]));
        assert_eq!(schema["properties"]["cloths_to_wear"]["type"], "string");
    }

    #[test]
    fn missing_key_aborts_by_default() {
        if std::env::var(API_KEY_SETTING).is_ok() {
            return;
        }
        assert!(discover(&DiscoveryConfig::default(), Arc::default()).is_err());
    }

    #[test]
    fn missing_key_isolates_weather_when_configured() {
        if std::env::var(API_KEY_SETTING).is_ok() {
            return;
        }
        let config = DiscoveryConfig {
            on_resolution_failure: ResolutionFailurePolicy::Isolate,
            ..DiscoveryConfig::default()
        };
        let toolset = discover(&config, Arc::default()).unwrap();
        assert_eq!(names(&toolset), ["GetOutfitSuggestion", "SendEmail"]);
    }

    #[tokio::test]
    async fn invokes_through_the_catalog() {
        let toolset = discover(&config_with_key(), Arc::default()).unwrap();

        let weather = invoke(&toolset, "GetWeatherInCity", json!({ "city": "Oslo" }), None)
            .await
            .unwrap();
        assert_eq!(weather, json!(["Patchy snow"]));

        let outfit = invoke(
            &toolset,
            "GetOutfitSuggestion",
            json!({ "weather_description": "Patchy snow" }),
            None,
        )
        .await
        .unwrap();
        assert_eq!(outfit, json!("A warm coat, scarf, gloves, and insulated boots."));

        let err = invoke(&toolset, "SendEmail", json!({ "person": "Ada" }), None)
            .await
            .expect_err("missing weather_description");
        assert!(format!("{err:#}").contains("weather_description"));
    }

    #[tokio::test]
    async fn sent_emails_land_in_the_shared_outbox() {
        let outbox = Arc::new(Outbox::default());
        let toolset = discover(&config_with_key(), Arc::clone(&outbox)).unwrap();

        let confirmation = invoke(
            &toolset,
            "SendEmail",
            json!({ "person": "Ada", "weather_description": "Sunny" }),
            None,
        )
        .await
        .unwrap();
        assert_eq!(confirmation, json!("Email sent to Ada. Weather update: Sunny"));

        let sent = outbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].person, "Ada");
    }
}

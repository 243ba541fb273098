//! Discord client setup and lifecycle.

use super::handler::IlmHandler;
use crate::CommandRouter;
use ilm_error::{GatewayError, GatewayErrorKind};
use serenity::Client;
use std::sync::Arc;
use tracing::info;

/// The running bot: a serenity client wired to the command router.
///
/// # Example
/// ```no_run
/// # async fn run(router: std::sync::Arc<ilm_social::CommandRouter>) -> Result<(), ilm_error::GatewayError> {
/// use ilm_social::discord::IlmBot;
///
/// let token = std::env::var("DISCORD_TOKEN").unwrap_or_default();
/// let mut bot = IlmBot::new(&token, router).await?;
/// bot.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct IlmBot {
    client: Client,
}

impl IlmBot {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if serenity rejects the token or fails to
    /// initialize.
    pub async fn new(token: &str, router: Arc<CommandRouter>) -> Result<Self, GatewayError> {
        info!("Initializing Ilm Garden Discord bot");

        let handler = IlmHandler::new(router);
        let intents = IlmHandler::intents();
        info!(?intents, "Building serenity client");

        let client = Client::builder(token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| {
                GatewayError::new(GatewayErrorKind::ConnectionFailed(format!(
                    "Failed to build client: {}",
                    e
                )))
            })?;

        Ok(Self { client })
    }

    /// Connect and process events until the client shuts down.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` when the gateway connection ends with an error.
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        info!("Starting Discord bot");
        self.client.start().await.map_err(|e| {
            GatewayError::new(GatewayErrorKind::ConnectionFailed(format!(
                "Client error: {}",
                e
            )))
        })
    }
}

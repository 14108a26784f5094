use crate::commands::CommandContext;
use crate::components::GroupMeRelay;
use crate::error::Error;
use poise::serenity_prelude as serenity;

/// Gateway events outside of commands
pub async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, CommandContext, Error>,
    data: &CommandContext,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        if let Some(relay) = data.component_manager.get::<GroupMeRelay>() {
            relay.handle_message(new_message).await;
        }
    }

    Ok(())
}

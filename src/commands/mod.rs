use crate::components::ComponentManager;
use crate::error::BotResult;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

// Export submodules
pub mod calendar;
pub mod util;

/// Shared context for all commands
#[derive(Debug)]
pub struct CommandContext {
    pub component_manager: Arc<ComponentManager>,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(component_manager: Arc<ComponentManager>) -> Self {
        Self { component_manager }
    }
}

/// Type alias for command result
pub type CommandResult = BotResult<()>;

/// Type alias for poise context
pub type Context<'a> = poise::Context<'a, CommandContext, crate::error::Error>;

/// All application commands
pub fn get_all_application_commands() -> Vec<poise::Command<CommandContext, crate::error::Error>> {
    vec![util::ping(), calendar::sync_calendar()]
}

/// Green embed for successful operations
pub fn create_success_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .colour(serenity::Colour::DARK_GREEN)
}

/// Orange embed for operations that did not run
pub fn create_warning_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .colour(serenity::Colour::ORANGE)
}

/// Red embed for failures
pub fn create_error_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .colour(serenity::Colour::RED)
}

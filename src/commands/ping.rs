//! `/ping` health check.

use crate::embed::MessageCreate;
use crate::interaction::CommandEvent;
use crate::router::{CommandDeclaration, CommandRegistry, HandlerResult};

pub fn declaration() -> CommandDeclaration {
    CommandDeclaration::new("ping", "Check that the bot is alive")
}

pub async fn handle(event: CommandEvent) -> HandlerResult {
    event.respond(MessageCreate::ephemeral_text("Pong!")).await
}

pub fn register(registry: &mut CommandRegistry) {
    registry.command("/ping", handle);
}

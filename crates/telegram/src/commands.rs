use std::sync::Arc;

use teloxide::{dispatching::UpdateHandler, prelude::*, utils::command::BotCommands};
use tracing::info;

use common::{ConversationId, OperatorCommand};
use engine::CommandDispatcher;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub dispatcher: Arc<CommandDispatcher>,
}

/// Telegram bot commands exposed to the operator. None take arguments;
/// symbol and quantity come from the monitor config.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "DipBot commands:")]
pub enum Command {
    #[command(description = "Subscribe this chat to updates and analyze now")]
    Start,
    #[command(description = "Market buy the configured quantity")]
    Buy,
    #[command(description = "Market sell the configured quantity")]
    Sell,
    #[command(description = "Show this help")]
    Help,
}

impl Command {
    /// The core command this maps to; `Help` is answered by the bot itself.
    pub fn operator_command(&self) -> Option<OperatorCommand> {
        match self {
            Command::Start => Some(OperatorCommand::Start),
            Command::Buy => Some(OperatorCommand::Buy),
            Command::Sell => Some(OperatorCommand::Sell),
            Command::Help => None,
        }
    }
}

/// Run the Telegram bot in long-polling mode until ctrl-c.
pub async fn start_bot(bot: Bot, deps: BotDeps) {
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(handle_operator_command))
        .branch(case![Command::Buy].endpoint(handle_operator_command))
        .branch(case![Command::Sell].endpoint(handle_operator_command))
        .branch(case![Command::Help].endpoint(handle_help));

    Update::filter_message().branch(command_handler)
}

async fn handle_operator_command(msg: Message, cmd: Command, deps: Arc<BotDeps>) -> HandlerResult {
    if let Some(op) = cmd.operator_command() {
        deps.dispatcher
            .dispatch(op, ConversationId(msg.chat.id.0))
            .await;
    }
    Ok(())
}

async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

//! Terminal client for an agent chat backend.

mod commands;

use clap::{Parser, Subcommand};

use agent_chat_stream::{ClientConfig, ConversationId, init_observability};

#[derive(Debug, Parser)]
#[command(name = "agent-chat", version, about = "Chat with backend agents from the terminal")]
struct Cli {
    /// Backend origin, e.g. http://localhost:8000
    #[arg(long, global = true, env = "AGENT_CHAT_BASE_URL")]
    base_url: Option<String>,

    /// Log filter used when AGENT_CHAT_LOG_LEVEL / RUST_LOG are unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a message and stream the reply.
    Stream {
        message: String,
        /// Agent to route the message to.
        #[arg(long, short, default_value = "general_qa")]
        agent: String,
        /// Continue an existing conversation.
        #[arg(long, short)]
        conversation: Option<i64>,
        /// Print the server-formatted content after the stream completes.
        #[arg(long)]
        formatted: bool,
    },
    /// List available agents.
    Agents,
    /// List conversations.
    Conversations,
    /// Show one conversation with its messages.
    Conversation { id: i64 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_observability(&cli.log_level);

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config = config.base_url(base_url);
    }

    match cli.command {
        Command::Stream {
            message,
            agent,
            conversation,
            formatted,
        } => {
            commands::stream(
                config,
                message,
                agent,
                conversation.map(ConversationId),
                formatted,
            )
            .await
        }
        Command::Agents => commands::agents(config).await,
        Command::Conversations => commands::conversations(config).await,
        Command::Conversation { id } => commands::conversation(config, ConversationId(id)).await,
    }
}

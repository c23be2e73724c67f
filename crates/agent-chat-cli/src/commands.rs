use std::error::Error;
use std::io::Write as _;
use std::sync::Arc;

use agent_chat_stream::{
    AgentApi, ChatClient, ClientConfig, CompletedContent, ConversationId, Outcome, RenderState,
    StreamController, StreamObserver,
};
use tracing::debug;

type CliResult = Result<(), Box<dyn Error>>;

/// Reports conversation ids and failures on stderr so stdout carries only the reply.
struct TerminalObserver;

impl StreamObserver for TerminalObserver {
    fn on_conversation_id(&self, conversation_id: ConversationId) {
        eprintln!("[conversation {conversation_id}]");
    }

    fn on_complete(&self, content: &CompletedContent) {
        debug!(len = content.raw_content.len(), "reply complete");
    }

    fn on_error(&self, message: &str) {
        eprintln!("\n[error] {message}");
    }
}

pub async fn stream(
    config: ClientConfig,
    message: String,
    agent: String,
    conversation_id: Option<ConversationId>,
    formatted: bool,
) -> CliResult {
    let client = ChatClient::builder().config(config).build()?;
    let controller = StreamController::with_observer(client, Arc::new(TerminalObserver));
    let mut updates = controller.subscribe();
    let mut printer = LivePrinter::default();

    let session = controller.start_stream(message, agent, conversation_id);
    tokio::pin!(session);
    let outcome = loop {
        tokio::select! {
            result = &mut session => break result?,
            _ = updates.changed() => printer.show(&updates.borrow_and_update()),
            _ = tokio::signal::ctrl_c() => {
                controller.stop_stream();
                break Outcome::Cancelled;
            }
        }
    };
    printer.show(&controller.state());
    println!();

    match outcome {
        Outcome::Completed(content) => {
            if formatted {
                println!("{}", content.display_text());
            }
            Ok(())
        }
        Outcome::Failed(failure) => Err(failure.into()),
        Outcome::Cancelled => {
            eprintln!("[stopped]");
            Ok(())
        }
    }
}

/// Writes the not yet printed suffix of the streamed content.
#[derive(Default)]
struct LivePrinter {
    printed: usize,
}

impl LivePrinter {
    fn show(&mut self, state: &RenderState) {
        let content = state.stream_content();
        if content.len() < self.printed {
            self.printed = 0;
        }
        if let Some(fresh) = content.get(self.printed..).filter(|s| !s.is_empty()) {
            print!("{fresh}");
            let _ = std::io::stdout().flush();
            self.printed = content.len();
        }
    }
}

pub async fn agents(config: ClientConfig) -> CliResult {
    let api = AgentApi::new(config)?;
    for agent in api.agents().await? {
        println!("{:<20} {}", agent.agent_type, agent.name);
        if !agent.description.is_empty() {
            println!("{:<20} {}", "", agent.description);
        }
    }
    Ok(())
}

pub async fn conversations(config: ClientConfig) -> CliResult {
    let api = AgentApi::new(config)?;
    for conversation in api.conversations().await? {
        let title = if conversation.title.is_empty() {
            "(untitled)"
        } else {
            conversation.title.as_str()
        };
        println!(
            "{:>6}  {}  {} ({} messages)",
            conversation.id,
            conversation.updated_at.format("%Y-%m-%d %H:%M"),
            title,
            conversation.messages.len()
        );
    }
    Ok(())
}

pub async fn conversation(config: ClientConfig, id: ConversationId) -> CliResult {
    let api = AgentApi::new(config)?;
    let conversation = api.conversation(id).await?;
    println!("# {} ({})", conversation.title, conversation.id);
    for message in conversation.messages {
        let who = if message.is_user_message {
            "you".to_string()
        } else {
            message.agent_type.to_string()
        };
        println!("\n[{who}] {}", message.content);
    }
    Ok(())
}

//! CLI command definitions for agent-workers.
//!
//! `card` and `tools` describe the supervisor; `send` runs one turn through
//! the execution bridge and prints every committed task event.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};

use crate::agents::Supervisor;
use crate::executor::TaskLifecycleBridge;
use crate::llm::OpenAiChatModel;
use crate::protocol::{Message, RequestContext, Task, TaskState, TaskStatus};
use crate::scaffold::{
    Checkpointer, FileCheckpointer, LoopConfig, MemoryCheckpointer, StatefulAgentLoop,
    ToolRegistry,
};
use crate::settings::Settings;
use crate::tasks::{EventQueue, TaskEvent};

/// Default URL the supervisor card advertises.
const DEFAULT_RPC_URL: &str = "/supervisor";

/// Task-oriented agent runner.
#[derive(Parser)]
#[command(name = "agent-workers")]
#[command(about = "Run task-oriented agents over a stateful tool-calling loop")]
#[command(version)]
#[command(
    long_about = "agent-workers runs the supervisor agent through the task lifecycle bridge.\n\nEach `send` is one turn; pass the same --task-id and --checkpoint-dir to continue a conversation.\n\nExample usage:\n  agent-workers send \"Remember that I like tea\" --task-id t1 --checkpoint-dir ./checkpoints"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides LOG_LEVEL.
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Print the supervisor's agent card as JSON.
    Card(CardArgs),

    /// Print the tool definitions bound to the agent loop.
    Tools,

    /// Send one message to the supervisor and print the task events.
    Send(SendArgs),
}

#[derive(clap::Args)]
pub struct CardArgs {
    /// URL the card advertises.
    #[arg(long, default_value = DEFAULT_RPC_URL)]
    pub url: String,
}

#[derive(clap::Args)]
pub struct SendArgs {
    /// Message text. Empty text gets the greeting.
    pub text: String,

    /// Task to continue. A new task is created when omitted.
    #[arg(short = 't', long)]
    pub task_id: Option<String>,

    /// Conversation context the task belongs to.
    #[arg(short = 'c', long)]
    pub context_id: Option<String>,

    /// Stream agent events instead of waiting for the final result.
    #[arg(long)]
    pub stream: bool,

    /// Directory for per-task checkpoints. In-memory when omitted.
    #[arg(long, env = "CHECKPOINT_DIR")]
    pub checkpoint_dir: Option<PathBuf>,

    /// Model name, overriding the configured one.
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// OpenAI-compatible endpoint, overriding the configured one.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Maximum loop nodes per turn.
    #[arg(long, default_value = "25")]
    pub max_steps: usize,

    /// Print raw task events as JSON lines.
    #[arg(long)]
    pub json: bool,
}

/// Parse CLI arguments from the process.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Log filter directive: `RUST_LOG`, then `--log-level`, then `configured`.
/// Blank values are skipped.
pub fn log_filter(rust_log: Option<&str>, cli_level: Option<&str>, configured: &str) -> String {
    [rust_log, cli_level]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(configured)
        .to_string()
}

/// Run the CLI with parsed arguments and resolved settings.
pub async fn run_with_cli(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    match cli.command {
        Commands::Card(args) => run_card_command(args),
        Commands::Tools => run_tools_command(),
        Commands::Send(args) => run_send_command(args, settings).await,
    }
}

fn run_card_command(args: CardArgs) -> anyhow::Result<()> {
    let card = Supervisor::agent_card(args.url);
    println!("{}", serde_json::to_string_pretty(&card)?);
    Ok(())
}

fn run_tools_command() -> anyhow::Result<()> {
    let definitions = ToolRegistry::with_default_tools().definitions();
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}

async fn run_send_command(args: SendArgs, mut settings: Settings) -> anyhow::Result<()> {
    if let Some(model) = args.model {
        settings.llm_model = model;
    }
    if let Some(base_url) = args.base_url {
        settings.llm_base_url = base_url;
    }

    info!(
        environment = settings.environment.as_str(),
        model = %settings.llm_model,
        base_url = %settings.llm_base_url,
        "Sending message to supervisor"
    );

    let model = Arc::new(OpenAiChatModel::from_settings(&settings)?);
    let checkpointer: Arc<dyn Checkpointer> = match &args.checkpoint_dir {
        Some(dir) => Arc::new(FileCheckpointer::new(dir)),
        None => Arc::new(MemoryCheckpointer::new()),
    };

    let mut message = Message::user_text(args.text);
    if let Some(context_id) = &args.context_id {
        message = message.with_context_id(context_id);
    }
    let mut context = match &args.task_id {
        Some(task_id) => {
            message = message.with_task_id(task_id);
            let suspended = !checkpointer
                .list_pending_suspensions(task_id)
                .await?
                .is_empty();
            let context = RequestContext::new(message.clone());
            if suspended {
                debug!(task_id = %task_id, "Task is waiting for input, resuming");
                context.with_task(awaiting_input(&message))
            } else {
                context
            }
        }
        None => RequestContext::new(message),
    }
    .blocking(!args.stream);

    let config = LoopConfig::default().with_max_steps(args.max_steps);
    let agent_loop = StatefulAgentLoop::new(model, checkpointer, config);
    let bridge = TaskLifecycleBridge::new(Arc::new(Supervisor::with_loop(DEFAULT_RPC_URL, agent_loop)));

    let (queue, mut events) = EventQueue::channel();
    bridge.execute(&mut context, &queue).await?;

    for event in events.drain() {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", describe_event(&event));
        }
    }
    Ok(())
}

/// Rebuild the task record of a suspended task so the agent resumes it.
fn awaiting_input(message: &Message) -> Task {
    let mut task = Task::from_message(message);
    task.status = TaskStatus::now(TaskState::InputRequired, None);
    task
}

/// One-line human-readable rendering of a task event.
fn describe_event(event: &TaskEvent) -> String {
    match event {
        TaskEvent::Task(task) => format!("task {} created ({})", task.id, task.status.state),
        TaskEvent::StatusUpdate(update) => {
            let text = update
                .status
                .message
                .as_ref()
                .map(|m| m.text())
                .unwrap_or_default();
            if text.is_empty() {
                format!("[{}]", update.status.state)
            } else {
                format!("[{}] {}", update.status.state, text)
            }
        }
        TaskEvent::ArtifactUpdate(update) => format!(
            "artifact {} ({})",
            update.artifact.artifact_id,
            update.artifact.name.as_deref().unwrap_or("unnamed")
        ),
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use clap::Parser;
use cli::Cli;
use sven_bootstrap::{AgentBuilder, RuntimeContext, ToolSetProfile};
use sven_config::AgentMode;
use sven_core::{Agent, AgentEvent};
use sven_store::{JsonStore, SessionMeta, SessionStore, SqliteStore};
use sven_tools::events::TodoItem;

/// Bundles the session store handle with the id of the session currently
/// being driven, so persistence calls don't need the whole `Config` or
/// `Agent` threaded through every REPL helper. `session_id` is behind a
/// `Mutex` rather than a plain field because `/new` and `/resume` swap it
/// out mid-REPL without the caller needing `&mut Persistence`.
struct Persistence {
    store: Arc<dyn SessionStore>,
    session_id: Mutex<String>,
    agent_name: String,
    model_name: String,
    workspace_root: String,
}

impl Persistence {
    async fn session_id(&self) -> String {
        self.session_id.lock().await.clone()
    }

    /// Write session meta, the full message history, and the current todo
    /// list back to the store. Best-effort: a failure is logged, not fatal —
    /// losing durability for one turn should never abort the session.
    async fn save(&self, agent: &Agent, todos: &Mutex<Vec<TodoItem>>) {
        let id = self.session_id().await;
        if let Ok(Some(mut meta)) = self.store.load_session(&id).await {
            if meta.title.is_empty() {
                if let Some(first_user) = agent.session().messages.iter().find(|m| m.role == sven_model::Role::User) {
                    if let Some(text) = first_user.as_text() {
                        meta.title = text.chars().take(80).collect();
                    }
                }
            }
            meta.touch();
            if let Err(e) = self.store.save_session(&meta).await {
                warn!("failed to persist session meta: {e}");
            }
        }
        if let Err(e) = self.store.save_messages(&id, &agent.session().messages).await {
            warn!("failed to persist session messages: {e}");
        }
        let todos = todos.lock().await;
        if let Err(e) = self.store.replace_todos(&id, &todos).await {
            warn!("failed to persist todos: {e}");
        }
    }

    async fn log_permission(&self, tool_name: &str, decision: &str, reason: &str) {
        let id = self.session_id().await;
        let entry = sven_store::PermissionEntry::new(id, tool_name, decision, reason);
        if let Err(e) = self.store.log_permission(entry).await {
            warn!("failed to log permission decision: {e}");
        }
    }

    /// Create a fresh session row and switch persistence over to it.
    async fn start_new_session(&self) -> anyhow::Result<String> {
        let meta = SessionMeta::new(self.agent_name.clone(), self.model_name.clone(), self.workspace_root.clone());
        self.store.create_session(&meta).await?;
        *self.session_id.lock().await = meta.id.clone();
        Ok(meta.id)
    }

    /// Load `id`'s messages and todos for `/resume`, switching persistence
    /// over to it. Returns `None` if no such session exists.
    async fn resume(&self, id: &str) -> anyhow::Result<Option<(Vec<sven_model::Message>, Vec<TodoItem>)>> {
        if self.store.load_session(id).await?.is_none() {
            return Ok(None);
        }
        let messages = self.store.load_messages(id).await?;
        let todos = self.store.list_todos(id).await?;
        *self.session_id.lock().await = id.to_string();
        Ok(Some((messages, todos)))
    }
}

/// Open the session store and apply the one-time legacy-JSON migration.
/// `base_dir` is the `storage.base_dir` config value, resolved against the
/// (already `cd`'d-into) workspace root.
async fn open_store(base_dir: &str) -> anyhow::Result<Arc<dyn SessionStore>> {
    let base = PathBuf::from(base_dir);
    let sqlite = SqliteStore::open(&base).context("opening session store")?;
    let legacy = JsonStore::new(base.join("sessions"));
    match sven_store::migrate_json_to_sqlite(&legacy, &sqlite).await {
        Ok(0) => {}
        Ok(n) => debug!("migrated {n} legacy session(s) into the session store"),
        Err(e) => warn!("legacy session migration failed (continuing without it): {e}"),
    }
    Ok(Arc::new(sqlite))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let headless = cli.is_headless();

    init_logging(cli.verbose);

    if let Some(cwd) = &cli.cwd {
        std::env::set_current_dir(cwd)
            .with_context(|| format!("changing to workspace root {}", cwd.display()))?;
    }

    let mut config = sven_config::load(cli.config.as_deref())?;
    apply_env_overrides(&mut config);
    let config = Arc::new(config);

    let model: Arc<dyn sven_model::ModelProvider> = match sven_model::from_config(&config.model) {
        Ok(m) => Arc::from(m),
        Err(e) => {
            eprintln!("fatal: could not initialise model provider: {e:#}");
            std::process::exit(1);
        }
    };

    let runtime_ctx = RuntimeContext::auto_detect();
    let todos: Arc<Mutex<Vec<TodoItem>>> = Arc::new(Mutex::new(Vec::new()));
    let task_depth = Arc::new(AtomicUsize::new(0));

    let workspace_root = std::env::current_dir().unwrap_or_default().display().to_string();
    let store = open_store(&config.storage.base_dir).await?;
    let agent_name = config.agent.default_mode.to_string();
    let model_name = config.model.name.clone();
    let (session_id, resumed_messages): (String, Option<Vec<sven_model::Message>>) = match &cli.resume {
        Some(id) => match store.load_session(id).await? {
            Some(_meta) => {
                let messages = store.load_messages(id).await?;
                *todos.lock().await = store.list_todos(id).await?;
                (id.clone(), Some(messages))
            }
            None => {
                eprintln!("fatal: no session found with id {id}");
                std::process::exit(1);
            }
        },
        None => {
            let meta = SessionMeta::new(agent_name.clone(), model_name.clone(), workspace_root.clone());
            store.create_session(&meta).await?;
            (meta.id.clone(), None)
        }
    };
    let persistence = Persistence {
        store: store.clone(),
        session_id: Mutex::new(session_id),
        agent_name,
        model_name,
        workspace_root,
    };

    let mut agent = AgentBuilder::new(config.clone())
        .with_runtime_context(runtime_ctx)
        .build(
            config.agent.default_mode,
            model,
            ToolSetProfile::Full {
                question_tx: None,
                todos: todos.clone(),
                task_depth,
            },
        );

    if let Some(messages) = resumed_messages {
        agent.seed_history(messages).await;
    }

    if headless {
        run_headless(agent, cli.prompt, persistence, todos).await
    } else {
        run_repl(agent, cli.prompt, persistence, todos, config).await
    }
}

/// Apply the environment-variable override layer documented for the CLI.
///
/// `AGENT_CONFIG_PATH`, `AGENT_WORKSPACE_ROOT`, and `AGENT_LANG` are handled
/// directly by clap's `env` attribute on [`Cli`]; the remaining variables
/// override one `Config` field each when set.
fn apply_env_overrides(config: &mut sven_config::Config) {
    if let Ok(base_url) = std::env::var("AGENT_BASE_URL") {
        config.model.base_url = Some(base_url);
    }
    if let Ok(model_name) = std::env::var("AGENT_MODEL") {
        config.model.name = model_name;
    }
    if let Ok(api_key) = std::env::var("AGENT_API_KEY").or_else(|_| std::env::var("DASHSCOPE_API_KEY")) {
        config.model.api_key = Some(api_key);
    }
    if let Ok(max_steps) = std::env::var("AGENT_MAX_STEPS") {
        if let Ok(n) = max_steps.parse::<u32>() {
            config.agent.max_tool_rounds = n;
        } else {
            warn!("ignoring invalid AGENT_MAX_STEPS={max_steps:?}, expected an integer");
        }
    }
}

/// One-shot non-interactive run: submit the prompt (or stdin, if no prompt
/// was given) as a single turn, stream text to stdout, then exit.
async fn run_headless(
    mut agent: Agent,
    prompt: Option<String>,
    persistence: Persistence,
    todos: Arc<Mutex<Vec<TodoItem>>>,
) -> anyhow::Result<()> {
    let input = match prompt {
        Some(p) => p,
        None => {
            let mut buf = String::new();
            io::stdin().read_line(&mut buf).ok();
            buf.trim().to_string()
        }
    };

    if input.is_empty() {
        eprintln!("fatal: no prompt given (pass one as an argument or pipe it on stdin)");
        std::process::exit(1);
    }

    let (tx, rx) = mpsc::channel(256);
    agent.submit(&input, tx).await?;
    let code = drain_events(rx, &persistence).await;
    persistence.save(&agent, &todos).await;
    std::process::exit(code);
}

/// Minimal line-editing REPL: read a line from stdin, dispatch it, repeat.
///
/// Rich TUI rendering is out of scope; this is a plain read-eval-print loop
/// that prints streamed model output directly to stdout.
async fn run_repl(
    mut agent: Agent,
    initial_prompt: Option<String>,
    persistence: Persistence,
    todos: Arc<Mutex<Vec<TodoItem>>>,
    config: Arc<sven_config::Config>,
) -> anyhow::Result<()> {
    println!(
        "sven — type /help for commands, /exit to quit. (session {})",
        persistence.session_id().await
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    if let Some(p) = initial_prompt {
        if !dispatch(&mut agent, &p, &persistence, &todos, &config).await? {
            return Ok(());
        }
    }

    loop {
        print!("> ");
        io::stdout().flush().ok();

        let line = match lines.next() {
            Some(Ok(l)) => l,
            Some(Err(e)) => {
                warn!("stdin read error: {e}");
                break;
            }
            None => break, // EOF (Ctrl-D)
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !dispatch(&mut agent, line, &persistence, &todos, &config).await? {
            break;
        }
    }

    Ok(())
}

/// Classify and run one unit of REPL input.
///
/// Returns `Ok(false)` when the REPL should exit (`/exit`, `/quit`).
async fn dispatch(
    agent: &mut Agent,
    text: &str,
    persistence: &Persistence,
    todos: &Arc<Mutex<Vec<TodoItem>>>,
    config: &Arc<sven_config::Config>,
) -> anyhow::Result<bool> {
    if let Some(rest) = text.strip_prefix('/') {
        return run_slash_command(agent, rest, persistence, todos, config).await;
    }
    if let Some(rest) = text.strip_prefix('!') {
        run_bang_command(agent, rest).await?;
        return Ok(true);
    }

    let (tx, rx) = mpsc::channel(256);
    agent.submit(text, tx).await?;
    drain_events(rx, persistence).await;
    persistence.save(agent, todos).await;
    Ok(true)
}

/// Execute a `!command` as a shell call through the same tool the model uses,
/// so it is subject to the same policy/approval path.
async fn run_bang_command(agent: &Agent, command: &str) -> anyhow::Result<()> {
    let call = sven_tools::ToolCall {
        id: "bang".to_string(),
        name: "shell".to_string(),
        args: serde_json::json!({ "command": command }),
    };
    let output = agent.tools().execute(&call).await;
    if output.is_error {
        eprintln!("command failed: {}", output.content);
    } else {
        println!("{}", output.content);
    }
    Ok(())
}

/// Execute one of the closed set of slash commands.
///
/// Returns `Ok(false)` for `/exit` and `/quit`.
async fn run_slash_command(
    agent: &mut Agent,
    rest: &str,
    persistence: &Persistence,
    todos: &Arc<Mutex<Vec<TodoItem>>>,
    config: &Arc<sven_config::Config>,
) -> anyhow::Result<bool> {
    let mut parts = rest.split_whitespace();
    let cmd = parts.next().unwrap_or("");
    let arg = parts.next();

    match cmd {
        "help" => {
            println!(
                "Commands: /help /model [name] /permissions [preset] /mode <plan|default|auto-edit|yolo>\n\
                 /tools /skills /todos /new /resume [id] /sessions /compact /diff /undo /exit /quit\n\
                 Aliases: /plan /default /auto-edit /yolo\n\
                 Prefix a line with ! to run it as a shell command."
            );
        }
        "exit" | "quit" => return Ok(false),
        "mode" => match arg.and_then(parse_mode) {
            Some(m) => {
                agent.set_mode(m).await;
                println!("mode set to {m}");
            }
            None => eprintln!("usage: /mode <plan|default|auto-edit|yolo>"),
        },
        "plan" | "default" | "auto-edit" | "yolo" => {
            if let Some(m) = parse_mode(cmd) {
                agent.set_mode(m).await;
                println!("mode set to {m}");
            }
        }
        "tools" => {
            for name in agent.tools().names() {
                println!("  {name}");
            }
        }
        "model" => match arg {
            None => {
                let (provider, model) = agent.model_info();
                println!("provider: {provider}\nmodel: {model}");
            }
            Some(name) => {
                let mut model_cfg = config.model.clone();
                model_cfg.name = name.to_string();
                match sven_model::from_config(&model_cfg) {
                    Ok(provider) => {
                        agent.set_model(Arc::from(provider));
                        if let Err(e) = sven_config::save_model_override(name) {
                            warn!("failed to persist model override: {e}");
                        }
                        println!("model set to {name}");
                    }
                    Err(e) => eprintln!("failed to switch model: {e:#}"),
                }
            }
        },
        "permissions" => match arg {
            None => print!("{}", agent.policy_summary()),
            Some(preset) => match sven_config::PermissionConfig::preset(preset) {
                Some(cfg) => {
                    agent.set_policy(sven_tools::ToolPolicy::from_config(&cfg));
                    println!("permissions preset set to {preset}");
                }
                None => eprintln!("unknown preset: {preset} (try default, cautious, or yolo)"),
            },
        },
        "skills" => {
            println!("(skills discovery is not implemented; no skills configured)");
        }
        "todos" => {
            let todos = todos.lock().await;
            if todos.is_empty() {
                println!("(no todos)");
            } else {
                for item in todos.iter() {
                    println!("  [{}] ({}) {}", item.status, item.priority, item.content);
                }
            }
        }
        "new" => match persistence.start_new_session().await {
            Ok(id) => {
                let max_tokens = agent.session().max_tokens;
                *agent.session_mut() = sven_core::Session::new(max_tokens);
                todos.lock().await.clear();
                println!("started a new session ({id})");
            }
            Err(e) => eprintln!("failed to start new session: {e:#}"),
        },
        "resume" => {
            let id = match arg {
                Some(id) => Some(id.to_string()),
                None => {
                    let current = persistence.session_id().await;
                    match persistence.store.list_sessions().await {
                        Ok(sessions) => sessions.into_iter().find(|s| s.id != current).map(|s| s.id),
                        Err(e) => {
                            eprintln!("failed to list sessions: {e:#}");
                            None
                        }
                    }
                }
            };
            match id {
                None => eprintln!("usage: /resume <id> (no other session to resume)"),
                Some(id) => match persistence.resume(&id).await {
                    Ok(Some((messages, resumed_todos))) => {
                        agent.seed_history(messages).await;
                        *todos.lock().await = resumed_todos;
                        println!("resumed session {id}");
                    }
                    Ok(None) => eprintln!("no session found with id {id}"),
                    Err(e) => eprintln!("failed to resume session {id}: {e:#}"),
                },
            }
        }
        "sessions" => match persistence.store.list_sessions().await {
            Ok(sessions) => {
                if sessions.is_empty() {
                    println!("(no sessions)");
                } else {
                    for s in sessions {
                        let title = if s.title.is_empty() { "(untitled)" } else { &s.title };
                        println!("  {} {} updated {}", s.id, title, s.updated_at);
                    }
                }
            }
            Err(e) => eprintln!("failed to list sessions: {e:#}"),
        },
        "compact" => {
            if agent.force_compact() {
                println!("compacted session history");
            } else {
                println!("(nothing worth compacting)");
            }
        }
        "diff" => run_git_passthrough(agent, "git diff").await,
        "undo" => run_git_passthrough(agent, "git restore . && git clean -fd").await,
        other => eprintln!("unknown command: /{other} (try /help)"),
    }
    Ok(true)
}

/// Run a git command through the same shell tool the model uses, printing
/// its output directly. Used by `/diff` and `/undo`.
async fn run_git_passthrough(agent: &Agent, command: &str) {
    let call = sven_tools::ToolCall {
        id: "slash".to_string(),
        name: "shell".to_string(),
        args: serde_json::json!({ "command": command }),
    };
    let output = agent.tools().execute(&call).await;
    if output.is_error {
        eprintln!("command failed: {}", output.content);
    } else {
        println!("{}", output.content);
    }
}

fn parse_mode(s: &str) -> Option<AgentMode> {
    match s {
        "plan" => Some(AgentMode::Plan),
        "default" => Some(AgentMode::Default),
        "auto-edit" | "autoedit" => Some(AgentMode::AutoEdit),
        "yolo" => Some(AgentMode::Yolo),
        _ => None,
    }
}

/// Drain agent events, printing streamed text and reporting errors.
///
/// Returns a process-exit-code hint: 0 on a clean turn, 1 on a reported
/// error (matching the provider-fatal / init-failure convention).
async fn drain_events(mut rx: mpsc::Receiver<AgentEvent>, persistence: &Persistence) -> i32 {
    let mut code = 0;
    while let Some(event) = rx.recv().await {
        match event {
            AgentEvent::TextDelta(chunk) => {
                print!("{chunk}");
                io::stdout().flush().ok();
            }
            AgentEvent::TextComplete(_) => println!(),
            AgentEvent::ToolCallStarted(call) => {
                debug!(tool = %call.name, "tool call started");
            }
            AgentEvent::ToolCallFinished {
                tool_name,
                is_error,
                ..
            } => {
                if is_error {
                    eprintln!("[{tool_name}] failed");
                }
            }
            AgentEvent::Error(msg) => {
                eprintln!("error: {msg}");
                code = 1;
            }
            AgentEvent::StepLimitReached { max_steps } => {
                eprintln!("error: step limit reached ({max_steps} tool-call rounds)");
                code = 1;
            }
            AgentEvent::PermissionDecision {
                tool_name,
                decision,
                reason,
            } => {
                persistence.log_permission(&tool_name, &decision, &reason).await;
            }
            AgentEvent::TurnComplete => {}
            _ => {}
        }
    }
    code
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let no_color = std::env::var_os("NO_COLOR").is_some() || std::env::var_os("AGENT_NO_COLOR").is_some();

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(!no_color)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
}

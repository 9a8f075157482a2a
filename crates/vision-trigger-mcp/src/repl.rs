//! Interactive REPL for trying the trigger policy by hand.
//!
//! Launch with `vision-trigger-mcp repl`. Plain text is treated as a user
//! turn and planned against an in-memory reference store; lines starting
//! with `/` are commands. Type `/help` for the list, Tab for completion.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};

use vision_trigger::{NewReference, PlanMode, ReferenceLocation, ReferenceSource};

use crate::session::PolicySessionManager;
use crate::tools::ToolRegistry;

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/config", "Show the active policy"),
    ("/tools", "List available MCP tools"),
    ("/refs", "List saved references"),
    ("/save", "Save image URLs under the last target: /save <url>..."),
    ("/topic", "Start a new session with a topic"),
    ("/stats", "Show turn statistics"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion.
#[derive(Default)]
struct PolicyHelper;

impl Completer for PolicyHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if input.starts_with('/') && !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for PolicyHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for PolicyHelper {}
impl Validator for PolicyHelper {}
impl Helper for PolicyHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Run the interactive REPL against `session`.
pub async fn run(mut session: PolicySessionManager) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mvision-trigger-mcp v{}\x1b[0m \x1b[90m(per-turn vision planning)\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Type a message to plan a turn. \x1b[36m/\x1b[0m browses commands, \x1b[90m/exit\x1b[0m quits."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<PolicyHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(PolicyHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".vision_trigger_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let prompt = " \x1b[36mturn>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let Some(input) = line.strip_prefix('/') else {
                    plan_turn(line, &mut session).await;
                    continue;
                };
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let mut parts = input.splitn(2, ' ');
                let cmd = parts.next().unwrap_or("");
                let args = parts.next().unwrap_or("").trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "config" => cmd_config(&session),
                    "tools" => cmd_tools(),
                    "refs" => cmd_refs(&session),
                    "save" => cmd_save(args, &session),
                    "topic" => {
                        let id = session.start_session(Some(args.to_string()));
                        eprintln!("  Session {id} started");
                    }
                    "stats" => cmd_stats(&session),
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);

    Ok(())
}

async fn plan_turn(utterance: &str, session: &mut PolicySessionManager) {
    let policy = session.policy().clone();
    let store = session.store();
    let (decision, outcome) = policy.plan_turn(utterance, store.as_ref()).await;
    let session_id = session.current_session_id();
    session.record_turn(session_id, &decision, &outcome);

    eprintln!();
    if !decision.invoke {
        eprintln!("  \x1b[90mno trigger\x1b[0m");
        eprintln!();
        return;
    }

    let targets: Vec<&str> = decision.targets.iter().map(|t| t.as_str()).collect();
    eprintln!("  Trigger:  {:?}", decision.reason);
    eprintln!("  Targets:  {}", targets.join(", "));
    if !decision.style_cues.is_empty() {
        eprintln!("  Cues:     {}", decision.style_cues.join(", "));
    }

    let plan = &outcome.plan;
    match plan.mode {
        PlanMode::Reuse => {
            let refs = plan.references.as_deref().unwrap_or_default();
            eprintln!("  Plan:     \x1b[32mreuse\x1b[0m {} saved references", refs.len());
            for r in refs {
                eprintln!("    #{:<4} {}", r.id, r.label);
            }
        }
        PlanMode::Fetch => {
            eprintln!(
                "  Plan:     \x1b[33mfetch\x1b[0m with {} (threshold {}, up to {})",
                plan.backend.map(|b| b.as_str()).unwrap_or("-"),
                plan.threshold.unwrap_or_default(),
                plan.max_candidates.unwrap_or_default()
            );
        }
        PlanMode::None => eprintln!("  Plan:     none"),
    }
    for warning in &outcome.warnings {
        eprintln!("  \x1b[33mwarning:\x1b[0m {warning}");
    }
    eprintln!();
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Anything not starting with / is planned as a user turn.");
    eprintln!();
}

fn cmd_config(session: &PolicySessionManager) {
    let source = session
        .policy_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());
    eprintln!();
    eprintln!("  Policy: {source}");
    match serde_json::to_string_pretty(session.policy().config()) {
        Ok(text) => {
            for line in text.lines() {
                eprintln!("    {line}");
            }
        }
        Err(e) => eprintln!("  Cannot render policy: {e}"),
    }
    eprintln!();
}

fn cmd_tools() {
    let tools = ToolRegistry::list_tools();
    eprintln!();
    eprintln!("  {} MCP tools available:", tools.len());
    eprintln!();
    for tool in &tools {
        eprintln!(
            "    {:<20} {}",
            tool.name,
            tool.description.as_deref().unwrap_or("")
        );
    }
    eprintln!();
}

fn cmd_refs(session: &PolicySessionManager) {
    let refs = session.store().recent(20);
    eprintln!();
    if refs.is_empty() {
        eprintln!("  No saved references yet. Plan a turn, then /save <url>.");
    }
    for r in &refs {
        eprintln!("    #{:<4} {:<24} {} images", r.id, r.label, r.locations.len());
    }
    eprintln!();
}

fn cmd_save(args: &str, session: &PolicySessionManager) {
    let urls: Vec<&str> = args.split_whitespace().collect();
    if urls.is_empty() {
        eprintln!("  Usage: /save <url> [<url>...]");
        return;
    }

    let reference = NewReference {
        label: String::new(),
        locations: urls
            .iter()
            .map(|u| ReferenceLocation {
                storage_key: format!("repl/{}", u.rsplit('/').next().unwrap_or(u)),
                url: u.to_string(),
            })
            .collect(),
        source: ReferenceSource {
            provider: Some("repl".to_string()),
            ..ReferenceSource::default()
        },
    };

    match session.save_reference(None, reference) {
        Ok(stored) => eprintln!("  Saved #{} as '{}'", stored.id, stored.label),
        Err(e) => eprintln!("  Cannot save: {e}"),
    }
}

fn cmd_stats(session: &PolicySessionManager) {
    let stats = session.stats();
    eprintln!();
    eprintln!("  Session:    {}", session.current_session_id());
    eprintln!("  Turns:      {} ({} triggered)", stats.turns, stats.triggered);
    eprintln!(
        "  Plans:      {} reuse, {} fetch, {} none",
        stats.reuse, stats.fetch, stats.none
    );
    eprintln!("  Degraded:   {}", stats.degraded);
    eprintln!("  References: {}", session.store().count());
    eprintln!();
}

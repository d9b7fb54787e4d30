//! Interactive REPL for the Toolbelt MCP server.
//!
//! Launch with `toolbelt-mcp repl` to enter interactive mode.
//! Type `/help` for available commands, Tab for completion.

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
use serde_json::Value;
use tokio::runtime::Handle;
use toolbelt::{
    CapabilityKind, ContentBlock, Dispatcher, InvocationOutcome, InvocationRequest,
    SuccessPayload,
};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/tools", "List available tools"),
    ("/resources", "List resources and resource templates"),
    ("/prompts", "List available prompts"),
    ("/call", "Call a tool: /call <tool> [json arguments]"),
    ("/read", "Read a resource: /read <uri>"),
    ("/prompt", "Expand a prompt: /prompt <name> [json arguments]"),
    ("/info", "Show server capabilities"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion. Knows the registered names so `/call`
/// and `/prompt` can complete them.
struct ToolbeltHelper {
    tools: Vec<String>,
    prompts: Vec<String>,
    resources: Vec<String>,
}

impl ToolbeltHelper {
    fn new(dispatcher: &Dispatcher) -> Self {
        let registry = dispatcher.registry();
        let names = |kind: CapabilityKind| {
            registry
                .list(kind)
                .iter()
                .map(|d| d.name.clone())
                .collect::<Vec<_>>()
        };
        let resources = registry
            .list(CapabilityKind::Resource)
            .iter()
            .filter_map(|d| d.resource.as_ref())
            .map(|r| r.uri.as_str().to_string())
            .collect();
        Self {
            tools: names(CapabilityKind::Tool),
            prompts: names(CapabilityKind::Prompt),
            resources,
        }
    }
}

impl Completer for ToolbeltHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
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

        let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
        if args.contains(' ') {
            return Ok((pos, Vec::new()));
        }
        let candidates = match cmd {
            "/call" => &self.tools,
            "/prompt" => &self.prompts,
            "/read" => &self.resources,
            _ => return Ok((pos, Vec::new())),
        };
        let prefix_start = input.len() - args.len();
        let matches: Vec<Pair> = candidates
            .iter()
            .filter(|name| name.starts_with(args))
            .map(|name| Pair {
                display: name.clone(),
                replacement: format!("{name} "),
            })
            .collect();
        Ok((prefix_start, matches))
    }
}

impl Hinter for ToolbeltHelper {
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

impl Highlighter for ToolbeltHelper {}
impl Validator for ToolbeltHelper {}
impl Helper for ToolbeltHelper {}

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

/// Split `<name> [json]` into the name and parsed arguments.
pub fn parse_invocation(args: &str) -> Result<(String, Option<Value>), String> {
    let args = args.trim();
    let (name, rest) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
    if name.is_empty() {
        return Err("missing name".to_string());
    }
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok((name.to_string(), None));
    }
    let value: Value =
        serde_json::from_str(rest).map_err(|e| format!("arguments are not valid JSON: {e}"))?;
    Ok((name.to_string(), Some(value)))
}

/// Run the interactive REPL. Blocks the calling thread; `runtime` drives the
/// async dispatcher.
pub fn run(dispatcher: Dispatcher, runtime: Handle) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mtoolbelt-mcp v{}\x1b[0m \x1b[90m\u{00b7} schema-checked tools for MCP clients\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<ToolbeltHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(ToolbeltHelper::new(&dispatcher)));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".toolbelt_mcp_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let prompt = " \x1b[36mtoolbelt>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
                let args = args.trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "info" => cmd_info(&dispatcher),
                    "tools" => cmd_list(&dispatcher, CapabilityKind::Tool),
                    "resources" => cmd_list(&dispatcher, CapabilityKind::Resource),
                    "prompts" => cmd_list(&dispatcher, CapabilityKind::Prompt),
                    "call" | "prompt" => match parse_invocation(args) {
                        Ok((name, arguments)) => {
                            let request = if cmd == "call" {
                                InvocationRequest::CallTool { name, arguments }
                            } else {
                                InvocationRequest::GetPrompt { name, arguments }
                            };
                            print_outcome(runtime.block_on(dispatcher.invoke(request)));
                        }
                        Err(e) => eprintln!("  Usage: /{cmd} <name> [json arguments] ({e})"),
                    },
                    "read" => {
                        if args.is_empty() {
                            eprintln!("  Usage: /read <uri>");
                        } else {
                            let request = InvocationRequest::read_resource(args);
                            print_outcome(runtime.block_on(dispatcher.invoke(request)));
                        }
                    }
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

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Example: /call calculate {{\"number1\": 10, \"number2\": 5, \"operator\": \"+\"}}");
    eprintln!();
}

fn cmd_info(dispatcher: &Dispatcher) {
    let capabilities = crate::types::InitializeResult::default_result();
    let registry = dispatcher.registry();
    eprintln!();
    eprintln!(
        "  Server:    {} v{}",
        capabilities.server_info.name, capabilities.server_info.version
    );
    eprintln!("  Protocol:  {}", capabilities.protocol_version);
    eprintln!("  Tools:     {}", registry.len(CapabilityKind::Tool));
    eprintln!("  Resources: {}", registry.len(CapabilityKind::Resource));
    eprintln!("  Prompts:   {}", registry.len(CapabilityKind::Prompt));
    eprintln!();
}

fn cmd_list(dispatcher: &Dispatcher, kind: CapabilityKind) {
    let entries = dispatcher.registry().list(kind);
    eprintln!();
    eprintln!("  {} {kind}s available:", entries.len());
    eprintln!();
    for d in entries {
        let label = match &d.resource {
            Some(locator) => locator.uri.as_str().to_string(),
            None => d.name.clone(),
        };
        eprintln!("    {label:<24} {}", d.description.as_deref().unwrap_or(""));
    }
    eprintln!();
}

fn print_outcome(outcome: InvocationOutcome) {
    eprintln!();
    match outcome {
        InvocationOutcome::Success(SuccessPayload::Tool {
            content,
            structured,
        }) => {
            print_blocks(&content);
            if let Some(structured) = structured {
                eprintln!("  \x1b[90mstructured: {structured}\x1b[0m");
            }
        }
        InvocationOutcome::Success(SuccessPayload::Resource { content, .. }) => {
            print_blocks(&content);
        }
        InvocationOutcome::Success(SuccessPayload::Prompt { messages, .. }) => {
            for message in messages {
                let role = serde_json::to_value(message.role).unwrap_or_default();
                eprintln!("  \x1b[1m[{}]\x1b[0m", role.as_str().unwrap_or("?"));
                print_blocks(std::slice::from_ref(&message.content));
            }
        }
        InvocationOutcome::Failure(failure) => {
            eprintln!("  \x1b[31mError ({}):\x1b[0m {}", failure.kind, failure.message);
        }
    }
    eprintln!();
}

fn print_blocks(blocks: &[ContentBlock]) {
    for block in blocks {
        match block {
            ContentBlock::Text { text } => {
                for line in text.lines() {
                    eprintln!("  {line}");
                }
            }
            ContentBlock::Image { data, mime_type } => {
                eprintln!("  [{mime_type} image, {} bytes]", data.len());
            }
        }
    }
}

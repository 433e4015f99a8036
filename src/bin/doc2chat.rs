//! CLI binary for doc2chat.
//!
//! Maps flags to `ChatConfig`, ingests any files given on the command line,
//! then either answers a single `--prompt` or runs an interactive loop.

use anyhow::{Context, Result};
use clap::Parser;
use doc2chat::{
    load_upload, ChatConfig, ChatService, DocumentKind, ExtractionResult, ExtractionStatus,
    IngestOutcome, IngestProgressCallback, ProgressCallback, ReplySource, Session,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Characters shown by `/preview`.
const DETAIL_PREVIEW_CHARS: usize = 500;
/// Characters shown per document by `/docs`.
const LIST_PREVIEW_CHARS: usize = 300;

fn spinner(prefix: &'static str, msg: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_prefix(prefix);
    bar.set_message(msg.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner plus one log line per ingested file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = spinner("Reading", "");
        bar.disable_steady_tick();
        Arc::new(Self { bar })
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_ingest_start(&self, total: usize) {
        self.bar.reset();
        self.bar.enable_steady_tick(Duration::from_millis(80));
        self.bar.set_message(format!("{total} file(s)…"));
    }

    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        self.bar.set_message(format!("[{index}/{total}] {name}"));
    }

    fn on_file_complete(&self, index: usize, total: usize, name: &str, chars: usize) {
        let mark = if chars > 0 { green("✓") } else { yellow("○") };
        self.bar.println(format!(
            "  {} [{index}/{total}] {:<32} {}",
            mark,
            name,
            dim(&format!("{chars:>6} chars"))
        ));
    }

    fn on_file_duplicate(&self, index: usize, total: usize, name: &str) {
        self.bar.println(format!(
            "  {} [{index}/{total}] {:<32} {}",
            cyan("↺"),
            name,
            dim("already processed")
        ));
    }

    fn on_ingest_complete(&self, _total: usize, _extracted: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Chat about a few documents
  doc2chat report.pdf scan.png notes.txt

  # One question, answer on stdout
  doc2chat contract.docx -p "What is the notice period?"

  # Download and ask, JSON output
  doc2chat https://example.com/memo.txt -p "Summarise" --json

  # No model server: canned replies only
  doc2chat --offline notes.txt

INTERACTIVE COMMANDS:
  /upload <path|url>...   add documents
  /docs                   list active documents
  /preview <name>         show a document's extracted text
  /new                    archive this chat and start another
  /history                list archived chats
  /restore <id>           reopen an archived chat
  /clear                  forget chats and documents
  /model on|off           toggle the model server
  /status                 engines and model server state
  /help                   this list
  /quit                   exit

SUPPORTED FILES:
  .png .jpg .jpeg   OCR via the tesseract binary
  .pdf              embedded text via pdfium
  .docx             paragraphs, then table cells
  .txt              UTF-8 text

ENVIRONMENT VARIABLES:
  DOC2CHAT_*        every option below has one (e.g. DOC2CHAT_MODEL)
  PDFIUM_LIB_PATH   path to libpdfium when not installed system-wide
  RUST_LOG          override log filtering
"#;

/// Chat with a local model about your documents.
#[derive(Parser, Debug)]
#[command(
    name = "doc2chat",
    version,
    about = "Chat with a local LLM about images, PDFs, Word and text documents",
    long_about = "Extract text from images (OCR), PDFs, Word documents and text files, then \
chat about them with a model served by a local Ollama daemon. Works without the model \
server too, answering from a small set of canned replies.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Files or HTTP/HTTPS URLs to ingest before chatting.
    files: Vec<String>,

    /// Send one message, print the reply and exit.
    #[arg(short, long, env = "DOC2CHAT_PROMPT")]
    prompt: Option<String>,

    /// Base URL of the Ollama server.
    #[arg(long, env = "DOC2CHAT_OLLAMA_URL", default_value = doc2chat::config::DEFAULT_BASE_URL)]
    ollama_url: String,

    /// Model name.
    #[arg(short, long, env = "DOC2CHAT_MODEL", default_value = doc2chat::config::DEFAULT_MODEL)]
    model: String,

    /// Liveness probe timeout in milliseconds.
    #[arg(long, env = "DOC2CHAT_PROBE_TIMEOUT_MS", default_value_t = 1000)]
    probe_timeout_ms: u64,

    /// Generation timeout in seconds.
    #[arg(long, env = "DOC2CHAT_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Characters of each document included with a message.
    #[arg(long, env = "DOC2CHAT_MAX_CONTEXT_CHARS", default_value_t = doc2chat::MAX_CONTEXT_CHARS)]
    max_context_chars: usize,

    /// Tesseract executable.
    #[arg(long, env = "DOC2CHAT_TESSERACT", default_value = "tesseract")]
    tesseract: String,

    /// OCR language(s), e.g. eng or eng+deu.
    #[arg(long, env = "DOC2CHAT_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// OCR PDF pages that have no text layer.
    #[arg(long, env = "DOC2CHAT_PDF_OCR")]
    pdf_ocr: bool,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "DOC2CHAT_PDFIUM_PATH")]
    pdfium_path: Option<PathBuf>,

    /// Directory for OCR and PDF scratch files (default: system temp dir).
    #[arg(long, env = "DOC2CHAT_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOC2CHAT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Never contact the model server.
    #[arg(long, env = "DOC2CHAT_OFFLINE")]
    offline: bool,

    /// Print replies as JSON.
    #[arg(long, env = "DOC2CHAT_JSON")]
    json: bool,

    /// Disable spinners.
    #[arg(long, env = "DOC2CHAT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2CHAT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except replies and errors.
    #[arg(short, long, env = "DOC2CHAT_QUIET")]
    quiet: bool,
}

/// One line typed at the interactive prompt.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Message(String),
    Upload(Vec<String>),
    Docs,
    Preview(String),
    New,
    History,
    Restore(String),
    Clear,
    Model(Option<bool>),
    Status,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Message(line.to_string());
    };

    let (cmd, arg) = match rest.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (rest, ""),
    };

    match cmd.to_lowercase().as_str() {
        "upload" | "u" if !arg.is_empty() => {
            Command::Upload(arg.split_whitespace().map(str::to_string).collect())
        }
        "upload" | "u" => Command::Invalid("usage: /upload <path|url>...".into()),
        "docs" | "d" => Command::Docs,
        "preview" if !arg.is_empty() => Command::Preview(arg.to_string()),
        "preview" => Command::Invalid("usage: /preview <name>".into()),
        "new" => Command::New,
        "history" => Command::History,
        "restore" if !arg.is_empty() => Command::Restore(arg.to_string()),
        "restore" => Command::Invalid("usage: /restore <id>".into()),
        "clear" => Command::Clear,
        "model" => match arg.to_lowercase().as_str() {
            "" => Command::Model(None),
            "on" => Command::Model(Some(true)),
            "off" => Command::Model(Some(false)),
            _ => Command::Invalid("usage: /model on|off".into()),
        },
        "status" => Command::Status,
        "help" | "h" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => Command::Invalid(format!("unknown command '/{other}', try /help")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Spinners carry the user-facing feedback, so library INFO logs are
    // hidden unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn IngestProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let service = ChatService::new(config).context("Failed to start chat service")?;
    let mut session = service.new_session();

    if !cli.files.is_empty() {
        session = upload_inputs(&service, session, &cli.files, &cli).await;
    }

    if let Some(ref prompt) = cli.prompt {
        let resp = ask(&service, session, prompt, &cli).await;
        print_reply(&resp.session, &resp.reply, &resp.source, &cli)?;
        return Ok(());
    }

    if !cli.quiet {
        eprintln!(
            "{} {}  {}",
            cyan("◆"),
            bold("doc2chat"),
            dim(&format!("session {} · /help for commands", session.id))
        );
    }
    repl(&service, session, &cli).await
}

/// Map CLI args to `ChatConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ChatConfig> {
    let mut builder = ChatConfig::builder()
        .base_url(&cli.ollama_url)
        .model(&cli.model)
        .probe_timeout_ms(cli.probe_timeout_ms)
        .generate_timeout_secs(cli.timeout)
        .max_context_chars(cli.max_context_chars)
        .inference_enabled(!cli.offline)
        .tesseract_command(&cli.tesseract)
        .ocr_language(&cli.ocr_lang)
        .pdf_ocr_fallback(cli.pdf_ocr)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.pdfium_path {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn repl(service: &ChatService, mut session: Session, cli: &Cli) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if !cli.quiet {
            eprint!("{} ", bold("›"));
            io::stderr().flush().ok();
        }
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };

        match parse_command(&line) {
            Command::Empty => {}
            Command::Message(text) => {
                let resp = ask(service, session, &text, cli).await;
                print_reply(&resp.session, &resp.reply, &resp.source, cli)?;
                session = resp.session;
            }
            Command::Upload(inputs) => {
                session = upload_inputs(service, session, &inputs, cli).await;
            }
            Command::Docs => print_documents(&session),
            Command::Preview(name) => match session.documents.find(&name) {
                Some(result) => print_document(result, DETAIL_PREVIEW_CHARS),
                None => eprintln!("{} no active document named '{}'", red("✗"), name),
            },
            Command::New => {
                match session.new_chat() {
                    Some(id) => eprintln!("{} chat archived as {}", green("✔"), bold(&id)),
                    None => eprintln!("{} nothing to archive", dim("·")),
                }
                eprintln!("{} new chat started", cyan("◆"));
            }
            Command::History => print_history(&session),
            Command::Restore(id) => {
                if session.restore_chat(&id) {
                    eprintln!(
                        "{} restored {} ({} messages)",
                        green("✔"),
                        bold(&id),
                        session.conversation.len()
                    );
                } else {
                    eprintln!("{} no archived chat with id '{}'", red("✗"), id);
                }
            }
            Command::Clear => {
                session.clear_history();
                eprintln!("{} chats and documents cleared", green("✔"));
            }
            Command::Model(state) => {
                if let Some(on) = state {
                    session.inference_enabled = on;
                }
                let label = if session.inference_enabled { green("on") } else { yellow("off") };
                eprintln!("model server: {label}");
            }
            Command::Status => print_status(service, &session).await,
            Command::Help => eprintln!("{AFTER_HELP}"),
            Command::Quit => break,
            Command::Invalid(msg) => eprintln!("{} {}", red("✗"), msg),
        }
    }

    Ok(())
}

/// Load and ingest each input; unreadable inputs are reported and skipped.
async fn upload_inputs(
    service: &ChatService,
    session: Session,
    inputs: &[String],
    cli: &Cli,
) -> Session {
    let mut docs = Vec::with_capacity(inputs.len());
    for input in inputs {
        match load_upload(input, service.config().download_timeout_secs).await {
            Ok(doc) => docs.push(doc),
            Err(e) => eprintln!("{} {}", red("✗"), e),
        }
    }
    if docs.is_empty() {
        return session;
    }

    let resp = service.upload_all(session, docs).await;
    if !cli.quiet && !cli.json {
        for outcome in &resp.outcomes {
            print_outcome(outcome);
        }
    }
    resp.session
}

async fn ask(
    service: &ChatService,
    session: Session,
    prompt: &str,
    cli: &Cli,
) -> doc2chat::ChatResponse {
    let bar = (!cli.quiet && !cli.no_progress && !cli.json && session.inference_enabled)
        .then(|| spinner("Thinking", &service.config().model));
    let resp = service.send(session, prompt).await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    resp
}

fn print_reply(session: &Session, reply: &str, source: &ReplySource, cli: &Cli) -> Result<()> {
    if cli.json {
        let value = json!({
            "session": session.id,
            "reply": reply,
            "source": source,
            "documents": session.documents.active(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to serialise reply")?
        );
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(reply.as_bytes())
        .context("Failed to write to stdout")?;
    if !reply.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }

    if !cli.quiet && !source.is_model() {
        eprintln!("{}", dim("(model server unavailable, canned reply)"));
    }
    Ok(())
}

fn status_mark(result: &ExtractionResult) -> String {
    match result.status {
        ExtractionStatus::Ok => green("✓"),
        ExtractionStatus::Empty => yellow("○"),
        ExtractionStatus::Unsupported => yellow("–"),
        ExtractionStatus::Failed(_) => red("✗"),
    }
}

fn print_outcome(outcome: &IngestOutcome) {
    let result = &outcome.result;
    let note = if outcome.duplicate {
        dim("already processed")
    } else if result.is_ok() {
        dim(&format!("{} chars", result.text.chars().count()))
    } else {
        result.display_text().to_string()
    };
    eprintln!(
        "{} {} {} {}",
        status_mark(result),
        bold(result.name()),
        dim(&format!(
            "({}, {})",
            result.kind().label(),
            result.source.size_label()
        )),
        note
    );
}

fn print_document(result: &ExtractionResult, limit: usize) {
    eprintln!(
        "{} {}  {}",
        status_mark(result),
        bold(result.name()),
        dim(&format!(
            "{} · {} · {}",
            result.kind().label(),
            result.source.size_label(),
            result.timestamp_label()
        ))
    );
    for line in result.preview(limit).lines() {
        eprintln!("    {line}");
    }
}

fn print_documents(session: &Session) {
    if session.documents.is_empty() {
        eprintln!("{} no documents attached", dim("·"));
        return;
    }
    for result in session.documents.active() {
        print_document(result, LIST_PREVIEW_CHARS);
    }
}

fn print_history(session: &Session) {
    let mut any = false;
    for chat in session.recent_chats() {
        any = true;
        eprintln!(
            "  {}  {}  {}",
            bold(&chat.id),
            dim(&chat.timestamp),
            chat.title
        );
    }
    if !any {
        eprintln!("{} no archived chats", dim("·"));
    }
}

async fn print_status(service: &ChatService, session: &Session) {
    let registry = service.registry();
    for kind in DocumentKind::SUPPORTED {
        let state = if registry.is_available(kind) {
            green("ready")
        } else {
            yellow("unavailable")
        };
        eprintln!("  {:<14} {}", kind.label(), state);
    }

    let server = if !session.inference_enabled {
        yellow("off")
    } else if service.backend_available().await {
        green("reachable")
    } else {
        red("unreachable")
    };
    eprintln!(
        "  {:<14} {} {}",
        "Model server",
        server,
        dim(&format!(
            "({} @ {})",
            service.config().model,
            service.config().base_url
        ))
    );
    eprintln!(
        "  {:<14} {} · {} document(s) · {} message(s) · {} archived",
        "Session",
        session.id,
        session.documents.len(),
        session.conversation.len(),
        session.archived_len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_messages() {
        assert_eq!(
            parse_command("  hello there "),
            Command::Message("hello there".into())
        );
        assert_eq!(parse_command("   "), Command::Empty);
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(
            parse_command("/upload a.txt  b.pdf"),
            Command::Upload(vec!["a.txt".into(), "b.pdf".into()])
        );
        assert_eq!(
            parse_command("/preview my notes.txt"),
            Command::Preview("my notes.txt".into())
        );
        assert_eq!(
            parse_command("/restore 1a2b3c4d"),
            Command::Restore("1a2b3c4d".into())
        );
        assert_eq!(parse_command("/model OFF"), Command::Model(Some(false)));
        assert_eq!(parse_command("/model"), Command::Model(None));
    }

    #[test]
    fn bad_commands_explain_themselves() {
        assert!(matches!(parse_command("/upload"), Command::Invalid(_)));
        assert!(matches!(parse_command("/model maybe"), Command::Invalid(_)));
        assert!(matches!(parse_command("/frobnicate"), Command::Invalid(m) if m.contains("/help")));
    }

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::try_parse_from(["doc2chat", "notes.txt"]).unwrap();
        assert_eq!(cli.files, ["notes.txt"]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.model, "llama3.2");
        assert!(config.inference_enabled);
    }
}

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

mod chunk;
mod config;
mod io;
mod limit;
mod llm;
mod render;
mod scanner;
mod util;

use crate::render as render_mod;
use anyhow::Context as _;
use chunk::{Chunk, ContextChunker, TARGET_CHUNK_TOKENS};
use limit::{TokenRateLimiter, GROQ_TOKENS_PER_MINUTE};
use llm::{ModelProviderAdapter, ProviderRegistry};
use scanner::{Document, FileCategory, RepositoryScan};
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "drla", version, about = "AI assistant for Drools rule repositories", long_about = None)]
struct Cli {
    /// Output JSON instead of human-readable text
    #[arg(long = "json", global = true)]
    json: bool,

    /// Repository to operate on (default: configured repository, then cwd)
    #[arg(long = "repo", global = true)]
    repo: Option<PathBuf>,

    /// Model override
    #[arg(short = 'm', long = "model", global = true)]
    model: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Timeout (seconds) for network requests
    #[arg(long = "timeout", global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// First-time interactive setup
    Init(InitArgs),

    /// Scan a repository for rule-engine artifacts
    Scan(ScanArgs),

    /// List scanned files by kind
    List(ListArgs),

    /// Print a file's content
    View(ViewArgs),

    /// Edit a rule file (creates a new one from a template if omitted)
    Edit(EditArgs),

    /// Generate a DRL rule from repository context and requirements
    Generate(GenerateArgs),

    /// Analyze a DRL rule against repository context
    Analyze(AnalyzeArgs),

    /// Show the assembled repository context
    Context(ContextArgs),

    /// Manage persisted settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Interactive mode with a drl> prompt
    Shell(ShellArgs),
}

#[derive(Args, Debug, Clone)]
struct InitArgs {
    /// Non-interactive: Groq API key value
    #[arg(long = "api-key")]
    api_key: Option<String>,
    /// Non-interactive: default repository path
    #[arg(long = "repository")]
    repository: Option<PathBuf>,
    /// Non-interactive: preferred editor
    #[arg(long)]
    editor: Option<String>,
    /// Validate credentials now (non-interactive). Interactive mode will prompt.
    #[arg(long)]
    validate: bool,
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    /// Repository path (overrides --repo and the configured default)
    path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct ListArgs {
    /// Which files to list: all, java, drl, gdst
    #[arg(default_value = "all")]
    kind: String,
    /// Repository path (overrides --repo and the configured default)
    path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct ViewArgs {
    /// File to print
    file: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct EditArgs {
    /// File to edit; a new timestamped rule file is created when omitted
    file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct GenerateArgs {
    /// Rule requirements; read from stdin when omitted
    #[arg(short = 'r', long)]
    requirements: Option<String>,
    /// Write the generated rule here instead of printing it
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
    /// Provider to use (groq, mock)
    #[arg(long, default_value = "groq")]
    provider: String,
}

#[derive(Args, Debug, Clone)]
struct AnalyzeArgs {
    /// Rule file to analyze; read from stdin when omitted
    file: Option<PathBuf>,
    /// Provider to use (groq, mock)
    #[arg(long, default_value = "groq")]
    provider: String,
}

#[derive(Args, Debug, Clone)]
struct ContextArgs {
    /// Character limit for display
    #[arg(short = 'l', long, default_value_t = 1000)]
    limit: usize,
}

#[derive(Subcommand, Debug, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set the Groq API key
    SetApiKey {
        value: Option<String>,
    },
    /// Set the default repository path
    SetRepository {
        path: PathBuf,
    },
    /// Set the preferred text editor
    SetEditor {
        name: String,
    },
}

#[derive(Args, Debug, Clone)]
struct ShellArgs {
    /// Provider to use for AI commands inside the shell (groq, mock)
    #[arg(long, default_value = "groq")]
    provider: String,
}

#[derive(Debug, Clone)]
struct GlobalOpts {
    json: bool,
    repo: Option<PathBuf>,
    model: Option<String>,
    verbose: u8,
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Cli { json, repo, model, verbose, timeout_secs, command } = cli;
    let globals = GlobalOpts { json, repo, model, verbose, timeout_secs };

    let result = match command {
        Commands::Init(args) => cmd_init(&globals, args).await,
        Commands::Scan(args) => cmd_scan(&globals, args).await,
        Commands::List(args) => cmd_list(&globals, args).await,
        Commands::View(args) => cmd_view(&globals, args).await,
        Commands::Edit(args) => cmd_edit(&globals, args).await,
        Commands::Generate(args) => cmd_generate(&globals, args).await,
        Commands::Analyze(args) => cmd_analyze(&globals, args).await,
        Commands::Context(args) => cmd_context(&globals, args).await,
        Commands::Config { command } => cmd_config(&globals, command).await,
        Commands::Shell(args) => cmd_shell(&globals, args).await,
    };

    if let Err(e) = result {
        if globals.json {
            let (code, hint) = classify_error(&e);
            render_mod::print_json_error(code, &e.to_string(), hint);
        } else {
            eprintln!("{}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn classify_error(e: &anyhow::Error) -> (&'static str, Option<&'static str>) {
    let msg = e.to_string();
    if msg.contains("file not found") || msg.contains("does not exist") {
        return ("file_not_found", Some("check the path"));
    }
    if msg.contains("empty requirements") || msg.contains("empty rule") {
        return ("missing_input", None);
    }
    if msg.contains("invalid kind") {
        return ("invalid_args", None);
    }
    if msg.contains("GROQ_API_KEY") || msg.contains("missing API key") {
        return ("missing_api_key", Some("run `drla init` or set GROQ_API_KEY in env or .env"));
    }
    if msg.contains("exceeds rate limit capacity") {
        return ("rate_capacity_exceeded", Some("reduce the request or context size"));
    }
    if msg.contains("timed out") || msg.contains("timeout") {
        return ("timeout", Some("try increasing --timeout or check network"));
    }
    if msg.contains("unsupported provider") {
        return ("provider_unsupported", None);
    }
    let lower = msg.to_lowercase();
    if lower.contains("network") || lower.contains("dns") || lower.contains("connection") {
        return ("network_error", None);
    }
    ("unknown", None)
}

fn map_provider_error(e: anyhow::Error) -> anyhow::Error {
    let msg = e.to_string();
    if msg.contains("GROQ_API_KEY") {
        return anyhow::anyhow!("missing GROQ_API_KEY (set in .env or environment, or run `drla init`)");
    }
    if msg.contains("timed out") {
        return anyhow::anyhow!("request timed out; try --timeout or check network");
    }
    e
}

fn effective_model(globals: &GlobalOpts) -> String {
    globals.model.clone().unwrap_or_else(|| llm::DEFAULT_MODEL.to_string())
}

fn resolve_repo(globals: &GlobalOpts, override_path: Option<&Path>, cfg: &config::AppConfig) -> anyhow::Result<PathBuf> {
    let repo = override_path
        .map(|p| p.to_path_buf())
        .or_else(|| globals.repo.clone())
        .or_else(|| cfg.default_repository.clone())
        .map(Ok)
        .unwrap_or_else(std::env::current_dir)?;
    if !repo.exists() {
        anyhow::bail!("repository path does not exist: {}", repo.display());
    }
    Ok(repo)
}

async fn cmd_init(globals: &GlobalOpts, mut args: InitArgs) -> anyhow::Result<()> {
    use std::io::{IsTerminal as _, Write};

    let path = config::default_config_path()?;
    let mut cfg = config::load_config_if_exists(&path)?.unwrap_or_default();

    let stdin_is_tty = std::io::stdin().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let interactive = stdin_is_tty && stdout_is_tty;

    if args.api_key.is_none() {
        if let Ok(val) = std::env::var("GROQ_API_KEY") {
            if !val.trim().is_empty() {
                args.api_key = Some(val);
            }
        }
        if args.api_key.is_none() && interactive {
            print!("Groq API key (leave blank to skip): ");
            std::io::stdout().flush().ok();
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            let v = line.trim();
            if !v.is_empty() { args.api_key = Some(v.to_string()); }
        }
    }

    if args.repository.is_none() && interactive {
        let cwd = std::env::current_dir()?;
        print!("Default repository (default: {}): ", cwd.display());
        std::io::stdout().flush().ok();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let p = line.trim();
        args.repository = Some(if p.is_empty() { cwd } else { PathBuf::from(p) });
    }

    if args.editor.is_none() && interactive {
        let current = cfg.editor_command();
        print!("Preferred editor (default: {}): ", current);
        std::io::stdout().flush().ok();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let e = line.trim();
        args.editor = Some(if e.is_empty() { current } else { e.to_string() });
    }

    let mut do_validate = args.validate;
    if interactive && !do_validate {
        print!("Validate credentials now? [y/N]: ");
        std::io::stdout().flush().ok();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let a = line.trim().to_lowercase();
        do_validate = a == "y" || a == "yes";
    }
    if do_validate {
        llm::validate_groq_credentials(args.api_key.as_deref(), None, globals.timeout_secs).await?;
    }

    if let Some(key) = args.api_key { cfg.groq_api_key = Some(key); }
    if let Some(repo) = args.repository { cfg.default_repository = Some(repo); }
    if let Some(editor) = args.editor { cfg.editor = Some(editor); }

    config::write_config(&path, &cfg)?;
    println!("config written: {}", path.display());
    Ok(())
}

async fn cmd_scan(globals: &GlobalOpts, args: ScanArgs) -> anyhow::Result<()> {
    let cfg = config::load_or_default()?;
    let repo = resolve_repo(globals, args.path.as_deref(), &cfg)?;
    if !globals.json {
        println!("Scanning repository: {}", repo.display());
    }
    let scan = scanner::scan_repository(&repo)?;
    let summary = scan.summary();
    if globals.json {
        render_mod::print_json(&summary);
        return Ok(());
    }
    println!(
        "Found: {} Java model files, {} DRL files, {} GDST files",
        summary.java_models, summary.rule_files, summary.decision_tables
    );
    if summary.is_empty() {
        println!("No relevant files found in the repository.");
    }
    Ok(())
}

fn category_for_kind(kind: &str) -> anyhow::Result<Option<FileCategory>> {
    match kind.to_lowercase().as_str() {
        "all" => Ok(None),
        "java" => Ok(Some(FileCategory::JavaModel)),
        "drl" => Ok(Some(FileCategory::RuleFile)),
        "gdst" => Ok(Some(FileCategory::DecisionTable)),
        other => anyhow::bail!("invalid kind '{}'; expected all, java, drl or gdst", other),
    }
}

async fn cmd_list(globals: &GlobalOpts, args: ListArgs) -> anyhow::Result<()> {
    let cfg = config::load_or_default()?;
    let repo = resolve_repo(globals, args.path.as_deref(), &cfg)?;
    let wanted = category_for_kind(&args.kind)?;
    let scan = scanner::scan_repository(&repo)?;

    if globals.json {
        #[derive(serde::Serialize)]
        struct Row<'a> {
            path: String,
            kind: &'a str,
            size: u64,
        }
        let rows: Vec<Row> = scan
            .files
            .iter()
            .filter(|f| wanted.map_or(true, |w| f.category == w))
            .map(|f| Row {
                path: f.path.display().to_string(),
                kind: f.category.label(),
                size: f.size,
            })
            .collect();
        render_mod::print_json(&rows);
        return Ok(());
    }

    let sections = [
        (FileCategory::JavaModel, "=== Java Model Files ==="),
        (FileCategory::RuleFile, "=== DRL Rule Files ==="),
        (FileCategory::DecisionTable, "=== GDST Decision Tables ==="),
    ];
    let mut printed_any = false;
    for (category, header) in sections {
        if wanted.is_some() && wanted != Some(category) {
            continue;
        }
        let files = scan.files_in(category);
        if files.is_empty() {
            continue;
        }
        printed_any = true;
        println!("\n{}", header);
        for (i, f) in files.iter().enumerate() {
            println!(
                "{:2}. {} ({}) - {} bytes",
                i + 1,
                io::filename_only(&f.path),
                f.path.display(),
                f.size
            );
        }
    }
    if !printed_any {
        println!("No matching files found. Run 'drla scan' to check the repository.");
    }
    Ok(())
}

async fn cmd_view(globals: &GlobalOpts, args: ViewArgs) -> anyhow::Result<()> {
    if !args.file.exists() {
        anyhow::bail!("file not found: {}", args.file.display());
    }
    let content = io::read_file_to_string_async(&args.file).await?;
    if globals.json {
        #[derive(serde::Serialize)]
        struct Out<'a> {
            file: String,
            content: &'a str,
        }
        render_mod::print_json(&Out { file: args.file.display().to_string(), content: &content });
        return Ok(());
    }
    println!("\n=== Content of {} ===", io::filename_only(&args.file));
    println!("{}", content);
    println!("{}", "=".repeat(50));
    Ok(())
}

async fn cmd_edit(_globals: &GlobalOpts, args: EditArgs) -> anyhow::Result<()> {
    let cfg = config::load_or_default()?;
    let path = match args.file {
        Some(p) => p,
        None => {
            let p = PathBuf::from(io::timestamped_rule_name("new_rule"));
            io::write_file_async(&p, io::new_rule_template()).await?;
            println!("Created {} from template", p.display());
            p
        }
    };
    let editor = cfg.editor_command();
    io::launch_editor(&editor, &path)?;
    println!("File '{}' edited successfully!", path.display());
    Ok(())
}

fn read_stdin_to_end(prompt: &str) -> anyhow::Result<String> {
    use std::io::{IsTerminal as _, Read as _};
    if std::io::stdin().is_terminal() {
        eprintln!("{}", prompt);
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

async fn load_documents(repo: &Path, verbose: u8) -> anyhow::Result<Vec<Document>> {
    let scan = scanner::scan_repository(repo)?;
    let docs = scan.build_documents()?;
    if docs.is_empty() && verbose > 0 {
        eprintln!("warning: no repository context found under {}", repo.display());
    }
    Ok(docs)
}

/// Rate-limit one request by its token estimate, then send it.
async fn send_limited(
    adapter: &dyn ModelProviderAdapter,
    limiter: &mut TokenRateLimiter,
    prompt: String,
    model: &str,
    cfg: &config::AppConfig,
    verbose: u8,
) -> anyhow::Result<llm::LlmResponse> {
    let estimate = util::estimate_tokens_for_text(&prompt);
    limiter.acquire(estimate).await?;
    if verbose > 0 {
        eprintln!(
            "request admitted: ~{} tokens, window {}/{}",
            estimate,
            limiter.consumed(),
            limiter.capacity()
        );
    }
    let req = llm::LlmRequest {
        model: model.to_string(),
        messages: vec![llm::ChatMessage::user(prompt)],
        api_base: None,
        api_key: cfg.groq_api_key.clone(),
    };
    adapter.send(req).await.map_err(map_provider_error)
}

/// Turn the chunked context into the string embedded in the final prompt.
///
/// A single chunk is inlined verbatim. Multiple chunks are each sent as
/// their own rate-limited request asking for a compact digest, and the
/// ordered digests stand in for the raw context.
async fn prepare_context(
    adapter: &dyn ModelProviderAdapter,
    limiter: &mut TokenRateLimiter,
    chunks: &[Chunk],
    model: &str,
    cfg: &config::AppConfig,
    verbose: u8,
) -> anyhow::Result<String> {
    match chunks {
        [] => Ok(String::new()),
        [only] => Ok(only.text()),
        many => {
            let mut digests = Vec::with_capacity(many.len());
            for chunk in many {
                if verbose > 0 {
                    eprintln!(
                        "digesting context part {}/{} (~{} tokens)",
                        chunk.index, chunk.total, chunk.tokens
                    );
                }
                let prompt = llm::build_digest_prompt(&chunk.text(), chunk.index, chunk.total);
                let res = send_limited(adapter, limiter, prompt, model, cfg, verbose).await?;
                digests.push(format!(
                    "--- context digest {}/{} ---\n{}",
                    chunk.index,
                    chunk.total,
                    res.content.trim()
                ));
            }
            Ok(digests.join("\n\n"))
        }
    }
}

async fn generate_rule_via_provider(
    globals: &GlobalOpts,
    cfg: &config::AppConfig,
    docs: &[Document],
    requirements: &str,
    provider: &str,
) -> anyhow::Result<String> {
    if provider.to_lowercase() == "mock" {
        return Ok(format!("[stub rule] {}", requirements.trim()));
    }
    if provider.to_lowercase() != "groq" {
        anyhow::bail!("unsupported provider: {}", provider);
    }
    let model = effective_model(globals);
    let registry = ProviderRegistry::new_with_timeout(Duration::from_secs(globals.timeout_secs.unwrap_or(60)))?;
    let adapter = registry.get("groq").context("unsupported provider: groq")?;

    let chunker = ContextChunker::new(TARGET_CHUNK_TOKENS)?;
    let chunks = chunker.chunk_documents(docs);
    let mut limiter = TokenRateLimiter::new(GROQ_TOKENS_PER_MINUTE)?;

    let context = prepare_context(&**adapter, &mut limiter, &chunks, &model, cfg, globals.verbose).await?;
    let prompt = llm::build_generate_prompt(&context, requirements);
    let res = send_limited(&**adapter, &mut limiter, prompt, &model, cfg, globals.verbose).await?;
    llm::clean_model_output(&res.content)
}

async fn analyze_rule_via_provider(
    globals: &GlobalOpts,
    cfg: &config::AppConfig,
    docs: &[Document],
    rule_content: &str,
    provider: &str,
) -> anyhow::Result<render_mod::RuleAnalysis> {
    if provider.to_lowercase() == "mock" {
        let first_line = rule_content.lines().next().unwrap_or("").trim().to_string();
        return Ok(render_mod::RuleAnalysis {
            summary: format!("[stub analysis] {}", first_line),
            issues: vec![],
            suggestions: vec![],
            compatibility: "unknown".to_string(),
            performance: "unknown".to_string(),
        });
    }
    if provider.to_lowercase() != "groq" {
        anyhow::bail!("unsupported provider: {}", provider);
    }
    let model = effective_model(globals);
    let registry = ProviderRegistry::new_with_timeout(Duration::from_secs(globals.timeout_secs.unwrap_or(60)))?;
    let adapter = registry.get("groq").context("unsupported provider: groq")?;

    let chunker = ContextChunker::new(TARGET_CHUNK_TOKENS)?;
    let chunks = chunker.chunk_documents(docs);
    let mut limiter = TokenRateLimiter::new(GROQ_TOKENS_PER_MINUTE)?;

    let context = prepare_context(&**adapter, &mut limiter, &chunks, &model, cfg, globals.verbose).await?;
    let prompt = llm::build_analyze_prompt(&context, rule_content);
    let res = send_limited(&**adapter, &mut limiter, prompt, &model, cfg, globals.verbose).await?;
    let cleaned = llm::clean_model_output(&res.content)?;
    Ok(render_mod::parse_analysis(&cleaned))
}

async fn cmd_generate(globals: &GlobalOpts, args: GenerateArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cfg = config::load_or_default()?;
    let requirements = match args.requirements {
        Some(r) => r,
        None => read_stdin_to_end("Enter your rule requirements (press Ctrl+D when finished):")?,
    };
    if requirements.trim().is_empty() {
        anyhow::bail!("empty requirements; describe the rule to generate");
    }
    let repo = resolve_repo(globals, None, &cfg)?;
    let docs = load_documents(&repo, globals.verbose).await?;

    let rule = generate_rule_via_provider(globals, &cfg, &docs, &requirements, &args.provider).await?;

    if let Some(path) = args.output {
        io::write_file_async(&path, &rule).await?;
        if globals.json {
            #[derive(serde::Serialize)]
            struct Out {
                saved: String,
            }
            render_mod::print_json(&Out { saved: path.display().to_string() });
        } else {
            println!("Generated rule saved to: {}", path.display());
        }
        return Ok(());
    }

    if globals.json {
        #[derive(serde::Serialize)]
        struct Out<'a> {
            model: String,
            rule: &'a str,
        }
        render_mod::print_json(&Out { model: effective_model(globals), rule: &rule });
    } else {
        println!("\n=== Generated Rule ===");
        println!("{}", rule);
        println!("{}", "=".repeat(50));
    }
    Ok(())
}

async fn cmd_analyze(globals: &GlobalOpts, args: AnalyzeArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cfg = config::load_or_default()?;
    let rule_content = match &args.file {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("file not found: {}", path.display());
            }
            io::read_file_to_string_async(path).await?
        }
        None => read_stdin_to_end("Enter the DRL rule to analyze (press Ctrl+D when finished):")?,
    };
    if rule_content.trim().is_empty() {
        anyhow::bail!("empty rule; provide rule content to analyze");
    }
    let repo = resolve_repo(globals, None, &cfg)?;
    let docs = load_documents(&repo, globals.verbose).await?;

    let analysis = analyze_rule_via_provider(globals, &cfg, &docs, &rule_content, &args.provider).await?;

    if globals.json {
        render_mod::print_json(&analysis);
    } else {
        println!("\n=== Rule Analysis ===");
        render_mod::render_analysis_text(&analysis);
        println!("{}", "=".repeat(50));
    }
    Ok(())
}

async fn cmd_context(globals: &GlobalOpts, args: ContextArgs) -> anyhow::Result<()> {
    let cfg = config::load_or_default()?;
    let repo = resolve_repo(globals, None, &cfg)?;
    let docs = load_documents(&repo, globals.verbose).await?;
    if docs.is_empty() {
        anyhow::bail!("no repository context available; check the repository path");
    }
    let full: String = docs.iter().map(|d| d.text.as_str()).collect::<Vec<_>>().join("\n");
    let total_chars = full.chars().count();

    if globals.json {
        #[derive(serde::Serialize)]
        struct Out {
            total_chars: usize,
            shown_chars: usize,
            context: String,
        }
        let shown: String = full.chars().take(args.limit).collect();
        render_mod::print_json(&Out { total_chars, shown_chars: shown.chars().count(), context: shown });
        return Ok(());
    }

    println!("=== Repository Context ===");
    if total_chars > args.limit {
        let shown: String = full.chars().take(args.limit).collect();
        println!("{}", shown);
        println!(
            "\n... (truncated, showing first {} characters of {} total)",
            args.limit, total_chars
        );
    } else {
        println!("{}", full);
    }
    println!("{}", "=".repeat(50));
    Ok(())
}

async fn cmd_config(globals: &GlobalOpts, command: ConfigCommands) -> anyhow::Result<()> {
    use std::io::{IsTerminal as _, Write};

    let path = config::default_config_path()?;
    let mut cfg = config::load_config_if_exists(&path)?.unwrap_or_default();

    match command {
        ConfigCommands::Show => {
            if globals.json {
                #[derive(serde::Serialize)]
                struct Out {
                    groq_api_key: Option<String>,
                    default_repository: Option<String>,
                    editor: String,
                    config_file: String,
                }
                render_mod::print_json(&Out {
                    groq_api_key: cfg.groq_api_key.as_deref().map(util::mask_secret),
                    default_repository: cfg.default_repository.as_ref().map(|p| p.display().to_string()),
                    editor: cfg.editor_command(),
                    config_file: path.display().to_string(),
                });
                return Ok(());
            }
            println!("=== Current Configuration ===");
            match &cfg.groq_api_key {
                Some(key) => println!("Groq API Key: {}", util::mask_secret(key)),
                None => println!("Groq API Key: Not set"),
            }
            match &cfg.default_repository {
                Some(repo) => println!("Default Repository: {}", repo.display()),
                None => println!("Default Repository: Not set"),
            }
            println!("Editor: {}", cfg.editor_command());
            println!("Config File: {}", path.display());
        }
        ConfigCommands::SetApiKey { value } => {
            let key = match value {
                Some(v) => v,
                None => {
                    if !std::io::stdin().is_terminal() {
                        anyhow::bail!("no API key provided");
                    }
                    print!("Enter your Groq API key: ");
                    std::io::stdout().flush().ok();
                    let mut line = String::new();
                    std::io::stdin().read_line(&mut line)?;
                    line.trim().to_string()
                }
            };
            if key.is_empty() {
                anyhow::bail!("no API key provided");
            }
            cfg.groq_api_key = Some(key);
            config::write_config(&path, &cfg)?;
            println!("API key saved successfully!");
        }
        ConfigCommands::SetRepository { path: repo } => {
            if !repo.exists() {
                anyhow::bail!("repository path does not exist: {}", repo.display());
            }
            cfg.default_repository = Some(repo.clone());
            config::write_config(&path, &cfg)?;
            println!("Default repository set to: {}", repo.display());
        }
        ConfigCommands::SetEditor { name } => {
            cfg.editor = Some(name.clone());
            config::write_config(&path, &cfg)?;
            println!("Editor set to: {}", name);
        }
    }
    Ok(())
}

const SHELL_HELP: &str = r#"
=== DRL Assistant Commands ===

Repository Management:
  scan [path]           - Scan repository for rule-engine files
  list [type]           - List found files (type: all, java, drl, gdst)
  context [limit]       - Show repository context (default limit: 1000 chars)

File Operations:
  view <file>           - View file content
  edit [file]           - Edit file (creates new if not specified)

AI Operations:
  generate [output]     - Generate DRL rule from requirements
  analyze [file]        - Analyze DRL rule

Configuration:
  config show           - Show current configuration

General:
  help                  - Show this help
  quit/exit/q           - Exit the application
"#;

struct ShellState {
    scan: Option<RepositoryScan>,
    docs: Vec<Document>,
}

async fn cmd_shell(globals: &GlobalOpts, args: ShellArgs) -> anyhow::Result<()> {
    use std::io::Write;

    dotenvy::dotenv().ok();
    let cfg = config::load_or_default()?;
    let mut state = ShellState { scan: None, docs: Vec::new() };

    println!("=== DRL Assistant - Interactive Mode ===");
    println!("Type 'help' for available commands or 'quit' to exit");

    loop {
        print!("\ndrl> ");
        std::io::stdout().flush().ok();
        let mut input = String::new();
        let n = std::io::stdin().read_line(&mut input)?;
        if n == 0 {
            println!("Goodbye!");
            break;
        }
        let words: Vec<&str> = input.split_whitespace().collect();
        let Some(&cmd) = words.first() else { continue };

        let result = match cmd.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye!");
                break;
            }
            "help" => {
                println!("{}", SHELL_HELP);
                Ok(())
            }
            "scan" => shell_scan(globals, &cfg, words.get(1).copied(), &mut state).await,
            "list" => shell_list(&state, words.get(1).copied().unwrap_or("all")),
            "view" => match words.get(1) {
                Some(file) => cmd_view(globals, ViewArgs { file: PathBuf::from(file) }).await,
                None => {
                    println!("Usage: view <file_path>");
                    Ok(())
                }
            },
            "edit" => {
                cmd_edit(globals, EditArgs { file: words.get(1).map(PathBuf::from) }).await
            }
            "generate" => {
                shell_generate(globals, &cfg, &args.provider, words.get(1).copied(), &mut state).await
            }
            "analyze" => shell_analyze(globals, &cfg, &args.provider, words.get(1).copied(), &mut state).await,
            "context" => {
                let limit = words
                    .get(1)
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(1000);
                shell_context(&state, limit)
            }
            "config" => cmd_config(globals, ConfigCommands::Show).await,
            other => {
                println!("Unknown command: {}. Type 'help' for available commands.", other);
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("Error: {}", e);
        }
    }
    Ok(())
}

async fn shell_scan(
    globals: &GlobalOpts,
    cfg: &config::AppConfig,
    path_arg: Option<&str>,
    state: &mut ShellState,
) -> anyhow::Result<()> {
    let override_path = path_arg.map(PathBuf::from);
    let repo = resolve_repo(globals, override_path.as_deref(), cfg)?;
    println!("Scanning repository: {}", repo.display());
    let scan = scanner::scan_repository(&repo)?;
    let summary = scan.summary();
    println!(
        "Found: {} Java model files, {} DRL files, {} GDST files",
        summary.java_models, summary.rule_files, summary.decision_tables
    );
    if summary.is_empty() {
        println!("No relevant files found in the repository.");
        state.scan = Some(scan);
        state.docs = Vec::new();
        return Ok(());
    }
    state.docs = scan.build_documents()?;
    state.scan = Some(scan);
    println!("Repository scan completed successfully!");
    Ok(())
}

fn shell_list(state: &ShellState, kind: &str) -> anyhow::Result<()> {
    let Some(scan) = &state.scan else {
        println!("Please scan a repository first using 'scan' command");
        return Ok(());
    };
    let wanted = category_for_kind(kind)?;
    let sections = [
        (FileCategory::JavaModel, "=== Java Model Files ==="),
        (FileCategory::RuleFile, "=== DRL Rule Files ==="),
        (FileCategory::DecisionTable, "=== GDST Decision Tables ==="),
    ];
    for (category, header) in sections {
        if wanted.is_some() && wanted != Some(category) {
            continue;
        }
        let files = scan.files_in(category);
        if files.is_empty() {
            continue;
        }
        println!("\n{}", header);
        for (i, f) in files.iter().enumerate() {
            println!(
                "{:2}. {} ({}) - {} bytes",
                i + 1,
                io::filename_only(&f.path),
                f.path.display(),
                f.size
            );
        }
    }
    Ok(())
}

fn shell_context(state: &ShellState, limit: usize) -> anyhow::Result<()> {
    if state.docs.is_empty() {
        println!("No repository context available. Please scan a repository first.");
        return Ok(());
    }
    let full: String = state.docs.iter().map(|d| d.text.as_str()).collect::<Vec<_>>().join("\n");
    let total_chars = full.chars().count();
    println!("=== Repository Context ===");
    if total_chars > limit {
        let shown: String = full.chars().take(limit).collect();
        println!("{}", shown);
        println!("\n... (truncated, showing first {} characters of {} total)", limit, total_chars);
    } else {
        println!("{}", full);
    }
    println!("{}", "=".repeat(50));
    Ok(())
}

/// Read multi-line input terminated by an empty line (or EOF).
fn read_lines_until_blank(prompt: &str) -> anyhow::Result<String> {
    println!("{}", prompt);
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        let n = std::io::stdin().read_line(&mut line)?;
        if n == 0 || line.trim().is_empty() {
            break;
        }
        lines.push(line.trim_end_matches('\n').to_string());
    }
    Ok(lines.join("\n"))
}

async fn shell_generate(
    globals: &GlobalOpts,
    cfg: &config::AppConfig,
    provider: &str,
    output_arg: Option<&str>,
    state: &mut ShellState,
) -> anyhow::Result<()> {
    if state.docs.is_empty() {
        println!("Warning: No repository context available. Consider scanning a repository first.");
    }
    let requirements = read_lines_until_blank("Enter your rule requirements (finish with an empty line):")?;
    if requirements.trim().is_empty() {
        anyhow::bail!("empty requirements; describe the rule to generate");
    }

    println!("Generating rule... This may take a moment.");
    let rule = generate_rule_via_provider(globals, cfg, &state.docs, &requirements, provider).await?;

    match output_arg {
        Some(path) => {
            let path = PathBuf::from(path);
            io::write_file_async(&path, &rule).await?;
            println!("Generated rule saved to: {}", path.display());
        }
        None => {
            println!("\n=== Generated Rule ===");
            println!("{}", rule);
            println!("{}", "=".repeat(50));
        }
    }
    Ok(())
}

async fn shell_analyze(
    globals: &GlobalOpts,
    cfg: &config::AppConfig,
    provider: &str,
    file_arg: Option<&str>,
    state: &mut ShellState,
) -> anyhow::Result<()> {
    let rule_content = match file_arg {
        Some(file) => {
            let path = PathBuf::from(file);
            if !path.exists() {
                anyhow::bail!("file not found: {}", path.display());
            }
            io::read_file_to_string_async(&path).await?
        }
        None => read_lines_until_blank("Enter the DRL rule to analyze (finish with an empty line):")?,
    };
    if rule_content.trim().is_empty() {
        anyhow::bail!("empty rule; provide rule content to analyze");
    }

    println!("Analyzing rule... This may take a moment.");
    let analysis = analyze_rule_via_provider(globals, cfg, &state.docs, &rule_content, provider).await?;

    println!("\n=== Rule Analysis ===");
    render_mod::render_analysis_text(&analysis);
    println!("{}", "=".repeat(50));
    Ok(())
}

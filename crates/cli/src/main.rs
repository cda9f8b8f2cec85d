// reconview CLI - browse, summarize and export reconciliation results

mod exit_codes;
mod render;
mod sink;
mod tui;
mod util;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use reconview_client::{ClientError, ReconClient, UploadPair};
use reconview_config::Settings;
use reconview_recon::aggregate::SummaryView;
use reconview_recon::export;
use reconview_recon::table::TableView;
use reconview_recon::{Category, ExportError, ExportReport, ReconPayload};

// Re-export exit codes from registry (single source of truth)
use exit_codes::{
    client_exit_code, EXIT_ERROR, EXIT_EXPORT_FAILED, EXIT_EXPORT_SAVE, EXIT_PAYLOAD_IO,
    EXIT_PAYLOAD_PARSE, EXIT_SUCCESS, EXIT_USAGE,
};
use sink::DirectorySink;

#[derive(Parser)]
#[command(name = "reconview")]
#[command(about = "Browse, summarize and export transaction reconciliation results")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Reconciliation service base URL (overrides service.baseUrl in settings)
    #[arg(long, global = true, env = "RECONVIEW_API_BASE", value_name = "URL")]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload two CSV files to the service and reconcile them
    #[command(after_help = "\
Examples:
  reconview reconcile ledger.csv provider.csv
  reconview reconcile ledger.csv provider.csv -o result.json
  reconview reconcile ledger.csv provider.csv --json | jq '.summary'
  RECONVIEW_API_BASE=https://recon.example.com reconview reconcile a.csv b.csv")]
    Reconcile {
        /// Internal (ledger) CSV file
        internal: PathBuf,

        /// Provider CSV file
        provider: PathBuf,

        /// Save the full result payload to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the full result payload as JSON instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Show category counts, percentages, quality signals and column mappings
    #[command(after_help = "\
Examples:
  reconview summary result.json
  reconview summary result.json --json
  cat result.json | reconview summary -")]
    Summary {
        /// Result payload file ('-' for stdin)
        payload: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one page of a category table
    #[command(after_help = "\
Examples:
  reconview table result.json -c matched
  reconview table result.json -c matched --search pending --sort amount --desc
  reconview table result.json -c internal_only --page 2 --json")]
    Table {
        /// Result payload file ('-' for stdin)
        payload: PathBuf,

        /// Category: matched, internal_only, provider_only
        #[arg(long, short = 'c', value_parser = parse_category)]
        category: Category,

        /// Case-insensitive substring filter over every field
        #[arg(long, short = 's')]
        search: Option<String>,

        /// Sort by this column (ascending unless --desc)
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending (requires --sort)
        #[arg(long, requires = "sort")]
        desc: bool,

        /// Page number (1-based, 10 rows per page)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Output the rendered page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export one category as CSV
    #[command(after_help = "\
Examples:
  reconview export result.json -c matched
  reconview export result.json -c provider_only --remote --out-dir exports/

With --remote the file is fetched from the service for the payload's
session; any failure falls back to building it locally.")]
    Export {
        /// Result payload file ('-' for stdin)
        payload: PathBuf,

        /// Category: matched, internal_only, provider_only
        #[arg(long, short = 'c', value_parser = parse_category)]
        category: Category,

        /// Fetch from the service, falling back to local on failure
        #[arg(long)]
        remote: bool,

        /// Directory to write into (overrides export.directory in settings)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Export every category as a zip archive
    #[command(after_help = "\
Examples:
  reconview export-all result.json
  reconview export-all result.json --remote --out-dir exports/")]
    ExportAll {
        /// Result payload file ('-' for stdin)
        payload: PathBuf,

        /// Fetch from the service, falling back to local on failure
        #[arg(long)]
        remote: bool,

        /// Directory to write into (overrides export.directory in settings)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Interactive viewer (one tab per category)
    #[command(after_help = "\
Examples:
  reconview view result.json
  reconview view result.json --plain

Press ? inside the viewer for keybindings.")]
    View {
        /// Result payload file
        payload: PathBuf,

        /// Directory exports are written into
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Print the first page of every category instead of starting the viewer
        #[arg(long)]
        plain: bool,
    },
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse::<Category>().map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    // Settings are only read by commands that reach the service or write files
    let api_base = cli.api_base;

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: reconview <command> [options]");
            eprintln!("       reconview --help for more information");
            Ok(())
        }
        Some(Commands::Reconcile { internal, provider, output, json }) => {
            cmd_reconcile(&Context::new(api_base), &internal, &provider, output, json)
        }
        Some(Commands::Summary { payload, json }) => cmd_summary(&payload, json),
        Some(Commands::Table { payload, category, search, sort, desc, page, json }) => {
            cmd_table(&payload, category, search, sort, desc, page, json)
        }
        Some(Commands::Export { payload, category, remote, out_dir }) => {
            cmd_export(&Context::new(api_base), &payload, category, remote, out_dir)
        }
        Some(Commands::ExportAll { payload, remote, out_dir }) => cmd_export_all(&Context::new(api_base), &payload, remote, out_dir),
        Some(Commands::View { payload, out_dir, plain }) => cmd_view(api_base, &payload, out_dir, plain),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PAYLOAD_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PAYLOAD_PARSE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Upload/service error. The message is what the user should see:
    /// the service's own error text, or the generic upload message.
    pub fn client(err: &ClientError, api_base: &str) -> Self {
        let code = client_exit_code(err);
        let hint = match err {
            ClientError::Network(detail) => Some(format!(
                "is the reconciliation service running at {api_base}? ({detail})"
            )),
            ClientError::Http { status, .. } => Some(format!("service answered HTTP {status}")),
            _ => None,
        };
        Self { code, message: err.user_message(), hint }
    }

    pub fn export(err: &ExportError) -> Self {
        let code = match err {
            ExportError::Io(_) => EXIT_EXPORT_SAVE,
            _ => EXIT_EXPORT_FAILED,
        };
        Self { code, message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Shared plumbing
// ============================================================================

/// Settings with command-line overrides applied.
struct Context {
    settings: Settings,
}

impl Context {
    fn new(api_base: Option<String>) -> Self {
        let mut settings = Settings::load();
        if let Some(base) = api_base {
            settings.service_base_url = base;
        }
        Self { settings }
    }

    fn api_base(&self) -> &str {
        &self.settings.service_base_url
    }

    fn client(&self) -> Result<ReconClient, CliError> {
        ReconClient::new(self.api_base(), self.settings.timeout()).map_err(|e| CliError::client(&e, self.api_base()))
    }

    fn out_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.settings.export_directory.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Read and parse a result payload ('-' reads stdin).
fn load_payload(path: &Path) -> Result<ReconPayload, CliError> {
    let json = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::io(format!("failed to read stdin: {}", e)))?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("failed to read {}: {}", path.display(), e)))?
    };
    ReconPayload::from_json(&json).map_err(|e| {
        CliError::parse(format!("{}: {}", path.display(), e))
            .with_hint("expected the JSON result of `reconview reconcile` (matched, internal_only, provider_only, ...)")
    })
}

fn write_stdout(f: impl FnOnce(&mut io::StdoutLock<'static>) -> io::Result<()>) -> Result<(), CliError> {
    let out = io::stdout();
    let mut w = out.lock();
    f(&mut w).and_then(|_| w.flush()).map_err(|e| CliError::general(format!("write error: {}", e)))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::general(e.to_string()))?;
    write_stdout(|w| writeln!(w, "{json}"))
}

/// Saved path on stdout; an empty list is not an error.
fn report_export(what: &str, report: &ExportReport) {
    match &report.saved {
        Some(path) => println!("{}", path.display()),
        None => eprintln!("{what}: nothing to export (empty list)"),
    }
}

// ============================================================================
// reconcile
// ============================================================================

fn cmd_reconcile(
    ctx: &Context,
    internal: &Path,
    provider: &Path,
    output: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let pair = UploadPair::from_paths(internal, provider)
        .map_err(|e| CliError::client(&ClientError::Validation(e), ctx.api_base()))?;
    let client = ctx.client()?;
    let payload = client
        .upload_and_reconcile(&pair)
        .map_err(|e| CliError::client(&e, ctx.api_base()))?;

    if let Some(path) = &output {
        let body = serde_json::to_string_pretty(&payload).map_err(|e| CliError::general(e.to_string()))?;
        std::fs::write(path, body)
            .map_err(|e| CliError::io(format!("failed to write {}: {}", path.display(), e)))?;
        eprintln!("saved result to {}", path.display());
    }

    if json {
        return print_json(&payload);
    }

    let view = SummaryView::build(payload.summary.as_ref(), payload.column_mappings.as_ref());
    write_stdout(|w| {
        match &view {
            Some(view) => render::print_summary(w, view)?,
            None => writeln!(w, "Summary not available")?,
        }
        if let Some(session) = payload.session() {
            writeln!(w)?;
            writeln!(w, "session: {session}")?;
        }
        Ok(())
    })
}

// ============================================================================
// summary
// ============================================================================

fn cmd_summary(payload: &Path, json: bool) -> Result<(), CliError> {
    let payload = load_payload(payload)?;
    let view = SummaryView::build(payload.summary.as_ref(), payload.column_mappings.as_ref());
    if json {
        return print_json(&view);
    }
    write_stdout(|w| match &view {
        Some(view) => render::print_summary(w, view),
        None => writeln!(w, "Summary not available"),
    })
}

// ============================================================================
// table
// ============================================================================

fn cmd_table(
    payload: &Path,
    category: Category,
    search: Option<String>,
    sort: Option<String>,
    desc: bool,
    page: usize,
    json: bool,
) -> Result<(), CliError> {
    let payload = load_payload(payload)?;
    let mut view = TableView::for_category(&payload, category);

    if let Some(term) = search {
        view.set_search(term);
    }
    if let Some(column) = sort {
        if !view.toggle_sort(&column) && !view.is_empty() {
            let available: Vec<&str> = view.schema().map(|s| s.names().collect()).unwrap_or_default();
            return Err(CliError::args(format!("unknown column: {:?}", column))
                .with_hint(format!("available columns: {}", available.join(", "))));
        }
        if desc {
            view.toggle_sort(&column);
        }
    }
    if view.go_to_page(page) != page && view.total_pages() > 0 {
        log::warn!("page {} out of range, showing page {}", page, view.current_page());
    }

    let render = view.render();
    if json {
        return print_json(&render);
    }
    write_stdout(|w| render::print_table(w, &render))
}

// ============================================================================
// export / export-all
// ============================================================================

fn cmd_export(
    ctx: &Context,
    payload: &Path,
    category: Category,
    remote: bool,
    out_dir: Option<PathBuf>,
) -> Result<(), CliError> {
    let payload = load_payload(payload)?;
    let mut view = TableView::for_category(&payload, category);
    let mut sink = DirectorySink::new(ctx.out_dir(out_dir));

    let report = if remote {
        let client = ctx.client()?;
        view.export_remote(&client, &mut sink)
    } else {
        view.export_local(&mut sink)
    }
    .map_err(|e| CliError::export(&e))?;

    report_export(category.as_str(), &report);
    Ok(())
}

fn cmd_export_all(ctx: &Context, payload: &Path, remote: bool, out_dir: Option<PathBuf>) -> Result<(), CliError> {
    let payload = load_payload(payload)?;
    let mut sink = DirectorySink::new(ctx.out_dir(out_dir));

    let report = if remote {
        let client = ctx.client()?;
        export::export_all_remote(&payload, &client, &mut sink)
    } else {
        export::export_all_local(&payload, &mut sink)
    }
    .map_err(|e| CliError::export(&e))?;

    report_export("all categories", &report);
    Ok(())
}

// ============================================================================
// view
// ============================================================================

fn cmd_view(api_base: Option<String>, path: &Path, out_dir: Option<PathBuf>, plain: bool) -> Result<(), CliError> {
    let payload = load_payload(path)?;

    if plain {
        let summary = SummaryView::build(payload.summary.as_ref(), payload.column_mappings.as_ref());
        return write_stdout(|w| {
            for view in TableView::from_payload(&payload) {
                render::print_table(w, &view.render())?;
                writeln!(w)?;
            }
            if let Some(summary) = &summary {
                render::print_summary(w, summary)?;
            }
            Ok(())
        });
    }

    let ctx = Context::new(api_base);
    let client = ctx.client()?;
    let remote: tui::SharedRemote = Arc::new(client);
    let worker = tui::ExportWorker::new(remote, ctx.out_dir(out_dir));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    tui::run(&payload, file_name, worker).map_err(CliError::general)
}

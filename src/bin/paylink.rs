//! Operator CLI for issuing and tracking payment requests.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Local, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use paylink_rs::config::ConsoleConfig;
use paylink_rs::console::PaymentConsole;
use paylink_rs::error::PaylinkError;
use paylink_rs::expiry;
use paylink_rs::models::{
    AdminId, DashboardStats, Decimal, Employee, EmployeeId, PaymentRequest, PaymentRequestDraft,
    PaymentRequestId, PaymentStatus, StatusFilter,
};
use paylink_rs::search::PaymentQuery;
use paylink_rs::stats::RECENT_LIMIT;
use paylink_rs::storage::FileStorage;

/// Environment variable name for the operator id.
const ADMIN_ENV: &str = "PAYLINK_ADMIN_ID";

/// Console backed by the on-disk store.
type FileConsole = PaymentConsole<FileStorage, FileStorage>;

/// Payment link console: create, settle, and review payment requests.
#[derive(Debug, Parser)]
#[command(name = "paylink", version, about)]
struct Cli {
    /// Override the storage directory (default: XDG data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Hours a new request stays payable.
    #[arg(long, global = true, value_name = "HOURS")]
    horizon_hours: Option<i64>,
    /// Base URL payment links are minted under.
    #[arg(long, global = true, value_name = "URL")]
    link_base: Option<String>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// List payment requests, optionally filtered.
    List(ListArgs),
    /// Show dashboard statistics for today.
    Stats,
    /// Show the most recently created requests.
    Recent {
        /// Number of requests to show.
        #[arg(long, default_value_t = RECENT_LIMIT)]
        limit: usize,
    },
    /// Create a payment request and print its link.
    Create(CreateArgs),
    /// Mark a request as paid.
    Pay {
        /// Payment request id.
        id: String,
    },
    /// Mark a request as failed.
    Fail {
        /// Payment request id.
        id: String,
    },
    /// List employees that can be assigned requests.
    Employees,
}

/// Arguments for the `list` subcommand.
#[derive(Debug, Args)]
struct ListArgs {
    /// Search bill number, mobile, or customer name (case-insensitive).
    #[arg(long)]
    search: Option<String>,
    /// Effective status: all, pending, paid, failed, or expired.
    #[arg(long, default_value = "all")]
    status: StatusFilter,
}

/// Arguments for the `create` subcommand.
#[derive(Debug, Args)]
struct CreateArgs {
    /// Bill reference.
    #[arg(long)]
    bill_no: String,
    /// Amount to collect.
    #[arg(long, value_parser = parse_amount)]
    amount: Decimal,
    /// Customer mobile number.
    #[arg(long)]
    mobile: String,
    /// Customer name.
    #[arg(long)]
    name: Option<String>,
    /// Customer email.
    #[arg(long)]
    email: Option<String>,
    /// Employee id to attribute the request to.
    #[arg(long)]
    employee: Option<String>,
}

/// Parses a decimal amount for clap.
fn parse_amount(s: &str) -> Result<Decimal, String> {
    s.trim().parse::<Decimal>().map_err(|err| format!("{err}"))
}

/// Reads the operator id from the environment.
fn read_admin() -> Option<AdminId> {
    std::env::var(ADMIN_ENV)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .map(AdminId::new)
}

/// Prints a hint about the missing operator id.
fn print_admin_hint() -> io::Result<()> {
    let mut err = io::stderr().lock();
    writeln!(
        err,
        "{} {} environment variable is not set",
        "error:".red().bold(),
        ADMIN_ENV.bold()
    )?;
    writeln!(
        err,
        "  {} create a .env file with {}=<your_admin_id>",
        "hint:".cyan(),
        ADMIN_ENV
    )
}

/// Builds the engine configuration from CLI overrides.
fn build_config(
    horizon_hours: Option<i64>,
    link_base: Option<String>,
) -> paylink_rs::error::Result<ConsoleConfig> {
    let mut config = ConsoleConfig::new();
    if let Some(hours) = horizon_hours {
        let horizon = TimeDelta::try_hours(hours).ok_or_else(|| {
            PaylinkError::Config(format!("horizon of {hours} hours is out of range"))
        })?;
        config = config.horizon(horizon);
    }
    if let Some(url) = link_base {
        config = config.link_base_url(url);
    }
    Ok(config)
}

/// Creates the storage backend, using `data_dir` if provided or the
/// default XDG data directory otherwise.
fn create_storage(data_dir: Option<PathBuf>) -> paylink_rs::error::Result<FileStorage> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileStorage::default_dir()?,
    };
    FileStorage::new(dir)
}

/// Opens the console over the on-disk store.
fn open_console(
    data_dir: Option<PathBuf>,
    config: ConsoleConfig,
    operator: Option<AdminId>,
) -> paylink_rs::error::Result<FileConsole> {
    let persistence = create_storage(data_dir.clone())?;
    let directory = create_storage(data_dir)?;
    let mut builder = PaymentConsole::builder()
        .persistence(persistence)
        .directory(directory)
        .config(config);
    if let Some(admin) = operator {
        builder = builder.operator(admin);
    }
    builder.build()
}

/// Writes an error line to stderr.
fn report_error(context: &str, err: &dyn core::fmt::Display) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    let operator = read_admin();
    if matches!(cli.command, Command::Create(_)) && operator.is_none() {
        print_admin_hint()?;
        return Ok(ExitCode::FAILURE);
    }

    let config = match build_config(cli.horizon_hours, cli.link_base) {
        Ok(config) => config,
        Err(err) => return report_error("invalid options", &err),
    };
    let console = match open_console(cli.data_dir, config, operator) {
        Ok(console) => console,
        Err(err) => return report_error("failed to initialize storage", &err),
    };

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    runtime.block_on(dispatch(&console, cli.command))
}

/// Refreshes the snapshot, then dispatches to the subcommand handler.
async fn dispatch(console: &FileConsole, command: Command) -> io::Result<ExitCode> {
    let spinner = make_spinner("Loading payment requests...");
    let refreshed = console.refresh().await;
    spinner.finish_and_clear();
    match refreshed {
        Ok(report) if report.rejected > 0 => {
            writeln!(
                io::stderr().lock(),
                "{} skipped {} invalid stored request(s)",
                "warning:".yellow().bold(),
                report.rejected
            )?;
        }
        Ok(_) => {}
        Err(err) => return report_error("failed to load payment requests", &err),
    }

    match command {
        Command::List(args) => cmd_list(console, args),
        Command::Stats => cmd_stats(console),
        Command::Recent { limit } => {
            print_requests_table("Recent Requests", &console.recent(limit), console.now())
        }
        Command::Create(args) => cmd_create(console, args).await,
        Command::Pay { id } => cmd_settle(console, &id, PaymentStatus::Paid).await,
        Command::Fail { id } => cmd_settle(console, &id, PaymentStatus::Failed).await,
        Command::Employees => cmd_employees(console).await,
    }
}

/// Executes the `list` subcommand.
fn cmd_list(console: &FileConsole, args: ListArgs) -> io::Result<ExitCode> {
    let mut query = PaymentQuery::new().status(args.status);
    if let Some(text) = args.search {
        query = query.search(text);
    }
    print_requests_table("Payment Requests", &console.query(&query), console.now())
}

/// Executes the `stats` subcommand.
fn cmd_stats(console: &FileConsole) -> io::Result<ExitCode> {
    print_stats(&console.stats())?;
    print_requests_table(
        "Recent Activity",
        &console.recent(RECENT_LIMIT),
        console.now(),
    )
}

/// Executes the `create` subcommand.
async fn cmd_create(console: &FileConsole, args: CreateArgs) -> io::Result<ExitCode> {
    let mut draft = PaymentRequestDraft::new()
        .bill_no(args.bill_no)
        .amount(args.amount)
        .customer_mobile(args.mobile);
    if let Some(name) = args.name {
        draft = draft.customer_name(name);
    }
    if let Some(email) = args.email {
        draft = draft.customer_email(email);
    }
    if let Some(employee) = args.employee {
        draft = draft.employee(EmployeeId::new(employee));
    }

    match console.create(draft).await {
        Ok(request) => {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", "Payment request created!".green().bold())?;
            writeln!(out)?;
            writeln!(out, "  {} {}", "Id:".bold(), request.id)?;
            writeln!(out, "  {} {}", "Bill:".bold(), request.bill_no)?;
            writeln!(out, "  {} {}", "Amount:".bold(), request.amount)?;
            writeln!(out, "  {} {}", "Link:".bold(), request.payment_link.cyan())?;
            writeln!(
                out,
                "  {} {}",
                "Expires:".bold(),
                format_local(request.expires_at)
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report_error("failed to create payment request", &err),
    }
}

/// Executes the `pay` and `fail` subcommands.
async fn cmd_settle(console: &FileConsole, id: &str, status: PaymentStatus) -> io::Result<ExitCode> {
    let id = PaymentRequestId::new(id.to_owned());
    match console.update_status(&id, status).await {
        Ok(request) => {
            writeln!(
                io::stdout().lock(),
                "{} {} is now {}",
                "Updated:".green().bold(),
                request.bill_no,
                status_label(request.status)
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report_error("failed to update payment request", &err),
    }
}

/// Executes the `employees` subcommand.
async fn cmd_employees(console: &FileConsole) -> io::Result<ExitCode> {
    match console.active_employees().await {
        Ok(employees) => {
            print_employees_table(&employees)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report_error("failed to read employees", &err),
    }
}

/// Formats an instant in the local time zone.
fn format_local(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Formats a remaining duration as hours and minutes.
fn format_remaining(remaining: TimeDelta) -> String {
    let minutes = remaining.num_minutes();
    format!("{}h {:02}m", minutes.div_euclid(60), minutes.rem_euclid(60))
}

/// Returns when a request was settled, if it has been.
fn settled_at(request: &PaymentRequest) -> Option<DateTime<Utc>> {
    matches!(request.status, PaymentStatus::Paid | PaymentStatus::Failed)
        .then_some(request.updated_at)
}

/// Returns a table cell coloured by effective status.
fn status_cell(status: PaymentStatus) -> Cell {
    let color = match status {
        PaymentStatus::Paid => Color::Green,
        PaymentStatus::Pending => Color::Yellow,
        PaymentStatus::Failed => Color::Red,
        PaymentStatus::Expired => Color::DarkGrey,
    };
    Cell::new(status.as_str()).fg(color)
}

/// Returns a coloured status label for plain output.
fn status_label(status: PaymentStatus) -> String {
    match status {
        PaymentStatus::Paid => status.green().to_string(),
        PaymentStatus::Pending => status.yellow().to_string(),
        PaymentStatus::Failed => status.red().to_string(),
        PaymentStatus::Expired => status.dimmed().to_string(),
    }
}

/// Prints payment requests in a table.
fn print_requests_table(
    title: &str,
    requests: &[PaymentRequest],
    now: DateTime<Utc>,
) -> io::Result<ExitCode> {
    let mut out = io::stdout().lock();
    if requests.is_empty() {
        writeln!(out, "{}", "No payment requests found.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Bill").fg(Color::Cyan),
        Cell::new("Customer").fg(Color::Cyan),
        Cell::new("Mobile").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
        Cell::new("Created").fg(Color::Cyan),
        Cell::new("Expires In").fg(Color::Cyan),
        Cell::new("Settled").fg(Color::Cyan),
    ]);

    for request in requests {
        let remaining = expiry::time_remaining(request, now)
            .map_or_else(|| "\u{2014}".to_owned(), format_remaining);
        let settled = settled_at(request).map_or_else(|| "\u{2014}".to_owned(), format_local);
        _ = table.add_row(vec![
            Cell::new(&request.id),
            Cell::new(&request.bill_no),
            Cell::new(request.customer_name.as_deref().unwrap_or("\u{2014}")),
            Cell::new(&request.customer_mobile),
            Cell::new(request.amount.round_dp(2)),
            status_cell(request.effective_status(now)),
            Cell::new(format_local(request.created_at)),
            Cell::new(remaining),
            Cell::new(settled),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        title.green().bold(),
        format_args!("({})", requests.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the dashboard summary table.
fn print_stats(stats: &DashboardStats) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", "Dashboard".green().bold())?;
    writeln!(out)?;

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Metric").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
    ]);

    let success_rate = stats
        .success_rate()
        .map_or_else(|| "\u{2014}".to_owned(), |rate| format!("{rate}%"));
    let rows: &[(&str, String)] = &[
        ("Total Requests", stats.total_requests.to_string()),
        ("Successful", stats.successful_count.to_string()),
        ("Pending", stats.pending_count.to_string()),
        ("Failed", stats.failed_count.to_string()),
        ("Expired", stats.expired_count.to_string()),
        ("Success Rate", success_rate),
        ("Total Revenue", stats.total_revenue.round_dp(2).to_string()),
        ("Today's Revenue", stats.today_revenue.round_dp(2).to_string()),
    ];
    for (name, value) in rows {
        _ = table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }

    writeln!(out, "{table}")?;
    writeln!(out)?;
    Ok(())
}

/// Prints employees in a table.
fn print_employees_table(employees: &[Employee]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if employees.is_empty() {
        writeln!(out, "{}", "No active employees found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Mobile").fg(Color::Cyan),
        Cell::new("UPI").fg(Color::Cyan),
        Cell::new("Role").fg(Color::Cyan),
    ]);

    for employee in employees {
        _ = table.add_row(vec![
            Cell::new(&employee.id),
            Cell::new(&employee.full_name),
            Cell::new(&employee.mobile_number),
            Cell::new(&employee.upi_id),
            Cell::new(&employee.role),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Active Employees".green().bold(),
        format_args!("({})", employees.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}

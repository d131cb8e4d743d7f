use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use supaudit::{
    AuditConfig, AuditError, AuditLogWriter, ComplianceScanner, ComplianceService, ConfigOverrides,
    JsonRpcServer, LogEntryRow, LogStatus, PlanTier, Report, RetentionDays, ScanOutcome,
    SupabaseClient, TableSecurityRow, UpstreamError, UserMfaRow, file_report,
};
use tabled::{Table, settings::Style};

#[derive(Parser)]
#[command(name = "supaudit")]
#[command(about = "Supabase compliance auditing: MFA coverage, row-level security and PITR")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a YAML config file
    #[arg(short, long, env = "SUPAUDIT_CONFIG")]
    config: Option<PathBuf>,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    url: Option<String>,

    /// Service-role key used for catalog introspection and the compliance log
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    service_role_key: Option<String>,

    /// Subscription plan tier (Free, Pro, Enterprise)
    #[arg(long, env = "SUPABASE_PLAN_TYPE")]
    plan: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a compliance scan and record the snapshot
    Scan {
        /// API key of the project being scanned
        #[arg(long, env = "SUPABASE_CUSTOMER_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Email recorded as the operator on the log entry
        #[arg(long)]
        operator: Option<String>,

        /// Do not append the result to the compliance log
        #[arg(long)]
        no_log: bool,

        /// Output format: table, yaml, json
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,

        /// Maximum tables inspected at once (0 = unbounded)
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Whole-scan timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Attempts for the user and table listings, including the first
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Show recorded compliance snapshots, newest first
    Logs {
        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format: table, yaml, json
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },

    /// Show the PITR status a plan tier resolves to
    Plan {
        /// Plan tier (defaults to the configured plan)
        tier: Option<String>,
    },

    /// Serve JSON-RPC over stdin/stdout
    Serve,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Yaml,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("supaudit=debug,info")
    } else {
        EnvFilter::new("supaudit=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code_for(e.as_ref());
            print_error(e);
            code
        }
    }
}

fn exit_code_for(err: &(dyn std::error::Error + 'static)) -> ExitCode {
    match err.downcast_ref::<AuditError>() {
        Some(e) if e.is_client_error() => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn print_error(err: Box<dyn std::error::Error>) {
    if let Some(audit_err) = err.downcast_ref::<AuditError>() {
        if let Some(upstream) = audit_err.upstream() {
            print_upstream_error(audit_err, upstream);
            return;
        }
    }

    eprintln!("{} {}", "✗ Error:".red(), err);
}

fn print_upstream_error(err: &AuditError, upstream: &UpstreamError) {
    eprintln!("\n{}", format!("✗ {} [{}]", err.public_message(), upstream.error_code()).red());
    eprintln!("  {}", upstream);
    eprintln!("\n{}", "Suggestion:".yellow());
    for line in upstream.suggestion().lines() {
        eprintln!("  {}", line);
    }
    eprintln!();
}

fn global_overrides(cli: &Cli) -> ConfigOverrides {
    ConfigOverrides {
        project_url: cli.url.clone(),
        service_role_key: cli.service_role_key.clone(),
        plan_type: cli.plan.clone(),
        ..Default::default()
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let overrides = global_overrides(&cli);

    match cli.command {
        Commands::Scan { api_key, operator, no_log, output, max_concurrency, timeout, retries } => {
            let overrides = ConfigOverrides {
                max_concurrency,
                scan_timeout_secs: timeout,
                retry_attempts: retries,
                operator_email: operator,
                ..overrides
            };
            let config = AuditConfig::resolve(cli.config.as_deref(), overrides)?;
            cmd_scan(&config, api_key, no_log, output).await?;
        }

        Commands::Logs { limit, output } => {
            let config = AuditConfig::resolve(cli.config.as_deref(), overrides)?;
            cmd_logs(&config, limit, output).await?;
        }

        Commands::Plan { tier } => {
            let config = AuditConfig::resolve(cli.config.as_deref(), overrides)?;
            cmd_plan(tier.as_deref().or(config.plan_type.as_deref()));
        }

        Commands::Serve => {
            let config = AuditConfig::resolve(cli.config.as_deref(), overrides)?;
            cmd_serve(&config).await?;
        }
    }

    Ok(())
}

fn build_scanner(config: &AuditConfig, client: Arc<SupabaseClient>) -> ComplianceScanner {
    ComplianceScanner::new(client.clone(), client, config.plan_tier())
        .with_options(config.scan_options())
}

async fn cmd_scan(
    config: &AuditConfig,
    api_key: Option<String>,
    no_log: bool,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = Arc::new(SupabaseClient::from_config(config)?);
    let scanner = build_scanner(config, client.clone());

    info!("Scanning {} (plan: {})", client.base_url(), scanner.plan());
    let report = scanner.run_scan(api_key.as_deref()).await?;

    let outcome = if no_log {
        ScanOutcome::unlogged(report)
    } else {
        let writer = AuditLogWriter::new(client);
        file_report(&writer, &config.operator_email, report).await
    };

    match output {
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&outcome.report)?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome.report)?);
        }
        OutputFormat::Table => print_report(&outcome.report),
    }

    print_log_status(&outcome.log);
    Ok(())
}

fn print_report(report: &Report) {
    println!("\nUser MFA\n");
    if report.user_mfa_status.is_empty() {
        println!("No users found");
    } else {
        let rows: Vec<UserMfaRow> = report.user_mfa_status.iter().map(UserMfaRow::from).collect();
        let mut table = Table::new(rows);
        table.with(Style::markdown());
        println!("{}", table);
    }

    println!("\nTable Security\n");
    if report.table_rls_status.is_empty() {
        println!("No public tables found");
    } else {
        let rows: Vec<TableSecurityRow> = report.table_rls_status.iter().map(TableSecurityRow::from).collect();
        let mut table = Table::new(rows);
        table.with(Style::markdown());
        println!("{}", table);
    }

    println!("\nPoint-in-time recovery: {}", pitr_label(report));

    let without_mfa = report.users_without_mfa().len();
    let without_rls = report.tables_without_rls().len();
    let without_policies = report.tables_without_policies().len();

    println!("\nSummary:");
    println!(
        "  {} {}/{} accounts with MFA",
        mark(without_mfa == 0),
        report.mfa_enabled_count(),
        report.user_mfa_status.len()
    );
    println!("  {} {} tables without RLS", mark(without_rls == 0), without_rls);
    println!("  {} {} tables with RLS but no policies", mark(without_policies == 0), without_policies);
    println!("  {} PITR", mark(report.pitr_status.enabled));

    if report.is_compliant() {
        println!("\n{}", "✓ Project is compliant".green());
    } else {
        println!("\n{}", "✗ Project is not compliant".red());
    }
}

fn pitr_label(report: &Report) -> String {
    match (report.pitr_status.enabled, report.pitr_status.max_retention_days) {
        (true, RetentionDays::Days(days)) => format!("enabled, {} days retention", days),
        (true, RetentionDays::Varies) => "enabled, retention varies by contract".to_string(),
        (false, _) => "disabled".to_string(),
    }
}

fn mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

fn print_log_status(status: &LogStatus) {
    match status {
        LogStatus::Recorded => eprintln!("{}", "✓ Compliance snapshot recorded".green()),
        LogStatus::Skipped => eprintln!("{}", "○ Compliance log skipped".dimmed()),
        LogStatus::Failed(message) => {
            eprintln!("{} {}", "⚠ Report not logged:".yellow(), message);
        }
    }
}

async fn cmd_logs(
    config: &AuditConfig,
    limit: Option<usize>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = Arc::new(SupabaseClient::from_config(config)?);
    let writer = AuditLogWriter::new(client);

    let logs = writer.list_logs(limit).await?;

    if logs.is_empty() {
        println!("No compliance logs found");
        return Ok(());
    }

    match output {
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&logs)?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&logs)?);
        }
        OutputFormat::Table => {
            println!("\nCompliance Logs\n");
            let rows: Vec<LogEntryRow> = logs.iter().map(LogEntryRow::from).collect();
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            println!("{}", table);
            println!("\n{} entries", logs.len());
        }
    }

    Ok(())
}

fn cmd_plan(tier: Option<&str>) {
    let plan = PlanTier::parse(tier);
    let pitr = plan.pitr();

    if let Some(raw) = tier {
        if raw != plan.as_str() {
            println!("{}", format!("⚠ Unrecognized plan '{}', treating as {}", raw, plan).yellow());
        }
    }

    println!("Plan: {}", plan);
    match (pitr.enabled, pitr.max_retention_days) {
        (true, RetentionDays::Days(days)) => println!("  {} PITR enabled, {} days retention", mark(true), days),
        (true, RetentionDays::Varies) => println!("  {} PITR enabled, retention varies", mark(true)),
        (false, _) => println!("  {} PITR not available", mark(false)),
    }
}

async fn cmd_serve(config: &AuditConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = Arc::new(SupabaseClient::from_config(config)?);
    let scanner = build_scanner(config, client.clone());
    let service = ComplianceService::new(Arc::new(scanner), AuditLogWriter::new(client));

    JsonRpcServer::run(service).await?;
    Ok(())
}

//! webprobe - Authenticated Web Vulnerability Scanner CLI

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing_subscriber::EnvFilter;
use url::Url;

use webprobe::config;
use webprobe::models::{AuthStatus, ScanConfig, ScanResult, Severity};
use webprobe::report;
use webprobe::scanner::ScanEngine;

/// webprobe - Authenticated Web Application Vulnerability Scanner
#[derive(Parser)]
#[command(name = "webprobe", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that talks to the target
#[derive(Args)]
struct TargetArgs {
    /// Target base URL (e.g. http://localhost/dvwa)
    #[arg(short, long)]
    target: Option<String>,

    /// Login username
    #[arg(short, long, env = "WEBPROBE_USERNAME")]
    username: Option<String>,

    /// Login password
    #[arg(short, long, env = "WEBPROBE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum crawl depth
    #[arg(long)]
    depth: Option<u32>,

    /// Maximum simultaneous requests
    #[arg(long)]
    concurrency: Option<usize>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, crawl and probe the target
    Scan {
        #[command(flatten)]
        target: TargetArgs,

        /// Modules to run (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        modules: Option<Vec<String>>,

        /// Run probe modules concurrently
        #[arg(long)]
        concurrent: bool,

        /// JSON output path (default: webprobe_{hostname}.json)
        #[arg(short, long)]
        output: Option<String>,

        /// Also write findings as CSV to this path
        #[arg(long)]
        csv: Option<String>,

        /// Exit with code 1 if findings at or above this severity are found (critical, high, medium, low)
        #[arg(long)]
        fail_on: Option<String>,
    },

    /// Log in and crawl only, writing the discovered pages as JSON
    Crawl {
        #[command(flatten)]
        target: TargetArgs,

        /// Output file path
        #[arg(short, long, default_value = "webprobe_pages.json")]
        output: String,
    },

    /// List available probe modules
    Modules,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "webprobe=debug"
    } else {
        "webprobe=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();
}

fn build_config(
    args: TargetArgs,
    modules: Option<Vec<String>>,
    concurrent: bool,
) -> webprobe::error::Result<ScanConfig> {
    let mut scan_config = if let Some(ref path) = args.config {
        config::load_config(path)?
    } else {
        let default_path = Path::new("config/default.toml");
        if default_path.exists() {
            config::load_config(default_path)?
        } else {
            ScanConfig::default()
        }
    };

    config::merge_cli_args(
        &mut scan_config,
        args.target,
        args.username,
        args.password,
        args.concurrency,
        args.timeout,
        args.depth,
        modules,
        concurrent,
    );
    config::validate(&scan_config)?;
    Ok(scan_config)
}

fn output_name_from_target(target: &str, ext: &str) -> String {
    if let Ok(url) = Url::parse(target) {
        let host = url.host_str().unwrap_or("unknown");
        let sanitized: String = host
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect();
        format!("webprobe_{sanitized}.{ext}")
    } else {
        format!("webprobe_report.{ext}")
    }
}

fn print_banner() {
    let banner = r#"
    ╔═══════════════════════════════════════╗
    ║  WEBPROBE v0.1.0                      ║
    ║  Authenticated Web Vuln Scanner       ║
    ╚═══════════════════════════════════════╝
    "#;
    println!("{}", banner.cyan());
}

fn print_target(config: &ScanConfig) {
    println!("  {} {}", "Target:".bold(), config.target.green());
    println!("  {} {}", "User:".bold(), config.credentials.username.cyan());
    println!(
        "  {} {}",
        "Modules:".bold(),
        config.modules.join(", ").cyan()
    );
    println!(
        "  {} {}\n",
        "Concurrency:".bold(),
        config.concurrency.to_string().cyan()
    );
}

fn print_auth_status(status: &AuthStatus) {
    match status {
        AuthStatus::Authenticated => println!("  {} {}", "Login:".bold(), "authenticated".green()),
        other => println!("  {} {}", "Login:".bold(), other.to_string().red()),
    }
}

fn print_summary(result: &ScanResult) {
    let findings = &result.findings;
    let severities = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    println!("\n{}", "  Scan Summary".bold());
    println!("  {}", "─".repeat(35));

    let mut builder = Builder::default();
    builder.push_record(["Severity", "Count"]);
    for severity in &severities {
        builder.push_record([
            severity.to_string(),
            result.count_by_severity(*severity).to_string(),
        ]);
    }
    builder.push_record(["Total".to_string(), findings.len().to_string()]);

    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");

    if !findings.is_empty() {
        let mut details = Builder::default();
        details.push_record(["Module", "Severity", "Endpoint", "Parameter", "Mitigation"]);
        for f in findings.iter() {
            details.push_record([
                f.module.to_string(),
                f.severity.to_string(),
                f.endpoint.clone(),
                f.parameter.clone(),
                f.module.mitigation().to_string(),
            ]);
        }
        let mut table = details.build();
        table.with(Style::rounded());
        println!("\n{table}");
    }

    let count = |s: Severity| result.count_by_severity(s);
    println!(
        "\n  {} {} {} {}",
        format!("{} Critical", count(Severity::Critical)).red().bold(),
        format!("{} High", count(Severity::High)).bright_red(),
        format!("{} Medium", count(Severity::Medium)).yellow(),
        format!("{} Low", count(Severity::Low)).blue(),
    );
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            target,
            modules,
            concurrent,
            output,
            csv,
            fail_on,
        } => {
            init_tracing(target.verbose);
            print_banner();

            let fail_severity = match fail_on.as_deref() {
                Some(threshold) => match Severity::parse(threshold) {
                    Some(sev) => Some(sev),
                    None => {
                        eprintln!(
                            "  {} Invalid --fail-on value: '{}'. Use: critical, high, medium, low",
                            "Error:".red().bold(),
                            threshold
                        );
                        std::process::exit(2);
                    }
                },
                None => None,
            };

            let scan_config = build_config(target, modules, concurrent)?;
            let engine = ScanEngine::with_defaults();
            engine.validate_modules(&scan_config)?;
            print_target(&scan_config);

            let result = engine.run(&scan_config).await?;

            print_auth_status(&result.auth_status);
            println!(
                "  {} {} pages, {} requests",
                "Crawled:".bold(),
                result.pages.len().to_string().cyan(),
                result.total_requests.to_string().cyan()
            );
            print_summary(&result);

            let output_file =
                output.unwrap_or_else(|| output_name_from_target(&scan_config.target, "json"));
            report::json::export(&result, Path::new(&output_file))?;
            println!("\n  {} {}", "Report saved to:".bold(), output_file.green());

            if let Some(ref csv_file) = csv {
                report::csv::export(&result.findings, Path::new(csv_file))?;
                println!("  {} {}", "CSV saved to:".bold(), csv_file.green());
            }

            if let Some(threshold) = fail_severity {
                // Severity orders Critical first, so "at or above" is <=
                if result.findings.iter().any(|f| f.severity <= threshold) {
                    println!(
                        "\n  {} Findings at or above {} severity detected.",
                        "FAIL:".red().bold(),
                        threshold.to_string().to_uppercase().red()
                    );
                    std::process::exit(1);
                }
            }
        }

        Commands::Crawl { target, output } => {
            init_tracing(target.verbose);
            print_banner();

            let scan_config = build_config(target, None, false)?;
            print_target(&scan_config);

            let session = ScanEngine::authenticate(&scan_config).await?;
            print_auth_status(session.status());

            let pages = ScanEngine::crawl(&session, &scan_config).await;
            report::json::export_pages(&pages, Path::new(&output))?;

            let forms: usize = pages.iter().map(|p| p.forms.len()).sum();
            println!(
                "\n  {} {} pages, {} forms",
                "Crawled:".bold(),
                pages.len().to_string().cyan(),
                forms.to_string().cyan()
            );
            println!("  {} {}", "Pages saved to:".bold(), output.green());
        }

        Commands::Modules => {
            print_banner();
            let engine = ScanEngine::with_defaults();

            println!("  {}\n", "Available Probe Modules:".bold());
            for (name, description) in engine.list_modules() {
                println!("    {} {}", format!("{name:10}").cyan().bold(), description);
            }
            println!();
        }
    }

    Ok(())
}

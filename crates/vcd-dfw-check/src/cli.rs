//! Clap derive structures for `vcd-dfw-check`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vcd-dfw-check -- exercise a VDC group's distributed firewall end to end
#[derive(Debug, Parser)]
#[command(
    name = "vcd-dfw-check",
    version,
    about = "Check distributed firewall rule sync against Cloud Director",
    long_about = "Activates the distributed firewall of a VDC group, replaces its rule\n\
        list with a generated fixture, verifies the round trip, empties the list\n\
        and deactivates the firewall again, as each configured principal.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Profile to use (the system principal for `run`)
    #[arg(long, short = 'p', env = "VCD_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "VCD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// VDC group URN (overrides the profile's vdc_group)
    #[arg(long, short = 'g', env = "VCD_GROUP", global = true)]
    pub group: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "VCD_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides the profile)
    #[arg(long, env = "VCD_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full rule-sync workflow as each configured principal
    Run(RunArgs),

    /// Print the rule fixture that `run` would submit
    Plan(PlanArgs),

    /// Show the group's activation state and current rules
    Show,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Delegated org-admin profile (overrides the profile's delegate_profile)
    #[arg(long, short = 'd')]
    pub delegate: Option<String>,

    /// Run as the system principal only
    #[arg(long, conflicts_with = "delegate")]
    pub system_only: bool,

    /// Number of rules to generate
    #[arg(long, short = 'n')]
    pub rules: Option<usize>,

    /// Prefix for generated rule and firewall group names
    #[arg(long, default_value = "dfw-sync-")]
    pub prefix: String,

    /// Create a throwaway VDC group with this name, run against it, then delete it
    #[arg(long, requires_all = ["org_id", "vdc_id"])]
    pub scratch_group: Option<String>,

    /// Organization URN owning the scratch group and the delegated user
    #[arg(long)]
    pub org_id: Option<String>,

    /// VDC URN participating in the scratch group
    #[arg(long)]
    pub vdc_id: Option<String>,

    /// Create a throwaway org-admin user with this name and run as it
    #[arg(
        long,
        conflicts_with_all = ["delegate", "system_only"],
        requires_all = ["scratch_group", "org_name"]
    )]
    pub create_delegate: Option<String>,

    /// Organization name the delegated user logs in to
    #[arg(long)]
    pub org_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Number of rules to generate
    #[arg(long, short = 'n')]
    pub rules: Option<usize>,

    /// Build for this API version instead of the negotiated one (e.g. 35.0)
    #[arg(long)]
    pub api_version: Option<String>,

    /// Prefix for generated rule names
    #[arg(long, default_value = "dfw-sync-")]
    pub prefix: String,
}

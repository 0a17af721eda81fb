//! Output formatting: rule tables, activation state, workflow reports.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use vcd_dfw::{DfwActivationState, DistributedFirewallRule, WorkflowError, WorkflowReport};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

fn status_word(ok: bool, color: bool) -> String {
    match (ok, color) {
        (true, true) => "ok".green().to_string(),
        (false, true) => "FAILED".red().bold().to_string(),
        (true, false) => "ok".into(),
        (false, false) => "FAILED".into(),
    }
}

// ── Rules ────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Direction")]
    direction: String,
    #[tabled(rename = "IP Protocol")]
    ip_protocol: String,
    #[tabled(rename = "Enabled")]
    enabled: bool,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Logging")]
    logging: bool,
    #[tabled(rename = "Src")]
    sources: usize,
    #[tabled(rename = "Dst")]
    destinations: usize,
    #[tabled(rename = "App Profiles")]
    app_profiles: usize,
    #[tabled(rename = "Net Context Profiles")]
    network_context_profiles: usize,
}

impl From<&DistributedFirewallRule> for RuleRow {
    fn from(r: &DistributedFirewallRule) -> Self {
        Self {
            name: r.name.clone(),
            direction: r.direction.to_string(),
            ip_protocol: r.ip_protocol.to_string(),
            enabled: r.enabled,
            action: r.action.to_string(),
            logging: r.logging,
            sources: r.source_firewall_groups.len(),
            destinations: r.destination_firewall_groups.len(),
            app_profiles: r.application_port_profiles.len(),
            network_context_profiles: r.network_context_profiles.len(),
        }
    }
}

pub fn render_rules(format: &OutputFormat, rules: &[DistributedFirewallRule]) -> String {
    match format {
        OutputFormat::Table => {
            if rules.is_empty() {
                return "(no rules)".into();
            }
            let rows: Vec<RuleRow> = rules.iter().map(RuleRow::from).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => render_json(rules),
    }
}

// ── Group state ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct GroupView<'a> {
    group: &'a str,
    state: DfwActivationState,
    rules: &'a [DistributedFirewallRule],
}

pub fn render_group(
    format: &OutputFormat,
    group: &str,
    state: DfwActivationState,
    rules: &[DistributedFirewallRule],
) -> String {
    match format {
        OutputFormat::Table => format!(
            "VDC group:       {group}\n\
             DFW enabled:     {}\n\
             Default policy:  {}\n\n{}",
            state.dfw_enabled,
            state.default_policy_enabled,
            render_rules(format, rules)
        ),
        OutputFormat::Json => render_json(&GroupView {
            group,
            state,
            rules,
        }),
    }
}

// ── Workflow reports ─────────────────────────────────────────────────

#[derive(Serialize)]
struct RunSummary {
    principal: String,
    clean: bool,
    submitted: Option<usize>,
    discrepancies: Vec<String>,
    final_dfw_enabled: Option<bool>,
    final_rule_count: Option<usize>,
    error: Option<String>,
    cleanup_failures: Vec<String>,
}

impl From<&Result<WorkflowReport, WorkflowError>> for RunSummary {
    fn from(result: &Result<WorkflowReport, WorkflowError>) -> Self {
        match result {
            Ok(r) => Self {
                principal: r.principal.clone(),
                clean: r.is_clean(),
                submitted: Some(r.submitted),
                discrepancies: r.discrepancies.iter().map(ToString::to_string).collect(),
                final_dfw_enabled: Some(r.final_state.dfw_enabled),
                final_rule_count: Some(r.final_rule_count),
                error: None,
                cleanup_failures: r.cleanup_failures.iter().map(ToString::to_string).collect(),
            },
            Err(e) => Self {
                principal: e.principal.clone(),
                clean: false,
                submitted: None,
                discrepancies: Vec::new(),
                final_dfw_enabled: None,
                final_rule_count: None,
                error: Some(e.source.to_string()),
                cleanup_failures: e.cleanup_failures.iter().map(ToString::to_string).collect(),
            },
        }
    }
}

pub fn render_runs(
    format: &OutputFormat,
    results: &[Result<WorkflowReport, WorkflowError>],
    color: bool,
) -> String {
    let summaries: Vec<RunSummary> = results.iter().map(RunSummary::from).collect();
    match format {
        OutputFormat::Json => render_json(&summaries),
        OutputFormat::Table => summaries
            .iter()
            .map(|s| render_summary(s, color))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_summary(s: &RunSummary, color: bool) -> String {
    let mut out = format!("{}: {}\n", s.principal, status_word(s.clean, color));
    if let Some(n) = s.submitted {
        out.push_str(&format!("  submitted rules:   {n}\n"));
    }
    if let Some(enabled) = s.final_dfw_enabled {
        out.push_str(&format!("  final DFW enabled: {enabled}\n"));
    }
    if let Some(n) = s.final_rule_count {
        out.push_str(&format!("  final rule count:  {n}\n"));
    }
    if let Some(ref e) = s.error {
        out.push_str(&format!("  error: {e}\n"));
    }
    for d in &s.discrepancies {
        out.push_str(&format!("  discrepancy: {d}\n"));
    }
    for c in &s.cleanup_failures {
        out.push_str(&format!("  cleanup: {c}\n"));
    }
    out
}

// ── Shared ───────────────────────────────────────────────────────────

fn render_json<T: Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcd_dfw::{ActionValue, Direction, IpProtocol, ProfileRef, RuleAction};

    #[test]
    fn rule_table_lists_counts() {
        let mut rule = DistributedFirewallRule::new(
            "dfw-sync-1",
            Direction::Out,
            IpProtocol::Ipv6,
            RuleAction::Modern(ActionValue::Reject),
        );
        rule.network_context_profiles = vec![ProfileRef::new("a", "A"), ProfileRef::new("b", "B")];

        let table = render_rules(&OutputFormat::Table, &[rule]);
        assert!(table.contains("Net Context Profiles"));
        assert!(table.contains("dfw-sync-1"));
        assert!(table.contains("REJECT"));
    }

    #[test]
    fn empty_rule_list_renders_placeholder() {
        assert_eq!(render_rules(&OutputFormat::Table, &[]), "(no rules)");
        assert_eq!(render_rules(&OutputFormat::Json, &[]), "[]");
    }
}

//! Report rendering
//!
//! Text output has three main sections (groups, users, PSO details) followed
//! by unresolved references and diagnostics when there are any. JSON output
//! is the serialized [`PolicyModel`].

use std::fmt::{self, Write};

use fgpp_core::aggregate::{AppliedPolicy, PolicyModel, ViewOptions};
use fgpp_core::decode::{Decoded, Interval};
use fgpp_core::error::{DecodeFailure, ResolutionReason};

use crate::error::CliResult;
use crate::output::{Style, Table};

/// Placeholder for attributes missing from the PSO.
const NOT_SET: &str = "not set";

/// Longest cell rendered in the principal tables.
const MAX_CELL_WIDTH: usize = 64;

/// Rendering switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    pub color: bool,
    pub include_unapplied: bool,
}

impl ReportOptions {
    fn view(&self) -> ViewOptions {
        ViewOptions {
            include_unapplied: self.include_unapplied,
        }
    }
}

/// Render the model as a text report.
pub fn render_text(model: &PolicyModel, options: &ReportOptions) -> CliResult<String> {
    let mut out = String::new();
    let style = Style::new(options.color);

    write_groups(&mut out, model, options, style)?;
    write_users(&mut out, model, options, style)?;
    write_details(&mut out, model, style)?;
    write_unresolved(&mut out, model, style)?;
    write_diagnostics(&mut out, model, style)?;

    Ok(out)
}

/// Render the model as pretty-printed JSON.
pub fn render_json(model: &PolicyModel) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(model)?)
}

fn write_groups(out: &mut String, model: &PolicyModel, options: &ReportOptions, style: Style) -> fmt::Result {
    style.header(out, "Groups with PSO applied")?;
    let mut table = Table::new(["Group", "PSO"]).with_max_width(MAX_CELL_WIDTH);
    for policy in model.groups_view(options.view()) {
        push_subjects(&mut table, policy, policy.groups.iter().map(|g| g.display_name()));
    }
    write_table(out, &table, style, "No groups have a PSO applied.")
}

fn write_users(out: &mut String, model: &PolicyModel, options: &ReportOptions, style: Style) -> fmt::Result {
    style.header(out, "Users with PSO applied")?;
    let mut table = Table::new(["User", "PSO"]).with_max_width(MAX_CELL_WIDTH);
    for policy in model.users_view(options.view()) {
        push_subjects(&mut table, policy, policy.users.iter().map(|u| u.display_name()));
    }
    write_table(out, &table, style, "No users have a PSO applied.")
}

fn push_subjects<'a>(table: &mut Table, policy: &AppliedPolicy, subjects: impl Iterator<Item = &'a str>) {
    let mut any = false;
    for subject in subjects {
        table.push([subject, policy.settings.name.as_str()]);
        any = true;
    }
    // only reachable for unapplied PSOs shown on request
    if !any {
        table.push(["(none)", policy.settings.name.as_str()]);
    }
}

fn write_table(out: &mut String, table: &Table, style: Style, empty: &str) -> fmt::Result {
    if table.is_empty() {
        return writeln!(out, "{}", style.dim(empty));
    }
    table.render(out, style)
}

fn write_details(out: &mut String, model: &PolicyModel, style: Style) -> fmt::Result {
    style.header(out, "PSO Details")?;

    if let Some(failure) = &model.container_failure {
        style.warning(
            out,
            &format!(
                "Could not enumerate PSO details, the bind account likely lacks the privileges to read the Password Settings Container ({}: {})",
                failure.operation, failure.message
            ),
        )?;
        return Ok(());
    }

    if model.container_is_empty() {
        return style.info(
            out,
            "No PSOs found. Either none are configured or you likely do not have the privileges to read the Password Settings Container.",
        );
    }

    for (i, policy) in model.details().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        write_policy(out, policy, style)?;
    }
    Ok(())
}

fn write_policy(out: &mut String, policy: &AppliedPolicy, style: Style) -> fmt::Result {
    let settings = &policy.settings;

    style.key_value(out, "Policy Name", &style.bold(&settings.name))?;
    if let Some(description) = &settings.description {
        style.key_value(out, "Description", description)?;
    }
    style.key_value(out, "Precedence", &count_text(&settings.precedence, style))?;
    style.key_value(out, "Minimum Password Length", &count_text(&settings.min_password_length, style))?;
    style.key_value(out, "Password History Length", &count_text(&settings.password_history_length, style))?;
    style.key_value(out, "Lockout Threshold", &count_text(&settings.lockout_threshold, style))?;
    style.key_value(
        out,
        "Observation Window",
        &interval_text(&settings.lockout_observation_window, "never", style),
    )?;
    style.key_value(
        out,
        "Lockout Duration",
        &interval_text(&settings.lockout_duration, "until unlocked by an administrator", style),
    )?;
    style.key_value(out, "Complexity Enabled", &flag_text(&settings.complexity_enabled, style))?;
    style.key_value(
        out,
        "Minimum Password Age",
        &interval_text(&settings.min_password_age, "no minimum", style),
    )?;
    style.key_value(
        out,
        "Maximum Password Age",
        &interval_text(&settings.max_password_age, "never expires", style),
    )?;
    style.key_value(
        out,
        "Reversible Encryption",
        &flag_text(&settings.reversible_encryption_enabled, style),
    )?;

    if settings.applies_to.is_empty() {
        style.key_value(out, "Policy Applies To", &style.dim("nobody"))?;
    } else {
        for dn in &settings.applies_to {
            style.key_value(out, "Policy Applies To", dn)?;
        }
    }
    Ok(())
}

fn decoded_text<T>(value: &Decoded<T>, style: Style, show: impl FnOnce(&T) -> String) -> String {
    match value {
        Decoded::NotPresent => style.dim(NOT_SET),
        Decoded::Value(v) => show(v),
        Decoded::Invalid(failure) => style.red(&invalid_text(failure)),
    }
}

fn invalid_text(failure: &DecodeFailure) -> String {
    format!("invalid '{}' ({})", failure.raw, failure.kind)
}

fn count_text(value: &Decoded<u32>, style: Style) -> String {
    decoded_text(value, style, u32::to_string)
}

fn flag_text(value: &Decoded<bool>, style: Style) -> String {
    decoded_text(value, style, |v| if *v { "True" } else { "False" }.to_string())
}

/// `0.0208 days (0d 0h 30m 0s)`, or `never_label` for the zero sentinel.
fn interval_text(value: &Decoded<Interval>, never_label: &str, style: Style) -> String {
    decoded_text(value, style, |interval| match interval {
        Interval::Never => never_label.to_string(),
        Interval::Elapsed(duration) => {
            let (days, hours, minutes, seconds) = duration.breakdown();
            format!("{duration} ({days}d {hours}h {minutes}m {seconds}s)")
        }
    })
}

fn reason_text(reason: ResolutionReason) -> &'static str {
    match reason {
        ResolutionReason::DanglingReference => "PSO not found in container",
        ResolutionReason::ContainerUnavailable => "container unreadable",
    }
}

fn write_unresolved(out: &mut String, model: &PolicyModel, style: Style) -> fmt::Result {
    if model.unresolved.is_empty() {
        return Ok(());
    }
    style.header(out, "Unresolved references")?;

    let mut table = Table::new(["Principal", "Kind", "PSO", "Reason"]);
    for unresolved in &model.unresolved {
        table.push([
            unresolved.principal.display_name().to_string(),
            unresolved.principal.kind.to_string(),
            unresolved.pso_dn.clone(),
            reason_text(unresolved.reason).to_string(),
        ]);
    }
    table.render(out, style)
}

fn write_diagnostics(out: &mut String, model: &PolicyModel, style: Style) -> fmt::Result {
    let stats = &model.stats;
    if model.decode_failures.is_empty() && stats.skipped == 0 && stats.duplicate_principals == 0 {
        return Ok(());
    }
    style.header(out, "Diagnostics")?;

    for failure in &model.decode_failures {
        style.warning(
            out,
            &format!(
                "{}: {} {}",
                failure.pso_dn,
                failure.failure.attribute,
                invalid_text(&failure.failure)
            ),
        )?;
    }
    if stats.skipped > 0 {
        style.warning(
            out,
            &format!("{} entries carried no usable PSO reference and were skipped", stats.skipped),
        )?;
    }
    if stats.duplicate_principals > 0 {
        style.warning(
            out,
            &format!("{} principals were returned more than once", stats.duplicate_principals),
        )?;
    }
    style.key_value(
        out,
        "Principal search",
        &format!("{} entries in {} pages", stats.principal_entries, stats.principal_pages),
    )?;
    style.key_value(
        out,
        "PSO search",
        &format!("{} entries in {} pages", stats.pso_entries, stats.pso_pages),
    )
}

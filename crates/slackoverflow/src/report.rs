//! Console output for the CLI.

use colored::Colorize;
use notify::ChannelInfo;
use stackexchange::{Query, QuestionItem, Quota};

use crate::engine::{ChatReport, CycleReport, SyncReport};
use crate::error::SyncError;

pub fn print_section(title: &str) {
    println!();
    println!("{}", "═".repeat(70).bright_black());
    println!("{}", title.cyan().bold());
    println!("{}", "═".repeat(70).bright_black());
    println!();
}

pub fn print_step(message: &str) {
    println!("{} {}", "▶".cyan(), message.bold());
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

pub fn print_error(message: &str) {
    println!("{} {}", "✗".red().bold(), message.red());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Quota usage, warning when it runs low.
pub fn print_quota(quota: Quota) {
    let line = format!("Stack Exchange quota {quota}");
    if quota.max > 0 && quota.remaining * 10 < quota.max {
        print_warning(&line);
    } else {
        print_info(&line);
    }
}

/// Allowed and applied parameters of a query and the URL it resolves to,
/// for `--debug`.
pub fn print_query(label: &str, query: &Query, api_host: &str, api_version: &str) {
    print_step(&format!("{label}: /{}", query.path()));

    println!("  {}", "allowed".bright_black());
    for (name, param) in query.parameters.allowed() {
        println!(
            "    {:<14} {:<28} {}",
            name.cyan(),
            param.default.to_string(),
            param.description.bright_black()
        );
    }

    let (resolved, url) = match resolve_query(query, api_host, api_version) {
        Ok(resolved) => resolved,
        Err(e) => {
            print_error(&format!("Cannot build URL: {e}"));
            return;
        }
    };

    println!("  {}", "applied".bright_black());
    for (name, value) in resolved.parameters.applied() {
        println!("    {:<14} {}", name.cyan(), value);
    }
    println!("  {} {}", "url".bright_black(), url);
    println!();
}

/// Copy of `query` as it would be sent, with its request URL.
pub fn resolve_query(
    query: &Query,
    api_host: &str,
    api_version: &str,
) -> Result<(Query, String), stackexchange::Error> {
    let mut resolved = query.clone();
    let url = resolved.url(api_host, api_version)?;
    Ok((resolved, url.to_string()))
}

pub fn print_sync(label: &str, report: &SyncReport) {
    let line = format!(
        "{label}: {} fetched on {} page(s), {} created, {} updated, {} unchanged",
        report.fetched, report.pages, report.created, report.updated, report.unchanged
    );
    if report.errors.is_empty() {
        print_success(&line);
    } else {
        print_warning(&line);
    }
    if let Some(secs) = report.backoff_secs {
        print_warning(&format!("API asked to back off for {secs}s"));
    }
    if report.cancelled {
        print_warning("Interrupted");
    }
    print_errors(&report.errors);
}

pub fn print_chat(label: &str, report: &ChatReport) {
    let line = format!(
        "{label}: {} posted, {} updated, {} retired, {} already posted",
        report.posted, report.updated, report.retired, report.already_linked
    );
    if report.errors.is_empty() {
        print_success(&line);
    } else {
        print_warning(&line);
    }
    if report.dangling > 0 {
        print_info(&format!("Dropped {} link(s) without a question", report.dangling));
    }
    if report.cancelled {
        print_warning("Interrupted");
    }
    print_errors(&report.errors);
}

pub fn print_cycle(report: &CycleReport) {
    print_section("Sync cycle");
    print_sync("New questions", &report.new_questions);
    print_sync("Tracked questions", &report.updates);
    if report.chat_skipped {
        print_info("Slack disabled, nothing posted");
    } else {
        print_chat("Posts", &report.posts);
        print_chat("Updates", &report.chat_updates);
    }
    print_errors(&report.failures);
    if let Some(watermark) = report.watermark {
        print_info(&format!("Watermark {}", watermark.to_rfc3339()));
    }
    print_quota(report.quota);
}

/// Outcome of a scheduled cycle, including watchdog timeouts.
pub fn print_cycle_result(result: &Result<CycleReport, SyncError>) {
    match result {
        Ok(report) => print_cycle(report),
        Err(e) => print_error(&format!("Sync cycle failed: {e}")),
    }
}

pub fn print_watch_rows(items: &[QuestionItem]) {
    for item in items {
        println!("{}", watch_row(item));
    }
}

pub fn print_channels(channels: &[ChannelInfo]) {
    print_section("Slack channels");
    for channel in channels {
        let visibility = if channel.is_private { "private" } else { "public" };
        let member = if channel.is_member {
            "member".green()
        } else {
            "-".bright_black()
        };
        println!(
            "  {:<12} #{:<30} {:<8} {:>5} {}",
            channel.id.cyan(),
            channel.name,
            visibility,
            channel
                .num_members
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
            member
        );
    }
    println!();
    print_info(&format!("{} channel(s)", channels.len()));
}

fn print_errors(errors: &[String]) {
    for e in errors {
        println!("  {} {}", "✗".red(), e);
    }
}

/// One line per question: time, id, score and title.
pub fn watch_row(item: &QuestionItem) -> String {
    format!(
        "{}  {:>9}  {:>4}  {}",
        item.created_at().format("%Y-%m-%d %H:%M:%S"),
        item.question_id,
        item.score,
        item.title
    )
}

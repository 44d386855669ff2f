//! Linear prompt front-end
//!
//! A strictly synchronous read/print loop over stdin and stdout. It renders
//! each engine prompt as a numbered menu or a `Label [default]:` line,
//! translates the reply into a [`StepInput`], and lets the engine do all
//! validation. Secrets are read with terminal echo disabled.
//!
//! Navigation words understood at any prompt: `back`, `skip`, `quit`.

use std::io::{self, BufRead, Write};

use nix::sys::termios::{LocalFlags, SetArg, tcgetattr, tcsetattr};

use crate::apply::{ApplyPaths, ApplyReport, ApplyRun, Stage, StageStatus};
use crate::error::Result;
use crate::wizard::{EngineEvent, StepInput, StepPrompt, Wizard};

const RULE: &str = "============================================================";

/// Run the wizard to completion, then apply.
///
/// Returns `None` when the session was cancelled before the pipeline ran.
pub fn run(mut wizard: Wizard, paths: ApplyPaths) -> Result<Option<ApplyReport>> {
    loop {
        let input = match collect_input(&wizard)? {
            Some(input) => input,
            // EOF on stdin ends the session without applying
            None => StepInput::Cancel,
        };

        match wizard.submit(input) {
            EngineEvent::Stay => {
                let reason = wizard.last_error().unwrap_or("Invalid input");
                println!("Error: {reason}");
            }
            EngineEvent::Moved => {
                if let Some(warning) = wizard.last_warning() {
                    println!("Warning: {warning}");
                }
            }
            EngineEvent::ReadyToApply => break,
            EngineEvent::Cancelled => {
                println!("Setup cancelled.");
                return Ok(None);
            }
        }
    }

    if let Some(warning) = wizard.last_warning() {
        println!("Warning: {warning}");
    }

    println!("\n{RULE}");
    println!("Applying Configuration");
    println!("{RULE}");

    let mut run = ApplyRun::new(wizard.into_config(), paths);
    drive_pipeline(&mut run);
    let report = run.into_report();
    print_report(&report);
    Ok(Some(report))
}

/// Execute the pipeline stage by stage with progress lines.
pub fn drive_pipeline(run: &mut ApplyRun) {
    let total = Stage::ALL.len();
    while let Some(stage) = run.next_stage() {
        println!("\n[{}/{}] {}...", stage.order() + 1, total, stage.description());
        if let Some(outcome) = run.step() {
            match outcome.status {
                StageStatus::Success => println!("  ✓ {}", outcome.detail),
                StageStatus::Skipped => println!("  - skipped: {}", outcome.detail),
                StageStatus::Failed => println!("  ✗ {}", outcome.detail),
            }
        }
    }
}

/// Print the run-level summary. Every stage appears; failures are never
/// dropped from the list.
pub fn print_report(report: &ApplyReport) {
    println!("\n{RULE}");
    println!("{}", report.summary_line());
    println!("{RULE}");
    for outcome in &report.outcomes {
        println!("  [{}] {}: {}", outcome.status, outcome.stage, outcome.detail);
    }
    if report.any_failed() {
        println!("\nSome stages failed. Check the output above for details.");
    }
    println!("\nBackups of overwritten files carry a .backup.<timestamp> suffix.");
}

/// Render the current prompt and read one answer. `None` means EOF.
fn collect_input(wizard: &Wizard) -> Result<Option<StepInput>> {
    match wizard.prompt() {
        StepPrompt::Intro { title, body } => {
            print_header(title);
            for line in body {
                println!("{line}");
            }
            let Some(reply) = read_line("\nPress Enter to begin (or 'quit'): ")? else {
                return Ok(None);
            };
            Ok(Some(parse_nav(&reply).unwrap_or(StepInput::Yes)))
        }
        StepPrompt::Menu { title, entries } => {
            print_header(title);
            for (idx, entry) in entries.iter().enumerate() {
                println!("{}. {}", idx + 1, entry.label);
            }
            let Some(reply) = read_line(&format!("\nChoice (1-{}): ", entries.len()))? else {
                return Ok(None);
            };
            if let Some(nav) = parse_nav(&reply) {
                return Ok(Some(nav));
            }
            match reply.parse::<usize>() {
                Ok(n) if (1..=entries.len()).contains(&n) => Ok(Some(StepInput::Choice(n - 1))),
                // hand anything else to the engine for the rejection reason
                _ => Ok(Some(StepInput::Text(reply))),
            }
        }
        StepPrompt::Text {
            title,
            label,
            default,
            secret,
            skippable,
            hint,
            ..
        } => {
            print_header(title);
            if let Some(hint) = hint {
                println!("{hint}");
            }
            if skippable {
                println!("(optional: type 'skip' to keep the default)");
            }
            let line = match default {
                Some(default) => format!("{label} [{default}]: "),
                None => format!("{label}: "),
            };
            let reply = if secret {
                read_secret(&line)?
            } else {
                read_line(&line)?
            };
            let Some(reply) = reply else { return Ok(None) };
            Ok(Some(parse_nav(&reply).unwrap_or(StepInput::Text(reply))))
        }
        StepPrompt::MultiLine { title, label } => {
            print_header(title);
            println!("{label} (finish with a blank line):");
            let mut collected: Vec<String> = Vec::new();
            loop {
                let Some(line) = read_line("")? else {
                    if collected.is_empty() {
                        return Ok(None);
                    }
                    break;
                };
                if line.trim().is_empty() {
                    if !collected.is_empty() {
                        break;
                    }
                    continue;
                }
                if collected.is_empty() {
                    if let Some(nav) = parse_nav(&line) {
                        return Ok(Some(nav));
                    }
                }
                collected.push(line);
            }
            Ok(Some(StepInput::Lines(collected.join("\n"))))
        }
        StepPrompt::Form { title, fields } => {
            print_header(title);
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                let line = match &field.default {
                    Some(default) => format!("{} [{}]: ", field.label, default),
                    None => format!("{}: ", field.label),
                };
                let reply = if field.secret {
                    read_secret(&line)?
                } else {
                    read_line(&line)?
                };
                let Some(reply) = reply else { return Ok(None) };
                if !field.secret {
                    if let Some(nav) = parse_nav(&reply) {
                        return Ok(Some(nav));
                    }
                }
                values.push(reply);
            }
            Ok(Some(StepInput::Form(values)))
        }
        StepPrompt::Confirm {
            title,
            question,
            default_yes,
        } => {
            print_header(title);
            let suffix = if default_yes { "[yes]" } else { "[no]" };
            let Some(reply) = read_line(&format!("{question} (yes/no) {suffix}: "))? else {
                return Ok(None);
            };
            if let Some(nav) = parse_nav(&reply) {
                return Ok(Some(nav));
            }
            if reply.is_empty() {
                return Ok(Some(if default_yes { StepInput::Yes } else { StepInput::No }));
            }
            match parse_yes_no(&reply) {
                Some(true) => Ok(Some(StepInput::Yes)),
                Some(false) => Ok(Some(StepInput::No)),
                None => Ok(Some(StepInput::Text(reply))),
            }
        }
        StepPrompt::Summary {
            title,
            rows,
            question,
        } => {
            print_header(title);
            for (label, value) in rows {
                println!("{label}: {value}");
            }
            println!("\n{}", "-".repeat(RULE.len()));
            let Some(reply) = read_line(&format!("\n{question} (yes/no): "))? else {
                return Ok(None);
            };
            if let Some(nav) = parse_nav(&reply) {
                return Ok(Some(nav));
            }
            // applying requires the literal word
            match reply.to_lowercase().as_str() {
                "yes" => Ok(Some(StepInput::Yes)),
                "no" | "n" => Ok(Some(StepInput::No)),
                _ => Ok(Some(StepInput::Text(reply))),
            }
        }
    }
}

fn print_header(title: &str) {
    println!("\n{RULE}");
    println!("{title}");
    println!("{RULE}");
}

/// Map the navigation words to engine inputs.
fn parse_nav(reply: &str) -> Option<StepInput> {
    match reply.trim().to_lowercase().as_str() {
        "back" => Some(StepInput::Back),
        "skip" => Some(StepInput::Skip),
        "quit" | "cancel" => Some(StepInput::Cancel),
        _ => None,
    }
}

fn parse_yes_no(reply: &str) -> Option<bool> {
    match reply.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Print a prompt and read one trimmed line. `None` on EOF.
fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut line = String::new();
    let bytes = io::stdin().lock().read_line(&mut line)?;
    if bytes == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Read a line with terminal echo disabled. Falls back to an echoing read
/// when stdin is not a terminal.
fn read_secret(prompt: &str) -> Result<Option<String>> {
    let stdin = io::stdin();
    let Ok(original) = tcgetattr(&stdin) else {
        return read_line(prompt);
    };

    let mut silent = original.clone();
    silent.local_flags.remove(LocalFlags::ECHO);
    if tcsetattr(&stdin, SetArg::TCSANOW, &silent).is_err() {
        return read_line(prompt);
    }

    let result = read_line(prompt);
    let _ = tcsetattr(&stdin, SetArg::TCSANOW, &original);
    println!();
    result
}

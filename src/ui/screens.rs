//! Wizard screen rendering
//!
//! One render path per prompt kind, plus the apply-progress and final
//! summary screens. Secret fields are always drawn masked.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use super::{App, Mode};
use crate::apply::{Stage, StageStatus};
use crate::record::mask_secret;
use crate::theme::Styles;
use crate::wizard::{FieldSpec, StepPrompt};

/// Render the whole frame for the current application state.
pub(super) fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_body(f, app, chunks[1]);
    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let title = match app.mode {
        Mode::Wizard => app
            .wizard
            .as_ref()
            .map(|w| w.current_step().title())
            .unwrap_or_default(),
        Mode::Applying => "Applying Configuration",
        Mode::Done => "Setup Finished",
        Mode::Cancelled => "Cancelled",
    };
    let header = Paragraph::new(Line::from(Span::styled(title, Styles::title())))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_body(f: &mut Frame, app: &App, area: Rect) {
    match app.mode {
        Mode::Wizard => {
            if let Some(wizard) = &app.wizard {
                render_prompt(f, app, wizard.prompt(), area);
            }
        }
        Mode::Applying | Mode::Done => render_progress(f, app, area),
        Mode::Cancelled => {}
    }
}

fn render_prompt(f: &mut Frame, app: &App, prompt: StepPrompt, area: Rect) {
    let mut text: Vec<Line> = Vec::new();

    match prompt {
        StepPrompt::Intro { body, .. } => {
            for line in body {
                text.push(Line::styled(line, Styles::text()));
            }
            text.push(Line::default());
            text.push(Line::styled("Press Enter to begin, q to quit", Styles::dim()));
        }
        StepPrompt::Menu { entries, .. } => {
            for (idx, entry) in entries.iter().enumerate() {
                let style = if idx == app.menu_index {
                    Styles::selected()
                } else {
                    Styles::text()
                };
                text.push(Line::styled(format!("{}. {}", idx + 1, entry.label), style));
            }
        }
        StepPrompt::Text {
            label,
            default,
            secret,
            skippable,
            hint,
            suggestions,
            ..
        } => {
            if let Some(hint) = hint {
                text.push(Line::styled(hint, Styles::dim()));
                text.push(Line::default());
            }
            let shown = if secret {
                mask_secret(&app.input)
            } else {
                app.input.clone()
            };
            let mut spans = vec![
                Span::styled(format!("{label}: "), Styles::text()),
                Span::styled(format!("{shown}_"), Styles::input()),
            ];
            if app.input.is_empty() {
                if let Some(default) = &default {
                    spans.push(Span::styled(format!("  (default: {default})"), Styles::dim()));
                }
            }
            text.push(Line::from(spans));

            if !suggestions.is_empty() {
                text.push(Line::default());
                for (idx, suggestion) in app.filtered_suggestions(&suggestions).iter().enumerate() {
                    let style = if app.suggestion_index == Some(idx) {
                        Styles::selected()
                    } else {
                        Styles::dim()
                    };
                    text.push(Line::styled(format!("  {suggestion}"), style));
                }
            }
            if skippable {
                text.push(Line::default());
                text.push(Line::styled("F4 skips this step", Styles::dim()));
            }
        }
        StepPrompt::MultiLine { label, .. } => {
            text.push(Line::styled(
                format!("{label} (Enter on an empty line finishes):"),
                Styles::text(),
            ));
            text.push(Line::default());
            for line in &app.lines {
                text.push(Line::styled(line.clone(), Styles::input()));
            }
            text.push(Line::styled(format!("{}_", app.input), Styles::input()));
        }
        StepPrompt::Form { fields, .. } => {
            for (idx, field) in fields.iter().enumerate() {
                text.push(render_form_field(app, idx, field));
            }
            text.push(Line::default());
            text.push(Line::styled(
                "Tab moves between fields, Enter on the last field submits",
                Styles::dim(),
            ));
        }
        StepPrompt::Confirm { question, default_yes, .. } => {
            text.push(Line::styled(question, Styles::text()));
            text.push(Line::default());
            let hint = if default_yes {
                "y / n (Enter = yes)"
            } else {
                "y / n (Enter = no)"
            };
            text.push(Line::styled(hint, Styles::dim()));
        }
        StepPrompt::Summary { rows, question, .. } => {
            for (label, value) in rows {
                text.push(Line::from(vec![
                    Span::styled(format!("{label:<13}"), Styles::dim()),
                    Span::styled(value, Styles::text()),
                ]));
            }
            text.push(Line::default());
            text.push(Line::styled(question, Styles::title()));
            text.push(Line::styled("y applies, n goes back", Styles::dim()));
        }
    }

    let body = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(body, area);
}

fn render_form_field(app: &App, idx: usize, field: &FieldSpec) -> Line<'static> {
    let value = app.form_values.get(idx).cloned().unwrap_or_default();
    let shown = if field.secret {
        mask_secret(&value)
    } else {
        value.clone()
    };
    let focused = idx == app.form_focus;

    let label_style = if focused { Styles::selected() } else { Styles::text() };
    let cursor = if focused { "_" } else { "" };

    let mut spans = vec![
        Span::styled(format!("{:<26}", field.label), label_style),
        Span::styled(format!("{shown}{cursor}"), Styles::input()),
    ];
    if value.is_empty() {
        if let Some(default) = &field.default {
            spans.push(Span::styled(format!("  (default: {default})"), Styles::dim()));
        }
    }
    Line::from(spans)
}

fn render_progress(f: &mut Frame, app: &App, area: Rect) {
    let outcomes = app
        .run
        .as_ref()
        .map(|run| run.outcomes().to_vec())
        .or_else(|| app.report.as_ref().map(|r| r.outcomes.clone()))
        .unwrap_or_default();

    let mut text: Vec<Line> = Vec::new();
    for (idx, stage) in Stage::ALL.iter().enumerate() {
        let line = match outcomes.get(idx) {
            Some(outcome) => {
                let (marker, style) = match outcome.status {
                    StageStatus::Success => ("✓", Styles::success()),
                    StageStatus::Failed => ("✗", Styles::error()),
                    StageStatus::Skipped => ("-", Styles::dim()),
                };
                Line::from(vec![
                    Span::styled(format!(" {marker} "), style),
                    Span::styled(stage.description(), Styles::text()),
                    Span::styled(format!("  {}", outcome.detail), Styles::dim()),
                ])
            }
            None if idx == outcomes.len() && app.mode == Mode::Applying => Line::from(vec![
                Span::styled(" > ", Styles::title()),
                Span::styled(stage.description(), Styles::title()),
            ]),
            None => Line::styled(format!("   {}", stage.description()), Styles::dim()),
        };
        text.push(line);
    }

    if let Some(report) = &app.report {
        text.push(Line::default());
        let style = if report.any_failed() {
            Styles::error()
        } else {
            Styles::success()
        };
        text.push(Line::styled(report.summary_line(), style));
        text.push(Line::styled(
            "Backups of overwritten files carry a .backup.<timestamp> suffix.",
            Styles::dim(),
        ));
        text.push(Line::styled("Press Enter to exit", Styles::dim()));
    }

    let body = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(body, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(error) = &app.error {
        Line::styled(error.clone(), Styles::error())
    } else if let Some(warning) = &app.warning {
        Line::styled(warning.clone(), Styles::warning())
    } else {
        match app.mode {
            Mode::Wizard => Line::styled(
                "Enter confirms · Esc goes back · Ctrl+C cancels",
                Styles::dim(),
            ),
            Mode::Applying => Line::styled("Applying, please wait...", Styles::dim()),
            _ => Line::default(),
        }
    };
    let footer = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

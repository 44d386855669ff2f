//! Screen-based front-end
//!
//! A cooperative single-threaded event loop over the same wizard engine the
//! linear front-end drives. Each engine prompt maps to one screen; during
//! apply, the loop executes one pipeline stage per tick and redraws between
//! stages so progress stays visible.
//!
//! Keys: Enter confirms, Esc goes back, F4 skips an optional step,
//! Ctrl+C cancels the session.

mod screens;

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::apply::{ApplyPaths, ApplyReport, ApplyRun};
use crate::error::{Result, SetupError};
use crate::wizard::{EngineEvent, StepInput, StepPrompt, Wizard};

/// Redraw cadence while waiting for input
const TICK: Duration = Duration::from_millis(200);

/// How many suggestions the timezone picker shows at once
const SUGGESTION_WINDOW: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Wizard,
    Applying,
    Done,
    Cancelled,
}

/// Screen front-end state: the engine plus per-prompt input buffers.
pub(crate) struct App {
    pub(crate) wizard: Option<Wizard>,
    pub(crate) run: Option<ApplyRun>,
    pub(crate) report: Option<ApplyReport>,
    pub(crate) mode: Mode,
    paths: ApplyPaths,

    pub(crate) input: String,
    pub(crate) form_values: Vec<String>,
    pub(crate) form_focus: usize,
    pub(crate) menu_index: usize,
    pub(crate) lines: Vec<String>,
    pub(crate) suggestion_index: Option<usize>,
    pub(crate) error: Option<String>,
    pub(crate) warning: Option<String>,
}

impl App {
    fn new(wizard: Wizard, paths: ApplyPaths) -> Self {
        let mut app = Self {
            wizard: Some(wizard),
            run: None,
            report: None,
            mode: Mode::Wizard,
            paths,
            input: String::new(),
            form_values: Vec::new(),
            form_focus: 0,
            menu_index: 0,
            lines: Vec::new(),
            suggestion_index: None,
            error: None,
            warning: None,
        };
        app.reset_input();
        app
    }

    /// Clear the input buffers and prefill form defaults for the new prompt.
    fn reset_input(&mut self) {
        self.input.clear();
        self.lines.clear();
        self.menu_index = 0;
        self.form_focus = 0;
        self.suggestion_index = None;
        self.form_values.clear();

        if let Some(wizard) = &self.wizard {
            if let StepPrompt::Form { fields, .. } = wizard.prompt() {
                self.form_values = fields
                    .iter()
                    .map(|f| f.default.clone().unwrap_or_default())
                    .collect();
            }
        }
    }

    pub(crate) fn filtered_suggestions(&self, suggestions: &[String]) -> Vec<String> {
        let needle = self.input.to_lowercase();
        suggestions
            .iter()
            .filter(|s| needle.is_empty() || s.to_lowercase().contains(&needle))
            .take(SUGGESTION_WINDOW)
            .cloned()
            .collect()
    }

    fn submit(&mut self, input: StepInput) {
        let Some(wizard) = self.wizard.as_mut() else {
            return;
        };
        match wizard.submit(input) {
            EngineEvent::Stay => {
                self.error = wizard.last_error().map(str::to_string);
            }
            EngineEvent::Moved => {
                self.error = None;
                self.warning = wizard.last_warning().map(str::to_string);
                self.reset_input();
            }
            EngineEvent::ReadyToApply => {
                self.error = None;
                self.warning = None;
                let wizard = self.wizard.take().expect("wizard present");
                self.run = Some(ApplyRun::new(wizard.into_config(), self.paths.clone()));
                self.mode = Mode::Applying;
            }
            EngineEvent::Cancelled => {
                self.mode = Mode::Cancelled;
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.submit(StepInput::Cancel);
            return;
        }

        let Some(wizard) = self.wizard.as_ref() else {
            return;
        };
        let prompt = wizard.prompt();

        match prompt {
            StepPrompt::Intro { .. } => match key.code {
                KeyCode::Enter => self.submit(StepInput::Yes),
                KeyCode::Char('q') => self.submit(StepInput::Cancel),
                _ => {}
            },
            StepPrompt::Menu { entries, .. } => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.menu_index = self.menu_index.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.menu_index + 1 < entries.len() {
                        self.menu_index += 1;
                    }
                }
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    let n = c.to_digit(10).unwrap_or(0) as usize;
                    if (1..=entries.len()).contains(&n) {
                        self.submit(StepInput::Choice(n - 1));
                    }
                }
                KeyCode::Enter => self.submit(StepInput::Choice(self.menu_index)),
                KeyCode::Esc => self.submit(StepInput::Back),
                _ => {}
            },
            StepPrompt::Text {
                skippable,
                suggestions,
                ..
            } => match key.code {
                KeyCode::Char(c) => {
                    self.input.push(c);
                    self.suggestion_index = None;
                }
                KeyCode::Backspace => {
                    self.input.pop();
                    self.suggestion_index = None;
                }
                KeyCode::Up => {
                    if !suggestions.is_empty() {
                        let count = self.filtered_suggestions(&suggestions).len();
                        self.suggestion_index = move_selection(self.suggestion_index, count, -1);
                    }
                }
                KeyCode::Down => {
                    if !suggestions.is_empty() {
                        let count = self.filtered_suggestions(&suggestions).len();
                        self.suggestion_index = move_selection(self.suggestion_index, count, 1);
                    }
                }
                KeyCode::Enter => {
                    let filtered = self.filtered_suggestions(&suggestions);
                    let value = match self.suggestion_index.and_then(|i| filtered.get(i)) {
                        Some(choice) => choice.clone(),
                        None => self.input.clone(),
                    };
                    self.submit(StepInput::Text(value));
                }
                KeyCode::F(4) if skippable => self.submit(StepInput::Skip),
                KeyCode::Esc => self.submit(StepInput::Back),
                _ => {}
            },
            StepPrompt::MultiLine { .. } => match key.code {
                KeyCode::Char(c) => self.input.push(c),
                KeyCode::Backspace => {
                    if self.input.is_empty() {
                        if let Some(previous) = self.lines.pop() {
                            self.input = previous;
                        }
                    } else {
                        self.input.pop();
                    }
                }
                KeyCode::Enter => {
                    if self.input.trim().is_empty() && !self.lines.is_empty() {
                        let blob = self.lines.join("\n");
                        self.submit(StepInput::Lines(blob));
                    } else if !self.input.is_empty() {
                        let line = std::mem::take(&mut self.input);
                        self.lines.push(line);
                    }
                }
                KeyCode::Esc => self.submit(StepInput::Back),
                _ => {}
            },
            StepPrompt::Form { fields, .. } => match key.code {
                KeyCode::Char(c) => {
                    if let Some(value) = self.form_values.get_mut(self.form_focus) {
                        value.push(c);
                    }
                }
                KeyCode::Backspace => {
                    if let Some(value) = self.form_values.get_mut(self.form_focus) {
                        value.pop();
                    }
                }
                KeyCode::Tab | KeyCode::Down => {
                    if self.form_focus + 1 < fields.len() {
                        self.form_focus += 1;
                    }
                }
                KeyCode::BackTab | KeyCode::Up => {
                    self.form_focus = self.form_focus.saturating_sub(1);
                }
                KeyCode::Enter => {
                    if self.form_focus + 1 < fields.len() {
                        self.form_focus += 1;
                    } else {
                        self.submit(StepInput::Form(self.form_values.clone()));
                    }
                }
                KeyCode::Esc => self.submit(StepInput::Back),
                _ => {}
            },
            StepPrompt::Confirm { default_yes, .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.submit(StepInput::Yes),
                KeyCode::Char('n') | KeyCode::Char('N') => self.submit(StepInput::No),
                KeyCode::Enter => {
                    let input = if default_yes { StepInput::Yes } else { StepInput::No };
                    self.submit(input);
                }
                KeyCode::Esc => self.submit(StepInput::Back),
                _ => {}
            },
            StepPrompt::Summary { .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.submit(StepInput::Yes),
                KeyCode::Char('n') | KeyCode::Char('N') => self.submit(StepInput::No),
                KeyCode::Esc => self.submit(StepInput::Back),
                _ => {}
            },
        }
    }
}

/// Move a list selection by `delta`, clamping into `0..count`.
fn move_selection(current: Option<usize>, count: usize, delta: isize) -> Option<usize> {
    if count == 0 {
        return None;
    }
    let next = match (current, delta) {
        (None, d) if d > 0 => 0,
        (None, _) => count - 1,
        (Some(i), d) => {
            let moved = i as isize + d;
            moved.clamp(0, count as isize - 1) as usize
        }
    };
    Some(next)
}

/// Run the screen front-end. Returns `None` when the session was cancelled.
pub fn run(wizard: Wizard, paths: ApplyPaths) -> Result<Option<ApplyReport>> {
    enable_raw_mode().map_err(|e| SetupError::terminal(e.to_string()))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| SetupError::terminal(e.to_string()))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal =
        Terminal::new(backend).map_err(|e| SetupError::terminal(e.to_string()))?;

    let result = run_app(&mut terminal, App::new(wizard, paths));

    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> Result<Option<ApplyReport>> {
    loop {
        terminal
            .draw(|f| screens::render(f, &app))
            .map_err(|e| SetupError::terminal(e.to_string()))?;

        match app.mode {
            Mode::Wizard => {
                if poll_event(TICK)? {
                    if let Event::Key(key) = read_event()? {
                        if key.kind == KeyEventKind::Press {
                            app.handle_key(key);
                        }
                    }
                }
            }
            Mode::Applying => {
                // input is ignored while stages run; there is no
                // cancellation once the pipeline has started
                while poll_event(Duration::ZERO)? {
                    let _ = read_event()?;
                }
                let run = app.run.as_mut().expect("apply run present");
                run.step();
                if run.is_finished() {
                    let run = app.run.take().expect("apply run present");
                    app.report = Some(run.into_report());
                    app.mode = Mode::Done;
                }
            }
            Mode::Done => {
                if poll_event(TICK)? {
                    if let Event::Key(key) = read_event()? {
                        if key.kind == KeyEventKind::Press
                            && matches!(
                                key.code,
                                KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q')
                            )
                        {
                            break;
                        }
                    }
                }
            }
            Mode::Cancelled => break,
        }
    }

    Ok(app.report.take())
}

fn poll_event(timeout: Duration) -> Result<bool> {
    event::poll(timeout).map_err(|e| SetupError::terminal(e.to_string()))
}

fn read_event() -> Result<Event> {
    event::read().map_err(|e| SetupError::terminal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_selection() {
        assert_eq!(move_selection(None, 0, 1), None);
        assert_eq!(move_selection(None, 3, 1), Some(0));
        assert_eq!(move_selection(None, 3, -1), Some(2));
        assert_eq!(move_selection(Some(0), 3, 1), Some(1));
        assert_eq!(move_selection(Some(2), 3, 1), Some(2));
        assert_eq!(move_selection(Some(0), 3, -1), Some(0));
    }
}

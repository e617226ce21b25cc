use action::Action;
use beaver::{
    encode_cell, encode_compact, state_letter, Limits, MachineLoader, Outcome, TransitionTable,
    TuringMachine, BLANK_SYMBOL, MACHINES,
};
use keymap::{Config, KeyMapConfig};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Padding, Paragraph, Wrap},
    Frame,
};
use std::path::Path;

const BLOCK_PADDING: Padding = Padding::new(1, 1, 0, 0);
/// Cells moved per pan key press.
const PAN_STEP: i64 = 8;
/// Width of one rendered tape cell.
const CELL_WIDTH: u16 = 3;
/// Upper bound on auto-play steps per tick.
const MAX_SPEED: u64 = 1_000_000;

/// A machine the viewer can switch to.
struct Slot {
    name: String,
    table: TransitionTable,
    /// Marks and steps from a blank tape, for the built-in champions.
    known: Option<(usize, u64)>,
}

pub struct App {
    machine: TuringMachine,
    machines: Vec<Slot>,
    current_machine_index: usize,
    limits: Limits,
    last_outcome: Option<Outcome>,
    auto_play: bool,
    speed: u64,
    pan_offset: i64,
    message: String,
    show_help: bool,
    pub(crate) keymap: Config<Action>,
}

impl App {
    pub fn new_default() -> Result<Self, String> {
        let machines = MACHINES
            .iter()
            .map(|known| Slot {
                name: known.name.to_string(),
                table: known.table.clone(),
                known: Some((known.score, known.steps)),
            })
            .collect();

        let mut app = Self::with_machines(machines)?;
        app.message = "Press 'h' for help.".to_string();
        Ok(app)
    }

    pub fn new_from_table_string(name: &str, content: &str) -> Result<Self, String> {
        let table = MachineLoader::load_table_from_string(content)
            .map_err(|e| format!("Failed to load table: {}", e))?;

        let mut app = Self::with_machines(vec![Slot {
            name: name.to_string(),
            table,
            known: None,
        }])?;
        app.message = "Table loaded from source. Press 'h' for help.".to_string();
        Ok(app)
    }

    /// Loads every `.tm` file of `dir`, in file name order. Files that fail to load are skipped.
    pub fn new_from_directory(dir: &Path) -> Result<Self, String> {
        let mut machines = Vec::new();
        let mut failures = Vec::new();

        for result in MachineLoader::load_tables(dir) {
            match result {
                Ok((path, table)) => machines.push(Slot {
                    name: path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string()),
                    table,
                    known: None,
                }),
                Err(e) => failures.push(e.to_string()),
            }
        }

        if machines.is_empty() {
            return Err(failures
                .into_iter()
                .next()
                .unwrap_or_else(|| format!("No .tm files in {}", dir.display())));
        }

        let count = machines.len();
        let mut app = Self::with_machines(machines)?;
        app.message = match failures.first() {
            Some(first) => format!(
                "Loaded {} tables, skipped {}: {}",
                count,
                failures.len(),
                first
            ),
            None => format!("Loaded {} tables from {}", count, dir.display()),
        };
        Ok(app)
    }

    fn with_machines(machines: Vec<Slot>) -> Result<Self, String> {
        let first = machines
            .first()
            .ok_or_else(|| "No machines to show".to_string())?
            .table
            .clone();

        Ok(Self {
            machine: TuringMachine::new(first),
            machines,
            current_machine_index: 0,
            // Interactive runs show every configuration, so no early loop cutoff.
            limits: Limits::default().with_blank_loop_check(false),
            last_outcome: None,
            auto_play: false,
            speed: 1,
            pan_offset: 0,
            message: String::new(),
            show_help: false,
            keymap: Action::keymap_config(),
        })
    }

    fn name(&self) -> &str {
        &self.machines[self.current_machine_index].name
    }

    fn can_switch(&self) -> bool {
        self.machines.len() > 1
    }

    pub fn render(&mut self, f: &mut Frame) {
        let inner_area = f.area().inner(Margin::new(1, 0));

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // Machine info
                Constraint::Min(0),    // Table and tape
                Constraint::Length(3), // Status
            ])
            .split(inner_area);

        self.render_machine_info(f, main_chunks[0]);

        let middle_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Length(1),
                Constraint::Percentage(60),
            ])
            .split(main_chunks[1]);

        self.render_table(f, middle_chunks[0]);

        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Machine state
                Constraint::Min(0),    // Tape or help
            ])
            .split(middle_chunks[2]);

        self.render_machine_state(f, right_chunks[0]);

        if self.show_help {
            self.render_help(f, right_chunks[1]);
        } else {
            self.render_tape(f, right_chunks[1]);
        }

        self.render_status(f, main_chunks[2]);
    }

    fn render_machine_info(&self, f: &mut Frame, area: Rect) {
        let table = self.machine.table();
        let label = Style::default().fg(Color::Yellow);

        let title = if self.can_switch() {
            format!(
                "{} ({}/{})",
                self.name(),
                self.current_machine_index + 1,
                self.machines.len()
            )
        } else {
            self.name().to_string()
        };

        let mut first = vec![
            Span::styled("Machine: ", label),
            Span::raw(title),
            Span::styled(" | Shape: ", label),
            Span::raw(format!(
                "{} states x {} symbols",
                table.num_states(),
                table.width()
            )),
        ];
        if let Some((score, steps)) = self.machines[self.current_machine_index].known {
            first.push(Span::styled(" | Known: ", label));
            first.push(Span::raw(format!("{} marks in {} steps", score, steps)));
        }

        let text = vec![
            Line::from(first),
            Line::from(vec![
                Span::styled("Index: ", label),
                Span::raw(format!("{:014}", table.index())),
            ]),
            Line::from(vec![
                Span::styled("Compact: ", label),
                Span::raw(encode_compact(table).unwrap_or_else(|_| "-".to_string())),
            ]),
        ];

        let paragraph = Paragraph::new(text)
            .block(block("Beaver - Busy Beaver Simulator (TUI)").title_alignment(Alignment::Center));

        f.render_widget(paragraph, area);
    }

    /// Renders the transition table as a grid, highlighting the cell the next step applies.
    fn render_table(&self, f: &mut Frame, area: Rect) {
        let table = self.machine.table();
        let header_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);

        let mut header = vec![Span::raw("     ")];
        for symbol in 0..table.width() {
            header.push(Span::styled(format!("{:^6}", symbol), header_style));
        }

        let mut lines = vec![Line::from(header)];
        let active = (!self.machine.is_halted())
            .then(|| (self.machine.state(), self.machine.symbol() as usize));

        for state in 0..table.num_states() {
            let mut spans = vec![Span::styled(
                format!("  {}  ", state_letter(state)),
                header_style,
            )];
            for (symbol, entry) in table.row(state).iter().enumerate() {
                let cell = format!("{:^6}", encode_cell(entry));
                if active == Some((state, symbol)) {
                    spans.push(Span::styled(
                        cell,
                        Style::default()
                            .bg(Color::Yellow)
                            .fg(Color::Black)
                            .add_modifier(Modifier::BOLD),
                    ));
                } else if entry.is_stop() {
                    spans.push(Span::styled(cell, Style::default().fg(Color::Red)));
                } else {
                    spans.push(Span::raw(cell));
                }
            }
            lines.push(Line::from(spans));
        }

        let paragraph = section("Transition Table", lines).wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    /// Renders a window of the tape around the head, shifted by the pan offset.
    fn render_tape(&self, f: &mut Frame, area: Rect) {
        let tape = self.machine.tape();
        let head = tape.head();
        let outer = block("Tape");
        let visible = (outer.inner(area).width / CELL_WIDTH).max(1) as i64;
        let first = head + self.pan_offset - visible / 2;

        let cells: Vec<Span> = (first..first + visible)
            .map(|position| {
                let symbol = tape.get(position);
                let text = format!(" {} ", symbol);
                if position == head {
                    Span::styled(
                        text,
                        Style::default()
                            .bg(Color::Yellow)
                            .fg(Color::Black)
                            .add_modifier(Modifier::BOLD),
                    )
                } else if symbol == BLANK_SYMBOL {
                    Span::styled(text, Style::default().fg(Color::DarkGray))
                } else {
                    Span::raw(text)
                }
            })
            .collect();

        let (left, right) = tape.extent();
        let text_lines = vec![
            Line::from(cells),
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "Head at position {} (symbol {}) | Showing {}..{}",
                    head,
                    self.machine.symbol(),
                    first,
                    first + visible - 1
                ),
                Style::default().fg(Color::Cyan),
            )),
            Line::from(Span::styled(
                format!("Stored cells: {} ({}..{})", tape.len(), left, right),
                Style::default().fg(Color::Cyan),
            )),
        ];

        let paragraph = Paragraph::new(text_lines)
            .block(outer)
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn render_machine_state(&self, f: &mut Frame, area: Rect) {
        let step_count = self.machine.step_count();

        let (status_text, status_color) = match self.last_outcome {
            Some(Outcome::Halted(_)) => ("HALTED", Color::Red),
            Some(Outcome::TapeLimitExceeded) => ("TAPE LIMIT", Color::Magenta),
            Some(Outcome::StepLimitExceeded) => ("STEP LIMIT", Color::Magenta),
            Some(Outcome::BlankLoop) => ("BLANK LOOP", Color::Magenta),
            Some(Outcome::Interrupted) => ("INTERRUPTED", Color::Magenta),
            None if step_count == 0 => ("READY", Color::Blue),
            None => ("RUNNING", Color::Green),
        };

        let label = Style::default().fg(Color::Yellow);
        let text = vec![
            Line::from(vec![
                Span::styled("State: ", label),
                Span::styled(
                    state_letter(self.machine.state()).to_string(),
                    Style::default()
                        .fg(status_color)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(" | Steps: ", label),
                Span::raw(step_count.to_string()),
                Span::styled(" | Status: ", label),
                Span::styled(status_text, Style::default().fg(status_color)),
            ]),
            Line::from(vec![
                Span::styled("Marks: ", Style::default().fg(Color::Cyan)),
                Span::raw(self.machine.score().to_string()),
                Span::styled(" | Next: ", Style::default().fg(Color::Cyan)),
                Span::raw(if self.machine.is_halted() {
                    "-".to_string()
                } else {
                    encode_cell(self.machine.current_entry())
                }),
            ]),
        ];

        f.render_widget(section("Machine State", text), area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let help_text = vec![
            Line::from("Controls:"),
            Line::from("  Space - Step forward"),
            Line::from("  r - Reset machine"),
            Line::from("  p - Toggle auto-play"),
            Line::from("  f s - Faster / slower auto-play"),
            Line::from(if self.can_switch() {
                "  ← → - Switch machines"
            } else {
                "  ← → - Machine switching disabled (one table loaded)"
            }),
            Line::from("  a d - Pan the tape window"),
            Line::from("  c - Recenter the tape on the head"),
            Line::from("  h - Toggle this help"),
            Line::from("  q - Quit"),
            Line::from(""),
            Line::from("Cells read <write><move><next>; a next state of Z halts."),
            Line::from("The highlighted cell is applied by the next step."),
            Line::from(format!(
                "Runs stop when the tape would exceed {} cells.",
                self.limits.max_tape_len
            )),
        ];

        f.render_widget(section("Help", help_text), area);
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let hint = "h: help";
        let outer = block("Status");
        let inner = outer.inner(area);
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Fill(1), Constraint::Length(hint.len() as u16)])
            .split(inner);

        let auto_play_status = if self.auto_play { "ON" } else { "OFF" };
        let status = Line::from(vec![
            Span::raw("Auto-play: "),
            Span::styled(auto_play_status, Style::default().fg(Color::Yellow)),
            Span::raw(format!(" x{}", self.speed)),
            Span::raw(format!(" | {}", self.message)),
        ]);

        let hint = Text::from(
            Line::from(Span::styled(hint, Style::default().fg(Color::Yellow))).right_aligned(),
        );

        f.render_widget(outer, area);
        f.render_widget(status, chunks[0]);
        f.render_widget(hint, chunks[1]);
    }

    /// Executes one step, honouring the tape bound.
    pub fn step_machine(&mut self) {
        if self.last_outcome.is_some() {
            self.message = "Machine stopped. Press 'r' to reset.".to_string();
            self.auto_play = false;
            return;
        }

        let single = Limits {
            max_steps: self.machine.step_count() + 1,
            ..self.limits
        };
        match self.machine.run(&single) {
            Outcome::StepLimitExceeded => {
                self.message = format!("Step {} completed", self.machine.step_count());
            }
            Outcome::Halted(steps) => {
                self.last_outcome = Some(Outcome::Halted(steps));
                self.message = format!(
                    "Halted after {} steps with {} marks. Press 'r' to reset.",
                    steps,
                    self.machine.score()
                );
                self.auto_play = false;
            }
            outcome => {
                self.last_outcome = Some(outcome);
                self.message = format!("Stopped: {:?}. Press 'r' to reset.", outcome);
                self.auto_play = false;
            }
        }
    }

    pub fn reset_machine(&mut self) {
        self.machine.reset();
        self.last_outcome = None;
        self.message = "Machine reset".to_string();
        self.auto_play = false;
        self.pan_offset = 0;
    }

    pub fn toggle_auto_play(&mut self) {
        self.auto_play = !self.auto_play;
        self.message = format!(
            "Auto-play {}",
            if self.auto_play {
                "enabled"
            } else {
                "disabled"
            }
        );
    }

    pub fn is_auto_playing(&self) -> bool {
        self.auto_play && self.last_outcome.is_none()
    }

    /// Runs one auto-play batch of `speed` steps, stopping early on halt or a limit.
    pub fn on_tick(&mut self) {
        for _ in 0..self.speed {
            if !self.is_auto_playing() {
                break;
            }
            self.step_machine();
        }
    }

    pub fn faster(&mut self) {
        self.speed = (self.speed * 10).min(MAX_SPEED);
        self.message = format!("Auto-play speed: {} steps per tick", self.speed);
    }

    pub fn slower(&mut self) {
        self.speed = (self.speed / 10).max(1);
        self.message = format!("Auto-play speed: {} steps per tick", self.speed);
    }

    pub fn pan(&mut self, direction: i64) {
        self.pan_offset += direction * PAN_STEP;
    }

    pub fn recenter(&mut self) {
        self.pan_offset = 0;
    }

    pub fn next_machine(&mut self) {
        if !self.can_switch() {
            self.message = "Cannot switch machines: only one table is loaded.".to_string();
            return;
        }
        self.load_machine((self.current_machine_index + 1) % self.machines.len());
    }

    pub fn previous_machine(&mut self) {
        if !self.can_switch() {
            self.message = "Cannot switch machines: only one table is loaded.".to_string();
            return;
        }
        let index = if self.current_machine_index == 0 {
            self.machines.len() - 1
        } else {
            self.current_machine_index - 1
        };
        self.load_machine(index);
    }

    fn load_machine(&mut self, index: usize) {
        let Some(slot) = self.machines.get(index) else {
            return;
        };

        self.machine = TuringMachine::new(slot.table.clone());
        self.message = format!(
            "Loaded {}: {} states, {} symbols",
            slot.name,
            slot.table.num_states(),
            slot.table.width()
        );
        self.current_machine_index = index;
        self.last_outcome = None;
        self.auto_play = false;
        self.pan_offset = 0;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }
}

fn section<'a>(title: &'a str, content: Vec<Line<'a>>) -> Paragraph<'a> {
    Paragraph::new(content).block(block(title))
}

fn block(title: &str) -> Block {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(format!(" {title} "))
        .padding(BLOCK_PADDING)
}

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Cell, Paragraph, Row, Table, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use gincana::{scoring::char_outcomes, scoring::Outcome, util::format_clock, SessionPhase};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints(
                [
                    Constraint::Length(1), // header
                    Constraint::Min(1),    // phase body
                    Constraint::Length(1), // status
                    Constraint::Length(1), // legend
                ]
                .as_ref(),
            )
            .split(area);

        render_header(self, chunks[0], buf);

        match self.exercise.phase() {
            SessionPhase::IdInput => render_id_input(self, chunks[1], buf),
            SessionPhase::Countdown => render_countdown(self, chunks[1], buf),
            SessionPhase::Reading => render_reading(self, chunks[1], buf),
            SessionPhase::Typing => render_typing(self, chunks[1], buf),
            SessionPhase::Comprehension => render_quiz(self, chunks[1], buf),
            SessionPhase::Results => render_results(self, chunks[1], buf),
        }

        if let Some(ref status) = self.status {
            Paragraph::new(Span::styled(
                status.as_str(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
        }

        Paragraph::new(Span::styled(
            legend(self.exercise.phase()),
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .render(chunks[3], buf);
    }
}

fn legend(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::IdInput => "(enter) start / (esc) quit",
        SessionPhase::Countdown => "(ctrl+r) reset / (esc) quit",
        SessionPhase::Reading => "(enter) done reading / (ctrl+r) reset / (esc) quit",
        SessionPhase::Typing => "(enter) finish / (ctrl+r) reset / (esc) quit",
        SessionPhase::Comprehension => "(↑/↓) question / (1-9) answer / (enter) submit",
        SessionPhase::Results => "(s)ave / (n)ew round / (q)uit",
    }
}

fn render_header(app: &App, area: Rect, buf: &mut Buffer) {
    let mut spans = vec![Span::styled("GINCANA", bold().fg(Color::Magenta))];
    if !app.exercise.agent_id().is_empty() {
        spans.push(Span::raw("  agent: "));
        spans.push(Span::styled(app.exercise.agent_id(), bold()));
    }
    spans.push(Span::styled(
        format!("  [{}]", app.exercise.phase()),
        Style::default().add_modifier(Modifier::DIM),
    ));

    Paragraph::new(Line::from(spans)).render(area, buf);
}

/// Vertically center `lines` rows of content inside `area`
fn centered(area: Rect, lines: u16) -> Rect {
    let lines = lines.min(area.height);
    Rect {
        y: area.y + (area.height - lines) / 2,
        height: lines,
        ..area
    }
}

fn render_id_input(app: &App, area: Rect, buf: &mut Buffer) {
    let text = Text::from(vec![
        Line::from(Span::styled("Agent id", bold())),
        Line::from(""),
        Line::from(vec![
            Span::styled(app.id_input.as_str(), bold().fg(Color::Cyan)),
            Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)),
        ]),
    ]);

    Paragraph::new(text)
        .alignment(Alignment::Center)
        .render(centered(area, 3), buf);
}

fn render_countdown(app: &App, area: Rect, buf: &mut Buffer) {
    let secs = app
        .exercise
        .remaining()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    let text = Text::from(vec![
        Line::from(Span::styled("Get ready", bold())),
        Line::from(""),
        Line::from(Span::styled(format_clock(secs), bold().fg(Color::Yellow))),
    ]);

    Paragraph::new(text)
        .alignment(Alignment::Center)
        .render(centered(area, 3), buf);
}

fn render_reading(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)].as_ref())
        .split(area);

    let elapsed = app
        .exercise
        .elapsed()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let mut title = vec![Span::styled(
        format!("reading {}", format_clock(elapsed)),
        dim_bold(),
    )];
    if !app.passage.title.is_empty() {
        title.insert(0, Span::styled(format!("{}  ", app.passage.title), bold()));
    }
    Paragraph::new(Line::from(title))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    Paragraph::new(app.exercise.reference_text())
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let reference: Vec<char> = gincana::normalize::normalize(app.exercise.reference_text())
        .chars()
        .collect();

    let max_chars_per_line = area.width.max(1) as usize;
    let prompt_width = reference.iter().collect::<String>().width();
    let prompt_lines = if prompt_width <= max_chars_per_line {
        1
    } else {
        (prompt_width as f64 / max_chars_per_line as f64).ceil() as u16 + 1
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(area.height.saturating_sub(prompt_lines + 2) / 2),
                Constraint::Length(2),
                Constraint::Length(prompt_lines),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(area);

    let red_bold = bold().fg(Color::Red);
    let green_bold = bold().fg(Color::Green);

    let outcomes = char_outcomes(app.exercise.reference_text(), app.exercise.submitted());
    let cursor = outcomes.len();
    let mut spans = outcomes
        .into_iter()
        .map(|(typed, outcome)| match outcome {
            Outcome::Correct => Span::styled(typed.to_string(), green_bold),
            Outcome::Incorrect => Span::styled(
                match typed {
                    ' ' => "·".to_owned(),
                    c => c.to_string(),
                },
                red_bold,
            ),
        })
        .collect::<Vec<Span>>();

    if let Some(next) = reference.get(cursor) {
        spans.push(Span::styled(
            next.to_string(),
            dim_bold().add_modifier(Modifier::UNDERLINED),
        ));
    }
    if cursor + 1 < reference.len() {
        spans.push(Span::styled(
            reference[cursor + 1..].iter().collect::<String>(),
            dim_bold(),
        ));
    }

    Paragraph::new(Line::from(spans))
        .alignment(if prompt_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[2], buf);

    if let Some(left) = app.exercise.remaining() {
        Paragraph::new(Span::styled(format_clock(left.as_secs_f64()), dim_bold()))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    }
}

fn render_quiz(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(quiz) = app.exercise.quiz() else {
        return;
    };
    let responses = app.exercise.responses();

    let mut lines = Vec::new();
    for (q_idx, question) in quiz.questions.iter().enumerate() {
        let selected = q_idx == app.selected_question;
        let marker = if selected { "▶ " } else { "  " };
        let prompt_style = if selected {
            bold().fg(Color::Cyan)
        } else {
            bold()
        };
        lines.push(Line::from(Span::styled(
            format!("{marker}{}. {}", q_idx + 1, question.prompt),
            prompt_style,
        )));

        let chosen = responses.get(q_idx).copied().flatten();
        for (o_idx, option) in question.options.iter().enumerate() {
            let style = if chosen == Some(o_idx) {
                bold().fg(Color::Green)
            } else {
                Style::default().add_modifier(Modifier::DIM)
            };
            lines.push(Line::from(Span::styled(
                format!("     {}) {option}", o_idx + 1),
                style,
            )));
        }
        lines.push(Line::from(""));
    }

    Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(record) = app.exercise.record() else {
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!(
                "{} wpm   {}% acc   {} errors",
                record.wpm, record.accuracy, record.errors
            ),
            bold(),
        )),
        Line::from(Span::styled(
            format!("typing {}", format_clock(record.typing_secs)),
            dim_bold(),
        )),
    ];

    if let (Some(reading_wpm), Some(reading_secs)) = (record.reading_wpm, record.reading_secs) {
        lines.push(Line::from(Span::styled(
            format!(
                "reading {} wpm in {}",
                reading_wpm,
                format_clock(reading_secs)
            ),
            dim_bold(),
        )));
    }
    if let (Some(correct), Some(total)) =
        (record.comprehension_correct, record.comprehension_total)
    {
        lines.push(Line::from(Span::styled(
            format!("comprehension {correct}/{total}"),
            bold().fg(Color::Cyan),
        )));
    }

    lines.push(Line::from(""));
    lines.push(match (app.exercise.is_saved(), app.exercise.last_error()) {
        (true, _) => Line::from(Span::styled("saved", bold().fg(Color::Green))),
        (false, Some(err)) => Line::from(Span::styled(
            format!("not saved: {err}"),
            bold().fg(Color::Red),
        )),
        (false, None) => Line::from(Span::styled("not saved yet", dim_bold())),
    });

    let height = lines.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(height),
                Constraint::Length(1),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(area);

    Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[0], buf);

    render_history(app, chunks[2], buf);
}

/// Every attempt finished since the program started, newest first
fn render_history(app: &App, area: Rect, buf: &mut Buffer) {
    if app.history.is_empty() {
        return;
    }

    let rows = app.history.iter().rev().map(|r| {
        Row::new(vec![
            Cell::from(r.timestamp.format("%H:%M:%S").to_string()),
            Cell::from(r.agent_id.clone()),
            Cell::from(format!("{:.2}", r.wpm)),
            Cell::from(format!("{:.2}%", r.accuracy)),
            Cell::from(r.errors.to_string()),
            Cell::from(format_clock(r.typing_secs)),
        ])
    });
    let widths = [
        Constraint::Length(9),
        Constraint::Min(10),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(6),
    ];

    Table::new(rows, widths)
        .header(
            Row::new(vec!["time", "agent", "wpm", "acc", "errors", "typing"])
                .style(bold().add_modifier(Modifier::UNDERLINED)),
        )
        .block(Block::default().title(Span::styled("attempts this session", dim_bold())))
        .render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::READING_SET;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use gincana::{config::Config, store::MemoryResultStore};

    fn create_test_app(prompt: &str) -> App {
        let cfg = Config {
            reference_text: Some(prompt.to_string()),
            countdown_secs: None,
            auto_save: false,
            ..Config::default()
        };
        App::new(cfg, Box::new(MemoryResultStore::default())).unwrap()
    }

    fn started(prompt: &str) -> App {
        let mut app = create_test_app(prompt);
        app.id_input = "agente-01".into();
        app.submit_agent_id();
        app
    }

    fn rendered(app: &App, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_id_prompt() {
        let mut app = create_test_app("hola mundo");
        app.id_input = "ana".into();

        let out = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(out.contains("Agent id"));
        assert!(out.contains("ana"));
        assert!(out.contains("(enter) start"));
    }

    #[test]
    fn test_typing_shows_prompt_and_clock() {
        let mut app = started("hola mundo");
        app.exercise.type_char('h').unwrap();
        app.exercise.type_char('x').unwrap();

        let out = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(out.contains("agente-01"));
        assert!(out.contains("hx"));
        assert!(out.contains("la mundo"));
        assert!(out.contains("01:00"));
    }

    #[test]
    fn test_results_screen() {
        let mut app = started("hola mundo");
        for c in "hola mundo".chars() {
            app.exercise.type_char(c).unwrap();
        }
        app.exercise.finish_typing().unwrap();

        let out = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(out.contains("100% acc"));
        assert!(out.contains("0 errors"));
        assert!(out.contains("not saved yet"));
        assert!(out.contains("(s)ave"));
    }

    #[test]
    fn test_results_list_attempts_of_this_run() {
        let mut app = create_test_app("hola mundo");
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        for agent in ["ana", "luis"] {
            if app.exercise.phase() == SessionPhase::Results {
                app.on_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE));
            }
            app.id_input = agent.into();
            app.submit_agent_id();
            app.exercise.set_submitted("hola mundo").unwrap();
            app.on_key(enter);
        }

        let out = rendered(&app, Rect::new(0, 0, 100, 30));

        assert!(out.contains("attempts this session"));
        assert!(out.contains("ana"));
        assert!(out.contains("luis"));
        assert_eq!(out.matches("100.00%").count(), 2);
    }

    #[test]
    fn test_countdown_screen() {
        let cfg = Config {
            reference_text: Some("hola mundo".into()),
            auto_save: false,
            ..Config::default()
        };
        let mut app = App::new(cfg, Box::new(MemoryResultStore::default())).unwrap();
        app.id_input = "agente-01".into();
        app.submit_agent_id();

        let out = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(out.contains("Get ready"));
        assert!(out.contains("00:0"));
        assert!(!out.contains("hola mundo"));
    }

    #[test]
    fn test_leading_space_is_not_painted_as_typed() {
        let mut app = started("hola mundo");
        app.exercise.type_char(' ').unwrap();
        app.exercise.type_char('h').unwrap();

        let out = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(!out.contains('·'));
        assert!(out.contains("hola mundo"));
    }

    #[test]
    fn test_results_screen_after_save() {
        let mut app = started("hola mundo");
        app.exercise.finish_typing().unwrap();
        app.save();

        let out = rendered(&app, Rect::new(0, 0, 80, 24));

        assert!(out.contains("saved"));
        assert!(out.contains("Result saved"));
    }

    #[test]
    fn test_quiz_screen() {
        let cfg = Config {
            passage_set: READING_SET.into(),
            reading: true,
            comprehension: true,
            countdown_secs: None,
            auto_save: false,
            ..Config::default()
        };
        let mut app = App::new(cfg, Box::new(MemoryResultStore::default())).unwrap();
        app.id_input = "ana".into();
        app.submit_agent_id();

        let reading = rendered(&app, Rect::new(0, 0, 100, 40));
        assert!(reading.contains("reading"));

        app.exercise.finish_reading().unwrap();
        app.exercise.finish_typing().unwrap();
        app.exercise.select_answer(0, 1).unwrap();

        let out = rendered(&app, Rect::new(0, 0, 100, 40));
        let first = &app.exercise.quiz().unwrap().questions[0];
        assert!(out.contains(first.prompt.as_str()));
        assert!(out.contains("▶"));
        assert!(out.contains("(enter) submit"));
    }

    #[test]
    fn test_small_and_large_areas() {
        let app = started("texto largo que no entra en una sola línea de un terminal pequeño");

        for area in [
            Rect::new(0, 0, 10, 5),
            Rect::new(0, 0, 20, 50),
            Rect::new(0, 0, 200, 5),
            Rect::new(0, 0, 300, 300),
        ] {
            let mut buffer = Buffer::empty(area);
            (&app).render(area, &mut buffer);
            assert!(*buffer.area() == area);
        }
    }

    #[test]
    fn test_centered_clamps_to_area() {
        let area = Rect::new(0, 0, 10, 4);
        assert_eq!(centered(area, 10), area);
        assert_eq!(centered(area, 2), Rect::new(0, 1, 10, 2));
    }
}

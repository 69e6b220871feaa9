#![cfg(feature = "tui")]

use crate::input::PromptInput;
use crate::pipeline::{ChatTurn, ResponsePipeline};
use crate::view::ResponseView;
use anyhow::Context;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use std::io;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Screen {
    input: PromptInput,
    scroll: u16,
    /// Set after a fatal failure; no more prompts are sent.
    locked: bool,
}

pub async fn run_tui(pipeline: ResponsePipeline) -> anyhow::Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel::<Event>();
    std::thread::spawn(move || {
        while let Ok(ev) = crossterm::event::read() {
            if ev_tx.send(ev).is_err() {
                break;
            }
        }
    });

    let mut turns = pipeline.subscribe();
    let mut screen = Screen::default();
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(33));

    let res = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let turn = turns.borrow().clone();
                if let Err(e) = draw(&mut terminal, pipeline.model(), &turn, &screen) {
                    break Err(e);
                }
            }
            Some(ev) = ev_rx.recv() => {
                if let Event::Key(key) = ev {
                    if handle_key(key, &mut screen, &pipeline) {
                        break Ok(());
                    }
                }
            }
            Ok(()) = turns.changed() => {
                let turn = turns.borrow_and_update().clone();
                on_turn(&mut screen, &turn);
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

/// React to a new slot value: jump to the top, lock input after a fatal error.
fn on_turn(screen: &mut Screen, turn: &ChatTurn) {
    screen.scroll = 0;
    if ResponseView::from_turn(turn).is_fatal() {
        screen.locked = true;
    }
}

/// Returns true when the user asked to quit.
fn handle_key(key: KeyEvent, screen: &mut Screen, pipeline: &ResponsePipeline) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return true,
            KeyCode::Char('u') => screen.input.clear(),
            KeyCode::Char('r') if !screen.locked => {
                pipeline.resubmit();
            }
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char(c) if !screen.locked => screen.input.insert(c),
        KeyCode::Backspace => screen.input.backspace(),
        KeyCode::Enter if !screen.locked => {
            pipeline.submit(screen.input.send());
        }
        KeyCode::Up => screen.scroll = screen.scroll.saturating_sub(1),
        KeyCode::Down => screen.scroll = screen.scroll.saturating_add(1),
        KeyCode::PageUp => screen.scroll = screen.scroll.saturating_sub(10),
        KeyCode::PageDown => screen.scroll = screen.scroll.saturating_add(10),
        _ => {}
    }

    false
}

fn draw(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: &str,
    turn: &ChatTurn,
    screen: &Screen,
) -> anyhow::Result<()> {
    let view = ResponseView::from_turn(turn);

    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(3)])
            .split(f.area());

        let mut text = Text::default();
        if turn.seq > 0 {
            text.lines.push(Line::styled(
                format!("you: {}", turn.prompt),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            text.lines.push(Line::from(""));
        }
        let style = match &view {
            ResponseView::Loading | ResponseView::Placeholder | ResponseView::NoResponse => {
                Style::default().add_modifier(Modifier::ITALIC)
            }
            ResponseView::Error { .. } => Style::default().add_modifier(Modifier::BOLD),
            ResponseView::Text(_) => Style::default(),
        };
        text.lines.extend(Text::styled(view.to_string(), style).lines);

        let output = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(format!("gemini-chat | model: {model}")))
            .wrap(Wrap { trim: false })
            .scroll((screen.scroll, 0));

        let title = if screen.locked {
            "input disabled (Esc to quit)"
        } else {
            "prompt (Enter send, Ctrl-R retry, Ctrl-U clear, Esc quit)"
        };
        let input_w = Paragraph::new(screen.input.draft().to_string())
            .block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(output, chunks[0]);
        f.render_widget(input_w, chunks[1]);

        let typed = u16::try_from(screen.input.draft().chars().count()).unwrap_or(u16::MAX);
        let x = (chunks[1].x + 1).saturating_add(typed);
        let y = chunks[1].y + 1;
        f.set_cursor_position((x.min(chunks[1].x + chunks[1].width.saturating_sub(2)), y));
    })?;
    Ok(())
}

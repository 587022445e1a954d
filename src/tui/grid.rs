use gridsynth::InstrumentKind;
use gridsynth::shared::STEPS;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::middle::DisplayState;

const LABEL_WIDTH: usize = 8;

// six rows of 16 cells; beats are grouped in fours
pub fn draw_step_grid(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let lines: Vec<Line> = InstrumentKind::ALL
        .iter()
        .enumerate()
        .map(|(row, kind)| grid_row(state, row, *kind))
        .collect();

    let block = Block::bordered().title(" pattern ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn grid_row(state: &DisplayState, row: usize, kind: InstrumentKind) -> Line<'static> {
    let muted = state.muted[row];
    let label_style = if muted {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
    } else if row == state.cursor_row {
        Style::default().fg(Color::LightMagenta).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    let mut spans = vec![Span::styled(format!("{:<LABEL_WIDTH$}", kind.label()), label_style)];
    for step in 0..STEPS {
        if step > 0 && step % 4 == 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(cell(state, row, step));
    }
    Line::from(spans)
}

fn cell(state: &DisplayState, row: usize, step: usize) -> Span<'static> {
    let on = state.grid[row][step];
    let symbol = if on { "■ " } else { "· " };
    let mut style = match (on, state.muted[row]) {
        (true, false) => Style::default().fg(Color::LightMagenta),
        (true, true) => Style::default().fg(Color::DarkGray),
        (false, _) => Style::default().fg(Color::DarkGray),
    };
    if state.playing && step == state.playhead {
        style = style.bg(Color::Rgb(60, 20, 60));
    }
    if row == state.cursor_row && step == state.cursor_step {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(symbol, style)
}

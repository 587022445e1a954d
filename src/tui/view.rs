use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

use crate::middle::DisplayState;

use super::grid::draw_step_grid;

const HELP: &str = "space play/stop  arrows move  enter toggle  m mute  a audition  +/- bpm  tab param  [ ] adjust\n\
g generate  p preset  r roll track  R roll sounds  e roll effects  c clear  esc quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let [header, grid, footer] = Layout::vertical([
        Constraint::Length(1), // transport line
        Constraint::Length(8), // six rows + border
        Constraint::Min(3),    // help + status
    ])
    .areas(area);

    draw_header(frame, header, state);
    draw_step_grid(frame, grid, state);
    draw_footer(frame, footer, state);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let transport = if state.playing { "▶ PLAY" } else { "■ STOP" };
    let text = format!(
        "{transport}  {:>3.0} bpm  step {:>2}  {} {:.2}  {}",
        state.bpm,
        state.playhead + 1,
        state.param.label(),
        state.param_value,
        state.pattern_name,
    );
    frame.render_widget(Paragraph::new(text).style(Style::default().fg(Color::White)), area);
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut lines: Vec<Line> = HELP
        .lines()
        .map(|l| Line::styled(l, Style::default().fg(Color::DarkGray)))
        .collect();
    if !state.status.is_empty() {
        lines.push(Line::styled(state.status.clone(), Style::default().fg(Color::Red)));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

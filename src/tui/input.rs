use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::middle::InputEvent;

const KNOB_STEP: f32 = 0.05;

// poll for one key press, resolving it into the events the middle layer handles
pub fn poll_input(timeout: Duration) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode) -> Vec<InputEvent> {
    let event = match code {
        KeyCode::Esc => InputEvent::Quit,
        KeyCode::Char(' ') => InputEvent::PlayPress,

        // cursor: arrows or vim keys
        KeyCode::Up | KeyCode::Char('k') => InputEvent::MoveCursor { rows: -1, steps: 0 },
        KeyCode::Down | KeyCode::Char('j') => InputEvent::MoveCursor { rows: 1, steps: 0 },
        KeyCode::Left | KeyCode::Char('h') => InputEvent::MoveCursor { rows: 0, steps: -1 },
        KeyCode::Right | KeyCode::Char('l') => InputEvent::MoveCursor { rows: 0, steps: 1 },

        KeyCode::Enter | KeyCode::Char('x') => InputEvent::ToggleCell,
        KeyCode::Char('m') => InputEvent::ToggleMute,
        KeyCode::Char('a') => InputEvent::Audition,
        KeyCode::Char('c') => InputEvent::Clear,

        KeyCode::Char('g') => InputEvent::Generate,
        KeyCode::Char('p') => InputEvent::NextPreset,
        KeyCode::Char('r') => InputEvent::RandomizeTrack,
        KeyCode::Char('R') => InputEvent::RandomizeSounds,
        KeyCode::Char('e') => InputEvent::RandomizeEffects,

        KeyCode::Char('+') | KeyCode::Char('=') => InputEvent::BpmUp,
        KeyCode::Char('-') => InputEvent::BpmDown,

        // knob for the selected param, tab cycles which one
        KeyCode::Tab => InputEvent::NextParam,
        KeyCode::Char('[') => InputEvent::AdjustParam(-KNOB_STEP),
        KeyCode::Char(']') => InputEvent::AdjustParam(KNOB_STEP),

        _ => return vec![],
    };
    vec![event]
}

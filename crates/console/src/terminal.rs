use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io;
use std::time::Duration;

/// Raw mode for the lifetime of the value, so single keypresses arrive
/// without Enter.
pub struct RawMode(());

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self(()))
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Wait up to `timeout` for a keypress. Returns `true` if one arrived; the
/// key itself is consumed.
pub fn key_pressed(timeout: Duration) -> io::Result<bool> {
    if !event::poll(timeout)? {
        return Ok(false);
    }
    match event::read()? {
        Event::Key(key) => Ok(key.kind == KeyEventKind::Press),
        _ => Ok(false),
    }
}

/// Block until a key is pressed, polling every `interval`.
pub fn wait_for_key(interval: Duration) -> io::Result<()> {
    while !key_pressed(interval)? {}
    Ok(())
}

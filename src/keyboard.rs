use std::{io, time::Duration};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, warn};

/// A key read from the keyboard.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Key {
    Char(char),
    /// Ctrl+C, which raw mode delivers as a key instead of a signal
    Interrupt,
}

impl Key {
    /// `q` ends the run. `Q` too, the prompt tells users to press "Q".
    pub fn is_termination(&self) -> bool {
        matches!(self, Key::Char('q' | 'Q'))
    }
}

/// A character input that can be switched into raw mode and read without blocking.
pub trait KeySource {
    fn enter_raw_mode(&mut self) -> io::Result<()>;
    fn leave_raw_mode(&mut self) -> io::Result<()>;
    /// Zero-timeout readiness check, then reads one key if one is ready.
    fn try_read_key(&mut self) -> io::Result<Option<Key>>;
}

/// The process' terminal, through crossterm.
#[derive(Default)]
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn enter_raw_mode(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()
    }

    fn leave_raw_mode(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()
    }

    fn try_read_key(&mut self) -> io::Result<Option<Key>> {
        if !event::poll(Duration::ZERO)? {
            return Ok(None);
        }
        Ok(match event::read()? {
            Event::Key(event) => key_from_event(event),
            _ => None,
        })
    }
}

/// Ctrl+C is the interrupt, other control chords are ignored so Ctrl+Q doesn't pass for `q`.
fn key_from_event(event: KeyEvent) -> Option<Key> {
    match event {
        KeyEvent {
            code: KeyCode::Char(c),
            modifiers,
            kind: KeyEventKind::Press,
            ..
        } if modifiers.contains(KeyModifiers::CONTROL) => {
            matches!(c, 'c' | 'C').then_some(Key::Interrupt)
        }
        KeyEvent {
            code: KeyCode::Char(c),
            kind: KeyEventKind::Press,
            ..
        } => Some(Key::Char(c)),
        _ => None,
    }
}

/// Keys fed by another task, for driving the controller without a terminal.
pub struct ChannelKeys {
    receiver: mpsc::UnboundedReceiver<Key>,
}

impl ChannelKeys {
    pub fn channel() -> (mpsc::UnboundedSender<Key>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self { receiver })
    }
}

impl KeySource for ChannelKeys {
    fn enter_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn leave_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn try_read_key(&mut self) -> io::Result<Option<Key>> {
        match self.receiver.try_recv() {
            Ok(key) => Ok(Some(key)),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => Ok(None),
        }
    }
}

/// Holds the key source in raw mode for as long as it lives.
///
/// Dropping the watcher restores the previous terminal mode, whatever way the owner exits.
pub struct KeyWatcher<'k, K: KeySource> {
    source: &'k mut K,
}

impl<'k, K: KeySource> KeyWatcher<'k, K> {
    pub fn acquire(source: &'k mut K) -> io::Result<Self> {
        source.enter_raw_mode()?;
        debug!("keyboard in raw mode");
        Ok(Self { source })
    }

    /// Never blocks: returns `None` right away when no key is pending.
    pub fn poll(&mut self) -> io::Result<Option<Key>> {
        self.source.try_read_key()
    }
}

impl<K: KeySource> Drop for KeyWatcher<'_, K> {
    fn drop(&mut self) {
        match self.source.leave_raw_mode() {
            Ok(()) => debug!("keyboard mode restored"),
            Err(e) => warn!("couldn't restore the terminal mode: {}", e),
        }
    }
}

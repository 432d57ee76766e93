//! Event handling for the TUI.
//!
//! Terminal input, periodic ticks and login daemon notifications all arrive
//! on one channel, so the app sees them strictly one at a time.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEventKind};
use tracing::error;

use crate::greeter::GreeterEvent;

/// Events delivered to the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Tick event for periodic updates.
    Tick,
    /// Key press event.
    Key(KeyEvent),
    /// Terminal resize event.
    Resize(u16, u16),
    /// Mouse button pressed anywhere.
    Click,
    /// Notification from the login daemon.
    Greeter(GreeterEvent),
}

impl From<GreeterEvent> for Event {
    fn from(event: GreeterEvent) -> Self {
        Event::Greeter(event)
    }
}

/// Event handler that polls the terminal in a separate thread.
#[derive(Debug)]
pub struct EventHandler {
    receiver: mpsc::Receiver<Event>,
    sender: mpsc::Sender<Event>,
}

impl EventHandler {
    /// Create a new event handler with the given tick rate in milliseconds.
    pub fn new(tick_rate: u64) -> Self {
        let tick_rate = Duration::from_millis(tick_rate);
        let (sender, receiver) = mpsc::channel();
        let input_sender = sender.clone();

        thread::spawn(move || poll_terminal(tick_rate, input_sender));

        Self { receiver, sender }
    }

    /// A sender for other producers, such as the greetd bridge.
    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.sender.clone()
    }

    /// Receive the next event from the handler.
    pub fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.receiver.recv()
    }
}

fn poll_terminal(tick_rate: Duration, sender: mpsc::Sender<Event>) {
    let mut last_tick = Instant::now();
    loop {
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(tick_rate);

        let ready = match event::poll(timeout) {
            Ok(ready) => ready,
            Err(e) => {
                error!("Failed to poll terminal events: {}", e);
                return;
            }
        };

        if ready {
            let translated = match event::read() {
                Ok(terminal_event) => translate(terminal_event),
                Err(e) => {
                    error!("Failed to read terminal event: {}", e);
                    return;
                }
            };
            if let Some(event) = translated {
                if sender.send(event).is_err() {
                    return;
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            if sender.send(Event::Tick).is_err() {
                return;
            }
            last_tick = Instant::now();
        }
    }
}

fn translate(event: CrosstermEvent) -> Option<Event> {
    match event {
        // Only key presses, not release or repeat
        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        CrosstermEvent::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
            Some(Event::Click)
        }
        CrosstermEvent::Resize(width, height) => Some(Event::Resize(width, height)),
        _ => None,
    }
}

//! Human-readable rendering of session events.

use owo_colors::OwoColorize;
use owo_colors::Style;
use parley_protocol::events::Event;
use parley_protocol::events::EventMsg;
use parley_protocol::events::SessionEnd;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn detect() -> Self {
        Self {
            enabled: supports_color::on(supports_color::Stream::Stdout).is_some(),
        }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.enabled {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    fn sender(&self, text: &str) -> String {
        self.paint(text, Style::new().cyan().bold())
    }

    fn notice(&self, text: &str) -> String {
        self.paint(text, Style::new().yellow())
    }

    fn dim(&self, text: &str) -> String {
        self.paint(text, Style::new().dimmed())
    }
}

/// Renders one event as a line of output. Failures are reported by the
/// caller, with the full error chain.
pub fn render_event(event: &Event, palette: Palette) -> Option<String> {
    match &event.msg {
        EventMsg::SessionStarted(ev) if ev.resumed_rounds > 0 => Some(palette.dim(&format!(
            "-- resuming session {} after {} round(s)",
            event.id, ev.resumed_rounds
        ))),
        EventMsg::SessionStarted(_) => None,
        EventMsg::TurnCompleted(ev) => Some(format!(
            "{}: {}",
            palette.sender(&ev.participant),
            ev.content
        )),
        EventMsg::RoundCommitted(_) | EventMsg::TurnFailed(_) => None,
        EventMsg::SessionEscalated(ev) => {
            let target = match &ev.handled_by {
                Some(id) => format!(", handing off to {id}"),
                None => String::new(),
            };
            Some(palette.notice(&format!(
                "-- escalated by {} in round {}{target}",
                ev.participant, ev.round
            )))
        }
        EventMsg::SessionCompleted(ev) => {
            let how = match ev.end {
                SessionEnd::Completed => "completed",
                SessionEnd::Escalated => "escalated",
                SessionEnd::Cancelled => "cancelled",
            };
            Some(palette.dim(&format!("-- session {how} after {} round(s)", ev.rounds)))
        }
    }
}

/// Prints events until every sender is gone.
pub async fn print_events(mut rx: UnboundedReceiver<Event>, palette: Palette) {
    while let Some(event) = rx.recv().await {
        if let Some(line) = render_event(&event, palette) {
            println!("{line}");
        }
    }
}

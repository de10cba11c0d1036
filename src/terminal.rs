//! Line-oriented terminal front end

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::assistant::{Intent, View};
use crate::conversation::{Message, Role, Status};
use crate::i18n::{Locale, Phrase};
use crate::quick::{self, QUICK_COMMANDS};

/// Prints conversation changes to stdout
pub struct TerminalView {
    locale: Locale,
}

impl TerminalView {
    #[must_use]
    pub const fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Print the key bindings and quick commands
    pub fn print_help(&self) {
        let (mic, retry, quit) = match self.locale {
            Locale::Urdu => ("مائیک شروع/بند", "دوبارہ رابطہ", "باہر نکلیں"),
            Locale::English => ("start/stop microphone", "retry connection", "quit"),
        };

        println!("  Enter  {mic}");
        for (i, command) in QUICK_COMMANDS.iter().enumerate() {
            println!("  {}      {}", i + 1, command.label(self.locale));
        }
        println!("  r      {retry}");
        println!("  q      {quit}");
        println!();
    }

    const fn speaker(&self, role: Role) -> &'static str {
        match (self.locale, role) {
            (Locale::Urdu, Role::User) => "آپ",
            (Locale::Urdu, Role::Assistant) => "اسسٹنٹ",
            (Locale::English, Role::User) => "You",
            (Locale::English, Role::Assistant) => "Assistant",
        }
    }
}

impl View for TerminalView {
    fn status_changed(&mut self, status: Status) {
        println!("[{}]", self.locale.status(status));
    }

    fn message_appended(&mut self, message: &Message) {
        println!(
            "{} {}: {}",
            message.created_at().with_timezone(&chrono::Local).format("%H:%M"),
            self.speaker(message.role()),
            message.text()
        );
    }

    fn error_shown(&mut self, text: &str) {
        eprintln!("! {text}");
    }

    fn error_cleared(&mut self) {}

    fn connectivity_changed(&mut self, connected: bool) {
        let phrase = if connected {
            Phrase::BackendConnected
        } else {
            Phrase::BackendDisconnected
        };
        println!("({})", self.locale.phrase(phrase));
    }

    fn notice(&mut self, text: &str) {
        println!("({text})");
    }
}

/// Map one input line to an intent
///
/// An empty line toggles the microphone; a quick command number sends that
/// command; anything else is sent as typed.
#[must_use]
pub fn parse_line(line: &str) -> Intent {
    let line = line.trim();

    match line {
        "" => Intent::Microphone,
        "q" | "quit" | "exit" => Intent::Quit,
        "r" | "retry" => Intent::RetryConnection,
        _ if line.chars().all(|c| c.is_ascii_digit()) => quick::find(line).map_or_else(
            || Intent::Command(line.to_string()),
            |q| Intent::Command(q.command.to_string()),
        ),
        _ => Intent::Command(line.to_string()),
    }
}

/// Read stdin lines on a background task and forward them as intents
///
/// The receiver closes when stdin reaches end of file.
#[must_use]
pub fn spawn_input_reader() -> UnboundedReceiver<Intent> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(parse_line(&line)).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "failed to read input");
                    break;
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_line_toggles_microphone() {
        assert_eq!(parse_line(""), Intent::Microphone);
        assert_eq!(parse_line("   "), Intent::Microphone);
    }

    #[test]
    fn test_quick_command_numbers() {
        assert_eq!(parse_line("2"), Intent::Command("what time is it".to_string()));
        assert_eq!(parse_line("42"), Intent::Command("42".to_string()));
    }

    #[test]
    fn test_controls_and_text() {
        assert_eq!(parse_line("q"), Intent::Quit);
        assert_eq!(parse_line("r"), Intent::RetryConnection);
        assert_eq!(
            parse_line(" موسم کیسا ہے "),
            Intent::Command("موسم کیسا ہے".to_string())
        );
    }
}

//! Predefined one-tap commands

use crate::i18n::Locale;

/// A shortcut sent to the command service as plain text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickCommand {
    pub label_ur: &'static str,
    pub label_en: &'static str,
    /// Text submitted to the service
    pub command: &'static str,
}

impl QuickCommand {
    /// Label in the given UI language
    #[must_use]
    pub const fn label(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::Urdu => self.label_ur,
            Locale::English => self.label_en,
        }
    }
}

pub const QUICK_COMMANDS: [QuickCommand; 6] = [
    QuickCommand {
        label_ur: "موسم بتائیں",
        label_en: "Weather",
        command: "weather",
    },
    QuickCommand {
        label_ur: "وقت بتائیں",
        label_en: "Time",
        command: "what time is it",
    },
    QuickCommand {
        label_ur: "تاریخ بتائیں",
        label_en: "Date",
        command: "what is the date",
    },
    QuickCommand {
        label_ur: "لطیفہ سنائیں",
        label_en: "Joke",
        command: "tell me a joke",
    },
    QuickCommand {
        label_ur: "ہیلو",
        label_en: "Hello",
        command: "hello",
    },
    QuickCommand {
        label_ur: "مدد",
        label_en: "Help",
        command: "help",
    },
];

/// Look up a quick command by 1-based position or by its command text
#[must_use]
pub fn find(selector: &str) -> Option<&'static QuickCommand> {
    let selector = selector.trim();

    if let Ok(index) = selector.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| QUICK_COMMANDS.get(i));
    }

    QUICK_COMMANDS
        .iter()
        .find(|q| q.command.eq_ignore_ascii_case(selector) || q.label_ur == selector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_index() {
        assert_eq!(find("1").map(|q| q.command), Some("weather"));
        assert_eq!(find(" 6 ").map(|q| q.command), Some("help"));
        assert!(find("0").is_none());
        assert!(find("7").is_none());
    }

    #[test]
    fn test_find_by_text() {
        assert_eq!(find("Tell me a joke").map(|q| q.label_en), Some("Joke"));
        assert_eq!(find("ہیلو").map(|q| q.command), Some("hello"));
        assert!(find("sing a song").is_none());
    }

    #[test]
    fn test_labels() {
        assert_eq!(QUICK_COMMANDS[0].label(Locale::Urdu), "موسم بتائیں");
        assert_eq!(QUICK_COMMANDS[0].label(Locale::English), "Weather");
    }
}

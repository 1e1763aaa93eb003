use colored::Colorize;
use posts_sync::notify::{Notification, NotificationKind, Notifier};

/// Prints notifications the moment they arrive.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Positive => {
                println!("{} {}", "✓".green().bold(), notification.message.green())
            }
            NotificationKind::Negative => {
                eprintln!("{} {}", "✗".red().bold(), notification.message.red())
            }
        }
    }
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
    }
}

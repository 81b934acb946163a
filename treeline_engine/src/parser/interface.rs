use terminal_size::{terminal_size, Width};

// Used when the terminal width cannot be determined (ex: output is piped).
pub(crate) const DEFAULT_TERMINAL_WIDTH: usize = 80;

// Let's assume the average word length is 5.
// Then 17 is a good minimum, because it allows precisely 3 words with a space between them.
pub(crate) const MINIMUM_WRAP_WIDTH: usize = 17;

pub(crate) fn terminal_width() -> usize {
    match terminal_size() {
        Some((Width(width), _)) => width as usize,
        None => DEFAULT_TERMINAL_WIDTH,
    }
}

/// Break a paragraph into lines of at most `width` characters, hyphenating words that don't fit on a line of their own.
pub(crate) fn chunk(paragraph: &str, width: usize) -> Vec<String> {
    let width = std::cmp::max(width, MINIMUM_WRAP_WIDTH);
    let mut lines = Vec::default();
    let mut current = String::default();

    for word in paragraph.split(' ') {
        if !word.is_empty() {
            if current.is_empty() {
                hyphenate(width, &mut lines, &mut current, word);
            } else if current.chars().count() + word.chars().count() < width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(current);
                current = String::default();
                hyphenate(width, &mut lines, &mut current, word);
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

fn hyphenate(width: usize, lines: &mut Vec<String>, current: &mut String, word: &str) {
    let characters: Vec<char> = word.chars().collect();
    let increment = width - 1;
    let mut left = 0;
    let mut right = increment;

    while right + 1 < characters.len() {
        let part: String = characters[left..right].iter().collect();
        lines.push(format!("{part}-"));
        left += increment;
        right += increment;
    }

    current.extend(&characters[left..]);
}

/// Where the embedding boundary sends its output.
pub(crate) trait UserInterface {
    fn print(&self, message: String);
    fn print_error(&self, error: String);
    fn print_warning(&self, warning: String);
}

#[derive(Default)]
pub(crate) struct ConsoleInterface {}

impl UserInterface for ConsoleInterface {
    fn print(&self, message: String) {
        println!("{message}");
    }

    fn print_error(&self, error: String) {
        for line in chunk(&error, terminal_width()) {
            eprintln!("{line}");
        }
    }

    fn print_warning(&self, warning: String) {
        for line in chunk(&warning, terminal_width()) {
            eprintln!("{line}");
        }
    }
}

#[cfg(feature = "unit_test")]
#[derive(Default)]
pub(crate) struct SilentInterface {}

#[cfg(feature = "unit_test")]
impl UserInterface for SilentInterface {
    fn print(&self, _message: String) {}

    fn print_error(&self, _error: String) {}

    fn print_warning(&self, _warning: String) {}
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", 20, vec![])]
    #[case("   ", 20, vec![])]
    #[case("abc", 20, vec!["abc"])]
    #[case("abc def", 20, vec!["abc def"])]
    #[case("abc  def", 20, vec!["abc def"])]
    #[case("the quick brown fox jumps over", 20, vec!["the quick brown fox", "jumps over"])]
    #[case("the quick brown fox jumps over", 1, vec!["the quick brown", "fox jumps over"])]
    #[case("abcdefghijklmnopqrstuvwxyz", 20, vec!["abcdefghijklmnopqrs-", "tuvwxyz"])]
    #[case("a abcdefghijklmnopqrstuvwxyz", 20, vec!["a", "abcdefghijklmnopqrs-", "tuvwxyz"])]
    fn chunk_paragraph(#[case] paragraph: &str, #[case] width: usize, #[case] expected: Vec<&str>) {
        assert_eq!(chunk(paragraph, width), expected);
    }

    #[test]
    fn chunk_fits_width() {
        let paragraph = "Parse error: too few values provided for 'optimizer.betas' (provided=1, expected=2).";

        for width in MINIMUM_WRAP_WIDTH..paragraph.len() + 2 {
            for line in chunk(paragraph, width) {
                assert!(
                    line.chars().count() <= width,
                    "'{line}' exceeds width {width}"
                );
            }
        }
    }

    #[test]
    fn channel_interface_consume() {
        // Setup
        let (sender, receiver) = util::channel_interface();

        // Execute
        sender.print("a".to_string());
        sender.print("b".to_string());
        sender.print_warning("c".to_string());
        drop(sender);

        // Verify
        let (message, error, warning) = receiver.consume();
        assert_eq!(message, Some("a\nb".to_string()));
        assert_eq!(error, None);
        assert_eq!(warning, Some("c".to_string()));
    }
}

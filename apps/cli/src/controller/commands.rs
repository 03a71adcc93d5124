//! Keys accepted by the interactive review loop.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnCommand {
    Know,
    DontKnow,
    Next,
    Undo,
    Reset,
    Help,
    Quit,
}

impl LearnCommand {
    /// Parses one input line. An empty line means "next".
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "k" | "know" | "y" => Some(Self::Know),
            "n" | "no" | "dont" => Some(Self::DontKnow),
            "" | "p" | "next" => Some(Self::Next),
            "u" | "undo" => Some(Self::Undo),
            "r" | "reset" => Some(Self::Reset),
            "h" | "?" | "help" => Some(Self::Help),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Know => "know",
            Self::DontKnow => "dont_know",
            Self::Next => "next",
            Self::Undo => "undo",
            Self::Reset => "reset",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

pub const HELP: &str = "\
[k] I know this word   [n] I don't know   [Enter] next
[u] undo \"known\"       [r] start today over (when done)   [q] quit";

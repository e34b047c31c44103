//! REPL command parsing.

use std::path::{Path, PathBuf};

use kuberya_chat::RawFile;

pub const HELP: &str = "\
Commands:
  /attach <path>     stage a file for the next message
  /detach <n>        unstage attachment n
  /voice             toggle voice mode
  /listen            start or stop listening (voice mode)
  /new               start a new conversation
  /history           list past interactions
  /select <n>        highlight history entry n
  /delete <n>        delete history entry n
  /clear-history     delete every history entry
  /model <label>     switch assistant model
  /models            list known models
  /theme             toggle dark mode
  /support <text>    message customer support
  /export            print history and messages as JSON
  /retry             retry the last failed reply
  /logout, /login    leave or re-enter the app
  /help              show this help
  /quit              exit
Anything else is sent to the assistant.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Attach(PathBuf),
    /// Zero-based index.
    Detach(usize),
    Voice,
    Listen,
    New,
    History,
    /// Zero-based index.
    Select(usize),
    /// Zero-based index.
    Delete(usize),
    ClearHistory,
    Model(String),
    Models,
    Theme,
    Support(String),
    Export,
    Retry,
    Logout,
    Login,
    Help,
    Quit,
    /// Plain text for the assistant.
    Send(String),
    /// A known command used wrongly; carries the usage line.
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Send(line.to_string());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "attach" if !arg.is_empty() => Command::Attach(PathBuf::from(arg)),
            "attach" => Command::Usage("/attach <path>"),
            "detach" => parse_position(arg).map_or(Command::Usage("/detach <n>"), Command::Detach),
            "voice" => Command::Voice,
            "listen" => Command::Listen,
            "new" => Command::New,
            "history" => Command::History,
            "select" => parse_position(arg).map_or(Command::Usage("/select <n>"), Command::Select),
            "delete" => parse_position(arg).map_or(Command::Usage("/delete <n>"), Command::Delete),
            "clear-history" => Command::ClearHistory,
            "model" if !arg.is_empty() => Command::Model(arg.to_string()),
            "model" => Command::Usage("/model <label>"),
            "models" => Command::Models,
            "theme" => Command::Theme,
            "support" if !arg.is_empty() => Command::Support(arg.to_string()),
            "support" => Command::Usage("/support <text>"),
            "export" => Command::Export,
            "retry" => Command::Retry,
            "logout" => Command::Logout,
            "login" => Command::Login,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// One-based position typed by the user, as a zero-based index.
fn parse_position(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok()?.checked_sub(1)
}

/// Read a file from disk for staging. The MIME type is guessed from the
/// extension; contents are never inspected.
pub async fn load_attachment(path: &Path) -> std::io::Result<RawFile> {
    let bytes = tokio::fs::read(path).await?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(RawFile::new(mime_type, display_name, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_plain_text_is_sent_verbatim() {
        assert_eq!(
            Command::parse("  what is rust?  "),
            Command::Send("  what is rust?  ".to_string())
        );
        assert_eq!(Command::parse(""), Command::Send(String::new()));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::parse("/voice"), Command::Voice);
        assert_eq!(Command::parse("/new"), Command::New);
        assert_eq!(Command::parse(" /quit "), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/clear-history"), Command::ClearHistory);
    }

    #[test]
    fn test_positions_are_one_based() {
        assert_eq!(Command::parse("/select 1"), Command::Select(0));
        assert_eq!(Command::parse("/delete 3"), Command::Delete(2));
        assert_eq!(Command::parse("/detach 2"), Command::Detach(1));
        assert_eq!(Command::parse("/select 0"), Command::Usage("/select <n>"));
        assert_eq!(Command::parse("/delete x"), Command::Usage("/delete <n>"));
    }

    #[test]
    fn test_arguments_keep_inner_spaces() {
        assert_eq!(
            Command::parse("/model Mentify 3"),
            Command::Model("Mentify 3".to_string())
        );
        assert_eq!(
            Command::parse("/attach /tmp/my notes.txt"),
            Command::Attach(PathBuf::from("/tmp/my notes.txt"))
        );
        assert_eq!(Command::parse("/model"), Command::Usage("/model <label>"));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(Command::parse("/dance"), Command::Unknown("dance".to_string()));
    }

    #[tokio::test]
    async fn test_load_attachment_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&[0x89, b'P', b'N', b'G'])
            .unwrap();

        let file = load_attachment(&path).await.unwrap();
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.display_name, "photo.png");
        assert_eq!(file.bytes.len(), 4);
    }

    #[tokio::test]
    async fn test_load_attachment_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.zzqx");
        std::fs::write(&path, b"??").unwrap();
        let file = load_attachment(&path).await.unwrap();
        assert_eq!(file.mime_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_load_attachment_missing_file() {
        assert!(load_attachment(Path::new("/definitely/not/here.txt")).await.is_err());
    }
}

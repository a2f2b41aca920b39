use std::io::BufRead;
use std::sync::mpsc::Sender;

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Capture,
    SwitchCamera,
    RotateDisplay,
    Quit,
}

impl UserAction {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "c" | "capture" => Some(UserAction::Capture),
            "s" | "switch" => Some(UserAction::SwitchCamera),
            "r" | "rotate" => Some(UserAction::RotateDisplay),
            "q" | "quit" | "exit" => Some(UserAction::Quit),
            _ => None,
        }
    }
}

pub const HELP: &str = "Commands: [c]apture, [s]witch camera, [r]otate display, [q]uit";

/// Forward stdin commands to the display loop. EOF counts as quit.
pub fn spawn_stdin_reader(actions: Sender<UserAction>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match UserAction::parse(&line) {
                    Some(action) => {
                        if actions.send(action).is_err() {
                            return;
                        }
                    }
                    None => println!("{}", HELP),
                }
            }
            let _ = actions.send(UserAction::Quit);
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_and_long_forms() {
        assert_eq!(UserAction::parse("c"), Some(UserAction::Capture));
        assert_eq!(UserAction::parse(" Switch \n"), Some(UserAction::SwitchCamera));
        assert_eq!(UserAction::parse("r"), Some(UserAction::RotateDisplay));
        assert_eq!(UserAction::parse("quit"), Some(UserAction::Quit));
        assert_eq!(UserAction::parse("zoom"), None);
    }
}

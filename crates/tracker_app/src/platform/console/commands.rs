use tracker_core::TaskId;

pub const HELP: &str = "\
commands:
  add <id>        start tracking a task
  dismiss <id>    stop tracking a task (alias: remove)
  stop <id>       ask the backend to abort a running task
  list            redraw the task list
  login [token]   start a session, optionally with a new token
  logout          end the session and forget every task
  help            show this text
  quit            exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(TaskId),
    Dismiss(TaskId),
    Stop(TaskId),
    List,
    Login(Option<String>),
    Logout,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    MissingId(&'static str),
    Unknown(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::MissingId(verb) => write!(f, "`{verb}` needs a task id"),
            ParseError::Unknown(verb) => write!(f, "unknown command `{verb}`; try `help`"),
        }
    }
}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or(ParseError::Empty)?;
    let arg = words.next();

    let task_id = |verb: &'static str| {
        arg.and_then(TaskId::parse)
            .ok_or(ParseError::MissingId(verb))
    };

    match verb.to_ascii_lowercase().as_str() {
        "add" | "open" => Ok(Command::Add(task_id("add")?)),
        "dismiss" | "remove" | "rm" => Ok(Command::Dismiss(task_id("dismiss")?)),
        "stop" => Ok(Command::Stop(task_id("stop")?)),
        "list" | "ls" => Ok(Command::List),
        "login" => Ok(Command::Login(arg.map(str::to_string))),
        "logout" => Ok(Command::Logout),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        _ => Err(ParseError::Unknown(verb.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_canonicalized() {
        assert_eq!(parse("add 007"), Ok(Command::Add(TaskId::from(7u64))));
        assert_eq!(parse("  REMOVE   12 "), Ok(Command::Dismiss(TaskId::from("12"))));
    }

    #[test]
    fn id_commands_require_an_id() {
        assert_eq!(parse("stop"), Err(ParseError::MissingId("stop")));
        assert_eq!(parse("add"), Err(ParseError::MissingId("add")));
    }

    #[test]
    fn login_token_is_optional() {
        assert_eq!(parse("login"), Ok(Command::Login(None)));
        assert_eq!(parse("login abc"), Ok(Command::Login(Some("abc".into()))));
    }

    #[test]
    fn unknown_and_blank_lines_are_errors() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("fly 3"), Err(ParseError::Unknown("fly".into())));
    }
}

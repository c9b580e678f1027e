//! Command invocation parsing.
//!
//! A message is a command when it starts with the configured prefix, e.g.
//! `$protect Billing "Bot Admin"`. Arguments are whitespace separated;
//! double quotes group an argument that contains spaces.

use thiserror::Error;

/// A parsed command: the command name plus its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    command: String,
    args: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("unterminated quote in command arguments")]
    UnterminatedQuote,
}

impl Invocation {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Parse `content` as a command invocation.
    ///
    /// Returns `Ok(None)` when the message is not addressed to the bot (no
    /// prefix, or nothing after it).
    pub fn parse(prefix: &str, content: &str) -> Result<Option<Self>, InvocationError> {
        let Some(rest) = content.strip_prefix(prefix) else {
            return Ok(None);
        };

        let mut tokens = tokenize(rest)?.into_iter();
        let Some(command) = tokens.next() else {
            return Ok(None);
        };

        Ok(Some(Self {
            command,
            args: tokens.collect(),
        }))
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

fn tokenize(input: &str) -> Result<Vec<String>, InvocationError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(InvocationError::UnterminatedQuote);
    }
    if has_token {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_messages_without_prefix() {
        assert_eq!(Invocation::parse("$", "hello there").unwrap(), None);
        assert_eq!(Invocation::parse("$", "$").unwrap(), None);
        assert_eq!(Invocation::parse("$", "$   ").unwrap(), None);
    }

    #[test]
    fn splits_command_and_arguments() {
        let inv = Invocation::parse("$", "$protect Billing  <@&42>").unwrap().unwrap();
        assert_eq!(inv.command(), "protect");
        assert_eq!(inv.args(), ["Billing", "<@&42>"]);
        assert_eq!(inv.arg(1), Some("<@&42>"));
        assert_eq!(inv.arg(2), None);
    }

    #[test]
    fn quoted_arguments_keep_spaces() {
        let inv = Invocation::parse("$", r#"$require_role Reports "Senior Auditor""#)
            .unwrap()
            .unwrap();
        assert_eq!(inv.args(), ["Reports", "Senior Auditor"]);
    }

    #[test]
    fn empty_quotes_produce_an_empty_argument() {
        let inv = Invocation::parse("!", r#"!say """#).unwrap().unwrap();
        assert_eq!(inv.args(), [""]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = Invocation::parse("$", r#"$protect "Billing"#).unwrap_err();
        assert_eq!(err, InvocationError::UnterminatedQuote);
    }
}

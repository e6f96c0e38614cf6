//! Wire-line parsing.
//!
//! One line of the protocol, in full:
//!
//! ```text
//! @key1=val1;key2=val2 :nick!user@host COMMAND #channel :trailing contents
//! ```
//!
//! Tag block, identity prefix, channel, and trailing are all optional. A
//! [`Message`] is constructed fresh per line and discarded once it has been
//! classified into an event; it is never retained.

use std::collections::BTreeMap;

use tracing::debug;

/// The intermediate parse result of one wire line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Tag map from the `@`-prefixed block. Keys are unique; order is not
    /// meaningful.
    pub tags: BTreeMap<String, String>,
    /// User from the identity prefix (`nick` before the `!`), empty if the
    /// line carried no prefix.
    pub user: String,
    /// Command token, e.g. `PRIVMSG`, `USERNOTICE`, `PING`.
    pub command: String,
    /// Target channel (`#name`), empty if the line carried none.
    pub channel: String,
    /// Contents after the `:` sentinel, empty if the line carried none.
    pub trailing: String,
}

impl Message {
    /// Parses one wire line. Never fails: malformed tag segments are
    /// skipped, missing sections stay empty.
    pub fn parse(line: &str) -> Self {
        let mut msg = Self::default();
        let mut rest = line.trim();

        // Tag block.
        if let Some(tag_block) = rest.strip_prefix('@') {
            let (block, remainder) = split_token(tag_block);
            rest = remainder;
            for segment in block.split(';') {
                if segment.is_empty() {
                    // Dangling separator; tolerated, registers nothing.
                    continue;
                }
                match segment.split_once('=') {
                    Some((key, value)) if !key.is_empty() => {
                        msg.tags.insert(key.to_string(), value.to_string());
                    }
                    _ => debug!(segment = %segment, "skipping malformed tag segment"),
                }
            }
        }

        // Identity prefix.
        if rest.starts_with(':') {
            let (prefix, remainder) = split_token(rest);
            rest = remainder;
            msg.user = prefix[1..].split('!').next().unwrap_or_default().to_string();
        }

        // Command token.
        let (command, remainder) = split_token(rest);
        msg.command = command.to_string();
        rest = remainder;

        // Params: the first `#`-token is the channel, the `:` sentinel
        // starts the trailing contents; anything else is ignored.
        while !rest.is_empty() {
            if let Some(trailing) = rest.strip_prefix(':') {
                msg.trailing = trailing.to_string();
                break;
            }
            let (token, remainder) = split_token(rest);
            if msg.channel.is_empty() && token.starts_with('#') {
                msg.channel = token.to_string();
            }
            rest = remainder;
        }

        msg
    }

    /// Returns the tag value, or an empty string when absent.
    pub fn tag(&self, name: &str) -> &str {
        self.tags.get(name).map(String::as_str).unwrap_or_default()
    }
}

/// Serializes back to wire grammar. Re-parsing the output classifies
/// identically to the original line.
impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.tags.is_empty() {
            let tags = self
                .tags
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(";");
            write!(f, "@{tags} ")?;
        }
        if !self.user.is_empty() {
            write!(f, ":{user}!{user}@{user} ", user = self.user)?;
        }
        write!(f, "{}", self.command)?;
        if !self.channel.is_empty() {
            write!(f, " {}", self.channel)?;
        }
        if !self.trailing.is_empty() {
            write!(f, " :{}", self.trailing)?;
        }
        Ok(())
    }
}

/// Splits off the first space-delimited token.
fn split_token(input: &str) -> (&str, &str) {
    match input.split_once(' ') {
        Some((token, rest)) => (token, rest.trim_start()),
        None => (input, ""),
    }
}

//! POP3 command parsing.
//!
//! A command line is a leading run of ASCII letters (the verb, matched
//! case-insensitively) followed by the rest of the line, trimmed, as the
//! raw argument string. Argument interpretation is left to whoever
//! handles the verb; this module never splits arguments, so values with
//! embedded spaces (usernames, passwords) survive intact.

use std::fmt;

/// The closed set of verbs this library recognizes.
///
/// Anything outside this set is reported by [`Request::token`] so the
/// server can echo the unrecognized name back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// CAPA - capability listing (RFC 2449).
    Capa,
    /// QUIT - end the session, purging delete-marked messages first
    /// when issued from the transaction stage.
    Quit,
    /// USER - name the account to authenticate.
    User,
    /// PASS - password for a previously named account.
    Pass,
    /// AUTH - SASL mechanism negotiation (RFC 5034).
    Auth,
    /// NOOP - keep-alive, no effect.
    Noop,
    /// STAT - live message count and total octets.
    Stat,
    /// LIST - per-message sizes.
    List,
    /// UIDL - per-message persistent unique ids.
    Uidl,
    /// RETR - retrieve a full message.
    Retr,
    /// DELE - mark a message deleted.
    Dele,
    /// RSET - clear all delete marks.
    Rset,
}

impl Verb {
    /// Every recognized verb.
    pub const ALL: [Verb; 12] = [
        Verb::Capa,
        Verb::Quit,
        Verb::User,
        Verb::Pass,
        Verb::Auth,
        Verb::Noop,
        Verb::Stat,
        Verb::List,
        Verb::Uidl,
        Verb::Retr,
        Verb::Dele,
        Verb::Rset,
    ];

    /// Match a token against the verb set, ASCII case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|verb| token.eq_ignore_ascii_case(verb.as_str()))
    }

    /// Canonical upper-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Verb::Capa => "CAPA",
            Verb::Quit => "QUIT",
            Verb::User => "USER",
            Verb::Pass => "PASS",
            Verb::Auth => "AUTH",
            Verb::Noop => "NOOP",
            Verb::Stat => "STAT",
            Verb::List => "LIST",
            Verb::Uidl => "UIDL",
            Verb::Retr => "RETR",
            Verb::Dele => "DELE",
            Verb::Rset => "RSET",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command line: the verb token exactly as the client sent it,
/// plus the trimmed remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    token: &'a str,
    args: &'a str,
}

impl<'a> Request<'a> {
    /// Split a line into its verb token and argument string.
    ///
    /// Returns `None` when the line does not begin with an ASCII
    /// letter; such a line is not a command at all.
    pub fn parse(line: &'a str) -> Option<Self> {
        let end = line
            .bytes()
            .take_while(|byte| byte.is_ascii_alphabetic())
            .count();
        if end == 0 {
            return None;
        }
        Some(Self {
            token: &line[..end],
            args: line[end..].trim(),
        })
    }

    /// The verb token in its original case, for error echoes.
    pub fn token(&self) -> &'a str {
        self.token
    }

    /// The recognized verb, when the token names one.
    pub fn verb(&self) -> Option<Verb> {
        Verb::parse(self.token)
    }

    /// Trimmed argument string; empty when no arguments were given.
    pub fn args(&self) -> &'a str {
        self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_verb() {
        let req = Request::parse("STAT").unwrap();
        assert_eq!(req.verb(), Some(Verb::Stat));
        assert_eq!(req.args(), "");
    }

    #[test]
    fn test_parse_with_args() {
        let req = Request::parse("RETR 2").unwrap();
        assert_eq!(req.verb(), Some(Verb::Retr));
        assert_eq!(req.args(), "2");
    }

    #[test]
    fn test_parse_case_insensitive() {
        for line in ["quit", "Quit", "qUIt"] {
            assert_eq!(Request::parse(line).unwrap().verb(), Some(Verb::Quit));
        }
    }

    #[test]
    fn test_parse_preserves_token_case() {
        let req = Request::parse("xyzzy on").unwrap();
        assert_eq!(req.verb(), None);
        assert_eq!(req.token(), "xyzzy");
        assert_eq!(req.args(), "on");
    }

    #[test]
    fn test_parse_rejects_non_alphabetic_start() {
        assert!(Request::parse("9").is_none());
        assert!(Request::parse(" USER bob").is_none());
        assert!(Request::parse("").is_none());
        assert!(Request::parse("+OK").is_none());
    }

    #[test]
    fn test_args_keep_inner_spaces() {
        let req = Request::parse("USER bob smith ").unwrap();
        assert_eq!(req.args(), "bob smith");
    }

    #[test]
    fn test_verb_token_stops_at_first_non_letter() {
        let req = Request::parse("USER5 bob").unwrap();
        assert_eq!(req.verb(), Some(Verb::User));
        assert_eq!(req.args(), "5 bob");
    }

    #[test]
    fn test_all_verbs_round_trip() {
        for verb in Verb::ALL {
            assert_eq!(Verb::parse(verb.as_str()), Some(verb));
            assert_eq!(Verb::parse(&verb.as_str().to_lowercase()), Some(verb));
        }
    }
}

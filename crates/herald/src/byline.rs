//! Byline parsing port.
//!
//! Recipient lists arrive as free text ("alice, bob (AO3)"). Resolution to
//! pseuds is lenient and lives outside this core; the dispatcher only
//! consumes the parse result.

use crate::creation::Pseud;

/// Options threaded through to the external parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Treat a bare name with no matching pseud as that user's login and
    /// try the default pseud.
    pub assume_matching_login: bool,
}

/// Best-effort parse result. Ambiguous bylines may resolve to several
/// pseuds or to none; the caller deduplicates by user.
#[derive(Debug, Clone, Default)]
pub struct ParsedBylines {
    pub pseuds: Vec<Pseud>,
}

pub trait BylineParser {
    fn parse(&self, text: &str, options: ParseOptions) -> ParsedBylines;
}

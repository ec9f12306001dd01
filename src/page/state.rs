/// Resolution state definitions for a page
///
/// A page moves strictly forward through these states and reaches `Done`
/// exactly once, whichever branch ended it.
use std::fmt;

/// Represents how far a page's resolution has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveState {
    /// Page constructed, nothing fetched yet
    Created,

    /// Document request issued, waiting for its result
    FetchingDocument,

    /// Document fetched, scanning it for referenced resources
    Discovering,

    /// Asset requests issued, collecting their results
    FetchingAssets,

    /// Resolution finished, successfully or not
    Done,
}

impl ResolveState {
    /// Returns true if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the state machine allows moving from `self` to `next`
    ///
    /// Failures of the document fetch or of discovery jump straight to `Done`.
    pub fn can_transition_to(&self, next: ResolveState) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::FetchingDocument)
                | (Self::FetchingDocument, Self::Discovering)
                | (Self::FetchingDocument, Self::Done)
                | (Self::Discovering, Self::FetchingAssets)
                | (Self::Discovering, Self::Done)
                | (Self::FetchingAssets, Self::Done)
        )
    }
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::FetchingDocument => "fetching_document",
            Self::Discovering => "discovering",
            Self::FetchingAssets => "fetching_assets",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

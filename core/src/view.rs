use crate::checkpoint::{FrameId, Status};
use crate::tags::Terminal;

/// Snapshot of a syntactic frame, as handed back to the strategy.
///
/// Views are plain data: holding one never keeps its frame alive, and two
/// views taken without an intervening instruction compare equal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateView {
    pub id: FrameId,
    pub status: Status,
    /// Frames between this one and the root.
    pub depth: usize,
    pub parent: Option<FrameId>,
    /// Name of the innermost lexical context.
    pub lexical_context: String,
    /// All lexical context names, outermost first.
    pub spans: Vec<String>,
    /// Number of balanced constructs still open.
    pub balanced: usize,
    pub offset: usize,
    pub holding: bool,
    pub done: bool,
    pub language: Option<String>,
    /// Type of the open node, if one is open.
    pub node_type: Option<String>,
    /// Depth of the builder path; `None` outside the document.
    pub path_depth: Option<usize>,
    pub last_result: Option<Terminal>,
}

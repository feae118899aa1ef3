//! Interpreter configuration for resource limits and behavior tuning.
//!
//! This module provides [`ParseConfig`] for controlling how the interpreter
//! runs a strategy: how deeply branches may nest, how many instructions a
//! run may execute, how far regex patterns may look ahead, and which lexical
//! context every span stack starts from.
//!
//! # Example
//!
//! ```ignore
//! use trellis_core::config::ParseConfig;
//!
//! // Default limits (branch depth: 128, unlimited instructions)
//! let config = ParseConfig::default();
//!
//! // Allow deeper speculation for a heavily ambiguous grammar
//! let config = ParseConfig::new()
//!     .with_max_branch_depth(512)
//!     .with_match_window(256);
//! ```

/// Configuration for interpreter behavior and resource limits.
///
/// # Default Values
///
/// | Setting | Default | Rationale |
/// |---------|---------|-----------|
/// | `max_branch_depth` | 128 | Bounds speculative nesting |
/// | `max_instructions` | `usize::MAX` | No limit by default |
/// | `match_window` | 1024 | Chars a regex may inspect |
/// | `initial_span` | `"Bare"` | Lexical context outside any span |
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Maximum number of frames stacked on top of the root.
    ///
    /// Every `branch` instruction adds one frame. Exceeding the limit fails
    /// the run with [`Error::BranchLimitExceeded`](crate::Error).
    pub max_branch_depth: usize,

    /// Maximum number of instructions a single run may execute.
    ///
    /// Default: `usize::MAX` (no limit)
    pub max_instructions: usize,

    /// Number of chars buffered ahead of the cursor when matching a regex.
    ///
    /// Literal patterns only ever read their own length.
    pub match_window: usize,

    /// Name of the lexical context at the bottom of every span stack.
    #[cfg_attr(feature = "serde", serde(skip, default = "default_initial_span"))]
    pub initial_span: &'static str,
}

#[cfg(feature = "serde")]
fn default_initial_span() -> &'static str {
    ParseConfig::DEFAULT.initial_span
}

impl Default for ParseConfig {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ParseConfig {
    /// Default configuration, usable in const contexts.
    pub const DEFAULT: Self = Self {
        max_branch_depth: 128,
        max_instructions: usize::MAX,
        match_window: 1024,
        initial_span: "Bare",
    };

    /// Creates a new configuration with default values.
    #[inline]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    /// Sets the maximum branch depth.
    ///
    /// Use `usize::MAX` to disable the limit.
    #[inline]
    pub const fn with_max_branch_depth(mut self, depth: usize) -> Self {
        self.max_branch_depth = depth;
        self
    }

    /// Sets the maximum instruction count.
    #[inline]
    pub const fn with_max_instructions(mut self, count: usize) -> Self {
        self.max_instructions = count;
        self
    }

    /// Sets how many chars a regex match may inspect.
    #[inline]
    pub const fn with_match_window(mut self, window: usize) -> Self {
        self.match_window = window;
        self
    }

    #[inline]
    pub const fn with_initial_span(mut self, span: &'static str) -> Self {
        self.initial_span = span;
        self
    }

    /// Disables the branch depth limit.
    ///
    /// # Warning
    ///
    /// A grammar that branches without ever accepting or rejecting will then
    /// grow the frame arena without bound.
    #[inline]
    pub const fn disable_branch_limit(self) -> Self {
        self.with_max_branch_depth(usize::MAX)
    }
}

//! Run-wide context shared with the strategy.

use crate::config::ParseConfig;
use crate::tags::OpenTag;

/// Grammar-level facts a strategy can consult while it runs.
pub trait Grammar {
    fn name(&self) -> &str;

    /// Whether nodes opened with `tag` may be lifted out of the node that
    /// encloses them, as trivia between tokens usually is.
    fn is_hoistable(&self, _tag: &OpenTag) -> bool {
        false
    }
}

/// Grammar plus configuration for one run.
#[derive(Debug, Clone)]
pub struct Context<G> {
    grammar: G,
    config: ParseConfig,
}

impl<G: Grammar> Context<G> {
    pub fn new(grammar: G) -> Self {
        Self::with_config(grammar, ParseConfig::DEFAULT)
    }

    pub fn with_config(grammar: G, config: ParseConfig) -> Self {
        Self { grammar, config }
    }

    #[inline]
    pub fn grammar(&self) -> &G {
        &self.grammar
    }

    #[inline]
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    #[inline]
    pub fn is_hoistable(&self, tag: &OpenTag) -> bool {
        self.grammar.is_hoistable(tag)
    }
}

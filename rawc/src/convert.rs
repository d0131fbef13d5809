//! The convert-block semantics shared by the EDIT sub-DSL's
//! `CONVERT_SPEC_TAG`/`CST_TARGET`/`CST_REPLACEMENT` (§4.4.3) and the
//! compiler's `OT_CONVERT_TAG`/`OTCT_TARGET`/`OTCT_REPLACEMENT` (§4.5).

use crate::token::{join_colon, Token};
use smol_str::SmolStr;

/// A find-and-replace rule in progress: a master fragment prefix to match
/// tokens against, and (once seen) a target substring to search for.
pub struct ConvertBlock {
    master: Vec<SmolStr>,
    target: Option<String>,
}

impl ConvertBlock {
    pub fn new(master: Vec<SmolStr>) -> Self {
        Self { master, target: None }
    }

    pub fn set_target(&mut self, target: String) {
        self.target = Some(target);
    }

    /// Applies the replacement to every token in `tokens` whose leading
    /// fragments equal the master. For each match, the remaining fragments
    /// are joined with `:`, every occurrence of the target is replaced, the
    /// result is re-split on `:` with empty fragments dropped, and that
    /// becomes the token's new argument list.
    ///
    /// A no-op if `set_target` was never called (the conversion is
    /// abandoned, matching the reader/compiler's "some other token
    /// terminated the block before a target was set" case).
    pub fn apply_replacement(&self, tokens: &mut [Token], replacement: &str) {
        let Some(target) = &self.target else { return };
        if target.is_empty() {
            return;
        }
        for token in tokens.iter_mut() {
            let fragments = token.fragments();
            if fragments.len() < self.master.len() || fragments[..self.master.len()] != self.master[..] {
                continue;
            }
            let joined = join_colon(&fragments[self.master.len()..]);
            if !joined.contains(target.as_str()) {
                continue;
            }
            let replaced = joined.replace(target.as_str(), replacement);
            let mut new_fragments: Vec<SmolStr> = self.master.clone();
            new_fragments.extend(replaced.split(':').filter(|frag| !frag.is_empty()).map(SmolStr::new));
            *token = Token::new(new_fragments);
        }
    }
}

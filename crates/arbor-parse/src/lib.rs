//! Table-driven GLR parser with error recovery and incremental reparsing.
//!
//! [`Parser::parse`] turns a text into a [`SyntaxTree`]; it never fails.
//! Syntax errors show up in the tree as ERROR nodes wrapping what could not
//! be parsed and as zero-width MISSING tokens. After the tree has been edited
//! with [`SyntaxTree::edit`], [`Parser::reparse`] builds the next revision,
//! reusing every subtree the edits did not affect.

mod driver;
mod recovery;
mod reuse;
mod stack;
#[cfg(test)]
mod tests;

use arbor_grammar::{AmbiguityPolicy, Language};
use arbor_inputs::TextSource;
use arbor_tree::{EditedTree, SyntaxTree};

use driver::Driver;
use reuse::ReuseCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Upper bound on stack versions explored at once.
    pub max_versions: usize,
    /// Tokens skipped during recovery before they are committed to an ERROR
    /// node and a new window starts.
    pub max_recovery_skip: usize,
    /// Overrides the grammar's own ambiguity policy.
    pub ambiguity: Option<AmbiguityPolicy>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { max_versions: 6, max_recovery_skip: 16, ambiguity: None }
    }
}

/// Counters for one parse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    pub tokens: usize,
    pub shifts: usize,
    pub reductions: usize,
    pub forks: usize,
    pub merges: usize,
    pub recoveries: usize,
    pub reused_subtrees: usize,
    pub reused_bytes: usize,
}

pub struct Parser {
    language: Language,
    options: ParseOptions,
    stats: ParseStats,
}

impl Parser {
    pub fn new(language: Language) -> Self {
        Self::with_options(language, ParseOptions::default())
    }

    pub fn with_options(language: Language, options: ParseOptions) -> Self {
        Self { language, options, stats: ParseStats::default() }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Counters from the most recent parse or reparse.
    pub fn last_stats(&self) -> ParseStats {
        self.stats
    }

    pub fn parse<S: TextSource + ?Sized>(&mut self, source: &S) -> SyntaxTree {
        self.run(source, None, 0)
    }

    pub fn parse_with_stats<S: TextSource + ?Sized>(&mut self, source: &S) -> (SyntaxTree, ParseStats) {
        let tree = self.parse(source);
        (tree, self.stats)
    }

    /// Parses the edited text, reusing what `edited` left untouched.
    /// `source` must already contain the edits.
    pub fn reparse<S: TextSource + ?Sized>(&mut self, edited: &EditedTree, source: &S) -> SyntaxTree {
        let old = edited.tree();
        let reuse = if old.language().ptr_eq(&self.language) {
            Some(ReuseCursor::new(edited.root().clone()))
        } else {
            tracing::debug!("edited tree comes from another language; parsing from scratch");
            None
        };
        let tree = self.run(source, reuse, old.revision() + 1);
        tracing::debug!(
            revision = tree.revision(),
            reused_subtrees = self.stats.reused_subtrees,
            reused_bytes = self.stats.reused_bytes,
            tokens = self.stats.tokens,
            "reparsed"
        );
        tree
    }

    fn run<S: TextSource + ?Sized>(
        &mut self,
        source: &S,
        reuse: Option<ReuseCursor>,
        revision: u32,
    ) -> SyntaxTree {
        let (root, text_len, stats) = Driver::new(&self.language, &self.options, source, reuse).run();
        self.stats = stats;
        tracing::debug!(
            bytes = u32::from(text_len.bytes),
            tokens = stats.tokens,
            forks = stats.forks,
            recoveries = stats.recoveries,
            "parsed"
        );
        SyntaxTree::new(self.language.clone(), root, text_len, revision)
    }
}

/// Parses `source` with default options.
pub fn parse<S: TextSource + ?Sized>(source: &S, language: &Language) -> SyntaxTree {
    Parser::new(language.clone()).parse(source)
}

/// Reparses `source` after the edits recorded in `edited`.
pub fn reparse<S: TextSource + ?Sized>(edited: &EditedTree, source: &S, language: &Language) -> SyntaxTree {
    Parser::new(language.clone()).reparse(edited, source)
}

//! Grammar-level completeness check backed by tree-sitter-bash.

use std::cell::RefCell;

use tree_sitter::{Node, Parser, Tree};

use super::scan::{ends_with_continuation, open_keyword_depth};

thread_local! {
    /// One parser per thread; building the language tables is not free.
    static BASH_PARSER: RefCell<Option<Parser>> = RefCell::new(new_parser());
}

fn new_parser() -> Option<Parser> {
    let mut parser = Parser::new();
    match parser.set_language(&tree_sitter_bash::LANGUAGE.into()) {
        Ok(()) => Some(parser),
        Err(err) => {
            tracing::warn!(error = %err, "bash grammar failed to load");
            None
        }
    }
}

fn parse_bash(text: &str) -> Option<Tree> {
    BASH_PARSER.with(|cell| {
        cell.borrow_mut()
            .as_mut()
            .and_then(|parser| parser.parse(text, None))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GrammarVerdict {
    /// Parsed cleanly into at least one statement.
    Complete,
    /// The parse failed because the input ran out.
    Incomplete,
    /// Neither; later checks decide.
    Undecided,
}

/// Parses `text` as bash and classifies the result.
///
/// A failed parse counts as "ran out of input" when the tree contains a node
/// the parser had to invent (MISSING), when the text ends in an operator or
/// keyword that requires a following command, or when compound commands
/// (`if`/`case`/`do`) are still open.
pub(crate) fn check(text: &str) -> GrammarVerdict {
    let Some(tree) = parse_bash(text) else {
        return GrammarVerdict::Undecided;
    };
    let root = tree.root_node();

    if !root.has_error() {
        return if statement_count(root) > 0 {
            GrammarVerdict::Complete
        } else {
            GrammarVerdict::Undecided
        };
    }

    if contains_missing(root) || ends_with_continuation(text) || open_keyword_depth(text) > 0 {
        GrammarVerdict::Incomplete
    } else {
        GrammarVerdict::Undecided
    }
}

fn statement_count(root: Node<'_>) -> usize {
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .count()
}

fn contains_missing(node: Node<'_>) -> bool {
    if node.is_missing() {
        return true;
    }
    if !node.has_error() {
        return false;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().any(contains_missing)
}

#[cfg(test)]
mod tests {
    use super::{check, GrammarVerdict};

    #[test]
    fn valid_commands_parse_complete() {
        assert_eq!(check("echo hello"), GrammarVerdict::Complete);
        assert_eq!(
            check("for i in 1 2 3; do\necho $i\ndone"),
            GrammarVerdict::Complete
        );
        assert_eq!(check("if true; then\necho yes\nfi"), GrammarVerdict::Complete);
    }

    #[test]
    fn open_compound_commands_are_incomplete() {
        assert_eq!(check("if true; then"), GrammarVerdict::Incomplete);
        assert_eq!(check("if true; then\necho yes"), GrammarVerdict::Incomplete);
        assert_eq!(check("while true; do"), GrammarVerdict::Incomplete);
        assert_eq!(check("case $x in"), GrammarVerdict::Incomplete);
    }

    #[test]
    fn trailing_operators_are_incomplete() {
        assert_eq!(check("ls |"), GrammarVerdict::Incomplete);
        assert_eq!(check("make &&"), GrammarVerdict::Incomplete);
    }

    #[test]
    fn comment_only_input_is_undecided() {
        assert_eq!(check("# just a note"), GrammarVerdict::Undecided);
        assert_eq!(check(""), GrammarVerdict::Undecided);
    }
}

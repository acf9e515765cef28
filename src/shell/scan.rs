//! Single-pass lexical scan of shell text for unterminated constructs.
//!
//! This is not a shell parser. It tracks just enough state (quotes, escapes,
//! comments, here-document bodies and bracket nesting) to tell whether more
//! input is needed before the text can possibly be complete.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    /// `$(`
    Substitution,
    /// Bare `(` (subshell, arithmetic, function parens).
    Paren,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingHeredoc {
    delimiter: String,
    /// `<<-` allows the terminator to be indented with tabs.
    strip_tabs: bool,
}

/// Constructs still open at the end of the scanned text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LexicalScan {
    pub open_quote: Option<char>,
    pub open_heredocs: Vec<String>,
    pub open_substitutions: usize,
    pub open_backtick: bool,
    pub open_parens: usize,
    pub open_braces: usize,
    /// `${` parameter expansions without their closing brace.
    pub open_parameters: usize,
}

pub(crate) fn scan(text: &str) -> LexicalScan {
    let mut quote: Option<char> = None;
    let mut backtick = false;
    let mut stack: Vec<Open> = Vec::new();
    let mut braces = 0usize;
    let mut param_braces = 0usize;
    let mut heredocs: VecDeque<PendingHeredoc> = VecDeque::new();

    for line in text.split('\n') {
        if let Some(front) = heredocs.front() {
            let candidate = if front.strip_tabs {
                line.trim_start_matches('\t')
            } else {
                line
            };
            if candidate == front.delimiter {
                heredocs.pop_front();
            }
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut escaped = false;
        let mut word_start = true;
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            let next = chars.get(i + 1).copied();

            if escaped {
                escaped = false;
                word_start = false;
                i += 1;
                continue;
            }

            match quote {
                Some('\'') => {
                    if ch == '\'' {
                        quote = None;
                    }
                    i += 1;
                    continue;
                }
                Some(_) => {
                    match ch {
                        '\\' => escaped = true,
                        '"' => quote = None,
                        _ => {}
                    }
                    i += 1;
                    continue;
                }
                None => {}
            }

            match ch {
                '\\' => escaped = true,
                '\'' | '"' => quote = Some(ch),
                '`' => backtick = !backtick,
                '#' if word_start => break,
                '$' if next == Some('(') => {
                    stack.push(Open::Substitution);
                    word_start = true;
                    i += 2;
                    continue;
                }
                '$' if next == Some('{') => {
                    param_braces += 1;
                    word_start = false;
                    i += 2;
                    continue;
                }
                '(' => stack.push(Open::Paren),
                ')' => {
                    stack.pop();
                }
                '{' => braces += 1,
                '}' => {
                    if param_braces > 0 {
                        param_braces -= 1;
                    } else {
                        braces = braces.saturating_sub(1);
                    }
                }
                '<' if next == Some('<') => {
                    if chars.get(i + 2) == Some(&'<') {
                        i += 3;
                        word_start = true;
                        continue;
                    }
                    // `((x << 2))` is a shift, not a here-document.
                    if stack.last() != Some(&Open::Paren) {
                        let (heredoc, consumed) = parse_heredoc_introducer(&chars[i + 2..]);
                        if let Some(heredoc) = heredoc {
                            heredocs.push_back(heredoc);
                        }
                        i += 2 + consumed;
                        word_start = true;
                        continue;
                    }
                }
                _ => {}
            }

            word_start = ch.is_whitespace() || matches!(ch, ';' | '|' | '&' | '(' | ')');
            i += 1;
        }
    }

    LexicalScan {
        open_quote: quote,
        open_heredocs: heredocs.into_iter().map(|h| h.delimiter).collect(),
        open_substitutions: stack.iter().filter(|o| **o == Open::Substitution).count(),
        open_backtick: backtick,
        open_parens: stack.iter().filter(|o| **o == Open::Paren).count(),
        open_braces: braces,
        open_parameters: param_braces,
    }
}

/// Parses the delimiter word after `<<`, returning it and the chars consumed.
fn parse_heredoc_introducer(chars: &[char]) -> (Option<PendingHeredoc>, usize) {
    let mut j = 0;
    let strip_tabs = chars.first() == Some(&'-');
    if strip_tabs {
        j += 1;
    }
    while matches!(chars.get(j), Some(' ') | Some('\t')) {
        j += 1;
    }

    let mut delimiter = String::new();
    let mut quote: Option<char> = None;
    while j < chars.len() {
        let ch = chars[j];
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => delimiter.push(ch),
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '\\' => {
                    if let Some(&escaped) = chars.get(j + 1) {
                        delimiter.push(escaped);
                        j += 1;
                    }
                }
                c if c.is_whitespace() || matches!(c, ';' | '|' | '&' | '<' | '>' | '(' | ')') => {
                    break;
                }
                c => delimiter.push(c),
            },
        }
        j += 1;
    }

    if delimiter.is_empty() {
        return (None, j);
    }
    (
        Some(PendingHeredoc {
            delimiter,
            strip_tabs,
        }),
        j,
    )
}

/// Net count of compound-command openers (`if`, `case`, `for`, `while`,
/// `until`, `select`) over closers (`fi`, `esac`, `done`), counting only
/// unquoted words in command position.
pub(crate) fn open_keyword_depth(text: &str) -> isize {
    let mut depth = 0isize;
    for word in shell_words(text).iter().filter(|word| word.command) {
        match word.text.as_str() {
            "if" | "case" | "for" | "while" | "until" | "select" => depth += 1,
            "fi" | "esac" | "done" => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// True when the text ends in an operator or keyword that needs a following command.
pub(crate) fn ends_with_continuation(text: &str) -> bool {
    let trimmed = text.trim_end();
    if trimmed.ends_with('|') || trimmed.ends_with("&&") {
        return true;
    }
    matches!(
        shell_words(trimmed).last().map(|word| word.text.as_str()),
        Some("then" | "do" | "else" | "elif" | "in")
    )
}

/// True when the text ends in a function header (`name()` or `function name`)
/// whose body has not been started yet.
pub(crate) fn ends_with_function_header(text: &str) -> bool {
    let trimmed = text.trim_end();
    let words = shell_words(trimmed);

    if let Some(head) = trimmed
        .strip_suffix(')')
        .map(str::trim_end)
        .and_then(|head| head.strip_suffix('('))
    {
        let name = head.trim_end();
        let Some(last) = words.last() else {
            return false;
        };
        let introduced =
            last.command || (words.len() >= 2 && words[words.len() - 2].text == "function");
        return is_function_name(&last.text) && name.ends_with(last.text.as_str()) && introduced;
    }

    match words.as_slice() {
        [.., keyword, name] => {
            keyword.command
                && keyword.text == "function"
                && is_function_name(&name.text)
                && trimmed.ends_with(name.text.as_str())
        }
        _ => false,
    }
}

fn is_function_name(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ShellWord {
    text: String,
    /// The word starts a simple command, where reserved words are recognized.
    command: bool,
}

/// Reserved words after which the next word is again in command position.
const COMMAND_PREFIXES: &[&str] = &[
    "if", "then", "else", "elif", "while", "until", "do", "{", "!", "time",
];

/// Words made only of unquoted characters. Words containing quotes or escapes
/// are dropped since they can never be keywords.
fn shell_words(text: &str) -> Vec<ShellWord> {
    let mut splitter = WordSplitter::default();
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
                splitter.command = true;
            }
            continue;
        }
        if let Some(q) = quote {
            if ch == '\\' && q == '"' {
                chars.next();
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => {
                quote = Some(ch);
                splitter.tainted = true;
                splitter.started = true;
            }
            '\\' => {
                chars.next();
                splitter.tainted = true;
                splitter.started = true;
            }
            '#' if !splitter.started => in_comment = true,
            '\n' | ';' | '|' | '&' | '(' | ')' => {
                splitter.flush();
                splitter.command = true;
            }
            c if c.is_whitespace() || matches!(c, '<' | '>') => splitter.flush(),
            c => {
                splitter.current.push(c);
                splitter.started = true;
            }
        }
    }
    splitter.flush();
    splitter.words
}

struct WordSplitter {
    words: Vec<ShellWord>,
    current: String,
    started: bool,
    tainted: bool,
    command: bool,
}

impl Default for WordSplitter {
    fn default() -> Self {
        Self {
            words: Vec::new(),
            current: String::new(),
            started: false,
            tainted: false,
            command: true,
        }
    }
}

impl WordSplitter {
    fn flush(&mut self) {
        if !self.started {
            return;
        }
        let text = std::mem::take(&mut self.current);
        let command = self.command;
        self.command = !self.tainted && COMMAND_PREFIXES.contains(&text.as_str());
        if !self.tainted {
            self.words.push(ShellWord { text, command });
        }
        self.started = false;
        self.tainted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{ends_with_continuation, ends_with_function_header, open_keyword_depth, scan};

    #[test]
    fn tracks_unterminated_quotes_across_lines() {
        assert_eq!(scan("echo \"hello").open_quote, Some('"'));
        assert_eq!(scan("echo \"hello\nworld\"").open_quote, None);
        assert_eq!(scan("echo 'it\\'").open_quote, None);
        assert_eq!(scan("echo \"a 'b\"").open_quote, None);
        assert_eq!(scan("echo \\\"").open_quote, None);
    }

    #[test]
    fn comments_hide_quotes() {
        assert_eq!(scan("echo hi # don't").open_quote, None);
        assert_eq!(scan("echo a#b'").open_quote, Some('\''));
    }

    #[test]
    fn heredoc_bodies_are_opaque() {
        let open = scan("cat <<EOF\ndon't");
        assert_eq!(open.open_heredocs, vec!["EOF".to_string()]);
        assert_eq!(open.open_quote, None);

        assert_eq!(scan("cat <<'EOF'\n$(x\nEOF").open_heredocs, Vec::<String>::new());
        assert_eq!(scan("cat <<-END\n\tbody\n\tEND").open_heredocs, Vec::<String>::new());
        assert_eq!(scan("cat <<< \"word\"").open_heredocs, Vec::<String>::new());
        assert_eq!(scan("echo $((1 << 2))").open_heredocs, Vec::<String>::new());
    }

    #[test]
    fn counts_substitutions_and_parens_separately() {
        assert_eq!(scan("echo $(date").open_substitutions, 1);
        assert_eq!(scan("echo $(date)").open_substitutions, 0);
        assert_eq!(scan("(cd /tmp").open_parens, 1);
        assert_eq!(scan("echo \"(\"").open_parens, 0);
        assert!(scan("echo `date").open_backtick);
        assert!(!scan("echo `date`").open_backtick);
    }

    #[test]
    fn parameter_expansion_braces_do_not_count() {
        assert_eq!(scan("echo ${HOME}").open_braces, 0);
        assert_eq!(scan("greet() {").open_braces, 1);
        assert_eq!(scan("greet() {\necho hi\n}").open_braces, 0);
    }

    #[test]
    fn keyword_depth_and_trailing_operators() {
        assert_eq!(open_keyword_depth("if true; then\necho yes"), 1);
        assert_eq!(open_keyword_depth("for i in 1 2; do echo $i; done"), 0);
        assert_eq!(open_keyword_depth("echo 'if'"), 0);
        assert!(ends_with_continuation("echo a |"));
        assert!(ends_with_continuation("make &&"));
        assert!(ends_with_continuation("while true; do"));
        assert!(!ends_with_continuation("echo done"));
        assert!(!ends_with_continuation("echo 'then'"));
    }

    #[test]
    fn loop_openers_count_until_done() {
        assert_eq!(open_keyword_depth("while true"), 1);
        assert_eq!(open_keyword_depth("until false
do"), 1);
        assert_eq!(open_keyword_depth("for i in 1 2
do
echo $i"), 1);
        assert_eq!(open_keyword_depth("select x in a b"), 1);
        assert_eq!(open_keyword_depth("while true
do
echo hi
done"), 0);
    }

    #[test]
    fn keywords_only_count_in_command_position() {
        assert_eq!(open_keyword_depth("echo for while if"), 0);
        assert_eq!(open_keyword_depth("ls; while read line"), 1);
        assert_eq!(open_keyword_depth("# while we wait
ls"), 0);
        assert_eq!(open_keyword_depth("if true; then while x; do y; done; fi"), 0);
    }

    #[test]
    fn function_headers_without_bodies() {
        assert!(ends_with_function_header("f()"));
        assert!(ends_with_function_header("greet ( )"));
        assert!(ends_with_function_header("function greet"));
        assert!(ends_with_function_header("function greet()"));
        assert!(!ends_with_function_header("greet() { echo hi; }"));
        assert!(!ends_with_function_header("echo $(date)"));
        assert!(!ends_with_function_header("(cd /tmp && ls)"));
        assert!(!ends_with_function_header("echo function"));
    }

    #[test]
    fn open_parameter_expansion() {
        assert_eq!(scan("echo ${x").open_parameters, 1);
        assert_eq!(scan("echo ${x}").open_parameters, 0);
        assert_eq!(scan("echo '${x'").open_parameters, 0);
    }
}

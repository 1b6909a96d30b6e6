//! Bracket balance checking for dictionary text, and the `unbalanced-braces`
//! extension predicate built on it.

use dictedit_xpath1::NamedPredicate;

/// Local name of the extension predicate inside the engine's namespace.
pub const UNBALANCED_BRACES: &str = "unbalanced-braces";

pub const DEFAULT_STACK_CAPACITY: usize = 100;

/// Scans text for `()`, `[]` and `{}` nesting errors with a bounded stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketScanner {
    capacity: usize,
}

impl Default for BracketScanner {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_STACK_CAPACITY)
    }
}

impl BracketScanner {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True on the first closer that does not match the innermost open
    /// bracket, on a closer with nothing open, on nesting deeper than the
    /// capacity, or when brackets are still open at the end.
    /// Missing or empty text is balanced.
    pub fn is_unbalanced<'a>(&self, text: impl Into<Option<&'a str>>) -> bool {
        let Some(text) = text.into() else {
            return false;
        };
        let mut open: Vec<char> = Vec::new();
        for c in text.chars() {
            match c {
                '(' | '[' | '{' => {
                    if open.len() >= self.capacity {
                        log::warn!(
                            "Too many open brackets (limit {}), treating text as unbalanced",
                            self.capacity
                        );
                        return true;
                    }
                    open.push(c);
                }
                ')' | ']' | '}' => {
                    let opener = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    if open.pop() != Some(opener) {
                        return true;
                    }
                }
                _ => {}
            }
        }
        !open.is_empty()
    }
}

/// [`BracketScanner::is_unbalanced`] with the default capacity.
pub fn has_unbalanced_brackets<'a>(text: impl Into<Option<&'a str>>) -> bool {
    BracketScanner::default().is_unbalanced(text)
}

/// True as soon as any node of its node-set argument has unbalanced brackets.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnbalancedBraces {
    scanner: BracketScanner,
}

impl UnbalancedBraces {
    pub fn new(scanner: BracketScanner) -> Self {
        Self { scanner }
    }
}

impl NamedPredicate for UnbalancedBraces {
    fn test(&self, contents: &mut dyn Iterator<Item = String>) -> bool {
        for text in contents {
            if self.scanner.is_unbalanced(text.as_str()) {
                log::trace!("Unbalanced brackets in {:?}", text);
                return true;
            }
        }
        false
    }
}

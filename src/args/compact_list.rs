//! Compact list: fixed set of accepted spellings.

use std::ops::Index;

use serde::{Deserialize, Serialize};

/// Immutable, index-addressable sequence of strings.
///
/// Built once from a literal set and never modified afterwards. Used
/// wherever a fixed set of accepted surface forms (`-o`, `--out`) or
/// dividers (`=`) must be declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompactList {
    items: Vec<String>,
}

impl CompactList {
    /// Build a list from any sequence of string-like items.
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of entries.
    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entry at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|i| i == item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl Index<usize> for CompactList {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.items[index]
    }
}

impl<S: Into<String>> FromIterator<S> for CompactList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Build a [`CompactList`] from literals: `c_lst!["-o", "--out"]`.
#[macro_export]
macro_rules! c_lst {
    ($($item:expr),* $(,)?) => {
        $crate::args::CompactList::new([$(::std::string::String::from($item)),*])
    };
}

/// Short surface form: `short_arg("o") == "-o"`.
pub fn short_arg(name: &str) -> String {
    format!("-{}", name)
}

/// Long surface form: `long_arg("out") == "--out"`.
pub fn long_arg(name: &str) -> String {
    format!("--{}", name)
}

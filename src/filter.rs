//! Suppression rules evaluated against the latest commit of a push

use regex_automata::meta::Regex;
use regex_syntax::ParserBuilder;
use regex_syntax::hir::{Hir, Look};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::push::Commit;

/// Marker that, anywhere in a commit message, skips the build
pub const CI_SKIP_MARKER: &str = "[ci-skip]";

/// A per-source rule that prevents a push from notifying the source owner
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExclusionRule {
    User(UserExclusion),
    Message(MessageExclusion),
}

/// Authors whose pushes never trigger a build
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "UserExclusionConfig")]
pub struct UserExclusion {
    excluded: BTreeSet<String>,
}

#[derive(Deserialize)]
struct UserExclusionConfig {
    users: UserList,
}

/// Users can be configured as a TOML list or as one name per line
#[derive(Deserialize)]
#[serde(untagged)]
enum UserList {
    List(Vec<String>),
    Lines(String),
}

impl From<UserExclusionConfig> for UserExclusion {
    fn from(config: UserExclusionConfig) -> Self {
        match config.users {
            UserList::List(users) => UserExclusion::new(users),
            UserList::Lines(lines) => UserExclusion::new(lines.lines()),
        }
    }
}

impl UserExclusion {
    /// Names are trimmed and blank entries dropped. Case is preserved, so
    /// matching against commit authors stays case-sensitive.
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let excluded = users
            .into_iter()
            .map(|u| u.as_ref().trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        Self { excluded }
    }

    pub fn excludes(&self, author: &str) -> bool {
        self.excluded.contains(author)
    }
}

/// Commit messages that, when fully matched by a regex, never trigger a build
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "MessageExclusionConfig")]
pub struct MessageExclusion {
    pattern: String,
    /// `None` when the pattern does not compile; such a rule never matches
    regex: Option<Regex>,
}

#[derive(Deserialize)]
struct MessageExclusionConfig {
    pattern: String,
}

impl From<MessageExclusionConfig> for MessageExclusion {
    fn from(config: MessageExclusionConfig) -> Self {
        MessageExclusion::new(config.pattern)
    }
}

impl MessageExclusion {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let regex = compile_full_match(&pattern);
        if regex.is_none() {
            warn!("Invalid excluded message pattern '{}', rule will never match", pattern);
        }
        Self { pattern, regex }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True only if the whole message matches the pattern
    pub fn matches(&self, message: &str) -> bool {
        self.regex
            .as_ref()
            .map(|re| re.is_match(message))
            .unwrap_or(false)
    }
}

/// Anchors the parsed pattern at both ends of the haystack. Working on the
/// syntax tree keeps inline flags such as `(?x)` comments confined to the
/// pattern itself.
fn compile_full_match(pattern: &str) -> Option<Regex> {
    let hir = ParserBuilder::new().build().parse(pattern).ok()?;
    let anchored = Hir::concat(vec![Hir::look(Look::Start), hir, Hir::look(Look::End)]);
    Regex::builder().build_from_hir(&anchored).ok()
}

/// Why a commit was kept from notifying a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Suppression {
    ExcludedAuthor { commit: String, author: String },
    ExcludedMessage { commit: String, pattern: String },
    CiSkip { commit: String },
}

/// Runs the rules in declared order, then the ci-skip check.
///
/// The first match wins. Without a commit there is nothing for the rules to
/// look at, so nothing is suppressed.
pub fn evaluate(commit: Option<&Commit>, rules: &[ExclusionRule]) -> Option<Suppression> {
    let commit = commit?;

    for rule in rules {
        match rule {
            ExclusionRule::User(users) => {
                if users.excludes(&commit.author.name) {
                    debug!(
                        "Ignored commit {}: Found excluded author: {}",
                        commit.id, commit.author.name
                    );
                    return Some(Suppression::ExcludedAuthor {
                        commit: commit.id.clone(),
                        author: commit.author.name.clone(),
                    });
                }
            }
            ExclusionRule::Message(message) => {
                if message.matches(&commit.message) {
                    debug!(
                        "Ignored commit {}: Found excluded message: {}",
                        commit.id, commit.message
                    );
                    return Some(Suppression::ExcludedMessage {
                        commit: commit.id.clone(),
                        pattern: message.pattern().to_string(),
                    });
                }
            }
        }
    }

    if is_ci_skip(commit) {
        return Some(Suppression::CiSkip {
            commit: commit.id.clone(),
        });
    }
    None
}

pub fn is_ci_skip(commit: &Commit) -> bool {
    let skip = commit.message.contains(CI_SKIP_MARKER);
    if skip {
        debug!(
            "SkipCI on commit {} for commit message {}",
            commit.id, commit.message
        );
    }
    skip
}

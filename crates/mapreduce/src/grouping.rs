use tracing::warn;

use crate::document::{Group, Summary};

/// Greedily pack summaries, in order, into groups of at most `token_budget` tokens
///
/// A summary that alone exceeds the budget becomes a flagged singleton group.
/// Concatenating the returned groups yields the input order.
pub fn group_summaries(summaries: Vec<Summary>, token_budget: usize) -> Vec<Group> {
    let mut groups = Vec::new();
    let mut current = Group::default();

    for summary in summaries {
        if summary.tokens > token_budget {
            warn!(
                "Summary of chunks {}..={} is {} tokens, over the {} token budget; passing it through alone",
                summary.first_chunk, summary.last_chunk, summary.tokens, token_budget
            );
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            groups.push(Group::oversized(summary));
            continue;
        }

        if !current.is_empty() && current.tokens() + summary.tokens > token_budget {
            groups.push(std::mem::take(&mut current));
        }
        current.push(summary);
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

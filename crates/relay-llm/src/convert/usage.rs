//! Runner token counts to canonical usage

use crate::protocol::runner::RunnerUsage;
use crate::types::Usage;

/// Map runner token counts to a canonical usage record
///
/// Missing counts become zero; a missing total falls back to the sum.
pub fn normalize_usage(usage: Option<&RunnerUsage>) -> Usage {
    let Some(usage) = usage else {
        return Usage::default();
    };

    let input_tokens = usage.prompt_tokens.unwrap_or(0);
    let output_tokens = usage.completion_tokens.unwrap_or(0);

    Usage {
        input_tokens,
        output_tokens,
        total_tokens: usage
            .total_tokens
            .unwrap_or_else(|| input_tokens.saturating_add(output_tokens)),
    }
}

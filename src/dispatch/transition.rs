//! Chain transition table.
//!
//! The retry/continue/break semantics of the chain are encoded here as a pure
//! function over named states instead of scattered control flow, so each
//! transition is unit-testable on its own. One behavior worth calling out:
//! `auto_retry = false` aborts the *entire* chain on the first failed attempt
//! of any kind - it does not merely suppress same-step retries. That matches
//! the observed behavior of the tool this engine replaces and is preserved
//! deliberately.

/// What one attempt (or the pre-attempt configuration check) produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx response whose content passed the acceptance rule.
    Accepted,
    /// Transient failure: network error, non-2xx status, or length rejection.
    /// Eligible for a same-step retry when budget remains.
    RejectedRetryable,
    /// Permanent step failure: missing channel or blank apiUrl. No retry will
    /// fix configuration, so the step is never re-attempted.
    ConfigFailure,
}

/// What the chain does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainAction {
    /// Short-circuit the whole dispatch with this attempt's response.
    ReturnSuccess,
    /// Sleep the configured interval, then re-attempt the same step.
    RetrySameStep,
    /// Fall through to the next step in chain order.
    AdvanceStep,
    /// Abort the entire dispatch; no further attempts, no further steps.
    AbortChain,
}

/// The transition table.
///
/// `attempts_remaining` is whether the current step still has retry budget
/// after this attempt.
pub fn next_action(outcome: AttemptOutcome, auto_retry: bool, attempts_remaining: bool) -> ChainAction {
    use AttemptOutcome::*;
    use ChainAction::*;

    match (outcome, auto_retry, attempts_remaining) {
        (Accepted, _, _) => ReturnSuccess,

        // Configuration failures skip the step entirely, or abort the chain
        // when auto_retry is off. They never consume retry budget.
        (ConfigFailure, true, _) => AdvanceStep,
        (ConfigFailure, false, _) => AbortChain,

        (RejectedRetryable, false, _) => AbortChain,
        (RejectedRetryable, true, true) => RetrySameStep,
        (RejectedRetryable, true, false) => AdvanceStep,
    }
}

// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Bounded, cancellable polling for eventually consistent vault reads.
//!
//! A newly added account is not always visible to an immediate
//! `GET /Accounts`, while ARM issues its verification GET right after the
//! PUT returns. [`reconcile_account`] polls the safe until the listing is
//! non-empty or the [`RetryPolicy`] budget runs out:
//!
//! ```text
//! fetch -> [delay -> fetch] x additional_attempts
//! ```
//!
//! Each delay races the request's [`CancellationToken`], so a dropped or
//! timed-out request stops polling immediately. The outcome never changes
//! the HTTP result of the create.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::constants::{RECONCILE_ADDITIONAL_ATTEMPTS, RECONCILE_DELAY};
use crate::vault::VaultClient;
use crate::vault::models::Account;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fetches allowed after the first one.
    pub additional_attempts: u32,
    /// Fixed wait before each additional fetch.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            additional_attempts: RECONCILE_ADDITIONAL_ATTEMPTS,
            delay: RECONCILE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The fetched value satisfied the predicate.
    Settled,
    /// Every attempt ran without satisfying the predicate.
    Exhausted,
    /// The cancellation token fired first.
    Cancelled,
}

#[derive(Debug)]
pub struct Polled<T> {
    /// Result of the most recent fetch, if any ran.
    pub last: Option<T>,
    pub attempts: u32,
    pub outcome: Outcome,
}

/// Runs `fetch` until `settled` accepts its result, the budget is spent, or
/// `cancel` fires.
pub async fn poll_until<T, F, Fut, S>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut fetch: F,
    settled: S,
) -> Polled<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
    S: Fn(&T) -> bool,
{
    let mut last = None;
    let mut attempts = 0;

    loop {
        let value = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Polled { last, attempts, outcome: Outcome::Cancelled };
            }
            value = fetch(attempts) => value,
        };
        attempts += 1;

        let done = settled(&value);
        last = Some(value);
        if done {
            return Polled { last, attempts, outcome: Outcome::Settled };
        }
        if attempts > policy.additional_attempts {
            return Polled { last, attempts, outcome: Outcome::Exhausted };
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Polled { last, attempts, outcome: Outcome::Cancelled };
            }
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }
}

/// What post-create polling observed for one account.
#[derive(Debug)]
pub struct Reconciliation {
    /// The matching listing entry, if the account became visible.
    pub account: Option<Account>,
    pub attempts: u32,
    pub outcome: Outcome,
}

/// Polls `safe_name` until its listing is non-empty, then looks for
/// `account_name` in the last listing. Vault errors count as "not yet".
#[tracing::instrument(skip(client, policy, cancel))]
pub async fn reconcile_account(
    client: &dyn VaultClient,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    safe_name: &str,
    account_name: &str,
) -> Reconciliation {
    let polled = poll_until(
        policy,
        cancel,
        |attempt| async move {
            let result = client.get_accounts(safe_name).await;
            match &result {
                Ok(accounts) => tracing::debug!(
                    "[provider] reconcile attempt {}: {} accounts in safe",
                    attempt,
                    accounts.count
                ),
                Err(e) => tracing::warn!("[provider] reconcile attempt {} failed: {}", attempt, e),
            }
            result
        },
        |result| result.as_ref().is_ok_and(|accounts| !accounts.is_empty()),
    )
    .await;

    let account = polled
        .last
        .and_then(Result::ok)
        .and_then(|accounts| accounts.find(account_name).cloned());

    if account.is_none() {
        tracing::debug!(
            "[provider] did not observe account {} after {} attempts ({:?})",
            account_name,
            polled.attempts,
            polled.outcome
        );
    }

    Reconciliation {
        account,
        attempts: polled.attempts,
        outcome: polled.outcome,
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module providing utilities for retrying remote operations until a deadline.

use std::time::Duration;

pub use ::backoff::future::{retry, retry_notify};
pub use ::backoff::Error as BackoffError;
pub use ::backoff::{backoff::Backoff, ExponentialBackoff, Notify};

/// Return a policy that retries at a fixed interval until `window` has
/// elapsed.
///
/// The operations reconciled against the remote control plane are simple
/// bounded polls: either the condition clears within the window or the
/// operation has failed.  Exponential growth and jitter buy nothing here, so
/// the policy pins the interval.
pub fn poll_policy(
    interval: Duration,
    window: Duration,
) -> ::backoff::ExponentialBackoff {
    ::backoff::ExponentialBackoff {
        current_interval: interval,
        initial_interval: interval,
        multiplier: 1.0,
        randomization_factor: 0.0,
        max_interval: interval,
        max_elapsed_time: Some(window),
        ..::backoff::ExponentialBackoff::default()
    }
}

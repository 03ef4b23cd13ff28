use alloy::primitives::LogData;

use crate::test_utils::AsLog;

/// Asserts that a [`Recorder`](crate::test_utils::Recorder) received exactly the given events,
/// in order, however they were split across deliveries.
///
/// Events are any [`SolEvent`](alloy::sol_types::SolEvent) values and are compared by their
/// encoded log data.
///
/// # Examples
///
/// ```no_run
/// # use alloy::{primitives::U256, sol};
/// # use event_watcher::{DecodedLog, assert_delivered, test_utils::Recorder};
/// sol! {
///     event CountIncreased(uint256 newCount);
/// }
///
/// # fn example(recorder: Recorder<DecodedLog>) {
/// assert_delivered!(
///     recorder,
///     [CountIncreased { newCount: U256::from(1) }, CountIncreased { newCount: U256::from(2) }]
/// );
/// # }
/// ```
///
/// # Panics
///
/// * **Wrong event**: a delivered log differs from the expected one at the same position.
/// * **Count mismatch**: more or fewer logs were delivered than expected.
/// * **Empty sequence**: called with an empty collection (use [`assert_nothing_delivered!`]).
#[macro_export]
macro_rules! assert_delivered {
    ($recorder: expr, [$($event:expr),+ $(,)?]) => {
        $crate::assert_delivered!($recorder, &[$($event),+])
    };
    ($recorder: expr, &[$($event:expr),+ $(,)?]) => {{
        let expected = [$(alloy::sol_types::SolEvent::encode_log_data(&$event)),+];
        $crate::test_utils::macros::assert_delivered(&$recorder.items(), &expected)
    }};
    ($recorder: expr, $events: expr) => {{
        let expected = $events
            .iter()
            .map(alloy::sol_types::SolEvent::encode_log_data)
            .collect::<Vec<_>>();
        if expected.is_empty() {
            panic!("error: assert_delivered! called with an empty collection. Use assert_nothing_delivered! instead.")
        }
        $crate::test_utils::macros::assert_delivered(&$recorder.items(), &expected)
    }};
}

/// Asserts that a [`Recorder`](crate::test_utils::Recorder) has not received any delivery.
#[macro_export]
macro_rules! assert_nothing_delivered {
    ($recorder: expr) => {{
        let batches = $recorder.batches();
        assert!(batches.is_empty(), "Expected no deliveries, got {} batches", batches.len());
    }};
}

#[allow(clippy::missing_panics_doc)]
pub fn assert_delivered<T: AsLog>(items: &[T], expected: &[LogData]) {
    let delivered: Vec<&LogData> = items.iter().map(|item| item.as_log().data()).collect();

    assert!(
        delivered.len() >= expected.len(),
        "Delivered {} logs, still expecting:\n{:#?}",
        delivered.len(),
        &expected[delivered.len()..]
    );

    for (position, (actual, expected)) in delivered.iter().zip(expected).enumerate() {
        assert_eq!(*actual, expected, "Unexpected log at position {position}");
    }

    assert_eq!(
        delivered.len(),
        expected.len(),
        "Received more logs than expected.\nExtra: {:#?}",
        &delivered[expected.len()..]
    );
}

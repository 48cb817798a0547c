//! Fuzz the reducer: any set of parseable event lines must fold to the same
//! snapshot regardless of input order, and the summary must stay consistent
//! with the work-package map.

#![no_main]

use lanes_core::event::StatusEvent;
use lanes_core::reduce::reduce;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let events: Vec<StatusEvent> = text
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    if events.is_empty() {
        return;
    }

    let forward = reduce(events.clone());
    assert_eq!(
        forward.summary.values().sum::<u64>(),
        forward.work_packages.len() as u64
    );

    let mut reversed = events;
    reversed.reverse();
    let backward = reduce(reversed);
    assert_eq!(forward.work_packages, backward.work_packages);
    assert_eq!(forward.summary, backward.summary);
    assert_eq!(forward.last_event_id, backward.last_event_id);
});

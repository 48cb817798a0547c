//! Fuzz the event-line parser: arbitrary bytes must either parse into a
//! valid StatusEvent or fail cleanly, never panic.

#![no_main]

use lanes_core::canonical::canonical_json;
use lanes_core::event::StatusEvent;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(event) = serde_json::from_str::<StatusEvent>(line) {
        // Anything that parses must re-serialize canonically and round-trip.
        let value = serde_json::to_value(&event).expect("serialize");
        let canonical = canonical_json(&value);
        let back: StatusEvent = serde_json::from_str(&canonical).expect("round-trip");
        assert_eq!(back, event);
    }
});

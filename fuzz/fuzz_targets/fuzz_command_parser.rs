//! Fuzz target: `commands::route`
//!
//! Feeds arbitrary payloads to every subscribed topic. Routing must never
//! panic, and anything it accepts must stay inside the documented ranges.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use critical_section as _;
use libfuzzer_sys::fuzz_target;
use plantsense::app::commands::{self, Command, Inbound};
use plantsense::config::{TOPIC_COMMANDS, TOPIC_PLANT_CONFIG, TOPIC_SOLENOID};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };
    let topic = match selector % 4 {
        0 => TOPIC_COMMANDS,
        1 => TOPIC_SOLENOID,
        2 => TOPIC_PLANT_CONFIG,
        _ => "esp32/unknown",
    };

    match commands::route(topic, payload) {
        Ok(Inbound::Command(Command::SetReadPeriod { minutes })) => {
            let clamped = plantsense::config::clamp_read_period(minutes);
            assert!((1..=1_440).contains(&clamped));
        }
        Ok(Inbound::PlantProfile(update)) => {
            // A merged profile is either rejected or valid.
            if let Ok(p) = update.apply(Default::default()) {
                assert!(p.validate().is_ok());
            }
        }
        Ok(_) => {}
        Err(e) => {
            // Display must not panic on any error.
            let _ = e.to_string();
        }
    }
});

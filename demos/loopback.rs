//! run exchange cycles against a simulated instance whose fieldbus loops back

use std::time::Duration;
use mechalink::{
    registers::{Layout, RegisterMap},
    Link, LinkConfig, SimulatedBus, UserParameters,
    };
use bilge::prelude::*;

#[tokio::main]
async fn main() {
    env_logger::init();

    let map = RegisterMap::new(Layout::Station, 0x4000, 0x100, 4, 0);
    let mut link = Link::new(SimulatedBus::new(map.clone()), map, LinkConfig::default());
    if let Err(error) = link.setup(&UserParameters {
            mode: 1,
            master_address: 1,
            max_address: 4,
            transmission_cycle: 1000,
            communication_cycle: 1000,
            message_bytes: 32,
            devices: 4,
            max_retries: 1,
            .. UserParameters::default()
            }) {
        log::error!("setup failed: {}", error);
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_millis(1));
    for step in 0 .. 100u32 {
        interval.tick().await;
        for station in 1 ..= 4u8 {
            let command = [station, (step & 0xff) as u8, 0, 0, 0x20];
            if let Err(error) = link.enqueue(&command, u5::new(station)) {
                log::warn!("cannot queue command: {}", error);
            }
        }
        let cycle = link.cycle();
        if let Some(error) = cycle.error() {
            log::error!("cycle {} failed with code {}: {}", step, error.code(), error);
        }
        for (station, data) in link.received().iter() {
            log::debug!("cycle {}: station {} answered {:02x?}", step, station.value(), data);
        }
        // the simulated fieldbus answers on the next cycle
        let bus = link.bus_mut();
        bus.loop_back();
        bus.complete_burst();
        bus.clear_accesses();
    }
    println!("done, {} answers pending", link.bus().pending());
}

//! cyclic exchange with a memory mapped mechatrolink instance, in a realtime thread
//!
//! usage: `mapped <resource file> <gtag> [descriptor offset] [strides offset]`

#[cfg(target_os = "linux")]
mod realtime {
    use std::{env, fs, time::{Duration, Instant}};
    use mechalink::{
        DiscoveryConfig, DiscoveryContext, Instances, Link, LinkConfig, MappedBus, ModuleDescriptor, Strides,
        RegisterBus, UserParameters, discover,
        };
    use bilge::prelude::*;
    use ioprio::*;

    /// size of the register window of hostmot2 cards
    const WINDOW: usize = 0x10000;

    pub fn main() -> Result<(), Box<dyn std::error::Error>> {
        env_logger::init();

        let mut args = env::args().skip(1);
        let path = args.next().ok_or("missing resource file")?;
        let gtag = args.next().ok_or("missing gtag")?.parse::<u8>()?;
        let descriptor_at = args.next().map(|a| u32::from_str_radix(a.trim_start_matches("0x"), 16)).transpose()?.unwrap_or(0x400);
        let strides_at = args.next().map(|a| u32::from_str_radix(a.trim_start_matches("0x"), 16)).transpose()?.unwrap_or(0x11c);

        let mut bus = MappedBus::open(&path, 0, WINDOW)?;

        // descriptor and stride table as stored in the IDROM
        let mut raw = Vec::new();
        for i in 0 .. 3 {
            raw.extend_from_slice(&bus.read(descriptor_at + 4*i)?.to_le_bytes());
        }
        let descriptor = ModuleDescriptor::parse(&raw)?;
        let strides = bus.read(strides_at)?.to_le_bytes();
        let strides = Strides {
            register: [u32::from(strides[0]), u32::from(strides[1])],
            instance: [u32::from(strides[2]), u32::from(strides[3])],
        };

        let mut instances = Instances::new();
        discover(&mut DiscoveryContext::new(), &DiscoveryConfig::new(gtag), &descriptor, &strides,
            fs::canonicalize(&path)?.to_string_lossy().as_ref(), &mut instances)?;
        print!("{}", instances);
        let map = instances.get(0).ok_or("no instance")?.map.clone();

        ioprio::set_priority(
            ioprio::Target::Process(ioprio::Pid::this()),
            Priority::new(ioprio::Class::Realtime(ioprio::RtPriorityLevel::highest())),
            ).map_err(|error|  format!("cannot set io priority: {:?}", error))?;
        let handle = std::thread::spawn(move || -> Result<(), mechalink::LinkError> {
            let mut link = Link::new(bus, map, LinkConfig::default());
            link.setup(&UserParameters {
                mode: 1,
                master_address: 1,
                max_address: 1,
                transmission_cycle: 1000,
                communication_cycle: 1000,
                message_bytes: 32,
                devices: 1,
                .. UserParameters::default()
                })?;

            let period = Duration::from_millis(1);
            let mut next = Instant::now();
            loop {
                link.enqueue(&[0x01, 0, 0, 0], u5::new(1))?;
                let cycle = link.cycle();
                if let Some(error) = cycle.error() {
                    log::error!("cycle failed with code {}: {}", error.code(), error);
                }
                for (station, data) in link.received().iter() {
                    log::trace!("station {}: {:02x?}", station.value(), data);
                }
                next += period;
                std::thread::sleep(next.saturating_duration_since(Instant::now()));
            }
        });
        thread_priority::set_thread_priority_and_policy(
            std::os::unix::thread::JoinHandleExt::as_pthread_t(&handle),
            thread_priority::ThreadPriority::Max,
            thread_priority::ThreadSchedulePolicy::Realtime(thread_priority::RealtimeThreadSchedulePolicy::Fifo),
            ).map_err(|error|  format!("cannot set realtime priority: {:?}", error))?;
        handle.join().map_err(|_| "exchange thread panicked")??;
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    realtime::main()
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("memory mapped registers are only supported on linux");
}

/*!
    transmit side of the register framing: messages are cut into words written to the transmit data port, then their byte count and station are pushed to the send FIFOs.

    The FPGA accepts at most [MAX_BURST] messages per burst, this is the depth of its send count FIFO.
*/

use crate::{
    bus::RegisterBus,
    data::{self, WORD},
    error::{self, LinkError, LinkResult, Interrupted},
    message::Message,
    registers::RegisterMap,
    };


/// depth of the send count FIFO: maximum number of messages sent in one burst
pub const MAX_BURST: usize = 16;

/// progress of a transmission
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Transmitted {
    /// number of messages completely written and accepted by the send count FIFO
    pub sent: u8,
    /// bytes of these messages
    pub bytes: usize,
}

/**
    send a burst of messages through the transmit registers

    At most `burst` messages are sent (and never more than [MAX_BURST]), remaining messages are dropped from this burst. Each message is sent with this sequence:

    1. its payload as little endian words to the data port, the last word holding the 1-3 remaining bytes in its low bytes
    2. its byte count to the send count FIFO
    3. its station to the send station FIFO (when the layout has one)
    4. a read of the mode register to check the send count FIFO did not overflow

    The first error stops the burst. The error then reports the messages completely sent before it.
*/
pub fn transmit<B: RegisterBus>(bus: &mut B, map: &RegisterMap, messages: &[Message], burst: usize)
    -> Result<Transmitted, Interrupted<Transmitted>>
{
    let burst = messages.len().min(burst).min(MAX_BURST);
    if burst < messages.len() {
        log::debug!("burst limited to {} messages, {} dropped", burst, messages.len() - burst);
    }

    let mut done = Transmitted::default();
    for message in &messages[.. burst] {
        if let Err(error) = send(bus, map, message) {
            log::error!("transmit interrupted after {} messages: {}", done.sent, error);
            return Err(Interrupted::new(done, error));
        }
        done.sent += 1;
        done.bytes += message.len();
    }
    log::trace!("transmitted {:?}", done);
    Ok(done)
}

/// send one message, the caller counts it only if this succeeds
fn send<B: RegisterBus>(bus: &mut B, map: &RegisterMap, message: &Message) -> LinkResult<()> {
    let words = message.data.chunks_exact(WORD);
    let remain = words.remainder();
    for word in words {
        bus.set(map.tx_data, data::pack_word(word)?)?;
    }
    match remain.len() {
        0 => {},
        1 ..= 3 => bus.set(map.tx_data, data::pack_word(remain)?)?,
        _ => return Err(LinkError::BufferParsing("transmit remainder longer than a word")),
    }

    bus.set(map.tx_count, message.len() as u32)?;
    if let Some(station) = map.tx_station {
        bus.set(station, u32::from(message.station.value()))?;
    }

    match error::classify_mode(bus.get(map.mode)?) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bus::{SimulatedBus, Access, SentFrame},
        registers::Layout,
        };
    use bilge::prelude::*;

    fn bus(layout: Layout) -> SimulatedBus {
        SimulatedBus::new(RegisterMap::new(layout, 0x4000, 0x100, 4, 0))
    }

    #[test]
    fn register_sequence() {
        let mut bus = bus(Layout::Station);
        let map = bus.map().clone();
        let messages = [
            Message::new(&[0x11, 0x22, 0x33, 0x44, 0x55], u5::new(2)).unwrap(),
            Message::new(&[0xaa, 0xbb, 0xcc], u5::new(3)).unwrap(),
            ];

        let done = transmit(&mut bus, &map, &messages, MAX_BURST).unwrap();
        assert_eq!(done, Transmitted {sent: 2, bytes: 8});

        let station = map.tx_station.unwrap().address;
        assert_eq!(bus.accesses(), &[
            Access::Write {address: map.tx_data.address, value: 0x44332211},
            Access::Write {address: map.tx_data.address, value: 0x00000055},
            Access::Write {address: map.tx_count.address, value: 5},
            Access::Write {address: station, value: 2},
            Access::Read {address: map.mode.address, value: 0},
            Access::Write {address: map.tx_data.address, value: 0x00ccbbaa},
            Access::Write {address: map.tx_count.address, value: 3},
            Access::Write {address: station, value: 3},
            Access::Read {address: map.mode.address, value: 0},
            ]);
        assert_eq!(bus.sent(), messages.iter().map(SentFrame::from).collect::<Vec<_>>());
    }

    #[test]
    fn word_writes_per_length() {
        for len in [0, 1, 2, 3, 4, 5, 7, 8, 9, 255] {
            let mut bus = bus(Layout::Station);
            let map = bus.map().clone();
            let message = Message::new(&vec![0x5a; len], u5::new(1)).unwrap();
            transmit(&mut bus, &map, &[message], MAX_BURST).unwrap();
            assert_eq!(
                bus.writes_to(map.tx_data.address).len(),
                len / 4 + if len % 4 != 0 {1} else {0},
                "length {}", len,
                );
        }
    }

    #[test]
    fn burst_clamp() {
        let mut bus = bus(Layout::Station);
        let map = bus.map().clone();
        let messages = (0 .. 20)
            .map(|i|  Message::new(&[i as u8; 6], u5::new(i as u8)).unwrap())
            .collect::<Vec<_>>();

        let done = transmit(&mut bus, &map, &messages, MAX_BURST).unwrap();
        assert_eq!(done, Transmitted {sent: 16, bytes: 96});
        assert_eq!(bus.sent().len(), 16);

        // a smaller burst is honored as well
        bus.complete_burst();
        let done = transmit(&mut bus, &map, &messages, 3).unwrap();
        assert_eq!(done.sent, 3);
    }

    #[test]
    fn send_count_overflow() {
        let mut bus = bus(Layout::Station);
        let map = bus.map().clone();
        bus.set_send_slots(4);
        let messages = (0 .. 10)
            .map(|i|  Message::new(&[i as u8; 2], u5::new(1)).unwrap())
            .collect::<Vec<_>>();

        let interrupted = transmit(&mut bus, &map, &messages, MAX_BURST).unwrap_err();
        assert!(matches!(interrupted.error, LinkError::TxSendCountFifo));
        assert_eq!(interrupted.code(), -214);
        assert_eq!(interrupted.done, Transmitted {sent: 4, bytes: 8});
        // the burst stopped at the faulty message
        assert_eq!(bus.reads_of(map.mode.address), 5);
    }

    #[test]
    fn bus_failure_keeps_progress() {
        let mut bus = bus(Layout::Station);
        let map = bus.map().clone();
        let messages = [
            Message::new(&[1, 2, 3, 4], u5::new(1)).unwrap(),
            Message::new(&[5, 6, 7, 8], u5::new(1)).unwrap(),
            ];
        // each message takes 4 accesses
        bus.fail_from(6);

        let interrupted = transmit(&mut bus, &map, &messages, MAX_BURST).unwrap_err();
        assert!(matches!(interrupted.error, LinkError::RegisterIo(_)));
        assert_eq!(interrupted.done, Transmitted {sent: 1, bytes: 4});
    }

    #[test]
    fn control_layout_skips_station() {
        let mut bus = bus(Layout::Control);
        let map = bus.map().clone();
        let message = Message::new(&[1, 2, 3], u5::new(9)).unwrap();

        transmit(&mut bus, &map, &[message], MAX_BURST).unwrap();
        assert_eq!(bus.accesses().len(), 3);
        assert_eq!(bus.sent(), &[SentFrame {data: vec![1, 2, 3], station: None}]);
    }
}

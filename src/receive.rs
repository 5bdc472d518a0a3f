/*!
    receive side of the register framing: the mode register tells how many packets are waiting, then each packet is drained from the receive count, station and data FIFOs.

    Every FIFO entry can be read only once, reading it advances the hardware FIFO. So a packet that cannot be stored is lost for this cycle, and the check against the buffer capacity happens before any data is read.
*/

use bilge::prelude::*;
use crate::{
    bus::RegisterBus,
    data::{self, WORD},
    error::{LinkError, LinkResult, Interrupted},
    message::{Message, Station},
    registers::RegisterMap,
    };


/// maximum number of packets the mode register can announce
pub const MAX_RECEIVED: usize = 31;

/// progress of a reception
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Received {
    /// number of messages completely reconstructed
    pub messages: usize,
    /// bytes of these messages
    pub bytes: usize,
}

/// location of a received message in a [ReceiveBuffer]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    /// station the message was received from
    pub station: Station,
    /// packet error flags of the receive count FIFO, forwarded as is
    pub errors: u3,
    start: usize,
    len: usize,
}
impl Frame {
    pub fn len(&self) -> usize  {self.len}
    pub fn is_empty(&self) -> bool  {self.len == 0}
}

/**
    storage for received messages, owned by the caller and reused from one cycle to the next

    Its byte capacity is fixed at creation and never grows: receiving more bytes than the capacity is an error ([LinkError::RxArraySize]), not a reallocation.
*/
#[derive(Clone, Debug)]
pub struct ReceiveBuffer {
    data: Box<[u8]>,
    filled: usize,
    frames: heapless::Vec<Frame, MAX_RECEIVED>,
}

impl ReceiveBuffer {
    /// buffer able to hold `max_messages` messages of `max_message_length` bytes
    pub fn new(max_messages: u8, max_message_length: u8) -> Self {
        Self::with_capacity(usize::from(max_messages) * usize::from(max_message_length))
    }
    /// buffer able to hold `capacity` bytes of received messages
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
            filled: 0,
            frames: heapless::Vec::new(),
        }
    }
    /// maximum number of bytes this buffer can hold
    pub fn capacity(&self) -> usize  {self.data.len()}
    /// number of messages held
    pub fn len(&self) -> usize  {self.frames.len()}
    pub fn is_empty(&self) -> bool  {self.frames.is_empty()}
    /// total bytes of the messages held
    pub fn bytes(&self) -> usize  {self.filled}
    /// progress this buffer represents
    pub fn received(&self) -> Received {
        Received {messages: self.len(), bytes: self.bytes()}
    }
    pub fn clear(&mut self) {
        self.filled = 0;
        self.frames.clear();
    }

    /// messages held, in reception order
    pub fn frames(&self) -> &[Frame]  {&self.frames}
    /// payload of a message held in this buffer
    pub fn data(&self, frame: &Frame) -> &[u8] {
        &self.data[frame.start ..][.. frame.len]
    }
    /// iterate over messages as their station and payload
    pub fn iter(&self) -> impl Iterator<Item=(Station, &[u8])> + '_ {
        self.frames.iter().map(|frame|  (frame.station, self.data(frame)))
    }
    /// copy the received messages out of the buffer
    pub fn to_messages(&self) -> LinkResult<Vec<Message>> {
        self.iter()
            .map(|(station, data)|  Message::new(data, station))
            .collect()
    }

    /// space for the next message, checked against the capacity before anything is written
    fn reserve(&mut self, len: usize) -> LinkResult<&mut [u8]> {
        if self.filled + len > self.data.len() || self.frames.is_full()
            {return Err(LinkError::RxArraySize)}
        Ok(&mut self.data[self.filled ..][.. len])
    }
    /// account the reserved space as a complete message
    fn commit(&mut self, station: Station, errors: u3, len: usize) {
        let frame = Frame {station, errors, start: self.filled, len};
        debug_assert!(! self.frames.is_full(), "frame committed without room reserved");
        match self.frames.push(frame) {
            Ok(()) => self.filled += len,
            Err(_) => log::error!("frame table full, message from station {} dropped", station.value()),
        }
    }
}


/**
    drain the messages waiting in the receive FIFOs into the given buffer

    The buffer is cleared first. The mode register is polled once: if it reports no message, nothing else is read. Otherwise every announced message is reconstructed in arrival order.

    Reception stops at the first error, the buffer then holds the messages completely reconstructed before it, which the error also reports:

    - [LinkError::RxPacketSizeZero] if a packet declares no byte
    - [LinkError::RxArraySize] if the packet does not fit in the remaining capacity of the buffer
    - [LinkError::RegisterIo] if the bus fails
*/
pub fn receive<B: RegisterBus>(bus: &mut B, map: &RegisterMap, buffer: &mut ReceiveBuffer)
    -> Result<Received, Interrupted<Received>>
{
    buffer.clear();
    let available = match bus.get(map.mode) {
        Ok(status) => status.received().value(),
        Err(error) => return Err(abort(buffer, error.into())),
    };
    if available == 0 {
        log::trace!("no new messages");
        return Ok(Received::default());
    }

    for _ in 0 .. available {
        if let Err(error) = drain(bus, map, buffer) {
            return Err(abort(buffer, error));
        }
    }
    log::trace!("received {:?}", buffer.received());
    Ok(buffer.received())
}

fn abort(buffer: &ReceiveBuffer, error: LinkError) -> Interrupted<Received> {
    log::error!("receive interrupted after {} messages: {}", buffer.len(), error);
    Interrupted::new(buffer.received(), error)
}

/// reconstruct the oldest message of the receive FIFOs
fn drain<B: RegisterBus>(bus: &mut B, map: &RegisterMap, buffer: &mut ReceiveBuffer) -> LinkResult<()> {
    let count = bus.get(map.rx_count)?;
    let station = bus.get(map.rx_station)?.station();
    let len = usize::from(count.bytes());

    if count.errors().value() != 0 {
        log::warn!("packet from station {} reports error flags {:#05b}", station.value(), count.errors().value());
    }
    if len == 0 {
        return Err(LinkError::RxPacketSizeZero);
    }

    let dst = buffer.reserve(len)?;
    let mut words = dst.chunks_exact_mut(WORD);
    for word in &mut words {
        data::unpack_word(bus.get(map.rx_data)?, word)?;
    }
    let remain = words.into_remainder();
    match remain.len() {
        0 => {},
        1 ..= 3 => data::unpack_word(bus.get(map.rx_data)?, remain)?,
        _ => return Err(LinkError::BufferParsing("receive remainder longer than a word")),
    }

    buffer.commit(station, count.errors(), len);
    Ok(())
}

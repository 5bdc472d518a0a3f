//! bounded queue of messages waiting for the next transmit burst

use crate::{
    bus::RegisterBus,
    error::{LinkError, LinkResult, Interrupted},
    message::{Message, Station},
    registers::RegisterMap,
    transmit::{self, Transmitted, MAX_BURST},
    };


/**
    ordered buffer of pending outbound messages

    Its capacity `N` is independent of the hardware burst, when flushing only the burst limit is sent. Nothing survives a flush: the queue is emptied whatever the transmission outcome, unsent messages are dropped and never retried.
*/
#[derive(Clone, Debug, Default)]
pub struct WriteQueue<const N: usize = MAX_BURST> {
    messages: heapless::Vec<Message, N>,
}

impl<const N: usize> WriteQueue<N> {
    pub const fn new() -> Self {
        Self {messages: heapless::Vec::new()}
    }
    /// append a message, failing if the queue is full or the message cannot be represented
    pub fn enqueue(&mut self, data: &[u8], station: Station) -> LinkResult<()> {
        self.push(Message::new(data, station)?)
    }
    /// append an already built message
    pub fn push(&mut self, message: Message) -> LinkResult<()> {
        self.messages.push(message)
            .map_err(|_|  LinkError::QueueFull)
    }
    pub fn len(&self) -> usize  {self.messages.len()}
    pub fn is_empty(&self) -> bool  {self.messages.is_empty()}
    pub const fn capacity(&self) -> usize  {N}
    pub fn messages(&self) -> &[Message]  {&self.messages}

    /// transmit the queued messages, up to `burst` of them, and empty the queue
    pub fn flush<B: RegisterBus>(&mut self, bus: &mut B, map: &RegisterMap, burst: usize)
        -> Result<Transmitted, Interrupted<Transmitted>>
    {
        let result = transmit::transmit(bus, map, &self.messages, burst);
        self.messages.clear();
        result
    }
}

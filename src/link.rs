/*!
    driver of one mechatrolink instance, owning everything a realtime cycle needs.

    A [Link] is built once from the [RegisterMap] found at discovery. Then the application configures it with [Link::setup], and calls [Link::cycle] (or [Link::flush] and [Link::poll] separately) periodically. Nothing is allocated after creation.
*/

use crate::{
    bus::RegisterBus,
    config::{LinkConfig, UserParameters, ParameterPacking},
    error::{LinkError, LinkResult, Interrupted},
    message::{Message, Station},
    queue::WriteQueue,
    receive::{self, ReceiveBuffer, Received},
    registers::RegisterMap,
    transmit::{Transmitted, MAX_BURST},
    };


/// report of one exchange cycle, each direction runs and reports independently
#[derive(Clone, Debug)]
pub struct Cycle {
    pub transmitted: Result<Transmitted, Interrupted<Transmitted>>,
    pub received: Result<Received, Interrupted<Received>>,
}
impl Cycle {
    /// first error of the cycle, transmission first
    pub fn error(&self) -> Option<&LinkError> {
        match (&self.transmitted, &self.received) {
            (Err(interrupted), _) => Some(&interrupted.error),
            (_, Err(interrupted)) => Some(&interrupted.error),
            _ => None,
        }
    }
    /// convert to a result, discarding the progress of a failing direction
    pub fn into_result(self) -> LinkResult<(Transmitted, Received)> {
        Ok((self.transmitted?, self.received?))
    }
}

/// one mechatrolink instance reached through a register bus
pub struct Link<B: RegisterBus> {
    bus: B,
    map: RegisterMap,
    config: LinkConfig,
    queue: WriteQueue,
    received: ReceiveBuffer,
}

impl<B: RegisterBus> Link<B> {
    pub fn new(bus: B, map: RegisterMap, mut config: LinkConfig) -> Self {
        if config.burst > MAX_BURST {
            log::warn!("burst of {} messages limited to {}", config.burst, MAX_BURST);
            config.burst = MAX_BURST;
        }
        Self {
            bus,
            map,
            queue: WriteQueue::new(),
            received: ReceiveBuffer::new(config.max_messages, config.max_message_length),
            config,
        }
    }
    pub fn map(&self) -> &RegisterMap  {&self.map}
    pub fn config(&self) -> &LinkConfig  {&self.config}
    pub fn bus(&self) -> &B  {&self.bus}
    pub fn bus_mut(&mut self) -> &mut B  {&mut self.bus}
    pub fn into_bus(self) -> B  {self.bus}

    /**
        write the user parameter registers

        Every register is written even if one fails, the first failure is then reported.
    */
    pub fn setup(&mut self, parameters: &UserParameters) -> LinkResult<()> {
        if self.config.packing == ParameterPacking::LegacyAnd {
            log::warn!("legacy parameter packing writes zero to every user parameter register");
        }
        let values = parameters.registers(self.config.packing);
        if self.map.user.len() < values.len() {
            log::warn!("layout {:?} only has {} user parameter registers, {} values dropped",
                self.map.layout, self.map.user.len(), values.len() - self.map.user.len());
        }

        let mut result = Ok(());
        for (register, value) in self.map.user.iter().zip(values) {
            if let Err(error) = self.bus.set(*register, value) {
                log::error!("cannot write user parameter at 0x{:x}: {}", register.address, error);
                if result.is_ok() {
                    result = Err(error.into());
                }
            }
        }
        result
    }

    /// queue a message for the next flush
    pub fn enqueue(&mut self, data: &[u8], station: Station) -> LinkResult<()> {
        self.queue.enqueue(data, station)
    }
    /// messages waiting for the next flush
    pub fn pending(&self) -> &[Message]  {self.queue.messages()}

    /// send the queued messages, the queue is empty afterward
    pub fn flush(&mut self) -> Result<Transmitted, Interrupted<Transmitted>> {
        self.queue.flush(&mut self.bus, &self.map, self.config.burst)
    }
    /// drain the receive FIFOs into the owned buffer, see [Self::received]
    pub fn poll(&mut self) -> Result<Received, Interrupted<Received>> {
        receive::receive(&mut self.bus, &self.map, &mut self.received)
    }
    /// messages of the last poll
    pub fn received(&self) -> &ReceiveBuffer  {&self.received}

    /// flush then poll
    pub fn cycle(&mut self) -> Cycle {
        let transmitted = self.flush();
        let received = self.poll();
        Cycle {transmitted, received}
    }
}

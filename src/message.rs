//! mechatrolink messages as exchanged with the FPGA FIFOs

use bilge::prelude::*;
use crate::error::{LinkError, LinkResult};


/// maximum byte size of a message, bounded by the 8 bits byte count of the count FIFOs
pub const MAX_MESSAGE: usize = 255;

/// station address of a device on the fieldbus
pub type Station = u5;

/**
    one message with its destination (when sending) or source (when received) station

    The payload is stored inline so a message can be queued without allocation in the realtime cycle.
*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub data: heapless::Vec<u8, MAX_MESSAGE>,
    pub station: Station,
}

impl Message {
    /// copy the given payload into a new message, payloads longer than [MAX_MESSAGE] cannot be represented
    pub fn new(data: &[u8], station: Station) -> LinkResult<Self> {
        Ok(Self {
            data: heapless::Vec::from_slice(data)
                .map_err(|_|  LinkError::InvalidArgument("message is longer than 255 bytes"))?,
            station,
        })
    }
    /// byte count as written to the count FIFO
    pub fn len(&self) -> usize  {self.data.len()}
    pub fn is_empty(&self) -> bool  {self.data.is_empty()}
}

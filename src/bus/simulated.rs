use std::{
    io,
    collections::{HashMap, VecDeque},
    };
use bilge::prelude::*;
use crate::{
    data::{self, WORD},
    message::{Message, Station},
    receive::MAX_RECEIVED,
    registers::{ModeStatus, RegisterMap},
    transmit::MAX_BURST,
    };
use super::RegisterBus;


/// one register access seen by a [SimulatedBus]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Access {
    Read {address: u32, value: u32},
    Write {address: u32, value: u32},
}

/// a message completely written to the transmit registers of a [SimulatedBus]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SentFrame {
    pub data: Vec<u8>,
    /// station written for this frame, `None` on layouts without transmit station register
    pub station: Option<Station>,
}

/**
    software model of one mechatrolink instance, answering to the addresses of its [RegisterMap]

    It behaves like the FPGA FIFOs as seen from the register bus:

    - words written to the transmit data port are accumulated until a byte count and then a station are written, which completes a [SentFrame]
    - the send count FIFO has a limited number of free slots (16 by default), writing a count when it is full raises the sticky error bit of the mode register and drops the frame
    - received packets are pushed with [Self::inject] and drained through the receive count, station and data FIFOs, the mode register reports how many are waiting
    - reading an empty FIFO gives zero
    - any other register simply stores what is written

    Every access is recorded, and the bus can be made to fail from a given access on, to test error paths.
*/
#[derive(Clone, Debug)]
pub struct SimulatedBus {
    map: RegisterMap,

    tx_words: VecDeque<u32>,
    tx_count: Option<u32>,
    send_slots: usize,
    send_error: bool,
    sent: Vec<SentFrame>,

    rx_counts: VecDeque<u32>,
    rx_stations: VecDeque<u32>,
    rx_words: VecDeque<u32>,

    registers: HashMap<u32, u32>,
    accesses: Vec<Access>,
    fail_from: Option<usize>,
}

impl SimulatedBus {
    pub fn new(map: RegisterMap) -> Self {
        Self {
            map,

            tx_words: VecDeque::new(),
            tx_count: None,
            send_slots: MAX_BURST,
            send_error: false,
            sent: Vec::new(),

            rx_counts: VecDeque::new(),
            rx_stations: VecDeque::new(),
            rx_words: VecDeque::new(),

            registers: HashMap::new(),
            accesses: Vec::new(),
            fail_from: None,
        }
    }
    pub fn map(&self) -> &RegisterMap  {&self.map}

    /// set the number of free entries in the send count FIFO
    pub fn set_send_slots(&mut self, slots: usize)  {self.send_slots = slots}
    /// the hardware sent its burst: the send count FIFO is empty again
    pub fn complete_burst(&mut self)  {self.send_slots = MAX_BURST}
    /// reset the sticky send count FIFO error
    pub fn clear_errors(&mut self)  {self.send_error = false}

    /// frames completely written so far
    pub fn sent(&self) -> &[SentFrame]  {&self.sent}
    /// remove and return the frames completely written so far
    pub fn take_sent(&mut self) -> Vec<SentFrame>  {core::mem::take(&mut self.sent)}

    /// make a packet available in the receive FIFOs
    pub fn inject(&mut self, data: &[u8], station: Station) {
        let words = data.chunks(WORD)
            .map(|chunk|  data::pack_word(chunk).unwrap_or_default())
            .collect::<Vec<_>>();
        self.inject_raw(data.len() as u32, u32::from(station.value()), &words);
    }
    /// push raw words in the receive FIFOs, allowing to simulate inconsistent hardware reports
    pub fn inject_raw(&mut self, count: u32, station: u32, words: &[u32]) {
        self.rx_counts.push_back(count);
        self.rx_stations.push_back(station);
        self.rx_words.extend(words);
    }
    /// inject every frame sent so far back in the receive FIFOs, as if the fieldbus looped back
    pub fn loop_back(&mut self) {
        for frame in self.take_sent() {
            self.inject(&frame.data, frame.station.unwrap_or(u5::new(0)));
        }
    }
    /// messages waiting in the receive FIFOs
    pub fn pending(&self) -> usize  {self.rx_counts.len()}

    /// every register access since creation or last [Self::clear_accesses]
    pub fn accesses(&self) -> &[Access]  {&self.accesses}
    pub fn clear_accesses(&mut self)  {self.accesses.clear()}
    /// values written to the given address, in order
    pub fn writes_to(&self, address: u32) -> Vec<u32> {
        self.accesses.iter()
            .filter_map(|access| match *access {
                Access::Write {address: a, value} if a == address => Some(value),
                _ => None,
            })
            .collect()
    }
    /// number of reads of the given address
    pub fn reads_of(&self, address: u32) -> usize {
        self.accesses.iter()
            .filter(|access|  matches!(access, Access::Read {address: a, ..} if *a == address))
            .count()
    }
    /// last value written to a plain register (neither a FIFO nor a port)
    pub fn register(&self, address: u32) -> Option<u32> {
        self.registers.get(&address).copied()
    }

    /// make every access fail, starting from the access of the given index
    pub fn fail_from(&mut self, access: usize)  {self.fail_from = Some(access)}

    fn fault(&self) -> io::Result<()> {
        match self.fail_from {
            Some(index) if self.accesses.len() >= index =>
                Err(io::Error::new(io::ErrorKind::Other, "simulated register bus failure")),
            _ => Ok(()),
        }
    }

    fn mode(&self) -> u32 {
        let mut status = ModeStatus::default();
        status.set_send_count_fifo_error(self.send_error);
        status.set_received(u5::new(self.rx_counts.len().min(MAX_RECEIVED) as u8));
        u32::from(status)
    }

    fn push_count(&mut self, count: u32) {
        if self.send_slots == 0 {
            log::trace!("simulated send count FIFO overflow");
            self.send_error = true;
            // the data of the refused frame never leaves the FPGA
            self.tx_words.clear();
            self.tx_count = None;
            return
        }
        self.send_slots -= 1;
        self.tx_count = Some(count);
        if self.map.tx_station.is_none()
            {self.complete(None)}
    }

    fn complete(&mut self, station: Option<Station>) {
        let Some(count) = self.tx_count.take()  else {return};
        let mut frame = vec![0; count as usize & 0xff];
        let mut words = frame.chunks_exact_mut(WORD);
        for chunk in &mut words {
            chunk.copy_from_slice(&self.tx_words.pop_front().unwrap_or(0).to_le_bytes());
        }
        let remain = words.into_remainder();
        if ! remain.is_empty() {
            let word = self.tx_words.pop_front().unwrap_or(0);
            if let Err(error) = data::unpack_word(word, remain) {
                log::error!("simulated frame truncated: {:?}", error);
            }
        }
        self.sent.push(SentFrame {data: frame, station});
    }
}

impl RegisterBus for SimulatedBus {
    fn read(&mut self, address: u32) -> io::Result<u32> {
        self.fault()?;
        let value =
            if address == self.map.mode.address
                {self.mode()}
            else if address == self.map.rx_count.address
                {self.rx_counts.pop_front().unwrap_or(0)}
            else if address == self.map.rx_station.address
                {self.rx_stations.pop_front().unwrap_or(0)}
            else if address == self.map.rx_data.address
                {self.rx_words.pop_front().unwrap_or(0)}
            else
                {self.register(address).unwrap_or(0)};
        self.accesses.push(Access::Read {address, value});
        Ok(value)
    }
    fn write(&mut self, address: u32, value: u32) -> io::Result<()> {
        self.fault()?;
        self.accesses.push(Access::Write {address, value});
        if address == self.map.tx_data.address
            {self.tx_words.push_back(value)}
        else if address == self.map.tx_count.address
            {self.push_count(value)}
        else if Some(address) == self.map.tx_station.map(|register| register.address)
            {self.complete(Some(u5::new((value & 0x1f) as u8)))}
        else
            {self.registers.insert(address, value);}
        Ok(())
    }
}

impl From<&Message> for SentFrame {
    fn from(message: &Message) -> Self {
        Self {
            data: message.data.to_vec(),
            station: Some(message.station),
        }
    }
}

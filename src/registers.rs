/*!
    structs and consts for every register of a mechatrolink instance in the FPGA. This should be used instead of any hardcoded register value.

    The goal of this file is to gather all registers at one place, so what you see here is exactly what you can expect in the firmware, no more, no less.

    Register addresses are not fixed, they depend on where the firmware placed the module. They are computed once at discovery as a [RegisterMap].
*/

use core::ops::Range;
use bilge::prelude::*;
use crate::data::{self, Register};


/// maximum number of user parameter registers in any layout
pub const USER_REGISTERS: usize = 5;


/// mode and status register
#[bitsize(32)]
#[derive(FromBits, DebugBits, DefaultBits, Copy, Clone, Eq, PartialEq)]
pub struct ModeStatus {
    reserved_low: u4,
    /// sticky flag raised when the send count FIFO overflowed
    pub send_count_fifo_error: bool,
    reserved_mid: u11,
    /// number of completely received packets waiting in the receive FIFOs
    pub received: u5,
    reserved_high: u11,
}
data::bilge_register!(ModeStatus);

/**
    receive count FIFO register

    reading it consumes the entry of the oldest received packet
*/
#[bitsize(32)]
#[derive(FromBits, DebugBits, DefaultBits, Copy, Clone, Eq, PartialEq)]
pub struct RxCount {
    /// bytes in the received packet
    pub bytes: u8,
    reserved_low: u1,
    /// packet level error flags, their meaning is not documented yet
    pub errors: u3,
    reserved_high: u20,
}
data::bilge_register!(RxCount);

/**
    receive station FIFO register

    reading it consumes the entry of the oldest received packet
*/
#[bitsize(32)]
#[derive(FromBits, DebugBits, DefaultBits, Copy, Clone, Eq, PartialEq)]
pub struct RxStation {
    /// station address the packet was received from
    pub station: u5,
    reserved: u27,
}
data::bilge_register!(RxStation);

/// two logical setup values sharing one user parameter register
#[bitsize(32)]
#[derive(FromBits, DebugBits, DefaultBits, Copy, Clone, Eq, PartialEq)]
pub struct ParameterPair {
    pub low: u16,
    pub high: u16,
}
data::bilge_register!(ParameterPair);



/**
    register layouts found in mechatrolink firmwares

    The layout is selected by the version of the module descriptor. Offsets are in units of register stride.
*/
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Layout {
    /**
        layout with a station FIFO in both directions

        | offset | register |
        |--------|----------|
        | 0 | tx data |
        | 1 | tx station FIFO |
        | 2 | tx count FIFO |
        | 3 | rx data |
        | 4 | rx station FIFO |
        | 5 | rx count FIFO |
        | 6 | mode/status |
        | 7..11 | user parameters |
    */
    Station,
    /**
        layout with a control register and no transmit station FIFO

        These offsets are taken from the firmware variant as observed, no hardware documentation confirms them.
    */
    Control,
}

/// register offsets of a [Layout], in units of register stride
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Offsets {
    pub tx_data: u32,
    pub tx_station: Option<u32>,
    pub tx_count: u32,
    pub rx_data: u32,
    pub rx_station: u32,
    pub rx_count: u32,
    pub mode: u32,
    pub control: Option<u32>,
    pub user: Range<u32>,
}

impl Layout {
    /// select the layout matching a module descriptor version
    pub fn from_version(version: u8) -> Option<Self> {
        match version {
            0 => Some(Self::Station),
            1 => Some(Self::Control),
            _ => None,
        }
    }
    /// number of registers the firmware declares in its module descriptor for this layout
    pub fn declared_registers(self) -> u8 {
        match self {
            Self::Station => 11,
            Self::Control => 10,
        }
    }
    pub fn offsets(self) -> Offsets {
        match self {
            Self::Station => Offsets {
                tx_data: 0,
                tx_station: Some(1),
                tx_count: 2,
                rx_data: 3,
                rx_station: 4,
                rx_count: 5,
                mode: 6,
                control: None,
                user: 7 .. 12,
            },
            Self::Control => Offsets {
                tx_data: 0,
                tx_station: None,
                tx_count: 1,
                rx_data: 2,
                rx_station: 3,
                rx_count: 4,
                mode: 5,
                control: Some(6),
                user: 7 .. 10,
            },
        }
    }
}


/**
    addresses of all registers of one mechatrolink instance

    It is built once during discovery and never changes afterward.
*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisterMap {
    pub layout: Layout,
    /// transmit data port, one word per write
    pub tx_data: Register<u32>,
    /// station address of the next message to send, absent in [Layout::Control]
    pub tx_station: Option<Register<u32>>,
    /// byte count of the next message to send, writing it pushes an entry in the send count FIFO
    pub tx_count: Register<u32>,
    /// receive data port, one word per read
    pub rx_data: Register<u32>,
    pub rx_station: Register<RxStation>,
    pub rx_count: Register<RxCount>,
    pub mode: Register<ModeStatus>,
    /// control register, only present in [Layout::Control]
    pub control: Option<Register<u32>>,
    pub user: heapless::Vec<Register<ParameterPair>, USER_REGISTERS>,
}

impl RegisterMap {
    /**
        compute the register addresses of the instance `index` of a module

        every register lies at `base + offset * register_stride + index * instance_stride`
    */
    pub fn new(layout: Layout, base: u32, register_stride: u32, instance_stride: u32, index: u32) -> Self {
        let at = |offset: u32|  base + offset * register_stride + index * instance_stride;
        let offsets = layout.offsets();
        Self {
            layout,
            tx_data: Register::new(at(offsets.tx_data)),
            tx_station: offsets.tx_station.map(|offset|  Register::new(at(offset))),
            tx_count: Register::new(at(offsets.tx_count)),
            rx_data: Register::new(at(offsets.rx_data)),
            rx_station: Register::new(at(offsets.rx_station)),
            rx_count: Register::new(at(offsets.rx_count)),
            mode: Register::new(at(offsets.mode)),
            control: offsets.control.map(|offset|  Register::new(at(offset))),
            user: offsets.user.map(|offset|  Register::new(at(offset))).collect(),
        }
    }
}

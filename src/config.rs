//! configuration values of the link, provided by the calling application

use crate::{
    registers::ParameterPair,
    transmit::MAX_BURST,
    message::MAX_MESSAGE,
    };


/**
    how two setup values are combined into one user parameter register

    The first value of each pair goes to the low half of the register, the second to the high half.
*/
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ParameterPacking {
    /// `low | high << 16`
    #[default]
    Combined,
    /**
        `low & high << 16`, as written by the earlier drivers

        This always gives zero, it only exists to stay byte-for-byte compatible with firmwares configured by these drivers.
    */
    LegacyAnd,
}

impl ParameterPacking {
    pub fn pack(self, low: u16, high: u16) -> ParameterPair {
        match self {
            Self::Combined => ParameterPair::new(low, high),
            Self::LegacyAnd => ParameterPair::from(u32::from(low) & (u32::from(high) << 16)),
        }
    }
}

/**
    the mechatrolink master setup, written once to the user parameter registers before the cyclic exchanges

    The firmware names of each value are given in the field descriptions.
*/
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct UserParameters {
    /// `mod`
    pub mode: u16,
    /// `ma`
    pub master_address: u16,
    /// `ma_max`
    pub max_address: u16,
    /// `t_mcyc`
    pub transmission_cycle: u16,
    /// `t_cyc`
    pub communication_cycle: u16,
    /// `byte`
    pub message_bytes: u16,
    /// `dev`
    pub devices: u16,
    /// `max_rtry`
    pub max_retries: u16,
    /// `c2m_ch`
    pub c2_channels: u16,
    /// `wdt`
    pub watchdog: u16,
}

impl UserParameters {
    /// the values paired by register, in register order
    pub fn pairs(&self) -> [(u16, u16); 5] {[
        (self.mode, self.master_address),
        (self.max_address, self.transmission_cycle),
        (self.communication_cycle, self.message_bytes),
        (self.devices, self.max_retries),
        (self.c2_channels, self.watchdog),
    ]}
    /// content of the five user parameter registers
    pub fn registers(&self, packing: ParameterPacking) -> [ParameterPair; 5] {
        self.pairs().map(|(low, high)|  packing.pack(low, high))
    }
}

/// settings of a [crate::Link]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LinkConfig {
    /// maximum messages per transmit burst, never more than [MAX_BURST]
    pub burst: usize,
    /// receive buffer size, in messages
    pub max_messages: u8,
    /// receive buffer size, in bytes per message
    pub max_message_length: u8,
    /// user parameters packing
    pub packing: ParameterPacking,
}
impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            burst: MAX_BURST,
            max_messages: MAX_BURST as u8,
            max_message_length: MAX_MESSAGE as u8,
            packing: ParameterPacking::default(),
        }
    }
}

/// settings of the discovery of mechatrolink instances
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DiscoveryConfig {
    /// function tag the firmware gives to mechatrolink modules
    pub gtag: u8,
    /// number of instances to use, `None` uses all the firmware provides
    pub requested: Option<usize>,
}
impl DiscoveryConfig {
    pub fn new(gtag: u8) -> Self {
        Self {gtag, requested: None}
    }
}

/*!
    This module provides the trait [RegisterBus], and several implementors allowing to reach the FPGA registers.

    - [MappedBus] accesses registers of a memory mapped FPGA (like a PCI card exposing its registers through a BAR). It is the realtime way, every access is a single bus transaction.
    - [SimulatedBus] models the mechatrolink FIFOs in software, to run the transfers without hardware.

    The transfer functions of this crate only use this trait, they never open nor detect hardware themselves.
*/

#[cfg(target_os = "linux")]
mod mapped;
mod simulated;

#[cfg(target_os = "linux")]
pub use mapped::MappedBus;
pub use simulated::{SimulatedBus, Access, SentFrame};

use std::io;
use crate::data::{Register, RegisterData};

/**
    trait implementing 32-bit register accesses on some bus

    Accesses are synchronous: each call blocks until the bus transaction completed, and returns an error if the bus reported a failure.
*/
pub trait RegisterBus {
    /// read the word at the given byte address
    fn read(&mut self, address: u32) -> io::Result<u32>;
    /// write the given word at the given byte address
    fn write(&mut self, address: u32, value: u32) -> io::Result<()>;

    /// read a register and interpret its content
    fn get<T: RegisterData>(&mut self, register: Register<T>) -> io::Result<T>
    where Self: Sized {
        self.read(register.address).map(T::from_word)
    }
    /// write a value to a register
    fn set<T: RegisterData>(&mut self, register: Register<T>, value: T) -> io::Result<()>
    where Self: Sized {
        self.write(register.address, value.to_word())
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read(&mut self, address: u32) -> io::Result<u32>  {(**self).read(address)}
    fn write(&mut self, address: u32, value: u32) -> io::Result<()>  {(**self).write(address, value)}
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read(&mut self, address: u32) -> io::Result<u32>  {(**self).read(address)}
    fn write(&mut self, address: u32, value: u32) -> io::Result<()>  {(**self).write(address, value)}
}

use std::{
    io,
    fs::OpenOptions,
    path::Path,
    os::unix::{
        fs::OpenOptionsExt,
        io::AsRawFd,
        },
    };
use crate::data::WORD;
use super::RegisterBus;


/**
    Register bus over a memory mapped region, typically the BAR of a PCI FPGA card (`/sys/bus/pci/devices/<slot>/resource0`) or a window of `/dev/mem`

    Memory mapping is not implemented in std, so here is a thin wrapper around `mmap`.
    This implementation is unix-specific. Every register access is a volatile 32 bit access, so the bus sees exactly one transaction per call.
*/
#[derive(Debug)]
pub struct MappedBus {
    base: *mut u8,
    len: usize,
}

// the mapping is exclusively owned by this struct, only the pointer prevents the auto implementation
unsafe impl Send for MappedBus {}

impl MappedBus {
    /// map `len` bytes of the given file starting at `offset`
    pub fn open(path: impl AsRef<Path>, offset: usize, len: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)?;
        let offset = libc::off_t::try_from(offset)
            .map_err(|_|  io::Error::new(io::ErrorKind::InvalidInput, "mapping offset too big"))?;

        // the mapping stays valid after the file is closed
        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                offset,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        log::debug!("mapped {} bytes of registers at {:p}", len, base);
        Ok(Self {
            base: base as *mut u8,
            len,
        })
    }

    /// size of the mapped region in bytes
    pub fn len(&self) -> usize  {self.len}

    fn locate(&self, address: u32) -> io::Result<*mut u32> {
        let address = address as usize;
        if address % WORD != 0
            {return Err(io::Error::new(io::ErrorKind::InvalidInput, "register address is not word aligned"))}
        if address + WORD > self.len
            {return Err(io::Error::new(io::ErrorKind::InvalidInput, "register address outside of the mapped region"))}
        Ok(unsafe {self.base.add(address)} as *mut u32)
    }
}

impl Drop for MappedBus {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.len);
        }
    }
}

impl RegisterBus for MappedBus {
    fn read(&mut self, address: u32) -> io::Result<u32> {
        let register = self.locate(address)?;
        Ok(unsafe {register.read_volatile()})
    }
    fn write(&mut self, address: u32, value: u32) -> io::Result<()> {
        let register = self.locate(address)?;
        unsafe {register.write_volatile(value)};
        Ok(())
    }
}

//! Traits and impls used to read/write data to/from 32-bit registers.

use core::{
	marker::PhantomData,
	fmt,
	};

/// byte size of one register word on the bus
pub const WORD: usize = core::mem::size_of::<u32>();

/**
	trait for data types that can be packed/unpacked to/from one register word
*/
pub trait RegisterData: Sized + Copy {
    /// extract the value from a word read on the bus
    fn from_word(word: u32) -> Self;
    /// build the word to write on the bus
    fn to_word(self) -> u32;
}

/** Enum to identify and raise adapted error raised by this package
*/
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PackingError {
    BadSize(usize, &'static str),
}

pub type PackingResult<T> = Result<T, PackingError>;


/// macro implementing [RegisterData] for a given 32 bits struct generated with `bilge`
macro_rules! bilge_register {
    ($t: ty) => { impl crate::data::RegisterData for $t {
        fn from_word(word: u32) -> Self  {<$t>::from(word)}
        fn to_word(self) -> u32  {u32::from(self)}
    }};
}
pub(crate) use bilge_register;

/// macro implementing [RegisterData] for unsigned integers, narrower integers only keep the low bits of the word
macro_rules! num_register {
	($t: ty) => { impl crate::data::RegisterData for $t {
        fn from_word(word: u32) -> Self  {word as $t}
        fn to_word(self) -> u32  {self as u32}
    }};
}

num_register!(u8);
num_register!(u16);
num_register!(u32);



/**
	locate a register on the bus by its byte address, the register content must be extracted to type `T` to be processed in rust

	It acts like a getter/setter of a value on the register bus. It does not own any data, it only tells where to find it and how to interpret it.
*/
pub struct Register<T: RegisterData> {
    /// this is only here to mark that T is actually used
	extracted: PhantomData<T>,
	/// byte address of the register on the bus
	pub address: u32,
}
impl<T: RegisterData> Register<T> {
	/// build a Register from its bus address
	pub const fn new(address: u32) -> Self {
		Self{extracted: PhantomData, address}
	}
	/// reinterpret the same register with an other data type
	pub const fn cast<U: RegisterData>(self) -> Register<U> {
        Register::new(self.address)
	}
}
impl<T: RegisterData> fmt::Debug for Register<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Register{{0x{:x}}}", self.address)
	}
}
// [Clone] and [Copy] must be implemented manually to allow copying a register pointing to a type which does not implement this operation
impl<T: RegisterData> Clone for Register<T> {
    fn clone(&self) -> Self   {Self::new(self.address)}
}
impl<T: RegisterData> Copy for Register<T> {}
impl<T: RegisterData> PartialEq for Register<T> {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}
impl<T: RegisterData> Eq for Register<T> {}



/**
    pack up to one word of bytes, little endian

    the first byte goes to the lowest position, unused high bytes are left to zero. Only slices of 1 to 4 bytes can be packed.
*/
pub fn pack_word(bytes: &[u8]) -> PackingResult<u32> {
    if bytes.is_empty() || bytes.len() > WORD
        {return Err(PackingError::BadSize(bytes.len(), "a word packs 1 to 4 bytes"))}
    let mut packed = [0; WORD];
    packed[.. bytes.len()].copy_from_slice(bytes);
    Ok(u32::from_le_bytes(packed))
}

/**
    unpack the low bytes of a word, little endian, into the given slice

    the slice length tells how many bytes are extracted, it must be 1 to 4
*/
pub fn unpack_word(word: u32, dst: &mut [u8]) -> PackingResult<()> {
    if dst.is_empty() || dst.len() > WORD
        {return Err(PackingError::BadSize(dst.len(), "a word unpacks 1 to 4 bytes"))}
    let len = dst.len();
    dst.copy_from_slice(&word.to_le_bytes()[.. len]);
    Ok(())
}

/// number of register accesses needed to transfer the given amount of bytes
pub const fn word_count(bytes: usize) -> usize {
    bytes / WORD + if bytes % WORD != 0 {1} else {0}
}

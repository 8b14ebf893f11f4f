//! Register bus interface.

/// A memory-mapped register interface.
///
/// Display kernels write to and read from a small fixed address space. The
/// address is the register offset within the chip, not a full CPU address.
pub trait Bus {
    /// Read the register at `address`.
    ///
    /// Reads take `&mut self` because some registers have read side effects.
    fn read(&mut self, address: u8) -> u8;

    /// Write `value` to the register at `address`.
    fn write(&mut self, address: u8, value: u8);
}

/// General-purpose registers plus the instruction pointer.
pub const REG_COUNT: usize = 9;

/// Index of the instruction-pointer register.
pub const IP: usize = 8;

/// Integer view of a register's low bytes.
pub trait Lane: Copy + Ord + std::fmt::Debug {
    const BYTES: usize;

    /// Reads the low `BYTES` bytes, little-endian.
    fn read(bytes: &[u8; 8]) -> Self;

    /// Overwrites the low `BYTES` bytes, leaving the rest untouched.
    fn write(self, bytes: &mut [u8; 8]);
}

macro_rules! lane {
    ($($t:ty),* $(,)?) => {$(
        impl Lane for $t {
            const BYTES: usize = std::mem::size_of::<$t>();

            fn read(bytes: &[u8; 8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..Self::BYTES]);
                <$t>::from_le_bytes(buf)
            }

            fn write(self, bytes: &mut [u8; 8]) {
                bytes[..Self::BYTES].copy_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}

lane!(u8, u16, u32, u64, i8, i16, i32, i64);

/// A 64-bit register cell.
///
/// Every width and signedness is a view onto the same eight bytes. Writing a
/// narrow view changes only its own bytes; nothing is zero- or sign-extended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell([u8; 8]);

macro_rules! views {
    ($($get:ident / $set:ident: $t:ty),* $(,)?) => {$(
        pub fn $get(&self) -> $t {
            self.get()
        }

        pub fn $set(&mut self, value: $t) {
            self.set(value)
        }
    )*};
}

impl Cell {
    pub fn get<T: Lane>(&self) -> T {
        T::read(&self.0)
    }

    pub fn set<T: Lane>(&mut self, value: T) {
        value.write(&mut self.0)
    }

    pub fn bytes(&self) -> [u8; 8] {
        self.0
    }

    views! {
        u8 / set_u8: u8,
        u16 / set_u16: u16,
        u32 / set_u32: u32,
        u64 / set_u64: u64,
        i8 / set_i8: i8,
        i16 / set_i16: i16,
        i32 / set_i32: i32,
        i64 / set_i64: i64,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    cells: [Cell; REG_COUNT],
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Cell> {
        self.cells.get_mut(index)
    }

    pub fn ip(&self) -> u64 {
        self.cells[IP].u64()
    }

    pub fn set_ip(&mut self, ip: u64) {
        self.cells[IP].set_u64(ip)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: Lane>(value: T) {
        let mut cell = Cell::default();
        cell.set(value);
        assert_eq!(cell.get::<T>(), value);
    }

    #[test]
    fn test_same_width_round_trip() {
        for v in [0u8, 1, 0x7f, 0x80, u8::MAX] {
            round_trip(v);
        }
        for v in [i8::MIN, -1, 0, i8::MAX] {
            round_trip(v);
        }
        for v in [0u16, 0xbeef, u16::MAX] {
            round_trip(v);
        }
        for v in [i16::MIN, -300, i16::MAX] {
            round_trip(v);
        }
        for v in [0u32, 0xdead_beef, u32::MAX] {
            round_trip(v);
        }
        for v in [i32::MIN, -70_000, i32::MAX] {
            round_trip(v);
        }
        for v in [0u64, 0x0123_4567_89ab_cdef, u64::MAX] {
            round_trip(v);
        }
        for v in [i64::MIN, -1, i64::MAX] {
            round_trip(v);
        }
    }

    #[test]
    fn test_signedness_is_reinterpretation() {
        let mut cell = Cell::default();
        cell.set_i8(-1);
        assert_eq!(cell.u8(), 0xff);
        // no sign extension into the wider views
        assert_eq!(cell.u16(), 0x00ff);
        assert_eq!(cell.i64(), 0xff);

        cell.set_u32(0x8000_0000);
        assert_eq!(cell.i32(), i32::MIN);
    }

    #[test]
    fn test_narrow_write_keeps_upper_bytes() {
        let mut cell = Cell::default();
        cell.set_u64(0x1122_3344_5566_7788);
        cell.set_u8(0xff);
        assert_eq!(cell.u64(), 0x1122_3344_5566_77ff);
        cell.set_u16(0);
        assert_eq!(cell.u64(), 0x1122_3344_5566_0000);
        assert_eq!(cell.u32(), 0x5566_0000);
        assert_eq!(cell.i16(), 0);
        assert_eq!(
            cell.bytes(),
            [0x00, 0x00, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]
        );
    }

    #[test]
    fn test_register_file() {
        let mut regs = Registers::new();
        assert_eq!(regs.cells().len(), REG_COUNT);
        assert!(regs.get(REG_COUNT).is_none());

        regs.set_ip(42);
        assert_eq!(regs.ip(), 42);
        assert_eq!(regs.get(IP).map(|c| c.u8()), Some(42));

        if let Some(r3) = regs.get_mut(3) {
            r3.set_i32(-5);
        }
        assert_eq!(regs.get(3).map(|c| c.i32()), Some(-5));
        assert_eq!(regs.get(2).map(|c| c.u64()), Some(0));
    }
}

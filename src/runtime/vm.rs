use std::cmp::Ordering;

use tracing::{debug, instrument, trace};

use crate::bytecode::op::Opcode;
use crate::runtime::registers::{Lane, REG_COUNT, Registers};
use crate::runtime::runtime_error::RuntimeError;

/// Machine state. `Halt` and `Err` end the drive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Halt,
    Err,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
}

/// Wrapping arithmetic at one width. Division by zero yields `None`.
trait Word: Lane {
    fn apply(self, op: Arith, rhs: Self) -> Option<Self>;
}

macro_rules! word {
    ($($t:ty),*) => {$(
        impl Word for $t {
            fn apply(self, op: Arith, rhs: Self) -> Option<Self> {
                match op {
                    Arith::Add => Some(self.wrapping_add(rhs)),
                    Arith::Sub => Some(self.wrapping_sub(rhs)),
                    Arith::Mul => Some(self.wrapping_mul(rhs)),
                    Arith::Div if rhs == 0 => None,
                    Arith::Div => Some(self.wrapping_div(rhs)),
                }
            }
        }
    )*};
}

word!(u8, u16, u32, u64, i8, i16, i32, i64);

#[derive(Debug, Clone, Default)]
pub struct VmConfig {
    /// Steps `run` may execute before giving up; `None` runs until halt.
    pub max_steps: Option<u64>,
}

pub struct Vm {
    regs: Registers,
    flag: Ordering,
    state: State,
    config: VmConfig,
    /// Address of the instruction most recently started.
    last_ip: u64,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            regs: Registers::new(),
            flag: Ordering::Equal,
            state: State::Running,
            config,
            last_ip: 0,
        }
    }

    /// Clears registers, sets the flag to equal and the state to running.
    pub fn reset(&mut self) {
        self.regs = Registers::new();
        self.flag = Ordering::Equal;
        self.state = State::Running;
        self.last_ip = 0;
    }

    pub fn set_ip(&mut self, ip: u64) {
        self.regs.set_ip(ip);
    }

    pub fn ip(&self) -> u64 {
        self.regs.ip()
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn flag(&self) -> Ordering {
        self.flag
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Drives `step` until the machine halts or faults.
    ///
    /// Returns the number of instructions executed, including the final
    /// `HALT`.
    #[instrument(skip_all, fields(len = code.len(), ip = self.regs.ip()))]
    pub fn run(&mut self, code: &[u8]) -> Result<u64, RuntimeError> {
        let mut steps: u64 = 0;

        while self.state == State::Running {
            if let Some(limit) = self.config.max_steps.filter(|&max| steps >= max) {
                return Err(RuntimeError::StepLimit { limit });
            }

            trace!(
                ip = self.regs.ip(),
                op = usize::try_from(self.regs.ip())
                    .ok()
                    .and_then(|ip| code.get(ip))
                    .and_then(|&b| Opcode::from_byte(b))
                    .map_or("?", Opcode::name),
                "step"
            );
            self.step(code);
            steps += 1;
        }

        match self.state {
            State::Err => Err(RuntimeError::Fault {
                ip: self.last_ip,
                byte: usize::try_from(self.last_ip)
                    .ok()
                    .and_then(|ip| code.get(ip))
                    .copied(),
            }),
            _ => {
                debug!(steps, "halted");
                Ok(steps)
            }
        }
    }

    /// Decodes and executes the single instruction at `ip`.
    ///
    /// Each operand read advances `ip` before the instruction takes effect,
    /// so jump offsets are relative to the following instruction. Decode
    /// failures and division by zero put the machine in `State::Err`.
    /// Stepping a machine that is no longer running does nothing.
    pub fn step(&mut self, code: &[u8]) {
        if self.state != State::Running {
            return;
        }
        self.last_ip = self.regs.ip();
        if self.exec(code).is_none() {
            self.state = State::Err;
        }
    }

    fn exec(&mut self, code: &[u8]) -> Option<()> {
        use Opcode::*;

        let op = Opcode::from_byte(self.fetch::<u8>(code)?)?;
        match op {
            Igl => None,

            Load8 => self.load::<u8>(code),
            Load16 => self.load::<u16>(code),
            Load32 => self.load::<u32>(code),
            Load64 => self.load::<u64>(code),

            Add8 => self.arith::<u8>(code, Arith::Add),
            Add16 => self.arith::<u16>(code, Arith::Add),
            Add32 => self.arith::<u32>(code, Arith::Add),
            Add64 => self.arith::<u64>(code, Arith::Add),
            Sub8 => self.arith::<u8>(code, Arith::Sub),
            Sub16 => self.arith::<u16>(code, Arith::Sub),
            Sub32 => self.arith::<u32>(code, Arith::Sub),
            Sub64 => self.arith::<u64>(code, Arith::Sub),
            Mul8 => self.arith::<u8>(code, Arith::Mul),
            Mul16 => self.arith::<u16>(code, Arith::Mul),
            Mul32 => self.arith::<u32>(code, Arith::Mul),
            Mul64 => self.arith::<u64>(code, Arith::Mul),
            Div8 => self.arith::<u8>(code, Arith::Div),
            Div16 => self.arith::<u16>(code, Arith::Div),
            Div32 => self.arith::<u32>(code, Arith::Div),
            Div64 => self.arith::<u64>(code, Arith::Div),

            Imul8 => self.arith::<i8>(code, Arith::Mul),
            Imul16 => self.arith::<i16>(code, Arith::Mul),
            Imul32 => self.arith::<i32>(code, Arith::Mul),
            Imul64 => self.arith::<i64>(code, Arith::Mul),
            Idiv8 => self.arith::<i8>(code, Arith::Div),
            Idiv16 => self.arith::<i16>(code, Arith::Div),
            Idiv32 => self.arith::<i32>(code, Arith::Div),
            Idiv64 => self.arith::<i64>(code, Arith::Div),

            Cmp8 => self.compare::<u8>(code),
            Cmp16 => self.compare::<u16>(code),
            Cmp32 => self.compare::<u32>(code),
            Cmp64 => self.compare::<u64>(code),
            Icmp8 => self.compare::<i8>(code),
            Icmp16 => self.compare::<i16>(code),
            Icmp32 => self.compare::<i32>(code),
            Icmp64 => self.compare::<i64>(code),

            Jmp => self.jump(code, |_| true),
            Je => self.jump(code, Ordering::is_eq),
            Jne => self.jump(code, Ordering::is_ne),
            Jl => self.jump(code, Ordering::is_lt),
            Jle => self.jump(code, Ordering::is_le),
            Jg => self.jump(code, Ordering::is_gt),
            Jge => self.jump(code, Ordering::is_ge),

            Halt => {
                self.state = State::Halt;
                Some(())
            }
        }
    }

    /// Reads a `T` at `ip` and advances past it.
    fn fetch<T: Lane>(&mut self, code: &[u8]) -> Option<T> {
        let ip = usize::try_from(self.regs.ip()).ok()?;
        let end = ip.checked_add(T::BYTES)?;
        let field = code.get(ip..end)?;

        let mut bytes = [0u8; 8];
        bytes[..T::BYTES].copy_from_slice(field);
        self.regs.set_ip(end as u64);
        Some(T::read(&bytes))
    }

    fn reg(&mut self, code: &[u8]) -> Option<usize> {
        let index = self.fetch::<u8>(code)? as usize;
        (index < REG_COUNT).then_some(index)
    }

    fn value<T: Lane>(&self, index: usize) -> Option<T> {
        self.regs.get(index).map(|cell| cell.get::<T>())
    }

    fn load<T: Lane>(&mut self, code: &[u8]) -> Option<()> {
        let dst = self.reg(code)?;
        let imm = self.fetch::<T>(code)?;
        self.regs.get_mut(dst)?.set(imm);
        Some(())
    }

    fn arith<T: Word>(&mut self, code: &[u8], op: Arith) -> Option<()> {
        let dst = self.reg(code)?;
        let src = self.reg(code)?;
        let lhs = self.value::<T>(dst)?;
        let rhs = self.value::<T>(src)?;
        let result = lhs.apply(op, rhs)?;
        self.regs.get_mut(dst)?.set(result);
        Some(())
    }

    fn compare<T: Lane>(&mut self, code: &[u8]) -> Option<()> {
        let a = self.reg(code)?;
        let b = self.reg(code)?;
        self.flag = self.value::<T>(a)?.cmp(&self.value::<T>(b)?);
        Some(())
    }

    /// The offset is always consumed; it is applied only when `taken` accepts
    /// the current flag.
    fn jump(&mut self, code: &[u8], taken: fn(Ordering) -> bool) -> Option<()> {
        let offset = self.fetch::<i64>(code)?;
        if taken(self.flag) {
            let ip = self.regs.ip().wrapping_add_signed(offset);
            self.regs.set_ip(ip);
        }
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::registers::IP;

    /// Hand assembler for test programs.
    #[derive(Default)]
    struct Asm(Vec<u8>);

    impl Asm {
        fn op(mut self, op: Opcode) -> Self {
            self.0.push(op.byte());
            self
        }

        fn regs(mut self, regs: &[u8]) -> Self {
            self.0.extend_from_slice(regs);
            self
        }

        fn imm(mut self, bytes: &[u8]) -> Self {
            self.0.extend_from_slice(bytes);
            self
        }

        fn rel(self, offset: i64) -> Self {
            self.imm(&offset.to_le_bytes())
        }

        fn load32(self, reg: u8, value: i32) -> Self {
            self.op(Opcode::Load32).regs(&[reg]).imm(&value.to_le_bytes())
        }

        fn code(self) -> Vec<u8> {
            self.0
        }
    }

    fn reg(vm: &Vm, index: usize) -> u64 {
        vm.registers().get(index).map(|c| c.u64()).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let vm = Vm::new();
        assert_eq!(vm.state(), State::Running);
        assert_eq!(vm.flag(), Ordering::Equal);
        assert_eq!(vm.ip(), 0);
        assert!(vm.registers().cells().iter().all(|c| c.u64() == 0));
    }

    #[test]
    fn test_step_executes_one_instruction() {
        let code = Asm::default()
            .load32(0, 7)
            .load32(1, 9)
            .op(Opcode::Halt)
            .code();
        let mut vm = Vm::new();

        vm.step(&code);
        assert_eq!(vm.ip(), 6);
        assert_eq!(reg(&vm, 0), 7);
        assert_eq!(reg(&vm, 1), 0);

        vm.step(&code);
        vm.step(&code);
        assert_eq!(vm.state(), State::Halt);
        assert_eq!(vm.ip(), 13);

        // terminal states are sticky
        vm.step(&code);
        assert_eq!(vm.ip(), 13);
    }

    #[test]
    fn test_load_writes_only_its_width() {
        let code = Asm::default()
            .op(Opcode::Load64)
            .regs(&[2])
            .imm(&0x1122_3344_5566_7788u64.to_le_bytes())
            .op(Opcode::Load8)
            .regs(&[2])
            .imm(&[0xff])
            .op(Opcode::Halt)
            .code();
        let mut vm = Vm::new();
        assert_eq!(vm.run(&code), Ok(3));
        assert_eq!(reg(&vm, 2), 0x1122_3344_5566_77ff);
    }

    #[test]
    fn test_equal_compare_takes_je() {
        // r0 = 5, r1 = 5, ICMP32, JE over the load of 99
        let code = Asm::default()
            .load32(0, 5)
            .load32(1, 5)
            .op(Opcode::Icmp32)
            .regs(&[0, 1])
            .op(Opcode::Je)
            .rel(6)
            .load32(0, 99)
            .op(Opcode::Halt)
            .code();
        let mut vm = Vm::new();
        vm.run(&code).unwrap();
        assert_eq!(vm.flag(), Ordering::Equal);
        assert_eq!(vm.registers().get(0).map(|c| c.i32()), Some(5));
        assert_eq!(vm.state(), State::Halt);
    }

    #[test]
    fn test_untaken_jump_consumes_offset() {
        let code = Asm::default()
            .op(Opcode::Jne)
            .rel(100)
            .op(Opcode::Halt)
            .code();
        let mut vm = Vm::new();
        vm.step(&code);
        assert_eq!(vm.ip(), 9);
        vm.step(&code);
        assert_eq!(vm.state(), State::Halt);
    }

    #[test]
    fn test_conditional_jumps_against_each_flag() {
        // (lhs, rhs) giving LESS, EQUAL, GREATER under ICMP8
        let operands = [(1u8, 2u8), (2, 2), (3, 2)];
        let table = [
            (Opcode::Je, [false, true, false]),
            (Opcode::Jne, [true, false, true]),
            (Opcode::Jl, [true, false, false]),
            (Opcode::Jle, [true, true, false]),
            (Opcode::Jg, [false, false, true]),
            (Opcode::Jge, [false, true, true]),
        ];

        for (jump, expected) in table {
            for ((lhs, rhs), taken) in operands.into_iter().zip(expected) {
                // the jump at 9 skips the HALT at 18 when taken
                let code = Asm::default()
                    .op(Opcode::Load8)
                    .regs(&[0])
                    .imm(&[lhs])
                    .op(Opcode::Load8)
                    .regs(&[1])
                    .imm(&[rhs])
                    .op(Opcode::Icmp8)
                    .regs(&[0, 1])
                    .op(jump)
                    .rel(1)
                    .op(Opcode::Halt)
                    .op(Opcode::Halt)
                    .code();

                let mut vm = Vm::new();
                assert_eq!(vm.run(&code), Ok(5));
                assert_eq!(vm.flag(), lhs.cmp(&rhs));
                let end = if taken { 20 } else { 19 };
                assert_eq!(vm.ip(), end, "{:?} with {} vs {}", jump, lhs, rhs);
            }
        }
    }

    #[test]
    fn test_signed_and_unsigned_compare() {
        let code = Asm::default()
            .op(Opcode::Load8)
            .regs(&[0])
            .imm(&[0xff])
            .op(Opcode::Load8)
            .regs(&[1])
            .imm(&[0x01])
            .op(Opcode::Cmp8)
            .regs(&[0, 1])
            .code();
        let mut vm = Vm::new();
        for _ in 0..3 {
            vm.step(&code);
        }
        assert_eq!(vm.flag(), Ordering::Greater);

        let mut code = code;
        code[6] = Opcode::Icmp8.byte();
        vm.reset();
        for _ in 0..3 {
            vm.step(&code);
        }
        assert_eq!(vm.flag(), Ordering::Less);
        assert_eq!(vm.state(), State::Running);
    }

    #[test]
    fn test_arithmetic_wraps() {
        let code = Asm::default()
            .op(Opcode::Load8)
            .regs(&[0])
            .imm(&[200])
            .op(Opcode::Load8)
            .regs(&[1])
            .imm(&[100])
            .op(Opcode::Add8)
            .regs(&[0, 1])
            .op(Opcode::Load16)
            .regs(&[2])
            .imm(&i16::MIN.to_le_bytes())
            .op(Opcode::Load16)
            .regs(&[3])
            .imm(&(-1i16).to_le_bytes())
            .op(Opcode::Idiv16)
            .regs(&[2, 3])
            .op(Opcode::Imul16)
            .regs(&[3, 3])
            .op(Opcode::Halt)
            .code();
        let mut vm = Vm::new();
        vm.run(&code).unwrap();
        let regs = vm.registers();
        assert_eq!(regs.get(0).map(|c| c.u8()), Some(44));
        assert_eq!(regs.get(2).map(|c| c.i16()), Some(i16::MIN));
        assert_eq!(regs.get(3).map(|c| c.i16()), Some(1));
    }

    #[test]
    fn test_division_by_zero_faults() {
        let code = Asm::default()
            .load32(0, 10)
            .op(Opcode::Div32)
            .regs(&[0, 1])
            .op(Opcode::Halt)
            .code();
        let mut vm = Vm::new();
        let err = vm.run(&code).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::Fault {
                ip: 6,
                byte: Some(Opcode::Div32.byte())
            }
        );
        assert_eq!(vm.state(), State::Err);
        assert_eq!(reg(&vm, 0), 10);
    }

    #[test]
    fn test_illegal_opcodes() {
        for byte in [Opcode::Igl.byte(), Opcode::ALL.len() as u8, 0xff] {
            let mut vm = Vm::new();
            vm.step(&[byte]);
            assert_eq!(vm.state(), State::Err, "byte {:#04x}", byte);
        }

        let mut vm = Vm::new();
        let err = vm.run(&[Opcode::Halt.byte() + 1]).unwrap_err();
        assert!(err.to_string().contains("illegal opcode"));
    }

    #[test]
    fn test_truncated_code_faults() {
        let code = Asm::default().op(Opcode::Load32).regs(&[0]).imm(&[1, 2]).code();
        let mut vm = Vm::new();
        assert!(vm.run(&code).is_err());

        // falling off the end without HALT
        let mut vm = Vm::new();
        let err = vm.run(&Asm::default().load32(0, 1).code()).unwrap_err();
        assert_eq!(err, RuntimeError::Fault { ip: 6, byte: None });
    }

    #[test]
    fn test_bad_register_index_faults() {
        let code = Asm::default().op(Opcode::Add8).regs(&[0, REG_COUNT as u8]).code();
        let mut vm = Vm::new();
        vm.step(&code);
        assert_eq!(vm.state(), State::Err);
    }

    #[test]
    fn test_ip_is_a_register() {
        // LOAD64 ip 20 jumps over the halt at 10 to the halt at 20
        let mut code = Asm::default()
            .op(Opcode::Load64)
            .regs(&[IP as u8])
            .imm(&20u64.to_le_bytes())
            .op(Opcode::Igl)
            .code();
        code.resize(20, Opcode::Igl.byte());
        code.push(Opcode::Halt.byte());

        let mut vm = Vm::new();
        assert_eq!(vm.run(&code), Ok(2));
        assert_eq!(vm.ip(), 21);
    }

    #[test]
    fn test_step_limit() {
        let code = Asm::default().op(Opcode::Jmp).rel(-9).code();
        let mut vm = Vm::with_config(VmConfig {
            max_steps: Some(50),
        });
        assert_eq!(vm.run(&code), Err(RuntimeError::StepLimit { limit: 50 }));
        assert_eq!(vm.state(), State::Running);
        assert_eq!(vm.ip(), 0);
    }

    #[test]
    fn test_entry_point_and_reset() {
        let code = Asm::default()
            .load32(0, 1)
            .op(Opcode::Halt)
            .load32(0, 2)
            .op(Opcode::Halt)
            .code();
        let mut vm = Vm::new();
        vm.set_ip(7);
        assert_eq!(vm.run(&code), Ok(2));
        assert_eq!(reg(&vm, 0), 2);

        vm.reset();
        assert_eq!(vm.state(), State::Running);
        assert_eq!(reg(&vm, 0), 0);
        assert_eq!(vm.run(&code), Ok(2));
        assert_eq!(reg(&vm, 0), 1);
    }
}

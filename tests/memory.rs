use cachesim_rs::{Access, CacheStats, Instruction, MainMemory, Machine, MemError, SimConfig, Trap, Word};
use pretty_assertions::assert_eq;

fn machine(src: &str) -> Machine {
    let mut m = Machine::new(&SimConfig::default()).unwrap();
    m.load_program(src).unwrap();
    m
}

#[test]
fn load_program_places_lines_from_zero() {
    let mut mem = MainMemory::new(8);
    let n = mem.load_program("movi r1,1\n  add r2,r1,r1  \nret\n\n").unwrap();
    assert_eq!(n, 3);
    assert_eq!(mem.read(0).unwrap(), &Word::Instr("movi r1,1".into()));
    assert_eq!(mem.read(1).unwrap(), &Word::Instr("add r2,r1,r1".into()));
    assert_eq!(mem.read(2).unwrap(), &Word::Instr("ret".into()));
    assert_eq!(mem.read(3).unwrap(), &Word::Data(0));
    assert_eq!(mem.occupied().count(), 3);
}

#[test]
fn program_too_large() {
    let mut mem = MainMemory::new(2);
    assert_eq!(
        mem.load_program("ret\nret\nret"),
        Err(MemError::ProgramTooLarge { size: 3, words: 2 })
    );
}

#[test]
fn sw_then_lw_without_residency() {
    let mut m = machine("movi r1,42\nmovi r2,20\nsw r1,0(r2)\nlw r3,0(r2)");
    m.step().unwrap();
    m.step().unwrap();
    let sw = m.step().unwrap().unwrap();
    assert_eq!(sw.data, None);
    assert!(m.dcache().sets().iter().flatten().all(|l| l.tag.is_none()));
    assert_eq!(m.memory().read(20).unwrap(), &Word::Data(42));

    let lw = m.step().unwrap().unwrap();
    assert_eq!(lw.data, Some(Access::Miss));
    assert_eq!(m.regs().gpr[3], 42);
}

#[test]
fn sw_to_resident_block_then_lw_hits() {
    let src = "movi r2,20\nlw r3,0(r2)\nmovi r1,7\nsw r1,1(r2)\nlw r4,1(r2)";
    let mut m = machine(src);
    let mut reports = Vec::new();
    while let Some(r) = m.step().unwrap() {
        reports.push(r);
    }
    assert_eq!(reports[1].data, Some(Access::Miss));
    assert_eq!(reports[4].data, Some(Access::Hit));
    assert_eq!(m.regs().gpr[4], 7);
    assert_eq!(m.memory().read(21).unwrap(), &Word::Data(7));

    // block 10 lives in set 0; the store did not count as an access
    let line = &m.dcache().sets()[0][0];
    assert_eq!(line.tag, Some(10));
    assert_eq!(line.data, vec![Word::Data(0), Word::Data(7)]);
    assert_eq!(line.accesses, 2);
}

#[test]
fn lw_reads_instruction_cells_as_error() {
    let mut m = machine("lw r1,0(r0)");
    let fault = m.run(None).unwrap_err();
    assert_eq!(fault.trap, Trap::NotData { addr: 0 });
    assert_eq!(m.regs().gpr[1], 0);
    assert_eq!(m.dcache().stats(), CacheStats::default());
    assert!(m.dcache().sets().iter().flatten().all(|l| l.tag.is_none() && l.accesses == 0));
}

#[test]
fn blank_interior_line_occupies_a_word_and_does_nothing() {
    let mut m = machine("movi r1,1\n\naddi r1,r1,1");
    assert_eq!(m.end(), 3);
    assert_eq!(m.memory().read(1).unwrap(), &Word::Instr(String::new()));
    m.run(None).unwrap();
    assert_eq!(m.regs().gpr[1], 2);
    assert_eq!(m.regs().pc, 3);
    assert_eq!(m.cycles(), 3);
}

#[test]
fn effective_address_out_of_range() {
    let mut m = machine("movi r2,5\nlw r1,-6(r2)");
    let fault = m.run(None).unwrap_err();
    assert_eq!(fault.pc, 1);
    assert_eq!(
        fault.trap,
        Trap::Mem(MemError::AddressOutOfRange { addr: -1, words: 32 })
    );

    let mut m = machine("movi r1,9\nsw r1,32(r0)");
    let fault = m.run(None).unwrap_err();
    assert_eq!(
        fault.trap,
        Trap::Mem(MemError::AddressOutOfRange { addr: 32, words: 32 })
    );
}

#[test]
fn fetching_data_is_an_error() {
    // The store overwrites instruction 5 before its block is fetched.
    let src = "movi r1,5\nmovi r9,5\nsw r1,0(r9)\nmovi r3,3\nmovi r4,4\nmovi r5,5";
    let mut m = machine(src);
    let fault = m.run(None).unwrap_err();
    assert_eq!(fault.pc, 5);
    assert_eq!(fault.trap, Trap::NotAnInstruction { addr: 5 });
    assert_eq!(m.regs().gpr[4], 4);
    assert_eq!(m.regs().gpr[5], 0);
}

#[test]
fn executor_runs_directly_on_main_memory() {
    use cachesim_rs::exec::{Executor, Flow, IntExecutor};
    use cachesim_rs::{Bus, Cpu};

    let mut mem = MainMemory::new(16);
    let mut cpu = Cpu::new(mem.words());
    let exec = IntExecutor;
    cpu.regs.gpr[1] = 99;
    let sw = Instruction::parse("sw r1,3(r0)").unwrap();
    assert_eq!(exec.exec(&mut cpu, &mut mem, sw).unwrap(), Flow::Next);
    let lw = Instruction::parse("lw r2,3(r0)").unwrap();
    exec.exec(&mut cpu, &mut mem, lw).unwrap();
    assert_eq!(cpu.regs.gpr[2], 99);
    assert_eq!(mem.peek(3).unwrap(), Word::Data(99));
}

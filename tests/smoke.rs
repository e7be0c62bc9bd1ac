use cachesim_rs::{Access, Instruction, Machine, RunOutcome, SimConfig, Trap};
use pretty_assertions::assert_eq;

fn machine(cfg: SimConfig, src: &str) -> Machine {
    let mut m = Machine::new(&cfg).unwrap();
    m.load_program(src).unwrap();
    m
}

#[test]
fn three_instruction_program() {
    let cfg = SimConfig { memory_bytes: 256, line_bytes: 16, lines_per_set: 2, sets: 2 };
    let mut m = machine(cfg, "movi r1,5\nmovi r2,3\nadd r3,r1,r2");
    assert_eq!(m.end(), 3);

    let mut fetches = Vec::new();
    for _ in 0..3 {
        fetches.push(m.step().unwrap().unwrap().fetch);
    }
    assert_eq!(fetches, vec![Access::Miss, Access::Hit, Access::Miss]);
    assert_eq!(m.regs().gpr[3], 8);
    assert_eq!(m.regs().pc, 3);
    assert!(!m.regs().overflow());
    assert_eq!(m.step().unwrap(), None);

    let ic = m.icache().sets();
    assert_eq!((ic[0][0].tag, ic[0][0].accesses), (Some(0), 2));
    assert_eq!((ic[1][0].tag, ic[1][0].accesses), (Some(1), 1));
    assert_eq!(m.dcache().stats().misses, 0);
}

#[test]
fn cycle_report_carries_decoded_form() {
    let mut m = machine(SimConfig::default(), "addi r1,r0,2");
    let r = m.step().unwrap().unwrap();
    assert_eq!(r.pc, 0);
    assert_eq!(r.next_pc, 1);
    assert_eq!(r.text, "addi r1,r0,2");
    assert_eq!(r.insn, Instruction::parse("addi r1,r0,2").unwrap());
}

#[test]
fn division_by_zero_halts_without_side_effects() {
    let mut m = machine(SimConfig::default(), "movi r1,5\nmovi r2,10\ndiv r1,r2,r3\nmovi r4,1");
    m.step().unwrap();
    m.step().unwrap();
    let regs = m.regs().clone();
    let dcache = m.dcache().sets().to_vec();
    let memory: Vec<_> = m.memory().occupied().map(|(a, w)| (a, w.clone())).collect();

    let fault = m.run(None).unwrap_err();
    assert_eq!(fault.trap, Trap::DivisionByZero);
    assert_eq!(fault.pc, 2);
    assert_eq!(fault.text, "div r1,r2,r3");
    assert_eq!(fault.decoded, Some(Instruction::parse("div r1,r2,r3").unwrap()));
    assert_eq!(m.regs(), &regs);
    assert_eq!(m.dcache().sets().to_vec(), dcache);
    let after: Vec<_> = m.memory().occupied().map(|(a, w)| (a, w.clone())).collect();
    assert_eq!(after, memory);
}

#[test]
fn decode_errors_name_the_instruction() {
    let mut m = machine(SimConfig::default(), "movi r1,1\nadd r40,r1,r1");
    let fault = m.run(None).unwrap_err();
    assert_eq!(fault.pc, 1);
    assert_eq!(fault.decoded, None);
    let msg = fault.to_string();
    assert!(msg.contains("add r40,r1,r1"), "{msg}");
    assert!(msg.contains("r40"), "{msg}");
}

#[test]
fn larger_program_with_evictions() {
    // 1 line per set, 2 sets: every other block conflicts.
    let cfg = SimConfig { memory_bytes: 512, line_bytes: 16, lines_per_set: 1, sets: 2 };
    let src = "movi r1,0\nmovi r2,4\naddi r1,r1,1\nblt r1,r2,2\nmovi r3,1\nmovi r4,2";
    let mut m = machine(cfg, src);
    assert_eq!(m.run(None).unwrap(), RunOutcome::Halted { cycles: 12 });
    assert_eq!(m.regs().gpr[1], 4);
    assert_eq!(m.regs().gpr[4], 2);
    let s = m.icache().stats();
    assert_eq!(s.hits + s.misses, 12);
    assert!(s.evictions > 0);
}

#[test]
fn snapshot_serializes() {
    let mut m = machine(SimConfig::default(), "movi r3,8\nsw r3,20(r0)");
    m.run(None).unwrap();
    let v = serde_json::to_value(m.snapshot()).unwrap();
    assert_eq!(v["cycle"], 2);
    assert_eq!(v["fetch"], "Hit");
    assert_eq!(v["registers"]["gpr"][3], 8);
    assert_eq!(v["registers"]["rsp"], 32);
    let mem = v["memory"].as_array().unwrap();
    assert_eq!(mem.len(), 3);
    assert_eq!(mem[2][0], 20);
    assert_eq!(mem[2][1]["Data"], 8);
}

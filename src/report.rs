use std::fmt::Write as _;
use std::io::{self, Write};
use std::mem;

use crate::memory::{Frame, Pte};
use crate::process::Process;

/// `PT[pid]:` line with one token per virtual page. Present pages show
/// their R/M/S bits; absent pages show `#` when swapped out and `*`
/// otherwise.
pub fn page_table_line(pid: usize, proc: &Process) -> String {
    let mut line = format!("PT[{pid}]:");
    for (vpage, pte) in proc.page_table.iter().enumerate() {
        line.push(' ');
        if pte.present() {
            let _ = write!(
                line,
                "{vpage}:{}{}{}",
                if pte.referenced() { 'R' } else { '-' },
                if pte.modified() { 'M' } else { '-' },
                if pte.paged_out() { 'S' } else { '-' },
            );
        } else if pte.paged_out() {
            line.push('#');
        } else {
            line.push('*');
        }
    }
    line
}

/// `FT:` line with `pid:vpage` per mapped frame and `*` per free frame.
pub fn frame_table_line(frames: &[Frame]) -> String {
    let mut line = String::from("FT:");
    for frame in frames {
        match frame.mapping {
            Some(mapping) => {
                let _ = write!(line, " {}:{}", mapping.pid, mapping.vpage);
            }
            None => line.push_str(" *"),
        }
    }
    line
}

/// `PROC[pid]:` per-process counter summary.
pub fn proc_stats_line(pid: usize, proc: &Process) -> String {
    let s = &proc.stats;
    format!(
        "PROC[{}]: U={} M={} I={} O={} FI={} FO={} Z={} SV={} SP={}",
        pid, s.unmaps, s.maps, s.ins, s.outs, s.fins, s.fouts, s.zeros, s.segv, s.segprot
    )
}

/// `TOTALCOST` summary. The final field is the packed PTE size in bytes, for
/// cross-implementation parity checks.
pub fn totals_line(ins_counter: u64, ctx_switches: u64, process_exits: u64, cost: u64) -> String {
    format!(
        "TOTALCOST {} {} {} {} {}",
        ins_counter,
        ctx_switches,
        process_exits,
        cost,
        mem::size_of::<Pte>()
    )
}

pub fn emit_page_table<W: Write>(out: &mut W, pid: usize, proc: &Process) -> io::Result<()> {
    writeln!(out, "{}", page_table_line(pid, proc))
}

pub fn emit_frame_table<W: Write>(out: &mut W, frames: &[Frame]) -> io::Result<()> {
    writeln!(out, "{}", frame_table_line(frames))
}

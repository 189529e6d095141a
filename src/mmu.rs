use std::fmt;
use std::io::{self, Write};

use crate::cli::OutputOptions;
use crate::constants::*;
use crate::io::{Instruction, Op};
use crate::memory::{FrameTable, Mapping, PteFlags};
use crate::pager::Pager;
use crate::process::Process;
use crate::report;
use crate::rng::RandomSource;

/// The simulation: frame table, processes, the active pager, and all global
/// counters, driven over an instruction stream. Trace and report lines go to
/// `out`, so a run against a buffer is reproducible to the byte.
pub struct Mmu<W: Write> {
    frames: FrameTable,
    procs: Vec<Process>,
    pager: Pager,
    rng: RandomSource,
    opts: OutputOptions,
    curr: usize,
    ins_counter: u64,
    ctx_switches: u64,
    process_exits: u64,
    cost: u64,
    out: W,
}

impl<W: Write> Mmu<W> {
    pub fn new(
        num_frames: usize,
        procs: Vec<Process>,
        pager: Pager,
        rng: RandomSource,
        opts: OutputOptions,
        out: W,
    ) -> Self {
        Mmu {
            frames: FrameTable::new(num_frames),
            procs,
            pager,
            rng,
            opts,
            curr: 0,
            ins_counter: 0,
            ctx_switches: 0,
            process_exits: 0,
            cost: 0,
            out,
        }
    }

    /// Run the instruction stream to completion.
    pub fn run(&mut self, instructions: &[Instruction]) -> io::Result<()> {
        for ins in instructions {
            let ins_counter = self.ins_counter;
            self.trace(format_args!(
                "{}: ==> {} {}\n",
                ins_counter,
                ins.op.code(),
                ins.arg
            ))?;
            self.ins_counter += 1;
            match ins.op {
                Op::ContextSwitch => self.context_switch(ins.arg),
                Op::Read | Op::Write => self.reference(ins.op, ins.arg)?,
                Op::Exit => self.exit_process(ins.arg)?,
            }
            self.debug_dumps()?;
        }
        Ok(())
    }

    /// Trace and event lines are emitted only under the verbose option.
    fn trace(&mut self, args: fmt::Arguments) -> io::Result<()> {
        if self.opts.verbose {
            self.out.write_fmt(args)?;
        }
        Ok(())
    }

    fn context_switch(&mut self, target: usize) {
        self.curr = target;
        self.ctx_switches += 1;
        self.cost += CTX_SWITCH_TIME;
    }

    /// A load or store against a virtual page of the current process.
    fn reference(&mut self, op: Op, vpage: usize) -> io::Result<()> {
        self.cost += LD_ST_TIME;
        let pid = self.curr;

        if !self.procs[pid].page_table[vpage].present() && !self.fault_in(pid, vpage)? {
            // segmentation violation: R/M stay untouched
            return Ok(());
        }

        self.procs[pid].page_table[vpage].set(PteFlags::REFERENCED, true);
        if op == Op::Write {
            if self.procs[pid].page_table[vpage].write_protected() {
                self.trace(format_args!(" SEGPROT\n"))?;
                self.cost += SEGPROT_TIME;
                self.procs[pid].stats.segprot += 1;
            } else {
                self.procs[pid].page_table[vpage].set(PteFlags::MODIFIED, true);
            }
        }
        Ok(())
    }

    /// Page-fault path: VMA check, frame acquisition, fill, map.
    /// Returns false when the reference is a segmentation violation.
    fn fault_in(&mut self, pid: usize, vpage: usize) -> io::Result<bool> {
        // VMA lookup happens once per page; the outcome is cached on the PTE
        if !self.procs[pid].page_table[vpage].in_vma() {
            match self.procs[pid].find_vma(vpage).copied() {
                Some(vma) => {
                    let pte = &mut self.procs[pid].page_table[vpage];
                    pte.set(PteFlags::IN_VMA, true);
                    pte.set(PteFlags::WRITE_PROTECTED, vma.write_protected);
                    pte.set(PteFlags::FILE_MAPPED, vma.file_mapped);
                }
                None => {
                    self.trace(format_args!(" SEGV\n"))?;
                    self.cost += SEGV_TIME;
                    self.procs[pid].stats.segv += 1;
                    return Ok(false);
                }
            }
        }

        let frame = self.allocate_frame()?;
        if let Some(mapping) = self.frames[frame].mapping {
            self.unmap_victim(mapping)?;
        }

        let pte = self.procs[pid].page_table[vpage];
        if pte.file_mapped() {
            self.trace(format_args!(" FIN\n"))?;
            self.cost += FIN_TIME;
            self.procs[pid].stats.fins += 1;
        } else if pte.paged_out() {
            self.trace(format_args!(" IN\n"))?;
            self.cost += IN_TIME;
            self.procs[pid].stats.ins += 1;
        } else {
            self.trace(format_args!(" ZERO\n"))?;
            self.cost += ZERO_TIME;
            self.procs[pid].stats.zeros += 1;
        }

        self.frames[frame].mapping = Some(Mapping { pid, vpage });
        let pte = &mut self.procs[pid].page_table[vpage];
        pte.set(PteFlags::PRESENT, true);
        pte.set_frame(frame);
        self.trace(format_args!(" MAP {frame}\n"))?;
        self.cost += MAP_TIME;
        self.procs[pid].stats.maps += 1;
        self.pager
            .reset_age(self.frames.frames_mut(), frame, self.ins_counter);
        Ok(true)
    }

    /// Next frame to map into: the free-list head, or a policy victim.
    fn allocate_frame(&mut self) -> io::Result<usize> {
        if let Some(frame) = self.frames.pop_free() {
            return Ok(frame);
        }
        let selection = self.pager.select_victim(
            self.frames.frames_mut(),
            &mut self.procs,
            &mut self.rng,
            self.ins_counter,
        );
        if self.opts.aging_info {
            if let Some((hand, scanned)) = selection.clock_scan {
                writeln!(self.out, "ASELECT {hand} {scanned}")?;
            }
        }
        Ok(selection.frame)
    }

    /// Evict the current owner of a victim frame. A dirty page is written to
    /// its file when file mapped, otherwise to swap.
    fn unmap_victim(&mut self, mapping: Mapping) -> io::Result<()> {
        self.trace(format_args!(" UNMAP {}:{}\n", mapping.pid, mapping.vpage))?;
        self.cost += UNMAP_TIME;
        self.procs[mapping.pid].stats.unmaps += 1;

        let pte = &mut self.procs[mapping.pid].page_table[mapping.vpage];
        pte.set(PteFlags::PRESENT, false);
        let dirty = pte.modified();
        let file_mapped = pte.file_mapped();
        if dirty {
            pte.set(PteFlags::MODIFIED, false);
            if !file_mapped {
                pte.set(PteFlags::PAGED_OUT, true);
            }
        }

        if dirty {
            if file_mapped {
                self.trace(format_args!(" FOUT\n"))?;
                self.cost += FOUT_TIME;
                self.procs[mapping.pid].stats.fouts += 1;
            } else {
                self.trace(format_args!(" OUT\n"))?;
                self.cost += OUT_TIME;
                self.procs[mapping.pid].stats.outs += 1;
            }
        }
        Ok(())
    }

    /// Tear down a process: unmap every present page, writing dirty
    /// file-mapped pages back. Dirty anonymous pages are dropped without an
    /// OUT; the swap copy of a dead process is worthless.
    fn exit_process(&mut self, pid: usize) -> io::Result<()> {
        writeln!(self.out, "EXIT current process {pid}")?;
        self.process_exits += 1;
        self.cost += PROC_EXIT_TIME;

        for vpage in 0..MAX_VPAGES {
            let pte = self.procs[pid].page_table[vpage];
            if !pte.present() {
                continue;
            }
            self.trace(format_args!(" UNMAP {pid}:{vpage}\n"))?;
            self.cost += UNMAP_TIME;
            self.procs[pid].stats.unmaps += 1;
            if pte.modified() && pte.file_mapped() {
                self.trace(format_args!(" FOUT\n"))?;
                self.cost += FOUT_TIME;
                self.procs[pid].stats.fouts += 1;
            }
            self.frames.release(pte.frame());
            let pte = &mut self.procs[pid].page_table[vpage];
            pte.set(PteFlags::PRESENT, false);
            pte.set(PteFlags::REFERENCED, false);
            pte.set(PteFlags::PAGED_OUT, false);
        }
        Ok(())
    }

    /// Per-instruction dumps for the x / y / f debug toggles.
    fn debug_dumps(&mut self) -> io::Result<()> {
        if self.opts.curr_pt {
            report::emit_page_table(&mut self.out, self.curr, &self.procs[self.curr])?;
        }
        if self.opts.all_pt {
            for (pid, proc) in self.procs.iter().enumerate() {
                report::emit_page_table(&mut self.out, pid, proc)?;
            }
        }
        if self.opts.curr_ft {
            report::emit_frame_table(&mut self.out, self.frames.frames())?;
        }
        Ok(())
    }

    /// Final reports, each gated on its option flag.
    pub fn write_summary(&mut self) -> io::Result<()> {
        if self.opts.page_tables {
            for (pid, proc) in self.procs.iter().enumerate() {
                report::emit_page_table(&mut self.out, pid, proc)?;
            }
        }
        if self.opts.frame_table {
            report::emit_frame_table(&mut self.out, self.frames.frames())?;
        }
        if self.opts.stats {
            for (pid, proc) in self.procs.iter().enumerate() {
                writeln!(self.out, "{}", report::proc_stats_line(pid, proc))?;
            }
            writeln!(
                self.out,
                "{}",
                report::totals_line(
                    self.ins_counter,
                    self.ctx_switches,
                    self.process_exits,
                    self.cost
                )
            )?;
        }
        Ok(())
    }
}

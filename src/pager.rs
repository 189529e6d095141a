use crate::constants::{NRU_RESET_PERIOD, TAU};
use crate::memory::{Frame, Pte, PteFlags};
use crate::process::Process;
use crate::rng::RandomSource;

/// Aging shift-register bit merged in for a referenced page.
const AGE_MSB: u64 = 0x8000_0000;

/// Outcome of a victim selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub frame: usize,
    /// `(start_hand, frames_scanned)` for Clock, reported under the
    /// aging-info toggle. `None` for every other policy.
    pub clock_scan: Option<(usize, usize)>,
}

/// Replacement policy state, one variant per algorithm. Victim selection is
/// only ever invoked when the free-list is empty, so every frame it scans
/// carries a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pager {
    Fifo { hand: usize },
    Random,
    Clock { hand: usize },
    Nru { hand: usize, last_reset: u64 },
    Aging { hand: usize },
    WorkingSet { hand: usize, tau: u64 },
}

impl Pager {
    /// Pager for an algorithm letter from the command line.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'f' => Some(Pager::Fifo { hand: 0 }),
            'r' => Some(Pager::Random),
            'c' => Some(Pager::Clock { hand: 0 }),
            'e' => Some(Pager::Nru { hand: 0, last_reset: 0 }),
            'a' => Some(Pager::Aging { hand: 0 }),
            'w' => Some(Pager::WorkingSet { hand: 0, tau: TAU }),
            _ => None,
        }
    }

    /// Choose the frame to evict. Clock, NRU, Aging and Working-Set update
    /// R bits and ages as a side effect of the scan; those updates must stay
    /// visible to the fault handler within the same reference.
    pub fn select_victim(
        &mut self,
        frames: &mut [Frame],
        procs: &mut [Process],
        rng: &mut RandomSource,
        ins_counter: u64,
    ) -> Selection {
        let n = frames.len();
        match self {
            Pager::Fifo { hand } => {
                let frame = *hand;
                *hand = (frame + 1) % n;
                Selection { frame, clock_scan: None }
            }

            Pager::Random => Selection {
                frame: rng.next(n),
                clock_scan: None,
            },

            Pager::Clock { hand } => {
                let start = *hand;
                let mut scanned = 0;
                loop {
                    let idx = (start + scanned) % n;
                    scanned += 1;
                    let pte = mapped_pte(frames, procs, idx);
                    if pte.referenced() {
                        pte.set(PteFlags::REFERENCED, false);
                    } else {
                        *hand = (idx + 1) % n;
                        return Selection {
                            frame: idx,
                            clock_scan: Some((start, scanned)),
                        };
                    }
                }
            }

            Pager::Nru { hand, last_reset } => {
                let reset = ins_counter >= *last_reset + NRU_RESET_PERIOD;
                let start = *hand;
                let mut first_in_class: [Option<usize>; 4] = [None; 4];
                for step in 0..n {
                    let idx = (start + step) % n;
                    let pte = mapped_pte(frames, procs, idx);
                    let class = 2 * pte.referenced() as usize + pte.modified() as usize;
                    if first_in_class[class].is_none() {
                        first_in_class[class] = Some(idx);
                    }
                    if reset {
                        // classification above used the pre-reset R bit
                        pte.set(PteFlags::REFERENCED, false);
                    } else if class == 0 {
                        break;
                    }
                }
                if reset {
                    *last_reset = ins_counter;
                }
                let frame = first_in_class
                    .iter()
                    .find_map(|&idx| idx)
                    .expect("victim scan over an empty frame table");
                *hand = (frame + 1) % n;
                Selection { frame, clock_scan: None }
            }

            Pager::Aging { hand } => {
                let start = *hand;
                let mut victim = start;
                let mut min_age = u64::MAX;
                for step in 0..n {
                    let idx = (start + step) % n;
                    frames[idx].age >>= 1;
                    let pte = mapped_pte(frames, procs, idx);
                    if pte.referenced() {
                        pte.set(PteFlags::REFERENCED, false);
                        frames[idx].age |= AGE_MSB;
                    }
                    // strict comparison keeps the earlier-visited frame on ties
                    if frames[idx].age < min_age {
                        min_age = frames[idx].age;
                        victim = idx;
                    }
                }
                *hand = (victim + 1) % n;
                Selection { frame: victim, clock_scan: None }
            }

            Pager::WorkingSet { hand, tau } => {
                let start = *hand;
                let mut victim = start;
                let mut oldest = u64::MAX;
                for step in 0..n {
                    let idx = (start + step) % n;
                    let pte = mapped_pte(frames, procs, idx);
                    if pte.referenced() {
                        // seen inside the window: restamp and keep scanning
                        pte.set(PteFlags::REFERENCED, false);
                        frames[idx].age = ins_counter;
                    } else if ins_counter > frames[idx].age + *tau {
                        // fell out of the working set; take it immediately
                        victim = idx;
                        break;
                    }
                    if frames[idx].age < oldest {
                        oldest = frames[idx].age;
                        victim = idx;
                    }
                }
                *hand = (victim + 1) % n;
                Selection { frame: victim, clock_scan: None }
            }
        }
    }

    /// Re-initialize per-frame policy state after a page is mapped into
    /// `frame`. Only Aging and Working-Set carry such state.
    pub fn reset_age(&self, frames: &mut [Frame], frame: usize, ins_counter: u64) {
        match self {
            Pager::Aging { .. } => frames[frame].age = 0,
            Pager::WorkingSet { .. } => frames[frame].age = ins_counter,
            _ => {}
        }
    }
}

/// Reverse map: the PTE owning a frame, via the frame's `(pid, vpage)`.
fn mapped_pte<'a>(frames: &[Frame], procs: &'a mut [Process], index: usize) -> &'a mut Pte {
    let mapping = frames[index]
        .mapping
        .expect("victim scan reached an unmapped frame");
    &mut procs[mapping.pid].page_table[mapping.vpage]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Mapping;

    /// One process with `n` present pages, page `i` mapped to frame `i`.
    fn fixture(n: usize) -> (Vec<Frame>, Vec<Process>) {
        let mut proc = Process::new(Vec::new());
        let mut frames = vec![Frame::default(); n];
        for i in 0..n {
            let pte = &mut proc.page_table[i];
            pte.set(PteFlags::PRESENT, true);
            pte.set_frame(i);
            frames[i].mapping = Some(Mapping { pid: 0, vpage: i });
        }
        (frames, vec![proc])
    }

    fn set_bits(procs: &mut [Process], vpage: usize, referenced: bool, modified: bool) {
        let pte = &mut procs[0].page_table[vpage];
        pte.set(PteFlags::REFERENCED, referenced);
        pte.set(PteFlags::MODIFIED, modified);
    }

    fn no_rng() -> RandomSource {
        RandomSource::new(vec![0])
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Pager::from_code('f'), Some(Pager::Fifo { hand: 0 }));
        assert_eq!(Pager::from_code('r'), Some(Pager::Random));
        assert_eq!(Pager::from_code('c'), Some(Pager::Clock { hand: 0 }));
        assert_eq!(
            Pager::from_code('e'),
            Some(Pager::Nru { hand: 0, last_reset: 0 })
        );
        assert_eq!(Pager::from_code('a'), Some(Pager::Aging { hand: 0 }));
        assert_eq!(
            Pager::from_code('w'),
            Some(Pager::WorkingSet { hand: 0, tau: TAU })
        );
        assert_eq!(Pager::from_code('x'), None);
    }

    #[test]
    fn test_fifo_cycles_through_frames() {
        let (mut frames, mut procs) = fixture(3);
        let mut rng = no_rng();
        let mut pager = Pager::Fifo { hand: 0 };

        let picks: Vec<usize> = (0..5)
            .map(|_| {
                pager
                    .select_victim(&mut frames, &mut procs, &mut rng, 0)
                    .frame
            })
            .collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_random_indexes_frame_table_directly() {
        let (mut frames, mut procs) = fixture(4);
        let mut rng = RandomSource::new(vec![3, 1, 2, 0]);
        let mut pager = Pager::Random;

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 0);
        assert_eq!(sel.frame, 3);
        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 0);
        assert_eq!(sel.frame, 1);
    }

    #[test]
    fn test_clock_stops_at_first_unreferenced() {
        let (mut frames, mut procs) = fixture(4);
        set_bits(&mut procs, 0, true, false);
        set_bits(&mut procs, 1, true, false);
        // vpage 2 unreferenced
        set_bits(&mut procs, 3, true, false);
        let mut rng = no_rng();
        let mut pager = Pager::Clock { hand: 0 };

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 0);
        assert_eq!(sel.frame, 2);
        assert_eq!(sel.clock_scan, Some((0, 3)));
        assert_eq!(pager, Pager::Clock { hand: 3 });
        // R bits it passed over were consumed
        assert!(!procs[0].page_table[0].referenced());
        assert!(!procs[0].page_table[1].referenced());
        assert!(procs[0].page_table[3].referenced());
    }

    #[test]
    fn test_clock_full_sweep_when_all_referenced() {
        let (mut frames, mut procs) = fixture(4);
        for v in 0..4 {
            set_bits(&mut procs, v, true, false);
        }
        let mut rng = no_rng();
        let mut pager = Pager::Clock { hand: 0 };

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 0);
        // clears every R bit, then takes the frame it started from
        assert_eq!(sel.frame, 0);
        assert_eq!(sel.clock_scan, Some((0, 5)));
        assert!(procs[0].page_table.iter().all(|pte| !pte.referenced()));
    }

    #[test]
    fn test_nru_picks_first_frame_of_lowest_class() {
        let (mut frames, mut procs) = fixture(4);
        set_bits(&mut procs, 0, true, true); // class 3
        set_bits(&mut procs, 1, false, true); // class 1
        set_bits(&mut procs, 2, true, false); // class 2
        set_bits(&mut procs, 3, false, true); // class 1
        let mut rng = no_rng();
        let mut pager = Pager::Nru { hand: 0, last_reset: 0 };

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 10);
        assert_eq!(sel.frame, 1);
        assert_eq!(pager, Pager::Nru { hand: 2, last_reset: 0 });
        // no reset fired, R bits untouched
        assert!(procs[0].page_table[0].referenced());
    }

    #[test]
    fn test_nru_short_circuits_on_class_zero() {
        let (mut frames, mut procs) = fixture(4);
        set_bits(&mut procs, 0, true, false);
        // vpage 1 is class 0
        set_bits(&mut procs, 2, true, false);
        set_bits(&mut procs, 3, true, false);
        let mut rng = no_rng();
        let mut pager = Pager::Nru { hand: 0, last_reset: 0 };

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 10);
        assert_eq!(sel.frame, 1);
        // the scan stopped before frame 3
        assert!(procs[0].page_table[3].referenced());
    }

    #[test]
    fn test_nru_reset_clears_all_r_bits_and_scans_everything() {
        let (mut frames, mut procs) = fixture(4);
        set_bits(&mut procs, 0, true, false);
        // vpage 1 is class 0; a resetting scan must not stop there
        set_bits(&mut procs, 2, true, true);
        set_bits(&mut procs, 3, true, false);
        let mut rng = no_rng();
        let mut pager = Pager::Nru { hand: 0, last_reset: 0 };

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 48);
        assert_eq!(sel.frame, 1);
        assert_eq!(pager, Pager::Nru { hand: 2, last_reset: 48 });
        assert!(procs[0].page_table.iter().all(|pte| !pte.referenced()));
        // M bits survive the reset
        assert!(procs[0].page_table[2].modified());
    }

    #[test]
    fn test_nru_classification_uses_pre_reset_r_bits() {
        let (mut frames, mut procs) = fixture(2);
        set_bits(&mut procs, 0, true, false); // class 2
        set_bits(&mut procs, 1, true, true); // class 3
        let mut rng = no_rng();
        let mut pager = Pager::Nru { hand: 0, last_reset: 0 };

        // reset fires, but the victim comes from the old classes: frame 0
        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 100);
        assert_eq!(sel.frame, 0);
    }

    #[test]
    fn test_aging_shifts_and_merges_reference_bit() {
        let (mut frames, mut procs) = fixture(3);
        frames[0].age = 0b100;
        frames[1].age = 0b100;
        frames[2].age = 0b100;
        set_bits(&mut procs, 1, true, false);
        let mut rng = no_rng();
        let mut pager = Pager::Aging { hand: 0 };

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 0);
        // everyone shifted to 0b10; frame 1 also gained the MSB
        assert_eq!(frames[0].age, 0b10);
        assert_eq!(frames[1].age, AGE_MSB | 0b10);
        assert_eq!(frames[2].age, 0b10);
        assert!(!procs[0].page_table[1].referenced());
        // tie between frames 0 and 2 keeps the earlier-visited frame
        assert_eq!(sel.frame, 0);
        assert_eq!(pager, Pager::Aging { hand: 1 });
    }

    #[test]
    fn test_aging_all_zero_picks_first_in_walk_order() {
        let (mut frames, mut procs) = fixture(4);
        let mut rng = no_rng();
        let mut pager = Pager::Aging { hand: 2 };

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 0);
        assert_eq!(sel.frame, 2);
    }

    #[test]
    fn test_aging_reset_age_zeroes_register() {
        let (mut frames, _) = fixture(2);
        frames[1].age = u64::MAX;
        let pager = Pager::Aging { hand: 0 };
        pager.reset_age(&mut frames, 1, 99);
        assert_eq!(frames[1].age, 0);
    }

    #[test]
    fn test_working_set_takes_first_old_frame_and_stops() {
        let (mut frames, mut procs) = fixture(4);
        frames[0].age = 60; // inside the window at ins=100
        frames[1].age = 10; // old: 100 > 10 + 49
        frames[2].age = 5; // older still, but never examined
        frames[3].age = 60;
        let mut rng = no_rng();
        let mut pager = Pager::WorkingSet { hand: 0, tau: TAU };

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 100);
        assert_eq!(sel.frame, 1);
        assert_eq!(pager, Pager::WorkingSet { hand: 2, tau: TAU });
    }

    #[test]
    fn test_working_set_restamps_referenced_frames() {
        let (mut frames, mut procs) = fixture(2);
        frames[0].age = 1; // would be old, but R is set
        frames[1].age = 80;
        set_bits(&mut procs, 0, true, false);
        let mut rng = no_rng();
        let mut pager = Pager::WorkingSet { hand: 0, tau: TAU };

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 100);
        assert_eq!(frames[0].age, 100);
        assert!(!procs[0].page_table[0].referenced());
        // nobody old, smallest age wins
        assert_eq!(sel.frame, 1);
    }

    #[test]
    fn test_working_set_falls_back_to_smallest_age() {
        let (mut frames, mut procs) = fixture(4);
        frames[0].age = 90;
        frames[1].age = 70;
        frames[2].age = 85;
        frames[3].age = 70; // ties with frame 1; walk order keeps frame 1
        let mut rng = no_rng();
        let mut pager = Pager::WorkingSet { hand: 0, tau: TAU };

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 100);
        assert_eq!(sel.frame, 1);
        assert_eq!(pager, Pager::WorkingSet { hand: 2, tau: TAU });
    }

    #[test]
    fn test_working_set_all_referenced_picks_walk_start() {
        let (mut frames, mut procs) = fixture(3);
        for v in 0..3 {
            set_bits(&mut procs, v, true, false);
        }
        let mut rng = no_rng();
        let mut pager = Pager::WorkingSet { hand: 1, tau: TAU };

        let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 100);
        assert_eq!(sel.frame, 1);
    }

    #[test]
    fn test_working_set_reset_age_stamps_instruction_counter() {
        let (mut frames, _) = fixture(2);
        let pager = Pager::WorkingSet { hand: 0, tau: TAU };
        pager.reset_age(&mut frames, 0, 1234);
        assert_eq!(frames[0].age, 1234);
    }

    #[test]
    fn test_hand_advances_one_past_victim() {
        // FIFO, Clock, NRU, Aging and Working-Set all leave the hand just
        // past the chosen frame, modulo the table size.
        let (mut frames, mut procs) = fixture(2);
        let mut rng = no_rng();
        for mut pager in [
            Pager::Fifo { hand: 1 },
            Pager::Clock { hand: 1 },
            Pager::Nru { hand: 1, last_reset: 0 },
            Pager::Aging { hand: 1 },
            Pager::WorkingSet { hand: 1, tau: TAU },
        ] {
            let sel = pager.select_victim(&mut frames, &mut procs, &mut rng, 1);
            let hand = match pager {
                Pager::Fifo { hand }
                | Pager::Clock { hand }
                | Pager::Nru { hand, .. }
                | Pager::Aging { hand }
                | Pager::WorkingSet { hand, .. } => hand,
                Pager::Random => unreachable!(),
            };
            assert_eq!(hand, (sel.frame + 1) % 2);
        }
    }
}

use crate::constants::MAX_VPAGES;
use crate::memory::Pte;

/// Virtual Memory Area: a contiguous range of virtual pages sharing access
/// and file-mapping attributes. VMAs of a process never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vma {
    pub start_page: usize,
    /// Inclusive upper bound.
    pub end_page: usize,
    pub write_protected: bool,
    pub file_mapped: bool,
}

impl Vma {
    #[inline]
    pub fn contains(&self, vpage: usize) -> bool {
        self.start_page <= vpage && vpage <= self.end_page
    }
}

/// Per-process event counters, reported in the PROC summary line.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcStats {
    pub unmaps: u64,
    pub maps: u64,
    pub ins: u64,
    pub outs: u64,
    pub fins: u64,
    pub fouts: u64,
    pub zeros: u64,
    pub segv: u64,
    pub segprot: u64,
}

/// A simulated process: its VMA list, a dense page table over all 64 virtual
/// pages, and its counters. The pid is the process's index in the load order.
#[derive(Debug)]
pub struct Process {
    pub vmas: Vec<Vma>,
    pub page_table: [Pte; MAX_VPAGES],
    pub stats: ProcStats,
}

impl Process {
    pub fn new(vmas: Vec<Vma>) -> Self {
        Process {
            vmas,
            page_table: [Pte::default(); MAX_VPAGES],
            stats: ProcStats::default(),
        }
    }

    /// First VMA containing `vpage`, scanned in list order.
    pub fn find_vma(&self, vpage: usize) -> Option<&Vma> {
        self.vmas.iter().find(|vma| vma.contains(vpage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vma_bounds_are_inclusive() {
        let vma = Vma {
            start_page: 3,
            end_page: 7,
            write_protected: false,
            file_mapped: false,
        };
        assert!(!vma.contains(2));
        assert!(vma.contains(3));
        assert!(vma.contains(7));
        assert!(!vma.contains(8));
    }

    #[test]
    fn test_find_vma_scans_in_list_order() {
        let proc = Process::new(vec![
            Vma {
                start_page: 0,
                end_page: 9,
                write_protected: false,
                file_mapped: false,
            },
            Vma {
                start_page: 20,
                end_page: 30,
                write_protected: true,
                file_mapped: true,
            },
        ]);

        assert!(proc.find_vma(5).is_some());
        let hit = proc.find_vma(25).unwrap();
        assert!(hit.write_protected);
        assert!(hit.file_mapped);
        assert!(proc.find_vma(15).is_none());
        assert!(proc.find_vma(63).is_none());
    }

    #[test]
    fn test_new_process_has_empty_page_table() {
        let proc = Process::new(Vec::new());
        assert_eq!(proc.page_table.len(), MAX_VPAGES);
        assert!(proc.page_table.iter().all(|pte| !pte.present()));
        assert_eq!(proc.stats.maps, 0);
    }
}

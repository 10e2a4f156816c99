//! Thread-affinity platform hook.
//!
//! Invoked once per worker at thread entry; thread naming happens at
//! spawn time via `std::thread::Builder`. Failures are silent by
//! contract.

use crate::utils::bit;

/// Pins the current thread to the first available core admitted by
/// `affinity_mask`. An all-ones mask leaves the thread unpinned.
pub(crate) fn bind_current_thread(affinity_mask: usize) {
    if affinity_mask == usize::MAX {
        return;
    }
    let Some(cores) = core_affinity::get_core_ids() else {
        return;
    };
    for core in cores {
        if core.id < usize::BITS as usize
            && affinity_mask & bit(core.id) != 0
            && core_affinity::set_for_current(core)
        {
            return;
        }
    }
}

// Tue Oct 13 2026 - Alex

//! Process-wide fault guard.
//!
//! One `FaultGuard` exists per process, behind a mutex. A probe holds the mutex for its whole
//! window: snapshot the prior SIGSEGV/SIGBUS dispositions, install `on_fault`, read, restore,
//! verify. The handler only touches the atomics and the prior-action slot below.

use crate::memory::{arch, Address, FaultKind, MemoryError, ProbeOutcome};
use libc::{c_int, c_void, siginfo_t};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Serialize;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicI32, AtomicU64, AtomicU8, AtomicUsize, Ordering};

const GUARDED_SIGNALS: [c_int; 2] = [libc::SIGSEGV, libc::SIGBUS];
const MAX_SIGNAL: c_int = 64;
// Added by the C library on install; not part of what the caller configured.
const SA_RESTORER: c_int = 0x0400_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum GuardPhase {
    Disarmed = 0,
    Armed = 1,
    Reading = 2,
}

impl GuardPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Armed,
            2 => Self::Reading,
            _ => Self::Disarmed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GuardStats {
    pub windows: u64,
    pub faults: u64,
    pub forwarded: u64,
    pub reentry_violations: u64,
}

/// A comparable view of one installed signal action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDisposition {
    pub signal: c_int,
    pub handler: usize,
    pub flags: c_int,
    pub blocked: Vec<c_int>,
}

impl SignalDisposition {
    fn from_action(signal: c_int, action: &libc::sigaction) -> Self {
        let blocked = (1..=MAX_SIGNAL)
            .filter(|&sig| unsafe { libc::sigismember(&action.sa_mask, sig) } == 1)
            .collect();
        Self {
            signal,
            handler: action.sa_sigaction,
            flags: action.sa_flags & !SA_RESTORER,
            blocked,
        }
    }
}

static PHASE: AtomicU8 = AtomicU8::new(GuardPhase::Disarmed as u8);
static WINDOW_DEPTH: AtomicUsize = AtomicUsize::new(0);
static FAULT_SIGNAL: AtomicI32 = AtomicI32::new(0);
static FAULT_CODE: AtomicI32 = AtomicI32::new(0);
static FAULT_ADDRESS: AtomicUsize = AtomicUsize::new(0);
static FORWARDED: AtomicU64 = AtomicU64::new(0);

struct PriorActions(UnsafeCell<[libc::sigaction; 2]>);

// Written only by the lock holder before the handler is installed, read by the handler.
unsafe impl Sync for PriorActions {}

static PRIOR_ACTIONS: PriorActions = PriorActions(UnsafeCell::new(unsafe { std::mem::zeroed() }));

static GUARD: Lazy<Mutex<FaultGuard>> = Lazy::new(|| Mutex::new(FaultGuard::new()));

pub struct FaultGuard {
    poisoned: Option<String>,
    stats: GuardStats,
}

impl FaultGuard {
    fn new() -> Self {
        log::debug!(
            "fault guard ready (supported: {}, site: {:#x}, recovery: {:#x})",
            arch::SUPPORTED,
            arch::fault_site(),
            arch::recovery_site()
        );
        Self {
            poisoned: None,
            stats: GuardStats::default(),
        }
    }

    fn poison(&mut self, reason: String) -> MemoryError {
        log::error!("fault guard poisoned: {}", reason);
        self.poisoned = Some(reason.clone());
        MemoryError::GuardInvariantViolation(reason)
    }

    fn read_window(&mut self, address: Address, len: usize) -> Result<ProbeOutcome, MemoryError> {
        if let Some(reason) = &self.poisoned {
            return Err(MemoryError::GuardPoisoned(reason.clone()));
        }
        if !arch::SUPPORTED {
            return Err(MemoryError::NotSupported(
                "fault-guarded probing needs Linux on x86_64 or aarch64".to_string(),
            ));
        }

        if WINDOW_DEPTH.fetch_add(1, Ordering::SeqCst) != 0 {
            WINDOW_DEPTH.fetch_sub(1, Ordering::SeqCst);
            self.stats.reentry_violations += 1;
            return Err(self.poison("probe window entered re-entrantly".to_string()));
        }
        let result = self.guarded_copy(address, len);
        WINDOW_DEPTH.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn guarded_copy(&mut self, address: Address, len: usize) -> Result<ProbeOutcome, MemoryError> {
        let phase = GuardPhase::from_u8(PHASE.load(Ordering::SeqCst));
        if phase != GuardPhase::Disarmed {
            return Err(self.poison(format!("guard found {:?} at window start", phase)));
        }

        let snapshot = match install_handler() {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.poison(format!("installing fault handler: {}", e))),
        };
        self.stats.windows += 1;

        FAULT_SIGNAL.store(0, Ordering::SeqCst);
        FAULT_CODE.store(0, Ordering::SeqCst);
        FAULT_ADDRESS.store(0, Ordering::SeqCst);
        PHASE.store(GuardPhase::Armed as u8, Ordering::SeqCst);

        let mut buffer = vec![0u8; len];
        let mut recovered = false;
        PHASE.store(GuardPhase::Reading as u8, Ordering::SeqCst);
        for (i, slot) in buffer.iter_mut().enumerate() {
            let src = address.wrapping_add(i).as_usize() as *const u8;
            if !unsafe { arch::load_byte(src, slot) } {
                recovered = true;
                break;
            }
        }
        PHASE.store(GuardPhase::Disarmed as u8, Ordering::SeqCst);

        let signal = FAULT_SIGNAL.load(Ordering::SeqCst);
        let code = FAULT_CODE.load(Ordering::SeqCst);
        let fault_address = FAULT_ADDRESS.load(Ordering::SeqCst);

        let restored = restore_handlers(&snapshot);
        if let Err(reason) = restored {
            return Err(self.poison(reason));
        }

        match (recovered, signal) {
            (false, 0) => {
                log::trace!("probe {} +{} readable", address, len);
                Ok(ProbeOutcome::Readable(buffer))
            }
            (true, 0) => Err(self.poison("resumed at recovery point without a recorded fault".to_string())),
            (false, _) => Err(self.poison(format!(
                "fault (signal {}) recorded but the read was not diverted",
                signal
            ))),
            (true, _) => {
                self.stats.faults += 1;
                let kind = FaultKind::from_signal(signal, code);
                log::trace!(
                    "probe {} +{} faulted: {} at {:#x}",
                    address,
                    len,
                    kind,
                    fault_address
                );
                Ok(ProbeOutcome::Unreadable(kind))
            }
        }
    }

    fn dispositions(&self) -> Result<Vec<SignalDisposition>, MemoryError> {
        GUARDED_SIGNALS
            .iter()
            .map(|&signal| {
                let action = query_action(signal)?;
                Ok(SignalDisposition::from_action(signal, &action))
            })
            .collect()
    }
}

fn query_action(signal: c_int) -> Result<libc::sigaction, MemoryError> {
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    if unsafe { libc::sigaction(signal, std::ptr::null(), &mut action) } != 0 {
        return Err(MemoryError::Io(std::io::Error::last_os_error()));
    }
    Ok(action)
}

fn install_handler() -> Result<[libc::sigaction; 2], MemoryError> {
    let mut snapshot: [libc::sigaction; 2] = unsafe { std::mem::zeroed() };
    for (slot, &signal) in GUARDED_SIGNALS.iter().enumerate() {
        snapshot[slot] = query_action(signal)?;
    }
    unsafe {
        *PRIOR_ACTIONS.0.get() = snapshot;
    }

    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = on_fault as *const () as usize;
    action.sa_flags = libc::SA_SIGINFO | libc::SA_ONSTACK;
    unsafe {
        libc::sigemptyset(&mut action.sa_mask);
    }

    for (slot, &signal) in GUARDED_SIGNALS.iter().enumerate() {
        if unsafe { libc::sigaction(signal, &action, std::ptr::null_mut()) } != 0 {
            let err = std::io::Error::last_os_error();
            for &installed in &GUARDED_SIGNALS[..slot] {
                let prior = &snapshot[signal_slot(installed)];
                unsafe {
                    libc::sigaction(installed, prior, std::ptr::null_mut());
                }
            }
            return Err(MemoryError::Io(err));
        }
    }
    Ok(snapshot)
}

fn restore_handlers(snapshot: &[libc::sigaction; 2]) -> Result<(), String> {
    for (slot, &signal) in GUARDED_SIGNALS.iter().enumerate() {
        if unsafe { libc::sigaction(signal, &snapshot[slot], std::ptr::null_mut()) } != 0 {
            return Err(format!(
                "restoring prior handler for signal {}: {}",
                signal,
                std::io::Error::last_os_error()
            ));
        }
        let current = query_action(signal).map_err(|e| e.to_string())?;
        if SignalDisposition::from_action(signal, &current)
            != SignalDisposition::from_action(signal, &snapshot[slot])
        {
            return Err(format!("prior handler for signal {} was not restored", signal));
        }
    }
    Ok(())
}

fn signal_slot(signal: c_int) -> usize {
    if signal == libc::SIGBUS {
        1
    } else {
        0
    }
}

extern "C" fn on_fault(signal: c_int, info: *mut siginfo_t, ctx: *mut c_void) {
    unsafe {
        let reading = PHASE.load(Ordering::SeqCst) == GuardPhase::Reading as u8;
        if reading && !ctx.is_null() && arch::program_counter(ctx) == arch::fault_site() {
            let (code, fault_address) = if info.is_null() {
                (0, 0)
            } else {
                ((*info).si_code, (*info).si_addr() as usize)
            };
            FAULT_CODE.store(code, Ordering::SeqCst);
            FAULT_ADDRESS.store(fault_address, Ordering::SeqCst);
            FAULT_SIGNAL.store(signal, Ordering::SeqCst);
            arch::set_program_counter(ctx, arch::recovery_site());
            return;
        }
        forward_fault(signal, info, ctx);
    }
}

unsafe fn forward_fault(signal: c_int, info: *mut siginfo_t, ctx: *mut c_void) {
    FORWARDED.fetch_add(1, Ordering::SeqCst);
    let prior = &(*PRIOR_ACTIONS.0.get())[signal_slot(signal)];
    let handler = prior.sa_sigaction;
    if handler == libc::SIG_DFL || handler == libc::SIG_IGN {
        // Returning re-executes the faulting instruction under the prior disposition.
        libc::sigaction(signal, prior, std::ptr::null_mut());
        return;
    }
    if prior.sa_flags & libc::SA_SIGINFO != 0 {
        let f: extern "C" fn(c_int, *mut siginfo_t, *mut c_void) = std::mem::transmute(handler);
        f(signal, info, ctx);
    } else {
        let f: extern "C" fn(c_int) = std::mem::transmute(handler);
        f(signal);
    }
}

/// Run one guarded read. Callers go through `probe`.
pub(crate) fn guarded_read(address: Address, len: usize) -> Result<ProbeOutcome, MemoryError> {
    GUARD.lock().read_window(address, len)
}

/// SIGSEGV and SIGBUS dispositions as currently installed. Taken under the guard lock, so a
/// probe window is never observed half way.
pub fn fault_dispositions() -> Result<Vec<SignalDisposition>, MemoryError> {
    GUARD.lock().dispositions()
}

pub fn guard_stats() -> GuardStats {
    let guard = GUARD.lock();
    GuardStats {
        forwarded: FORWARDED.load(Ordering::SeqCst),
        ..guard.stats
    }
}

pub fn guard_phase() -> GuardPhase {
    GuardPhase::from_u8(PHASE.load(Ordering::SeqCst))
}

pub fn is_poisoned() -> bool {
    GUARD.lock().poisoned.is_some()
}

/// Leave the phase at `Armed` outside any window, as a window that never disarmed would. The
/// next probe poisons the guard for the rest of the process.
#[doc(hidden)]
pub fn leave_armed_for_tests() {
    let _guard = GUARD.lock();
    PHASE.store(GuardPhase::Armed as u8, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_round_trip() {
        assert_eq!(GuardPhase::from_u8(GuardPhase::Reading as u8), GuardPhase::Reading);
        assert_eq!(GuardPhase::from_u8(GuardPhase::Armed as u8), GuardPhase::Armed);
        assert_eq!(GuardPhase::from_u8(9), GuardPhase::Disarmed);
    }

    #[test]
    fn test_dispositions_are_stable_across_windows() {
        if !arch::SUPPORTED {
            return;
        }
        let before = fault_dispositions().unwrap();
        let value = 7u64;
        guarded_read(Address::from_ref(&value), 8).unwrap();
        guarded_read(Address::new(8), 8).unwrap();
        let after = fault_dispositions().unwrap();
        assert_eq!(before, after);
        assert_eq!(guard_phase(), GuardPhase::Disarmed);
        assert!(!is_poisoned());
    }

    #[test]
    fn test_disposition_ignores_our_handler() {
        if !arch::SUPPORTED {
            return;
        }
        for disposition in fault_dispositions().unwrap() {
            assert_ne!(disposition.handler, on_fault as *const () as usize);
        }
    }
}

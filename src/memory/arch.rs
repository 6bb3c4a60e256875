// Tue Oct 13 2026 - Alex

//! The guarded load routine and the signal-context accessors the fault handler needs.
//!
//! `objscope_guarded_load_byte(src, dst)` copies one byte and returns 0. Its first instruction
//! is the only one the fault handler will ever redirect. On a fault there, the handler moves the
//! saved program counter to `objscope_guarded_load_recover`, which returns 1 to the same caller.
//! The byte at `dst` is left untouched in that case.

#[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")))]
pub const SUPPORTED: bool = true;

#[cfg(not(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64"))))]
pub const SUPPORTED: bool = false;

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
std::arch::global_asm!(
    ".text",
    ".p2align 4",
    ".globl objscope_guarded_load_byte",
    ".hidden objscope_guarded_load_byte",
    ".type objscope_guarded_load_byte, @function",
    "objscope_guarded_load_byte:",
    "    movzx eax, byte ptr [rdi]",
    "    mov byte ptr [rsi], al",
    "    xor eax, eax",
    "    ret",
    ".size objscope_guarded_load_byte, . - objscope_guarded_load_byte",
    ".p2align 4",
    ".globl objscope_guarded_load_recover",
    ".hidden objscope_guarded_load_recover",
    ".type objscope_guarded_load_recover, @function",
    "objscope_guarded_load_recover:",
    "    mov eax, 1",
    "    ret",
    ".size objscope_guarded_load_recover, . - objscope_guarded_load_recover",
);

#[cfg(all(target_os = "linux", target_arch = "aarch64"))]
std::arch::global_asm!(
    ".text",
    ".p2align 4",
    ".globl objscope_guarded_load_byte",
    ".hidden objscope_guarded_load_byte",
    ".type objscope_guarded_load_byte, %function",
    "objscope_guarded_load_byte:",
    "    ldrb w2, [x0]",
    "    strb w2, [x1]",
    "    mov w0, #0",
    "    ret",
    ".size objscope_guarded_load_byte, . - objscope_guarded_load_byte",
    ".p2align 4",
    ".globl objscope_guarded_load_recover",
    ".hidden objscope_guarded_load_recover",
    ".type objscope_guarded_load_recover, %function",
    "objscope_guarded_load_recover:",
    "    mov w0, #1",
    "    ret",
    ".size objscope_guarded_load_recover, . - objscope_guarded_load_recover",
);

#[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")))]
mod imp {
    use libc::c_void;

    extern "C" {
        fn objscope_guarded_load_byte(src: *const u8, dst: *mut u8) -> u32;
        fn objscope_guarded_load_recover() -> u32;
    }

    /// Returns `false` if the load faulted and was recovered.
    ///
    /// # Safety
    /// `dst` must be valid for a one byte write. The fault handler must be installed and
    /// armed, otherwise a bad `src` takes the process down.
    #[inline(never)]
    pub unsafe fn load_byte(src: *const u8, dst: *mut u8) -> bool {
        objscope_guarded_load_byte(src, dst) == 0
    }

    pub fn fault_site() -> usize {
        objscope_guarded_load_byte as *const () as usize
    }

    pub fn recovery_site() -> usize {
        objscope_guarded_load_recover as *const () as usize
    }

    #[cfg(target_arch = "x86_64")]
    pub unsafe fn program_counter(ctx: *mut c_void) -> usize {
        let uc = ctx as *mut libc::ucontext_t;
        (*uc).uc_mcontext.gregs[libc::REG_RIP as usize] as usize
    }

    #[cfg(target_arch = "x86_64")]
    pub unsafe fn set_program_counter(ctx: *mut c_void, target: usize) {
        let uc = ctx as *mut libc::ucontext_t;
        (*uc).uc_mcontext.gregs[libc::REG_RIP as usize] = target as libc::greg_t;
    }

    #[cfg(target_arch = "aarch64")]
    pub unsafe fn program_counter(ctx: *mut c_void) -> usize {
        let uc = ctx as *mut libc::ucontext_t;
        (*uc).uc_mcontext.pc as usize
    }

    #[cfg(target_arch = "aarch64")]
    pub unsafe fn set_program_counter(ctx: *mut c_void, target: usize) {
        let uc = ctx as *mut libc::ucontext_t;
        (*uc).uc_mcontext.pc = target as _;
    }
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64"))))]
mod imp {
    use libc::c_void;

    pub unsafe fn load_byte(_src: *const u8, _dst: *mut u8) -> bool {
        false
    }

    pub fn fault_site() -> usize {
        0
    }

    pub fn recovery_site() -> usize {
        0
    }

    pub unsafe fn program_counter(_ctx: *mut c_void) -> usize {
        0
    }

    pub unsafe fn set_program_counter(_ctx: *mut c_void, _target: usize) {}
}

pub use imp::{fault_site, load_byte, program_counter, recovery_site, set_program_counter};

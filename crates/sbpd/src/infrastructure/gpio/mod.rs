//! GPIO driver adapters.
//!
//! On Linux the daemon uses [`raspberry_pi::RppalPinBackend`], which reaches the
//! header through the GPIO character device and delivers edges on `rppal`'s
//! interrupt threads.  Other platforms have no backend; the binary refuses to
//! start there, while tests on any platform use `sbpd_core::gpio::mock`.

#[cfg(target_os = "linux")]
pub mod raspberry_pi;

//! # lib-dsp
//!
//! Signal processing core of the antenna-analyzer engine.
//!
//! - **FFT/IFFT**: rustfft wrapper with normalised inverse and Hermitian mirroring
//! - **Windowing**: half-Hamming taper applied before the inverse transform
//! - **Interpolation**: complex linear interpolation over a frequency axis
//! - **TDR**: frequency-to-time transform of a one-port sweep

pub mod error;
pub mod fft;
pub mod window;
pub mod interpolation;
pub mod tdr;

pub use error::{DspError, DspResult};
pub use fft::FftEngine;
pub use tdr::{MirroredIfft, Radix2Legacy, TdrMode, TdrParams, TdrResponse, TdrStrategy};

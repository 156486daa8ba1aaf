//! Services layer (ports + adapters).
//!
//! - `ports`: pure contracts/types used across the kernel.
//! - `adapters`: storage engines, bundled languages, settings IO, async runtime.

pub mod adapters;
pub mod ports;

use thiserror::Error;

/// Checked access past the live elements.
///
/// This is the only error a container reports. Running out of memory is not an error
/// value: it aborts the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("index {index} is out of range for a vector of length {len}")]
pub struct IndexFault {
    pub index: u32,
    pub len: u32,
}

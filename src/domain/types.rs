//! Validated domain newtypes
//!
//! These wrap the primitive values that cross the service boundary so that
//! an order with an empty ticker or a non-positive quantity cannot be built.

use nutype::nutype;
#[allow(unused_imports)] // These are used by nutype derive macros
use serde::{Deserialize, Serialize};

/// Instrument symbol such as `BTCUSDT`
///
/// Limited to 32 characters, which covers exchange symbols with room to spare
/// and keeps the value safe to embed in a query string.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 32),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Ticker(String);

/// Number of units in an order
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Quantity(i32);

/// How many units a benchmark run launches
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsRef,
    Display,
    From
))]
pub struct TaskCount(usize);

/// Number of launches between two resource samples
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct SampleInterval(usize);

/// Size of the OS thread pool that carries lightweight tasks
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct WorkerThreads(usize);

impl WorkerThreads {
    /// One worker per available core, two when the host parallelism cannot
    /// be queried
    pub fn available() -> Result<Self, WorkerThreadsError> {
        let cores = std::thread::available_parallelism().map_or(2, |n| n.get());
        Self::try_new(cores)
    }
}

impl Quantity {
    /// Validate an untrusted wire integer, rejecting values that do not fit
    /// the stored column as well as non-positive ones
    pub fn from_wire(raw: i64) -> Result<Self, String> {
        let narrowed =
            i32::try_from(raw).map_err(|_| format!("quantity {raw} is out of range"))?;
        Self::try_new(narrowed).map_err(|_| "quantity must be > 0".to_string())
    }
}

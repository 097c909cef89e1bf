//! Reader for the binary performance-data block returned by
//! `RegQueryValueEx(HKEY_PERFORMANCE_DATA, ..)`.
//!
//! Layout (all little-endian):
//!
//! ```text
//! PERF_DATA_BLOCK            HeaderLength bytes, NumObjectTypes objects follow
//! └─ PERF_OBJECT_TYPE        TotalByteLength bytes per object
//!    ├─ header               HeaderLength bytes
//!    ├─ PERF_COUNTER_DEFINITION × n   up to DefinitionLength
//!    └─ PERF_COUNTER_BLOCK   raw values, addressed by CounterOffset
//! ```
//!
//! Only objects without instances are handled, which is what the System
//! object is.

use loadavg_core::SampleError;

/// Title index of the "Processor Queue Length" counter.
pub const PROCESSOR_QUEUE_LENGTH: u32 = 44;

/// Title index of the "System" object, as the registry value name.
pub const SYSTEM_OBJECT: &str = "2";

/// `PERF_DATA_BLOCK` field offsets.
pub(crate) mod block {
    pub const SIGNATURE: usize = 0;
    pub const HEADER_LENGTH: usize = 24;
    pub const NUM_OBJECT_TYPES: usize = 28;
    pub const SIZE: usize = 88;
}

/// `PERF_OBJECT_TYPE` field offsets. Identical on 32 and 64-bit Windows for
/// the fields read here.
pub(crate) mod object {
    pub const TOTAL_BYTE_LENGTH: usize = 0;
    pub const DEFINITION_LENGTH: usize = 4;
    pub const HEADER_LENGTH: usize = 8;
    pub const NUM_INSTANCES: usize = 40;
    pub const SIZE: usize = 64;
}

/// `PERF_COUNTER_DEFINITION` field offsets.
pub(crate) mod counter {
    pub const BYTE_LENGTH: usize = 0;
    pub const NAME_TITLE_INDEX: usize = 4;
    pub const OFFSET: usize = 36;
    pub const SIZE: usize = 40;
}

/// "PERF" as UTF-16LE.
const SIGNATURE: [u8; 8] = [b'P', 0, b'E', 0, b'R', 0, b'F', 0];

/// `PERF_NO_INSTANCES`
const NO_INSTANCES: i32 = -1;

struct Snapshot<'a> {
    bytes: &'a [u8],
}

impl<'a> Snapshot<'a> {
    fn u32_at(&self, base: usize, field: usize) -> Result<u32, SampleError> {
        base.checked_add(field)
            .and_then(|at| self.bytes.get(at..at.checked_add(4)?))
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or_else(|| {
                SampleError::Malformed(format!(
                    "read at {base}+{field} past end of {}-byte snapshot",
                    self.bytes.len()
                ))
            })
    }

    fn offset(&self, base: usize, len: u32) -> Result<usize, SampleError> {
        base.checked_add(len as usize)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                SampleError::Malformed(format!(
                    "section at {base} with length {len} exceeds {}-byte snapshot",
                    self.bytes.len()
                ))
            })
    }
}

/// Reject a header length shorter than the structure it describes.
fn at_least(len: u32, size: usize) -> Result<u32, SampleError> {
    if (len as usize) < size {
        return Err(SampleError::Malformed(format!("header length {len} below {size}")));
    }
    Ok(len)
}

/// Find the counter definition with `title_index` in `snapshot` and return
/// its raw 32-bit value.
pub fn find_raw_counter(snapshot: &[u8], title_index: u32) -> Result<u32, SampleError> {
    let snap = Snapshot { bytes: snapshot };

    if snapshot.get(block::SIGNATURE..block::SIGNATURE + SIGNATURE.len()) != Some(&SIGNATURE[..]) {
        return Err(SampleError::Malformed("missing PERF signature".into()));
    }

    let num_objects = snap.u32_at(0, block::NUM_OBJECT_TYPES)?;
    let mut section = snap.offset(0, at_least(snap.u32_at(0, block::HEADER_LENGTH)?, block::SIZE)?)?;

    for _ in 0..num_objects {
        let total = snap.u32_at(section, object::TOTAL_BYTE_LENGTH)?;
        let definitions_end = snap.offset(section, snap.u32_at(section, object::DEFINITION_LENGTH)?)?;
        let header = at_least(snap.u32_at(section, object::HEADER_LENGTH)?, object::SIZE)?;
        let mut definition = snap.offset(section, header)?;

        while definition < definitions_end {
            let index = snap.u32_at(definition, counter::NAME_TITLE_INDEX)?;
            if index == title_index {
                if snap.u32_at(section, object::NUM_INSTANCES)? as i32 != NO_INSTANCES {
                    return Err(SampleError::Malformed(format!(
                        "counter {title_index} belongs to an object with instances"
                    )));
                }
                // Raw values start right after the definitions.
                let value_offset = snap.u32_at(definition, counter::OFFSET)?;
                return snap.u32_at(definitions_end, value_offset as usize);
            }

            let step = at_least(snap.u32_at(definition, counter::BYTE_LENGTH)?, counter::SIZE)?;
            definition = snap.offset(definition, step)?;
        }

        if total == 0 {
            break;
        }
        section = snap.offset(section, total)?;
    }

    Err(SampleError::CounterNotFound { index: title_index })
}

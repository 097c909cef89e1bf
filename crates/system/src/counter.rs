use loadavg_core::SampleError;

/// Anything that can report the current processor queue length.
///
/// Implementations may keep state between calls but must return promptly:
/// a failing OS call is an error, never a hang.
pub trait CounterSource: Send {
    /// Short identifier used in log lines, e.g. `"registry"`.
    fn name(&self) -> &'static str;

    /// Read the instantaneous queue length.
    fn sample(&mut self) -> Result<u32, SampleError>;
}

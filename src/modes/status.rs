//! Mode validation status codes and their diagnostic strings.

use std::fmt;

/// Outcome of running a mode through the validator pipeline.
///
/// One rejection code per validator predicate. Rejections are local to one
/// mode and never abort the batch. The string set returned by
/// [`ModeStatus::as_str`] is stable and safe to match on in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeStatus {
    /// Mode passed every check run so far
    Ok,
    /// Horizontal timings are not monotonic or zero
    BadHTimings,
    /// Vertical timings are not monotonic or zero
    BadVTimings,
    /// Horizontal sync rate outside every monitor hsync range
    HSyncOutOfRange,
    /// Vertical refresh outside every monitor vrefresh range
    VRefreshOutOfRange,
    /// Interlaced modes not allowed by the matched clock range
    NoInterlace,
    /// Doublescan modes not allowed by the matched clock range
    NoDoubleScan,
    /// No discrete clock close enough to the requested dot clock
    NoClock,
    /// Pixel clock outside every clock range
    ClockOutOfRange,
    /// Mode requires more framebuffer memory than available
    InsufficientMemory,
    /// Scanline pitch limit exceeded
    WidthTooLarge,
    /// Mode exceeds the configured virtual size
    VirtualSizeExceeded,
    /// Mode is larger than the panel's native size
    PanelSizeExceeded,
    /// Reduced-blanking timing on a monitor that cannot accept it
    ReducedBlankingUnsupported,
    /// Mode bandwidth exceeds the monitor's maximum pixel clock
    BandwidthExceeded,
    /// Rejected by the driver's try_mode hook
    RejectedByDriver,
    /// Internal error while validating
    Internal,
}

impl ModeStatus {
    /// Stable diagnostic string for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            ModeStatus::Ok => "mode ok",
            ModeStatus::BadHTimings => "bad horizontal timings",
            ModeStatus::BadVTimings => "bad vertical timings",
            ModeStatus::HSyncOutOfRange => "hsync out of range",
            ModeStatus::VRefreshOutOfRange => "vrefresh out of range",
            ModeStatus::NoInterlace => "interlace not supported",
            ModeStatus::NoDoubleScan => "doublescan not supported",
            ModeStatus::NoClock => "no matching dot clock",
            ModeStatus::ClockOutOfRange => "dot clock out of range",
            ModeStatus::InsufficientMemory => "insufficient memory for mode",
            ModeStatus::WidthTooLarge => "scanline pitch limit exceeded",
            ModeStatus::VirtualSizeExceeded => "mode exceeds virtual size",
            ModeStatus::PanelSizeExceeded => "mode exceeds panel size",
            ModeStatus::ReducedBlankingUnsupported => "reduced blanking not supported",
            ModeStatus::BandwidthExceeded => "monitor bandwidth exceeded",
            ModeStatus::RejectedByDriver => "rejected by driver",
            ModeStatus::Internal => "internal error",
        }
    }

    /// Whether the status still counts as usable.
    pub fn is_ok(self) -> bool {
        matches!(self, ModeStatus::Ok)
    }
}

impl fmt::Display for ModeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_are_distinct() {
        let all = [
            ModeStatus::Ok,
            ModeStatus::BadHTimings,
            ModeStatus::BadVTimings,
            ModeStatus::HSyncOutOfRange,
            ModeStatus::VRefreshOutOfRange,
            ModeStatus::NoInterlace,
            ModeStatus::NoDoubleScan,
            ModeStatus::NoClock,
            ModeStatus::ClockOutOfRange,
            ModeStatus::InsufficientMemory,
            ModeStatus::WidthTooLarge,
            ModeStatus::VirtualSizeExceeded,
            ModeStatus::PanelSizeExceeded,
            ModeStatus::ReducedBlankingUnsupported,
            ModeStatus::BandwidthExceeded,
            ModeStatus::RejectedByDriver,
            ModeStatus::Internal,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.as_str(), b.as_str());
            }
        }
    }

    #[test]
    fn test_only_ok_is_ok() {
        assert!(ModeStatus::Ok.is_ok());
        assert!(!ModeStatus::NoClock.is_ok());
    }
}

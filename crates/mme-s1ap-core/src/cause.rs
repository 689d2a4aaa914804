//! S1AP cause encoding: the union of {radioNetwork, transport, nas,
//! protocol, misc} groups, and the upward-cause → wire-cause mapping used by
//! the UE-context-release procedure (spec.md §4.3).

/// A wire-level S1AP cause: one of the five IE groups plus an enumerated
/// code within that group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireCause {
    RadioNetwork(RadioNetworkCause),
    Transport(TransportCause),
    Nas(NasCause),
    Protocol(ProtocolCause),
    Misc(MiscCause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioNetworkCause {
    ReleaseDueToEutranGeneratedReason,
    HandoverCancelled,
    HoFailureInTarget,
    SuccessfulHandover,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCause {
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NasCause {
    Detach,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolCause {
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscCause {
    Unspecified,
    ControlProcessingOverload,
    UnknownPlmn,
}

/// The abstract cause the upper layer (MME-app) hands down when asking for a
/// UE context release, before it is mapped to a `WireCause` (spec.md §4.3
/// cause-mapping table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseCause {
    NasDetach,
    NasNormal,
    NasInvalidate,
    EutranGenerated,
    InitialContextSetupFailed,
    HandoverCancelled,
    HandoverFailed,
    SuccessfulHandover,
    SystemFailure,
    NetworkError,
    /// An implicit release: transport reset/shutdown. Handled specially by
    /// the release procedure (immediate removal, no wire exchange) rather
    /// than through this mapping table.
    ImplicitRelease,
}

impl ReleaseCause {
    /// True for the two causes that skip the three-way release handshake
    /// entirely and remove the UE reference immediately (spec.md §4.3).
    pub fn is_immediate(&self) -> bool {
        matches!(self, Self::ImplicitRelease)
    }

    /// True for the two causes that still send UEContextReleaseCommand but do
    /// not wait for ReleaseComplete before removing the reference.
    pub fn is_fire_and_forget(&self) -> bool {
        matches!(self, Self::SystemFailure | Self::NetworkError)
    }

    /// Maps the upward release cause to the wire cause-group + code, per the
    /// table in spec.md §4.3.
    pub fn to_wire(self) -> WireCause {
        match self {
            Self::NasDetach => WireCause::Nas(NasCause::Detach),
            Self::NasNormal | Self::NasInvalidate => WireCause::Nas(NasCause::Unspecified),
            Self::EutranGenerated => {
                WireCause::RadioNetwork(RadioNetworkCause::ReleaseDueToEutranGeneratedReason)
            }
            Self::InitialContextSetupFailed => {
                WireCause::RadioNetwork(RadioNetworkCause::Unspecified)
            }
            Self::HandoverCancelled => {
                WireCause::RadioNetwork(RadioNetworkCause::HandoverCancelled)
            }
            Self::HandoverFailed => WireCause::RadioNetwork(RadioNetworkCause::HoFailureInTarget),
            Self::SuccessfulHandover => {
                WireCause::RadioNetwork(RadioNetworkCause::SuccessfulHandover)
            }
            Self::SystemFailure | Self::NetworkError => WireCause::Transport(TransportCause::Unspecified),
            // ImplicitRelease never reaches the wire; default mapping kept for completeness.
            Self::ImplicitRelease => WireCause::Transport(TransportCause::Unspecified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cause_table_matches_spec() {
        assert_eq!(ReleaseCause::NasDetach.to_wire(), WireCause::Nas(NasCause::Detach));
        assert_eq!(ReleaseCause::NasNormal.to_wire(), WireCause::Nas(NasCause::Unspecified));
        assert_eq!(
            ReleaseCause::EutranGenerated.to_wire(),
            WireCause::RadioNetwork(RadioNetworkCause::ReleaseDueToEutranGeneratedReason)
        );
        assert_eq!(
            ReleaseCause::HandoverFailed.to_wire(),
            WireCause::RadioNetwork(RadioNetworkCause::HoFailureInTarget)
        );
        assert_eq!(
            ReleaseCause::SystemFailure.to_wire(),
            WireCause::Transport(TransportCause::Unspecified)
        );
    }

    #[test]
    fn fire_and_forget_causes() {
        assert!(ReleaseCause::SystemFailure.is_fire_and_forget());
        assert!(ReleaseCause::NetworkError.is_fire_and_forget());
        assert!(!ReleaseCause::NasDetach.is_fire_and_forget());
    }
}

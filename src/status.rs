// Status code mapping
//
// Every oVirt status enumeration is converted to a small integer so that
// alerting rules can compare against thresholds. 0 always means up/healthy.
// Values the table does not know (newer engines, missing status) map to the
// enumeration's non-zero fallback code.

/// Declares a status enumeration together with its API spelling and code
macro_rules! status_table {
    (
        $(#[$meta:meta])*
        $name:ident (fallback = $fallback:literal) {
            $($variant:ident => $api:literal = $code:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            /// Every known value, in table order
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Code for values missing from the table
            pub const FALLBACK_CODE: i16 = $fallback;

            /// Spelling used by the engine API
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $api,)+
                }
            }

            pub fn code(self) -> i16 {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            /// Parses the engine spelling, ignoring ASCII case
            pub fn parse(raw: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|status| status.as_str().eq_ignore_ascii_case(raw.trim()))
            }

            /// Code for a raw, possibly absent, status string
            pub fn code_of(raw: Option<&str>) -> i16 {
                raw.and_then(Self::parse)
                    .map_or(Self::FALLBACK_CODE, Self::code)
            }
        }
    };
}

status_table! {
    /// Datacenter status
    DatacenterStatus (fallback = 1) {
        Up => "up" = 0,
        Maintenance => "maintenance" = 1,
        Uninitialized => "uninitialized" = 2,
        Problematic => "problematic" = 3,
        Contend => "contend" = 4,
        NotOperational => "not_operational" = 5,
    }
}

status_table! {
    /// Host status
    ///
    /// Reboot and initializing share code 6; every install state shares 5.
    HostStatus (fallback = 1) {
        Up => "up" = 0,
        Maintenance => "maintenance" = 1,
        PreparingForMaintenance => "preparing_for_maintenance" = 2,
        PendingApproval => "pending_approval" = 3,
        Unassigned => "unassigned" = 4,
        InstallingOs => "installing_os" = 5,
        Installing => "installing" = 5,
        InstallFailed => "install_failed" = 5,
        Initializing => "initializing" = 6,
        Reboot => "reboot" = 6,
        Connecting => "connecting" = 7,
        Kdumping => "kdumping" = 8,
        Error => "error" = 9,
        NonResponsive => "non_responsive" = 10,
        NonOperational => "non_operational" = 11,
        Down => "down" = 12,
    }
}

status_table! {
    /// Virtual machine status
    VmStatus (fallback = 10) {
        Up => "up" = 0,
        Paused => "paused" = 1,
        Suspended => "suspended" = 2,
        PoweringUp => "powering_up" = 3,
        WaitForLaunch => "wait_for_launch" = 4,
        SavingState => "saving_state" = 5,
        Migrating => "migrating" = 6,
        PoweringDown => "powering_down" = 7,
        RebootInProgress => "reboot_in_progress" = 8,
        RestoringState => "restoring_state" = 9,
        Unknown => "unknown" = 10,
        ImageLocked => "image_locked" = 11,
        Unassigned => "unassigned" = 12,
        NotResponding => "not_responding" = 13,
        Down => "down" = 14,
    }
}

status_table! {
    /// Storage domain status
    ///
    /// Attached external storage may report no status at all; that maps
    /// to the fallback code like any unknown value.
    StorageDomainStatus (fallback = 3) {
        Active => "active" = 0,
        Activating => "activating" = 1,
        Maintenance => "maintenance" = 2,
        PreparingForMaintenance => "preparing_for_maintenance" = 2,
        Unknown => "unknown" = 3,
        Detaching => "detaching" = 4,
        Unattached => "unattached" = 5,
        Mixed => "mixed" = 6,
        Locked => "locked" = 7,
    }
}

status_table! {
    /// External (provider reported) health status
    ExternalStatus (fallback = 1) {
        Ok => "ok" = 0,
        Info => "info" = 1,
        Warning => "warning" = 2,
        Error => "error" = 3,
        Failure => "failure" = 4,
    }
}

status_table! {
    /// Gluster volume status
    GlusterVolumeStatus (fallback = 1) {
        Up => "up" = 0,
        Unknown => "unknown" = 1,
        Down => "down" = 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Checks the properties alerting relies on for one enumeration
    macro_rules! assert_table {
        ($name:ident, healthy = $healthy:expr, max = $max:literal) => {{
            let healthy: Vec<_> = $name::ALL.iter().filter(|s| s.code() == 0).collect();
            assert_eq!(healthy, vec![&$healthy], "{} healthy value", stringify!($name));

            for status in $name::ALL {
                assert!(
                    (0..=$max).contains(&status.code()),
                    "{:?} out of range",
                    status
                );
                assert_eq!($name::parse(status.as_str()), Some(*status));
            }

            assert_ne!($name::FALLBACK_CODE, 0);
            assert_eq!($name::code_of(Some("some_future_state")), $name::FALLBACK_CODE);
            assert_eq!($name::code_of(None), $name::FALLBACK_CODE);
            assert_eq!($name::code_of(Some("")), $name::FALLBACK_CODE);
        }};
    }

    #[test]
    fn test_tables_are_well_formed() {
        assert_table!(DatacenterStatus, healthy = DatacenterStatus::Up, max = 5);
        assert_table!(HostStatus, healthy = HostStatus::Up, max = 12);
        assert_table!(VmStatus, healthy = VmStatus::Up, max = 14);
        assert_table!(StorageDomainStatus, healthy = StorageDomainStatus::Active, max = 7);
        assert_table!(ExternalStatus, healthy = ExternalStatus::Ok, max = 4);
        assert_table!(GlusterVolumeStatus, healthy = GlusterVolumeStatus::Up, max = 2);
    }

    #[test]
    fn test_datacenter_codes() {
        let expected = [
            ("up", 0),
            ("maintenance", 1),
            ("uninitialized", 2),
            ("problematic", 3),
            ("contend", 4),
            ("not_operational", 5),
        ];
        for (raw, code) in expected {
            assert_eq!(DatacenterStatus::code_of(Some(raw)), code, "{}", raw);
        }
        assert_eq!(DatacenterStatus::ALL.len(), expected.len());
    }

    #[test]
    fn test_host_codes() {
        let expected = [
            ("up", 0),
            ("maintenance", 1),
            ("preparing_for_maintenance", 2),
            ("pending_approval", 3),
            ("unassigned", 4),
            ("installing_os", 5),
            ("installing", 5),
            ("install_failed", 5),
            ("initializing", 6),
            ("reboot", 6),
            ("connecting", 7),
            ("kdumping", 8),
            ("error", 9),
            ("non_responsive", 10),
            ("non_operational", 11),
            ("down", 12),
        ];
        for (raw, code) in expected {
            assert_eq!(HostStatus::code_of(Some(raw)), code, "{}", raw);
        }
        assert_eq!(HostStatus::ALL.len(), expected.len());
    }

    #[test]
    fn test_vm_codes() {
        let expected = [
            ("up", 0),
            ("paused", 1),
            ("suspended", 2),
            ("powering_up", 3),
            ("wait_for_launch", 4),
            ("saving_state", 5),
            ("migrating", 6),
            ("powering_down", 7),
            ("reboot_in_progress", 8),
            ("restoring_state", 9),
            ("unknown", 10),
            ("image_locked", 11),
            ("unassigned", 12),
            ("not_responding", 13),
            ("down", 14),
        ];
        for (raw, code) in expected {
            assert_eq!(VmStatus::code_of(Some(raw)), code, "{}", raw);
        }
        assert_eq!(VmStatus::ALL.len(), expected.len());
    }

    #[test]
    fn test_storage_domain_codes() {
        let expected = [
            ("active", 0),
            ("activating", 1),
            ("maintenance", 2),
            ("preparing_for_maintenance", 2),
            ("unknown", 3),
            ("detaching", 4),
            ("unattached", 5),
            ("mixed", 6),
            ("locked", 7),
        ];
        for (raw, code) in expected {
            assert_eq!(StorageDomainStatus::code_of(Some(raw)), code, "{}", raw);
        }
        assert_eq!(StorageDomainStatus::ALL.len(), expected.len());
    }

    #[test]
    fn test_external_and_gluster_codes() {
        for (raw, code) in [("ok", 0), ("info", 1), ("warning", 2), ("error", 3), ("failure", 4)] {
            assert_eq!(ExternalStatus::code_of(Some(raw)), code, "{}", raw);
        }
        for (raw, code) in [("up", 0), ("unknown", 1), ("down", 2)] {
            assert_eq!(GlusterVolumeStatus::code_of(Some(raw)), code, "{}", raw);
        }
    }

    #[test]
    fn test_parse_ignores_case() {
        assert_eq!(HostStatus::parse("NON_RESPONSIVE"), Some(HostStatus::NonResponsive));
        assert_eq!(VmStatus::parse(" Up "), Some(VmStatus::Up));
    }
}

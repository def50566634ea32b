//! Syslog facilities, severities, and the combined priority value.
//!
//! Codes follow `<sys/syslog.h>`, which agrees on Linux, BSD, and macOS up
//! to `ftp`.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::TransportError;

/// Message severity, most urgent first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

impl Severity {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<i32> for Severity {
    type Error = TransportError;

    fn try_from(value: i32) -> Result<Self, TransportError> {
        Ok(match value {
            0 => Self::Emergency,
            1 => Self::Alert,
            2 => Self::Critical,
            3 => Severity::Error,
            4 => Self::Warning,
            5 => Self::Notice,
            6 => Self::Info,
            7 => Self::Debug,
            other => return Err(TransportError::InvalidPriority(other)),
        })
    }
}

/// Originating facility. Defaults to `local0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Facility {
    Kern = 0,
    User = 1,
    Mail = 2,
    Daemon = 3,
    Auth = 4,
    Syslog = 5,
    Lpr = 6,
    News = 7,
    Uucp = 8,
    Cron = 9,
    AuthPriv = 10,
    Ftp = 11,
    #[default]
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

impl Facility {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Facility::Kern => "kern",
            Facility::User => "user",
            Facility::Mail => "mail",
            Facility::Daemon => "daemon",
            Facility::Auth => "auth",
            Facility::Syslog => "syslog",
            Facility::Lpr => "lpr",
            Facility::News => "news",
            Facility::Uucp => "uucp",
            Facility::Cron => "cron",
            Facility::AuthPriv => "authpriv",
            Facility::Ftp => "ftp",
            Facility::Local0 => "local0",
            Facility::Local1 => "local1",
            Facility::Local2 => "local2",
            Facility::Local3 => "local3",
            Facility::Local4 => "local4",
            Facility::Local5 => "local5",
            Facility::Local6 => "local6",
            Facility::Local7 => "local7",
        };
        f.write_str(s)
    }
}

/// Error returned when a facility name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown syslog facility: {0}")]
pub struct UnknownFacility(pub String);

impl FromStr for Facility {
    type Err = UnknownFacility;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kern" => Ok(Self::Kern),
            "user" => Ok(Self::User),
            "mail" => Ok(Self::Mail),
            "daemon" => Ok(Self::Daemon),
            "auth" => Ok(Self::Auth),
            "syslog" => Ok(Self::Syslog),
            "lpr" => Ok(Self::Lpr),
            "news" => Ok(Self::News),
            "uucp" => Ok(Self::Uucp),
            "cron" => Ok(Self::Cron),
            "authpriv" => Ok(Self::AuthPriv),
            "ftp" => Ok(Self::Ftp),
            "local0" => Ok(Self::Local0),
            "local1" => Ok(Self::Local1),
            "local2" => Ok(Self::Local2),
            "local3" => Ok(Self::Local3),
            "local4" => Ok(Self::Local4),
            "local5" => Ok(Self::Local5),
            "local6" => Ok(Self::Local6),
            "local7" => Ok(Self::Local7),
            other => Err(UnknownFacility(other.to_owned())),
        }
    }
}

/// Facility and severity pair rendered as `<facility * 8 + severity>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Priority {
    pub facility: Facility,
    pub severity: Severity,
}

impl Priority {
    pub fn new(facility: Facility, severity: Severity) -> Self {
        Self { facility, severity }
    }

    /// Numeric PRI value placed between the angle brackets.
    pub fn code(self) -> u8 {
        self.facility.code() * 8 + self.severity.code()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Facility::Local0, Severity::Info, 134)]
    #[case(Facility::Kern, Severity::Emergency, 0)]
    #[case(Facility::User, Severity::Notice, 13)]
    #[case(Facility::Local7, Severity::Debug, 191)]
    fn combines_facility_and_severity(
        #[case] facility: Facility,
        #[case] severity: Severity,
        #[case] expected: u8,
    ) {
        assert_eq!(Priority::new(facility, severity).code(), expected);
    }

    #[rstest]
    fn display_wraps_code_in_brackets() {
        let pri = Priority::new(Facility::Local0, Severity::Error);
        assert_eq!(pri.to_string(), "<131>");
    }

    #[rstest]
    #[case(-1)]
    #[case(8)]
    #[case(134)]
    fn rejects_out_of_range_severity(#[case] raw: i32) {
        let err = Severity::try_from(raw).expect_err("severity must be rejected");
        assert!(matches!(err, TransportError::InvalidPriority(v) if v == raw));
    }

    #[rstest]
    fn accepts_every_severity_in_range() {
        for raw in 0..=7 {
            let severity = Severity::try_from(raw).expect("in range");
            assert_eq!(i32::from(severity.code()), raw);
        }
    }

    #[rstest]
    fn error_severity_converts_through_try_from() {
        let converted: Result<Severity, <Severity as TryFrom<i32>>::Error> = 3.try_into();
        assert_eq!(converted.expect("in range"), Severity::Error);
    }

    #[rstest]
    #[case("local0", Facility::Local0)]
    #[case(" AuthPriv ", Facility::AuthPriv)]
    #[case("DAEMON", Facility::Daemon)]
    fn parses_facility_names(#[case] raw: &str, #[case] expected: Facility) {
        assert_eq!(raw.parse::<Facility>(), Ok(expected));
    }

    #[rstest]
    fn facility_name_round_trips_through_display() {
        for name in ["kern", "cron", "local5"] {
            let facility: Facility = name.parse().expect("known facility");
            assert_eq!(facility.to_string(), name);
        }
    }

    #[rstest]
    fn unknown_facility_is_reported() {
        assert_eq!(
            "local9".parse::<Facility>(),
            Err(UnknownFacility("local9".into()))
        );
    }
}

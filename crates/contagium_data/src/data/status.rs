use serde::{Deserialize, Serialize};

/// Compartmental status of a host.
///
/// The numeric codes are part of the log schema and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    /// Healthy and open to infection.
    Susceptible = 1,
    /// Carries pathogens but does not yet transmit.
    Exposed = 2,
    /// Carries pathogens and transmits.
    Infected = 3,
    /// Transmitting stage of the SEIR family.
    Infective = 4,
    /// Removed from the epidemic (SIR family).
    Removed = 5,
    /// Recovered with immunity.
    Recovered = 6,
    /// Dead; terminal.
    Dead = 7,
    /// Vaccinated; terminal.
    Vaccinated = 8,
}

impl Status {
    /// Stable numeric code used in status log rows.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Status::code`].
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Status::Susceptible),
            2 => Some(Status::Exposed),
            3 => Some(Status::Infected),
            4 => Some(Status::Infective),
            5 => Some(Status::Removed),
            6 => Some(Status::Recovered),
            7 => Some(Status::Dead),
            8 => Some(Status::Vaccinated),
            _ => None,
        }
    }

    /// Statuses that drop their pathogen population on entry.
    #[must_use]
    pub fn sheds_pathogens(self) -> bool {
        matches!(
            self,
            Status::Removed | Status::Recovered | Status::Dead | Status::Vaccinated
        )
    }

    /// Statuses whose hosts replicate and mutate pathogens each generation.
    #[must_use]
    pub fn replicates(self) -> bool {
        matches!(self, Status::Exposed | Status::Infected | Status::Infective)
    }
}

/// Timer value meaning "unused/perpetual".
pub const TIMER_UNSET: i64 = -1;

//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every record in the league model has a strongly-typed ID so that a
//! `TeamId` can never be passed where a `PlayerId` is expected. New IDs use
//! UUID v7 (time-ordered) for efficient database indexing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a season.
    SeasonId
}

define_id! {
    /// Unique identifier for a league within a season.
    LeagueId
}

define_id! {
    /// Unique identifier for a knock-out cup within a season.
    CupId
}

define_id! {
    /// Unique identifier for a club (owner of teams and players).
    ClubId
}

define_id! {
    /// Unique identifier for a team fielded by a club.
    TeamId
}

define_id! {
    /// Unique identifier for a player registered with a club.
    PlayerId
}

define_id! {
    /// Unique identifier for a league or cup fixture.
    FixtureId
}

define_id! {
    /// Unique identifier for a calendar day row.
    CalendarDayId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let team = TeamId::new();
        let player = PlayerId::new();
        // Different types -- the compiler enforces no mixing.
        assert_ne!(team.into_inner(), Uuid::nil());
        assert_ne!(player.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_converts_from_and_into_uuid() {
        let raw = Uuid::now_v7();
        let id = FixtureId::from(raw);
        assert_eq!(Uuid::from(id), raw);
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = SeasonId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}

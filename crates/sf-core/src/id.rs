use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a uuid-backed identifier newtype with the shared id behaviour:
/// random construction, `Default`, and a short 8-character `Display`.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", &self.0.to_string()[..8])
            }
        }
    };
}

define_id!(
    /// Unique identifier for a player (human or AI empire).
    PlayerId
);
define_id!(
    /// Unique identifier for a planet.
    PlanetId
);
define_id!(
    /// Unique identifier for a star system node in the hyperlane graph.
    StarSystemId
);
define_id!(
    /// Unique identifier for a ship.
    ShipId
);
define_id!(
    /// Unique identifier for a building placed on a planet.
    BuildingId
);

use sf_core::{CoreError, PlayerId, ResourceKind, ShipId, StarSystemId};

use crate::effect::StateField;

/// Alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised by the scheduler, its systems, and the host loop.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A game-state lookup or mutation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A system was ticked or queried before `init` handed it a context.
    #[error("system '{0}' has not been initialized")]
    NotInitialized(String),

    /// A system with the same name is already registered.
    #[error("a system named '{0}' is already registered")]
    DuplicateSystem(String),

    /// A system emitted an effect for a field it did not declare.
    #[error("system '{system}' wrote {field} without declaring it")]
    UndeclaredWrite {
        /// The offending system.
        system: String,
        /// The field it tried to write.
        field: StateField,
    },

    /// A system tried to spend stock through an unchecked adjustment.
    #[error("system '{system}' must withdraw {resource} rather than adjust it downward")]
    UncheckedSpend {
        /// The offending system.
        system: String,
        /// The resource it tried to spend.
        resource: ResourceKind,
    },

    /// Two systems claim exclusive ownership of the same field.
    #[error("{field} is already owned by '{owner}'; '{claimant}' cannot also write it")]
    OwnershipConflict {
        /// The contested field.
        field: StateField,
        /// The system already registered as owner.
        owner: String,
        /// The system whose registration was refused.
        claimant: String,
    },

    /// A lock was poisoned by a panic in another thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),

    /// A player cannot afford an order.
    #[error("player {player} has {available:.0} credits but {required:.0} are needed")]
    InsufficientCredits {
        /// The ordering player.
        player: PlayerId,
        /// Credits required.
        required: f64,
        /// Credits available.
        available: f64,
    },

    /// A ship lacks the fuel for a journey.
    #[error("ship {ship} has {available:.1} fuel but the journey needs {required:.1}")]
    InsufficientFuel {
        /// The ship.
        ship: ShipId,
        /// Fuel required for the whole trip.
        required: f64,
        /// Fuel in the tank.
        available: f64,
    },

    /// No hyperlane joins the two systems.
    #[error("no hyperlane from {from} to {to}")]
    NoHyperlane {
        /// Origin system.
        from: StarSystemId,
        /// Requested destination.
        to: StarSystemId,
    },

    /// The configuration could not be parsed or read.
    #[error("config error: {0}")]
    Config(String),

    /// A system-specific failure.
    #[error("system error: {0}")]
    SystemError(String),
}

impl<T> From<std::sync::PoisonError<T>> for SimError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned("shared simulation state")
    }
}

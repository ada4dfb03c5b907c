use crate::id::{PlanetId, PlayerId, ShipId, StarSystemId};
use crate::resource::ResourceKind;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when manipulating a game state.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested player does not exist.
    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// The requested planet does not exist.
    #[error("planet not found: {0}")]
    PlanetNotFound(PlanetId),

    /// No planet carries the given name.
    #[error("no planet named \"{0}\"")]
    UnknownPlanet(String),

    /// The requested star system does not exist.
    #[error("star system not found: {0}")]
    StarSystemNotFound(StarSystemId),

    /// The requested ship does not exist.
    #[error("ship not found: {0}")]
    ShipNotFound(ShipId),

    /// An object with the same name already exists in its collection.
    #[error("name already in use: \"{0}\"")]
    DuplicateName(String),

    /// A planet holds less of a resource than a withdrawal asks for.
    #[error("planet {planet} holds {available:.1} {resource} but {required:.1} is needed")]
    InsufficientStock {
        /// The planet drawn from.
        planet: PlanetId,
        /// The resource drawn.
        resource: ResourceKind,
        /// Amount requested.
        required: f64,
        /// Amount held.
        available: f64,
    },

    /// A generic validation error with a descriptive message.
    #[error("validation error: {0}")]
    Validation(String),
}

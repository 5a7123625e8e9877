use thiserror::Error;

/// `ModalError` enumerates all possible errors returned by modal
#[derive(Error, Debug)]
pub enum ModalError {
    /// Represents a name already taken by a sibling port, entity, relation,
    /// or state
    #[error("The name \"{name}\" is already in use within \"{container}\"")]
    NameDuplication { container: String, name: String },

    /// Represents a port added to a controller or refinement outside of the
    /// mirrored port creation protocol
    #[error("Port \"{port}\" cannot be added to \"{entity}\" directly, because the enclosing modal model has no matching port; create it on the modal model instead")]
    PortOutsideProtocol { entity: String, port: String },

    /// Represents a refinement requested on a container that is not a modal
    /// model
    #[error("Refinements can only be created inside a modal model, but \"{0}\" is not one")]
    NotModalContainer(String),

    /// Represents a structural edit that would leave the containment tree
    /// inconsistent
    #[error("Illegal structure: {0}")]
    IllegalStructure(String),

    /// Represents an ordering request outside of the sibling list
    #[error("Index {index} is out of range for a list of {len} ports")]
    IndexOutOfRange { index: usize, len: usize },

    /// Represents an operation requested on an entity that does not exist
    #[error("A specified entity cannot be found in the model: {0}")]
    EntityNotFound(String),

    /// Represents an operation requested on a port that does not exist
    #[error("A specified port cannot be found in the model: {0}")]
    PortNotFound(String),

    /// Represents an operation requested on a state that does not exist
    #[error("A specified state cannot be found in the controller: {0}")]
    StateNotFound(String),

    /// Represents an operation requested on a transition that does not exist
    #[error("A specified transition cannot be found in the controller: {0}")]
    TransitionNotFound(String),

    /// Represents a refinement class name with no registered constructor
    #[error("No refinement actor is registered under the class name \"{0}\"")]
    UnknownRefinementClass(String),

    /// Represents a guard or action expression that cannot be analyzed
    #[error("Malformed expression \"{expression}\": {reason}")]
    MalformedGuard { expression: String, reason: String },

    /// Represents a violated invariant of the mirroring protocol itself
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Transparent serde_json errors
    #[error(transparent)]
    JSONError(#[from] serde_json::error::Error),

    /// Transparent serde_yaml errors
    #[error(transparent)]
    YAMLError(#[from] serde_yaml::Error),
}

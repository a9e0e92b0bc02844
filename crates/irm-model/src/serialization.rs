//! Binary and JSON encodings of a [`State`].

use irm_core::{ErrorInfo, IrmError};

use crate::state::State;

/// Serializes the state to a compact binary representation using `bincode`.
pub fn state_to_bytes(state: &State) -> Result<Vec<u8>, IrmError> {
    bincode::serialize(state)
        .map_err(|err| IrmError::Serde(ErrorInfo::new("serialize-bytes", err.to_string())))
}

/// Restores a state from its binary representation and checks its internal
/// invariants.
pub fn state_from_bytes(bytes: &[u8]) -> Result<State, IrmError> {
    let state: State = bincode::deserialize(bytes)
        .map_err(|err| IrmError::Serde(ErrorInfo::new("deserialize-bytes", err.to_string())))?;
    state.check_structure()?;
    Ok(state)
}

/// Serializes the state to a JSON string.
pub fn state_to_json(state: &State) -> Result<String, IrmError> {
    serde_json::to_string_pretty(state)
        .map_err(|err| IrmError::Serde(ErrorInfo::new("serialize-json", err.to_string())))
}

/// Restores a state from a JSON string.
pub fn state_from_json(json: &str) -> Result<State, IrmError> {
    let state: State = serde_json::from_str(json)
        .map_err(|err| IrmError::Serde(ErrorInfo::new("deserialize-json", err.to_string())))?;
    state.check_structure()?;
    Ok(state)
}

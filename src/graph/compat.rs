//! Port type compatibility.
//!
//! Decides whether an output of one type may feed an input of another.
//! Used by `Graph::add_edge` before any mutation and by `Graph::revalidate`
//! / snapshot loading on edges that already exist.

use crate::graph::error::{GraphError, GraphResult};
use crate::graph::port::PortType;

/// Explicit `(output, input)` widenings accepted on top of identity and
/// wildcard matching. Empty: no implicit numeric promotion.
pub const IMPLICIT_WIDENINGS: &[(PortType, PortType)] = &[];

/// Can an output of type `output` feed an input of type `input`?
pub fn can_connect(output: &PortType, input: &PortType) -> bool {
    if output.is_wildcard() || input.is_wildcard() {
        return true;
    }
    if output == input {
        return true;
    }
    IMPLICIT_WIDENINGS
        .iter()
        .any(|(from, to)| from == output && to == input)
}

/// Same decision as [`can_connect`], as a `Result` carrying the rejection.
pub fn check_connection(output: &PortType, input: &PortType) -> GraphResult<()> {
    if can_connect(output, input) {
        Ok(())
    } else {
        Err(GraphError::IncompatibleTypes {
            output: output.clone(),
            input: input.clone(),
        })
    }
}

/// Human-readable reason a connection would be refused, `None` if accepted.
pub fn rejection_reason(output: &PortType, input: &PortType) -> Option<String> {
    check_connection(output, input).err().map(|e| e.to_string())
}

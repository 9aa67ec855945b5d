//! Exit codes for sondactl failure modes.

/// The detected system cannot run the companion agent.
pub const EXIT_INCOMPATIBLE: i32 = 64;

/// The backend is unavailable or rejected the request.
pub const EXIT_BACKEND_UNAVAILABLE: i32 = 70;

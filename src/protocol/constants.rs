//! Chat Protocol Constants

/// Operation code: a user sent a message to the room.
pub const OP_MESSAGE: u8 = 0;

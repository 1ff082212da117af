/// Maximum size of a length-delimited frame. Host adapters must use the same limit.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

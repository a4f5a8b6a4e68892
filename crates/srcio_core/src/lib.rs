//! Decoders for Source engine assets: studio model headers, VBSP lump containers,
//! brush geometry, and flex rule programs.

/// Byte cursor, header decoding, lump containers, geometry, and flex compilation.
pub mod source;

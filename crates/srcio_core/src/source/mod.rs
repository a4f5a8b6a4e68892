mod bsp;
mod bytes;
mod compression;
mod error;
mod fixed;
mod flex;
mod geometry;
mod header;
/// Lump ids, descriptors, record types, and per-lump decoders.
pub mod lump;
mod registry;
mod skin;

/// VBSP container with lazily decoded, memoized lumps.
pub use bsp::{BSP_MAGIC, BspFile, BspHeader, BspOptions};
/// Bounds-checked little-endian cursor.
pub use bytes::Cursor;
/// LZMA lump envelope detection and decompression.
pub use compression::{Compression, LZMA_HEADER_LEN, LZMA_MAGIC, LzmaHeader, MAX_DECOMPRESSED_BYTES, decompress_lump, is_lzma};
/// Error and result aliases.
pub use error::{Result, SourceError};
/// Fixed-layout format strings and decoded scalars.
pub use fixed::{FixedFormat, Scalar, ScalarKind};
/// Flex rule op streams, compiler, and expression trees.
pub use flex::{
	Expr, FlexController, FlexEnv, FlexNames, FlexOp, FlexOpcode, FlexRule, FlexRuleFailure, FlexRuleSet, FlexTables, compile_rule,
	compile_rules, read_flex_tables,
};
/// Brush model reconstruction and material resolution.
pub use geometry::{
	MaterialResolver, MaterialTable, MeshFace, NO_NAME, RawGeometry, ReconstructOptions, ReconstructedMesh, ResolvedMaterial, reconstruct,
	strip_patch_suffix,
};
/// Studio model header decoding.
pub use header::{HeaderOptions, HeaderReport, HeaderRevision, MDL_MAGIC, MdlHeader, StudioHdrFlags, TableRef};
/// Common lump types.
pub use lump::{Entity, GameVariant, LumpContext, LumpData, LumpDecoder, LumpDescriptor, LumpShape, NameTable};
/// Decoder registry keyed by lump id, lump version, BSP version, and game variant.
pub use registry::{LumpKey, LumpRegistry};
/// Model texture, search path, and skin family tables.
pub use skin::{SkinTables, StudioTexture, read_skin_tables};

//! Fixed-schema flat encoding of [`SimParams`]
//!
//! The kernel reads the parameter block as consecutive f32 values:
//!
//! | floats  | bytes    | group                                   |
//! |---------|----------|-----------------------------------------|
//! | 0..4    | 0..16    | scales, gas constant                    |
//! | 4..8    | 16..32   | rest density, dt, smoothing radius, visc|
//! | 8..12   | 32..48   | gravity, mass, eps, bounce damping      |
//! | 12..16  | 48..64   | min domain bound (xyz, pad)             |
//! | 16..20  | 64..80   | max domain bound (xyz, pad)             |
//! | 20..24  | 80..96   | cursor position + radius (extension)    |
//! | 24..28  | 96..112  | pad + cursor strength (extension)       |

use thiserror::Error;

use crate::cursor::CursorState;
use crate::params::SimParams;

/// Floats in groups 1-5
pub const CORE_FLOATS: usize = 20;

/// Floats in the cursor extension (groups 6-7)
pub const CURSOR_FLOATS: usize = 8;

/// Float offset of the cursor extension inside the block
pub const CURSOR_OFFSET_FLOATS: usize = CORE_FLOATS;

/// Byte offset of the cursor extension inside the block
pub const CURSOR_OFFSET_BYTES: u64 = (CURSOR_OFFSET_FLOATS * 4) as u64;

const _: () = assert!(std::mem::size_of::<SimParams>() == (CORE_FLOATS + CURSOR_FLOATS) * 4);
const _: () = assert!(std::mem::offset_of!(SimParams, min_domain_bound) == 48);
const _: () = assert!(std::mem::offset_of!(SimParams, max_domain_bound) == 64);
const _: () = assert!(std::mem::offset_of!(SimParams, cursor_data) == CURSOR_OFFSET_BYTES as usize);
const _: () = assert!(std::mem::offset_of!(SimParams, cursor_force) == 96);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("parameter block is {actual} bytes but the {schema:?} schema requires {expected}")]
    SizeMismatch {
        schema: ParamSchema,
        expected: u64,
        actual: u64,
    },
    #[error("parameter buffer has {0} floats, which matches no known schema")]
    UnknownLength(usize),
    #[error("the {0:?} schema has no cursor extension")]
    NoCursorExtension(ParamSchema),
    #[error("upload of {len} bytes at offset {offset} does not fit a {size} byte block")]
    OutOfRange { offset: u64, len: u64, size: u64 },
}

/// Which groups a parameter block carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamSchema {
    /// Groups 1-5 (density/forces core)
    Core,
    /// Groups 1-7 (core + cursor position/radius/strength)
    WithCursor,
}

impl ParamSchema {
    pub const fn float_count(self) -> usize {
        match self {
            Self::Core => CORE_FLOATS,
            Self::WithCursor => CORE_FLOATS + CURSOR_FLOATS,
        }
    }

    pub const fn byte_size(self) -> u64 {
        (self.float_count() * 4) as u64
    }

    pub const fn has_cursor(self) -> bool {
        matches!(self, Self::WithCursor)
    }

    pub fn from_float_count(len: usize) -> Result<Self, LayoutError> {
        match len {
            CORE_FLOATS => Ok(Self::Core),
            n if n == CORE_FLOATS + CURSOR_FLOATS => Ok(Self::WithCursor),
            n => Err(LayoutError::UnknownLength(n)),
        }
    }

    /// Fails when `actual` bytes of storage cannot hold exactly this schema
    pub fn check_size(self, actual: u64) -> Result<(), LayoutError> {
        if actual == self.byte_size() {
            Ok(())
        } else {
            Err(LayoutError::SizeMismatch {
                schema: self,
                expected: self.byte_size(),
                actual,
            })
        }
    }
}

impl SimParams {
    /// Flatten into the kernel layout for `schema`
    pub fn encode(&self, schema: ParamSchema) -> Vec<f32> {
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(self));
        floats[..schema.float_count()].to_vec()
    }

    pub fn encode_bytes(&self, schema: ParamSchema) -> Vec<u8> {
        bytemuck::cast_slice(&self.encode(schema)).to_vec()
    }

    /// Rebuild a record from a flat buffer, inferring the schema from its length.
    ///
    /// A core-only buffer decodes with an inactive cursor at the origin.
    pub fn decode(floats: &[f32]) -> Result<(Self, ParamSchema), LayoutError> {
        let schema = ParamSchema::from_float_count(floats.len())?;
        let mut params: SimParams = bytemuck::Zeroable::zeroed();
        let dst: &mut [f32] = bytemuck::cast_slice_mut(std::slice::from_mut(&mut params));
        dst[..floats.len()].copy_from_slice(floats);
        Ok((params, schema))
    }

    /// Byte-level counterpart of [`SimParams::decode`]
    pub fn decode_bytes(bytes: &[u8]) -> Result<(Self, ParamSchema), LayoutError> {
        if bytes.len() % 4 != 0 {
            return Err(LayoutError::UnknownLength(bytes.len() / 4));
        }
        let floats: Vec<f32> = bytemuck::pod_collect_to_vec(bytes);
        Self::decode(&floats)
    }

    /// Copy cursor state into groups 6-7
    pub fn apply_cursor(&mut self, cursor: &CursorState) {
        let [data, force] = cursor.encode();
        self.cursor_data = data;
        self.cursor_force = force;
    }
}

impl CursorState {
    /// Groups 6-7 as laid out in the block
    pub fn encode(&self) -> [[f32; 4]; 2] {
        [
            [
                self.position.x,
                self.position.y,
                self.position.z,
                self.radius,
            ],
            [0.0, 0.0, 0.0, self.strength],
        ]
    }

    /// Groups 6-7 flattened for a partial upload at [`CURSOR_OFFSET_BYTES`]
    pub fn encode_flat(&self) -> [f32; CURSOR_FLOATS] {
        let [d, f] = self.encode();
        [d[0], d[1], d[2], d[3], f[0], f[1], f[2], f[3]]
    }
}

//! The `.jmesh` file layout.
//!
//! ```text
//! Header (16 bytes, absent from legacy files):
//!   magic:    [u8; 4] = b"JMSH"
//!   version:  u32 LE  = 1
//!   flags:    u32 LE  (see `Flags`)
//!   checksum: u32 LE  (CRC-32 of everything after the header)
//!
//! Six blocks, each `[i32 LE byte length][bytes]`:
//!   meshlets           68 bytes each
//!   vertices           3 x f32
//!   normals            3 x f32
//!   tangents           4 x f32
//!   meshlet triangles  u32 each, or u8 each with `Flags::PACKED_TRIANGLES`
//!   meshlet vertices   u32 each
//! ```
//!
//! All values are little endian and written field by field. Element counts are the block length
//! divided by the element size.

use {
    super::{IndexWidth, MeshData, Meshlet, Vec3},
    bitflags::bitflags,
    log::{trace, warn},
    serde::{Deserialize, Serialize},
    std::io::{Error, ErrorKind, Read, Write},
};

/// Size of one encoded [`Meshlet`].
pub const MESHLET_RECORD_SIZE: usize = 4 * 4 + 4 * 3 * 4 + 4;

const VEC3_SIZE: usize = 12;
const VEC4_SIZE: usize = 16;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
    pub struct Flags: u32 {
        const HAS_NORMALS = 1 << 0;
        const HAS_TANGENTS = 1 << 1;
        const PACKED_TRIANGLES = 1 << 2;
    }
}

impl Flags {
    fn triangle_width(self) -> IndexWidth {
        if self.contains(Self::PACKED_TRIANGLES) {
            IndexWidth::U8
        } else {
            IndexWidth::U32
        }
    }
}

/// Leading record of versioned `.jmesh` files.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Header {
    magic: [u8; 4],
    pub version: u32,
    pub flags: Flags,
    pub checksum: u32,
}

impl Header {
    pub const MAGIC: [u8; 4] = *b"JMSH";
    pub const SIZE: usize = 16;
    pub const VERSION: u32 = 1;

    pub fn new(flags: Flags, checksum: u32) -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            flags,
            checksum,
        }
    }

    fn config() -> impl bincode::config::Config {
        bincode::config::standard()
            .with_little_endian()
            .with_fixed_int_encoding()
    }

    /// Reads a header from the start of `buf`, or `None` when `buf` holds a legacy file.
    pub fn decode(buf: &[u8]) -> Result<Option<Self>, Error> {
        if !buf.starts_with(&Self::MAGIC) {
            return Ok(None);
        }

        let (header, _): (Self, _) = bincode::serde::decode_from_slice(buf, Self::config())
            .map_err(|err| {
                warn!("Unable to read header: {err}");

                Error::from(ErrorKind::InvalidData)
            })?;

        if header.version != Self::VERSION {
            warn!("Unsupported version {}", header.version);

            return Err(Error::from(ErrorKind::InvalidData));
        }

        if !Flags::all().contains(header.flags) {
            warn!("Unsupported flags {:#x}", header.flags.bits());

            return Err(Error::from(ErrorKind::InvalidData));
        }

        Ok(Some(header))
    }

    pub fn encode(&self, mut writer: impl Write) -> Result<(), Error> {
        bincode::serde::encode_into_std_write(self, &mut writer, Self::config())
            .map_err(|_| Error::from(ErrorKind::InvalidData))?;

        Ok(())
    }
}

/// Writes `data` as a versioned file, or as a headerless legacy file when `legacy` is set.
pub(crate) fn write_mesh_data(
    mut writer: impl Write,
    data: &MeshData,
    legacy: bool,
    triangles: IndexWidth,
) -> Result<(), Error> {
    if legacy && triangles != IndexWidth::U32 {
        warn!("Legacy files only support 32-bit triangle indices");

        return Err(Error::from(ErrorKind::InvalidInput));
    }

    let payload = encode_payload(data, triangles);

    if !legacy {
        let mut flags = Flags::empty();
        flags.set(Flags::HAS_NORMALS, !data.normals.is_empty());
        flags.set(Flags::HAS_TANGENTS, !data.tangents.is_empty());
        flags.set(Flags::PACKED_TRIANGLES, triangles == IndexWidth::U8);

        Header::new(flags, crc32fast::hash(&payload)).encode(&mut writer)?;
    }

    writer.write_all(&payload)
}

/// Reads either file layout and checks the meshlet ranges of the result.
pub(crate) fn read_mesh_data(mut reader: impl Read) -> Result<MeshData, Error> {
    let mut buf = vec![];
    reader.read_to_end(&mut buf)?;

    let data = if let Some(header) = Header::decode(&buf)? {
        let payload = &buf[Header::SIZE..];

        if crc32fast::hash(payload) != header.checksum {
            warn!("Checksum mismatch");

            return Err(Error::from(ErrorKind::InvalidData));
        }

        let data = decode_payload(payload, header.flags.triangle_width())?;

        if header.flags.contains(Flags::HAS_NORMALS) == data.normals.is_empty()
            || header.flags.contains(Flags::HAS_TANGENTS) == data.tangents.is_empty()
        {
            warn!("Attribute flags do not match stored attributes");

            return Err(Error::from(ErrorKind::InvalidData));
        }

        data
    } else {
        trace!("Reading legacy layout");

        decode_payload(&buf, IndexWidth::U32)?
    };

    data.validate()?;

    Ok(data)
}

fn encode_payload(data: &MeshData, triangles: IndexWidth) -> Vec<u8> {
    let mut buf = Vec::with_capacity(
        6 * 4
            + data.meshlets.len() * MESHLET_RECORD_SIZE
            + (data.vertices.len() + data.normals.len()) * VEC3_SIZE
            + data.tangents.len() * VEC4_SIZE
            + data.meshlet_triangles.len() * triangles.size()
            + data.meshlet_vertices.len() * 4,
    );

    trace!(
        "Writing {} meshlet{}",
        data.meshlets.len(),
        if data.meshlets.len() == 1 { "" } else { "s" }
    );

    let mut block = Vec::with_capacity(data.meshlets.len() * MESHLET_RECORD_SIZE);
    for meshlet in &data.meshlets {
        encode_meshlet(&mut block, meshlet);
    }
    write_block(&mut buf, &block);

    trace!("Writing {} vertices", data.vertices.len());
    write_block(&mut buf, &encode_floats(&data.vertices));

    trace!("Writing {} normals", data.normals.len());
    write_block(&mut buf, &encode_floats(&data.normals));

    trace!("Writing {} tangents", data.tangents.len());
    write_block(&mut buf, &encode_floats(&data.tangents));

    trace!(
        "Writing {} meshlet triangle indices ({triangles:?})",
        data.meshlet_triangles.len()
    );
    write_block(&mut buf, &triangles.encode(&data.meshlet_triangles));

    trace!("Writing {} meshlet vertices", data.meshlet_vertices.len());
    let mut block = Vec::with_capacity(data.meshlet_vertices.len() * 4);
    for idx in &data.meshlet_vertices {
        block.extend_from_slice(&idx.to_le_bytes());
    }
    write_block(&mut buf, &block);

    buf
}

fn decode_payload(buf: &[u8], triangles: IndexWidth) -> Result<MeshData, Error> {
    let mut blocks = Blocks { buf };

    let meshlets = blocks
        .next("meshlets", MESHLET_RECORD_SIZE)?
        .chunks_exact(MESHLET_RECORD_SIZE)
        .map(decode_meshlet)
        .collect();
    let vertices = decode_floats::<3>(blocks.next("vertices", VEC3_SIZE)?);
    let normals = decode_floats::<3>(blocks.next("normals", VEC3_SIZE)?);
    let tangents = decode_floats::<4>(blocks.next("tangents", VEC4_SIZE)?);
    let meshlet_triangles = triangles.decode(blocks.next("triangles", triangles.size())?)?;
    let meshlet_vertices = blocks
        .next("meshlet vertices", 4)?
        .chunks_exact(4)
        .map(|data| u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
        .collect();

    if !blocks.buf.is_empty() {
        warn!("{} unexpected trailing bytes", blocks.buf.len());

        return Err(Error::from(ErrorKind::InvalidData));
    }

    Ok(MeshData {
        meshlets,
        vertices,
        normals,
        tangents,
        meshlet_triangles,
        meshlet_vertices,
    })
}

fn write_block(buf: &mut Vec<u8>, block: &[u8]) {
    trace!("Block: {} bytes", block.len());

    buf.extend_from_slice(&(block.len() as i32).to_le_bytes());
    buf.extend_from_slice(block);
}

/// Sequential reader of length-prefixed blocks.
struct Blocks<'a> {
    buf: &'a [u8],
}

impl<'a> Blocks<'a> {
    fn next(&mut self, name: &str, element_size: usize) -> Result<&'a [u8], Error> {
        let Some((len, rest)) = self.buf.split_first_chunk::<4>() else {
            warn!("Missing {name} block length");

            return Err(Error::from(ErrorKind::UnexpectedEof));
        };

        let len = usize::try_from(i32::from_le_bytes(*len)).map_err(|_| {
            warn!("Negative {name} block length");

            Error::from(ErrorKind::InvalidData)
        })?;

        if len > rest.len() {
            warn!("Truncated {name} block: {len} bytes expected, {} found", rest.len());

            return Err(Error::from(ErrorKind::UnexpectedEof));
        }

        if len % element_size != 0 {
            warn!("{name} block of {len} bytes is not a multiple of {element_size}");

            return Err(Error::from(ErrorKind::InvalidData));
        }

        let (block, rest) = rest.split_at(len);
        self.buf = rest;

        trace!("Read {name}: {len} bytes");

        Ok(block)
    }
}

fn encode_floats<const N: usize>(vals: &[[f32; N]]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(vals.len() * N * 4);
    for val in vals.iter().flatten() {
        buf.extend_from_slice(&val.to_le_bytes());
    }

    buf
}

fn decode_floats<const N: usize>(buf: &[u8]) -> Vec<[f32; N]> {
    buf.chunks_exact(N * 4)
        .map(|data| {
            let mut fields = Fields { data };
            [0; N].map(|_| fields.f32())
        })
        .collect()
}

fn encode_meshlet(buf: &mut Vec<u8>, meshlet: &Meshlet) {
    buf.extend_from_slice(&meshlet.vertex_offset.to_le_bytes());
    buf.extend_from_slice(&meshlet.triangle_offset.to_le_bytes());
    buf.extend_from_slice(&meshlet.vertex_count.to_le_bytes());
    buf.extend_from_slice(&meshlet.triangle_count.to_le_bytes());

    for val in [meshlet.min, meshlet.max, meshlet.cone_apex, meshlet.cone_axis]
        .iter()
        .flatten()
    {
        buf.extend_from_slice(&val.to_le_bytes());
    }

    buf.extend_from_slice(&meshlet.cone_cutoff.to_le_bytes());
}

fn decode_meshlet(data: &[u8]) -> Meshlet {
    debug_assert_eq!(data.len(), MESHLET_RECORD_SIZE);

    let mut fields = Fields { data };

    Meshlet {
        vertex_offset: fields.u32(),
        triangle_offset: fields.u32(),
        vertex_count: fields.u32(),
        triangle_count: fields.u32(),
        min: fields.vec3(),
        max: fields.vec3(),
        cone_apex: fields.vec3(),
        cone_axis: fields.vec3(),
        cone_cutoff: fields.f32(),
    }
}

/// Little endian field cursor over a record which is known to be long enough.
struct Fields<'a> {
    data: &'a [u8],
}

impl Fields<'_> {
    fn u32(&mut self) -> u32 {
        let (val, rest) = self.data.split_at(4);
        self.data = rest;

        u32::from_le_bytes([val[0], val[1], val[2], val[3]])
    }

    fn f32(&mut self) -> f32 {
        f32::from_bits(self.u32())
    }

    fn vec3(&mut self) -> Vec3 {
        [self.f32(), self.f32(), self.f32()]
    }
}

use {
    log::warn,
    serde::{Deserialize, Serialize},
    std::io::{Error, ErrorKind},
};

/// Storage width of meshlet-local triangle indices on disk.
///
/// Local indices always fit a byte; `U32` widens each of them to four bytes which is what the
/// legacy layout stores.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum IndexWidth {
    U8,
    #[default]
    U32,
}

impl IndexWidth {
    /// Size in bytes of one stored index.
    pub fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U32 => 4,
        }
    }

    pub fn encode(self, indices: &[u8]) -> Vec<u8> {
        match self {
            Self::U8 => indices.to_vec(),
            Self::U32 => {
                let mut buf = Vec::with_capacity(indices.len() << 2);
                for &idx in indices {
                    buf.extend_from_slice(&(idx as u32).to_le_bytes());
                }

                buf
            }
        }
    }

    pub fn decode(self, buf: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            Self::U8 => Ok(buf.to_vec()),
            Self::U32 => {
                if buf.len() % 4 != 0 {
                    warn!("Triangle block of {} bytes is not a multiple of 4", buf.len());

                    return Err(Error::from(ErrorKind::InvalidData));
                }

                let mut res = Vec::with_capacity(buf.len() >> 2);
                for data in buf.chunks_exact(4) {
                    let idx = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
                    let idx = u8::try_from(idx).map_err(|_| {
                        warn!("Triangle index {idx} does not fit a meshlet");

                        Error::from(ErrorKind::InvalidData)
                    })?;
                    res.push(idx);
                }

                Ok(res)
            }
        }
    }

    /// Number of indices stored in `byte_len` bytes.
    pub fn count(self, byte_len: usize) -> usize {
        byte_len / self.size()
    }
}

use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::errors::RepositoryError;
use byteorder::{ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct IndexHeader {
    pub marker: String,
    pub version: u32,
    pub entries_count: u32,
}

impl IndexHeader {
    pub fn for_entries(entries_count: u32) -> Self {
        IndexHeader::new(String::from(SIGNATURE), VERSION, entries_count)
    }

    /// Signature and version check.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.marker != SIGNATURE {
            return Err(RepositoryError::IndexCorrupt(format!(
                "invalid signature '{}'",
                self.marker
            ))
            .into());
        }

        if self.version != VERSION {
            return Err(RepositoryError::IndexCorrupt(format!(
                "unsupported version {}",
                self.version
            ))
            .into());
        }

        Ok(())
    }
}

impl Packable for IndexHeader {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.write_all(self.marker.as_bytes())?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.version)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.entries_count)?;

        Ok(Bytes::from(bytes))
    }
}

impl Unpackable for IndexHeader {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut reader = reader;
        let corrupt = |_| RepositoryError::IndexCorrupt("truncated header".into());

        let mut marker = [0u8; 4];
        reader.read_exact(&mut marker).map_err(corrupt)?;
        let version = reader
            .read_u32::<byteorder::NetworkEndian>()
            .map_err(corrupt)?;
        let entries_count = reader
            .read_u32::<byteorder::NetworkEndian>()
            .map_err(corrupt)?;

        Ok(IndexHeader {
            marker: String::from_utf8_lossy(&marker).into_owned(),
            version,
            entries_count,
        })
    }
}

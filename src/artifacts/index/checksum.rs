//! SHA-1 accumulating reader/writer for the index file

use crate::artifacts::index::CHECKSUM_SIZE;
use crate::errors::RepositoryError;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};

/// Wraps the index file and hashes every byte that passes through it, so
/// the trailer can be written or verified once the body is done.
#[derive(Debug)]
pub struct Checksum<F> {
    file: F,
    digest: Sha1,
}

impl<F> Checksum<F> {
    pub fn new(file: F) -> Self {
        Checksum {
            file,
            digest: Sha1::new(),
        }
    }

    pub fn into_inner(self) -> F {
        self.file
    }
}

impl<F: Read> Checksum<F> {
    pub fn read(&mut self, size: usize) -> anyhow::Result<Bytes> {
        let mut buffer = vec![0; size];
        self.file.read_exact(&mut buffer).map_err(|_| {
            RepositoryError::IndexCorrupt("unexpected end-of-file while reading index".into())
        })?;

        self.digest.update(&buffer);
        Ok(Bytes::from(buffer))
    }

    /// Compare the stored trailer against everything read so far.
    pub fn verify(&mut self) -> anyhow::Result<()> {
        let mut expected = [0u8; CHECKSUM_SIZE];
        self.file.read_exact(&mut expected).map_err(|_| {
            RepositoryError::IndexCorrupt("missing checksum trailer".into())
        })?;

        if expected != self.digest.clone().finalize().as_slice() {
            return Err(RepositoryError::IndexCorrupt(
                "checksum does not match value stored on disk".into(),
            )
            .into());
        }

        let mut rest = [0u8; 1];
        if self.file.read(&mut rest)? != 0 {
            return Err(
                RepositoryError::IndexCorrupt("trailing bytes after checksum".into()).into(),
            );
        }

        Ok(())
    }
}

impl<F: Write> Checksum<F> {
    pub fn write(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.file.write_all(data)?;
        self.digest.update(data);
        Ok(())
    }

    pub fn write_checksum(&mut self) -> anyhow::Result<()> {
        let checksum = self.digest.clone().finalize();
        self.file.write_all(checksum.as_slice())?;
        Ok(())
    }
}

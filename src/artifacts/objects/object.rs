use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use anyhow::Result;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::BufRead;

/// Encode a value into its raw byte form (object payload, index record, ...).
pub trait Packable {
    fn serialize(&self) -> Result<Bytes>;
}

/// Decode a value from its raw byte form.
pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}

pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    fn display(&self) -> String;

    fn object_id(&self) -> Result<ObjectId> {
        hash_object(self.object_type(), &self.serialize()?)
    }
}

/// Prefix a payload with its `<type> <size>\0` header.
pub fn frame(object_type: ObjectType, payload: &[u8]) -> Bytes {
    let header = format!("{} {}\0", object_type.as_str(), payload.len());

    let mut framed = Vec::with_capacity(header.len() + payload.len());
    framed.extend_from_slice(header.as_bytes());
    framed.extend_from_slice(payload);

    Bytes::from(framed)
}

/// Content address of a payload of the given kind.
pub fn hash_object(object_type: ObjectType, payload: &[u8]) -> Result<ObjectId> {
    hash_framed(&frame(object_type, payload))
}

pub(crate) fn hash_framed(framed: &[u8]) -> Result<ObjectId> {
    let mut hasher = Sha1::new();
    hasher.update(framed);

    ObjectId::from_digest(hasher.finalize().as_slice())
}

pub enum ObjectBox {
    Blob(Box<Blob>),
    Tree(Box<Tree>),
    Commit(Box<Commit>),
}

impl ObjectBox {
    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectBox::Blob(_) => ObjectType::Blob,
            ObjectBox::Tree(_) => ObjectType::Tree,
            ObjectBox::Commit(_) => ObjectType::Commit,
        }
    }

    pub fn display(&self) -> String {
        match self {
            ObjectBox::Blob(blob) => blob.display(),
            ObjectBox::Tree(tree) => tree.display(),
            ObjectBox::Commit(commit) => commit.display(),
        }
    }
}

//! Row key encoding.

use std::fmt;

use inspectr_proto::PrimaryKey;

const TAG_INT: u8 = 0;
const TAG_STR: u8 = 1;
const TAG_UUID: u8 = 2;

/// Key of one stored row.
///
/// Key format: `[entity name][0x00][tag (1 byte)][primary key bytes]`
///
/// Integer keys are stored big-endian with the sign bit flipped, so a prefix
/// scan over one entity returns rows in `PrimaryKey` order.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    /// Entity name.
    pub entity: String,
    /// Primary key of the row.
    pub pk: PrimaryKey,
}

impl RowKey {
    /// Create a new row key.
    pub fn new(entity: impl Into<String>, pk: PrimaryKey) -> Self {
        Self {
            entity: entity.into(),
            pk,
        }
    }

    /// Encode the key to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = entity_prefix(&self.entity);
        encode_pk(&mut buf, &self.pk);
        buf
    }

    /// Decode a key from bytes.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let sep = bytes.iter().position(|b| *b == 0)?;
        let entity = std::str::from_utf8(&bytes[..sep]).ok()?.to_string();
        let pk = decode_pk(&bytes[sep + 1..])?;
        Some(Self { entity, pk })
    }
}

/// Prefix shared by every row of an entity.
pub fn entity_prefix(entity: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(entity.len() + 1);
    prefix.extend_from_slice(entity.as_bytes());
    prefix.push(0);
    prefix
}

fn encode_pk(buf: &mut Vec<u8>, pk: &PrimaryKey) {
    match pk {
        PrimaryKey::Int(i) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&((*i as u64) ^ (1 << 63)).to_be_bytes());
        }
        PrimaryKey::Str(s) => {
            buf.push(TAG_STR);
            buf.extend_from_slice(s.as_bytes());
        }
        PrimaryKey::Uuid(u) => {
            buf.push(TAG_UUID);
            buf.extend_from_slice(u);
        }
    }
}

fn decode_pk(bytes: &[u8]) -> Option<PrimaryKey> {
    let (tag, rest) = bytes.split_first()?;
    match *tag {
        TAG_INT => {
            let raw: [u8; 8] = rest.try_into().ok()?;
            Some(PrimaryKey::Int((u64::from_be_bytes(raw) ^ (1 << 63)) as i64))
        }
        TAG_STR => std::str::from_utf8(rest)
            .ok()
            .map(|s| PrimaryKey::Str(s.to_string())),
        TAG_UUID => rest.try_into().ok().map(PrimaryKey::Uuid),
        _ => None,
    }
}

impl fmt::Debug for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowKey")
            .field("entity", &self.entity)
            .field("pk", &format_args!("{}", self.pk))
            .finish()
    }
}

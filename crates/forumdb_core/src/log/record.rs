//! Commit log record types and framing.

use crate::error::{CoreError, CoreResult};
use crate::types::{SequenceNumber, TransactionId};

/// Magic bytes opening every log record.
pub const LOG_MAGIC: [u8; 4] = *b"FDBL";

/// Current log format version.
pub const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
pub const HEADER_SIZE: usize = 11;

/// Trailing CRC32.
pub const CRC_SIZE: usize = 4;

/// Longest bucket name the format can carry.
pub const MAX_BUCKET_NAME: usize = u16::MAX as usize;

/// Longest key or value the format can carry.
pub const MAX_FIELD: usize = u32::MAX as usize;

/// Type tag of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogRecordType {
    /// Create a bucket.
    CreateBucket = 1,
    /// Store a value under a key.
    Put = 2,
    /// Remove a key.
    Delete = 3,
    /// Make every preceding record of the transaction visible.
    Commit = 4,
}

impl LogRecordType {
    /// Converts a byte to a record type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::CreateBucket),
            2 => Some(Self::Put),
            3 => Some(Self::Delete),
            4 => Some(Self::Commit),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Largest payload a record of this type can carry.
    #[must_use]
    pub const fn max_payload_len(self) -> u64 {
        const TXID: u64 = 8;
        const BUCKET: u64 = 2 + MAX_BUCKET_NAME as u64;
        const FIELD: u64 = 4 + MAX_FIELD as u64;
        match self {
            Self::CreateBucket => TXID + BUCKET,
            Self::Put => TXID + BUCKET + 2 * FIELD,
            Self::Delete => TXID + BUCKET + FIELD,
            Self::Commit => TXID + 8,
        }
    }
}

/// One entry of the commit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// Create a bucket if it does not exist.
    CreateBucket {
        /// Owning transaction.
        txid: TransactionId,
        /// Bucket name.
        bucket: String,
    },

    /// Store `value` under `key` in `bucket`.
    Put {
        /// Owning transaction.
        txid: TransactionId,
        /// Bucket name.
        bucket: String,
        /// Key within the bucket.
        key: String,
        /// Stored bytes; may be empty.
        value: Vec<u8>,
    },

    /// Remove `key` from `bucket`.
    Delete {
        /// Owning transaction.
        txid: TransactionId,
        /// Bucket name.
        bucket: String,
        /// Key within the bucket.
        key: String,
    },

    /// Commit marker.
    Commit {
        /// Committed transaction.
        txid: TransactionId,
        /// Position in the commit order.
        sequence: SequenceNumber,
    },
}

impl LogRecord {
    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> LogRecordType {
        match self {
            Self::CreateBucket { .. } => LogRecordType::CreateBucket,
            Self::Put { .. } => LogRecordType::Put,
            Self::Delete { .. } => LogRecordType::Delete,
            Self::Commit { .. } => LogRecordType::Commit,
        }
    }

    /// Returns the owning transaction.
    #[must_use]
    pub fn txid(&self) -> TransactionId {
        match self {
            Self::CreateBucket { txid, .. }
            | Self::Put { txid, .. }
            | Self::Delete { txid, .. }
            | Self::Commit { txid, .. } => *txid,
        }
    }

    /// Serializes the record payload (without framing).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TooLarge`] if a field exceeds its length prefix.
    pub fn encode_payload(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.txid().as_u64().to_le_bytes());

        match self {
            Self::CreateBucket { bucket, .. } => {
                put_bucket(&mut buf, bucket)?;
            }
            Self::Put {
                bucket, key, value, ..
            } => {
                put_bucket(&mut buf, bucket)?;
                put_field(&mut buf, "key", key.as_bytes())?;
                put_field(&mut buf, "value", value)?;
            }
            Self::Delete { bucket, key, .. } => {
                put_bucket(&mut buf, bucket)?;
                put_field(&mut buf, "key", key.as_bytes())?;
            }
            Self::Commit { sequence, .. } => {
                buf.extend_from_slice(&sequence.as_u64().to_le_bytes());
            }
        }

        Ok(buf)
    }

    /// Deserializes a payload of the given type. `offset` is only used in
    /// error messages.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LogCorruption`] if the payload is short, carries
    /// invalid UTF-8 or has trailing bytes.
    pub fn decode_payload(
        record_type: LogRecordType,
        payload: &[u8],
        offset: u64,
    ) -> CoreResult<Self> {
        let mut reader = PayloadReader {
            payload,
            cursor: 0,
            offset,
        };
        let txid = TransactionId::new(reader.u64()?);

        let record = match record_type {
            LogRecordType::CreateBucket => Self::CreateBucket {
                txid,
                bucket: reader.bucket()?,
            },
            LogRecordType::Put => Self::Put {
                txid,
                bucket: reader.bucket()?,
                key: reader.text_field()?,
                value: reader.field()?.to_vec(),
            },
            LogRecordType::Delete => Self::Delete {
                txid,
                bucket: reader.bucket()?,
                key: reader.text_field()?,
            },
            LogRecordType::Commit => Self::Commit {
                txid,
                sequence: SequenceNumber::new(reader.u64()?),
            },
        };

        reader.finish(record_type)?;
        Ok(record)
    }

    /// Encodes the full framed record: header, payload and CRC.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let len = u32::try_from(payload.len()).map_err(|_| CoreError::TooLarge {
            what: "log record",
            len: payload.len(),
            max: MAX_FIELD,
        })?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&LOG_MAGIC);
        data.extend_from_slice(&LOG_VERSION.to_le_bytes());
        data.push(self.record_type().as_byte());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }

    /// Decodes one framed record from the front of `buf`.
    ///
    /// Returns `Ok(None)` when `buf` ends before the record does (a torn
    /// write), otherwise the record and the number of bytes it occupied.
    ///
    /// # Errors
    ///
    /// Bad magic, unknown version or type, a length no record of that type
    /// can have, CRC mismatch and malformed payloads are all errors.
    pub fn decode(buf: &[u8], offset: u64) -> CoreResult<Option<(Self, usize)>> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }

        if buf[0..4] != LOG_MAGIC {
            return Err(CoreError::log_corruption(offset, "invalid magic"));
        }

        let version = u16::from_le_bytes([buf[4], buf[5]]);
        if version > LOG_VERSION {
            return Err(CoreError::log_corruption(
                offset,
                format!("unsupported version {version}"),
            ));
        }

        let type_byte = buf[6];
        let record_type = LogRecordType::from_byte(type_byte).ok_or_else(|| {
            CoreError::log_corruption(offset, format!("unknown record type {type_byte}"))
        })?;

        let payload_len = u32::from_le_bytes([buf[7], buf[8], buf[9], buf[10]]) as usize;
        if payload_len as u64 > record_type.max_payload_len() {
            return Err(CoreError::log_corruption(
                offset,
                format!("{record_type:?} record claims {payload_len} payload bytes"),
            ));
        }
        let total_len = HEADER_SIZE + payload_len + CRC_SIZE;
        if buf.len() < total_len {
            return Ok(None);
        }

        let payload_end = HEADER_SIZE + payload_len;
        let stored_crc = u32::from_le_bytes([
            buf[payload_end],
            buf[payload_end + 1],
            buf[payload_end + 2],
            buf[payload_end + 3],
        ]);
        let computed_crc = compute_crc32(&buf[..payload_end]);
        if stored_crc != computed_crc {
            return Err(CoreError::ChecksumMismatch {
                offset,
                expected: stored_crc,
                actual: computed_crc,
            });
        }

        let record = Self::decode_payload(record_type, &buf[HEADER_SIZE..payload_end], offset)?;
        Ok(Some((record, total_len)))
    }
}

fn put_bucket(buf: &mut Vec<u8>, bucket: &str) -> CoreResult<()> {
    let len = u16::try_from(bucket.len()).map_err(|_| CoreError::TooLarge {
        what: "bucket name",
        len: bucket.len(),
        max: MAX_BUCKET_NAME,
    })?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(bucket.as_bytes());
    Ok(())
}

fn put_field(buf: &mut Vec<u8>, what: &'static str, data: &[u8]) -> CoreResult<()> {
    let len = u32::try_from(data.len()).map_err(|_| CoreError::TooLarge {
        what,
        len: data.len(),
        max: MAX_FIELD,
    })?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(data);
    Ok(())
}

struct PayloadReader<'a> {
    payload: &'a [u8],
    cursor: usize,
    offset: u64,
}

impl<'a> PayloadReader<'a> {
    fn take(&mut self, len: usize) -> CoreResult<&'a [u8]> {
        let end = self
            .cursor
            .checked_add(len)
            .filter(|end| *end <= self.payload.len())
            .ok_or_else(|| CoreError::log_corruption(self.offset, "unexpected end of payload"))?;
        let bytes = &self.payload[self.cursor..end];
        self.cursor = end;
        Ok(bytes)
    }

    fn u64(&mut self) -> CoreResult<u64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    fn bucket(&mut self) -> CoreResult<String> {
        let len = self.take(2)?;
        let len = u16::from_le_bytes([len[0], len[1]]) as usize;
        let bytes = self.take(len)?;
        self.utf8(bytes)
    }

    fn field(&mut self) -> CoreResult<&'a [u8]> {
        let len = self.take(4)?;
        let len = u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize;
        self.take(len)
    }

    fn text_field(&mut self) -> CoreResult<String> {
        let bytes = self.field()?;
        self.utf8(bytes)
    }

    fn utf8(&self, bytes: &[u8]) -> CoreResult<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|_| CoreError::log_corruption(self.offset, "invalid UTF-8"))
    }

    fn finish(&self, record_type: LogRecordType) -> CoreResult<()> {
        if self.cursor != self.payload.len() {
            return Err(CoreError::log_corruption(
                self.offset,
                format!(
                    "{} trailing bytes in {record_type:?} record",
                    self.payload.len() - self.cursor
                ),
            ));
        }
        Ok(())
    }
}

/// Computes the IEEE CRC32 of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

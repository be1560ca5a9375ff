//! Lock payload wire format.
//!
//! Locks are opaque byte strings to the backing store; client and lock
//! cleaners on other workers must agree on the layout below. All integers are
//! little-endian.
//!
//! # Payload Layout
//!
//! ```text
//! ┌─────────┬─────────┬──────────────┬───────────────┬─────────────────┬──────────────┐
//! │ kind (1)│ role (1)│ start_ts (8) │ wall_time (8) │ addr len (2)+N  │ role payload │
//! └─────────┴─────────┴──────────────┴───────────────┴─────────────────┴──────────────┘
//!
//! role payload, primary (role = 0x01):
//! ┌───────────┬──────────────────────────────────────┐
//! │ count (4) │ count × [ coordinate │ kind (1) ]    │
//! └───────────┴──────────────────────────────────────┘
//!
//! role payload, secondary (role = 0x00):
//! ┌──────────────────────┐
//! │ primary coordinate   │
//! └──────────────────────┘
//!
//! coordinate:
//! ┌────────────────┬───────────────┬──────────────────┬─────────────────────┐
//! │ table len(2)+N │ row len(4)+N  │ family len(2)+N  │ qualifier len(2)+N  │
//! └────────────────┴───────────────┴──────────────────┴─────────────────────┘
//! ```
//!
//! The kind byte sits at a fixed offset zero so a lock can be serialized
//! **without** it and completed later: secondary prewrite ships one shared
//! kind-less payload for every column of the transaction, and the store
//! prepends each column's own kind byte when staging the lock. The lock's own
//! coordinate is never part of the payload; a lock read back from the lock
//! family gets its coordinate from the cell it was found under.

use crate::error::{Error, Result};
use crate::types::{CellKind, Column, ColumnCoordinate, TableName};
use std::fmt;

const ROLE_SECONDARY: u8 = 0x00;
const ROLE_PRIMARY: u8 = 0x01;

/// A transaction lock as staged in, or parsed from, the lock shadow family.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TxnLock {
    /// Kind of the mutation this lock guards. For the shared secondary
    /// payload this is a default that never reaches the wire.
    pub kind: CellKind,
    /// Start timestamp of the owning transaction.
    pub start_ts: u64,
    /// Wall time at commit start, for liveness judgments by remote cleaners.
    pub wall_time: u64,
    /// Stable address of the owning worker.
    pub client_address: Vec<u8>,
    /// Primary or secondary role.
    pub role: LockRole,
}

/// What a lock knows about the rest of its transaction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LockRole {
    /// The primary lock enumerates every non-primary mutation of the
    /// transaction, so a cleaner holding only the primary can find all
    /// secondaries.
    Primary {
        /// All secondary columns with their mutation kinds, in plan order.
        secondaries: Vec<(ColumnCoordinate, CellKind)>,
    },
    /// A secondary lock points back at the primary, the single ground truth
    /// for the transaction's outcome.
    Secondary {
        /// Coordinate of the primary column.
        primary: ColumnCoordinate,
    },
}

impl TxnLock {
    /// Create a primary lock.
    pub fn primary(
        kind: CellKind,
        start_ts: u64,
        wall_time: u64,
        client_address: Vec<u8>,
        secondaries: Vec<(ColumnCoordinate, CellKind)>,
    ) -> Self {
        TxnLock {
            kind,
            start_ts,
            wall_time,
            client_address,
            role: LockRole::Primary { secondaries },
        }
    }

    /// Create a secondary lock referencing the primary column.
    pub fn secondary(
        kind: CellKind,
        start_ts: u64,
        wall_time: u64,
        client_address: Vec<u8>,
        primary: ColumnCoordinate,
    ) -> Self {
        TxnLock {
            kind,
            start_ts,
            wall_time,
            client_address,
            role: LockRole::Secondary { primary },
        }
    }

    /// Whether this is a primary lock.
    pub fn is_primary(&self) -> bool {
        matches!(self.role, LockRole::Primary { .. })
    }

    /// Serialize the full payload, kind byte included.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.push(self.kind.code());
        self.encode_body(&mut buf);
        buf
    }

    /// Serialize the payload without the leading kind byte.
    ///
    /// Used for the shared secondary payload: the store prepends each
    /// column's own kind during prewrite, turning this into a full payload.
    pub fn encode_without_kind(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        self.encode_body(&mut buf);
        buf
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        match &self.role {
            LockRole::Primary { .. } => buf.push(ROLE_PRIMARY),
            LockRole::Secondary { .. } => buf.push(ROLE_SECONDARY),
        }
        buf.extend_from_slice(&self.start_ts.to_le_bytes());
        buf.extend_from_slice(&self.wall_time.to_le_bytes());
        put_bytes16(buf, &self.client_address);
        match &self.role {
            LockRole::Primary { secondaries } => {
                buf.extend_from_slice(&(secondaries.len() as u32).to_le_bytes());
                for (coordinate, kind) in secondaries {
                    put_coordinate(buf, coordinate);
                    buf.push(kind.code());
                }
            }
            LockRole::Secondary { primary } => put_coordinate(buf, primary),
        }
    }

    /// Parse a full payload (kind byte present).
    pub fn parse(bytes: &[u8]) -> Result<TxnLock> {
        let mut cur = Cursor::new(bytes);
        let kind = CellKind::from_code(cur.take_u8()?)
            .ok_or_else(|| malformed("unknown cell kind code"))?;
        let role = cur.take_u8()?;
        let start_ts = cur.take_u64()?;
        let wall_time = cur.take_u64()?;
        let client_address = cur.take_bytes16()?.to_vec();
        let role = match role {
            ROLE_PRIMARY => {
                let count = cur.take_u32()? as usize;
                let mut secondaries = Vec::with_capacity(count);
                for _ in 0..count {
                    let coordinate = cur.take_coordinate()?;
                    let kind = CellKind::from_code(cur.take_u8()?)
                        .ok_or_else(|| malformed("unknown secondary kind code"))?;
                    secondaries.push((coordinate, kind));
                }
                LockRole::Primary { secondaries }
            }
            ROLE_SECONDARY => LockRole::Secondary {
                primary: cur.take_coordinate()?,
            },
            _ => return Err(malformed("unknown lock role byte")),
        };
        if !cur.is_exhausted() {
            return Err(malformed("trailing bytes after lock payload"));
        }
        Ok(TxnLock {
            kind,
            start_ts,
            wall_time,
            client_address,
            role,
        })
    }
}

/// A lock observed on a concrete column, blocking a read or prewrite.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ConflictLock {
    /// Where the lock was observed.
    pub coordinate: ColumnCoordinate,
    /// The lock itself.
    pub lock: TxnLock,
}

impl fmt::Display for ConflictLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} held since start_ts {} by {}",
            self.coordinate,
            self.lock.start_ts,
            String::from_utf8_lossy(&self.lock.client_address)
        )
    }
}

fn malformed(what: &str) -> Error {
    Error::Fatal(format!("malformed lock payload: {what}"))
}

fn put_bytes16(buf: &mut Vec<u8>, bytes: &[u8]) {
    debug_assert!(bytes.len() <= u16::MAX as usize);
    buf.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn put_bytes32(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn put_coordinate(buf: &mut Vec<u8>, coordinate: &ColumnCoordinate) {
    put_bytes16(buf, coordinate.table().as_bytes());
    put_bytes32(buf, coordinate.row());
    put_bytes16(buf, coordinate.column().family());
    put_bytes16(buf, coordinate.column().qualifier());
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| malformed("truncated payload"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
    }

    fn take_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8-byte slice")))
    }

    fn take_bytes16(&mut self) -> Result<&'a [u8]> {
        let len = u16::from_le_bytes(self.take(2)?.try_into().expect("2-byte slice")) as usize;
        self.take(len)
    }

    fn take_bytes32(&mut self) -> Result<&'a [u8]> {
        let len = self.take_u32()? as usize;
        self.take(len)
    }

    fn take_coordinate(&mut self) -> Result<ColumnCoordinate> {
        let table = TableName::new(self.take_bytes16()?.to_vec());
        let row = self.take_bytes32()?.to_vec();
        let family = self.take_bytes16()?.to_vec();
        let qualifier = self.take_bytes16()?.to_vec();
        Ok(ColumnCoordinate::new(
            table,
            row,
            Column::new(family, qualifier),
        ))
    }

    fn is_exhausted(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

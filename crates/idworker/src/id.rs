use core::fmt;

/// A 64-bit Snowflake ID using the Twitter layout with a split machine id.
///
/// - 1 bit reserved (sign bit, always 0)
/// - 41 bits timestamp (ms since the worker's epoch)
/// - 5 bits datacenter ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21           17 16       12 11             0
///              +--------------+----------------+---------------+-----------+---------------+
///  Field:      | reserved (1) | timestamp (41) | datacenter (5)| worker (5)| sequence (12) |
///              +--------------+----------------+---------------+-----------+---------------+
///              |<---------------- MSB ------------- 64 bits ------------- LSB ------------>|
/// ```
///
/// IDs order numerically by timestamp first, so sorting them sorts by
/// generation time at millisecond resolution.
///
/// # Example
///
/// ```
/// use idworker::SnowflakeId;
///
/// let id = SnowflakeId::from_components(1000, 3, 2, 1);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.datacenter_id(), 3);
/// assert_eq!(id.worker_id(), 2);
/// assert_eq!(id.sequence(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Width of the sequence field.
    pub const SEQUENCE_BITS: u64 = 12;

    /// Width of the worker ID field.
    pub const WORKER_ID_BITS: u64 = 5;

    /// Width of the datacenter ID field.
    pub const DATACENTER_ID_BITS: u64 = 5;

    /// Width of the timestamp field.
    pub const TIMESTAMP_BITS: u64 = 41;

    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 22
    /// through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << Self::TIMESTAMP_BITS) - 1;

    /// Bitmask for extracting the 5-bit datacenter ID field. Occupies bits 17
    /// through 21.
    pub const DATACENTER_ID_MASK: u64 = (1 << Self::DATACENTER_ID_BITS) - 1;

    /// Bitmask for extracting the 5-bit worker ID field. Occupies bits 12
    /// through 16.
    pub const WORKER_ID_MASK: u64 = (1 << Self::WORKER_ID_BITS) - 1;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: u64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// Number of bits to shift the worker ID to its position (bit 12).
    pub const WORKER_ID_SHIFT: u64 = Self::SEQUENCE_BITS;

    /// Number of bits to shift the datacenter ID to its position (bit 17).
    pub const DATACENTER_ID_SHIFT: u64 = Self::SEQUENCE_BITS + Self::WORKER_ID_BITS;

    /// Number of bits to shift the timestamp to its position (bit 22).
    pub const TIMESTAMP_SHIFT: u64 =
        Self::SEQUENCE_BITS + Self::WORKER_ID_BITS + Self::DATACENTER_ID_BITS;

    pub const MAX_TIMESTAMP: u64 = Self::TIMESTAMP_MASK;
    pub const MAX_DATACENTER_ID: u64 = Self::DATACENTER_ID_MASK;
    pub const MAX_WORKER_ID: u64 = Self::WORKER_ID_MASK;
    pub const MAX_SEQUENCE: u64 = Self::SEQUENCE_MASK;

    /// Packs the four fields into an ID. Each field is masked to its width.
    pub const fn from_components(
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let datacenter_id =
            (datacenter_id & Self::DATACENTER_ID_MASK) << Self::DATACENTER_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | datacenter_id | worker_id | sequence,
        }
    }

    /// Wraps a raw value without checking the reserved bit. See
    /// [`Self::is_valid`].
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Extracts the timestamp from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the datacenter ID from the packed ID.
    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::DATACENTER_ID_MASK
    }

    /// Extracts the worker ID from the packed ID.
    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Returns the packed ID as its raw `u64` value.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Returns the ID as a signed 64-bit integer.
    ///
    /// The reserved bit is never set by a worker, so the value is always
    /// non-negative for generated IDs.
    pub const fn to_i64(&self) -> i64 {
        self.id as i64
    }

    /// Returns `true` if the reserved sign bit is clear.
    pub const fn is_valid(&self) -> bool {
        self.id >> 63 == 0
    }

    /// Returns the wall-clock time of this ID in milliseconds since the Unix
    /// epoch, given the epoch the issuing worker was anchored to. Saturates
    /// at `u64::MAX`.
    pub const fn unix_millis(&self, epoch_millis: u64) -> u64 {
        self.timestamp().saturating_add(epoch_millis)
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl From<SnowflakeId> for i64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_i64()
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("id", &format_args!("0x{:016x} ({})", self.id, self.id))
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SnowflakeId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        s.serialize_u64(self.id)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SnowflakeId {
    /// Deserializes a snowflake ID from its native integer representation,
    /// rejecting values with the reserved bit set.
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = <u64 as serde::Deserialize>::deserialize(d)?;
        let id = Self::from_raw(raw);
        if !id.is_valid() {
            return Err(serde::de::Error::custom(format_args!(
                "snowflake id {raw} has the reserved bit set"
            )));
        }
        Ok(id)
    }
}

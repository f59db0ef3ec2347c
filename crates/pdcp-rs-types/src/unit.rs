use bytes::Bytes;

/// 32 bit message authentication code for integrity protection
pub type MacI = [u8; 4];

/// A protocol data unit as it travels from the transmitter to the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Identifier of the payload, assigned by the submitting application
    pub payload_id: u64,

    /// Sequence number, the only part of the count that is carried on the wire
    pub sn: u32,

    /// Full count at the transmitter. Only kept for verification, the receiver never reads it.
    pub count_at_tx: u32,

    pub payload: Bytes,

    /// Integrity tag, if the transmitter protects its units
    pub mac: Option<MacI>,

    /// Set by the channel if the unit did not survive transmission
    pub corrupted: bool,
}

impl Unit {
    pub fn new(payload_id: u64, sn: u32, count_at_tx: u32, payload: Bytes) -> Self {
        Self {
            payload_id,
            sn,
            count_at_tx,
            payload,
            mac: None,
            corrupted: false,
        }
    }
}

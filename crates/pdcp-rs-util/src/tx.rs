use alloc::boxed::Box;
use bytes::Bytes;
use pdcp_rs_types::{
    count::{increment32, CountSpace, SnWidth},
    error::Error,
    unit::Unit,
};

use crate::integrity::IntegrityAlgorithm;

/// Sending side of a session. Numbers every submitted payload with the next count.
pub struct Transmitter {
    space: CountSpace,

    /// count assigned to the next submitted payload
    tx_next: u32,

    integrity: Option<Box<dyn IntegrityAlgorithm + Send>>,
}

impl Transmitter {
    pub fn new(width: SnWidth) -> Self {
        tracing::info!("transmitter initialized with {} sequence numbers", width);
        Self {
            space: CountSpace::new(width),
            tx_next: 0,
            integrity: None,
        }
    }

    pub fn try_from_bits(bits: u8) -> Result<Self, Error> {
        Ok(Self::new(SnWidth::try_from(bits)?))
    }

    /// Start numbering at `count` instead of zero
    pub fn with_initial_count(mut self, count: u32) -> Self {
        self.tx_next = count;
        self
    }

    /// Attach an integrity tag to every unit
    pub fn with_integrity(mut self, algorithm: impl IntegrityAlgorithm + Send + 'static) -> Self {
        self.integrity = Some(Box::new(algorithm));
        self
    }

    /// Build the unit for a payload and advance the count
    pub fn submit(&mut self, payload_id: u64, payload: impl Into<Bytes>) -> Unit {
        let count = self.tx_next;
        let mut unit = Unit::new(payload_id, self.space.sn_of(count), count, payload.into());
        if let Some(integrity) = &self.integrity {
            unit.mac = Some(integrity.authenticate(count, &unit.payload));
        }
        tracing::trace!(
            payload_id,
            count,
            sn = unit.sn,
            hfn = self.space.hfn_of(count),
            "submit"
        );
        self.tx_next = increment32(count);
        unit
    }

    pub fn tx_next(&self) -> u32 {
        self.tx_next
    }

    pub fn space(&self) -> &CountSpace {
        &self.space
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::integrity::{Direction, AesCmac};

    #[test]
    fn numbers_units() {
        let mut tx = Transmitter::new(SnWidth::Bits12);
        for i in 0..5u64 {
            let unit = tx.submit(i, "data");
            assert_eq!(unit.count_at_tx, i as u32);
            assert_eq!(unit.sn, i as u32);
            assert_eq!(unit.payload_id, i);
            assert!(unit.mac.is_none());
            assert!(!unit.corrupted);
        }
        assert_eq!(tx.tx_next(), 5);
    }

    #[test]
    fn sn_wraps_with_epoch() {
        let mut tx = Transmitter::new(SnWidth::Bits12).with_initial_count(4095);
        assert_eq!(tx.submit(0, "a").sn, 4095);
        let unit = tx.submit(1, "b");
        assert_eq!(unit.sn, 0);
        assert_eq!(unit.count_at_tx, 4096);
    }

    #[test]
    fn count_wraps_at_32_bits() {
        let mut tx = Transmitter::new(SnWidth::Bits18).with_initial_count(u32::MAX);
        let unit = tx.submit(0, "last");
        assert_eq!(unit.count_at_tx, u32::MAX);
        assert_eq!(unit.sn, (1 << 18) - 1);
        assert_eq!(tx.tx_next(), 0);
        assert_eq!(tx.submit(1, "first").sn, 0);
    }

    #[test]
    fn rejects_unsupported_width() {
        assert!(Transmitter::try_from_bits(16).is_err());
        assert!(Transmitter::try_from_bits(18).is_ok());
    }

    #[test]
    fn protects_units() {
        let alg = AesCmac::new([1; 16], 5, Direction::Uplink);
        let mut tx = Transmitter::new(SnWidth::Bits12).with_integrity(alg.clone());
        let unit = tx.submit(0, "payload");
        assert!(alg.verify(0, b"payload", &unit.mac.unwrap()));
    }
}

use pdcp_rs_types::count::CountSpace;

/// Estimate the hyper frame number of a received sequence number relative to the delivery
/// cursor `rx_deliv`.
///
/// The received sequence number is placed in a linear window of `2 * window_size` sequence
/// numbers centered on the cursor's own sequence number. Anything below the window belongs to
/// the next epoch, anything at or above its upper end to the previous one. The result may be
/// `-1` (cursor in epoch 0) or one past the last epoch, [CountSpace::reconstruct] wraps both.
pub fn estimate_hfn(rx_deliv: u32, space: &CountSpace, received_sn: u32) -> i64 {
    let hfn_cursor = i64::from(space.hfn_of(rx_deliv));
    let sn_cursor = i64::from(space.sn_of(rx_deliv));
    let window = i64::from(space.window_size());
    let sn = i64::from(received_sn);

    // strict below the window, inclusive at its upper end
    if sn < sn_cursor - window {
        hfn_cursor + 1
    } else if sn >= sn_cursor + window {
        hfn_cursor - 1
    } else {
        hfn_cursor
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pdcp_rs_types::count::SnWidth;

    fn space12() -> CountSpace {
        CountSpace::new(SnWidth::Bits12)
    }

    #[test]
    fn same_and_next_epoch() {
        let space = space12();
        let rx_deliv = space.reconstruct(0, 4000);
        assert_eq!(estimate_hfn(rx_deliv, &space, 4050), 0);
        assert_eq!(estimate_hfn(rx_deliv, &space, 100), 1);
        assert_eq!(estimate_hfn(rx_deliv, &space, 2000), 0);
    }

    #[test]
    fn boundary_ties() {
        let space = space12();
        let rx_deliv = space.reconstruct(0, 2048);
        assert_eq!(estimate_hfn(rx_deliv, &space, 0), 0);
        assert_eq!(estimate_hfn(rx_deliv, &space, 4095), 0);
    }

    #[test]
    fn lower_boundary_is_same_epoch() {
        let space = space12();
        let rx_deliv = space.reconstruct(3, 3000);
        // exactly window_size below the cursor
        assert_eq!(estimate_hfn(rx_deliv, &space, 952), 3);
        assert_eq!(estimate_hfn(rx_deliv, &space, 951), 4);
    }

    #[test]
    fn upper_boundary_is_previous_epoch() {
        let space = space12();
        let rx_deliv = space.reconstruct(3, 100);
        assert_eq!(estimate_hfn(rx_deliv, &space, 2147), 3);
        // exactly window_size above the cursor
        assert_eq!(estimate_hfn(rx_deliv, &space, 2148), 2);
        assert_eq!(estimate_hfn(rx_deliv, &space, 4095), 2);
    }

    #[test]
    fn previous_epoch_underflows_at_zero() {
        let space = space12();
        assert_eq!(estimate_hfn(0, &space, 2048), -1);
        assert_eq!(space.reconstruct(-1, 2048), u32::MAX - 2047);
    }

    #[test]
    fn wide_sequence_numbers() {
        let space = CountSpace::new(SnWidth::Bits18);
        let rx_deliv = space.reconstruct(9, space.max_sn() - 10);
        assert_eq!(estimate_hfn(rx_deliv, &space, 5), 10);
        assert_eq!(estimate_hfn(rx_deliv, &space, space.max_sn()), 9);
    }
}

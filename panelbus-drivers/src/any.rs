//! Runtime-selected bus
//!
//! [`AnyBus`] closes the set of transports so a display driver can hold
//! one bus type whatever the board wires up. The region is optional here
//! and checked per variant: RGB needs one, the others refuse one.

use core::fmt;

use panelbus_core::{
    Area, BusError, BusId, BusState, CompletionCallback, FbIndex, LcdBus, Pixels, ReadParams,
    ValidationError,
};
use panelbus_hal::{I2cHal, I80Hal, RgbHal, SpiHal};

use crate::{I2cBus, I80Bus, RgbBus, SpiBus};

/// Any of the four transports on platform `H`
pub enum AnyBus<H>
where
    H: SpiHal + I2cHal + I80Hal + RgbHal,
{
    Spi(SpiBus<H>),
    I2c(I2cBus<H>),
    I80(I80Bus<H>),
    Rgb(RgbBus<H>),
}

fn no_region(region: Option<Area>) -> Result<(), BusError> {
    match region {
        None => Ok(()),
        Some(_) => Err(ValidationError::UnexpectedRegion.into()),
    }
}

impl<H> AnyBus<H>
where
    H: SpiHal + I2cHal + I80Hal + RgbHal,
{
    /// Transport name
    pub fn kind(&self) -> &'static str {
        match self {
            AnyBus::Spi(_) => "spi",
            AnyBus::I2c(_) => "i2c",
            AnyBus::I80(_) => "i80",
            AnyBus::Rgb(_) => "rgb",
        }
    }
}

impl<H> LcdBus for AnyBus<H>
where
    H: SpiHal + I2cHal + I80Hal + RgbHal,
{
    type Region = Option<Area>;

    fn bus_id(&self) -> BusId {
        match self {
            AnyBus::Spi(bus) => bus.bus_id(),
            AnyBus::I2c(bus) => bus.bus_id(),
            AnyBus::I80(bus) => bus.bus_id(),
            AnyBus::Rgb(bus) => bus.bus_id(),
        }
    }

    fn state(&self) -> BusState {
        match self {
            AnyBus::Spi(bus) => bus.state(),
            AnyBus::I2c(bus) => bus.state(),
            AnyBus::I80(bus) => bus.state(),
            AnyBus::Rgb(bus) => bus.state(),
        }
    }

    fn init(&mut self, width: u16, height: u16, bpp: u8) -> Result<(), BusError> {
        match self {
            AnyBus::Spi(bus) => bus.init(width, height, bpp),
            AnyBus::I2c(bus) => bus.init(width, height, bpp),
            AnyBus::I80(bus) => bus.init(width, height, bpp),
            AnyBus::Rgb(bus) => bus.init(width, height, bpp),
        }
    }

    fn deinit(&mut self) -> Result<(), BusError> {
        match self {
            AnyBus::Spi(bus) => bus.deinit(),
            AnyBus::I2c(bus) => bus.deinit(),
            AnyBus::I80(bus) => bus.deinit(),
            AnyBus::Rgb(bus) => bus.deinit(),
        }
    }

    fn tx_param(&mut self, cmd: i32, params: Option<&[u8]>) -> Result<(), BusError> {
        match self {
            AnyBus::Spi(bus) => bus.tx_param(cmd, params),
            AnyBus::I2c(bus) => bus.tx_param(cmd, params),
            AnyBus::I80(bus) => bus.tx_param(cmd, params),
            AnyBus::Rgb(bus) => bus.tx_param(cmd, params),
        }
    }

    fn tx_color(
        &mut self,
        cmd: i32,
        pixels: Pixels<'_>,
        region: Option<Area>,
    ) -> Result<(), BusError> {
        match self {
            AnyBus::Spi(bus) => {
                no_region(region)?;
                bus.tx_color(cmd, pixels, ())
            }
            AnyBus::I2c(bus) => {
                no_region(region)?;
                bus.tx_color(cmd, pixels, ())
            }
            AnyBus::I80(bus) => {
                no_region(region)?;
                bus.tx_color(cmd, pixels, ())
            }
            AnyBus::Rgb(bus) => {
                let area = region.ok_or(ValidationError::MissingRegion)?;
                bus.tx_color(cmd, pixels, area)
            }
        }
    }

    fn register_callback(&mut self, callback: CompletionCallback, user_ctx: usize) {
        match self {
            AnyBus::Spi(bus) => bus.register_callback(callback, user_ctx),
            AnyBus::I2c(bus) => bus.register_callback(callback, user_ctx),
            AnyBus::I80(bus) => bus.register_callback(callback, user_ctx),
            AnyBus::Rgb(bus) => bus.register_callback(callback, user_ctx),
        }
    }

    fn get_frame_buffer(&mut self, index: FbIndex) -> Option<&mut [u8]> {
        match self {
            AnyBus::Spi(bus) => bus.get_frame_buffer(index),
            AnyBus::I2c(bus) => bus.get_frame_buffer(index),
            AnyBus::I80(bus) => bus.get_frame_buffer(index),
            AnyBus::Rgb(bus) => bus.get_frame_buffer(index),
        }
    }

    fn get_frame_buffer_size(&self) -> usize {
        match self {
            AnyBus::Spi(bus) => bus.get_frame_buffer_size(),
            AnyBus::I2c(bus) => bus.get_frame_buffer_size(),
            AnyBus::I80(bus) => bus.get_frame_buffer_size(),
            AnyBus::Rgb(bus) => bus.get_frame_buffer_size(),
        }
    }
}

impl<H> ReadParams for AnyBus<H>
where
    H: SpiHal + I2cHal + I80Hal + RgbHal,
{
    fn rx_param(&mut self, cmd: i32, buf: &mut [u8]) -> Result<(), BusError> {
        match self {
            AnyBus::Spi(bus) => bus.rx_param(cmd, buf),
            AnyBus::I2c(bus) => bus.rx_param(cmd, buf),
            AnyBus::I80(bus) => bus.rx_param(cmd, buf),
            AnyBus::Rgb(_) => Err(BusError::Unsupported),
        }
    }
}

impl<H> fmt::Display for AnyBus<H>
where
    H: SpiHal + I2cHal + I80Hal + RgbHal,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyBus::Spi(bus) => fmt::Display::fmt(bus, f),
            AnyBus::I2c(bus) => fmt::Display::fmt(bus, f),
            AnyBus::I80(bus) => fmt::Display::fmt(bus, f),
            AnyBus::Rgb(bus) => fmt::Display::fmt(bus, f),
        }
    }
}

impl<H> From<SpiBus<H>> for AnyBus<H>
where
    H: SpiHal + I2cHal + I80Hal + RgbHal,
{
    fn from(bus: SpiBus<H>) -> Self {
        AnyBus::Spi(bus)
    }
}

impl<H> From<I2cBus<H>> for AnyBus<H>
where
    H: SpiHal + I2cHal + I80Hal + RgbHal,
{
    fn from(bus: I2cBus<H>) -> Self {
        AnyBus::I2c(bus)
    }
}

impl<H> From<I80Bus<H>> for AnyBus<H>
where
    H: SpiHal + I2cHal + I80Hal + RgbHal,
{
    fn from(bus: I80Bus<H>) -> Self {
        AnyBus::I80(bus)
    }
}

impl<H> From<RgbBus<H>> for AnyBus<H>
where
    H: SpiHal + I2cHal + I80Hal + RgbHal,
{
    fn from(bus: RgbBus<H>) -> Self {
        AnyBus::Rgb(bus)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testutil::leak_bridge;
    use panelbus_core::config::i2c::I2cBusArgs;
    use panelbus_core::config::i80::I80BusArgs;
    use panelbus_core::config::rgb::RgbBusArgs;
    use panelbus_core::config::spi::SpiBusArgs;
    use panelbus_hal_sim::{SimEvent, SimHal};
    use proptest::prelude::*;
    use std::vec;
    use std::vec::Vec;

    fn all(hal: &SimHal) -> Vec<AnyBus<SimHal>> {
        vec![
            SpiBus::new(hal.clone(), SpiBusArgs::new(21), leak_bridge(0))
                .unwrap()
                .into(),
            I2cBus::new(hal.clone(), I2cBusArgs::new(4, 5, 0x3C), leak_bridge(1))
                .unwrap()
                .into(),
            I80Bus::new(
                hal.clone(),
                I80BusArgs::new(0, 47, 6, [8, 9, 10, 11, 12, 13, 14, 15]),
                leak_bridge(2),
            )
            .unwrap()
            .into(),
            RgbBus::new(
                hal.clone(),
                RgbBusArgs::new(46, 3, 5, 45, 7, [16, 17, 18, 19, 20, 1, 2, 42]),
                leak_bridge(3),
            )
            .unwrap()
            .into(),
        ]
    }

    #[test]
    fn test_dispatch_by_kind() {
        let hal = SimHal::esp32_s3();
        let buses = all(&hal);
        let kinds: Vec<_> = buses.iter().map(AnyBus::kind).collect();
        assert_eq!(kinds, ["spi", "i2c", "i80", "rgb"]);
        let ids: Vec<_> = buses.iter().map(|b| b.bus_id().0).collect();
        assert_eq!(ids, [0, 1, 2, 3]);
    }

    #[test]
    fn test_uniform_lifecycle() {
        let hal = SimHal::esp32_s3();
        for mut bus in all(&hal) {
            assert_eq!(bus.state(), BusState::Constructed);
            bus.init(64, 40, 16).unwrap();
            assert_eq!(bus.state(), BusState::Initialized);
            assert!(bus.get_frame_buffer_size() > 0);
            assert!(bus.get_frame_buffer(FbIndex::First).is_some());
            bus.tx_param(0x29, None).unwrap();
            bus.deinit().unwrap();
            assert_eq!(bus.state(), BusState::Released);
        }
        assert_eq!(hal.internal_in_use(), 0);
    }

    #[test]
    fn test_region_checked_per_variant() {
        let hal = SimHal::esp32_s3();
        let area = Area::new(0, 0, 1, 1);
        for mut bus in all(&hal) {
            bus.init(64, 40, 16).unwrap();
            let pixels = Pixels::Slice(&[0; 8]);
            if bus.kind() == "rgb" {
                assert_eq!(
                    bus.tx_color(0x2C, pixels, None),
                    Err(BusError::Validation(ValidationError::MissingRegion))
                );
                assert!(bus.tx_color(0x2C, pixels, Some(area)).is_ok());
            } else {
                assert_eq!(
                    bus.tx_color(0x2C, pixels, Some(area)),
                    Err(BusError::Validation(ValidationError::UnexpectedRegion))
                );
                assert!(bus.tx_color(0x2C, pixels, None).is_ok());
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_region_rule_per_variant(
            x in 0u16..80,
            y in 0u16..50,
            w in 0u16..80,
            h in 0u16..50,
            with_region in any::<bool>(),
        ) {
            let hal = SimHal::esp32_s3();
            let area = Area::new(x, y, x + w, y + h);
            let region = with_region.then_some(area);

            for mut bus in all(&hal) {
                bus.init(64, 40, 16).unwrap();
                hal.clear_events();
                let result = bus.tx_color(0x2C, Pixels::frame(FbIndex::First), region);

                let expected: Result<(), BusError> = match (bus.kind(), region) {
                    ("rgb", None) => Err(ValidationError::MissingRegion.into()),
                    ("rgb", Some(a)) if !a.fits(64, 40) => {
                        Err(ValidationError::RegionOutOfBounds.into())
                    }
                    ("rgb", Some(_)) => Ok(()),
                    (_, Some(_)) => Err(ValidationError::UnexpectedRegion.into()),
                    (_, None) => Ok(()),
                };
                prop_assert_eq!(result, expected);
                // Rejected draws never reach the hardware
                if result.is_err() {
                    prop_assert!(hal.events().is_empty());
                }
            }
        }
    }

    #[test]
    fn test_rx_param_unsupported_on_rgb() {
        let hal = SimHal::esp32_s3();
        hal.set_rx_reply(&[7]);
        for mut bus in all(&hal) {
            bus.init(64, 40, 16).unwrap();
            let mut buf = [0u8; 1];
            let result = bus.rx_param(0x0A, &mut buf);
            if bus.kind() == "rgb" {
                assert_eq!(result, Err(BusError::Unsupported));
                assert_eq!(buf, [0]);
            } else {
                assert_eq!(result, Ok(()));
                assert_eq!(buf, [7]);
            }
        }
        let reads = hal
            .events()
            .iter()
            .filter(|e| matches!(e, SimEvent::RxParam { .. }))
            .count();
        assert_eq!(reads, 3);
    }
}

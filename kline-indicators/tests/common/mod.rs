//! Shared fixtures for integration tests

#![allow(dead_code)]

use kline_indicators::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::rc::Rc;

pub const MINUTE: i64 = 60_000;

pub const EMA9_PRICES: [Decimal; 21] = [
    dec!(22.8100), dec!(23.0900), dec!(22.9100), dec!(23.2300), dec!(22.8300), dec!(23.0500),
    dec!(23.0200), dec!(23.2900), dec!(23.4100), dec!(23.4900), dec!(24.6000), dec!(24.6300),
    dec!(24.5100), dec!(23.7300), dec!(23.3100), dec!(23.5300), dec!(23.0600), dec!(23.2500),
    dec!(23.1200), dec!(22.8000), dec!(22.8400),
];

pub const EMA9_EXPECTED: [Decimal; 21] = [
    dec!(22.8100), dec!(22.8660), dec!(22.8748), dec!(22.9458), dec!(22.9227), dec!(22.9481),
    dec!(22.9625), dec!(23.0280), dec!(23.1044), dec!(23.1815), dec!(23.4652), dec!(23.6982),
    dec!(23.8605), dec!(23.8344), dec!(23.7295), dec!(23.6896), dec!(23.5637), dec!(23.5010),
    dec!(23.4248), dec!(23.2998), dec!(23.2079),
];

pub const EMA13_PRICES: [Decimal; 14] = [
    dec!(8120.0000), dec!(8122.3100), dec!(8138.0700), dec!(8184.1900), dec!(8255.8400),
    dec!(8320.2000), dec!(8353.5600), dec!(8350.0100), dec!(8343.5400), dec!(8299.8700),
    dec!(8325.0000), dec!(8324.7800), dec!(8325.0000), dec!(8320.0000),
];

pub const EMA13_EXPECTED: [Decimal; 14] = [
    dec!(8120.0000), dec!(8120.3300), dec!(8122.8643), dec!(8131.6251), dec!(8149.3701),
    dec!(8173.7744), dec!(8199.4580), dec!(8220.9654), dec!(8238.4761), dec!(8247.2467),
    dec!(8258.3543), dec!(8267.8437), dec!(8276.0089), dec!(8282.2933),
];

pub const MACD_PRICES: [Decimal; 29] = [
    dec!(8119.1400), dec!(8122.0000), dec!(8122.0200), dec!(8122.1000), dec!(8122.1000),
    dec!(8119.6400), dec!(8122.0100), dec!(8121.1700), dec!(8124.2700), dec!(8116.0000),
    dec!(8116.5000), dec!(8119.4400), dec!(8121.9900), dec!(8117.9600), dec!(8117.2900),
    dec!(8120.0000), dec!(8122.3100), dec!(8138.0700), dec!(8184.1900), dec!(8255.8400),
    dec!(8320.2000), dec!(8353.5600), dec!(8350.0100), dec!(8343.5400), dec!(8299.8700),
    dec!(8325.0000), dec!(8324.7800), dec!(8325.0000), dec!(8320.0000),
];

pub const MACD_EXPECTED: [Decimal; 29] = [
    dec!(0.0000), dec!(0.2281), dec!(0.4059), dec!(0.5469), dec!(0.6512), dec!(0.5292),
    dec!(0.6166), dec!(0.6111), dec!(0.8471), dec!(0.3627), dec!(0.0189), dec!(-0.0162),
    dec!(0.1599), dec!(-0.0254), dec!(-0.2237), dec!(-0.1604), dec!(0.0754), dec!(1.5164),
    dec!(6.3072), dec!(15.7045), dec!(28.0222), dec!(40.0147), dec!(48.6713), dec!(54.3828),
    dec!(54.7542), dec!(56.4259), dec!(57.0750), dec!(56.9507), dec!(55.8055),
];

pub const SIGNAL_EXPECTED: [Decimal; 29] = [
    dec!(0.0000), dec!(0.0456), dec!(0.1177), dec!(0.2035), dec!(0.2931), dec!(0.3403),
    dec!(0.3955), dec!(0.4387), dec!(0.5204), dec!(0.4888), dec!(0.3948), dec!(0.3126),
    dec!(0.2821), dec!(0.2206), dec!(0.1317), dec!(0.0733), dec!(0.0737), dec!(0.3623),
    dec!(1.5513), dec!(4.3819), dec!(9.1100), dec!(15.2909), dec!(21.9670), dec!(28.4502),
    dec!(33.7110), dec!(38.2539), dec!(42.0182), dec!(45.0047), dec!(47.1648),
];

pub const RSI_PRICES: [Decimal; 33] = [
    dec!(44.3389), dec!(44.0902), dec!(44.1497), dec!(43.6124), dec!(44.3278), dec!(44.8264),
    dec!(45.0955), dec!(45.4245), dec!(45.8433), dec!(46.0826), dec!(45.8931), dec!(46.0328),
    dec!(45.6140), dec!(46.2820), dec!(46.2820), dec!(46.0028), dec!(46.0328), dec!(46.4116),
    dec!(46.2222), dec!(45.6439), dec!(46.2122), dec!(46.2521), dec!(45.7137), dec!(46.4515),
    dec!(45.7835), dec!(45.3548), dec!(44.0288), dec!(44.1783), dec!(44.2181), dec!(44.5672),
    dec!(43.4205), dec!(42.6628), dec!(43.1314),
];

/// RSI(14) for `RSI_PRICES[14..]`
pub const RSI_EXPECTED: [Decimal; 19] = [
    dec!(70.53278948), dec!(66.31856181), dec!(66.54982994), dec!(69.40630534),
    dec!(66.35516906), dec!(57.97485571), dec!(62.92960675), dec!(63.25714756),
    dec!(56.05929872), dec!(62.37707144), dec!(54.70757308), dec!(50.42277441),
    dec!(39.98982315), dec!(41.46048198), dec!(41.86891609), dec!(45.46321245),
    dec!(37.30404209), dec!(33.07952299), dec!(37.77295211),
];

pub fn minute() -> Interval {
    Interval::parse("1m").unwrap()
}

/// Flat klines one minute apart, starting at `start`
pub fn klines(start: Timestamp, prices: &[Decimal]) -> Vec<Kline> {
    prices
        .iter()
        .enumerate()
        .map(|(i, p)| Kline::flat(start + i as i64 * MINUTE, *p))
        .collect()
}

pub fn context(clock: Rc<ManualClock>, history: usize) -> IndicatorContext {
    IndicatorContext::new(clock, IndicatorConfig::default().with_history_length(history))
}

/// Live stream with no history and a price indicator listening to it
pub fn live_price() -> (Rc<ReplayStream>, Rc<PriceIndicator>) {
    let stream = Rc::new(ReplayStream::new("BTCUSDT", minute()));
    let price = PriceIndicator::new(stream.clone(), context(Rc::new(ManualClock::new(0)), 0));
    (stream, price)
}

pub fn round4(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

pub fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    assert!(
        (actual - expected).abs() < tolerance,
        "{actual} differs from {expected} by more than {tolerance}"
    );
}

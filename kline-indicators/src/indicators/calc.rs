//! Averaging helpers

use rust_decimal::Decimal;

/// Mean of `data`, `None` when empty
pub fn average(data: &[Decimal]) -> Option<Decimal> {
    if data.is_empty() {
        return None;
    }
    let sum: Decimal = data.iter().sum();
    Some(sum / Decimal::from(data.len()))
}

/// Mean increase from each value to the next. Decreases count as zero
/// but still take part in the mean.
pub fn average_gain(data: &[Decimal]) -> Option<Decimal> {
    let gains: Vec<Decimal> = data
        .windows(2)
        .map(|w| (w[1] - w[0]).max(Decimal::ZERO))
        .collect();
    average(&gains)
}

/// Mean decrease from each value to the next, as a positive number.
/// Increases count as zero but still take part in the mean.
pub fn average_loss(data: &[Decimal]) -> Option<Decimal> {
    let losses: Vec<Decimal> = data
        .windows(2)
        .map(|w| (w[0] - w[1]).max(Decimal::ZERO))
        .collect();
    average(&losses)
}

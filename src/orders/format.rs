//! Display shaping for the "my orders" list.

use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use time::{macros::offset, OffsetDateTime, UtcOffset};

use super::repo::OrderRow;

pub const UNASSIGNED_WORKER: &str = "รอการจัดสรรช่าง";
const BANGKOK: UtcOffset = offset!(+7);
const BUDDHIST_ERA_OFFSET: i32 = 543;

#[derive(Debug, Serialize, PartialEq)]
pub struct OrderView {
    pub id: String,
    pub status: String,
    pub date: String,
    pub worker: String,
    pub price: String,
    pub details: Vec<String>,
}

impl From<OrderRow> for OrderView {
    fn from(row: OrderRow) -> Self {
        Self {
            id: order_code(row.id),
            status: row.status,
            date: thai_datetime(row.date),
            worker: row.worker.unwrap_or_else(|| UNASSIGNED_WORKER.to_string()),
            price: thai_price(row.price),
            details: row.details.into_iter().flatten().collect(),
        }
    }
}

/// `12` -> `AD00000012`.
pub fn order_code(id: i32) -> String {
    format!("AD{:08}", id)
}

/// `DD/MM/YYYY HH:MM น.` in Bangkok time with a Buddhist-era year.
pub fn thai_datetime(at: OffsetDateTime) -> String {
    let local = at.to_offset(BANGKOK);
    format!(
        "{:02}/{:02}/{} {:02}:{:02} น.",
        local.day(),
        u8::from(local.month()),
        local.year() + BUDDHIST_ERA_OFFSET,
        local.hour(),
        local.minute()
    )
}

/// Thousands separators, at least 2 and at most 3 fraction digits.
pub fn thai_price(value: f64) -> String {
    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "000"));
    let frac = frac_part.strip_suffix('0').unwrap_or(frac_part);

    let grouped = int_part
        .parse::<u64>()
        .map(|n| n.to_formatted_string(&Locale::th))
        .unwrap_or_else(|_| int_part.to_string());

    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac}")
}

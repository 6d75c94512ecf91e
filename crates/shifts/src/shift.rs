use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use mostrador_core::{DomainError, DomainResult, Money, OperatorId, PaymentMethod, ShiftId};
use mostrador_sales::{Sale, SaleStatus};

/// One of the three fixed daily time windows used to bucket sales.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftBand {
    /// 06:00 to 14:00.
    Morning,
    /// 14:00 to 22:00.
    Afternoon,
    /// 22:00 to 06:00 the next day.
    Night,
}

impl ShiftBand {
    /// Band containing the given local time of day.
    pub fn of_time(time: NaiveTime) -> ShiftBand {
        match time.hour() {
            6..=13 => ShiftBand::Morning,
            14..=21 => ShiftBand::Afternoon,
            _ => ShiftBand::Night,
        }
    }

    /// Absolute half-open window `[start, end)` for this band on `date`.
    ///
    /// The night band starts at 22:00 on `date` and ends at 06:00 on the
    /// following day.
    pub fn window(
        self,
        date: NaiveDate,
        tz: FixedOffset,
    ) -> DomainResult<(DateTime<Utc>, DateTime<Utc>)> {
        let (start_hour, end_hour) = match self {
            ShiftBand::Morning => (6, 14),
            ShiftBand::Afternoon => (14, 22),
            ShiftBand::Night => (22, 6),
        };
        let end_date = if self == ShiftBand::Night {
            date.succ_opt()
                .ok_or_else(|| DomainError::validation("shift date out of range"))?
        } else {
            date
        };
        Ok((
            local_instant(date, start_hour, tz)?,
            local_instant(end_date, end_hour, tz)?,
        ))
    }
}

impl core::fmt::Display for ShiftBand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            ShiftBand::Morning => "morning",
            ShiftBand::Afternoon => "afternoon",
            ShiftBand::Night => "night",
        };
        f.write_str(name)
    }
}

fn local_instant(date: NaiveDate, hour: u32, tz: FixedOffset) -> DomainResult<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .ok_or_else(|| DomainError::validation("invalid shift boundary"))?;
    let local = tz
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| DomainError::validation("ambiguous local time for shift boundary"))?;
    Ok(local.with_timezone(&Utc))
}

/// Band in effect at `now` for the given local offset.
pub fn band_at(now: DateTime<Utc>, tz: FixedOffset) -> ShiftBand {
    ShiftBand::of_time(now.with_timezone(&tz).time())
}

/// Aggregated totals for one shift window.
///
/// Mixed payments are decomposed: the cash component joins the cash bucket
/// (and therefore counts toward the expected closing amount) and the card
/// component lands in the `card` bucket. There is no separate "mixed"
/// bucket.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftTotals {
    pub sale_count: u64,
    pub total: Money,
    pub cash: Money,
    pub debit: Money,
    pub credit: Money,
    pub transfer: Money,
    /// Card components of mixed payments.
    pub card: Money,
}

/// Pure aggregation pass over sales; only paid sales are counted.
pub fn aggregate_sales(sales: &[Sale]) -> ShiftTotals {
    let mut totals = ShiftTotals::default();
    for sale in sales.iter().filter(|s| s.status() == SaleStatus::Paid) {
        totals.sale_count += 1;
        totals.total += sale.total();
        match sale.tender().method {
            PaymentMethod::Cash => totals.cash += sale.total(),
            PaymentMethod::Debit => totals.debit += sale.total(),
            PaymentMethod::Credit => totals.credit += sale.total(),
            PaymentMethod::Transfer => totals.transfer += sale.total(),
            PaymentMethod::Mixed => {
                if let Some(split) = sale.tender().split {
                    totals.cash += split.cash;
                    totals.card += split.card;
                }
            }
        }
    }
    totals
}

/// Reconciliation record for one shift-band-day.
///
/// At most one record exists per `(date, band)`; creation-time uniqueness is
/// enforced by the store. There is no closed/locked state: recalculation is
/// always permitted and overwrites the totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashShift {
    pub id: ShiftId,
    pub date: NaiveDate,
    pub band: ShiftBand,
    pub operator_id: OperatorId,
    pub opening_float: Money,
    pub totals: ShiftTotals,
    pub expenses: Money,
    pub expense_detail: String,
    pub expected_close: Money,
    pub actual_close: Money,
    pub variance: Money,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl CashShift {
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: ShiftId,
        date: NaiveDate,
        band: ShiftBand,
        operator_id: OperatorId,
        opening_float: Money,
        expenses: Money,
        expense_detail: String,
        actual_close: Money,
        notes: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut shift = Self {
            id,
            date,
            band,
            operator_id,
            opening_float,
            totals: ShiftTotals::default(),
            expenses,
            expense_detail,
            expected_close: Money::ZERO,
            actual_close,
            variance: Money::ZERO,
            notes,
            created_at,
        };
        shift.apply_totals(ShiftTotals::default());
        shift
    }

    /// Overwrite the aggregation and refresh the derived amounts.
    ///
    /// expected close = opening float + cash total - expenses;
    /// variance = actual close - expected close.
    pub fn apply_totals(&mut self, totals: ShiftTotals) {
        self.totals = totals;
        self.expected_close = self.opening_float + self.totals.cash - self.expenses;
        self.variance = self.actual_close - self.expected_close;
    }

    /// Sales attributable to this shift: paid, with a creation instant
    /// inside the band's window.
    pub fn covers(&self, sale: &Sale, tz: FixedOffset) -> DomainResult<bool> {
        let (start, end) = self.band.window(self.date, tz)?;
        Ok(sale.status() == SaleStatus::Paid
            && sale.created_at() >= start
            && sale.created_at() < end)
    }

    /// Identity of the (date, band) slot this record occupies.
    pub fn slot(&self) -> (NaiveDate, ShiftBand) {
        (self.date, self.band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use mostrador_core::{OperatorId, PaymentTender, ProductId, SaleId};
    use mostrador_sales::SaleItem;
    use proptest::prelude::*;

    fn tz() -> FixedOffset {
        // UTC-3
        FixedOffset::east_opt(-3 * 3600).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sale_at(local: DateTime<FixedOffset>, tender: PaymentTender, total_major: i64) -> Sale {
        Sale::create(
            SaleId::new(),
            1000,
            None,
            OperatorId::new(),
            &[SaleItem {
                product_id: ProductId::new(),
                quantity: 1,
                unit_price: Money::from_major(total_major),
            }],
            None,
            tender,
            None,
            SaleStatus::Paid,
            local.with_timezone(&Utc),
        )
        .unwrap()
    }

    #[test]
    fn bands_partition_the_day() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(ShiftBand::of_time(t(6, 0)), ShiftBand::Morning);
        assert_eq!(ShiftBand::of_time(t(13, 59)), ShiftBand::Morning);
        assert_eq!(ShiftBand::of_time(t(14, 0)), ShiftBand::Afternoon);
        assert_eq!(ShiftBand::of_time(t(21, 59)), ShiftBand::Afternoon);
        assert_eq!(ShiftBand::of_time(t(22, 0)), ShiftBand::Night);
        assert_eq!(ShiftBand::of_time(t(2, 30)), ShiftBand::Night);
        assert_eq!(ShiftBand::of_time(t(5, 59)), ShiftBand::Night);
    }

    #[test]
    fn night_window_rolls_into_the_next_day() {
        let (start, end) = ShiftBand::Night.window(date(2024, 3, 15), tz()).unwrap();
        let local_start = start.with_timezone(&tz());
        let local_end = end.with_timezone(&tz());

        assert_eq!(local_start.date_naive(), date(2024, 3, 15));
        assert_eq!(local_start.time(), NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(local_end.date_naive(), date(2024, 3, 16));
        assert_eq!(local_end.time(), NaiveTime::from_hms_opt(6, 0, 0).unwrap());
    }

    #[test]
    fn night_shift_covers_sales_on_both_sides_of_midnight() {
        let shift = CashShift::create(
            ShiftId::new(),
            date(2024, 3, 15),
            ShiftBand::Night,
            OperatorId::new(),
            Money::from_major(100),
            Money::ZERO,
            String::new(),
            Money::from_major(100),
            String::new(),
            Utc::now(),
        );

        let before_midnight = tz().with_ymd_and_hms(2024, 3, 15, 23, 30, 0).unwrap();
        let after_midnight = tz().with_ymd_and_hms(2024, 3, 16, 1, 0, 0).unwrap();
        let outside = tz().with_ymd_and_hms(2024, 3, 16, 6, 0, 0).unwrap();
        let cash = PaymentTender::new(PaymentMethod::Cash);

        assert!(shift.covers(&sale_at(before_midnight, cash, 10), tz()).unwrap());
        assert!(shift.covers(&sale_at(after_midnight, cash, 10), tz()).unwrap());
        // The end boundary is exclusive.
        assert!(!shift.covers(&sale_at(outside, cash, 10), tz()).unwrap());
    }

    #[test]
    fn aggregation_buckets_by_method_and_decomposes_mixed() {
        let noon = tz().with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let sales = vec![
            sale_at(noon, PaymentTender::new(PaymentMethod::Cash), 100),
            sale_at(noon, PaymentTender::new(PaymentMethod::Debit), 80),
            sale_at(
                noon + Duration::minutes(5),
                PaymentTender::mixed(Money::from_major(200), Money::from_major(300)),
                500,
            ),
        ];

        let totals = aggregate_sales(&sales);
        assert_eq!(totals.sale_count, 3);
        assert_eq!(totals.total, Money::from_major(680));
        assert_eq!(totals.cash, Money::from_major(300)); // 100 cash + 200 mixed cash
        assert_eq!(totals.debit, Money::from_major(80));
        assert_eq!(totals.card, Money::from_major(300));
        assert_eq!(totals.transfer, Money::ZERO);
    }

    #[test]
    fn aggregation_skips_unpaid_sales() {
        let noon = tz().with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let mut voided = sale_at(noon, PaymentTender::new(PaymentMethod::Cash), 50);
        voided.mark_voided();
        let totals = aggregate_sales(&[voided]);
        assert_eq!(totals.sale_count, 0);
        assert_eq!(totals.total, Money::ZERO);
    }

    #[test]
    fn expected_close_and_variance_follow_the_cash_bucket() {
        let mut shift = CashShift::create(
            ShiftId::new(),
            date(2024, 3, 15),
            ShiftBand::Morning,
            OperatorId::new(),
            Money::from_major(100),
            Money::from_major(40),
            "courier".to_string(),
            Money::from_major(350),
            String::new(),
            Utc::now(),
        );

        shift.apply_totals(ShiftTotals {
            sale_count: 3,
            total: Money::from_major(680),
            cash: Money::from_major(300),
            debit: Money::from_major(80),
            credit: Money::ZERO,
            transfer: Money::ZERO,
            card: Money::from_major(300),
        });

        // 100 + 300 - 40
        assert_eq!(shift.expected_close, Money::from_major(360));
        assert_eq!(shift.variance, Money::from_major(-10));

        // Recalculation with the same inputs is idempotent.
        let expected = shift.expected_close;
        shift.apply_totals(shift.totals);
        assert_eq!(shift.expected_close, expected);
    }

    proptest! {
        #[test]
        fn every_time_of_day_maps_to_exactly_one_band(secs in 0u32..86_400) {
            let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap();
            let band = ShiftBand::of_time(time);
            let hour = time.hour();
            let expected = if (6..14).contains(&hour) {
                ShiftBand::Morning
            } else if (14..22).contains(&hour) {
                ShiftBand::Afternoon
            } else {
                ShiftBand::Night
            };
            prop_assert_eq!(band, expected);
        }

        #[test]
        fn windows_are_eight_hours_wide(day in 1u32..28, band_idx in 0usize..3) {
            let bands = [ShiftBand::Morning, ShiftBand::Afternoon, ShiftBand::Night];
            let band = bands[band_idx];
            let (start, end) = band.window(date(2024, 6, day), tz()).unwrap();
            prop_assert_eq!(end - start, Duration::hours(8));
        }
    }
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

use crate::db::{FinancialIndex, IndexFactor};

/// Daily factors per index, each series ordered by date.
///
/// IPCA is published monthly, so its daily series is synthesized on the CDI
/// business-day calendar: every CDI day inside an IPCA month gets
/// `1 + monthly_factor / 100 / business_days`.
#[derive(Debug, Clone, Default)]
pub struct DailyIndexes {
    series: HashMap<FinancialIndex, Vec<(NaiveDate, Decimal)>>,
}

impl DailyIndexes {
    pub fn build(factors: &[IndexFactor], far_future: NaiveDate, ipca_business_days: u32) -> Self {
        let mut raw: HashMap<FinancialIndex, Vec<(NaiveDate, Decimal)>> = HashMap::new();
        for f in factors {
            raw.entry(f.financial_index)
                .or_default()
                .push((f.date, f.factor));
        }
        for points in raw.values_mut() {
            points.sort_by_key(|(date, _)| *date);
            points.dedup_by_key(|(date, _)| *date);
        }

        let cdi = raw.get(&FinancialIndex::Cdi).cloned().unwrap_or_default();
        let mut series: HashMap<FinancialIndex, Vec<(NaiveDate, Decimal)>> = HashMap::new();

        if let Some(ipca) = raw.remove(&FinancialIndex::Ipca) {
            let proxy = ipca_daily_proxy(&ipca, &cdi, far_future, ipca_business_days);
            debug!(
                "Spread {} IPCA months over {} CDI business days",
                ipca.len(),
                proxy.len()
            );
            series.insert(FinancialIndex::Ipca, proxy);
        }

        // Pre-fixed lots without a reference series accrue on CDI business
        // days with a neutral post-fixed factor.
        for index in [FinancialIndex::Pre, FinancialIndex::None] {
            if !raw.contains_key(&index) {
                let neutral: Vec<_> = cdi.iter().map(|(date, _)| (*date, Decimal::ONE)).collect();
                series.insert(index, neutral);
            }
        }

        series.extend(raw);
        Self { series }
    }

    /// Ordered daily factors of an index (empty when unknown)
    pub fn series(&self, index: FinancialIndex) -> &[(NaiveDate, Decimal)] {
        self.series.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Factors dated within `[from, to]`, both ends inclusive
    pub fn between(
        &self,
        index: FinancialIndex,
        from: NaiveDate,
        to: NaiveDate,
    ) -> &[(NaiveDate, Decimal)] {
        let points = self.series(index);
        let lo = points.partition_point(|(d, _)| *d < from);
        let hi = points.partition_point(|(d, _)| *d <= to);
        if lo >= hi {
            &[]
        } else {
            &points[lo..hi]
        }
    }
}

/// Each IPCA row is valid over `[row_date, next_row_date)`, the last one until
/// `far_future`; CDI dates falling in a window take that window's proxy factor.
fn ipca_daily_proxy(
    ipca: &[(NaiveDate, Decimal)],
    cdi: &[(NaiveDate, Decimal)],
    far_future: NaiveDate,
    business_days: u32,
) -> Vec<(NaiveDate, Decimal)> {
    let divisor = Decimal::from(100) * Decimal::from(business_days);
    let mut proxy = Vec::new();
    let mut cursor = 0;

    for (i, (start, monthly)) in ipca.iter().enumerate() {
        let end = ipca.get(i + 1).map_or(far_future, |(next, _)| *next);
        let daily = Decimal::ONE + *monthly / divisor;

        while cursor < cdi.len() && cdi[cursor].0 < *start {
            cursor += 1;
        }
        while cursor < cdi.len() && cdi[cursor].0 < end {
            proxy.push((cdi[cursor].0, daily));
            cursor += 1;
        }
    }

    proxy
}
